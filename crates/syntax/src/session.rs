//! The host-facing analysis session and its worker loop.
//!
//! Each session owns one dedicated worker thread. The host stamps every
//! document change with a fresh generation before handing it to the worker,
//! so a run in flight observes itself as superseded the moment the host
//! edits again. Results travel back over a FIFO channel and are delivered
//! to a [`StyleReceiver`] only when the host calls [`AnalysisSession::pump`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use quill_primitives::{Position, TextEdit};
use quill_worker::{GenerationClock, TaskClass, WorkerThread, spawn_named_thread};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::analyzer::{Analyzer, Publication, RunOutcome};
use crate::brackets::BracketProvider;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, SessionError};
use crate::identifiers::SharedIdentifiers;
use crate::receiver::StyleReceiver;
use crate::styles::{Diagnostics, StyleUpdateRange, Styles};
use crate::theme::ColorTheme;
use crate::tokenizer::LineTokenizer;

/// Observable lifecycle of the worker's analysis runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RunState {
	Idle = 0,
	Running = 1,
	Completed = 2,
	Cancelled = 3,
	Destroyed = 4,
}

impl RunState {
	fn from_u8(value: u8) -> Self {
		match value {
			1 => Self::Running,
			2 => Self::Completed,
			3 => Self::Cancelled,
			4 => Self::Destroyed,
			_ => Self::Idle,
		}
	}
}

enum Command {
	Reset { generation: u64, text: String },
	Edit { generation: u64, edit: TextEdit },
	SetTheme(Arc<dyn ColorTheme>),
	Barrier(oneshot::Sender<()>),
	Shutdown,
}

enum Message {
	SetStyles(Arc<Styles>),
	UpdateStyles(Arc<Styles>, StyleUpdateRange),
	Diagnostics(Option<Arc<Diagnostics>>),
	BracketsChanged,
	ResetRequired(AnalysisError),
}

/// Incremental analysis of one document.
///
/// Mutating calls return immediately; analysis happens on the session's
/// worker thread. Dropping the session destroys it.
pub struct AnalysisSession {
	clock: GenerationClock,
	cancel: CancellationToken,
	commands: mpsc::UnboundedSender<Command>,
	messages: mpsc::UnboundedReceiver<Message>,
	worker: Option<WorkerThread<()>>,
	provider: BracketProvider,
	identifiers: SharedIdentifiers,
	run_state: Arc<AtomicU8>,
	provider_announced: bool,
	needs_reset: bool,
	destroyed: bool,
}

impl std::fmt::Debug for AnalysisSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AnalysisSession")
			.field("generation", &self.clock.current())
			.field("run_state", &self.run_state())
			.field("needs_reset", &self.needs_reset)
			.field("destroyed", &self.destroyed)
			.finish_non_exhaustive()
	}
}

impl AnalysisSession {
	/// Validates `config`, spawns the worker, and schedules a full analysis
	/// of `content`.
	pub fn spawn<T: LineTokenizer>(tokenizer: T, theme: Arc<dyn ColorTheme>, config: &AnalysisConfig, content: &str) -> Result<Self, SessionError> {
		let compiled = config.compile()?;
		let clock = GenerationClock::new();
		let cancel = CancellationToken::new();
		let identifiers = SharedIdentifiers::new();
		let provider = BracketProvider::new(clock.clone());
		let run_state = Arc::new(AtomicU8::new(RunState::Idle as u8));
		let (commands, command_rx) = mpsc::unbounded_channel();
		let (message_tx, messages) = mpsc::unbounded_channel();

		let worker = Worker {
			analyzer: Analyzer::new(tokenizer, theme, compiled, identifiers.clone()),
			commands: command_rx,
			messages: message_tx,
			clock: clock.clone(),
			cancel: cancel.clone(),
			provider: provider.clone(),
			run_state: Arc::clone(&run_state),
			generation: 0,
			barriers: Vec::new(),
			desynced: false,
		};
		let worker = spawn_named_thread(TaskClass::Analysis, "session", move || worker.run()).map_err(SessionError::WorkerSpawn)?;

		let mut session = Self {
			clock,
			cancel,
			commands,
			messages,
			worker: Some(worker),
			provider,
			identifiers,
			run_state,
			provider_announced: false,
			needs_reset: false,
			destroyed: false,
		};
		session.reset(content)?;
		Ok(session)
	}

	/// Inserts `text` at `start`. `end` is where the insertion ends in the
	/// edited document.
	pub fn insert(&self, start: Position, end: Position, text: &str) -> Result<(), SessionError> {
		self.edit(TextEdit::Insert {
			start,
			end,
			text: text.to_string(),
		})
	}

	/// Deletes `start..end`, whose pre-edit content was `text`.
	pub fn delete(&self, start: Position, end: Position, text: &str) -> Result<(), SessionError> {
		self.edit(TextEdit::delete(start, end, text))
	}

	/// Fails with [`SessionError::ResetRequired`] once a rejected edit has
	/// been reported through [`Self::pump`], until the next [`Self::reset`].
	pub fn edit(&self, edit: TextEdit) -> Result<(), SessionError> {
		self.ensure_live()?;
		if self.needs_reset {
			return Err(SessionError::ResetRequired);
		}
		let generation = self.clock.next();
		tracing::trace!(generation, start = %edit.start(), "session.edit");
		self.send(Command::Edit { generation, edit })
	}

	/// Replaces the whole document and re-analyzes from scratch.
	pub fn reset(&mut self, content: &str) -> Result<(), SessionError> {
		self.ensure_live()?;
		self.needs_reset = false;
		let generation = self.clock.next();
		tracing::debug!(generation, chars = content.len(), "session.reset");
		self.send(Command::Reset {
			generation,
			text: content.to_string(),
		})
	}

	/// Swaps the color theme. Cached spans are recolored, not re-tokenized.
	pub fn set_theme(&self, theme: Arc<dyn ColorTheme>) -> Result<(), SessionError> {
		self.ensure_live()?;
		self.send(Command::SetTheme(theme))
	}

	/// Delivers every queued result to `receiver` in publication order, then
	/// refreshes cursor and visible-range bracket results. Returns the number
	/// of queued results delivered.
	pub fn pump(&mut self, receiver: &mut dyn StyleReceiver) -> usize {
		if self.destroyed {
			if self.provider_announced {
				self.provider_announced = false;
				receiver.update_bracket_provider(None);
			}
			return 0;
		}
		let mut delivered = 0;
		while let Ok(message) = self.messages.try_recv() {
			delivered += 1;
			match message {
				Message::SetStyles(styles) => receiver.set_styles(styles),
				Message::UpdateStyles(styles, range) => receiver.update_styles(styles, range),
				Message::Diagnostics(diagnostics) => receiver.set_diagnostics(diagnostics),
				Message::BracketsChanged => {
					if !self.provider_announced {
						self.provider_announced = true;
						receiver.update_bracket_provider(Some(self.provider.clone()));
					}
				}
				Message::ResetRequired(error) => {
					self.needs_reset = true;
					receiver.reset_required(error);
				}
			}
		}
		self.provider.flush(receiver);
		if delivered > 0 {
			tracing::trace!(worker_class = TaskClass::Interactive.as_str(), delivered, "session.pump");
		}
		delivered
	}

	/// Blocks until the worker has finished every run scheduled so far.
	///
	/// Must not be called from inside an async runtime.
	pub fn barrier(&self) -> Result<(), SessionError> {
		self.ensure_live()?;
		let (done, wait) = oneshot::channel();
		self.send(Command::Barrier(done))?;
		wait.blocking_recv().map_err(|_| SessionError::WorkerGone)
	}

	pub fn provider(&self) -> &BracketProvider {
		&self.provider
	}

	pub fn identifiers(&self) -> &SharedIdentifiers {
		&self.identifiers
	}

	pub fn run_state(&self) -> RunState {
		RunState::from_u8(self.run_state.load(Ordering::Acquire))
	}

	/// Whether the worker rejected an edit and waits for [`Self::reset`].
	pub fn needs_reset(&self) -> bool {
		self.needs_reset
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed
	}

	/// Cancels any run, stops the worker, and detaches the bracket provider.
	/// Later calls are no-ops.
	pub fn destroy(&mut self) -> Result<(), SessionError> {
		if self.destroyed {
			return Ok(());
		}
		self.destroyed = true;
		self.cancel.cancel();
		let _ = self.commands.send(Command::Shutdown);
		let joined = self.worker.take().map_or(Ok(()), WorkerThread::join);
		self.provider.detach();
		self.run_state.store(RunState::Destroyed as u8, Ordering::Release);
		tracing::debug!(generation = self.clock.current(), "session.destroyed");
		joined.map_err(|_| SessionError::WorkerGone)
	}

	fn ensure_live(&self) -> Result<(), SessionError> {
		if self.destroyed { Err(SessionError::Destroyed) } else { Ok(()) }
	}

	fn send(&self, command: Command) -> Result<(), SessionError> {
		self.commands.send(command).map_err(|_| SessionError::WorkerGone)
	}
}

impl Drop for AnalysisSession {
	fn drop(&mut self) {
		if let Err(error) = self.destroy() {
			tracing::warn!(%error, "session.drop_failed");
		}
	}
}

struct Worker<T: LineTokenizer> {
	analyzer: Analyzer<T>,
	commands: mpsc::UnboundedReceiver<Command>,
	messages: mpsc::UnboundedSender<Message>,
	clock: GenerationClock,
	cancel: CancellationToken,
	provider: BracketProvider,
	run_state: Arc<AtomicU8>,
	/// Generation of the newest command applied.
	generation: u64,
	barriers: Vec<oneshot::Sender<()>>,
	/// Set when an edit did not fit the worker's copy. Edits are skipped
	/// until the host resets the document.
	desynced: bool,
}

impl<T: LineTokenizer> Worker<T> {
	fn run(mut self) {
		tracing::debug!(worker_class = TaskClass::Analysis.as_str(), "session.worker_start");
		while let Some(first) = self.commands.blocking_recv() {
			let mut batch = vec![first];
			while let Ok(command) = self.commands.try_recv() {
				batch.push(command);
			}
			if self.apply(batch) {
				break;
			}
			self.analyze();
		}
		self.analyzer.destroy();
		self.set_state(RunState::Destroyed);
		tracing::debug!(worker_class = TaskClass::Analysis.as_str(), "session.worker_exit");
	}

	/// Applies queued commands in order. Returns true on shutdown.
	fn apply(&mut self, batch: Vec<Command>) -> bool {
		for command in batch {
			match command {
				Command::Reset { generation, text } => {
					self.analyzer.reset(&text);
					self.desynced = false;
					self.generation = generation;
				}
				Command::Edit { generation, edit } => {
					self.generation = generation;
					if self.desynced {
						tracing::debug!(generation, "analysis.edit_skipped");
						continue;
					}
					match self.analyzer.apply_edit(&edit) {
						Ok(()) => {}
						Err(error @ AnalysisError::InvalidPosition(_)) => {
							tracing::error!(generation, %error, "analysis.edit_rejected");
							self.desynced = true;
							let _ = self.messages.send(Message::ResetRequired(error));
						}
						Err(error) => {
							tracing::error!(generation, %error, "analysis.cache_rebuilt");
							self.analyzer.rebuild();
						}
					}
				}
				Command::SetTheme(theme) => {
					if let Some(publication) = self.analyzer.set_theme(theme) {
						self.publish(publication);
					}
				}
				Command::Barrier(done) => self.barriers.push(done),
				Command::Shutdown => return true,
			}
		}
		false
	}

	fn analyze(&mut self) {
		if self.analyzer.has_pending_work() {
			self.set_state(RunState::Running);
			let token = self.clock.token(self.generation, &self.cancel);
			match self.analyzer.run(&token) {
				RunOutcome::Completed(publication) => {
					self.publish(publication);
					self.set_state(RunState::Completed);
				}
				RunOutcome::Cancelled => self.set_state(RunState::Cancelled),
				RunOutcome::Idle => self.set_state(RunState::Idle),
			}
		}
		if !self.analyzer.has_pending_work() {
			for done in self.barriers.drain(..) {
				let _ = done.send(());
			}
		}
	}

	fn publish(&self, publication: Publication) {
		let Publication {
			styles,
			range,
			diagnostics,
			brackets,
			generation,
		} = publication;
		let _ = self.messages.send(match range {
			Some(range) => Message::UpdateStyles(styles, range),
			None => Message::SetStyles(styles),
		});
		if let Some(diagnostics) = diagnostics {
			let _ = self.messages.send(Message::Diagnostics(diagnostics));
		}
		self.provider.publish(brackets, generation);
		let _ = self.messages.send(Message::BracketsChanged);
	}

	fn set_state(&self, state: RunState) {
		self.run_state.store(state as u8, Ordering::Release);
	}
}
