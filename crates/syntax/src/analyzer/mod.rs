//! Worker-side incremental analysis.
//!
//! The analyzer owns a private copy of the document together with the state
//! cache, the published spans, and the bracket tree. Edits shift all of them
//! in lockstep; a run then re-tokenizes from the first dirty line until the
//! tokenizer state re-converges with the cache, staging results so that a
//! cancelled run leaves no trace.

mod line;

use std::sync::Arc;

use quill_primitives::{LineSpans, Rope, TextDocument, TextEdit};
use quill_worker::GenerationToken;

use crate::brackets::{BracketTree, LineLeaf};
use crate::cache::{LineState, StateCache};
use crate::config::CompiledConfig;
use crate::error::AnalysisError;
use crate::folding::{FoldingLine, FoldingRegion, compute_regions, leading_whitespace};
use crate::identifiers::SharedIdentifiers;
use crate::styles::{Diagnostic, Diagnostics, StyleUpdateRange, Styles};
use crate::theme::ColorTheme;
use crate::tokenizer::LineTokenizer;

/// Results of a completed run, ready to hand to the receiver.
#[derive(Debug)]
pub(crate) struct Publication {
	pub styles: Arc<Styles>,
	/// `None` replaces all styling.
	pub range: Option<StyleUpdateRange>,
	/// Present when diagnostics changed since the previous publication.
	pub diagnostics: Option<Option<Arc<Diagnostics>>>,
	pub brackets: BracketTree,
	pub generation: u64,
}

#[derive(Debug)]
pub(crate) enum RunOutcome {
	/// Nothing was dirty.
	Idle,
	/// Superseded; staged results were dropped.
	Cancelled,
	Completed(Publication),
}

struct StagedLine<S> {
	line: usize,
	state: LineState<S>,
	spans: LineSpans,
	text: String,
}

pub(crate) struct Analyzer<T: LineTokenizer> {
	tokenizer: T,
	theme: Arc<dyn ColorTheme>,
	config: CompiledConfig,
	rope: Rope,
	cache: StateCache<T::State>,
	spans: Vec<Arc<LineSpans>>,
	tree: BracketTree,
	identifiers: SharedIdentifiers,
	folding: Arc<[FoldingRegion]>,
	diagnostics: Option<Arc<Diagnostics>>,
	generation: u64,
	/// The next publication replaces all styling.
	full_publish: bool,
	/// The line count changed since the last publication.
	lines_changed: bool,
	/// Some spans were resolved with a previous theme.
	recolor_pending: bool,
}

impl<T: LineTokenizer> Analyzer<T> {
	pub(crate) fn new(tokenizer: T, theme: Arc<dyn ColorTheme>, config: CompiledConfig, identifiers: SharedIdentifiers) -> Self {
		let mut analyzer = Self {
			tokenizer,
			theme,
			config,
			rope: Rope::new(),
			cache: StateCache::new(0),
			spans: Vec::new(),
			tree: BracketTree::default(),
			identifiers,
			folding: Arc::from([]),
			diagnostics: None,
			generation: 0,
			full_publish: true,
			lines_changed: false,
			recolor_pending: false,
		};
		analyzer.rebuild();
		analyzer
	}

	/// Discards every cached result and schedules analysis of `text` from line 0.
	pub(crate) fn reset(&mut self, text: &str) {
		self.rope = Rope::from_str(text);
		self.rebuild();
	}

	/// Rebuilds all derived state from the analyzer's own document copy.
	pub(crate) fn rebuild(&mut self) {
		let lines = self.rope.len_lines();
		self.identifiers.update(|tracker| tracker.clear());
		self.cache = StateCache::new(lines);
		let plain = Arc::new(LineSpans::plain(self.theme.plain()));
		self.spans = vec![plain; lines];
		self.tree = BracketTree::from_leaves((0..lines).map(|line| LineLeaf::empty(self.line_len(line))));
		self.full_publish = true;
		self.lines_changed = false;
		self.recolor_pending = false;
	}

	/// Empties the cache and tracker before the session shuts down.
	pub(crate) fn destroy(&mut self) {
		self.cache.clear();
		self.identifiers.update(|tracker| tracker.clear());
		self.spans.clear();
		self.tree = BracketTree::default();
	}

	/// Applies `edit` to the document copy and shifts cache slots, spans, and
	/// bracket leaves to the post-edit line numbers.
	pub(crate) fn apply_edit(&mut self, edit: &TextEdit) -> Result<(), AnalysisError> {
		let delta = edit.apply(&mut self.rope)?;
		let first = delta.start.line;
		let removed = delta.removed_lines();
		let inserted = delta.inserted_lines();

		let first_leaf = self.tree.leaf(first).cloned().unwrap_or_default();
		let last_leaf = self.tree.leaf(delta.old_end.line).cloned().unwrap_or_default();
		let new_lens: Vec<usize> = (first..=delta.new_end.line).map(|line| self.line_len(line)).collect();
		let leaves = LineLeaf::shift_across(&first_leaf, &last_leaf, &delta, &new_lens);
		self.tree = self.tree.splice(first..delta.old_end.line + 1, leaves);

		if removed > 0 {
			let evicted = self.cache.remove_lines(first + 1..first + 1 + removed);
			self.identifiers.update(|tracker| {
				for state in &evicted {
					tracker.remove(state.identifiers());
				}
			});
			let end = (first + 1 + removed).min(self.spans.len());
			self.spans.drain((first + 1).min(end)..end);
		}
		if inserted > 0 {
			self.cache.insert_lines(first + 1, inserted);
			let plain = Arc::new(LineSpans::plain(self.theme.plain()));
			let at = (first + 1).min(self.spans.len());
			self.spans.splice(at..at, std::iter::repeat_n(plain, inserted));
		}
		self.cache.mark_dirty(first..first + inserted + 1);
		self.lines_changed |= delta.changes_line_count();
		self.check_consistency()
	}

	fn check_consistency(&self) -> Result<(), AnalysisError> {
		let document_lines = self.rope.len_lines();
		for cache_lines in [self.cache.len(), self.spans.len(), self.tree.line_count()] {
			if cache_lines != document_lines {
				return Err(AnalysisError::InconsistentCache { cache_lines, document_lines });
			}
		}
		if self.tree.len_chars() != self.rope.len_chars() {
			return Err(AnalysisError::InconsistentCache {
				cache_lines: self.tree.line_count(),
				document_lines,
			});
		}
		Ok(())
	}

	/// Swaps the theme. Recolors immediately when nothing is dirty, otherwise
	/// at the next commit. Never re-tokenizes.
	pub(crate) fn set_theme(&mut self, theme: Arc<dyn ColorTheme>) -> Option<Publication> {
		self.theme = theme;
		if self.cache.has_dirty() {
			self.recolor_pending = true;
			return None;
		}
		self.recolor();
		self.full_publish = false;
		Some(Publication {
			styles: Arc::new(Styles::new(self.spans.clone(), Arc::clone(&self.folding), self.generation)),
			range: None,
			diagnostics: None,
			brackets: self.tree.clone(),
			generation: self.generation,
		})
	}

	fn recolor(&mut self) {
		let theme = Arc::clone(&self.theme);
		for spans in &mut self.spans {
			*spans = Arc::new(spans.recolor(|id| theme.color(id)));
		}
		self.recolor_pending = false;
	}

	pub(crate) fn has_pending_work(&self) -> bool {
		self.cache.has_dirty()
	}

	/// Runs analysis from the first dirty line under `token`.
	pub(crate) fn run(&mut self, token: &GenerationToken) -> RunOutcome {
		let Some(start) = self.cache.first_dirty() else {
			return RunOutcome::Idle;
		};
		let generation = token.generation();
		tracing::trace!(generation, start_line = start, "analysis.run_start");

		let line_count = self.cache.len();
		let mut staged: Vec<StagedLine<T::State>> = Vec::new();
		let mut line = start;
		let mut prev = self.state_before(line);
		loop {
			if token.is_cancelled() {
				tracing::debug!(generation, line, staged = staged.len(), "analysis.run_cancelled");
				return RunOutcome::Cancelled;
			}
			let text = self.line_text(line);
			let (state, spans) = line::analyze_line(&self.tokenizer, self.theme.as_ref(), &self.config, line, &text, &prev);
			let converged = !self.cache.is_dirty(line)
				&& self
					.cache
					.get(line)
					.is_some_and(|old| self.tokenizer.states_equal(&old.tokenizer_state, &state.tokenizer_state));
			prev = state.tokenizer_state.clone();
			staged.push(StagedLine { line, state, spans, text });

			let next = if converged {
				self.cache.next_dirty(line + 1)
			} else {
				Some(line + 1).filter(|next| *next < line_count)
			};
			let Some(next) = next else {
				break;
			};
			if next != line + 1 {
				prev = self.state_before(next);
			}
			line = next;
		}

		if token.is_cancelled() {
			tracing::debug!(generation, staged = staged.len(), "analysis.run_cancelled");
			return RunOutcome::Cancelled;
		}
		tracing::trace!(generation, lines = staged.len(), "analysis.run_complete");
		RunOutcome::Completed(self.commit(staged, generation))
	}

	fn commit(&mut self, staged: Vec<StagedLine<T::State>>, generation: u64) -> Publication {
		let first = staged.first().map_or(0, |entry| entry.line);
		let last = staged.last().map_or(0, |entry| entry.line);

		let brackets = Arc::clone(&self.config.brackets);
		let mut runs: Vec<(usize, Vec<LineLeaf>)> = Vec::new();
		let cache = &mut self.cache;
		let spans = &mut self.spans;
		let rope = &self.rope;
		self.identifiers.update(|tracker| {
			for StagedLine { line, state, spans: line_spans, text } in staged {
				let leaf = LineLeaf::new(line_len(rope, line), brackets.scan(&text, &line_spans));
				if let Some(old) = cache.replace(line, state) {
					tracker.remove(old.identifiers());
				}
				if let Some(new) = cache.get(line) {
					tracker.add(new.identifiers());
				}
				spans[line] = Arc::new(line_spans);
				match runs.last_mut() {
					Some((start, leaves)) if *start + leaves.len() == line => leaves.push(leaf),
					_ => runs.push((line, vec![leaf])),
				}
			}
		});
		for (start, leaves) in runs {
			let end = start + leaves.len();
			self.tree = self.tree.splice(start..end, leaves);
		}

		if self.recolor_pending {
			self.recolor();
			self.full_publish = true;
		}

		self.folding = self.compute_folding();
		let diagnostics = self.collect_diagnostics();
		let diagnostics_changed = diagnostics != self.diagnostics;
		self.diagnostics = diagnostics;

		let range = (!self.full_publish).then(|| StyleUpdateRange {
			start_line: first,
			end_line: if self.lines_changed { self.spans.len().saturating_sub(1) } else { last },
		});
		self.full_publish = false;
		self.lines_changed = false;
		self.generation = generation;

		Publication {
			styles: Arc::new(Styles::new(self.spans.clone(), Arc::clone(&self.folding), generation)),
			range,
			diagnostics: diagnostics_changed.then(|| self.diagnostics.clone()),
			brackets: self.tree.clone(),
			generation,
		}
	}

	fn compute_folding(&self) -> Arc<[FoldingRegion]> {
		let Some(rules) = &self.config.folding else {
			return Arc::from([]);
		};
		let lines: Vec<FoldingLine> = self
			.cache
			.states()
			.map(|state| state.map(LineState::folding_line).unwrap_or_default())
			.collect();
		compute_regions(&lines, rules.offside(), |line| leading_whitespace(&self.line_text(line))).into()
	}

	fn collect_diagnostics(&self) -> Option<Arc<Diagnostics>> {
		let entries: Vec<Diagnostic> = self
			.cache
			.states()
			.enumerate()
			.filter_map(|(line, state)| {
				let error = state?.failure.clone()?;
				Some(Diagnostic { line, error })
			})
			.collect();
		(!entries.is_empty()).then(|| Arc::new(Diagnostics::new(entries)))
	}

	fn state_before(&self, line: usize) -> T::State {
		let cached = line.checked_sub(1).and_then(|prev| self.cache.get(prev));
		match cached {
			Some(state) => state.tokenizer_state.clone(),
			None => self.tokenizer.initial_state(),
		}
	}

	fn line_text(&self, line: usize) -> String {
		self.rope.line_text(line).map(|text| text.into_owned()).unwrap_or_default()
	}

	fn line_len(&self, line: usize) -> usize {
		line_len(&self.rope, line)
	}

	#[cfg(test)]
	pub(crate) fn rope(&self) -> &Rope {
		&self.rope
	}

	#[cfg(test)]
	pub(crate) fn cache(&self) -> &StateCache<T::State> {
		&self.cache
	}

	#[cfg(test)]
	pub(crate) fn tree(&self) -> &BracketTree {
		&self.tree
	}

	#[cfg(test)]
	pub(crate) fn spans(&self) -> &[Arc<LineSpans>] {
		&self.spans
	}

	#[cfg(test)]
	pub(crate) fn folding(&self) -> &[FoldingRegion] {
		&self.folding
	}

	#[cfg(test)]
	pub(crate) fn diagnostics(&self) -> Option<&Diagnostics> {
		self.diagnostics.as_deref()
	}
}

/// Char length of `line` including its terminator.
fn line_len(rope: &Rope, line: usize) -> usize {
	rope.get_line(line).map_or(0, |slice| slice.len_chars())
}
