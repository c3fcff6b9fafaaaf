use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Instant;

use quill_primitives::{Color, Position, StyleId, TokenKind, TokenStyle};
use quill_syntax::{
	AnalysisConfig, AnalysisError, AnalysisSession, BracketPair, BracketProvider, Diagnostics, LineTokenizer, LineTokens, PairedBracket, Palette, RawToken,
	RunState, SessionError, StyleReceiver, StyleUpdateRange, Styles, TokenizeError,
};

const WORD: StyleId = StyleId(2);
const PUNCT: StyleId = StyleId(3);

/// Stateless tokenizer: words, whitespace runs, and single punctuation chars.
struct Words;

impl LineTokenizer for Words {
	type State = ();

	fn initial_state(&self) {}

	fn tokenize(&self, line: &str, _state: &(), _deadline: Instant) -> Result<LineTokens<()>, TokenizeError> {
		let mut tokens = Vec::new();
		let mut previous: Option<u8> = None;
		for (column, ch) in line.chars().enumerate() {
			let class = if ch.is_whitespace() {
				0
			} else if ch.is_alphanumeric() {
				1
			} else {
				2
			};
			if previous != Some(class) || class == 2 {
				let style = match class {
					0 => TokenStyle::PLAIN,
					1 => TokenStyle { foreground: WORD, ..TokenStyle::PLAIN },
					_ => TokenStyle { foreground: PUNCT, ..TokenStyle::PLAIN },
				};
				tokens.push(RawToken::new(column, style, TokenKind::Other));
			}
			previous = Some(class);
		}
		Ok(LineTokens { tokens, state: () })
	}

	fn states_equal(&self, _a: &(), _b: &()) -> bool {
		true
	}
}

#[derive(Default)]
struct Recorder {
	full: Vec<Arc<Styles>>,
	updates: Vec<StyleUpdateRange>,
	latest: Option<Arc<Styles>>,
	diagnostics: Vec<Option<Arc<Diagnostics>>>,
	provider_events: Vec<bool>,
	rejected: Vec<AnalysisError>,
	provider: Option<BracketProvider>,
	matched: Vec<Option<PairedBracket>>,
	visible: Vec<Option<Arc<[BracketPair]>>>,
}

impl StyleReceiver for Recorder {
	fn set_styles(&mut self, styles: Arc<Styles>) {
		self.latest = Some(Arc::clone(&styles));
		self.full.push(styles);
	}

	fn update_styles(&mut self, styles: Arc<Styles>, range: StyleUpdateRange) {
		self.latest = Some(styles);
		self.updates.push(range);
	}

	fn set_diagnostics(&mut self, diagnostics: Option<Arc<Diagnostics>>) {
		self.diagnostics.push(diagnostics);
	}

	fn reset_required(&mut self, error: AnalysisError) {
		self.rejected.push(error);
	}

	fn update_bracket_provider(&mut self, provider: Option<BracketProvider>) {
		self.provider_events.push(provider.is_some());
		self.provider = provider;
	}

	fn update_matched_bracket_pair(&mut self, pair: Option<PairedBracket>) {
		self.matched.push(pair);
	}

	fn update_bracket_pairs_in_range(&mut self, pairs: Option<Arc<[BracketPair]>>) {
		self.visible.push(pairs);
	}
}

fn palette() -> Palette {
	Palette::new(Color::Indexed(7)).with(WORD, Color::Indexed(4)).with(PUNCT, Color::Indexed(5))
}

fn session(content: &str) -> AnalysisSession {
	let _ = tracing_subscriber::fmt::try_init();
	AnalysisSession::spawn(Words, Arc::new(palette()), &AnalysisConfig::default(), content).unwrap()
}

const SOURCE: &str = "fn main() {\n    call(1);\n}";

#[test]
fn initial_analysis_is_delivered_on_pump() {
	let mut session = session(SOURCE);
	let mut recorder = Recorder::default();
	session.barrier().unwrap();
	assert!(session.pump(&mut recorder) > 0);

	assert_eq!(recorder.full.len(), 1);
	let styles = &recorder.full[0];
	assert_eq!(styles.line_count(), 3);
	assert_eq!(styles.folding().len(), 1);
	assert_eq!(recorder.provider_events, vec![true]);
	assert_eq!(session.run_state(), RunState::Completed);

	let provider = recorder.provider.clone().unwrap();
	let pair = provider.paired_bracket_at(7).and_then(|p| p.pair().copied()).unwrap();
	assert_eq!((pair.open.offset, pair.close.offset, pair.depth), (7, 8, 0));
	let braces = provider.paired_bracket_at(10).and_then(|p| p.pair().copied()).unwrap();
	assert_eq!(braces.close.offset, 25);
	assert_eq!(session.identifiers().count("call"), 1);
}

#[test]
fn edits_publish_partial_updates() {
	let mut session = session(SOURCE);
	let mut recorder = Recorder::default();
	session.barrier().unwrap();
	session.pump(&mut recorder);

	session.insert(Position::new(1, 4), Position::new(1, 8), "let ").unwrap();
	assert_eq!(session.provider().paired_bracket_at(7), None);
	session.barrier().unwrap();
	session.pump(&mut recorder);

	assert_eq!(recorder.updates, vec![StyleUpdateRange { start_line: 1, end_line: 2 }]);
	assert!(session.provider().paired_bracket_at(7).is_some());
	assert_eq!(session.identifiers().count("let"), 1);
	let line = recorder.latest.as_ref().and_then(|styles| styles.line(1)).unwrap();
	assert_eq!(line.span_at(4).style.foreground, WORD);
}

#[test]
fn cursor_and_visible_range_results_follow_the_provider() {
	let mut session = session(SOURCE);
	let mut recorder = Recorder::default();
	session.provider().set_cursor(Some(7));
	session.provider().set_visible_range(Some(0..26));
	session.barrier().unwrap();
	session.pump(&mut recorder);

	assert!(matches!(recorder.matched.last(), Some(Some(PairedBracket::Matched(_)))));
	let visible = recorder.visible.last().cloned().flatten().unwrap();
	assert_eq!(visible.len(), 3);

	session.pump(&mut recorder);
	assert_eq!(recorder.matched.len(), 1);
}

#[test]
fn theme_change_recolors_in_place() {
	let mut session = session(SOURCE);
	let mut recorder = Recorder::default();
	session.barrier().unwrap();
	session.pump(&mut recorder);

	let dark = Palette::new(Color::Indexed(15)).with(WORD, Color::Rgb(1, 2, 3));
	session.set_theme(Arc::new(dark)).unwrap();
	session.barrier().unwrap();
	session.pump(&mut recorder);

	assert_eq!(recorder.full.len(), 2);
	let line = recorder.full[1].line(0).unwrap();
	assert_eq!(line.span_at(0).attributes.foreground, Color::Rgb(1, 2, 3));
}

#[test]
fn reset_replaces_the_document() {
	let mut session = session(SOURCE);
	let mut recorder = Recorder::default();
	session.barrier().unwrap();
	session.pump(&mut recorder);

	session.reset("x\ny").unwrap();
	session.barrier().unwrap();
	session.pump(&mut recorder);
	assert_eq!(recorder.full.len(), 2);
	assert_eq!(recorder.full[1].line_count(), 2);
	assert_eq!(session.identifiers().count("call"), 0);
	assert_eq!(session.identifiers().count("x"), 1);
}

#[test]
fn rejected_edit_asks_the_host_to_reset() {
	let mut session = session("a\nb");
	let mut recorder = Recorder::default();
	session.barrier().unwrap();
	session.pump(&mut recorder);

	session.insert(Position::new(9, 0), Position::new(9, 1), "z").unwrap();
	session.insert(Position::new(0, 0), Position::new(0, 1), "q").unwrap();
	session.barrier().unwrap();
	session.pump(&mut recorder);
	assert_eq!(recorder.rejected.len(), 1);
	assert!(matches!(recorder.rejected[0], AnalysisError::InvalidPosition(_)));
	assert!(session.needs_reset());
	assert_eq!(recorder.full.len(), 1);
	assert!(recorder.updates.is_empty());
	assert_eq!(session.identifiers().count("qa"), 0);
	assert!(matches!(
		session.insert(Position::new(0, 0), Position::new(0, 1), "x"),
		Err(SessionError::ResetRequired)
	));

	session.reset("qa\nb\nz").unwrap();
	assert!(!session.needs_reset());
	session.barrier().unwrap();
	session.pump(&mut recorder);
	assert_eq!(recorder.full.len(), 2);
	assert_eq!(recorder.full[1].line_count(), 3);
	assert_eq!(session.identifiers().count("qa"), 1);
	session.insert(Position::new(2, 1), Position::new(2, 2), "y").unwrap();
	session.barrier().unwrap();
	session.pump(&mut recorder);
	assert_eq!(recorder.updates, vec![StyleUpdateRange { start_line: 2, end_line: 2 }]);
}

/// Wraps [`Words`] and parks the worker on the first line reading `gate`
/// until the test has sent its next edit.
struct Gated(Arc<Gate>);

struct Gate {
	armed: AtomicBool,
	reached: Barrier,
	release: Barrier,
}

impl LineTokenizer for Gated {
	type State = ();

	fn initial_state(&self) {}

	fn tokenize(&self, line: &str, state: &(), deadline: Instant) -> Result<LineTokens<()>, TokenizeError> {
		if line == "gate" && self.0.armed.swap(false, Ordering::SeqCst) {
			self.0.reached.wait();
			self.0.release.wait();
		}
		Words.tokenize(line, state, deadline)
	}

	fn states_equal(&self, _a: &(), _b: &()) -> bool {
		true
	}
}

#[test]
fn edit_during_a_run_supersedes_it() {
	let _ = tracing_subscriber::fmt::try_init();
	let gate = Arc::new(Gate {
		armed: AtomicBool::new(true),
		reached: Barrier::new(2),
		release: Barrier::new(2),
	});
	let config = AnalysisConfig {
		line_timeout_ms: 60_000,
		..AnalysisConfig::default()
	};
	let content = "fn main() {\ngate\n}";
	let mut session = AnalysisSession::spawn(Gated(Arc::clone(&gate)), Arc::new(palette()), &config, content).unwrap();
	let mut recorder = Recorder::default();

	gate.reached.wait();
	assert_eq!(session.run_state(), RunState::Running);
	session.insert(Position::new(0, 0), Position::new(0, 4), "let ").unwrap();
	gate.release.wait();
	session.barrier().unwrap();
	session.pump(&mut recorder);

	assert_eq!(recorder.full.len(), 1);
	assert!(recorder.updates.is_empty());
	assert_eq!(session.run_state(), RunState::Completed);
	let styles = &recorder.full[0];
	assert_eq!(styles.line_count(), 3);
	assert_eq!(styles.line(0).unwrap().span_at(0).style.foreground, WORD);
	assert_eq!(session.identifiers().count("let"), 1);
	assert_eq!(session.identifiers().count("gate"), 1);
	let braces = session.provider().paired_bracket_at(14).and_then(|p| p.pair().copied()).unwrap();
	assert_eq!(braces.close.offset, 21);
}

#[test]
fn destroyed_session_rejects_calls() {
	let mut session = session(SOURCE);
	let mut recorder = Recorder::default();
	session.barrier().unwrap();
	session.pump(&mut recorder);

	let provider = session.provider().clone();
	session.destroy().unwrap();
	assert!(session.is_destroyed());
	assert_eq!(session.run_state(), RunState::Destroyed);
	assert!(matches!(session.insert(Position::new(0, 0), Position::new(0, 1), "x"), Err(SessionError::Destroyed)));
	assert!(matches!(session.barrier(), Err(SessionError::Destroyed)));
	assert!(provider.is_detached());
	assert_eq!(provider.paired_bracket_at(7), None);

	assert_eq!(session.pump(&mut recorder), 0);
	assert_eq!(recorder.provider_events, vec![true, false]);
	session.destroy().unwrap();
}

#[test]
fn invalid_config_fails_to_spawn() {
	let config = AnalysisConfig {
		tab_size: 0,
		..AnalysisConfig::default()
	};
	let err = AnalysisSession::spawn(Words, Arc::new(palette()), &config, "").unwrap_err();
	assert!(matches!(err, SessionError::Config(_)));
}
