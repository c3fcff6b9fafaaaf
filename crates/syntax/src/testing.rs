//! A small C-like tokenizer and palette shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use quill_primitives::{Color, FontStyle, StyleId, TokenKind, TokenStyle};

use crate::error::TokenizeError;
use crate::theme::Palette;
use crate::tokenizer::{LineTokenizer, LineTokens, RawToken};

pub const IDENT: StyleId = StyleId(2);
pub const PUNCT: StyleId = StyleId(3);
pub const COMMENT: StyleId = StyleId(4);
pub const STRING: StyleId = StyleId(5);

/// Carried across lines: inside a `/* */` comment or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Code,
	Comment,
}

type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// Tokenizes identifiers, punctuation, `//` and `/* */` comments, and
/// double-quoted strings.
///
/// A line containing `FAIL` errors and one containing `PANIC` panics.
#[derive(Clone, Default)]
pub struct CLike {
	calls: Arc<AtomicUsize>,
	seen: Arc<Mutex<Vec<String>>>,
	hook: Option<Hook>,
}

impl CLike {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `hook` before tokenizing each line.
	pub fn with_hook(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
		Self {
			hook: Some(Arc::new(hook)),
			..Self::default()
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Lines tokenized since the last call, in order.
	pub fn take_seen(&self) -> Vec<String> {
		std::mem::take(&mut *self.seen.lock())
	}
}

fn style(foreground: StyleId, font: FontStyle) -> TokenStyle {
	TokenStyle {
		foreground,
		background: StyleId::NONE,
		font,
	}
}

fn is_word(ch: char) -> bool {
	ch.is_alphanumeric() || ch == '_' || ch == '$'
}

impl LineTokenizer for CLike {
	type State = Mode;

	fn initial_state(&self) -> Mode {
		Mode::Code
	}

	fn tokenize(&self, line: &str, state: &Mode, _deadline: Instant) -> Result<LineTokens<Mode>, TokenizeError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.seen.lock().push(line.to_string());
		if let Some(hook) = &self.hook {
			hook(line);
		}
		if line.contains("PANIC") {
			panic!("tokenizer exploded");
		}
		if line.contains("FAIL") {
			return Err(TokenizeError::Failed("FAIL marker".into()));
		}

		let chars: Vec<char> = line.chars().collect();
		let comment = style(COMMENT, FontStyle::ITALIC);
		let mut tokens = Vec::new();
		let mut mode = *state;
		let mut at = 0;
		while at < chars.len() {
			let start = at;
			if mode == Mode::Comment {
				continue_comment(&chars, &mut at, &mut mode);
				tokens.push(RawToken::new(start, comment, TokenKind::Comment));
				continue;
			}
			let ch = chars[at];
			let next = chars.get(at + 1).copied();
			if ch == '/' && next == Some('/') {
				tokens.push(RawToken::new(start, comment, TokenKind::Comment));
				break;
			}
			if ch == '/' && next == Some('*') {
				at += 2;
				mode = Mode::Comment;
				continue_comment(&chars, &mut at, &mut mode);
				tokens.push(RawToken::new(start, comment, TokenKind::Comment));
			} else if ch == '"' {
				at += 1;
				while at < chars.len() && chars[at] != '"' {
					at += 1;
				}
				at = (at + 1).min(chars.len());
				tokens.push(RawToken::new(start, style(STRING, FontStyle::empty()), TokenKind::String));
			} else if ch.is_whitespace() {
				while at < chars.len() && chars[at].is_whitespace() {
					at += 1;
				}
				tokens.push(RawToken::new(start, TokenStyle::PLAIN, TokenKind::Other));
			} else if is_word(ch) {
				while at < chars.len() && is_word(chars[at]) {
					at += 1;
				}
				tokens.push(RawToken::new(start, style(IDENT, FontStyle::empty()), TokenKind::Other));
			} else {
				at += 1;
				tokens.push(RawToken::new(start, style(PUNCT, FontStyle::empty()), TokenKind::Other));
			}
		}
		Ok(LineTokens { tokens, state: mode })
	}

	fn states_equal(&self, a: &Mode, b: &Mode) -> bool {
		a == b
	}
}

fn continue_comment(chars: &[char], at: &mut usize, mode: &mut Mode) {
	while *at < chars.len() {
		if chars[*at] == '*' && chars.get(*at + 1) == Some(&'/') {
			*at += 2;
			*mode = Mode::Code;
			return;
		}
		*at += 1;
	}
}

pub fn palette() -> Palette {
	Palette::new(Color::Indexed(7))
		.with(IDENT, Color::Rgb(200, 200, 255))
		.with(PUNCT, Color::Indexed(3))
		.with(COMMENT, Color::Indexed(8))
		.with(STRING, Color::Rgb(0, 160, 0))
}

/// The same slots as [`palette`] with different colors.
pub fn dark_palette() -> Palette {
	Palette::new(Color::Indexed(15))
		.with(IDENT, Color::Rgb(90, 90, 200))
		.with(PUNCT, Color::Indexed(11))
		.with(COMMENT, Color::Indexed(0))
		.with(STRING, Color::Rgb(0, 90, 0))
}
