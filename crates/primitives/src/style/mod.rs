//! Style references produced by tokenizers and the attributes they resolve to.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Theme-independent style slot, resolved to a color by the active theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleId(pub u32);

impl StyleId {
	/// No explicit style; resolves to [`Color::Default`].
	pub const NONE: Self = Self(0);
	/// Normal text foreground.
	pub const TEXT_NORMAL: Self = Self(1);
}

bitflags! {
	/// Font modifiers carried by a token style.
	#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
	pub struct FontStyle: u8 {
		const BOLD = 1 << 0;
		const ITALIC = 1 << 1;
		const STRIKETHROUGH = 1 << 2;
		const UNDERLINE = 1 << 3;
	}
}

/// Style reference attached to a token before theme resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TokenStyle {
	pub foreground: StyleId,
	pub background: StyleId,
	pub font: FontStyle,
}

impl TokenStyle {
	/// Plain text style used for unstyled runs and failed lines.
	pub const PLAIN: Self = Self {
		foreground: StyleId::TEXT_NORMAL,
		background: StyleId::NONE,
		font: FontStyle::empty(),
	};
}

/// Lexical category of a token.
///
/// Bracket matching and identifier collection only look at [`TokenKind::Other`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	#[default]
	Other,
	Comment,
	String,
	Regex,
}

impl TokenKind {
	/// Returns true for tokens that are plain code rather than literals or comments.
	#[inline]
	pub const fn is_code(self) -> bool {
		matches!(self, Self::Other)
	}
}

/// A concrete color value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub enum Color {
	/// The receiver's default color.
	#[default]
	Default,
	/// Palette index.
	Indexed(u8),
	Rgb(u8, u8, u8),
}

/// Error parsing a color literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color `{0}`: expected `default`, `#rrggbb`, or a palette index")]
pub struct ColorParseError(pub String);

impl FromStr for Color {
	type Err = ColorParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.eq_ignore_ascii_case("default") {
			return Ok(Self::Default);
		}
		if let Some(hex) = s.strip_prefix('#') {
			if hex.len() != 6 || !hex.is_ascii() {
				return Err(ColorParseError(s.to_string()));
			}
			let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| ColorParseError(s.to_string()));
			return Ok(Self::Rgb(channel(0)?, channel(2)?, channel(4)?));
		}
		s.parse::<u8>().map(Self::Indexed).map_err(|_| ColorParseError(s.to_string()))
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Default => f.write_str("default"),
			Self::Indexed(idx) => write!(f, "{idx}"),
			Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
	Index(u8),
	Literal(String),
}

impl TryFrom<ColorRepr> for Color {
	type Error = ColorParseError;

	fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
		match repr {
			ColorRepr::Index(idx) => Ok(Self::Indexed(idx)),
			ColorRepr::Literal(s) => s.parse(),
		}
	}
}

impl From<Color> for String {
	fn from(color: Color) -> Self {
		color.to_string()
	}
}

/// Colors and modifiers of a span after theme resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StyleAttributes {
	pub foreground: Color,
	pub background: Color,
	pub bold: bool,
	pub italic: bool,
	pub strikethrough: bool,
	/// Set for underlined tokens; takes the foreground color.
	pub underline_color: Option<Color>,
}

impl StyleAttributes {
	/// Resolves `style` with `lookup` mapping style ids to colors.
	pub fn resolve(style: TokenStyle, lookup: impl Fn(StyleId) -> Color) -> Self {
		let foreground = lookup(style.foreground);
		Self {
			foreground,
			background: lookup(style.background),
			bold: style.font.contains(FontStyle::BOLD),
			italic: style.font.contains(FontStyle::ITALIC),
			strikethrough: style.font.contains(FontStyle::STRIKETHROUGH),
			underline_color: style.font.contains(FontStyle::UNDERLINE).then_some(foreground),
		}
	}
}
