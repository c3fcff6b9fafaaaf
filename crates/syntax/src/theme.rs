//! Color lookup for token styles.

use quill_primitives::{Color, StyleAttributes, StyleId, TokenStyle};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// Supplies colors for style ids.
///
/// Swapping the theme on a session recolors cached spans without
/// re-tokenizing.
pub trait ColorTheme: Send + Sync + 'static {
	fn color(&self, style: StyleId) -> Color;

	/// Resolves a token style into concrete attributes.
	fn resolve(&self, style: TokenStyle) -> StyleAttributes {
		StyleAttributes::resolve(style, |id| self.color(id))
	}

	/// Attributes for plain text.
	fn plain(&self) -> StyleAttributes {
		self.resolve(TokenStyle::PLAIN)
	}
}

/// A static id-to-color table.
///
/// [`StyleId::NONE`] always resolves to [`Color::Default`]; ids without an
/// entry fall back to the text color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
	text: Color,
	colors: FxHashMap<StyleId, Color>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PaletteFile {
	#[serde(default)]
	text: Color,
	#[serde(default)]
	styles: Vec<PaletteEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PaletteEntry {
	id: StyleId,
	color: Color,
}

impl Palette {
	pub fn new(text: Color) -> Self {
		Self {
			text,
			colors: FxHashMap::default(),
		}
	}

	pub fn with(mut self, style: StyleId, color: Color) -> Self {
		self.colors.insert(style, color);
		self
	}

	/// Parses a palette from TOML:
	///
	/// ```toml
	/// text = "#d0d0d0"
	/// styles = [{ id = 2, color = "#6a9955" }, { id = 3, color = 4 }]
	/// ```
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let file: PaletteFile = toml::from_str(source)?;
		let colors = file.styles.into_iter().map(|entry| (entry.id, entry.color)).collect();
		Ok(Self { text: file.text, colors })
	}
}

impl ColorTheme for Palette {
	fn color(&self, style: StyleId) -> Color {
		if style == StyleId::NONE {
			return Color::Default;
		}
		self.colors.get(&style).copied().unwrap_or(self.text)
	}
}
