//! Analysis configuration, loadable from TOML.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::brackets::BracketSet;
use crate::error::ConfigError;
use crate::folding::FoldingRules;

/// User-facing analysis options.
///
/// ```toml
/// tab_size = 2
/// line_timeout_ms = 500
///
/// [[brackets]]
/// open = "("
/// close = ")"
///
/// [folding]
/// offside = true
/// markers = { start = "^\\s*#region", end = "^\\s*#endregion" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
	/// Columns a tab advances to when computing indent levels.
	pub tab_size: u32,
	/// Per-line tokenization budget.
	pub line_timeout_ms: u64,
	/// Whether identifiers are collected into the frequency tracker.
	pub collect_identifiers: bool,
	/// Bracket pairs; the index in this list is the bracket id.
	pub brackets: Vec<BracketPairConfig>,
	/// Folding rules; `None` disables folding.
	pub folding: Option<FoldingConfig>,
}

impl Default for AnalysisConfig {
	fn default() -> Self {
		Self {
			tab_size: 4,
			line_timeout_ms: 2000,
			collect_identifiers: true,
			brackets: vec![
				BracketPairConfig::new("(", ")"),
				BracketPairConfig::new("[", "]"),
				BracketPairConfig::new("{", "}"),
			],
			folding: Some(FoldingConfig::default()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BracketPairConfig {
	pub open: String,
	pub close: String,
}

impl BracketPairConfig {
	pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
		Self {
			open: open.into(),
			close: close.into(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FoldingConfig {
	/// Whitespace-only lines attach to the block above them.
	pub offside: bool,
	/// Explicit region markers, matched against each line.
	pub markers: Option<FoldingMarkersConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FoldingMarkersConfig {
	pub start: String,
	pub end: String,
}

/// Validated configuration in the form the analyzer consumes.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
	pub tab_size: u32,
	pub line_timeout: Duration,
	pub collect_identifiers: bool,
	pub brackets: Arc<BracketSet>,
	pub folding: Option<FoldingRules>,
}

impl AnalysisConfig {
	/// Parses a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	/// Validates the options and compiles patterns and bracket tables.
	pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
		if self.tab_size == 0 {
			return Err(ConfigError::InvalidTabSize);
		}
		let brackets = BracketSet::new(self.brackets.iter().map(|pair| (pair.open.as_str(), pair.close.as_str())))?;
		let folding = self
			.folding
			.as_ref()
			.map(|folding| {
				let markers = folding
					.markers
					.as_ref()
					.map(|markers| {
						let pattern = format!("({})|(?:{})", markers.start, markers.end);
						Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern { pattern, source })
					})
					.transpose()?;
				Ok::<_, ConfigError>(FoldingRules::new(folding.offside, markers))
			})
			.transpose()?;
		Ok(CompiledConfig {
			tab_size: self.tab_size,
			line_timeout: Duration::from_millis(self.line_timeout_ms),
			collect_identifiers: self.collect_identifiers,
			brackets: Arc::new(brackets),
			folding,
		})
	}
}
