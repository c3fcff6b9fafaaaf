//! Incremental syntax analysis.
//!
//! An [`AnalysisSession`] keeps per-line tokenizer state for one document and
//! re-tokenizes only what an edit can affect, stopping once the state
//! threaded between lines re-converges. Alongside styled spans it maintains
//! folding regions, identifier frequencies, and a persistent bracket tree
//! that answers pair queries synchronously on the host thread.

mod analyzer;
/// Bracket scanning, the persistent bracket tree, and the host-side provider.
pub mod brackets;
/// Per-line tokenizer state cache.
pub mod cache;
/// Analysis options and their compiled form.
pub mod config;
pub mod error;
/// Indentation and marker based folding.
pub mod folding;
/// Identifier occurrence tracking.
pub mod identifiers;
pub mod receiver;
mod session;
/// Published styling snapshots and diagnostics.
pub mod styles;
pub mod theme;
pub mod tokenizer;

#[cfg(test)]
mod testing;

pub use brackets::{BracketId, BracketKind, BracketPair, BracketProvider, BracketSet, BracketSpan, PairedBracket};
pub use config::{AnalysisConfig, BracketPairConfig, CompiledConfig, FoldingConfig, FoldingMarkersConfig};
pub use error::{AnalysisError, ConfigError, SessionError, TokenizeError};
pub use folding::FoldingRegion;
pub use identifiers::{IdentifierTracker, SharedIdentifiers};
pub use receiver::StyleReceiver;
pub use session::{AnalysisSession, RunState};
pub use styles::{Diagnostic, Diagnostics, StyleUpdateRange, Styles};
pub use theme::{ColorTheme, Palette};
pub use tokenizer::{LineTokenizer, LineTokens, RawToken};
