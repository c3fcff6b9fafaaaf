//! The push-only sink for analysis results.

use std::sync::Arc;

use crate::brackets::{BracketPair, BracketProvider, PairedBracket};
use crate::error::AnalysisError;
use crate::styles::{Diagnostics, StyleUpdateRange, Styles};

/// Consumer of published results, driven by [`crate::AnalysisSession::pump`]
/// on the host's thread.
///
/// Receivers may see the same value twice. A [`Styles`] handed over is
/// always complete.
pub trait StyleReceiver {
	/// Replaces all styling, after a reset or a theme change.
	fn set_styles(&mut self, styles: Arc<Styles>);

	/// Styling changed within `range`; lines outside it are unchanged.
	fn update_styles(&mut self, styles: Arc<Styles>, range: StyleUpdateRange);

	fn set_diagnostics(&mut self, diagnostics: Option<Arc<Diagnostics>>) {
		let _ = diagnostics;
	}

	/// Announces the provider for synchronous bracket queries, or its removal.
	fn update_bracket_provider(&mut self, provider: Option<BracketProvider>) {
		let _ = provider;
	}

	/// The pair adjacent to the cursor changed.
	fn update_matched_bracket_pair(&mut self, pair: Option<PairedBracket>) {
		let _ = pair;
	}

	/// The pairs intersecting the visible range changed.
	fn update_bracket_pairs_in_range(&mut self, pairs: Option<Arc<[BracketPair]>>) {
		let _ = pairs;
	}

	/// The worker rejected an edit. Later edits fail with
	/// [`crate::SessionError::ResetRequired`] until the host calls
	/// [`crate::AnalysisSession::reset`] with its current content.
	fn reset_required(&mut self, error: AnalysisError);
}
