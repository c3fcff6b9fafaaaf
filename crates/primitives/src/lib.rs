//! Core types shared by the analysis engine: positions, edits, spans, and styles.

/// Text edits in line/column coordinates and their application to a rope.
pub mod edit;
/// Line and character coordinates.
pub mod range;
/// Rope utilities and the document read interface.
pub mod rope;
/// Styled runs of a single line.
pub mod span;
/// Theme-independent style references and resolved style attributes.
pub mod style;

pub use edit::{EditDelta, EditError, TextEdit};
pub use range::{CharIdx, CharLen, Position};
pub use rope::{TextDocument, line_content_len};
pub use ropey::{Rope, RopeSlice};
pub use span::{LineSpans, Span};
pub use style::{Color, ColorParseError, FontStyle, StyleAttributes, StyleId, TokenKind, TokenStyle};
