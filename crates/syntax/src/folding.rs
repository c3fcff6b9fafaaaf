//! Indentation and marker based folding regions.

use regex::Regex;

/// Result of matching a line against the folding marker pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldingMarker {
	Start,
	End,
}

/// Compiled folding rules.
#[derive(Debug, Clone)]
pub struct FoldingRules {
	offside: bool,
	markers: Option<Regex>,
}

impl FoldingRules {
	/// `markers` must have the shape `(start)|(?:end)`; a match of group 1 is
	/// a start marker, any other match an end marker.
	pub fn new(offside: bool, markers: Option<Regex>) -> Self {
		Self { offside, markers }
	}

	pub fn offside(&self) -> bool {
		self.offside
	}

	pub fn marker(&self, line: &str) -> Option<FoldingMarker> {
		let caps = self.markers.as_ref()?.captures(line)?;
		Some(if caps.get(1).is_some() {
			FoldingMarker::Start
		} else {
			FoldingMarker::End
		})
	}
}

/// A collapsible line range. `start_line` stays visible when folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FoldingRegion {
	pub start_line: usize,
	/// Inclusive.
	pub end_line: usize,
	/// Leading whitespace characters on `start_line`.
	pub start_column: usize,
}

/// Per-line folding input, taken from cached line states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FoldingLine {
	/// `None` for whitespace-only lines.
	pub indent: Option<u32>,
	pub marker: Option<FoldingMarker>,
}

/// Visual indent of `line`: spaces count one column, tabs advance to the
/// next multiple of `tab_size`. `None` when the line is blank.
pub fn indent_level(line: &str, tab_size: u32) -> Option<u32> {
	let mut indent = 0u32;
	for ch in line.chars() {
		match ch {
			' ' => indent += 1,
			'\t' => indent += tab_size - indent % tab_size,
			ch if ch.is_whitespace() => {}
			_ => return Some(indent),
		}
	}
	None
}

/// Number of leading whitespace characters of `line`.
pub fn leading_whitespace(line: &str) -> usize {
	line.chars().take_while(|ch| *ch == ' ' || *ch == '\t').count()
}

const SENTINEL: i64 = -1;
const END_MARKER: i64 = -2;

struct OpenRegion {
	indent: i64,
	/// First line below the region.
	end_above: usize,
	line: usize,
}

/// Computes folding regions, scanning from the last line upwards.
///
/// Regions come out ordered by start line, enclosing regions before the
/// regions nested in them. `start_column` maps a start line to its leading
/// whitespace width.
pub fn compute_regions(lines: &[FoldingLine], offside: bool, start_column: impl Fn(usize) -> usize) -> Vec<FoldingRegion> {
	let mut regions = Vec::new();
	let mut open = vec![OpenRegion {
		indent: SENTINEL,
		end_above: lines.len(),
		line: lines.len(),
	}];

	for (line, info) in lines.iter().enumerate().rev() {
		let Some(level) = info.indent else {
			if offside && let Some(previous) = open.last_mut() {
				previous.end_above = line;
			}
			continue;
		};
		let indent = i64::from(level);

		match info.marker {
			Some(FoldingMarker::Start) => {
				if let Some(idx) = open.iter().rposition(|region| region.indent == END_MARKER) {
					open.truncate(idx + 1);
					let previous = &mut open[idx];
					regions.push(FoldingRegion {
						start_line: line,
						end_line: previous.line,
						start_column: start_column(line),
					});
					previous.line = line;
					previous.indent = indent;
					previous.end_above = line;
					continue;
				}
			}
			Some(FoldingMarker::End) => {
				open.push(OpenRegion {
					indent: END_MARKER,
					end_above: line,
					line,
				});
				continue;
			}
			None => {}
		}

		let mut top = open.len() - 1;
		if open[top].indent > indent {
			while top > 0 && open[top].indent > indent {
				open.pop();
				top -= 1;
			}
			let end_line = open[top].end_above.saturating_sub(1);
			if end_line > line {
				regions.push(FoldingRegion {
					start_line: line,
					end_line,
					start_column: start_column(line),
				});
			}
		}
		if open[top].indent == indent {
			open[top].end_above = line;
		} else {
			open.push(OpenRegion {
				indent,
				end_above: line,
				line,
			});
		}
	}

	regions.reverse();
	regions
}

#[cfg(test)]
mod tests;
