use pretty_assertions::assert_eq;

use super::*;

fn lines(text: &str, markers: Option<&FoldingRules>) -> Vec<FoldingLine> {
	text.lines()
		.map(|line| FoldingLine {
			indent: indent_level(line, 4),
			marker: markers.and_then(|rules| rules.marker(line)),
		})
		.collect()
}

fn regions(text: &str, offside: bool, markers: Option<&FoldingRules>) -> Vec<(usize, usize, usize)> {
	let source: Vec<&str> = text.lines().collect();
	compute_regions(&lines(text, markers), offside, |line| leading_whitespace(source[line]))
		.into_iter()
		.map(|region| (region.start_line, region.end_line, region.start_column))
		.collect()
}

fn marker_rules() -> FoldingRules {
	FoldingRules::new(false, Some(Regex::new(r"(^\s*//\s*region\b)|(?:^\s*//\s*endregion\b)").unwrap()))
}

#[test]
fn indent_level_expands_tabs() {
	assert_eq!(indent_level("    x", 4), Some(4));
	assert_eq!(indent_level("\tx", 4), Some(4));
	assert_eq!(indent_level("  \tx", 4), Some(4));
	assert_eq!(indent_level("\t  x", 2), Some(4));
	assert_eq!(indent_level("x", 4), Some(0));
}

#[test]
fn whitespace_only_lines_have_no_indent() {
	assert_eq!(indent_level("", 4), None);
	assert_eq!(indent_level(" \t  ", 4), None);
}

#[test]
fn brace_block_folds_up_to_closing_line() {
	let text = "fn a() {\n    x\n    y\n}\n";
	assert_eq!(regions(text, false, None), vec![(0, 2, 0)]);
}

#[test]
fn nested_blocks_are_ordered_outer_first() {
	let text = "a\n    b\n        c\n        d\n    e\nf";
	assert_eq!(regions(text, false, None), vec![(0, 4, 0), (1, 3, 4)]);
}

#[test]
fn flat_text_has_no_regions() {
	let text = "a\nb\n\nc";
	assert_eq!(regions(text, false, None), vec![]);
}

#[test]
fn one_nested_line_makes_a_two_line_region() {
	let text = "a\n    b\nc";
	assert_eq!(regions(text, false, None), vec![(0, 1, 0)]);
}

#[test]
fn offside_attaches_blank_lines_to_previous_block() {
	let text = "def f():\n    x\n\n    y\n\ng()";
	assert_eq!(regions(text, false, None), vec![(0, 4, 0)]);
	assert_eq!(regions(text, true, None), vec![(0, 3, 0)]);
}

#[test]
fn markers_fold_inclusive_of_end_marker() {
	let rules = marker_rules();
	let text = "// region setup\nlet a = 1;\nlet b = 2;\n// endregion\nrest";
	assert_eq!(regions(text, false, Some(&rules)), vec![(0, 3, 0)]);
}

#[test]
fn unmatched_start_marker_is_a_regular_line() {
	let rules = marker_rules();
	let text = "// region dangling\n    inner\n    inner\nouter";
	assert_eq!(regions(text, false, Some(&rules)), vec![(0, 2, 0)]);
}

#[test]
fn marker_rules_classify_lines() {
	let rules = marker_rules();
	assert_eq!(rules.marker("  // region x"), Some(FoldingMarker::Start));
	assert_eq!(rules.marker("// endregion"), Some(FoldingMarker::End));
	assert_eq!(rules.marker("// regional"), None);
}
