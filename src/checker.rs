//! Output checker
//!
//! Compares program output with the expected answer line by line. Trailing
//! whitespace and trailing blank lines never count as differences. When
//! debug filtering is on, debug lines are removed from the program output
//! first and their presence is reported alongside the result.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Result of comparing actual output with expected output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    Match { debug_lines_suppressed: bool },
    Mismatch { rendered_diff: String },
}

impl ComparisonOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ComparisonOutcome::Match { .. })
    }
}

/// One step of a line edit script from actual output to expected output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Equal(String),
    /// Printed by the program but not expected
    Removed(String),
    /// Expected but not printed
    Inserted(String),
    /// Printed `actual` where `expected` was expected
    Replaced { actual: String, expected: String },
}

impl DiffLine {
    pub fn is_equal(&self) -> bool {
        matches!(self, DiffLine::Equal(_))
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffLine::Equal(line) => write!(f, "  {}", line),
            DiffLine::Removed(line) => write!(f, "- {}", line),
            DiffLine::Inserted(line) => write!(f, "+ {}", line),
            DiffLine::Replaced { actual, expected } => write!(f, "- {}\n+ {}", actual, expected),
        }
    }
}

/// Above this many table cells the middle section is reported as a block
/// replacement instead of running the quadratic alignment
const MAX_ALIGNMENT_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy)]
pub struct Checker {
    ignore_debug: bool,
}

impl Checker {
    pub fn new(ignore_debug: bool) -> Self {
        Self { ignore_debug }
    }

    pub fn compare(&self, actual: &str, expected: &str) -> ComparisonOutcome {
        let (actual_lines, debug_lines_suppressed) = if self.ignore_debug {
            strip_debug(actual)
        } else {
            (normalize(actual), false)
        };
        let expected_lines = normalize(expected);

        let diff = diff_lines(&actual_lines, &expected_lines);
        if diff.iter().all(DiffLine::is_equal) {
            ComparisonOutcome::Match {
                debug_lines_suppressed,
            }
        } else {
            ComparisonOutcome::Mismatch {
                rendered_diff: render(&diff),
            }
        }
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Split into lines without trailing whitespace, dropping trailing blank lines
pub fn normalize(output: &str) -> Vec<String> {
    let mut lines: Vec<String> = output.lines().map(|line| line.trim_end().to_string()).collect();
    while lines.last().map(|s| s.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

fn debug_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^\s*(?:debug|dbg)\b").expect("valid regex"))
}

fn debug_fragment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\(\s*(?:debug|dbg)\s*:[^)]*\)").expect("valid regex"))
}

/// Normalize `output` with debug lines and inline debug fragments removed.
/// Returns whether anything was removed.
pub fn strip_debug(output: &str) -> (Vec<String>, bool) {
    let mut suppressed = false;
    let mut lines = Vec::new();

    for line in output.lines() {
        if debug_line_pattern().is_match(line) {
            suppressed = true;
            continue;
        }
        if debug_fragment_pattern().is_match(line) {
            suppressed = true;
            let rest = debug_fragment_pattern().replace_all(line, "");
            // A line made only of debug fragments disappears entirely
            if rest.trim().is_empty() {
                continue;
            }
            lines.push(rest.trim_end().to_string());
            continue;
        }
        lines.push(line.trim_end().to_string());
    }

    while lines.last().map(|s: &String| s.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    (lines, suppressed)
}

/// Minimal line edit script turning `actual` into `expected`
pub fn diff_lines(actual: &[String], expected: &[String]) -> Vec<DiffLine> {
    let prefix = actual
        .iter()
        .zip(expected)
        .take_while(|(a, e)| a == e)
        .count();
    let suffix = actual[prefix..]
        .iter()
        .rev()
        .zip(expected[prefix..].iter().rev())
        .take_while(|(a, e)| a == e)
        .count();

    let mid_actual = &actual[prefix..actual.len() - suffix];
    let mid_expected = &expected[prefix..expected.len() - suffix];

    let mut ops: Vec<DiffLine> = actual[..prefix]
        .iter()
        .map(|line| DiffLine::Equal(line.clone()))
        .collect();
    ops.extend(pair_replacements(align(mid_actual, mid_expected)));
    ops.extend(
        actual[actual.len() - suffix..]
            .iter()
            .map(|line| DiffLine::Equal(line.clone())),
    );
    ops
}

/// Longest-common-subsequence alignment, removals before insertions
fn align(actual: &[String], expected: &[String]) -> Vec<DiffLine> {
    let (n, m) = (actual.len(), expected.len());

    if n.saturating_mul(m) > MAX_ALIGNMENT_CELLS {
        let mut ops: Vec<DiffLine> = actual.iter().map(|l| DiffLine::Removed(l.clone())).collect();
        ops.extend(expected.iter().map(|l| DiffLine::Inserted(l.clone())));
        return ops;
    }

    // lcs[i * (m + 1) + j] = LCS length of actual[i..] and expected[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if actual[i] == expected[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if actual[i] == expected[j] {
            ops.push(DiffLine::Equal(actual[i].clone()));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(DiffLine::Removed(actual[i].clone()));
            i += 1;
        } else {
            ops.push(DiffLine::Inserted(expected[j].clone()));
            j += 1;
        }
    }
    ops.extend(actual[i..].iter().map(|l| DiffLine::Removed(l.clone())));
    ops.extend(expected[j..].iter().map(|l| DiffLine::Inserted(l.clone())));
    ops
}

/// Pair each run of removals with the insertions that directly follow it
fn pair_replacements(ops: Vec<DiffLine>) -> Vec<DiffLine> {
    let mut result = Vec::with_capacity(ops.len());
    let mut iter = ops.into_iter().peekable();

    while let Some(op) = iter.next() {
        let DiffLine::Removed(first) = op else {
            result.push(op);
            continue;
        };

        let mut removed = vec![first];
        while let Some(DiffLine::Removed(_)) = iter.peek() {
            if let Some(DiffLine::Removed(line)) = iter.next() {
                removed.push(line);
            }
        }
        let mut inserted = Vec::new();
        while let Some(DiffLine::Inserted(_)) = iter.peek() {
            if let Some(DiffLine::Inserted(line)) = iter.next() {
                inserted.push(line);
            }
        }

        let paired = removed.len().min(inserted.len());
        let mut removed = removed.into_iter();
        let mut inserted = inserted.into_iter();
        for (actual, expected) in removed.by_ref().zip(inserted.by_ref()).take(paired) {
            result.push(DiffLine::Replaced { actual, expected });
        }
        result.extend(removed.map(DiffLine::Removed));
        result.extend(inserted.map(DiffLine::Inserted));
    }

    result
}

pub fn render(diff: &[DiffLine]) -> String {
    diff.iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &[&str]) -> Vec<String> {
        s.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(
            Checker::default().compare("hello\nworld\n", "hello\nworld\n"),
            ComparisonOutcome::Match {
                debug_lines_suppressed: false
            }
        );
    }

    #[test]
    fn test_trailing_whitespace_and_newlines_are_ignored() {
        let checker = Checker::new(false);
        assert!(checker.compare("hello  \nworld\t\n", "hello\nworld\n").is_match());
        assert!(checker.compare("hello\nworld\n\n\n", "hello\nworld").is_match());
        assert!(checker.compare("hello\nworld", "hello\nworld\n\n").is_match());
        assert!(checker.compare("a\r\nb\r\n", "a\nb\n").is_match());
    }

    #[test]
    fn test_empty_outputs() {
        let checker = Checker::default();
        assert!(checker.compare("", "").is_match());
        assert!(checker.compare("\n\n", "").is_match());
        assert!(!checker.compare("", "1\n").is_match());
    }

    #[test]
    fn test_debug_lines_are_suppressed() {
        let actual = "DEBUG: n = 3\n6\ndbg visiting 2\n";
        assert_eq!(
            Checker::new(true).compare(actual, "6\n"),
            ComparisonOutcome::Match {
                debug_lines_suppressed: true
            }
        );
        assert!(!Checker::new(false).compare(actual, "6\n").is_match());
    }

    #[test]
    fn test_inline_debug_fragment_is_removed() {
        let (lines, suppressed) = strip_debug("6 (dbg: sum of 1..3)\n(debug: only this)\n7\n");
        assert!(suppressed);
        assert_eq!(lines, ["6", "7"]);
    }

    #[test]
    fn test_debug_token_must_be_a_whole_word() {
        let (lines, suppressed) = strip_debug("debugger\ndbgx\n");
        assert!(!suppressed);
        assert_eq!(lines, ["debugger", "dbgx"]);
    }

    #[test]
    fn test_debug_lines_never_show_up_in_diff() {
        let outcome = Checker::new(true).compare("debug x\n5\n", "6\n");
        assert_eq!(
            outcome,
            ComparisonOutcome::Mismatch {
                rendered_diff: "- 5\n+ 6".to_string()
            }
        );
    }

    #[test]
    fn test_replaced_line_renders_removed_then_inserted() {
        let diff = diff_lines(&lines(&["5"]), &lines(&["6"]));
        assert_eq!(
            diff,
            [DiffLine::Replaced {
                actual: "5".to_string(),
                expected: "6".to_string()
            }]
        );
        assert_eq!(render(&diff), "- 5\n+ 6");
    }

    #[test]
    fn test_diff_keeps_common_lines_equal() {
        let diff = diff_lines(&lines(&["1", "2", "x", "4"]), &lines(&["1", "2", "3", "4", "5"]));
        assert_eq!(
            render(&diff),
            "  1\n  2\n- x\n+ 3\n  4\n+ 5"
        );
    }

    #[test]
    fn test_missing_and_extra_lines() {
        let diff = diff_lines(&lines(&["a", "b", "c"]), &lines(&["a", "c"]));
        assert_eq!(
            diff,
            [
                DiffLine::Equal("a".to_string()),
                DiffLine::Removed("b".to_string()),
                DiffLine::Equal("c".to_string())
            ]
        );

        let diff = diff_lines(&lines(&[]), &lines(&["a"]));
        assert_eq!(diff, [DiffLine::Inserted("a".to_string())]);
    }

    #[test]
    fn test_edit_script_is_minimal() {
        let actual = lines(&["a", "b", "c", "d", "e"]);
        let expected = lines(&["b", "c", "x", "e", "f"]);
        let diff = diff_lines(&actual, &expected);
        let equal = diff.iter().filter(|d| d.is_equal()).count();
        // LCS is b, c, e
        assert_eq!(equal, 3);
    }

    #[test]
    fn test_oversized_input_falls_back_to_block_replacement() {
        let actual: Vec<String> = (0..3000).map(|i| format!("a{}", i)).collect();
        let expected: Vec<String> = (0..3000).map(|i| format!("b{}", i)).collect();
        let diff = diff_lines(&actual, &expected);
        assert_eq!(diff.len(), 3000);
        assert!(diff.iter().all(|d| matches!(d, DiffLine::Replaced { .. })));
    }
}
