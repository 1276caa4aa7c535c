//! Byte-level divergence and windowed line diffs for stdout comparison.

use std::fmt::Write as _;

/// Lines of unchanged context shown around a divergent hunk.
pub const CONTEXT_LINES: usize = 2;

/// Maximum changed lines rendered per side before eliding.
pub const MAX_HUNK_LINES: usize = 20;

/// Position of the first byte where two outputs differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    /// Zero-based byte offset.
    pub offset: usize,
    /// One-based line number containing `offset`.
    pub line: usize,
    /// One-based byte column within that line.
    pub column: usize,
}

/// First divergent byte between `a` and `b`, or `None` when identical.
///
/// When one output is a prefix of the other, the divergence is at the end
/// of the shorter one.
#[must_use]
pub fn first_divergence(a: &[u8], b: &[u8]) -> Option<Divergence> {
    let offset = a
        .iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then_some(a.len().min(b.len())))?;

    let before = &a[..offset.min(a.len())];
    let line = before.iter().filter(|&&byte| byte == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&byte| byte == b'\n')
        .map_or(0, |pos| pos + 1);

    Some(Divergence {
        offset,
        line,
        column: offset - line_start + 1,
    })
}

/// Render a unified-style diff of the region where `left` and `right` differ.
///
/// Only one hunk is produced: common leading and trailing lines are trimmed
/// and `CONTEXT_LINES` of them are kept on each side.
#[must_use]
pub fn render_line_diff(left_label: &str, left: &[u8], right_label: &str, right: &[u8]) -> String {
    let left_text = String::from_utf8_lossy(left);
    let right_text = String::from_utf8_lossy(right);
    let left_lines: Vec<&str> = left_text.split_terminator('\n').collect();
    let right_lines: Vec<&str> = right_text.split_terminator('\n').collect();

    let prefix = left_lines
        .iter()
        .zip(&right_lines)
        .take_while(|(l, r)| l == r)
        .count();
    let max_suffix = left_lines.len().min(right_lines.len()) - prefix;
    let suffix = left_lines
        .iter()
        .rev()
        .zip(right_lines.iter().rev())
        .take(max_suffix)
        .take_while(|(l, r)| l == r)
        .count();

    let removed = &left_lines[prefix..left_lines.len() - suffix];
    let added = &right_lines[prefix..right_lines.len() - suffix];
    let context_start = prefix.saturating_sub(CONTEXT_LINES);
    let trailing_end = (left_lines.len() - suffix + CONTEXT_LINES).min(left_lines.len());

    let mut out = String::new();
    let _ = writeln!(out, "--- {left_label}");
    let _ = writeln!(out, "+++ {right_label}");
    let _ = writeln!(out, "@@ line {} @@", prefix + 1);
    for line in &left_lines[context_start..prefix] {
        let _ = writeln!(out, " {line}");
    }
    push_side(&mut out, '-', removed);
    push_side(&mut out, '+', added);
    for line in &left_lines[left_lines.len() - suffix..trailing_end] {
        let _ = writeln!(out, " {line}");
    }
    if removed.is_empty() && added.is_empty() {
        out.push_str("\\ outputs differ only in trailing newline\n");
    }
    out
}

fn push_side(out: &mut String, marker: char, lines: &[&str]) {
    for line in lines.iter().take(MAX_HUNK_LINES) {
        let _ = writeln!(out, "{marker}{line}");
    }
    if lines.len() > MAX_HUNK_LINES {
        let _ = writeln!(out, "{marker}... ({} more lines)", lines.len() - MAX_HUNK_LINES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_has_no_divergence() {
        assert_eq!(first_divergence(b"10\n", b"10\n"), None);
        assert_eq!(first_divergence(b"", b""), None);
    }

    #[test]
    fn divergence_reports_line_and_column() {
        let d = first_divergence(b"a\nbc\n", b"a\nbd\n").unwrap();
        assert_eq!(
            d,
            Divergence {
                offset: 3,
                line: 2,
                column: 2
            }
        );
    }

    #[test]
    fn prefix_divergence_at_shorter_end() {
        let d = first_divergence(b"10", b"10\n").unwrap();
        assert_eq!(d.offset, 2);
        assert_eq!(d.line, 1);
        assert_eq!(d.column, 3);
    }

    #[test]
    fn diff_keeps_context() {
        let left = b"0\n1\n2\n3\n4\n5\n";
        let right = b"0\n1\n2\nX\n4\n5\n";
        let diff = render_line_diff("baseline", left, "optimized", right);
        insta::assert_snapshot!(diff, @r"
        --- baseline
        +++ optimized
        @@ line 4 @@
         1
         2
        -3
        +X
         4
         5
        ");
    }

    #[test]
    fn diff_elides_long_hunks() {
        let left: String = (0..30).map(|i| format!("{i}\n")).collect();
        let right: String = (0..30).map(|i| format!("{}\n", i + 1000)).collect();
        let diff = render_line_diff("a", left.as_bytes(), "b", right.as_bytes());
        assert!(diff.contains("-... (10 more lines)"));
        assert!(diff.contains("+... (10 more lines)"));
    }

    #[test]
    fn diff_trailing_newline_only() {
        let diff = render_line_diff("a", b"10", "b", b"10\n");
        assert!(diff.contains("trailing newline"));
    }
}
