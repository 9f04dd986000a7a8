//! Turns a leaf's constraint intervals into a context key, and turns that
//! key back into a human-readable range description for bug-report output
//! (SPEC_FULL.md §4.8, §4.10).

use std::io::BufRead;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::BugReport;
use crate::symbol::{Interval, NAMED_LIMITS};

/// Encodes a symbol's intervals as a stable context-bucket string, e.g.
/// `"0,0"` or `"-2147483648,-1;1,2147483647"`.
pub fn encode_intervals(intervals: &[Interval]) -> String {
    intervals
        .iter()
        .map(|(lo, hi)| format!("{lo},{hi}"))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn decode_intervals(encoded: &str) -> Option<Vec<Interval>> {
    if encoded.is_empty() {
        return Some(Vec::new());
    }
    encoded
        .split(';')
        .map(|pair| {
            let (lo, hi) = pair.split_once(',')?;
            Some((lo.parse().ok()?, hi.parse().ok()?))
        })
        .collect()
}

/// Renders a context key for display: `== N` for a single-point interval,
/// `!= G` when the intervals are exactly "everything but one value" at a
/// recognized integer width, or `in {[lo, hi], ...}` otherwise
/// (SPEC_FULL.md §4.10).
pub fn humanize_range(encoded: &str) -> String {
    let Some(intervals) = decode_intervals(encoded) else {
        return encoded.to_string();
    };
    if intervals.is_empty() {
        return encoded.to_string();
    }
    if intervals.len() == 1 {
        let (lo, hi) = intervals[0];
        if lo == hi {
            return format!("== {lo}");
        }
    }
    if intervals.len() == 2 {
        let (a_lo, a_hi) = intervals[0];
        let (b_lo, b_hi) = intervals[1];
        if a_hi + 2 == b_lo {
            let gap = a_hi + 1;
            if let Some((min_name, _)) = NAMED_LIMITS.iter().find(|(_, v)| *v == a_lo) {
                if let Some((max_name, _)) = NAMED_LIMITS.iter().find(|(_, v)| *v == b_hi) {
                    let _ = (min_name, max_name);
                    return format!("!= {gap}");
                }
            }
        }
    }
    let ranges = intervals
        .iter()
        .map(|(lo, hi)| format!("[{lo},{hi}]"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("in {{{ranges}}}")
}

static LINEMARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^#\s*(\d+)\s*"(.*)""#).unwrap());

/// Resolves `code = orig:logical:line` by re-reading `orig`, tracking
/// GCC-style `# <N> "<file>"` linemarkers to find where `logical:line`
/// actually lives in `orig`'s physical lines (SPEC_FULL.md §4.10, §6). Any
/// resolution failure (unreadable file, line never reached) yields `None`.
pub fn resolve_source_line(code: &str) -> Option<String> {
    let mut parts = code.rsplitn(3, ':');
    let target_line: usize = parts.next()?.parse().ok()?;
    let target_logical = parts.next()?;
    let orig = parts.next()?;

    let file = std::fs::File::open(Path::new(orig)).ok()?;
    let reader = std::io::BufReader::new(file);

    let mut current_file = orig.to_string();
    let mut current_line: usize = 1;

    for line in reader.lines() {
        let line = line.ok()?;
        if let Some(caps) = LINEMARKER_RE.captures(&line) {
            current_line = caps.get(1)?.as_str().parse().ok()?;
            current_file = caps.get(2)?.as_str().to_string();
            continue;
        }
        if current_file == target_logical && current_line == target_line {
            return Some(line);
        }
        current_line += 1;
    }
    None
}

/// Renders one full report line: `{score%} {code} '{key}' {ctx_desc}
/// {references}{\n{source_line}}?` (SPEC_FULL.md §4.10).
pub fn render_report(
    report: &BugReport,
    reference_count: usize,
    humanize: impl Fn(&str) -> String,
) -> String {
    let score_pct = report.score * 100.0;
    let ctx_desc = humanize(&report.ctx);
    let references = report.render_references(reference_count);
    let mut line = format!(
        "{score_pct:.2}% {} '{}' {ctx_desc} {references}",
        report.code, report.key
    );
    if let Some(source_line) = resolve_source_line(&report.code) {
        line.push('\n');
        line.push_str(&source_line);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{INT32_MAX, INT32_MIN};

    #[test]
    fn round_trips_intervals_through_encoding() {
        let intervals = vec![(INT32_MIN, -1), (1, INT32_MAX)];
        let encoded = encode_intervals(&intervals);
        assert_eq!(decode_intervals(&encoded), Some(intervals));
    }

    #[test]
    fn humanizes_single_point_as_equality() {
        assert_eq!(humanize_range(&encode_intervals(&[(0, 0)])), "== 0");
    }

    #[test]
    fn humanizes_full_width_minus_gap_as_not_equal() {
        let intervals = vec![(INT32_MIN, -1), (1, INT32_MAX)];
        assert_eq!(humanize_range(&encode_intervals(&intervals)), "!= 0");
    }

    #[test]
    fn humanizes_arbitrary_intervals_as_set() {
        let intervals = vec![(0, 4), (10, 20)];
        assert_eq!(
            humanize_range(&encode_intervals(&intervals)),
            "in {[0,4], [10,20]}"
        );
    }

    #[test]
    fn resolves_source_line_across_a_linemarker() {
        let path = std::env::temp_dir().join("apisan-render-test.c");
        std::fs::write(&path, "int a;\n# 10 \"orig.c\"\nint b;\nint c;\n").unwrap();
        let code = format!("{}:orig.c:11", path.display());
        assert_eq!(resolve_source_line(&code), Some("int c;".to_string()));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unresolvable_source_line_yields_none() {
        assert_eq!(resolve_source_line("/nonexistent/a.c:a.c:1"), None);
    }

    #[test]
    fn render_report_includes_score_and_references() {
        let report = BugReport::new(
            0.9,
            "a.c:a.c:9".to_string(),
            "foo".to_string(),
            "0,0".to_string(),
        )
        .with_references(["a.c:a.c:1".to_string()].into_iter().collect());
        let line = render_report(&report, 3, humanize_range);
        assert!(line.starts_with("90.00% a.c:a.c:9 'foo' == 0"));
        assert!(line.contains("{a.c:a.c:1}"));
    }
}
