//! Colorized diff output
//!
//! Renders the YAML before/after of a module [`Diff`] as a unified diff
//! using the similar crate.

use colored::Colorize;
use similar::{ChangeTag, DiffOp, TextDiff};
use sodalite_k8s::modules::Diff;

/// Extract hunk range information from diff operations
/// Returns (old_start, old_len, new_start, new_len) in 1-based line numbers for display
fn hunk_ranges(ops: &[DiffOp]) -> (usize, usize, usize, usize) {
    let (Some(first), Some(last)) = (ops.first(), ops.last()) else {
        return (1, 0, 1, 0);
    };
    let old_start = first.old_range().start;
    let new_start = first.new_range().start;
    let old_len = last.old_range().end.saturating_sub(old_start);
    let new_len = last.new_range().end.saturating_sub(new_start);
    (old_start + 1, old_len, new_start + 1, new_len)
}

/// Diff display options
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Number of context lines to show
    pub context_lines: usize,
    /// Use colors
    pub use_color: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            use_color: true,
        }
    }
}

/// Colorized diff generator
pub struct ColorizedDiff {
    options: DiffOptions,
}

impl ColorizedDiff {
    /// Create a new colorized diff with custom options
    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    fn paint(&self, text: String, tag: Option<ChangeTag>) -> String {
        if !self.options.use_color {
            return text;
        }
        match tag {
            Some(ChangeTag::Delete) => text.red().to_string(),
            Some(ChangeTag::Insert) => text.green().to_string(),
            Some(ChangeTag::Equal) => text.dimmed().to_string(),
            None => text.cyan().to_string(),
        }
    }

    /// Unified diff between two texts
    pub fn diff(&self, old: &str, new: &str, old_name: &str, new_name: &str) -> String {
        let diff = TextDiff::from_lines(old, new);
        let mut output = String::new();

        output.push_str(&self.paint(format!("--- {}\n", old_name), Some(ChangeTag::Delete)));
        output.push_str(&self.paint(format!("+++ {}\n", new_name), Some(ChangeTag::Insert)));

        for hunk in diff
            .unified_diff()
            .context_radius(self.options.context_lines)
            .iter_hunks()
        {
            let (old_start, old_len, new_start, new_len) = hunk_ranges(hunk.ops());
            output.push_str(&self.paint(
                format!("@@ -{},{} +{},{} @@\n", old_start, old_len, new_start, new_len),
                None,
            ));

            for change in hunk.iter_changes() {
                let line = change.value();
                let line = if line.ends_with('\n') {
                    line.to_string()
                } else {
                    format!("{}\n\\ No newline at end of file\n", line)
                };
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                output.push_str(&self.paint(format!("{}{}", sign, line), Some(change.tag())));
            }
        }

        output
    }

    /// Unified diff of a module result, labelled with the object it describes
    pub fn render(&self, diff: &Diff, object: &str) -> String {
        self.diff(
            &diff.before,
            &diff.after,
            &format!("{} (cluster)", object),
            &format!("{} (desired)", object),
        )
    }

    /// Line counts of additions and deletions
    pub fn summary(&self, old: &str, new: &str) -> DiffSummary {
        let diff = TextDiff::from_lines(old, new);
        let mut summary = DiffSummary::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => summary.additions += 1,
                ChangeTag::Delete => summary.deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        summary
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of lines added
    pub additions: usize,
    /// Number of lines deleted
    pub deletions: usize,
}

impl DiffSummary {
    /// Format as a colored string
    pub fn format(&self, use_color: bool) -> String {
        let mut parts = Vec::new();

        if self.additions > 0 {
            let s = format!("+{}", self.additions);
            parts.push(if use_color { s.green().to_string() } else { s });
        }

        if self.deletions > 0 {
            let s = format!("-{}", self.deletions);
            parts.push(if use_color { s.red().to_string() } else { s });
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ColorizedDiff {
        ColorizedDiff::with_options(DiffOptions {
            use_color: false,
            ..DiffOptions::default()
        })
    }

    #[test]
    fn test_unified_diff() {
        let out = plain().diff("a: 1\nb: 2\n", "a: 1\nb: 3\n", "before", "after");
        assert!(out.starts_with("--- before\n+++ after\n"));
        assert!(out.contains("@@ -1,2 +1,2 @@"));
        assert!(out.contains("-b: 2\n"));
        assert!(out.contains("+b: 3\n"));
        assert!(out.contains(" a: 1\n"));
    }

    #[test]
    fn test_render_labels_object() {
        let diff = Diff::new("", "kind: Namespace\n");
        let out = plain().render(&diff, "Namespace 'foo'");
        assert!(out.contains("--- Namespace 'foo' (cluster)"));
        assert!(out.contains("+kind: Namespace"));
    }

    #[test]
    fn test_summary() {
        let summary = plain().summary("a\nb\n", "a\nc\nd\n");
        assert_eq!(
            summary,
            DiffSummary {
                additions: 2,
                deletions: 1
            }
        );
        assert_eq!(summary.format(false), "+2, -1");
        assert_eq!(DiffSummary::default().format(false), "no changes");
    }
}
