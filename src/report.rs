//! The ordered run report, accumulated across all account checks and
//! delivered once at the end of a run.

/// Append-only sequence of human-readable report lines.
///
/// Each account walk builds its own `Report`; the orchestrator merges them
/// in account order, so there is no shared mutable state between checks.
#[derive(Debug, Clone, Default)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line verbatim (section markers like "checking account: ...").
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Appends an indented informational line.
    pub fn info(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("  - {}", line.as_ref()));
    }

    /// Appends an error line.
    pub fn error(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("!! {}", line.as_ref()));
    }

    /// Appends all lines of `other`, preserving order.
    pub fn extend(&mut self, other: Report) {
        self.lines.extend(other.lines);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Joins all lines into the notification body.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut report = Report::new();
        report.push("checking account: a@x.com");
        report.info("entered email, clicked next");
        report.error("password input not found");

        assert_eq!(report.len(), 3);
        assert_eq!(report.lines()[0], "checking account: a@x.com");
        assert_eq!(report.lines()[1], "  - entered email, clicked next");
        assert_eq!(report.lines()[2], "!! password input not found");
    }

    #[test]
    fn extend_appends_in_order() {
        let mut merged = Report::new();
        merged.push("first");

        let mut second = Report::new();
        second.push("second");
        second.push("third");
        merged.extend(second);

        assert_eq!(merged.render(), "first\nsecond\nthird");
    }

    #[test]
    fn empty_report_renders_empty() {
        let report = Report::new();
        assert!(report.is_empty());
        assert_eq!(report.render(), "");
    }
}
