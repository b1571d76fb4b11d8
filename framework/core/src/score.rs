use itertools::Itertools;

/// Running total for one benchmark run.
///
/// Points may go negative while the run is in progress. [BenchScore::finalize] clamps the total
/// to zero once, when the run is reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchScore {
    pub points: i64,
    /// Error messages in arrival order, duplicates included.
    pub errors: Vec<String>,
}

impl BenchScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero score carrying a single error, used when a run is aborted.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            points: 0,
            errors: vec![error.into()],
        }
    }

    pub fn add(&mut self, points: i64, error: Option<String>) {
        self.points += points;
        if let Some(error) = error {
            self.errors.push(error);
        }
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn finalize(&mut self) {
        if self.points < 0 {
            self.points = 0;
        }
    }

    /// Distinct error messages in first-seen order, each followed by a newline.
    ///
    /// Blank messages are skipped.
    pub fn error_message(&self) -> String {
        self.errors
            .iter()
            .filter(|e| !e.is_empty() && e.as_str() != "\n" && e.as_str() != " ")
            .unique()
            .map(|e| format!("{e}\n"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_total_can_go_negative() {
        let mut score = BenchScore::new();
        score.add(-100, Some("post request timeout".to_string()));
        assert_eq!(score.points, -100);

        score.add(30, None);
        assert_eq!(score.points, -70);

        score.finalize();
        assert_eq!(score.points, 0);
    }

    #[test]
    fn positive_total_is_untouched_by_finalize() {
        let mut score = BenchScore::new();
        score.add(12, None);
        score.add(-10, Some("boom".to_string()));
        score.finalize();
        assert_eq!(score.points, 2);
    }

    #[test]
    fn error_message_is_deduplicated_in_order() {
        let mut score = BenchScore::new();
        for e in ["b", "a", "", "b", " ", "\n", "c", "a"] {
            score.record_error(e);
        }
        assert_eq!(score.error_message(), "b\na\nc\n");
    }

    #[test]
    fn failed_score_is_zero_with_error() {
        let score = BenchScore::failed("initialize failed");
        assert_eq!(score.points, 0);
        assert_eq!(score.error_message(), "initialize failed\n");
    }
}
