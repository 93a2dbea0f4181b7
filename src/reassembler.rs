use serde::Serialize;

/// Result of summarizing one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub index: usize,
    pub result: Result<String, String>,
}

impl ChunkOutcome {
    pub fn success(index: usize, summary: impl Into<String>) -> Self {
        Self {
            index,
            result: Ok(summary.into()),
        }
    }

    pub fn failure(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            result: Err(reason.into()),
        }
    }
}

/// A chunk whose summary could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub index: usize,
    pub reason: String,
}

/// Final summary plus which chunks contributed to it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryOutcome {
    /// Successful summaries joined by single spaces, in chunk order
    pub text: String,
    /// Indices of chunks that contributed to `text`
    pub succeeded: Vec<usize>,
    /// Chunks that contributed nothing
    pub failed: Vec<ChunkFailure>,
}

impl SummaryOutcome {
    pub fn total_chunks(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Some but not all chunks failed
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.succeeded.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Join per-chunk summaries in chunk order.
///
/// Outcomes may arrive in any order; they are sorted by index first. Failed
/// chunks leave no placeholder in the text and are reported in `failed`.
pub fn reassemble(outcomes: &[ChunkOutcome]) -> SummaryOutcome {
    let mut ordered: Vec<&ChunkOutcome> = outcomes.iter().collect();
    ordered.sort_by_key(|o| o.index);

    let mut parts: Vec<&str> = Vec::with_capacity(ordered.len());
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    for outcome in ordered {
        match &outcome.result {
            Ok(summary) => {
                parts.push(summary);
                succeeded.push(outcome.index);
            }
            Err(reason) => failed.push(ChunkFailure {
                index: outcome.index,
                reason: reason.clone(),
            }),
        }
    }

    SummaryOutcome {
        text: parts.join(" "),
        succeeded,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outcomes() {
        let outcome = reassemble(&[]);
        assert_eq!(outcome.text, "");
        assert!(outcome.is_empty());
        assert_eq!(outcome.total_chunks(), 0);
        assert!(!outcome.is_partial());
    }

    #[test]
    fn test_joins_in_order() {
        let outcome = reassemble(&[
            ChunkOutcome::success(0, "First part."),
            ChunkOutcome::success(1, "Second part."),
            ChunkOutcome::success(2, "Third part."),
        ]);
        assert_eq!(outcome.text, "First part. Second part. Third part.");
        assert_eq!(outcome.succeeded, vec![0, 1, 2]);
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn test_sorts_out_of_order_outcomes() {
        let outcome = reassemble(&[
            ChunkOutcome::success(2, "c"),
            ChunkOutcome::success(0, "a"),
            ChunkOutcome::success(1, "b"),
        ]);
        assert_eq!(outcome.text, "a b c");
        assert_eq!(outcome.succeeded, vec![0, 1, 2]);
    }

    #[test]
    fn test_failed_middle_chunk_is_omitted() {
        let outcome = reassemble(&[
            ChunkOutcome::success(0, "one"),
            ChunkOutcome::failure(1, "server error"),
            ChunkOutcome::success(2, "three"),
        ]);
        assert_eq!(outcome.text, "one three");
        assert_eq!(outcome.succeeded, vec![0, 2]);
        assert_eq!(
            outcome.failed,
            vec![ChunkFailure {
                index: 1,
                reason: "server error".to_string()
            }]
        );
        assert!(outcome.is_partial());
        assert_eq!(outcome.total_chunks(), 3);
    }

    #[test]
    fn test_all_failed() {
        let outcome = reassemble(&[ChunkOutcome::failure(0, "x"), ChunkOutcome::failure(1, "y")]);
        assert!(outcome.is_empty());
        assert!(!outcome.is_partial());
        assert_eq!(outcome.failed.len(), 2);
    }

    #[test]
    fn test_reassembly_is_idempotent() {
        let outcomes = vec![
            ChunkOutcome::success(1, "beta"),
            ChunkOutcome::failure(2, "timeout"),
            ChunkOutcome::success(0, "alpha"),
        ];
        let first = reassemble(&outcomes);
        let second = reassemble(&outcomes);
        assert_eq!(first, second);
        assert_eq!(first.text, "alpha beta");
    }
}
