//! Per-operation outcome counting
//!
//! The engine reports one `RequestOutcome` per iteration; this collector
//! just counts them per operation name so the end-of-run summary can show
//! the achieved mix and failure rates.

use phloem_core::RequestOutcome;
use std::collections::BTreeMap;

/// Outcome counts for one operation name.
#[derive(Debug, Clone, Default)]
pub struct OperationCounts {
    counts: BTreeMap<&'static str, u64>,
}

impl OperationCounts {
    fn record(&mut self, outcome: RequestOutcome) {
        *self.counts.entry(outcome.as_str()).or_default() += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn ok(&self) -> u64 {
        self.counts.get(RequestOutcome::Ok.as_str()).copied().unwrap_or(0)
    }

    pub fn failed(&self) -> u64 {
        self.total() - self.ok()
    }

    pub fn by_outcome(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counts.iter().map(|(k, v)| (*k, *v))
    }
}

/// Outcome tally across all operations, mergeable across workers.
#[derive(Debug, Clone, Default)]
pub struct OutcomeTally {
    operations: BTreeMap<String, OperationCounts>,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, operation: &str, outcome: RequestOutcome) {
        self.operations.entry(operation.to_string()).or_default().record(outcome);
    }

    pub fn merge(&mut self, other: OutcomeTally) {
        for (operation, counts) in other.operations {
            let entry = self.operations.entry(operation).or_default();
            for (outcome, count) in &counts.counts {
                *entry.counts.entry(outcome).or_default() += count;
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.operations.values().map(|c| c.total()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = (&str, &OperationCounts)> {
        self.operations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Log the summary through tracing.
    pub fn report(&self) {
        for (operation, counts) in self.operations() {
            tracing::info!(
                operation,
                total = counts.total(),
                ok = counts.ok(),
                failed = counts.failed(),
                "operation summary"
            );
            for (outcome, count) in counts.by_outcome() {
                if outcome != RequestOutcome::Ok.as_str() {
                    tracing::info!(operation, outcome, count, "failure breakdown");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_totals() {
        let mut tally = OutcomeTally::new();
        tally.record("read.userById_user", RequestOutcome::Ok);
        tally.record("read.userById_user", RequestOutcome::Ok);
        tally.record("read.userById_user", RequestOutcome::Timeout);
        tally.record("insert.createSingleUser_user", RequestOutcome::Error);

        assert_eq!(tally.total(), 4);
        let (_, reads) = tally.operations().next().unwrap();
        assert_eq!(reads.total(), 1); // BTreeMap order: insert.* sorts first
    }

    #[test]
    fn test_merge_across_workers() {
        let mut a = OutcomeTally::new();
        a.record("read.x_user", RequestOutcome::Ok);
        a.record("read.x_user", RequestOutcome::Timeout);

        let mut b = OutcomeTally::new();
        b.record("read.x_user", RequestOutcome::Ok);
        b.record("update.y_post", RequestOutcome::ServiceUnavailable);

        a.merge(b);
        assert_eq!(a.total(), 4);

        let counts: Vec<_> = a.operations().collect();
        assert_eq!(counts.len(), 2);
        let reads = &counts[0].1;
        assert_eq!(reads.ok(), 2);
        assert_eq!(reads.failed(), 1);
    }
}
