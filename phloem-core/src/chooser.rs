//! Weighted operation selection
//!
//! Builds an immutable weighted distribution over every declared
//! `<class>.<name>_<table>` operation once at initialization, and samples
//! one per benchmark iteration. Operations with non-positive proportion
//! are omitted entirely; an empty distribution is a valid terminal state
//! and sampling returns `None`.

use crate::config::{OperationClassConfig, OperationMix};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Operation class prefixes recognized by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Read,
    Update,
    Insert,
}

impl OperationClass {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationClass::Read => "read",
            OperationClass::Update => "update",
            OperationClass::Insert => "insert",
        }
    }
}

/// A parsed operation: class, query name, and target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub class: OperationClass,
    pub query: String,
    pub table: String,
}

impl Operation {
    /// Parse a chooser result of the form `<class>.<name>_<table>`.
    ///
    /// A string without a recognized class prefix is treated as a bare read
    /// operation against `default_table` (compatibility fallback, not an
    /// error path).
    pub fn parse(choice: &str, default_table: &str) -> Operation {
        let (class, rest) = if let Some(rest) = choice.strip_prefix("read.") {
            (OperationClass::Read, rest)
        } else if let Some(rest) = choice.strip_prefix("update.") {
            (OperationClass::Update, rest)
        } else if let Some(rest) = choice.strip_prefix("insert.") {
            (OperationClass::Insert, rest)
        } else {
            return Operation {
                class: OperationClass::Read,
                query: choice.to_string(),
                table: default_table.to_string(),
            };
        };

        match rest.split_once('_') {
            Some((query, table)) => Operation {
                class,
                query: query.to_string(),
                table: table.to_string(),
            },
            None => Operation {
                class,
                query: rest.to_string(),
                table: default_table.to_string(),
            },
        }
    }
}

struct WeightedOperation {
    name: String,
    cumulative: f64,
}

/// Weighted discrete distribution over operation names.
///
/// Entries keep insertion order; sampling draws uniform in
/// `[0, total_weight)` and returns the first entry whose cumulative weight
/// strictly exceeds the draw.
pub struct OperationChooser {
    entries: Vec<WeightedOperation>,
    total_weight: f64,
    rng: SmallRng,
}

impl OperationChooser {
    /// Build the chooser from the configured operation mix.
    pub fn from_config(mix: &OperationMix, seed: Option<u64>) -> Self {
        let mut chooser = Self::with_entries(Vec::new(), seed);
        chooser.add_class("read", &mix.read);
        chooser.add_class("update", &mix.update);
        chooser.add_class("insert", &mix.insert);
        chooser
    }

    /// Build directly from `(name, weight)` pairs; non-positive weights are
    /// skipped.
    pub fn with_entries(entries: Vec<(String, f64)>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        };
        let mut chooser = Self { entries: Vec::new(), total_weight: 0.0, rng };
        for (name, weight) in entries {
            chooser.add(name, weight);
        }
        chooser
    }

    fn add_class(&mut self, class: &str, cfg: &OperationClassConfig) {
        for query_with_table in &cfg.queries {
            let query = query_with_table.split('_').next().unwrap_or(query_with_table);
            let proportion = cfg.weights.get(query).copied().unwrap_or(0.0);
            if proportion > 0.0 {
                self.add(format!("{class}.{query_with_table}"), cfg.proportion * proportion);
            }
        }
    }

    fn add(&mut self, name: String, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        self.total_weight += weight;
        self.entries.push(WeightedOperation { name, cumulative: self.total_weight });
    }

    /// Sample one operation name, or `None` if the distribution is empty.
    pub fn choose(&mut self) -> Option<String> {
        if self.total_weight <= 0.0 {
            return None;
        }
        let draw = self.rng.random::<f64>() * self.total_weight;
        for entry in &self.entries {
            if entry.cumulative > draw {
                return Some(entry.name.clone());
            }
        }
        // Floating-point edge: draw landed on the total; take the last entry.
        self.entries.last().map(|entry| entry.name.clone())
    }

    /// Create an independent chooser over the same entries for a worker.
    pub fn for_worker(&self, seed: Option<u64>) -> OperationChooser {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        };
        OperationChooser {
            entries: self
                .entries
                .iter()
                .map(|e| WeightedOperation { name: e.name.clone(), cumulative: e.cumulative })
                .collect(),
            total_weight: self.total_weight,
            rng,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn class(
        proportion: f64,
        queries: &[&str],
        weights: &[(&str, f64)],
    ) -> OperationClassConfig {
        OperationClassConfig {
            proportion,
            queries: queries.iter().map(|q| q.to_string()).collect(),
            weights: weights.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_empty_mix_yields_none() {
        let mut chooser = OperationChooser::from_config(&OperationMix::default(), Some(1));
        assert!(chooser.is_empty());
        assert_eq!(chooser.choose(), None);
    }

    #[test]
    fn test_class_without_queries_contributes_nothing() {
        let mix = OperationMix {
            read: class(0.95, &[], &[]),
            ..OperationMix::default()
        };
        let mut chooser = OperationChooser::from_config(&mix, Some(1));
        assert_eq!(chooser.choose(), None);
    }

    #[test]
    fn test_zero_proportion_never_sampled() {
        let mix = OperationMix {
            read: class(
                1.0,
                &["alpha_user", "beta_user"],
                &[("alpha", 1.0), ("beta", 0.0)],
            ),
            ..OperationMix::default()
        };
        let mut chooser = OperationChooser::from_config(&mix, Some(42));
        assert_eq!(chooser.len(), 1);
        for _ in 0..10_000 {
            assert_eq!(chooser.choose().as_deref(), Some("read.alpha_user"));
        }
    }

    #[test]
    fn test_absent_proportion_never_sampled() {
        // beta declares no weight at all: excluded, not floored
        let mix = OperationMix {
            read: class(1.0, &["alpha_user", "beta_user"], &[("alpha", 1.0)]),
            ..OperationMix::default()
        };
        let chooser = OperationChooser::from_config(&mix, Some(1));
        assert_eq!(chooser.len(), 1);
    }

    #[test]
    fn test_weights_are_class_times_query() {
        let mix = OperationMix {
            read: class(0.8, &["alpha_user"], &[("alpha", 0.5)]),
            update: class(0.2, &["gamma_post"], &[("gamma", 1.0)]),
            ..OperationMix::default()
        };
        let chooser = OperationChooser::from_config(&mix, Some(1));
        assert!((chooser.total_weight() - (0.8 * 0.5 + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_sampled_proportions_converge() {
        let mix = OperationMix {
            read: class(
                0.9,
                &["alpha_user", "beta_post"],
                &[("alpha", 0.75), ("beta", 0.25)],
            ),
            insert: class(0.1, &["gamma_like"], &[("gamma", 1.0)]),
            ..OperationMix::default()
        };
        let mut chooser = OperationChooser::from_config(&mix, Some(99));

        let total = 100_000;
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..total {
            *counts.entry(chooser.choose().unwrap()).or_default() += 1;
        }

        let weight_sum = 0.9 * 0.75 + 0.9 * 0.25 + 0.1;
        let expect = |w: f64| w / weight_sum * total as f64;

        let tolerance = 0.01 * total as f64;
        assert!(
            (counts["read.alpha_user"] as f64 - expect(0.675)).abs() < tolerance,
            "alpha count {} far from expectation",
            counts["read.alpha_user"]
        );
        assert!(
            (counts["read.beta_post"] as f64 - expect(0.225)).abs() < tolerance,
            "beta count {} far from expectation",
            counts["read.beta_post"]
        );
        assert!(
            (counts["insert.gamma_like"] as f64 - expect(0.1)).abs() < tolerance,
            "gamma count {} far from expectation",
            counts["insert.gamma_like"]
        );
    }

    #[test]
    fn test_for_worker_reproducible() {
        let mix = OperationMix {
            read: class(1.0, &["alpha_user", "beta_post"], &[("alpha", 0.5), ("beta", 0.5)]),
            ..OperationMix::default()
        };
        let master = OperationChooser::from_config(&mix, Some(1));
        let mut a = master.for_worker(Some(123));
        let mut b = master.for_worker(Some(123));
        for _ in 0..100 {
            assert_eq!(a.choose(), b.choose());
        }
    }

    #[test]
    fn test_parse_full_form() {
        let op = Operation::parse("update.updatePostByIdSetContent_post", "user");
        assert_eq!(op.class, OperationClass::Update);
        assert_eq!(op.query, "updatePostByIdSetContent");
        assert_eq!(op.table, "post");
    }

    #[test]
    fn test_parse_insert_form() {
        let op = Operation::parse("insert.createSingleUser_user", "user");
        assert_eq!(op.class, OperationClass::Insert);
        assert_eq!(op.query, "createSingleUser");
        assert_eq!(op.table, "user");
    }

    #[test]
    fn test_parse_missing_table_uses_default() {
        let op = Operation::parse("read.groupByIdWithMemberIds", "group");
        assert_eq!(op.class, OperationClass::Read);
        assert_eq!(op.query, "groupByIdWithMemberIds");
        assert_eq!(op.table, "group");
    }

    #[test]
    fn test_parse_bare_string_falls_back_to_read() {
        let op = Operation::parse("somethingElse", "user");
        assert_eq!(op.class, OperationClass::Read);
        assert_eq!(op.query, "somethingElse");
        assert_eq!(op.table, "user");
    }
}
