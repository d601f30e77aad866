//! Logical relations between markets as inferred by the analyzer.
//!
//! The relation set is closed: whatever free text the model produces is
//! collapsed into [`RelationType`], and downstream code dispatches on the
//! variant only. A record whose reasoning contradicts its own label is
//! downgraded to `Independent` before anything consumes it.

use serde::{Deserialize, Serialize};

/// Closed set of logical relations between two markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// A resolving YES forces B to resolve YES.
    ImpliesAb,
    /// B resolving YES forces A to resolve YES.
    ImpliesBa,
    /// A and B always resolve identically.
    Equivalent,
    /// A and B cannot both resolve YES.
    MutualExclusive,
    /// Part of a mutually exclusive, collectively exhaustive set.
    Exhaustive,
    /// No logical dependency.
    Independent,
}

impl RelationType {
    /// Parses an analyzer label, collapsing anything unknown to
    /// `Independent`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "IMPLIES_AB" => Self::ImpliesAb,
            "IMPLIES_BA" => Self::ImpliesBa,
            "EQUIVALENT" => Self::Equivalent,
            "MUTUAL_EXCLUSIVE" | "MUTUALLY_EXCLUSIVE" => Self::MutualExclusive,
            "EXHAUSTIVE" => Self::Exhaustive,
            _ => Self::Independent,
        }
    }
}

/// Analyzer verdict on the relation between a pair of markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAnalysis {
    /// The classified relation.
    pub relation: RelationType,
    /// Analyzer confidence in `[0, 1]`.
    pub confidence: f64,
    /// Natural-language reasoning, kept for the audit trail.
    pub reasoning: String,
    /// Edge cases the analyzer called out.
    pub edge_cases: Vec<String>,
    /// Whether the two markets' resolution rules are compatible.
    pub resolution_compatible: bool,
}

impl RelationshipAnalysis {
    /// A null analysis used when classification failed.
    #[must_use]
    pub fn independent(reason: impl Into<String>) -> Self {
        Self {
            relation: RelationType::Independent,
            confidence: 0.0,
            reasoning: reason.into(),
            edge_cases: Vec::new(),
            resolution_compatible: false,
        }
    }

    /// Enforces label/reasoning consistency.
    ///
    /// If the reasoning text explicitly asserts a relation that
    /// contradicts the declared label (keyword and polarity check), the
    /// record is rewritten to `(Independent, 0.0)` with the contradiction
    /// noted in `edge_cases`. Idempotent.
    #[must_use]
    pub fn enforce_consistency(self) -> Self {
        let Some(conflict) = self.reasoning_conflict() else {
            return self;
        };

        let mut edge_cases = self.edge_cases;
        edge_cases.push(format!(
            "downgraded: reasoning asserts \"{conflict}\" contradicting label {:?}",
            self.relation
        ));
        Self {
            relation: RelationType::Independent,
            confidence: 0.0,
            reasoning: self.reasoning,
            edge_cases,
            resolution_compatible: self.resolution_compatible,
        }
    }

    /// True when [`enforce_consistency`](Self::enforce_consistency) would
    /// leave the record unchanged.
    #[must_use]
    pub fn is_self_consistent(&self) -> bool {
        self.reasoning_conflict().is_none()
    }

    fn reasoning_conflict(&self) -> Option<&'static str> {
        let text = self.reasoning.to_ascii_lowercase();
        let negated = |phrase: &str| {
            // "not mutually exclusive" is not an assertion of exclusivity.
            ["not ", "n't ", "never "]
                .iter()
                .any(|neg| text.contains(&format!("{neg}{phrase}")))
        };
        let asserts = |phrase: &'static str| text.contains(phrase) && !negated(phrase);

        let exclusive = asserts("mutually exclusive")
            || asserts("cannot both")
            || asserts("can't both")
            || asserts("at most one");
        let unrelated = asserts("unrelated") || asserts("no logical relation");
        let implies = asserts("implies") || asserts("must also") || asserts("guarantees");

        match self.relation {
            RelationType::ImpliesAb | RelationType::ImpliesBa | RelationType::Equivalent => {
                if exclusive {
                    Some("mutually exclusive")
                } else if unrelated {
                    Some("unrelated")
                } else {
                    None
                }
            }
            RelationType::MutualExclusive | RelationType::Exhaustive => {
                if implies {
                    Some("implication")
                } else if unrelated {
                    Some("unrelated")
                } else {
                    None
                }
            }
            RelationType::Independent => None,
        }
    }
}

/// Analyzer verdict on whether a market set partitions its event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustiveVerdict {
    /// True when the set is mutually exclusive AND collectively exhaustive.
    pub is_complete: bool,
    /// Analyzer confidence in `[0, 1]`.
    pub confidence: f64,
    /// Outcomes the analyzer believes the set is missing.
    pub missing_cases: Vec<String>,
}
