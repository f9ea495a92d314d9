//! Fact-contradiction rules engine.
//!
//! Evaluates response text against a table of [`ContradictionRule`]s and a
//! [`GroundTruth`]. A rule fires when every one of its cue clauses is present
//! in the text (case-insensitive) *and* its ground-truth predicate holds, i.e.
//! the text makes a claim the known facts refute. Rules are plain data; the
//! scanning logic never changes when rules are added.

use serde::{Deserialize, Serialize};

use crate::domain::{Extremum, GroundTruth};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A group of alternative phrasings; satisfied when any one appears.
///
/// Most clauses hold a single phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueClause {
    pub any_of: Vec<String>,
}

impl CueClause {
    pub fn phrase(phrase: &str) -> Self {
        Self {
            any_of: vec![phrase.to_string()],
        }
    }

    pub fn any(phrases: &[&str]) -> Self {
        Self {
            any_of: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn matches(&self, lowered_text: &str) -> bool {
        self.any_of
            .iter()
            .any(|p| !p.is_empty() && lowered_text.contains(&p.to_lowercase()))
    }
}

/// Fact that must hold for the rule's claim to count as a contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FactPredicate {
    /// `entity`'s `metric` is the highest/lowest across all entities.
    MetricExtremum {
        entity: String,
        metric: String,
        extremum: Extremum,
    },
}

impl FactPredicate {
    pub fn holds(&self, truth: &GroundTruth) -> bool {
        match self {
            FactPredicate::MetricExtremum {
                entity,
                metric,
                extremum,
            } => truth.is_extremum(entity, metric, *extremum),
        }
    }
}

/// A named contradiction: required cues plus the fact they contradict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContradictionRule {
    pub name: String,
    pub required: Vec<CueClause>,
    pub predicate: FactPredicate,
}

impl ContradictionRule {
    /// The two reference rules: calling the top scorer the worst scorer, and
    /// calling the most careful ball-handler turnover-prone.
    pub fn reference_set() -> Vec<ContradictionRule> {
        vec![
            ContradictionRule {
                name: "player_a_worst_scorer".to_string(),
                required: vec![
                    CueClause::phrase("worst scorer"),
                    CueClause::phrase("player a"),
                ],
                predicate: FactPredicate::MetricExtremum {
                    entity: "Player A".to_string(),
                    metric: "goals".to_string(),
                    extremum: Extremum::Highest,
                },
            },
            ContradictionRule {
                name: "player_c_turnover_prone".to_string(),
                required: vec![
                    CueClause::any(&["careless with the ball", "high turnovers"]),
                    CueClause::phrase("player c"),
                ],
                predicate: FactPredicate::MetricExtremum {
                    entity: "Player C".to_string(),
                    metric: "turnovers".to_string(),
                    extremum: Extremum::Lowest,
                },
            },
        ]
    }

    /// All cue clauses present in already-lowercased text.
    ///
    /// A rule with no clauses never matches.
    fn cues_match(&self, lowered_text: &str) -> bool {
        !self.required.is_empty() && self.required.iter().all(|c| c.matches(lowered_text))
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// Rule table bound to a ground-truth fact table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContradictionChecker {
    rules: Vec<ContradictionRule>,
    truth: GroundTruth,
}

impl ContradictionChecker {
    pub fn new(rules: Vec<ContradictionRule>, truth: GroundTruth) -> Self {
        Self { rules, truth }
    }

    pub fn rules(&self) -> &[ContradictionRule] {
        &self.rules
    }

    /// Names of every rule that fires on `text`, in rule order.
    pub fn matched_rules(&self, text: &str) -> Vec<&str> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.cues_match(&lowered) && rule.predicate.holds(&self.truth))
            .map(|rule| rule.name.as_str())
            .collect()
    }

    /// Whether any rule fires on `text`.
    pub fn check(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .any(|rule| rule.cues_match(&lowered) && rule.predicate.holds(&self.truth))
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Flagged / total counts over a record batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricationTally {
    pub flagged: usize,
    pub total: usize,
}

impl FabricationTally {
    /// Run the checker over every text.
    pub fn over<'t>(
        checker: &ContradictionChecker,
        texts: impl IntoIterator<Item = &'t str>,
    ) -> Self {
        let mut tally = Self::default();
        for text in texts {
            tally.record(checker.check(text));
        }
        tally
    }

    pub fn record(&mut self, flagged: bool) {
        self.total += 1;
        if flagged {
            self.flagged += 1;
        }
    }

    /// flagged / total, or 0.0 when nothing was checked.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.flagged as f64 / self.total as f64
        }
    }
}
