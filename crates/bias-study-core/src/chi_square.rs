//! Paired-condition chi-square tests on focus distributions.
//!
//! For each hypothesis and each model, the two conditions' focus counts form a
//! 2×K contingency table (rows = conditions, columns = entities). The Pearson
//! chi-square statistic is reported with its degrees of freedom as a raw
//! divergence signal; no p-value is computed.

use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, GroupedAggregates};
use crate::domain::{ConditionPair, Entity, GroupKey, Result, StudyError};

/// 2×K table of observed counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    rows: [Vec<u64>; 2],
}

/// A computed chi-square statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquare {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
}

impl ContingencyTable {
    /// Build a table from two equally sized rows.
    pub fn new(first: Vec<u64>, second: Vec<u64>) -> Result<Self> {
        if first.len() != second.len() {
            return Err(StudyError::InvalidConfig(format!(
                "contingency rows differ in width: {} vs {}",
                first.len(),
                second.len()
            )));
        }
        Ok(Self {
            rows: [first, second],
        })
    }

    /// Rows from two groups' focus counts over `entities`; a missing group is
    /// a zero row.
    pub fn from_aggregates(
        first: Option<&Aggregate>,
        second: Option<&Aggregate>,
        entities: &[Entity],
    ) -> Self {
        let row = |agg: Option<&Aggregate>| match agg {
            Some(agg) => agg.focus_vector(entities),
            None => vec![0; entities.len()],
        };
        Self {
            rows: [row(first), row(second)],
        }
    }

    pub fn rows(&self) -> &[Vec<u64>; 2] {
        &self.rows
    }

    pub fn columns(&self) -> usize {
        self.rows[0].len()
    }

    pub fn row_totals(&self) -> [u64; 2] {
        [self.rows[0].iter().sum(), self.rows[1].iter().sum()]
    }

    pub fn column_totals(&self) -> Vec<u64> {
        self.rows[0]
            .iter()
            .zip(&self.rows[1])
            .map(|(a, b)| a + b)
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.row_totals().iter().sum()
    }

    /// Pearson chi-square for independence, or `None` when the table is empty.
    ///
    /// Cells whose expected count is zero contribute nothing.
    pub fn chi_square(&self) -> Option<ChiSquare> {
        let total = self.grand_total();
        if total == 0 {
            return None;
        }

        let row_totals = self.row_totals();
        let column_totals = self.column_totals();
        let grand = total as f64;

        let mut statistic = 0.0;
        for (row, row_total) in self.rows.iter().zip(row_totals) {
            for (observed, column_total) in row.iter().zip(&column_totals) {
                let expected = (row_total as f64 * *column_total as f64) / grand;
                if expected > 0.0 {
                    let diff = *observed as f64 - expected;
                    statistic += diff * diff / expected;
                }
            }
        }

        Some(ChiSquare {
            statistic,
            degrees_of_freedom: self.columns().saturating_sub(1),
        })
    }
}

/// Result for one (hypothesis, model) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PairOutcome {
    /// Neither condition had any record with a primary entity.
    InsufficientData,
    Computed(ChiSquare),
}

/// One paired-condition test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedTest {
    pub hypothesis_id: String,
    pub model: String,
    pub first_condition: String,
    pub second_condition: String,
    pub outcome: PairOutcome,
}

/// Run every (hypothesis, model) test.
///
/// Output order: hypotheses in `pairs` order, then models in `models` order.
pub fn paired_tests(
    pairs: &[ConditionPair],
    models: &[String],
    entities: &[Entity],
    aggregates: &GroupedAggregates,
) -> Vec<PairedTest> {
    let mut tests = Vec::with_capacity(pairs.len() * models.len());
    for pair in pairs {
        for model in models {
            let first = aggregates.get(&GroupKey::new(&pair.hypothesis_id, &pair.first, model));
            let second = aggregates.get(&GroupKey::new(&pair.hypothesis_id, &pair.second, model));
            let table = ContingencyTable::from_aggregates(first, second, entities);
            let outcome = match table.chi_square() {
                Some(chi) => PairOutcome::Computed(chi),
                None => PairOutcome::InsufficientData,
            };
            tests.push(PairedTest {
                hypothesis_id: pair.hypothesis_id.clone(),
                model: model.clone(),
                first_condition: pair.first.clone(),
                second_condition: pair.second.clone(),
                outcome,
            });
        }
    }
    tests
}
