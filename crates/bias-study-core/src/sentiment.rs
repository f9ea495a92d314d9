//! Cue-word sentiment heuristic.
//!
//! Not a calibrated sentiment model: each positive cue present in the text
//! adds one, each negative cue present subtracts one. Repeats of the same cue
//! count once.

use serde::{Deserialize, Serialize};

/// Positive and negative cue lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self::reference()
    }
}

impl SentimentLexicon {
    /// Six cues each way, as used by the reference study.
    pub fn reference() -> Self {
        Self {
            positive: to_owned(&[
                "potential",
                "opportunity",
                "growth",
                "improvement",
                "strength",
                "upside",
            ]),
            negative: to_owned(&[
                "problem",
                "blame",
                "struggling",
                "weakness",
                "disappointing",
                "liability",
            ]),
        }
    }

    /// Polarity of `text`: positive cues present minus negative cues present.
    pub fn score(&self, text: &str) -> i32 {
        let lowered = text.to_lowercase();
        let hits = |cues: &[String]| {
            cues.iter()
                .filter(|cue| !cue.is_empty() && lowered.contains(&cue.to_lowercase()))
                .count() as i32
        };
        hits(&self.positive) - hits(&self.negative)
    }

    /// Inclusive (min, max) range of [`score`](Self::score).
    pub fn bounds(&self) -> (i32, i32) {
        (-(self.negative.len() as i32), self.positive.len() as i32)
    }

    /// Cues that appear in both lists (should be empty).
    pub fn overlapping_cues(&self) -> Vec<&str> {
        self.positive
            .iter()
            .filter(|p| {
                self.negative
                    .iter()
                    .any(|n| n.eq_ignore_ascii_case(p))
            })
            .map(String::as_str)
            .collect()
    }
}

fn to_owned(cues: &[&str]) -> Vec<String> {
    cues.iter().map(|c| c.to_string()).collect()
}
