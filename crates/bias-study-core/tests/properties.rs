use bias_study_core::{
    count_mentions, detect_primary, ContingencyTable, ContradictionChecker, ContradictionRule,
    Entity, GroundTruth, GroupedAggregates, ResponseRecord, SentimentLexicon,
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

const FRAGMENTS: &[&str] = &[
    "Player A",
    "player b",
    "PLAYER C",
    "growth",
    "upside",
    "weakness",
    "a problem",
    "worst scorer",
    "high turnovers",
    "careless with the ball",
    "the team",
    "scored",
    "and",
];

const CONDITIONS: &[&str] = &["H1_negative_struggling", "H1_positive_developing"];
const MODELS: &[&str] = &["gpt4", "claude", "gemini"];

fn players() -> Vec<Entity> {
    vec![
        Entity::new("Player A"),
        Entity::new("Player B"),
        Entity::new("Player C"),
    ]
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS.to_vec()), 0..10)
        .prop_map(|words| words.join(" "))
}

fn record_strategy() -> impl Strategy<Value = ResponseRecord> {
    (
        prop::sample::select(CONDITIONS.to_vec()),
        prop::sample::select(MODELS.to_vec()),
        0u32..3,
        text_strategy(),
    )
        .prop_map(|(condition, model, sample_id, response)| ResponseRecord {
            timestamp: Utc.with_ymd_and_hms(2025, 11, 2, 12, 0, 0).unwrap(),
            hypothesis_id: "H1".to_string(),
            condition_id: condition.to_string(),
            model: model.to_string(),
            model_version: "unknown".to_string(),
            temperature: 0.2,
            sample_id,
            prompt: "prompt".to_string(),
            response,
        })
}

proptest! {
    #[test]
    fn no_labels_means_no_primary(s in "[a-z ,.]{0,80}") {
        // Random lowercase text can still spell a label; skip those cases.
        let entities = players();
        prop_assume!(entities.iter().all(|e| count_mentions(&s, e.label()) == 0));
        prop_assert!(detect_primary(&s, &entities).is_none());
    }

    #[test]
    fn primary_has_maximal_positive_count(s in text_strategy()) {
        let entities = players();
        if let Some(primary) = detect_primary(&s, &entities) {
            let best = count_mentions(&s, primary.label());
            prop_assert!(best > 0);
            for other in &entities {
                prop_assert!(count_mentions(&s, other.label()) <= best);
            }
            // Earlier entities with the same count would have won the tie.
            let position = entities.iter().position(|e| e == primary).unwrap();
            for earlier in &entities[..position] {
                prop_assert!(count_mentions(&s, earlier.label()) < best);
            }
        } else {
            for entity in &entities {
                prop_assert_eq!(count_mentions(&s, entity.label()), 0);
            }
        }
    }

    #[test]
    fn sentiment_is_pure_and_bounded(s in text_strategy()) {
        let lexicon = SentimentLexicon::reference();
        let (lo, hi) = lexicon.bounds();
        let first = lexicon.score(&s);
        prop_assert_eq!(first, lexicon.score(&s));
        prop_assert!(first >= lo && first <= hi);
    }

    #[test]
    fn aggregation_is_order_independent(
        (records, shuffled) in prop::collection::vec(record_strategy(), 0..30)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let entities = players();
        let lexicon = SentimentLexicon::reference();
        let a = GroupedAggregates::from_records(&records, &entities, &lexicon);
        let b = GroupedAggregates::from_records(&shuffled, &entities, &lexicon);
        prop_assert_eq!(&a, &b);
        for ((_, x), (_, y)) in a.iter().zip(b.iter()) {
            prop_assert!((x.mean_sentiment() - y.mean_sentiment()).abs() < 1e-12);
        }
    }

    #[test]
    fn chunked_merge_equals_single_pass(
        records in prop::collection::vec(record_strategy(), 0..30),
        split in 0usize..30,
    ) {
        let entities = players();
        let lexicon = SentimentLexicon::reference();
        let split = split.min(records.len());
        let whole = GroupedAggregates::from_records(&records, &entities, &lexicon);
        let left = GroupedAggregates::from_records(&records[..split], &entities, &lexicon);
        let right = GroupedAggregates::from_records(&records[split..], &entities, &lexicon);
        prop_assert_eq!(right.merge(left), whole);
    }

    #[test]
    fn chi_square_is_non_negative(
        first in prop::collection::vec(0u64..50, 3),
        second in prop::collection::vec(0u64..50, 3),
    ) {
        let table = ContingencyTable::new(first.clone(), second.clone()).unwrap();
        let total: u64 = first.iter().chain(&second).sum();
        match table.chi_square() {
            Some(chi) => {
                prop_assert!(total > 0);
                prop_assert!(chi.statistic >= 0.0);
                prop_assert_eq!(chi.degrees_of_freedom, 2);
            }
            None => prop_assert_eq!(total, 0),
        }
    }

    #[test]
    fn proportional_rows_give_zero(
        base in prop::collection::vec(0u64..20, 3),
        factor in 1u64..5,
    ) {
        prop_assume!(base.iter().sum::<u64>() > 0);
        let scaled: Vec<u64> = base.iter().map(|c| c * factor).collect();
        let chi = ContingencyTable::new(base, scaled).unwrap().chi_square().unwrap();
        prop_assert!(chi.statistic.abs() < 1e-9);
    }

    #[test]
    fn contradiction_iff_full_conjunction(s in text_strategy()) {
        let lowered = s.to_lowercase();
        let checker = ContradictionChecker::new(
            ContradictionRule::reference_set(),
            GroundTruth::reference(),
        );
        let rule_a = lowered.contains("worst scorer") && lowered.contains("player a");
        let rule_c = (lowered.contains("careless with the ball") || lowered.contains("high turnovers"))
            && lowered.contains("player c");
        prop_assert_eq!(checker.check(&s), rule_a || rule_c);

        // Flip both facts: nothing can be a contradiction any more.
        let flipped = GroundTruth::reference()
            .with_fact("Player A", "goals", 0)
            .with_fact("Player C", "turnovers", 99);
        let flipped_checker = ContradictionChecker::new(ContradictionRule::reference_set(), flipped);
        prop_assert!(!flipped_checker.check(&s));
    }
}
