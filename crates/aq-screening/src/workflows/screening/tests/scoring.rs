use super::common::*;
use crate::workflows::screening::domain::{
    Answer, ScoreBand, ScoringRule, ScreeningError, QUESTION_COUNT,
};
use crate::workflows::screening::instrument::Aq10Instrument;
use crate::workflows::screening::responses::ResponseStore;
use crate::workflows::screening::scoring::ScoringEngine;

#[test]
fn all_definitely_agree_scores_four_low() {
    let engine = ScoringEngine::default();
    let result = engine
        .score(&uniform_store(Answer::DefinitelyAgree))
        .expect("complete store");

    assert_eq!(result.raw_score, 4);
    assert_eq!(result.band, ScoreBand::Low);
}

#[test]
fn all_definitely_disagree_scores_six_elevated() {
    let engine = ScoringEngine::default();
    let result = engine
        .score(&uniform_store(Answer::DefinitelyDisagree))
        .expect("complete store");

    assert_eq!(result.raw_score, 6);
    assert_eq!(result.band, ScoreBand::Elevated);
}

#[test]
fn single_agree_item_contributes_exactly_one_point() {
    let instrument = Aq10Instrument::standard();
    let engine = ScoringEngine::new(instrument.clone());

    for question in instrument.questions_with_rule(ScoringRule::AgreeScores) {
        // Every other item gets its non-scoring answer.
        let mut answers = [Answer::SlightlyAgree; QUESTION_COUNT];
        for other in instrument.questions_with_rule(ScoringRule::AgreeScores) {
            if other.index != question.index {
                answers[other.index - 1] = Answer::SlightlyDisagree;
            }
        }

        let result = engine.score(&store_with(answers)).expect("complete store");
        assert_eq!(result.raw_score, 1, "question {} alone", question.index);
        assert_eq!(result.components[question.index - 1].points, 1);
    }
}

#[test]
fn every_complete_store_scores_in_range_with_matching_band() {
    const AGREE_ITEMS: [usize; 4] = [1, 7, 8, 10];
    let instrument = Aq10Instrument::standard();
    let engine = ScoringEngine::new(instrument.clone());
    let ordered = Answer::ordered();
    let mut store = ResponseStore::new();
    let mut histogram = [0u64; QUESTION_COUNT + 1];

    // Each code picks one answer per question as a base-4 digit.
    for code in 0..4usize.pow(QUESTION_COUNT as u32) {
        let mut digits = code;
        let mut expected = 0u8;
        for question in instrument.questions() {
            let answer = ordered[digits % 4];
            digits /= 4;
            store
                .set_answer(question.index, answer)
                .expect("valid index");
            if AGREE_ITEMS.contains(&question.index) == answer.is_agree() {
                expected += 1;
            }
        }

        let result = engine.score(&store).expect("complete store");
        assert_eq!(result.raw_score, expected, "code {code}");
        assert_eq!(
            result.band == ScoreBand::Elevated,
            result.raw_score >= 6,
            "code {code}"
        );
        histogram[usize::from(result.raw_score)] += 1;
    }

    // Two of four answers score on every item: C(10, k) * 2^10 stores per score.
    let mut choose = 1u64;
    for (score, count) in histogram.iter().enumerate() {
        assert_eq!(*count, choose * 1024, "stores scoring {score}");
        choose = choose * (QUESTION_COUNT - score) as u64 / (score as u64 + 1);
    }
}

#[test]
fn incomplete_store_lists_missing_questions() {
    let engine = ScoringEngine::default();
    let mut store = ResponseStore::new();
    for index in [1, 2, 3, 5, 6, 7, 8, 9] {
        store
            .set_answer(index, Answer::SlightlyAgree)
            .expect("valid index");
    }

    assert_eq!(
        engine.score(&store),
        Err(ScreeningError::IncompleteResponses {
            missing: vec![4, 10]
        })
    );
}

#[test]
fn feature_vector_follows_question_order() {
    let engine = ScoringEngine::default();
    let result = engine
        .score(&uniform_store(Answer::SlightlyDisagree))
        .expect("complete store");

    assert_eq!(result.feature_vector(), [0, 1, 1, 1, 1, 1, 0, 0, 1, 0]);
}
