use aq_screening::workflows::screening::{
    Answer, ClassifierAugmentation, NavigationState, ResponseStore, ResultComposer,
    ScoringEngine, ScreeningError, ScreeningSession, SessionId, QUESTION_COUNT,
};

#[test]
fn respondent_walks_through_all_questions_to_results() {
    let answers = [
        Answer::DefinitelyAgree,
        Answer::SlightlyDisagree,
        Answer::DefinitelyDisagree,
        Answer::SlightlyAgree,
        Answer::DefinitelyDisagree,
        Answer::SlightlyDisagree,
        Answer::SlightlyAgree,
        Answer::DefinitelyDisagree,
        Answer::DefinitelyDisagree,
        Answer::DefinitelyAgree,
    ];
    let mut session = ScreeningSession::new(SessionId::next());
    assert!(session.id().0.starts_with("scr-"));

    for (offset, answer) in answers.into_iter().enumerate() {
        assert_eq!(session.state(), NavigationState::Question(offset + 1));
        assert_eq!(
            session.advance(),
            Err(ScreeningError::NotReady {
                question: offset + 1
            })
        );
        session.answer(answer).expect("question open");
        session.advance().expect("answered");
    }
    assert!(session.state().is_results());
    assert_eq!(session.progress().percent, 100);

    let score = session
        .score(&ScoringEngine::default())
        .expect("complete responses");
    // A items: 1 agree, 7 agree, 8 disagree, 10 agree. D items: 2,3,5,6,9 disagree, 4 agree.
    assert_eq!(score.raw_score, 8);

    let report = ResultComposer::compose(&score, &ClassifierAugmentation::Unavailable);
    let text = report.render_text();
    assert!(text.starts_with("Your AQ-10 score is 8/10."));
    assert!(text.contains("Model inference unavailable"));
}

#[test]
fn session_ids_are_unique_and_sequential() {
    let first = SessionId::next();
    let second = SessionId::next();
    assert_ne!(first, second);
    assert!(first < second);
}

#[test]
fn scoring_refuses_partial_responses() {
    let mut store = ResponseStore::new();
    store
        .set_answer(QUESTION_COUNT, Answer::DefinitelyAgree)
        .expect("valid index");

    match ScoringEngine::default().score(&store) {
        Err(ScreeningError::IncompleteResponses { missing }) => {
            assert_eq!(missing, (1..QUESTION_COUNT).collect::<Vec<_>>());
        }
        other => panic!("expected incomplete responses, got {other:?}"),
    }
}
