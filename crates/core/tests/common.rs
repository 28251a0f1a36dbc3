#![allow(dead_code)]

use survey_core::{
    EngineConfig, Response, RunTrace, StateDigest, SurveyGraph, SurveySession, TextRenderer,
};

/// One scripted respondent action.
#[derive(Clone, Debug)]
pub enum Input {
    Pick(usize),
    Many(Vec<usize>),
    Other(usize, &'static str),
    Skip,
    Ack,
    Back,
}

impl Input {
    fn label(&self) -> String {
        match self {
            Input::Pick(index) => format!("pick {index}"),
            Input::Many(indices) => format!("many {indices:?}"),
            Input::Other(index, text) => format!("other {index} '{text}'"),
            Input::Skip => "skip".to_string(),
            Input::Ack => "ack".to_string(),
            Input::Back => "back".to_string(),
        }
    }
}

/// Imports a document, plays the inputs and captures the trace.
///
/// Rejected inputs are recorded with a `rejected` suffix and leave the state
/// untouched, like a front-end prompting again.
pub fn run_headless(document_json: &str, inputs: &[Input]) -> RunTrace {
    let graph = SurveyGraph::from_json(document_json).expect("import document");
    let config = EngineConfig {
        auto_advance_ms: 0,
        ..EngineConfig::default()
    };
    let mut session = SurveySession::new(&graph, config, TextRenderer);
    let mut trace = RunTrace::new(graph.title());

    session.start().expect("start survey");
    trace.push(
        "start",
        session.view(),
        StateDigest::from_engine(session.engine()),
    );

    for input in inputs {
        let outcome = match input {
            Input::Pick(index) => session.select_answer(*index),
            Input::Many(indices) => session.submit(Response::multiple(indices.iter().copied())),
            Input::Other(index, text) => session.select_other(*index, text),
            Input::Skip => session.skip(),
            Input::Ack => session.acknowledge(),
            Input::Back => session.go_back(),
        };
        let label = match outcome {
            Ok(_) => input.label(),
            Err(_) => format!("{} rejected", input.label()),
        };
        trace.push(label, session.view(), StateDigest::from_engine(session.engine()));
    }

    trace.review = session.review();
    trace
}

/// A small survey with a notification, a multi-select with rules and an
/// `Other` answer.
pub const PET_SURVEY: &str = r#"
{
    "version": "1.0",
    "title": "Pets",
    "description": "Household pets",
    "questions": [
        {
            "id": "q-welcome",
            "order": 1,
            "question": "Welcome to the pet survey",
            "isInfoNode": true,
            "infoType": "success",
            "nextQuestion": "q-has-pet"
        },
        {
            "id": "q-has-pet",
            "order": 2,
            "question": "Do you have a pet?",
            "answers": [
                {"text": "Yes", "linkedTo": "q-kind"},
                {"text": "No", "linkedTo": "q-bye"}
            ]
        },
        {
            "id": "q-kind",
            "order": 3,
            "question": "Which pets?",
            "isMultipleChoice": true,
            "nextQuestion": "q-bye",
            "answers": [
                {"text": "Dog"},
                {"text": "Cat"},
                {"text": "Bird", "linkedTo": "q-cage"},
                {"text": "Other", "isOther": true, "placeholder": "Tell us", "maxLength": 40}
            ],
            "rules": [
                {"answerIndices": [0, 1], "linkedTo": "q-both", "order": 0}
            ]
        },
        {
            "id": "q-both",
            "order": 4,
            "question": "Do they get along?",
            "nextQuestion": "q-bye",
            "answers": [{"text": "Yes"}, {"text": "No"}]
        },
        {
            "id": "q-cage",
            "order": 5,
            "question": "How big is the cage?",
            "nextQuestion": "q-bye",
            "answers": [{"text": "Small"}, {"text": "Large"}]
        },
        {
            "id": "q-bye",
            "order": 6,
            "question": "Thanks for answering",
            "isInfoNode": true,
            "infoType": "normal"
        }
    ]
}
"#;
