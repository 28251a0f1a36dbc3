use serde_json::Value;
use survey_core::{
    DocRef, NotificationStyle, ResourceLimiter, SurveyDocument, SurveyError, SurveyGraph,
    DOCUMENT_VERSION,
};

mod common;
use common::PET_SURVEY;

fn contents(graph: &SurveyGraph) -> Vec<&str> {
    graph.nodes().iter().map(|node| node.content.as_str()).collect()
}

fn content_of(graph: &SurveyGraph, id: Option<survey_core::NodeId>) -> Option<&str> {
    id.and_then(|id| graph.node(id)).map(|node| node.content.as_str())
}

#[test]
fn export_then_import_keeps_structure() {
    let mut graph = SurveyGraph::new();
    graph.set_title("Roundtrip");
    let first = graph.create_node("First", false);
    let second = graph.create_node("Second", false);
    let third = graph.create_node("Third", true);
    graph
        .set_notification_style(third, NotificationStyle::Success)
        .expect("style");

    let a = graph.add_answer(first).expect("answer");
    graph.update_answer_text(first, a, "to second").expect("text");
    graph.set_answer_link(first, a, Some(second)).expect("link");
    let b = graph.add_answer(first).expect("answer");
    graph.update_answer_text(first, b, "to third").expect("text");
    graph.set_answer_link(first, b, Some(third)).expect("link");

    graph.toggle_selection_mode(second, true).expect("multi");
    for text in ["x", "y"] {
        let index = graph.add_answer(second).expect("answer");
        graph.update_answer_text(second, index, text).expect("text");
    }
    graph.toggle_other_answer(second, true).expect("other");
    graph.set_next_link(second, Some(third)).expect("next");
    let rule = graph.add_rule(second).expect("rule");
    graph.add_rule_slot(second, rule).expect("slot");
    graph.add_rule_slot(second, rule).expect("slot");
    graph.set_rule_answer(second, rule, 0, 1).expect("fill");
    graph.set_rule_link(second, rule, Some(first)).expect("rule link");

    let json = graph.to_json().expect("export");
    let imported = SurveyGraph::from_json(&json).expect("import");

    assert_eq!(imported.title(), "Roundtrip");
    assert_eq!(contents(&imported), vec!["First", "Second", "Third"]);
    assert!(!imported.is_modified());

    let first = &imported.nodes()[0];
    let links: Vec<_> = first
        .answers
        .iter()
        .map(|answer| (answer.text.as_str(), content_of(&imported, answer.linked_to)))
        .collect();
    assert_eq!(
        links,
        vec![("to second", Some("Second")), ("to third", Some("Third"))]
    );

    let second = &imported.nodes()[1];
    assert!(second.is_multiple());
    assert_eq!(second.answers.len(), 3);
    assert!(second.answers[2].is_other);
    assert_eq!(content_of(&imported, second.next_link), Some("Third"));
    assert_eq!(second.rules.len(), 1);
    let rule = &second.rules[0];
    assert_eq!(rule.slots, vec![Some(second.answers[1].id), None]);
    assert_eq!(content_of(&imported, rule.linked_to), Some("First"));

    let third = &imported.nodes()[2];
    assert!(third.is_notification());
    assert_eq!(third.notification_style, NotificationStyle::Success);
}

#[test]
fn export_writes_document_fields() {
    let graph = SurveyGraph::from_json(PET_SURVEY).expect("import");
    let json = graph.to_json().expect("export");
    let value: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(value["version"], DOCUMENT_VERSION);
    assert!(value["createdAt"].as_str().is_some_and(|at| at.ends_with('Z')));
    assert_eq!(value["title"], "Pets");

    let kind = &value["questions"][2];
    assert_eq!(kind["order"], 3);
    assert_eq!(kind["isMultipleChoice"], true);
    assert_eq!(kind["nextQuestionText"], "Thanks for answering");
    assert_eq!(kind["rules"][0]["answerIndices"], serde_json::json!([0, 1]));
    assert_eq!(kind["rules"][0]["linkedToQuestion"], "Do they get along?");
    assert_eq!(kind["answers"][3]["isOther"], true);
    assert_eq!(kind["answers"][3]["maxLength"], 40);
    assert!(kind["answers"][0].get("placeholder").is_none());

    let welcome = &value["questions"][0];
    assert_eq!(welcome["isInfoNode"], true);
    assert_eq!(welcome["infoType"], "success");
}

#[test]
fn references_fall_back_to_question_text() {
    // The ids the links point at no longer exist, but the texts still match.
    let json = r#"{
        "questions": [
            {"id": "a", "question": "Start", "answers": [
                {"text": "go", "linkedTo": "stale-1", "linkedToQuestion": "Finish"}
            ]},
            {"id": "b", "question": "Finish", "answers": [{"text": "ok"}],
             "nextQuestion": "stale-2", "nextQuestionText": "Start"}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    let start = &graph.nodes()[0];
    let finish = &graph.nodes()[1];
    assert_eq!(start.answers[0].linked_to, Some(finish.id));
    assert_eq!(finish.next_link, Some(start.id));
}

#[test]
fn numeric_references_resolve_by_order() {
    let json = r#"{
        "questions": [
            {"question": "One", "nextQuestion": 3, "answers": [{"text": "a"}]},
            {"question": "Two", "answers": [{"text": "b", "linkedTo": "1"}]},
            {"question": "Three", "answers": [{"text": "c"}]}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    let ids: Vec<_> = graph.nodes().iter().map(|node| node.id).collect();
    assert_eq!(graph.nodes()[0].next_link, Some(ids[2]));
    assert_eq!(graph.nodes()[1].answers[0].linked_to, Some(ids[0]));
}

#[test]
fn unresolved_references_are_dropped() {
    let json = r#"{
        "questions": [
            {"id": "a", "question": "Only", "nextQuestion": "missing",
             "answers": [{"text": "x", "linkedTo": 9}]}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    let node = &graph.nodes()[0];
    assert_eq!(node.next_link, None);
    assert_eq!(node.answers[0].linked_to, None);
}

#[test]
fn references_of_other_json_types_are_dropped() {
    for reference in ["2.5", "9223372036854775808", "true", "{\"id\": \"b\"}", "[1]"] {
        let json = format!(
            r#"{{
                "questions": [
                    {{"id": "a", "question": "A", "nextQuestion": {reference},
                     "answers": [{{"text": "x", "linkedTo": {reference}}}]}},
                    {{"id": "b", "question": "B", "answers": [{{"text": "y"}}]}}
                ]
            }}"#
        );
        let graph = SurveyGraph::from_json(&json).expect("import");
        let node = &graph.nodes()[0];
        assert_eq!(node.next_link, None, "nextQuestion {reference}");
        assert_eq!(node.answers[0].linked_to, None, "linkedTo {reference}");
    }

    // The question text still resolves when the reference itself is unusable.
    let json = r#"{
        "questions": [
            {"id": "a", "question": "A", "nextQuestion": 2.5, "nextQuestionText": "B",
             "answers": [{"text": "x"}]},
            {"id": "b", "question": "B", "answers": [{"text": "y"}]}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    assert_eq!(graph.nodes()[0].next_link, Some(graph.nodes()[1].id));

    let document = SurveyDocument::from_json(r#"{"questions": [{"id": false}]}"#)
        .expect("parse");
    assert_eq!(document.questions[0].id, Some(DocRef::Other(Value::Bool(false))));
}

#[test]
fn rules_with_missing_answers_are_dropped() {
    let json = r#"{
        "questions": [
            {"id": "m", "question": "Pick", "isMultipleChoice": true,
             "answers": [{"text": "a"}, {"text": "b"}],
             "rules": [
                {"answerIndices": [0, 7], "linkedTo": "t", "order": 0},
                {"answerIndices": [1, 1, -1], "linkedTo": "t", "order": 2},
                {"answerIndices": [0], "linkedTo": "t", "order": 1}
             ]},
            {"id": "t", "question": "Target", "answers": [{"text": "ok"}]}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    let node = &graph.nodes()[0];
    let (a, b) = (node.answers[0].id, node.answers[1].id);
    let slots: Vec<_> = node.rules.iter().map(|rule| rule.slots.clone()).collect();
    assert_eq!(slots, vec![vec![Some(a)], vec![Some(b), None]]);
    let orders: Vec<_> = node.rules.iter().map(|rule| rule.order).collect();
    assert_eq!(orders, vec![0, 1]);
}

#[test]
fn rules_on_single_choice_questions_are_ignored() {
    let json = r#"{
        "questions": [
            {"id": "s", "question": "Single", "answers": [{"text": "a"}],
             "rules": [{"answerIndices": [0], "linkedTo": "s"}]}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    assert!(graph.nodes()[0].rules.is_empty());
}

#[test]
fn extra_other_answers_become_plain() {
    let json = r#"{
        "questions": [
            {"question": "Q", "answers": [
                {"text": "Other", "isOther": true},
                {"text": "Something else", "isOther": true}
            ]}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    let flags: Vec<_> = graph.nodes()[0]
        .answers
        .iter()
        .map(|answer| answer.is_other)
        .collect();
    assert_eq!(flags, vec![true, false]);
}

#[test]
fn notification_answers_are_not_imported() {
    let json = r#"{
        "questions": [
            {"question": "Heads up", "isInfoNode": true, "infoType": "bogus",
             "answers": [{"text": "stray"}]}
        ]
    }"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    let node = &graph.nodes()[0];
    assert!(node.answers.is_empty());
    assert_eq!(node.notification_style, NotificationStyle::default());
}

#[test]
fn imported_ids_are_regenerated() {
    let json = r#"{"questions": [{"id": "node-40", "question": "A"}, {"id": "x", "question": "B"}]}"#;
    let graph = SurveyGraph::from_json(json).expect("import");
    let ids: Vec<_> = graph.nodes().iter().map(|node| node.id.to_string()).collect();
    assert_eq!(ids, vec!["node-0", "node-1"]);
}

#[test]
fn questions_must_be_an_array() {
    let err = SurveyGraph::from_json(r#"{"questions": {"a": 1}}"#).expect_err("object");
    assert!(matches!(err, SurveyError::MalformedDocument(_)));

    let err = SurveyGraph::from_json(r#"{"title": "no questions"}"#).expect_err("missing");
    assert!(matches!(err, SurveyError::MalformedDocument(_)));

    let err = SurveyGraph::from_json(r#"{"questions": [{"question": 5}]}"#).expect_err("typed");
    assert!(matches!(err, SurveyError::MalformedDocument(_)));
}

#[test]
fn syntax_errors_carry_a_span() {
    let input = "{\n  \"questions\": [\n    {\"question\": \"A\",,}\n  ]\n}";
    let err = SurveyGraph::from_json(input).expect_err("syntax");
    match err {
        SurveyError::Serialization { src, span, .. } => {
            // Short documents fit in the excerpt whole.
            assert_eq!(src, input);
            assert!(span.offset() > 0);
            assert!(span.offset() < input.len());
            assert_eq!(span.len(), 1);
        }
        other => panic!("expected serialization error, got {other:?}"),
    }
}

#[test]
fn syntax_error_excerpt_stays_small() {
    let mut input = String::from("{\n  \"questions\": [\n");
    for index in 0..5_000 {
        input.push_str(&format!("    {{\"question\": \"filler {index}\"}},\n"));
    }
    input.push_str("    {\"question\": \"broken\" \"oops\"},\n");
    for index in 0..5_000 {
        input.push_str(&format!("    {{\"question\": \"tail {index}\"}},\n"));
    }
    input.push_str("    {\"question\": \"last\"}\n  ]\n}\n");

    let err = SurveyGraph::from_json(&input).expect_err("syntax");
    let SurveyError::Serialization { src, span, .. } = err else {
        panic!("expected serialization error");
    };
    assert!(src.len() <= 512, "excerpt is {} bytes", src.len());
    assert!(src.lines().count() <= 5);
    assert!(src.contains("\"broken\" \"oops\""));
    assert!(!src.contains("filler 0\""));
    assert!(span.offset() < src.len());
    assert!(src[span.offset()..].contains("oops"));

    // One long line of multi-byte text is cut on character boundaries.
    let long = "\u{e9}".repeat(400);
    let input = format!("{{\"questions\": [{{\"question\": \"{long}\" \"{long}\"}}]}}");
    let err = SurveyGraph::from_json(&input).expect_err("syntax");
    let SurveyError::Serialization { src, span, .. } = err else {
        panic!("expected serialization error");
    };
    assert!(src.len() <= 512);
    assert!(src.len() < input.len());
    assert!(span.offset() <= src.len());
}

#[test]
fn resource_limits_are_enforced() {
    let limits = ResourceLimiter {
        max_nodes: 2,
        ..ResourceLimiter::default()
    };
    let json = r#"{"questions": [{"question": "a"}, {"question": "b"}, {"question": "c"}]}"#;
    let err = SurveyGraph::from_json_with_limits(json, limits).expect_err("too many nodes");
    assert!(matches!(err, SurveyError::ResourceLimit(_)));

    let limits = ResourceLimiter {
        max_document_bytes: 16,
        ..ResourceLimiter::default()
    };
    let err = SurveyGraph::from_json_with_limits(json, limits).expect_err("too large");
    assert!(matches!(err, SurveyError::ResourceLimit(_)));

    let limits = ResourceLimiter {
        max_text_length: 3,
        ..ResourceLimiter::default()
    };
    let err = SurveyGraph::from_json_with_limits(
        r#"{"questions": [{"question": "long text"}]}"#,
        limits,
    )
    .expect_err("text too long");
    assert!(matches!(err, SurveyError::ResourceLimit(_)));
}

#[test]
fn document_refs_accept_strings_and_numbers() {
    let document = SurveyDocument::from_json(
        r#"{"questions": [{"id": 1, "nextQuestion": "two"}, {"id": "two"}]}"#,
    )
    .expect("parse");
    assert_eq!(document.questions[0].id, Some(DocRef::Order(1)));
    assert_eq!(
        document.questions[0].next_question,
        Some(DocRef::Id("two".to_string()))
    );
}

#[test]
fn schema_describes_questions() {
    let schema = serde_json::to_value(SurveyDocument::schema()).expect("schema json");
    assert!(schema["properties"]["questions"].is_object());
    assert!(schema["required"]
        .as_array()
        .is_some_and(|required| required.iter().any(|field| field == "questions")));
}
