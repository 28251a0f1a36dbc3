use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use survey_core::{EngineConfig, NodeId, Response, SurveyEngine, SurveyGraph};

/// A chain of single-choice questions, each answer linked to the next node.
fn chain_graph(len: usize) -> SurveyGraph {
    let mut graph = SurveyGraph::new();
    let ids: Vec<NodeId> = (0..len)
        .map(|idx| graph.create_node(format!("Question {idx}"), false))
        .collect();
    for (idx, &id) in ids.iter().enumerate() {
        for text in ["Yes", "No"] {
            let answer = graph.add_answer(id).expect("answer");
            graph.update_answer_text(id, answer, text).expect("text");
            if let Some(&next) = ids.get(idx + 1) {
                graph.set_answer_link(id, answer, Some(next)).expect("link");
            }
        }
    }
    graph
}

/// One multi-select node with `rule_count` rules, only the last of which matches.
fn rule_graph(rule_count: usize) -> SurveyGraph {
    let mut graph = SurveyGraph::new();
    let node = graph.create_node("Pick several", false);
    let target = graph.create_node("Target", false);
    let answer = graph.add_answer(target).expect("answer");
    graph.update_answer_text(target, answer, "ok").expect("text");
    graph.toggle_selection_mode(node, true).expect("multi");
    for idx in 0..8 {
        let answer = graph.add_answer(node).expect("answer");
        graph
            .update_answer_text(node, answer, format!("Option {idx}"))
            .expect("text");
    }
    for idx in 0..rule_count {
        let rule = graph.add_rule(node).expect("rule");
        let slot = graph.add_rule_slot(node, rule).expect("slot");
        let answer = if idx + 1 == rule_count { 0 } else { 1 + idx % 6 };
        graph.set_rule_answer(node, rule, slot, answer).expect("fill");
        let slot = graph.add_rule_slot(node, rule).expect("slot");
        graph.set_rule_answer(node, rule, slot, 7).expect("fill");
        graph.set_rule_link(node, rule, Some(target)).expect("link");
    }
    graph
}

fn bench_import_json(c: &mut Criterion) {
    let json = chain_graph(100).to_json().expect("export");
    c.bench_function("import_json_chain_100", |b| {
        b.iter(|| SurveyGraph::from_json(&json).expect("import"))
    });
}

fn bench_walk_chain(c: &mut Criterion) {
    let graph = chain_graph(200);
    c.bench_function("walk_chain_200", |b| {
        b.iter_batched(
            || {
                let mut engine = SurveyEngine::new(EngineConfig::default());
                engine.start(&graph).expect("start");
                engine
            },
            |mut engine| {
                for _ in 0..200 {
                    engine
                        .advance(&graph, Response::single(0))
                        .expect("advance");
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_rule_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_matching");
    for size in [1usize, 16, 64] {
        let graph = rule_graph(size);
        group.bench_function(format!("rules_{size}"), |b| {
            b.iter_batched(
                || {
                    let mut engine = SurveyEngine::new(EngineConfig::default());
                    engine.start(&graph).expect("start");
                    engine
                },
                |mut engine| {
                    engine
                        .advance(&graph, Response::multiple([0, 7]))
                        .expect("advance")
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let graph = chain_graph(500);
    c.bench_function("validate_chain_500", |b| b.iter(|| graph.validate()));
}

criterion_group!(
    core_benches,
    bench_import_json,
    bench_walk_chain,
    bench_rule_matching,
    bench_analysis
);
criterion_main!(core_benches);
