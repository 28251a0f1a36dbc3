//! JSON survey document: the persisted form of a graph.
//!
//! Import never trusts document ids. Nodes get fresh ids and every reference
//! is resolved against the loaded node set: first by id, then by the
//! denormalized question text, then as a 1-based order number. References
//! that resolve to nothing are dropped with a warning.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{json_deserialize_error, SurveyError, SurveyResult};
use crate::graph::SurveyGraph;
use crate::model::{
    Answer, Node, NodeId, NotificationStyle, Position, Rule, SelectionMode,
    DEFAULT_OTHER_MAX_LENGTH,
};
use crate::resource::ResourceLimiter;
use crate::version::DOCUMENT_VERSION;

/// A node reference as written in a document: an id string or an order number.
///
/// Any other JSON value is kept as `Other` so the import can drop the
/// reference instead of failing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DocRef {
    Id(String),
    Order(i64),
    Other(Value),
}

impl DocRef {
    fn key(&self) -> Option<String> {
        match self {
            DocRef::Id(id) => Some(id.clone()),
            DocRef::Order(order) => Some(order.to_string()),
            DocRef::Other(_) => None,
        }
    }

    fn as_order(&self) -> Option<i64> {
        match self {
            DocRef::Id(id) => id.trim().parse().ok(),
            DocRef::Order(order) => Some(*order),
            DocRef::Other(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Chart label offsets, carried through untouched.
    #[serde(default)]
    pub link_label_positions: Map<String, Value>,
    pub questions: Vec<DocumentNode>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
    #[serde(default)]
    pub id: Option<DocRef>,
    /// 1-based display position; informational.
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub is_info_node: bool,
    #[serde(default)]
    pub info_type: Option<String>,
    #[serde(default)]
    pub is_multiple_choice: bool,
    #[serde(default)]
    pub next_question: Option<DocRef>,
    #[serde(default)]
    pub next_question_text: Option<String>,
    #[serde(default)]
    pub rules: Vec<DocumentRule>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub answers: Vec<DocumentAnswer>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnswer {
    #[serde(default)]
    pub id: Option<DocRef>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub linked_to: Option<DocRef>,
    #[serde(default)]
    pub linked_to_question: Option<String>,
    #[serde(default)]
    pub is_other: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRule {
    /// Answer positions; `-1` marks an unfilled slot.
    #[serde(default)]
    pub answer_indices: Vec<i64>,
    #[serde(default)]
    pub linked_to: Option<DocRef>,
    #[serde(default)]
    pub linked_to_question: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

impl SurveyDocument {
    /// Parses a document with the default resource limits.
    pub fn from_json(input: &str) -> SurveyResult<Self> {
        Self::from_json_with_limits(input, ResourceLimiter::default())
    }

    pub fn from_json_with_limits(input: &str, limits: ResourceLimiter) -> SurveyResult<Self> {
        if input.len() > limits.max_document_bytes {
            return Err(SurveyError::ResourceLimit(format!(
                "document is {} bytes, limit is {}",
                input.len(),
                limits.max_document_bytes
            )));
        }
        let value: Value =
            serde_json::from_str(input).map_err(|err| json_deserialize_error(input, &err))?;
        match value.get("questions") {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(SurveyError::MalformedDocument(
                    "'questions' must be an array".to_string(),
                ))
            }
            None => {
                return Err(SurveyError::MalformedDocument(
                    "missing 'questions' array".to_string(),
                ))
            }
        }
        let document: SurveyDocument = serde_json::from_value(value)
            .map_err(|err| SurveyError::MalformedDocument(err.to_string()))?;
        document.check_limits(limits)?;
        Ok(document)
    }

    pub fn to_json(&self) -> SurveyResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| SurveyError::Serialization {
            message: err.to_string(),
            src: String::new(),
            span: (0, 0).into(),
        })
    }

    /// JSON Schema of the document format.
    pub fn schema() -> RootSchema {
        schema_for!(SurveyDocument)
    }

    fn check_limits(&self, limits: ResourceLimiter) -> SurveyResult<()> {
        if self.questions.len() > limits.max_nodes {
            return Err(SurveyError::ResourceLimit(format!(
                "{} questions exceed the limit of {}",
                self.questions.len(),
                limits.max_nodes
            )));
        }
        for (index, node) in self.questions.iter().enumerate() {
            let label = index + 1;
            if node.answers.len() > limits.max_answers_per_node {
                return Err(SurveyError::ResourceLimit(format!(
                    "question {label} has {} answers, limit is {}",
                    node.answers.len(),
                    limits.max_answers_per_node
                )));
            }
            if node.rules.len() > limits.max_rules_per_node {
                return Err(SurveyError::ResourceLimit(format!(
                    "question {label} has {} rules, limit is {}",
                    node.rules.len(),
                    limits.max_rules_per_node
                )));
            }
            let texts = node
                .question
                .iter()
                .chain(node.answers.iter().filter_map(|answer| answer.text.as_ref()));
            for text in texts {
                if text.len() > limits.max_text_length {
                    return Err(SurveyError::ResourceLimit(format!(
                        "question {label} holds a text of {} bytes, limit is {}",
                        text.len(),
                        limits.max_text_length
                    )));
                }
            }
        }
        Ok(())
    }

    /// Snapshot of a graph with denormalized link texts filled in.
    pub fn from_graph(graph: &SurveyGraph) -> Self {
        let content_of = |target: Option<NodeId>| {
            target
                .and_then(|id| graph.node(id))
                .map(|node| node.content.clone())
        };
        let questions = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, node)| DocumentNode {
                id: Some(DocRef::Id(node.id.to_string())),
                order: Some(index as u32 + 1),
                question: Some(node.content.clone()),
                is_info_node: node.is_notification(),
                info_type: Some(node.notification_style.as_str().to_string()),
                is_multiple_choice: node.is_multiple(),
                next_question: node.next_link.map(|id| DocRef::Id(id.to_string())),
                next_question_text: content_of(node.next_link),
                rules: node
                    .rules
                    .iter()
                    .map(|rule| DocumentRule {
                        answer_indices: rule
                            .slots
                            .iter()
                            .map(|slot| {
                                slot.and_then(|answer| node.answer_index(answer))
                                    .map_or(-1, |index| index as i64)
                            })
                            .collect(),
                        linked_to: rule.linked_to.map(|id| DocRef::Id(id.to_string())),
                        linked_to_question: content_of(rule.linked_to),
                        order: Some(rule.order),
                    })
                    .collect(),
                position: node.position,
                answers: node
                    .answers
                    .iter()
                    .enumerate()
                    .map(|(answer_index, answer)| DocumentAnswer {
                        id: Some(DocRef::Id(format!("answer-{}-{answer_index}", node.id))),
                        text: Some(answer.text.clone()),
                        linked_to: answer.linked_to.map(|id| DocRef::Id(id.to_string())),
                        linked_to_question: content_of(answer.linked_to),
                        is_other: answer.is_other,
                        placeholder: answer.is_other.then(|| answer.placeholder.clone()),
                        max_length: answer.is_other.then_some(answer.max_length),
                    })
                    .collect(),
            })
            .collect();

        Self {
            version: Some(DOCUMENT_VERSION.to_string()),
            created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            title: Some(graph.title().to_string()),
            description: Some(graph.description().to_string()),
            link_label_positions: graph.link_label_positions().clone(),
            questions,
        }
    }

    /// Builds a fresh graph. Nothing is built if any step fails.
    pub fn to_graph(&self) -> SurveyResult<SurveyGraph> {
        if let Some(version) = self.version.as_deref() {
            if version != DOCUMENT_VERSION {
                debug!(version, "importing document with a different version");
            }
        }
        let mut graph = SurveyGraph::new();
        graph.set_title(self.title.clone().unwrap_or_default());
        graph.set_description(self.description.clone().unwrap_or_default());
        graph.set_link_label_positions(self.link_label_positions.clone());

        // Pass 1: nodes and answers.
        let mut ids = Vec::with_capacity(self.questions.len());
        let mut by_key: HashMap<String, NodeId> = HashMap::new();
        for record in &self.questions {
            let id = graph.create_node(
                record.question.clone().unwrap_or_default(),
                record.is_info_node,
            );
            ids.push(id);
            if let Some(key) = record.id.as_ref().and_then(DocRef::key) {
                by_key.entry(key).or_insert(id);
            }
            import_node_body(&mut graph, id, record)?;
        }

        // Pass 2: links and rules, now that every node exists.
        let resolver = Resolver {
            graph: &graph,
            ids: &ids,
            by_key: &by_key,
        };
        let mut links = Vec::new();
        for (record, &id) in self.questions.iter().zip(&ids) {
            let next = resolver.resolve(
                id,
                record.next_question.as_ref(),
                record.next_question_text.as_deref(),
            );
            let answers = record
                .answers
                .iter()
                .map(|answer| {
                    resolver.resolve(
                        id,
                        answer.linked_to.as_ref(),
                        answer.linked_to_question.as_deref(),
                    )
                })
                .collect::<Vec<_>>();
            let rules = record
                .rules
                .iter()
                .map(|rule| {
                    resolver.resolve(
                        id,
                        rule.linked_to.as_ref(),
                        rule.linked_to_question.as_deref(),
                    )
                })
                .collect::<Vec<_>>();
            links.push((next, answers, rules));
        }

        for ((record, &id), (next, answer_links, rule_links)) in
            self.questions.iter().zip(&ids).zip(links)
        {
            graph.set_next_link(id, next)?;
            let is_notification = graph.node(id).is_some_and(Node::is_notification);
            if !is_notification {
                for (index, target) in answer_links.into_iter().enumerate() {
                    graph.set_answer_link(id, index, target)?;
                }
            }
            import_rules(&mut graph, id, record, rule_links)?;
        }

        graph.clear_modified();
        info!(nodes = graph.len(), "survey document imported");
        Ok(graph)
    }
}

impl SurveyGraph {
    /// Imports a JSON document with the default limits.
    pub fn from_json(input: &str) -> SurveyResult<Self> {
        SurveyDocument::from_json(input)?.to_graph()
    }

    pub fn from_json_with_limits(input: &str, limits: ResourceLimiter) -> SurveyResult<Self> {
        SurveyDocument::from_json_with_limits(input, limits)?.to_graph()
    }

    /// Exports the graph as a pretty-printed JSON document.
    pub fn to_json(&self) -> SurveyResult<String> {
        let document = SurveyDocument::from_graph(self);
        info!(nodes = document.questions.len(), "survey document exported");
        document.to_json()
    }
}

fn import_node_body(
    graph: &mut SurveyGraph,
    id: NodeId,
    record: &DocumentNode,
) -> SurveyResult<()> {
    let node = graph.node_mut(id)?;
    node.position = record.position;
    if record.is_info_node {
        node.notification_style = record
            .info_type
            .as_deref()
            .map(NotificationStyle::from_name)
            .unwrap_or_default();
        if !record.answers.is_empty() {
            warn!(node = %id, "notification answers ignored on import");
        }
        return Ok(());
    }
    if record.is_multiple_choice {
        node.selection_mode = SelectionMode::Multiple;
    }

    let mut has_other = false;
    for answer in &record.answers {
        let answer_id = graph.alloc_answer_id();
        let text = answer.text.clone().unwrap_or_default();
        let imported = if answer.is_other && !has_other {
            has_other = true;
            let mut other = Answer::other(
                answer_id,
                answer.max_length.unwrap_or(DEFAULT_OTHER_MAX_LENGTH),
            );
            other.text = text;
            if let Some(placeholder) = &answer.placeholder {
                other.placeholder = placeholder.clone();
            }
            other
        } else {
            if answer.is_other {
                warn!(node = %id, "extra free-text answer imported as a plain answer");
            }
            let mut plain = Answer::new(answer_id);
            plain.text = text;
            plain
        };
        graph.node_mut(id)?.answers.push(imported);
    }
    Ok(())
}

fn import_rules(
    graph: &mut SurveyGraph,
    id: NodeId,
    record: &DocumentNode,
    links: Vec<Option<NodeId>>,
) -> SurveyResult<()> {
    let node = graph.node_mut(id)?;
    if !node.is_multiple() {
        if !record.rules.is_empty() {
            debug!(node = %id, "rules on a single-choice question ignored");
        }
        return Ok(());
    }

    let mut rules: Vec<(u32, Rule)> = Vec::new();
    'rules: for (position, (rule, linked_to)) in record.rules.iter().zip(links).enumerate() {
        let mut imported = Rule::new(0);
        imported.linked_to = linked_to;
        for &index in &rule.answer_indices {
            if index < 0 {
                imported.slots.push(None);
                continue;
            }
            let Some(answer) = usize::try_from(index)
                .ok()
                .and_then(|index| node.answers.get(index))
            else {
                warn!(node = %id, rule = position, index, "rule names a missing answer; dropped");
                continue 'rules;
            };
            if !imported.contains(answer.id) {
                imported.slots.push(Some(answer.id));
            }
        }
        rules.push((rule.order.unwrap_or(position as u32), imported));
    }
    rules.sort_by_key(|(order, _)| *order);
    node.rules = rules.into_iter().map(|(_, rule)| rule).collect();
    node.renumber_rules();
    Ok(())
}

struct Resolver<'a> {
    graph: &'a SurveyGraph,
    ids: &'a [NodeId],
    by_key: &'a HashMap<String, NodeId>,
}

impl Resolver<'_> {
    fn resolve(
        &self,
        from: NodeId,
        reference: Option<&DocRef>,
        text: Option<&str>,
    ) -> Option<NodeId> {
        let reference = reference?;
        if let Some(&id) = reference.key().and_then(|key| self.by_key.get(&key)) {
            return Some(id);
        }
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            let by_text = self
                .graph
                .nodes()
                .iter()
                .find(|node| node.content == text)
                .map(|node| node.id);
            if by_text.is_some() {
                debug!(node = %from, text, "reference resolved by question text");
                return by_text;
            }
        }
        let by_order = reference
            .as_order()
            .filter(|order| *order >= 1)
            .and_then(|order| usize::try_from(order - 1).ok())
            .and_then(|index| self.ids.get(index))
            .copied();
        if by_order.is_none() {
            warn!(node = %from, ?reference, "unresolved reference dropped");
        }
        by_order
    }
}
