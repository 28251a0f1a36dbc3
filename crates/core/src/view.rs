//! Observable description of a run for renderers and deterministic traces.
//!
//! These types carry only what a front-end shows, never engine internals.

use serde::{Deserialize, Serialize};

use crate::engine::SurveyEngine;
use crate::graph::SurveyGraph;
use crate::history::ReviewItem;
use crate::model::NodeId;
use crate::state::SessionStatus;

/// One answer offered to the respondent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOption {
    /// Position in the node's answer list; responses refer to this index.
    pub index: usize,
    pub text: String,
    pub is_other: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    pub has_link: bool,
}

/// What to render for the current state of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurveyView {
    Idle,
    Question {
        node: NodeId,
        /// 1-based display position.
        position: usize,
        content: String,
        multiple: bool,
        options: Vec<ViewOption>,
        can_skip: bool,
        /// No answer leads anywhere; the next commit ends the run.
        is_end: bool,
        can_go_back: bool,
        path_modified: bool,
    },
    Notification {
        node: NodeId,
        position: usize,
        content: String,
        style: String,
        /// Acknowledging ends the run.
        is_end: bool,
        can_go_back: bool,
    },
    End {
        answered: usize,
    },
}

impl SurveyView {
    pub fn from_engine(graph: &SurveyGraph, engine: &SurveyEngine) -> Self {
        match engine.status() {
            SessionStatus::NotStarted => return SurveyView::Idle,
            SessionStatus::Ended => {
                return SurveyView::End {
                    answered: engine.review(graph).len(),
                }
            }
            SessionStatus::Running => {}
        }
        let Some(node) = engine.current().and_then(|id| graph.node(id)) else {
            return SurveyView::End {
                answered: engine.review(graph).len(),
            };
        };
        let position = graph.position_of(node.id).map_or(0, |pos| pos + 1);
        let can_go_back = engine.can_go_back(graph);
        let is_end = !graph.has_any_link(node.id);

        if node.is_notification() {
            return SurveyView::Notification {
                node: node.id,
                position,
                content: node.content.clone(),
                style: node.notification_style.as_str().to_string(),
                is_end,
                can_go_back,
            };
        }

        let options = node
            .valid_answers()
            .map(|(index, answer)| ViewOption {
                index,
                text: answer.text.trim().to_string(),
                is_other: answer.is_other,
                placeholder: answer.is_other.then(|| answer.placeholder.clone()),
                max_length: answer.is_other.then_some(answer.max_length),
                has_link: answer.linked_to.is_some(),
            })
            .collect();
        SurveyView::Question {
            node: node.id,
            position,
            content: node.content.clone(),
            multiple: node.is_multiple(),
            options,
            can_skip: engine.can_skip(graph),
            is_end,
            can_go_back,
            path_modified: engine.path_modified(),
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            SurveyView::Question { node, .. } | SurveyView::Notification { node, .. } => {
                Some(*node)
            }
            SurveyView::Idle | SurveyView::End { .. } => None,
        }
    }
}

/// Compact digest of the session state at one trace step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDigest {
    pub status: SessionStatus,
    pub current: Option<NodeId>,
    pub history_len: usize,
    pub nav_depth: usize,
    pub path_modified: bool,
}

impl StateDigest {
    pub fn from_engine(engine: &SurveyEngine) -> Self {
        Self {
            status: engine.status(),
            current: engine.current(),
            history_len: engine.history().len(),
            nav_depth: engine.nav_stack().len(),
            path_modified: engine.path_modified(),
        }
    }
}

/// A single scripted input and the state it produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Step number (0-indexed).
    pub step: u32,
    pub input: String,
    pub view: SurveyView,
    pub state: StateDigest,
}

/// A complete headless run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTrace {
    pub title: String,
    pub steps: Vec<TraceStep>,
    pub review: Vec<ReviewItem>,
}

impl RunTrace {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, input: impl Into<String>, view: SurveyView, state: StateDigest) {
        let step = self.steps.len() as u32;
        self.steps.push(TraceStep {
            step,
            input: input.into(),
            view,
            state,
        });
    }
}
