//! Respondent input fed into the traversal engine.

use serde::{Deserialize, Serialize};

/// One checked answer, addressed by its position in the node's answer list.
///
/// `other_text` carries the free-text value typed next to an "Other" answer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Selection {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_text: Option<String>,
}

impl Selection {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            other_text: None,
        }
    }

    pub fn other(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            other_text: Some(text.into()),
        }
    }
}

/// A committed response for the current node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// One answer on a single-select question.
    Single(Selection),
    /// The checked answers on a multi-select question.
    Multiple { selections: Vec<Selection> },
    /// Continue along the node's default link without answering.
    Skip,
    /// Dismiss a notification.
    Acknowledge,
}

impl Response {
    pub fn single(index: usize) -> Self {
        Response::Single(Selection::new(index))
    }

    pub fn other(index: usize, text: impl Into<String>) -> Self {
        Response::Single(Selection::other(index, text))
    }

    pub fn multiple(indices: impl IntoIterator<Item = usize>) -> Self {
        Response::Multiple {
            selections: indices.into_iter().map(Selection::new).collect(),
        }
    }

    pub fn multiple_with(selections: Vec<Selection>) -> Self {
        Response::Multiple { selections }
    }
}
