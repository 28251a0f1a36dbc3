//! Records kept while a respondent walks the survey.

use serde::{Deserialize, Serialize};

use crate::model::NodeId;
use crate::response::Selection;

/// The answer recorded for a visited node, normalized for comparison.
///
/// Multiple selections are sorted by index and carry free text only on
/// "Other" answers, so two equal responses compare equal whatever order the
/// respondent checked the boxes in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerSelection {
    Single(Selection),
    Multiple { selections: Vec<Selection> },
    Skipped,
    Acknowledged,
}

impl AnswerSelection {
    /// Selected answer positions; empty for skips and acknowledgements.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            AnswerSelection::Single(selection) => vec![selection.index],
            AnswerSelection::Multiple { selections } => {
                selections.iter().map(|s| s.index).collect()
            }
            AnswerSelection::Skipped | AnswerSelection::Acknowledged => Vec::new(),
        }
    }
}

/// One visited node and the answer given there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub node: NodeId,
    /// Node content at visit time; later edits do not change it.
    pub question: String,
    pub answer_label: String,
    pub selection: AnswerSelection,
    pub is_notification: bool,
}

/// Back-navigation record: a node that was left and its history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub node: NodeId,
    pub history_index: usize,
}

/// One line of the respondent-facing answer summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// 1-based display position of the node in the graph.
    pub position: usize,
    pub node: NodeId,
    pub question: String,
    pub answer: String,
}
