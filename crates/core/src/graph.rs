//! Survey graph and its mutation API.
//!
//! The graph is an ordered sequence of nodes (display order) plus an id-keyed
//! lookup. Links are id based, so reordering never changes traversal.
//!
//! # Invariants
//! - Every `next_link`, answer link and rule link names an existing node.
//! - `next_node_id` / `next_answer_id` are greater than any id ever issued.
//! - Rule `order` fields equal their position within the owning node.
//!
//! Mutations that address a missing node, answer or rule return an error and
//! leave the graph untouched, so callers may invoke them opportunistically.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{SurveyError, SurveyResult};
use crate::model::{AnswerId, Node, NodeId, NodeKind, NotificationStyle, SelectionMode};

mod analysis;
mod answers;
mod rules;

pub use analysis::{GraphIssue, GraphStats};

const EMPTY_QUESTION_PREVIEW: &str = "(empty question)";
const EMPTY_NOTIFICATION_PREVIEW: &str = "(empty notification)";

#[derive(Clone, Debug, Default)]
pub struct SurveyGraph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    next_node_id: u32,
    next_answer_id: u32,
    title: String,
    description: String,
    /// Cosmetic chart data carried through import/export untouched.
    link_label_positions: Map<String, Value>,
    modified: bool,
}

impl SurveyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in display order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Zero-based display position of a node.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// The node a run starts from.
    pub fn first_node(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.modified = true;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.modified = true;
    }

    pub fn link_label_positions(&self) -> &Map<String, Value> {
        &self.link_label_positions
    }

    pub fn set_link_label_positions(&mut self, positions: Map<String, Value>) {
        self.link_label_positions = positions;
    }

    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Short label for pickers and reports: trimmed content cut to `chars`.
    pub fn preview(&self, id: NodeId, chars: usize) -> Option<String> {
        let node = self.node(id)?;
        let text = node.content.trim();
        if text.is_empty() {
            let placeholder = if node.is_notification() {
                EMPTY_NOTIFICATION_PREVIEW
            } else {
                EMPTY_QUESTION_PREVIEW
            };
            return Some(placeholder.to_string());
        }
        if text.chars().count() > chars {
            let cut: String = text.chars().take(chars).collect();
            Some(format!("{cut}..."))
        } else {
            Some(text.to_string())
        }
    }

    /// Nodes that `id` may link to: every other node with content.
    pub fn link_candidates(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.id != id && node.has_content())
            .map(|node| node.id)
            .collect()
    }

    /// True when the node has a default link or an offered answer with a
    /// link. Rule links do not count.
    pub fn has_any_link(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| {
            node.next_link.is_some()
                || node
                    .valid_answers()
                    .any(|(_, answer)| answer.linked_to.is_some())
        })
    }

    // =========================================================================
    // Node operations
    // =========================================================================

    /// Appends a node with a fresh id and returns that id.
    pub fn create_node(&mut self, content: impl Into<String>, is_notification: bool) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        let kind = if is_notification {
            NodeKind::Notification
        } else {
            NodeKind::Question
        };
        self.index.insert(id, self.nodes.len());
        self.nodes.push(Node::new(id, content, kind));
        self.modified = true;
        id
    }

    /// Removes a node and clears every link that pointed at it.
    pub fn delete_node(&mut self, id: NodeId) -> SurveyResult<()> {
        let pos = self.require(id)?;
        self.nodes.remove(pos);
        for node in &mut self.nodes {
            node.unlink(id);
        }
        self.reindex();
        self.modified = true;

        debug_assert!(
            self.nodes.iter().all(|node| !node.outgoing().contains(&id)),
            "Postcondition: no link may reference a deleted node"
        );
        Ok(())
    }

    /// Moves a node within the display order. Links are unaffected.
    pub fn reorder_nodes(&mut self, from: usize, to: usize) -> SurveyResult<()> {
        let len = self.nodes.len();
        if from >= len {
            return Err(SurveyError::PositionOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(SurveyError::PositionOutOfRange { index: to, len });
        }
        let node = self.nodes.remove(from);
        self.nodes.insert(to, node);
        self.reindex();
        self.modified = true;
        Ok(())
    }

    pub fn update_content(&mut self, id: NodeId, content: impl Into<String>) -> SurveyResult<()> {
        self.node_mut(id)?.content = content.into();
        self.modified = true;
        Ok(())
    }

    /// Switches between question and notification.
    ///
    /// Notifications carry no answers, so switching to one drops answers and
    /// rules and resets the selection mode.
    pub fn set_kind(&mut self, id: NodeId, is_notification: bool) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        if is_notification {
            node.kind = NodeKind::Notification;
            node.answers.clear();
            node.rules.clear();
            node.selection_mode = SelectionMode::Single;
        } else {
            node.kind = NodeKind::Question;
        }
        self.modified = true;
        Ok(())
    }

    pub fn set_notification_style(
        &mut self,
        id: NodeId,
        style: NotificationStyle,
    ) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        if !node.is_notification() {
            return Err(SurveyError::InvalidEdit(format!(
                "'{id}' is not a notification"
            )));
        }
        node.notification_style = style;
        self.modified = true;
        Ok(())
    }

    /// Sets or clears the default continuation of a node.
    pub fn set_next_link(&mut self, id: NodeId, target: Option<NodeId>) -> SurveyResult<()> {
        self.require(id)?;
        self.check_target(target)?;
        self.node_mut(id)?.next_link = target;
        self.modified = true;
        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    pub(crate) fn node_mut(&mut self, id: NodeId) -> SurveyResult<&mut Node> {
        let pos = self.require(id)?;
        Ok(&mut self.nodes[pos])
    }

    pub(crate) fn alloc_answer_id(&mut self) -> AnswerId {
        let id = AnswerId(self.next_answer_id);
        self.next_answer_id += 1;
        id
    }

    fn require(&self, id: NodeId) -> SurveyResult<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(SurveyError::NodeNotFound(id))
    }

    fn check_target(&self, target: Option<NodeId>) -> SurveyResult<()> {
        match target {
            Some(target) if !self.contains(target) => Err(SurveyError::InvalidLink(format!(
                "target '{target}' does not exist"
            ))),
            _ => Ok(()),
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id, pos))
            .collect();
    }
}

#[cfg(test)]
#[path = "tests/graph_tests.rs"]
mod tests;
