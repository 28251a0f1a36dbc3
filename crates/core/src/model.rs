//! Survey graph entities: nodes, answers and multi-select rules.
//!
//! These types carry data and small helpers only. All structural edits go
//! through [`SurveyGraph`](crate::SurveyGraph) so that link integrity holds.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stable node identifier. Never reused within a graph, even after deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Stable answer identifier, unique across the whole graph.
///
/// Rules point at answers through this id, so reordering or deleting other
/// answers never changes which answers a rule talks about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerId(pub u32);

impl fmt::Display for AnswerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "answer-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Question,
    Notification,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Single,
    Multiple,
}

/// Cosmetic style of a notification node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStyle {
    Normal,
    Success,
    #[default]
    Warning,
    Danger,
}

impl NotificationStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStyle::Normal => "normal",
            NotificationStyle::Success => "success",
            NotificationStyle::Warning => "warning",
            NotificationStyle::Danger => "danger",
        }
    }

    /// Parses a document style name; unknown names fall back to the default.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "normal" | "info" => NotificationStyle::Normal,
            "success" => NotificationStyle::Success,
            "danger" | "error" => NotificationStyle::Danger,
            _ => NotificationStyle::Warning,
        }
    }
}

/// Chart coordinates. Kept only so that documents survive a round-trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

pub const DEFAULT_OTHER_MAX_LENGTH: usize = 80;
pub const DEFAULT_OTHER_LABEL: &str = "Other";
pub const DEFAULT_OTHER_PLACEHOLDER: &str = "Please specify...";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub text: String,
    pub linked_to: Option<NodeId>,
    pub is_other: bool,
    pub placeholder: String,
    pub max_length: usize,
}

impl Answer {
    pub fn new(id: AnswerId) -> Self {
        Self {
            id,
            text: String::new(),
            linked_to: None,
            is_other: false,
            placeholder: String::new(),
            max_length: DEFAULT_OTHER_MAX_LENGTH,
        }
    }

    /// Creates the free-text "Other" answer.
    pub fn other(id: AnswerId, max_length: usize) -> Self {
        Self {
            id,
            text: DEFAULT_OTHER_LABEL.to_string(),
            linked_to: None,
            is_other: true,
            placeholder: DEFAULT_OTHER_PLACEHOLDER.to_string(),
            max_length,
        }
    }

    /// Whitespace-only answers are invisible to respondents.
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Exact-match condition over the answers selected on a multi-select node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Selection slots in editor order; `None` is an unfilled slot.
    pub slots: Vec<Option<AnswerId>>,
    pub linked_to: Option<NodeId>,
    /// Priority, always equal to the rule's position in its node.
    pub order: u32,
}

impl Rule {
    pub fn new(order: u32) -> Self {
        Self {
            slots: Vec::new(),
            linked_to: None,
            order,
        }
    }

    /// The filled slots as a set, placeholders excluded.
    pub fn answer_set(&self) -> BTreeSet<AnswerId> {
        self.slots.iter().flatten().copied().collect()
    }

    pub fn has_filled_slot(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    pub fn contains(&self, answer: AnswerId) -> bool {
        self.slots.contains(&Some(answer))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub content: String,
    pub selection_mode: SelectionMode,
    pub answers: Vec<Answer>,
    pub rules: Vec<Rule>,
    pub next_link: Option<NodeId>,
    pub notification_style: NotificationStyle,
    pub position: Option<Position>,
}

impl Node {
    pub fn new(id: NodeId, content: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
            selection_mode: SelectionMode::Single,
            answers: Vec::new(),
            rules: Vec::new(),
            next_link: None,
            notification_style: NotificationStyle::default(),
            position: None,
        }
    }

    #[inline]
    pub fn is_notification(&self) -> bool {
        self.kind == NodeKind::Notification
    }

    /// Notifications are always treated as single selection.
    #[inline]
    pub fn is_multiple(&self) -> bool {
        self.kind == NodeKind::Question && self.selection_mode == SelectionMode::Multiple
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Answers shown to respondents, paired with their position in `answers`.
    pub fn valid_answers(&self) -> impl Iterator<Item = (usize, &Answer)> {
        self.answers
            .iter()
            .enumerate()
            .filter(|(_, answer)| answer.is_valid())
    }

    pub fn answer_index(&self, id: AnswerId) -> Option<usize> {
        self.answers.iter().position(|answer| answer.id == id)
    }

    pub fn other_answer_index(&self) -> Option<usize> {
        self.answers.iter().position(|answer| answer.is_other)
    }

    /// Rules ordered by ascending priority.
    pub fn rules_by_priority(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by_key(|rule| rule.order);
        rules
    }

    /// Every node id this node can lead to, without duplicates.
    pub fn outgoing(&self) -> Vec<NodeId> {
        let mut targets = Vec::new();
        let answer_links = self
            .answers
            .iter()
            .filter(|answer| answer.is_valid())
            .filter_map(|answer| answer.linked_to);
        let rule_links = self.rules.iter().filter_map(|rule| rule.linked_to);
        for target in answer_links.chain(rule_links).chain(self.next_link) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// Clears every link from this node to `target`. Returns true if any changed.
    pub(crate) fn unlink(&mut self, target: NodeId) -> bool {
        let mut changed = false;
        if self.next_link == Some(target) {
            self.next_link = None;
            changed = true;
        }
        for answer in &mut self.answers {
            if answer.linked_to == Some(target) {
                answer.linked_to = None;
                changed = true;
            }
        }
        for rule in &mut self.rules {
            if rule.linked_to == Some(target) {
                rule.linked_to = None;
                changed = true;
            }
        }
        changed
    }

    pub(crate) fn renumber_rules(&mut self) {
        for (index, rule) in self.rules.iter_mut().enumerate() {
            rule.order = index as u32;
        }
    }
}
