//! Reachability, statistics and authoring checks over a survey graph.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use super::*;

/// Statistics about the survey graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub questions: usize,
    pub notifications: usize,
    /// Questions in multiple-selection mode.
    pub multiple_choice: usize,
    pub rules: usize,
    /// Distinct outgoing links summed over all nodes.
    pub links: usize,
    pub reachable_nodes: usize,
    pub unreachable_nodes: usize,
}

/// A problem an author should look at before running the survey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphIssue {
    EmptyContent {
        node: NodeId,
    },
    DanglingLink {
        node: NodeId,
        target: NodeId,
    },
    /// A rule with no filled slot can never match.
    EmptyRule {
        node: NodeId,
        rule: usize,
    },
    UnfilledSlot {
        node: NodeId,
        rule: usize,
        slot: usize,
    },
    /// A slot names an answer the node no longer owns.
    ForeignAnswer {
        node: NodeId,
        rule: usize,
        slot: usize,
    },
    Unreachable {
        node: NodeId,
    },
}

impl GraphIssue {
    pub fn node(&self) -> NodeId {
        match *self {
            GraphIssue::EmptyContent { node }
            | GraphIssue::DanglingLink { node, .. }
            | GraphIssue::EmptyRule { node, .. }
            | GraphIssue::UnfilledSlot { node, .. }
            | GraphIssue::ForeignAnswer { node, .. }
            | GraphIssue::Unreachable { node } => node,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GraphIssue::EmptyContent { .. } => "empty_content",
            GraphIssue::DanglingLink { .. } => "dangling_link",
            GraphIssue::EmptyRule { .. } => "empty_rule",
            GraphIssue::UnfilledSlot { .. } => "unfilled_slot",
            GraphIssue::ForeignAnswer { .. } => "foreign_answer",
            GraphIssue::Unreachable { .. } => "unreachable",
        }
    }
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::EmptyContent { node } => write!(f, "'{node}' has no content"),
            GraphIssue::DanglingLink { node, target } => {
                write!(f, "'{node}' links to missing node '{target}'")
            }
            GraphIssue::EmptyRule { node, rule } => {
                write!(f, "rule {} of '{node}' selects no answer", rule + 1)
            }
            GraphIssue::UnfilledSlot { node, rule, slot } => write!(
                f,
                "slot {} of rule {} of '{node}' is unfilled",
                slot + 1,
                rule + 1
            ),
            GraphIssue::ForeignAnswer { node, rule, slot } => write!(
                f,
                "slot {} of rule {} of '{node}' names an unknown answer",
                slot + 1,
                rule + 1
            ),
            GraphIssue::Unreachable { node } => {
                write!(f, "'{node}' cannot be reached from the first node")
            }
        }
    }
}

impl SurveyGraph {
    /// Nodes reachable from the first node, in breadth-first order.
    pub fn reachable_from_start(&self) -> Vec<NodeId> {
        let Some(start) = self.first_node() else {
            return Vec::new();
        };
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut order = Vec::new();

        queue.push_back(start.id);
        visited.insert(start.id);

        while let Some(node_id) = queue.pop_front() {
            order.push(node_id);
            let Some(node) = self.node(node_id) else {
                continue;
            };
            for target in node.outgoing() {
                if self.contains(target) && visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        order
    }

    /// Nodes no path from the first node leads to, in display order.
    pub fn unreachable_nodes(&self) -> Vec<NodeId> {
        let reachable: HashSet<NodeId> = self.reachable_from_start().into_iter().collect();
        self.nodes
            .iter()
            .map(|node| node.id)
            .filter(|id| !reachable.contains(id))
            .collect()
    }

    /// Nodes with no outgoing link of any kind. Every run through them ends.
    pub fn dead_ends(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.outgoing().is_empty())
            .map(|node| node.id)
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let reachable_nodes = self.reachable_from_start().len();
        let notifications = self.nodes.iter().filter(|n| n.is_notification()).count();
        let multiple_choice = self.nodes.iter().filter(|n| n.is_multiple()).count();
        let rules = self.nodes.iter().map(|n| n.rules.len()).sum();
        let links = self.nodes.iter().map(|n| n.outgoing().len()).sum();

        GraphStats {
            total_nodes: self.nodes.len(),
            questions: self.nodes.len() - notifications,
            notifications,
            multiple_choice,
            rules,
            links,
            reachable_nodes,
            unreachable_nodes: self.nodes.len() - reachable_nodes,
        }
    }

    /// Collects authoring problems in display order.
    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();
        for node in &self.nodes {
            if !node.has_content() {
                issues.push(GraphIssue::EmptyContent { node: node.id });
            }
            let targets = node
                .answers
                .iter()
                .filter_map(|answer| answer.linked_to)
                .chain(node.rules.iter().filter_map(|rule| rule.linked_to))
                .chain(node.next_link);
            for target in targets {
                if !self.contains(target) {
                    issues.push(GraphIssue::DanglingLink {
                        node: node.id,
                        target,
                    });
                }
            }
            if !node.is_multiple() {
                continue;
            }
            for (rule_index, rule) in node.rules.iter().enumerate() {
                if !rule.has_filled_slot() {
                    issues.push(GraphIssue::EmptyRule {
                        node: node.id,
                        rule: rule_index,
                    });
                }
                for (slot, held) in rule.slots.iter().enumerate() {
                    match held {
                        None => issues.push(GraphIssue::UnfilledSlot {
                            node: node.id,
                            rule: rule_index,
                            slot,
                        }),
                        Some(answer) if node.answer_index(*answer).is_none() => {
                            issues.push(GraphIssue::ForeignAnswer {
                                node: node.id,
                                rule: rule_index,
                                slot,
                            })
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        issues.extend(
            self.unreachable_nodes()
                .into_iter()
                .map(|node| GraphIssue::Unreachable { node }),
        );
        issues
    }
}
