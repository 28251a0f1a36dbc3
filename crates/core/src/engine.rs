//! Traversal engine: decides the next node for a committed response and keeps
//! the history, navigation stack and path-modified flag of a run.
//!
//! The engine borrows the graph on every call and never mutates it. Links that
//! name a node missing from the graph count as absent, so a graph edited
//! mid-run degrades to an earlier end instead of an error.
//!
//! # Contracts
//! - A rejected step leaves the session state unchanged.
//! - While running, `current` always names the node on display.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{SurveyError, SurveyResult};
use crate::graph::SurveyGraph;
use crate::history::{AnswerSelection, HistoryEntry, NavEntry, ReviewItem};
use crate::model::{AnswerId, Node, NodeId};
use crate::response::{Response, Selection};
use crate::state::{SessionState, SessionStatus};
use crate::version::{ACKNOWLEDGED_LABEL, NO_SELECTION_LABEL, SKIPPED_LABEL};

/// Outcome of a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Moved(NodeId),
    Ended,
}

/// A scheduled notification advance. Valid only while `ticket` is current.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoAdvance {
    pub node: NodeId,
    pub delay: Duration,
    pub ticket: u64,
}

/// Where a backward step lands.
enum BackTarget {
    /// Index into the navigation stack.
    Stack(usize),
    /// The first node and its history index.
    First(NodeId, usize),
}

/// What a response resolved to, computed before any state changes.
struct Resolution {
    selection: AnswerSelection,
    label: String,
    destination: Option<NodeId>,
}

#[derive(Clone, Debug, Default)]
pub struct SurveyEngine {
    config: EngineConfig,
    state: SessionState,
}

impl SurveyEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: SessionState::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn current(&self) -> Option<NodeId> {
        self.state.current
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    pub fn nav_stack(&self) -> &[NavEntry] {
        &self.state.nav_stack
    }

    pub fn path_modified(&self) -> bool {
        self.state.path_modified
    }

    /// Resets the run and positions it on the first node.
    ///
    /// Refused when no node has content.
    pub fn start(&mut self, graph: &SurveyGraph) -> SurveyResult<Step> {
        if !graph.nodes().iter().any(Node::has_content) {
            return Err(SurveyError::EmptySurvey);
        }
        let start = graph.first_node().ok_or(SurveyError::EmptySurvey)?.id;
        self.state = SessionState::running_at(start, self.state.generation.wrapping_add(1));
        info!(node = %start, nodes = graph.len(), "survey started");
        Ok(self.settle(graph, Some(start)))
    }

    /// Commits a response for the current node and moves on.
    pub fn advance(&mut self, graph: &SurveyGraph, response: Response) -> SurveyResult<Step> {
        let current = self.require_current()?;
        let Some(node) = graph.node(current) else {
            warn!(node = %current, "current node vanished from the graph; ending run");
            self.state.end();
            return Ok(Step::Ended);
        };
        let resolution = resolve(graph, node, response)?;
        Ok(self.commit(graph, node, resolution))
    }

    /// Continues along the node's default link without answering.
    pub fn skip(&mut self, graph: &SurveyGraph) -> SurveyResult<Step> {
        self.advance(graph, Response::Skip)
    }

    /// Returns to the node left most recently.
    ///
    /// Navigation entries whose node was deleted from the graph are passed
    /// over. When nothing is left to return to and the current node is gone
    /// as well, the run ends.
    pub fn go_back(&mut self, graph: &SurveyGraph) -> SurveyResult<Step> {
        if !self.state.is_running() {
            return Err(SurveyError::NotRunning);
        }
        match self.back_target(graph) {
            Some(BackTarget::Stack(position)) => {
                let stale = self.state.nav_stack.len() - position - 1;
                if stale > 0 {
                    warn!(stale, "navigation entries for deleted nodes discarded");
                }
                let entry = self.state.nav_stack[position];
                self.state.nav_stack.truncate(position);
                self.return_to(entry.node, entry.history_index);
                debug!(node = %entry.node, history_index = entry.history_index, "went back");
                Ok(Step::Moved(entry.node))
            }
            Some(BackTarget::First(start, index)) => {
                self.state.nav_stack.clear();
                self.return_to(start, index);
                debug!(node = %start, "went back to the first node");
                Ok(Step::Moved(start))
            }
            None => {
                let current_alive = self.state.current.is_some_and(|id| graph.contains(id));
                if current_alive {
                    return Err(SurveyError::NothingToGoBack);
                }
                warn!(
                    current = ?self.state.current,
                    "current node vanished with nowhere to go back to; ending run"
                );
                self.finish();
                Ok(Step::Ended)
            }
        }
    }

    /// True when [`go_back`](Self::go_back) would move to another node.
    pub fn can_go_back(&self, graph: &SurveyGraph) -> bool {
        self.state.is_running() && self.back_target(graph).is_some()
    }

    /// True when the current node is a question whose default link still
    /// names a node in the graph.
    pub fn can_skip(&self, graph: &SurveyGraph) -> bool {
        self.state
            .current
            .and_then(|id| graph.node(id))
            .is_some_and(|node| {
                !node.is_notification() && live(graph, node.next_link).is_some()
            })
    }

    /// Topmost navigation entry on a live node, else the first node when the
    /// run has recorded it and moved away from it.
    fn back_target(&self, graph: &SurveyGraph) -> Option<BackTarget> {
        if let Some(position) = self
            .state
            .nav_stack
            .iter()
            .rposition(|entry| graph.contains(entry.node))
        {
            return Some(BackTarget::Stack(position));
        }
        let start = graph.first_node()?.id;
        if self.state.current == Some(start) {
            return None;
        }
        self.state
            .history
            .iter()
            .position(|entry| entry.node == start)
            .map(|index| BackTarget::First(start, index))
    }

    fn return_to(&mut self, node: NodeId, history_index: usize) {
        self.state.current = Some(node);
        self.state.revisiting = Some(history_index);
        self.state.path_modified = false;
        self.state.touch();
    }

    /// Answer summary: one item per question, notifications excluded.
    ///
    /// A node answered more than once is reported with the answer on the
    /// navigation path, or the latest one when none is on the path.
    pub fn review(&self, graph: &SurveyGraph) -> Vec<ReviewItem> {
        let mut on_path: HashSet<usize> = self
            .state
            .nav_stack
            .iter()
            .map(|entry| entry.history_index)
            .collect();
        on_path.extend(self.state.revisiting);

        let mut chosen: HashMap<NodeId, usize> = HashMap::new();
        for (index, entry) in self.state.history.iter().enumerate() {
            match chosen.get(&entry.node) {
                Some(previous) if on_path.contains(previous) && !on_path.contains(&index) => {}
                _ => {
                    chosen.insert(entry.node, index);
                }
            }
        }

        let picked: BTreeSet<usize> = chosen.into_values().collect();
        picked
            .into_iter()
            .filter_map(|index| {
                let entry = &self.state.history[index];
                if entry.is_notification {
                    return None;
                }
                let position = graph
                    .position_of(entry.node)
                    .map(|pos| pos + 1)
                    .unwrap_or(index + 1);
                Some(ReviewItem {
                    position,
                    node: entry.node,
                    question: entry.question.clone(),
                    answer: entry.answer_label.clone(),
                })
            })
            .collect()
    }

    /// The auto-advance the caller may schedule for the node on display.
    pub fn pending_auto_advance(&self, graph: &SurveyGraph) -> Option<AutoAdvance> {
        if !self.state.is_running() {
            return None;
        }
        let delay = self.config.auto_advance_delay()?;
        let node = graph.node(self.state.current?)?;
        if !node.is_notification() {
            return None;
        }
        live(graph, node.next_link)?;
        Some(AutoAdvance {
            node: node.id,
            delay,
            ticket: self.state.generation,
        })
    }

    /// Fires a scheduled auto-advance. Stale tickets are ignored.
    pub fn fire_auto_advance(
        &mut self,
        graph: &SurveyGraph,
        ticket: u64,
    ) -> SurveyResult<Option<Step>> {
        if !self.state.is_running() || ticket != self.state.generation {
            debug!(ticket, "auto-advance suppressed");
            return Ok(None);
        }
        self.advance(graph, Response::Acknowledge).map(Some)
    }

    fn require_current(&self) -> SurveyResult<NodeId> {
        if !self.state.is_running() {
            return Err(SurveyError::NotRunning);
        }
        self.state.current.ok_or(SurveyError::NotRunning)
    }

    fn commit(&mut self, graph: &SurveyGraph, node: &Node, resolution: Resolution) -> Step {
        self.state.path_modified = false;
        let recorded = self
            .state
            .revisiting
            .take()
            .filter(|&index| {
                self.state
                    .history
                    .get(index)
                    .is_some_and(|entry| entry.node == node.id)
            });

        let entry = HistoryEntry {
            node: node.id,
            question: node.content.clone(),
            answer_label: resolution.label,
            selection: resolution.selection,
            is_notification: node.is_notification(),
        };
        let (history_index, unchanged) = match recorded {
            Some(index) if self.state.history[index].selection == entry.selection => {
                (index, true)
            }
            Some(index) => {
                debug!(node = %node.id, cut = index, "answer changed; truncating history");
                self.state.truncate_from(index);
                self.state.path_modified = true;
                (self.state.record(entry), false)
            }
            None => (self.state.record(entry), false),
        };

        let step = match resolution.destination {
            Some(target) => {
                self.state.nav_stack.push(NavEntry {
                    node: node.id,
                    history_index,
                });
                self.settle(graph, Some(target))
            }
            None => Step::Ended,
        };

        if unchanged {
            self.follow_recorded(history_index, step);
        }
        if step == Step::Ended {
            self.finish();
        } else {
            self.state.touch();
        }
        step
    }

    /// After an unchanged re-submission, keeps walking the recorded entries
    /// when the step landed where the recording says it did.
    fn follow_recorded(&mut self, index: usize, step: Step) {
        let next = index + 1;
        let matches = match (step, self.state.history.get(next)) {
            (Step::Moved(target), Some(entry)) => entry.node == target,
            _ => false,
        };
        if matches {
            self.state.revisiting = Some(next);
        } else if self.state.history.len() > next {
            debug!(cut = next, "recorded path no longer applies; truncating history");
            self.state.truncate_from(next);
            self.state.path_modified = true;
        }
    }

    /// Moves onto `target`, passing through answer-less questions that have a
    /// default link.
    fn settle(&mut self, graph: &SurveyGraph, mut target: Option<NodeId>) -> Step {
        let mut passed: HashSet<NodeId> = HashSet::new();
        loop {
            let Some(id) = target else {
                return Step::Ended;
            };
            let Some(node) = graph.node(id) else {
                warn!(node = %id, "link target missing; ending run");
                self.finish();
                return Step::Ended;
            };
            if node.is_notification() || node.valid_answers().next().is_some() {
                self.state.current = Some(id);
                self.state.status = SessionStatus::Running;
                return Step::Moved(id);
            }
            let Some(next) = live(graph, node.next_link) else {
                debug!(node = %id, "question without answers or default link ends the run");
                self.finish();
                return Step::Ended;
            };
            if !passed.insert(id) || passed.len() > self.config.max_pass_through {
                warn!(node = %id, hops = passed.len(), "pass-through guard tripped; ending run");
                self.finish();
                return Step::Ended;
            }
            debug!(node = %id, next = %next, "passing through question without answers");
            target = Some(next);
        }
    }

    fn finish(&mut self) {
        if !self.state.is_ended() {
            info!(answered = self.state.history.len(), "survey ended");
        }
        self.state.end();
    }
}

/// Treats links to missing nodes as absent.
fn live(graph: &SurveyGraph, link: Option<NodeId>) -> Option<NodeId> {
    link.filter(|target| graph.contains(*target))
}

fn resolve(graph: &SurveyGraph, node: &Node, response: Response) -> SurveyResult<Resolution> {
    if node.is_notification() {
        let destination = live(graph, node.next_link);
        debug!(node = %node.id, ?destination, "notification acknowledged");
        return Ok(Resolution {
            selection: AnswerSelection::Acknowledged,
            label: ACKNOWLEDGED_LABEL.to_string(),
            destination,
        });
    }
    match response {
        Response::Skip => {
            let destination = live(graph, node.next_link).ok_or_else(|| {
                SurveyError::InvalidStep(format!("'{}' has no default link to skip to", node.id))
            })?;
            debug!(node = %node.id, next = %destination, "question skipped");
            Ok(Resolution {
                selection: AnswerSelection::Skipped,
                label: SKIPPED_LABEL.to_string(),
                destination: Some(destination),
            })
        }
        Response::Acknowledge => Err(SurveyError::InvalidStep(format!(
            "'{}' is a question and needs an answer",
            node.id
        ))),
        Response::Single(selection) if !node.is_multiple() => {
            resolve_single(graph, node, selection)
        }
        Response::Multiple { selections } if node.is_multiple() => {
            resolve_multiple(graph, node, selections)
        }
        Response::Single(_) => Err(SurveyError::InvalidStep(format!(
            "'{}' expects a set of answers",
            node.id
        ))),
        Response::Multiple { .. } => Err(SurveyError::InvalidStep(format!(
            "'{}' expects exactly one answer",
            node.id
        ))),
    }
}

/// Checks one selection against the node and normalizes its free text.
///
/// Returns `None` for an "Other" answer whose text is blank.
fn normalize_selection(node: &Node, selection: Selection) -> SurveyResult<Option<Selection>> {
    let answer = node
        .answers
        .get(selection.index)
        .ok_or(SurveyError::AnswerOutOfRange {
            node: node.id,
            index: selection.index,
        })?;
    if !answer.is_valid() {
        return Err(SurveyError::InvalidStep(format!(
            "answer {} of '{}' is not offered",
            selection.index, node.id
        )));
    }
    if !answer.is_other {
        return Ok(Some(Selection::new(selection.index)));
    }
    let text = selection.other_text.as_deref().unwrap_or("").trim();
    if text.is_empty() {
        return Ok(None);
    }
    if text.chars().count() > answer.max_length {
        return Err(SurveyError::InvalidStep(format!(
            "free text for '{}' is longer than {} characters",
            node.id, answer.max_length
        )));
    }
    Ok(Some(Selection::other(selection.index, text)))
}

fn selection_label(node: &Node, selection: &Selection) -> String {
    let text = node.answers[selection.index].text.trim();
    match &selection.other_text {
        Some(other) => format!("{text}: {other}"),
        None => text.to_string(),
    }
}

fn resolve_single(
    graph: &SurveyGraph,
    node: &Node,
    selection: Selection,
) -> SurveyResult<Resolution> {
    let index = selection.index;
    let selection = normalize_selection(node, selection)?.ok_or_else(|| {
        SurveyError::InvalidStep(format!("free text for '{}' must not be empty", node.id))
    })?;
    let answer = &node.answers[index];
    let destination = match live(graph, answer.linked_to) {
        Some(target) => {
            debug!(node = %node.id, answer = index, next = %target, "answer link");
            Some(target)
        }
        None => {
            let fallback = live(graph, node.next_link);
            debug!(node = %node.id, answer = index, next = ?fallback, "default link");
            fallback
        }
    };
    Ok(Resolution {
        label: selection_label(node, &selection),
        selection: AnswerSelection::Single(selection),
        destination,
    })
}

fn resolve_multiple(
    graph: &SurveyGraph,
    node: &Node,
    selections: Vec<Selection>,
) -> SurveyResult<Resolution> {
    let mut checked: BTreeMap<usize, Selection> = BTreeMap::new();
    for selection in selections {
        if let Some(selection) = normalize_selection(node, selection)? {
            checked.entry(selection.index).or_insert(selection);
        }
    }
    let selections: Vec<Selection> = checked.into_values().collect();

    if selections.is_empty() {
        debug!(node = %node.id, "empty selection ends the run");
        return Ok(Resolution {
            selection: AnswerSelection::Multiple { selections },
            label: NO_SELECTION_LABEL.to_string(),
            destination: None,
        });
    }

    let label = selections
        .iter()
        .map(|selection| selection_label(node, selection))
        .collect::<Vec<_>>()
        .join(", ");
    let chosen: BTreeSet<AnswerId> = selections
        .iter()
        .map(|selection| node.answers[selection.index].id)
        .collect();

    let destination = resolve_rules(graph, node, &chosen)
        .or_else(|| {
            let [only] = selections.as_slice() else {
                return None;
            };
            let target = live(graph, node.answers[only.index].linked_to)?;
            debug!(node = %node.id, answer = only.index, next = %target, "single answer link");
            Some(target)
        })
        .or_else(|| {
            let fallback = live(graph, node.next_link);
            debug!(node = %node.id, next = ?fallback, "default link");
            fallback
        });

    Ok(Resolution {
        selection: AnswerSelection::Multiple { selections },
        label,
        destination,
    })
}

/// First rule, by priority, whose answers equal the selection exactly and
/// whose link is live.
fn resolve_rules(
    graph: &SurveyGraph,
    node: &Node,
    chosen: &BTreeSet<AnswerId>,
) -> Option<NodeId> {
    for rule in node.rules_by_priority() {
        if !rule.has_filled_slot() || rule.answer_set() != *chosen {
            continue;
        }
        if let Some(target) = live(graph, rule.linked_to) {
            debug!(node = %node.id, rule = rule.order, next = %target, "rule matched");
            return Some(target);
        }
    }
    None
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
