use super::*;
use crate::model::Rule;

impl SurveyGraph {
    /// Switches a question between single and multiple selection.
    ///
    /// Rules only mean something on multi-select nodes, so switching back to
    /// single selection drops them.
    pub fn toggle_selection_mode(&mut self, id: NodeId, multiple: bool) -> SurveyResult<()> {
        if multiple {
            self.require_question(id)?;
        }
        let node = self.node_mut(id)?;
        if multiple {
            node.selection_mode = SelectionMode::Multiple;
        } else {
            node.selection_mode = SelectionMode::Single;
            node.rules.clear();
        }
        self.modified = true;
        Ok(())
    }

    /// Appends an empty rule with the lowest priority and returns its position.
    pub fn add_rule(&mut self, id: NodeId) -> SurveyResult<usize> {
        let node = self.node_mut(id)?;
        if !node.is_multiple() {
            return Err(SurveyError::InvalidEdit(format!(
                "'{id}' is not a multiple-choice question"
            )));
        }
        let index = node.rules.len();
        node.rules.push(Rule::new(index as u32));
        self.modified = true;
        Ok(index)
    }

    pub fn delete_rule(&mut self, id: NodeId, rule: usize) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        if rule >= node.rules.len() {
            return Err(SurveyError::RuleOutOfRange {
                node: id,
                index: rule,
            });
        }
        node.rules.remove(rule);
        node.renumber_rules();
        self.modified = true;
        Ok(())
    }

    /// Moves a rule to a new priority position.
    pub fn reorder_rule(&mut self, id: NodeId, from: usize, to: usize) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        let len = node.rules.len();
        for index in [from, to] {
            if index >= len {
                return Err(SurveyError::RuleOutOfRange { node: id, index });
            }
        }
        let moved = node.rules.remove(from);
        node.rules.insert(to, moved);
        node.renumber_rules();
        self.modified = true;
        Ok(())
    }

    /// Raises a rule's priority by one. The first rule stays put.
    pub fn move_rule_up(&mut self, id: NodeId, rule: usize) -> SurveyResult<()> {
        if rule == 0 {
            self.rule_mut(id, rule)?;
            return Ok(());
        }
        self.reorder_rule(id, rule, rule - 1)
    }

    /// Lowers a rule's priority by one. The last rule stays put.
    pub fn move_rule_down(&mut self, id: NodeId, rule: usize) -> SurveyResult<()> {
        let len = self.node(id).ok_or(SurveyError::NodeNotFound(id))?.rules.len();
        if rule + 1 == len {
            return Ok(());
        }
        self.reorder_rule(id, rule, rule + 1)
    }

    /// Appends an unfilled selection slot to a rule.
    pub fn add_rule_slot(&mut self, id: NodeId, rule: usize) -> SurveyResult<usize> {
        let rule_ref = self.rule_mut(id, rule)?;
        rule_ref.slots.push(None);
        let slot = rule_ref.slots.len() - 1;
        self.modified = true;
        Ok(slot)
    }

    pub fn remove_rule_slot(&mut self, id: NodeId, rule: usize, slot: usize) -> SurveyResult<()> {
        let rule_ref = self.rule_mut(id, rule)?;
        if slot >= rule_ref.slots.len() {
            return Err(SurveyError::SlotOutOfRange {
                node: id,
                rule,
                slot,
            });
        }
        rule_ref.slots.remove(slot);
        self.modified = true;
        Ok(())
    }

    /// Fills a rule slot with the answer currently at `answer_index`.
    ///
    /// A rule names each answer at most once; assigning an answer that another
    /// slot of the same rule already holds is rejected.
    pub fn set_rule_answer(
        &mut self,
        id: NodeId,
        rule: usize,
        slot: usize,
        answer_index: usize,
    ) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        let answer = node
            .answers
            .get(answer_index)
            .map(|answer| answer.id)
            .ok_or(SurveyError::AnswerOutOfRange {
                node: id,
                index: answer_index,
            })?;
        let rule_ref = node.rules.get_mut(rule).ok_or(SurveyError::RuleOutOfRange {
            node: id,
            index: rule,
        })?;
        if slot >= rule_ref.slots.len() {
            return Err(SurveyError::SlotOutOfRange {
                node: id,
                rule,
                slot,
            });
        }
        let duplicate = rule_ref
            .slots
            .iter()
            .enumerate()
            .any(|(other, held)| other != slot && *held == Some(answer));
        if duplicate {
            return Err(SurveyError::InvalidEdit(format!(
                "rule {rule} of '{id}' already uses answer {answer_index}"
            )));
        }
        rule_ref.slots[slot] = Some(answer);
        self.modified = true;
        Ok(())
    }

    pub fn set_rule_link(
        &mut self,
        id: NodeId,
        rule: usize,
        target: Option<NodeId>,
    ) -> SurveyResult<()> {
        self.rule_mut(id, rule)?;
        self.check_target(target)?;
        self.rule_mut(id, rule)?.linked_to = target;
        self.modified = true;
        Ok(())
    }

    fn rule_mut(&mut self, id: NodeId, rule: usize) -> SurveyResult<&mut Rule> {
        self.node_mut(id)?
            .rules
            .get_mut(rule)
            .ok_or(SurveyError::RuleOutOfRange {
                node: id,
                index: rule,
            })
    }
}
