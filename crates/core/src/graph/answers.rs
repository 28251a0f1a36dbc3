use super::*;
use crate::model::{Answer, DEFAULT_OTHER_MAX_LENGTH};

impl SurveyGraph {
    /// Appends an empty answer and returns its position.
    pub fn add_answer(&mut self, id: NodeId) -> SurveyResult<usize> {
        self.require_question(id)?;
        let answer_id = self.alloc_answer_id();
        let node = self.node_mut(id)?;
        node.answers.push(Answer::new(answer_id));
        let index = node.answers.len() - 1;
        self.modified = true;
        Ok(index)
    }

    pub fn update_answer_text(
        &mut self,
        id: NodeId,
        index: usize,
        text: impl Into<String>,
    ) -> SurveyResult<()> {
        self.answer_mut(id, index)?.text = text.into();
        self.modified = true;
        Ok(())
    }

    /// Links an answer to a destination node, or clears the link.
    pub fn set_answer_link(
        &mut self,
        id: NodeId,
        index: usize,
        target: Option<NodeId>,
    ) -> SurveyResult<()> {
        self.answer_mut(id, index)?;
        self.check_target(target)?;
        self.answer_mut(id, index)?.linked_to = target;
        self.modified = true;
        Ok(())
    }

    /// Removes an answer. Rule slots that named it become unfilled.
    pub fn delete_answer(&mut self, id: NodeId, index: usize) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        if index >= node.answers.len() {
            return Err(SurveyError::AnswerOutOfRange { node: id, index });
        }
        let removed = node.answers.remove(index);
        for rule in &mut node.rules {
            for slot in &mut rule.slots {
                if *slot == Some(removed.id) {
                    *slot = None;
                }
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Moves an answer. Rules reference answers by id and keep their meaning.
    pub fn reorder_answers(&mut self, id: NodeId, from: usize, to: usize) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        let len = node.answers.len();
        if from >= len {
            return Err(SurveyError::AnswerOutOfRange {
                node: id,
                index: from,
            });
        }
        if to >= len {
            return Err(SurveyError::AnswerOutOfRange { node: id, index: to });
        }
        let answer = node.answers.remove(from);
        node.answers.insert(to, answer);
        self.modified = true;
        Ok(())
    }

    /// Adds or removes the single free-text "Other" answer.
    pub fn toggle_other_answer(&mut self, id: NodeId, enabled: bool) -> SurveyResult<()> {
        self.require_question(id)?;
        let existing = self.node_mut(id)?.other_answer_index();
        match (enabled, existing) {
            (true, None) => {
                let answer_id = self.alloc_answer_id();
                self.node_mut(id)?
                    .answers
                    .push(Answer::other(answer_id, DEFAULT_OTHER_MAX_LENGTH));
                self.modified = true;
                Ok(())
            }
            (false, Some(index)) => self.delete_answer(id, index),
            _ => Ok(()),
        }
    }

    pub fn set_other_answer_options(
        &mut self,
        id: NodeId,
        placeholder: impl Into<String>,
        max_length: usize,
    ) -> SurveyResult<()> {
        let node = self.node_mut(id)?;
        let index = node.other_answer_index().ok_or_else(|| {
            SurveyError::InvalidEdit(format!("'{id}' has no free-text answer"))
        })?;
        let answer = &mut node.answers[index];
        answer.placeholder = placeholder.into();
        answer.max_length = max_length.max(1);
        self.modified = true;
        Ok(())
    }

    fn answer_mut(&mut self, id: NodeId, index: usize) -> SurveyResult<&mut Answer> {
        self.node_mut(id)?
            .answers
            .get_mut(index)
            .ok_or(SurveyError::AnswerOutOfRange { node: id, index })
    }

    pub(super) fn require_question(&self, id: NodeId) -> SurveyResult<()> {
        let node = self.node(id).ok_or(SurveyError::NodeNotFound(id))?;
        if node.is_notification() {
            return Err(SurveyError::InvalidEdit(format!(
                "'{id}' is a notification and carries no answers"
            )));
        }
        Ok(())
    }
}
