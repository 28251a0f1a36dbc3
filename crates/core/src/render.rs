//! Rendering helpers for survey views.

use crate::history::ReviewItem;
use crate::view::SurveyView;

/// Renderer interface used by the session controller.
pub trait RenderBackend {
    fn render(&self, view: &SurveyView) -> RenderOutput;
}

/// Rendered text output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutput {
    pub text: String,
}

/// Plain-text renderer for terminals and logs.
#[derive(Clone, Debug, Default)]
pub struct TextRenderer;

impl TextRenderer {
    /// Formats an answer summary, one numbered block per question.
    pub fn render_review(&self, items: &[ReviewItem]) -> RenderOutput {
        let text = if items.is_empty() {
            "No answers recorded".to_string()
        } else {
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    format!(
                        "{}. [#{}] {}\n   -> {}",
                        idx + 1,
                        item.position,
                        item.question,
                        item.answer
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        RenderOutput { text }
    }
}

impl RenderBackend for TextRenderer {
    fn render(&self, view: &SurveyView) -> RenderOutput {
        let text = match view {
            SurveyView::Idle => "Survey not started".to_string(),
            SurveyView::End { answered } => {
                format!("Survey complete ({answered} answered)")
            }
            SurveyView::Notification {
                content,
                style,
                is_end,
                ..
            } => {
                let action = if *is_end { "[finish]" } else { "[continue]" };
                format!("[{style}] {content}\n{action}")
            }
            SurveyView::Question {
                position,
                content,
                multiple,
                options,
                can_skip,
                is_end,
                path_modified,
                ..
            } => {
                let mut lines = Vec::new();
                if *path_modified {
                    lines.push("(answer changed: a new path starts here)".to_string());
                }
                lines.push(format!("Q{position}. {content}"));
                if *multiple {
                    lines.push("(select one or more)".to_string());
                }
                for option in options {
                    let mut line = format!("{}. {}", option.index + 1, option.text);
                    if option.is_other {
                        line.push_str(" [text]");
                    }
                    if option.has_link {
                        line.push_str(" ->");
                    }
                    lines.push(line);
                }
                if *can_skip {
                    lines.push("s. skip".to_string());
                }
                if *is_end {
                    lines.push("(last question)".to_string());
                }
                lines.join("\n")
            }
        };
        RenderOutput { text }
    }
}
