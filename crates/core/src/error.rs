use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::model::NodeId;

pub type SurveyResult<T> = Result<T, SurveyError>;

#[derive(Debug, Error, Diagnostic)]
pub enum SurveyError {
    #[error("node '{0}' not found")]
    #[diagnostic(code("survey.node_not_found"))]
    NodeNotFound(NodeId),
    #[error("answer index {index} out of range for node '{node}'")]
    #[diagnostic(code("survey.answer_out_of_range"))]
    AnswerOutOfRange { node: NodeId, index: usize },
    #[error("rule index {index} out of range for node '{node}'")]
    #[diagnostic(code("survey.rule_out_of_range"))]
    RuleOutOfRange { node: NodeId, index: usize },
    #[error("slot {slot} out of range for rule {rule} of node '{node}'")]
    #[diagnostic(code("survey.slot_out_of_range"))]
    SlotOutOfRange {
        node: NodeId,
        rule: usize,
        slot: usize,
    },
    #[error("position {index} out of range (length {len})")]
    #[diagnostic(code("survey.position_out_of_range"))]
    PositionOutOfRange { index: usize, len: usize },
    #[error("invalid link: {0}")]
    #[diagnostic(code("survey.invalid_link"))]
    InvalidLink(String),
    #[error("step rejected: {0}")]
    #[diagnostic(
        code("survey.invalid_step"),
        help("the session state was left unchanged; prompt the respondent again")
    )]
    InvalidStep(String),
    #[error("edit rejected: {0}")]
    #[diagnostic(
        code("survey.invalid_edit"),
        help("the graph was left unchanged")
    )]
    InvalidEdit(String),
    #[error("no survey session is running")]
    #[diagnostic(code("survey.not_running"))]
    NotRunning,
    #[error("nothing to go back to")]
    #[diagnostic(code("survey.nothing_to_go_back"))]
    NothingToGoBack,
    #[error("survey has no node with content")]
    #[diagnostic(
        code("survey.empty"),
        help("create at least one node with non-empty content before running")
    )]
    EmptySurvey,
    #[error("malformed survey document: {0}")]
    #[diagnostic(code("survey.malformed_document"))]
    MalformedDocument(String),
    #[error("serialization error: {message}")]
    #[diagnostic(code("survey.serialization"))]
    Serialization {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
    #[error("resource limit exceeded: {0}")]
    #[diagnostic(code("survey.resource_limit"))]
    ResourceLimit(String),
    #[error("configuration error: {0}")]
    #[diagnostic(code("survey.config"))]
    Config(String),
    #[error("io error: {0}")]
    #[diagnostic(code("survey.io"))]
    Io(#[from] std::io::Error),
}

/// Lines of context kept on each side of a JSON syntax error.
const CONTEXT_LINES: usize = 2;
/// Most bytes kept on each side of a JSON syntax error.
const CONTEXT_BYTES: usize = 256;

/// Byte offset of the character serde_json reported, clamped to the input.
fn json_error_offset(input: &str, err: &serde_json::Error) -> usize {
    let line_start = match err.line() {
        0 => return 0,
        1 => 0,
        line => input
            .match_indices('\n')
            .nth(line - 2)
            .map_or(input.len(), |(at, _)| at + 1),
    };
    let rest = &input[line_start..];
    let line = rest.split('\n').next().unwrap_or(rest);
    let within = line
        .char_indices()
        .nth(err.column().saturating_sub(1))
        .map_or(line.len(), |(at, _)| at);
    let offset = line_start + within;
    if offset < input.len() {
        offset
    } else {
        input.char_indices().next_back().map_or(0, |(at, _)| at)
    }
}

/// Byte range of the excerpt around `offset`: a few whole lines, capped on
/// each side and aligned to character boundaries.
fn json_error_window(input: &str, offset: usize) -> (usize, usize) {
    let line_floor = input[..offset]
        .rmatch_indices('\n')
        .nth(CONTEXT_LINES)
        .map_or(0, |(at, _)| at + 1);
    let line_ceil = input[offset..]
        .match_indices('\n')
        .nth(CONTEXT_LINES)
        .map_or(input.len(), |(at, _)| offset + at);
    let mut start = line_floor.max(offset.saturating_sub(CONTEXT_BYTES));
    let mut end = line_ceil.min(offset.saturating_add(CONTEXT_BYTES)).min(input.len());
    while !input.is_char_boundary(start) {
        start += 1;
    }
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    (start, end)
}

/// Builds a diagnostic that carries only the excerpt around the error.
pub(crate) fn json_deserialize_error(input: &str, err: &serde_json::Error) -> SurveyError {
    let offset = json_error_offset(input, err);
    let (start, end) = json_error_window(input, offset);
    let width = input[offset..end].chars().next().map_or(0, char::len_utf8);
    SurveyError::Serialization {
        message: err.to_string(),
        src: input[start..end].to_string(),
        span: (offset - start, width).into(),
    }
}
