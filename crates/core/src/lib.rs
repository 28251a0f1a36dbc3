mod config;
mod document;
mod engine;
mod error;
mod graph;
mod history;
mod model;
mod render;
mod resource;
mod response;
mod session;
mod state;
mod version;
mod view;

pub use config::EngineConfig;
pub use document::{DocRef, DocumentAnswer, DocumentNode, DocumentRule, SurveyDocument};
pub use engine::{AutoAdvance, Step, SurveyEngine};
pub use error::{SurveyError, SurveyResult};
pub use graph::{GraphIssue, GraphStats, SurveyGraph};
pub use history::{AnswerSelection, HistoryEntry, NavEntry, ReviewItem};
pub use model::{
    Answer, AnswerId, Node, NodeId, NodeKind, NotificationStyle, Position, Rule, SelectionMode,
    DEFAULT_OTHER_LABEL, DEFAULT_OTHER_MAX_LENGTH, DEFAULT_OTHER_PLACEHOLDER,
};
pub use render::{RenderBackend, RenderOutput, TextRenderer};
pub use resource::ResourceLimiter;
pub use response::{Response, Selection};
pub use session::SurveySession;
pub use state::{SessionState, SessionStatus};
pub use version::{ACKNOWLEDGED_LABEL, DOCUMENT_VERSION, NO_SELECTION_LABEL, SKIPPED_LABEL};
pub use view::{RunTrace, StateDigest, SurveyView, TraceStep, ViewOption};
