//! Format versioning constants for survey documents.

/// Version string written into exported documents.
/// Documents without a version, or with a different one, are still accepted.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Label recorded in history when a question is skipped.
pub const SKIPPED_LABEL: &str = "(skipped)";

/// Label recorded in history when a notification is acknowledged.
pub const ACKNOWLEDGED_LABEL: &str = "(acknowledged)";

/// Label recorded when a multi-select question is submitted with nothing checked.
pub const NO_SELECTION_LABEL: &str = "(no selection)";
