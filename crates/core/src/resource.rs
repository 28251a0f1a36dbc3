/// Upper bounds applied when importing a survey document.
#[derive(Clone, Copy, Debug)]
pub struct ResourceLimiter {
    pub max_document_bytes: usize,
    pub max_nodes: usize,
    pub max_answers_per_node: usize,
    pub max_rules_per_node: usize,
    pub max_text_length: usize,
}

impl Default for ResourceLimiter {
    fn default() -> Self {
        Self {
            max_document_bytes: 2 * 1024 * 1024,
            max_nodes: 2_000,
            max_answers_per_node: 128,
            max_rules_per_node: 128,
            max_text_length: 8_192,
        }
    }
}
