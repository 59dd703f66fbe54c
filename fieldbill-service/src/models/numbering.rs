//! Sequential document numbering.

/// Document kinds that receive sequential human-readable numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Estimate,
    Invoice,
}

impl DocumentKind {
    /// Counter row key in `document_counters`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Estimate => "estimate",
            DocumentKind::Invoice => "invoice",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Estimate => "EST",
            DocumentKind::Invoice => "INV",
        }
    }

    /// Format a counter value as a document number, e.g. `EST-00042`.
    pub fn format_number(&self, value: i64) -> String {
        format!("{}-{:05}", self.prefix(), value)
    }
}
