//! Request model: what enters the router and what comes back out.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RouterError;
use crate::provider::ChatTurn;

/// Service tier a request can be served at.
///
/// Ordered by cost and capability: `Cleaner < Worker < Thinker`. `Cleaner` is
/// reserved for file-structure normalization, `Worker` handles the bulk of
/// traffic, `Thinker` is the expensive deep-analysis tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Cleaner,
    Worker,
    Thinker,
}

impl Tier {
    /// Tier name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Cleaner => "cleaner",
            Tier::Worker => "worker",
            Tier::Thinker => "thinker",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of output the caller is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Chart,
    Gtd,
    Analysis,
    Upload,
    General,
    Table,
    Forecast,
    Tips,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Chart => "chart",
            RequestKind::Gtd => "gtd",
            RequestKind::Analysis => "analysis",
            RequestKind::Upload => "upload",
            RequestKind::General => "general",
            RequestKind::Table => "table",
            RequestKind::Forecast => "forecast",
            RequestKind::Tips => "tips",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptor of an uploaded file accompanying a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Summary of structured data attached to a request.
///
/// The two variants are mutually exclusive by construction: a request carries
/// either a board-like item collection or a tabular row collection, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "shape")]
pub enum DataSummary {
    Board {
        name: String,
        item_count: usize,
        fields: Vec<String>,
    },
    Table {
        name: String,
        row_count: usize,
        columns: Vec<String>,
    },
}

impl DataSummary {
    /// Number of rows or items in the collection.
    pub fn row_count(&self) -> usize {
        match self {
            DataSummary::Board { item_count, .. } => *item_count,
            DataSummary::Table { row_count, .. } => *row_count,
        }
    }

    /// Number of columns or fields in the collection.
    pub fn column_count(&self) -> usize {
        match self {
            DataSummary::Board { fields, .. } => fields.len(),
            DataSummary::Table { columns, .. } => columns.len(),
        }
    }
}

/// Optional contextual bag attached to a request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Organizational department label, e.g. "sales".
    pub department: Option<String>,
    /// Caller's role, e.g. "account manager".
    pub role: Option<String>,
    /// Free-form project context.
    pub project_notes: Option<String>,
    /// Prior conversation turns.
    pub history: Vec<ChatTurn>,
    /// Structured-data summary, if the request references a data collection.
    pub data: Option<DataSummary>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_project_notes(mut self, notes: impl Into<String>) -> Self {
        self.project_notes = Some(notes.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_data(mut self, data: DataSummary) -> Self {
        self.data = Some(data);
        self
    }
}

/// One inbound request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Request {
    pub prompt: String,
    pub caller_id: Uuid,
    pub kind: RequestKind,
    pub context: Option<RequestContext>,
    pub force_high_tier: bool,
    pub file_upload: Option<FileUpload>,
    pub conversation_id: Option<Uuid>,
    pub include_history: bool,
}

impl Request {
    /// Create a new request with no context, no flags, and no upload.
    pub fn new(caller_id: Uuid, kind: RequestKind, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            caller_id,
            kind,
            context: None,
            force_high_tier: false,
            file_upload: None,
            conversation_id: None,
            include_history: false,
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_force_high_tier(mut self) -> Self {
        self.force_high_tier = true;
        self
    }

    pub fn with_file_upload(mut self, upload: FileUpload) -> Self {
        self.file_upload = Some(upload);
        self
    }

    pub fn with_conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn with_history_included(mut self) -> Self {
        self.include_history = true;
        self
    }

    /// The department label from context, if any.
    pub fn department(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.department.as_deref())
    }
}

/// Terminal outcome of one request. Produced exactly once.
#[derive(Debug)]
pub struct ExecutionResult {
    pub success: bool,
    pub content: Option<String>,
    /// The tier that actually served (or would have served) the request.
    pub tier: Tier,
    /// Credits debited for this request. Zero on any failure path.
    pub credits_charged: i64,
    pub error: Option<RouterError>,
    /// Whether a worker response was transparently re-served at thinker tier.
    pub escalated: bool,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_follows_cost() {
        assert!(Tier::Cleaner < Tier::Worker);
        assert!(Tier::Worker < Tier::Thinker);
    }

    #[test]
    fn tier_display() {
        assert_eq!(Tier::Cleaner.as_str(), "cleaner");
        assert_eq!(Tier::Thinker.to_string(), "thinker");
    }

    #[test]
    fn data_summary_counts() {
        let board = DataSummary::Board {
            name: "Sprint".into(),
            item_count: 42,
            fields: vec!["status".into(), "owner".into()],
        };
        assert_eq!(board.row_count(), 42);
        assert_eq!(board.column_count(), 2);

        let table = DataSummary::Table {
            name: "orders".into(),
            row_count: 1200,
            columns: vec!["id".into(), "total".into(), "region".into()],
        };
        assert_eq!(table.row_count(), 1200);
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn request_builder_defaults() {
        let req = Request::new(Uuid::new_v4(), RequestKind::General, "hello");
        assert!(!req.force_high_tier);
        assert!(req.file_upload.is_none());
        assert!(req.context.is_none());
        assert!(!req.include_history);
        assert!(req.department().is_none());
    }

    #[test]
    fn request_kind_serde_lowercase() {
        let json = serde_json::to_string(&RequestKind::Forecast).unwrap();
        assert_eq!(json, "\"forecast\"");
        let kind: RequestKind = serde_json::from_str("\"gtd\"").unwrap();
        assert_eq!(kind, RequestKind::Gtd);
    }
}
