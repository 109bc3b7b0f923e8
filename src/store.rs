use async_trait::async_trait;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{IssueCategory, IssueRecord, PriorityBreakdown, PriorityLogEntry};

/// Persistence seam for the scoring engine. The engine never caches
/// issue state across calls; every operation re-reads through this
/// trait so a recompute reflects the latest committed writes.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn get_issue(&self, id: Uuid) -> Result<IssueRecord, EngineError>;

    /// Unresolved issues of the same category, excluding the issue
    /// itself. Not geo-filtered; proximity is applied by the caller.
    async fn list_unresolved_same_category(
        &self,
        category: IssueCategory,
        exclude_id: Uuid,
    ) -> Result<Vec<IssueRecord>, EngineError>;

    async fn list_unresolved(&self) -> Result<Vec<IssueRecord>, EngineError>;

    async fn get_severity_votes(&self, issue_id: Uuid) -> Result<Vec<i32>, EngineError>;

    /// At most one vote per (issue, user); a repeat submission updates
    /// rating and timestamp in place.
    async fn upsert_severity_vote(
        &self,
        issue_id: Uuid,
        user_id: Uuid,
        rating: i32,
    ) -> Result<(), EngineError>;

    /// Inserts the ordered pair if absent. Returns whether a row was
    /// actually inserted (false means the link already existed).
    async fn insert_duplicate_link_if_absent(
        &self,
        issue_id: Uuid,
        duplicate_issue_id: Uuid,
        reported_by: Uuid,
    ) -> Result<bool, EngineError>;

    /// Writes score, level, and the JSON breakdown, and clears the
    /// stale flag.
    async fn persist_priority(
        &self,
        issue_id: Uuid,
        breakdown: &PriorityBreakdown,
    ) -> Result<(), EngineError>;

    async fn append_priority_log(&self, entry: &PriorityLogEntry) -> Result<(), EngineError>;

    /// Marks an issue's priority as stale after a failed best-effort
    /// recompute, so the condition is visible instead of silent.
    async fn set_priority_stale(&self, issue_id: Uuid) -> Result<(), EngineError>;

    async fn set_ai_severity(&self, issue_id: Uuid, score: f64) -> Result<(), EngineError>;

    async fn insert_issue(&self, issue: &IssueRecord) -> Result<(), EngineError>;

    async fn recent_priority_logs(
        &self,
        limit: i64,
    ) -> Result<Vec<PriorityLogEntry>, EngineError>;
}
