use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Road,
    Water,
    Electricity,
    Sanitation,
    Transport,
    Others,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Road => "road",
            IssueCategory::Water => "water",
            IssueCategory::Electricity => "electricity",
            IssueCategory::Sanitation => "sanitation",
            IssueCategory::Transport => "transport",
            IssueCategory::Others => "others",
        }
    }

    /// Unknown category text falls back to `Others`, matching the
    /// scorers' default lookup weight.
    pub fn parse(value: &str) -> IssueCategory {
        match value {
            "road" => IssueCategory::Road,
            "water" => IssueCategory::Water,
            "electricity" => IssueCategory::Electricity,
            "sanitation" => IssueCategory::Sanitation,
            "transport" => IssueCategory::Transport,
            _ => IssueCategory::Others,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> IssueStatus {
        match value {
            "in_progress" => IssueStatus::InProgress,
            "resolved" => IssueStatus::Resolved,
            "rejected" => IssueStatus::Rejected,
            _ => IssueStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::VeryLow => "very_low",
            PriorityLevel::Low => "low",
            PriorityLevel::Medium => "medium",
            PriorityLevel::High => "high",
            PriorityLevel::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> PriorityLevel {
        match value {
            "very_low" => PriorityLevel::VeryLow,
            "low" => PriorityLevel::Low,
            "high" => PriorityLevel::High,
            "critical" => PriorityLevel::Critical,
            _ => PriorityLevel::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    AutomaticRecalculation,
    SeverityVote,
    DuplicateMark,
    BatchRecalculation,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::AutomaticRecalculation => "automatic_recalculation",
            TriggerReason::SeverityVote => "severity_vote",
            TriggerReason::DuplicateMark => "duplicate_mark",
            TriggerReason::BatchRecalculation => "batch_recalculation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub id: Uuid,
    pub category: IssueCategory,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub priority_score: f64,
    pub priority_level: PriorityLevel,
    pub ai_severity_score: Option<f64>,
    pub priority_stale: bool,
}

#[derive(Debug, Clone)]
pub struct SeverityVote {
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DuplicateLink {
    pub issue_id: Uuid,
    pub duplicate_issue_id: Uuid,
    pub reported_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Per-factor scores, each in [1, 10]. Field names are part of the
/// persisted breakdown contract consumed by reporting UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub severity: f64,
    pub location: f64,
    pub reports_count: f64,
    pub age: f64,
    pub safety_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub severity: f64,
    pub location: f64,
    pub reports_count: f64,
    pub age: f64,
    pub safety_impact: f64,
}

/// Auditable snapshot of one priority computation, embedded on the
/// issue row as JSON and summarized into the priority log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub final_score: f64,
    pub priority_level: PriorityLevel,
    pub factor_scores: FactorScores,
    pub weights: FactorWeights,
    pub duplicate_count: usize,
    pub calculation_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PriorityLogEntry {
    pub issue_id: Uuid,
    pub old_score: f64,
    pub new_score: f64,
    pub old_level: PriorityLevel,
    pub new_level: PriorityLevel,
    pub trigger_reason: TriggerReason,
    pub created_at: DateTime<Utc>,
}
