use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{
    IssueCategory, IssueRecord, IssueStatus, PriorityBreakdown, PriorityLevel, PriorityLogEntry,
    TriggerReason,
};
use crate::store::IssueStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn issue_from_row(row: &PgRow) -> IssueRecord {
    let category: String = row.get("category");
    let status: String = row.get("status");
    let level: String = row.get("priority_level");

    IssueRecord {
        id: row.get("id"),
        category: IssueCategory::parse(&category),
        title: row.get("title"),
        description: row.get("description"),
        status: IssueStatus::parse(&status),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        address: row.get("address"),
        created_at: row.get("created_at"),
        priority_score: row.get("priority_score"),
        priority_level: PriorityLevel::parse(&level),
        ai_severity_score: row.get("ai_severity_score"),
        priority_stale: row.get("priority_stale"),
    }
}

/// Postgres-backed issue store under the `issue_priority` schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> PgStore {
        PgStore { pool }
    }
}

#[async_trait]
impl IssueStore for PgStore {
    async fn get_issue(&self, id: Uuid) -> Result<IssueRecord, EngineError> {
        let row = sqlx::query(
            "SELECT id, category, title, description, status, latitude, longitude, address, \
             created_at, priority_score, priority_level, ai_severity_score, priority_stale \
             FROM issue_priority.issues WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| issue_from_row(&row))
            .ok_or(EngineError::NotFound(id))
    }

    async fn list_unresolved_same_category(
        &self,
        category: IssueCategory,
        exclude_id: Uuid,
    ) -> Result<Vec<IssueRecord>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, category, title, description, status, latitude, longitude, address, \
             created_at, priority_score, priority_level, ai_severity_score, priority_stale \
             FROM issue_priority.issues \
             WHERE id != $1 AND category = $2 AND status != 'resolved'",
        )
        .bind(exclude_id)
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(issue_from_row).collect())
    }

    async fn list_unresolved(&self) -> Result<Vec<IssueRecord>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, category, title, description, status, latitude, longitude, address, \
             created_at, priority_score, priority_level, ai_severity_score, priority_stale \
             FROM issue_priority.issues WHERE status != 'resolved' \
             ORDER BY priority_score DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(issue_from_row).collect())
    }

    async fn get_severity_votes(&self, issue_id: Uuid) -> Result<Vec<i32>, EngineError> {
        let rows = sqlx::query(
            "SELECT rating FROM issue_priority.severity_votes WHERE issue_id = $1",
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("rating")).collect())
    }

    async fn upsert_severity_vote(
        &self,
        issue_id: Uuid,
        user_id: Uuid,
        rating: i32,
    ) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO issue_priority.severity_votes (issue_id, user_id, rating, created_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (issue_id, user_id) DO UPDATE
            SET rating = EXCLUDED.rating, created_at = now()
            "#,
        )
        .bind(issue_id)
        .bind(user_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_duplicate_link_if_absent(
        &self,
        issue_id: Uuid,
        duplicate_issue_id: Uuid,
        reported_by: Uuid,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query(
            r#"
            INSERT INTO issue_priority.duplicate_links
            (issue_id, duplicate_issue_id, reported_by, created_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (issue_id, duplicate_issue_id) DO NOTHING
            "#,
        )
        .bind(issue_id)
        .bind(duplicate_issue_id)
        .bind(reported_by)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn persist_priority(
        &self,
        issue_id: Uuid,
        breakdown: &PriorityBreakdown,
    ) -> Result<(), EngineError> {
        let breakdown_json = serde_json::to_string(breakdown)
            .map_err(|err| EngineError::Store(err.into()))?;

        sqlx::query(
            r#"
            UPDATE issue_priority.issues SET
                priority_score = $1,
                priority_level = $2,
                priority_breakdown = $3,
                priority_stale = FALSE,
                last_priority_update = now()
            WHERE id = $4
            "#,
        )
        .bind(breakdown.final_score)
        .bind(breakdown.priority_level.as_str())
        .bind(breakdown_json)
        .bind(issue_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_priority_log(&self, entry: &PriorityLogEntry) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO issue_priority.priority_logs
            (id, issue_id, old_score, new_score, old_level, new_level, trigger_reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.issue_id)
        .bind(entry.old_score)
        .bind(entry.new_score)
        .bind(entry.old_level.as_str())
        .bind(entry.new_level.as_str())
        .bind(entry.trigger_reason.as_str())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_priority_stale(&self, issue_id: Uuid) -> Result<(), EngineError> {
        sqlx::query("UPDATE issue_priority.issues SET priority_stale = TRUE WHERE id = $1")
            .bind(issue_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_ai_severity(&self, issue_id: Uuid, score: f64) -> Result<(), EngineError> {
        sqlx::query("UPDATE issue_priority.issues SET ai_severity_score = $1 WHERE id = $2")
            .bind(score)
            .bind(issue_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_issue(&self, issue: &IssueRecord) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO issue_priority.issues
            (id, category, title, description, status, latitude, longitude, address,
             created_at, priority_score, priority_level, ai_severity_score, priority_stale)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(issue.id)
        .bind(issue.category.as_str())
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.status.as_str())
        .bind(issue.latitude)
        .bind(issue.longitude)
        .bind(&issue.address)
        .bind(issue.created_at)
        .bind(issue.priority_score)
        .bind(issue.priority_level.as_str())
        .bind(issue.ai_severity_score)
        .bind(issue.priority_stale)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_priority_logs(
        &self,
        limit: i64,
    ) -> Result<Vec<PriorityLogEntry>, EngineError> {
        let rows = sqlx::query(
            "SELECT issue_id, old_score, new_score, old_level, new_level, trigger_reason, \
             created_at FROM issue_priority.priority_logs \
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let old_level: String = row.get("old_level");
                let new_level: String = row.get("new_level");
                let trigger: String = row.get("trigger_reason");
                PriorityLogEntry {
                    issue_id: row.get("issue_id"),
                    old_score: row.get("old_score"),
                    new_score: row.get("new_score"),
                    old_level: PriorityLevel::parse(&old_level),
                    new_level: PriorityLevel::parse(&new_level),
                    trigger_reason: parse_trigger(&trigger),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }
}

fn parse_trigger(value: &str) -> TriggerReason {
    match value {
        "severity_vote" => TriggerReason::SeverityVote,
        "duplicate_mark" => TriggerReason::DuplicateMark,
        "batch_recalculation" => TriggerReason::BatchRecalculation,
        _ => TriggerReason::AutomaticRecalculation,
    }
}

pub async fn seed(store: &PgStore) -> anyhow::Result<()> {
    let issues = vec![
        (
            Uuid::parse_str("7b1e4a9c-33c5-4f7e-9a7a-1f2d6c8e0b11")?,
            IssueCategory::Electricity,
            "Sparking transformer on the corner",
            "Transformer box has been sparking since last night, looks dangerous",
            12.9716,
            77.5946,
            "8th Main Avenue, near City Hospital",
            12,
        ),
        (
            Uuid::parse_str("c2f8d0e1-5a64-4f09-bb3a-9e4d71c25a02")?,
            IssueCategory::Road,
            "Deep pothole",
            "Pothole causing traffic congestion during rush hour",
            12.9718,
            77.5948,
            "8th Main Avenue",
            40,
        ),
        (
            Uuid::parse_str("e90a2c4b-8d17-4d63-a5c0-7f3b92e6d403")?,
            IssueCategory::Water,
            "Pipe leak near the school",
            "Water leak flooding the footpath outside the school gate",
            12.9600,
            77.6000,
            "2nd Cross Street, near the public school",
            5,
        ),
        (
            Uuid::parse_str("a4d6f8c0-1b29-4e85-9d47-6c0e83f1b204")?,
            IssueCategory::Sanitation,
            "Overflowing bin",
            "Minor overflow, cosmetic mess on the pavement",
            12.9500,
            77.6100,
            "Rose Garden Lane",
            2,
        ),
    ];

    for (id, category, title, description, latitude, longitude, address, age_days) in issues {
        store
            .insert_issue(&IssueRecord {
                id,
                category,
                title: title.to_string(),
                description: description.to_string(),
                status: IssueStatus::Pending,
                latitude,
                longitude,
                address: address.to_string(),
                created_at: Utc::now() - chrono::Duration::days(age_days),
                priority_score: 5.0,
                priority_level: PriorityLevel::Medium,
                ai_severity_score: None,
                priority_stale: false,
            })
            .await?;
    }

    Ok(())
}

pub async fn import_csv(store: &PgStore, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        category: String,
        title: String,
        description: String,
        latitude: f64,
        longitude: f64,
        address: String,
        created_at: Option<DateTime<Utc>>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        store
            .insert_issue(&IssueRecord {
                id: Uuid::new_v4(),
                category: IssueCategory::parse(&row.category),
                title: row.title,
                description: row.description,
                status: IssueStatus::Pending,
                latitude: row.latitude,
                longitude: row.longitude,
                address: row.address,
                created_at: row.created_at.unwrap_or_else(Utc::now),
                priority_score: 5.0,
                priority_level: PriorityLevel::Medium,
                ai_severity_score: None,
                priority_stale: false,
            })
            .await?;
        inserted += 1;
    }

    Ok(inserted)
}
