use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::EngineError;
use crate::estimator::ImageSeverityEstimator;
use crate::keywords::KeywordTaxonomy;
use crate::models::{IssueRecord, PriorityBreakdown, PriorityLogEntry, TriggerReason};
use crate::scoring;
use crate::store::IssueStore;

/// Coordinates vote and duplicate-mark events with priority
/// recomputation. Recomputes are serialized per issue so that a
/// recompute always observes every vote and link committed before it
/// started; without this, two racing read-modify-write cycles could
/// silently discard each other's result.
pub struct PriorityEngine {
    store: Arc<dyn IssueStore>,
    taxonomy: KeywordTaxonomy,
    issue_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl PriorityEngine {
    pub fn new(store: Arc<dyn IssueStore>, taxonomy: KeywordTaxonomy) -> PriorityEngine {
        PriorityEngine {
            store,
            taxonomy,
            issue_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, issue_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .issue_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(issue_id).or_default())
    }

    /// Compute a fresh breakdown for an issue snapshot. Reads votes
    /// and same-category candidates through the store; pure given that
    /// state and `now`.
    pub async fn calculate_priority(
        &self,
        issue: &IssueRecord,
        now: DateTime<Utc>,
    ) -> Result<PriorityBreakdown, EngineError> {
        let votes = self.store.get_severity_votes(issue.id).await?;
        let candidates = self
            .store
            .list_unresolved_same_category(issue.category, issue.id)
            .await?;

        Ok(scoring::calculate_priority(
            issue,
            &votes,
            &candidates,
            &self.taxonomy,
            now,
        ))
    }

    /// Serialized read-modify-write recompute: fetch the issue, score
    /// it, persist the result, append an audit entry. A failed log
    /// append is reported but does not undo the priority write; the
    /// audit log is diagnostic, not authoritative.
    pub async fn recalculate(
        &self,
        issue_id: Uuid,
        trigger: TriggerReason,
    ) -> Result<PriorityBreakdown, EngineError> {
        let lock = self.lock_for(issue_id);
        let _guard = lock.lock().await;

        let issue = self.store.get_issue(issue_id).await?;
        let breakdown = self.calculate_priority(&issue, Utc::now()).await?;

        self.store.persist_priority(issue_id, &breakdown).await?;

        let entry = PriorityLogEntry {
            issue_id,
            old_score: issue.priority_score,
            new_score: breakdown.final_score,
            old_level: issue.priority_level,
            new_level: breakdown.priority_level,
            trigger_reason: trigger,
            created_at: breakdown.calculation_timestamp,
        };
        if let Err(err) = self.store.append_priority_log(&entry).await {
            tracing::warn!(%issue_id, error = %err, "priority log append failed; score stands");
        }

        tracing::debug!(
            %issue_id,
            score = breakdown.final_score,
            level = breakdown.priority_level.as_str(),
            trigger = trigger.as_str(),
            "priority recalculated"
        );

        Ok(breakdown)
    }

    /// Submit a citizen severity vote. The vote is durable once this
    /// returns Ok; the follow-up recompute is best-effort.
    pub async fn submit_severity_vote(
        &self,
        issue_id: Uuid,
        user_id: Uuid,
        rating: i32,
    ) -> Result<(), EngineError> {
        if !(1..=10).contains(&rating) {
            return Err(EngineError::validation(
                "severity rating must be between 1 and 10",
            ));
        }

        self.store
            .upsert_severity_vote(issue_id, user_id, rating)
            .await?;

        self.best_effort_recalculate(issue_id, TriggerReason::SeverityVote)
            .await;
        Ok(())
    }

    /// Record a directed duplicate link and refresh both issues.
    /// Re-marking an existing pair is an idempotent no-op on the link
    /// itself but still refreshes both priorities.
    pub async fn mark_duplicate(
        &self,
        issue_id: Uuid,
        duplicate_issue_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), EngineError> {
        if issue_id == duplicate_issue_id {
            return Err(EngineError::validation(
                "an issue cannot be marked as a duplicate of itself",
            ));
        }

        let inserted = self
            .store
            .insert_duplicate_link_if_absent(issue_id, duplicate_issue_id, user_id)
            .await?;
        if !inserted {
            tracing::debug!(%issue_id, %duplicate_issue_id, "duplicate link already present");
        }

        self.best_effort_recalculate(issue_id, TriggerReason::DuplicateMark)
            .await;
        self.best_effort_recalculate(duplicate_issue_id, TriggerReason::DuplicateMark)
            .await;
        Ok(())
    }

    /// Recompute after a durable vote/link write. Failure never
    /// surfaces to the original caller; the issue is flagged stale so
    /// the condition is visible until the next successful trigger.
    async fn best_effort_recalculate(&self, issue_id: Uuid, trigger: TriggerReason) {
        if let Err(err) = self.recalculate(issue_id, trigger).await {
            tracing::warn!(
                %issue_id,
                trigger = trigger.as_str(),
                error = %err,
                "recompute failed; flagging priority as stale"
            );
            if let Err(err) = self.store.set_priority_stale(issue_id).await {
                tracing::warn!(%issue_id, error = %err, "failed to flag stale priority");
            }
        }
    }

    /// Recompute every unresolved issue with bounded parallelism.
    /// Issues are independent; no ordering is guaranteed. Returns the
    /// number successfully updated.
    pub async fn recalculate_all(self: Arc<Self>, concurrency: usize) -> Result<usize, EngineError> {
        let issues = self.store.list_unresolved().await?;
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let mut handles = Vec::with_capacity(issues.len());
        for issue in issues {
            let engine = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                match engine
                    .recalculate(issue.id, TriggerReason::BatchRecalculation)
                    .await
                {
                    Ok(_) => true,
                    Err(err) => {
                        tracing::warn!(issue_id = %issue.id, error = %err, "batch recompute failed");
                        false
                    }
                }
            }));
        }

        let mut updated = 0usize;
        for handle in handles {
            if handle.await.unwrap_or(false) {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Store an image-derived severity estimate and refresh the
    /// priority. `None` from the estimator means no usable estimate;
    /// nothing is written.
    pub async fn apply_image_severity(
        &self,
        issue_id: Uuid,
        image_ref: &str,
        estimator: &dyn ImageSeverityEstimator,
    ) -> Result<Option<f64>, EngineError> {
        let issue = self.store.get_issue(issue_id).await?;
        let estimate = estimator.estimate(image_ref, issue.category).await?;

        if let Some(score) = estimate {
            self.store.set_ai_severity(issue_id, score).await?;
            self.recalculate(issue_id, TriggerReason::AutomaticRecalculation)
                .await?;
        }

        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueCategory, IssueStatus, PriorityLevel};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct MemState {
        issues: HashMap<Uuid, IssueRecord>,
        votes: HashMap<(Uuid, Uuid), i32>,
        links: HashSet<(Uuid, Uuid)>,
        breakdowns: HashMap<Uuid, PriorityBreakdown>,
        logs: Vec<PriorityLogEntry>,
        stale: HashSet<Uuid>,
    }

    #[derive(Default)]
    struct MemStore {
        state: Mutex<MemState>,
        fail_persist: AtomicBool,
    }

    impl MemStore {
        fn with_issues(issues: Vec<IssueRecord>) -> MemStore {
            let store = MemStore::default();
            {
                let mut state = store.state.lock().unwrap();
                for issue in issues {
                    state.issues.insert(issue.id, issue);
                }
            }
            store
        }

        fn state(&self) -> std::sync::MutexGuard<'_, MemState> {
            self.state.lock().unwrap()
        }
    }

    #[async_trait]
    impl IssueStore for MemStore {
        async fn get_issue(&self, id: Uuid) -> Result<IssueRecord, EngineError> {
            self.state()
                .issues
                .get(&id)
                .cloned()
                .ok_or(EngineError::NotFound(id))
        }

        async fn list_unresolved_same_category(
            &self,
            category: IssueCategory,
            exclude_id: Uuid,
        ) -> Result<Vec<IssueRecord>, EngineError> {
            Ok(self
                .state()
                .issues
                .values()
                .filter(|issue| {
                    issue.id != exclude_id
                        && issue.category == category
                        && issue.status != IssueStatus::Resolved
                })
                .cloned()
                .collect())
        }

        async fn list_unresolved(&self) -> Result<Vec<IssueRecord>, EngineError> {
            Ok(self
                .state()
                .issues
                .values()
                .filter(|issue| issue.status != IssueStatus::Resolved)
                .cloned()
                .collect())
        }

        async fn get_severity_votes(&self, issue_id: Uuid) -> Result<Vec<i32>, EngineError> {
            Ok(self
                .state()
                .votes
                .iter()
                .filter(|((id, _), _)| *id == issue_id)
                .map(|(_, rating)| *rating)
                .collect())
        }

        async fn upsert_severity_vote(
            &self,
            issue_id: Uuid,
            user_id: Uuid,
            rating: i32,
        ) -> Result<(), EngineError> {
            self.state().votes.insert((issue_id, user_id), rating);
            Ok(())
        }

        async fn insert_duplicate_link_if_absent(
            &self,
            issue_id: Uuid,
            duplicate_issue_id: Uuid,
            _reported_by: Uuid,
        ) -> Result<bool, EngineError> {
            Ok(self.state().links.insert((issue_id, duplicate_issue_id)))
        }

        async fn persist_priority(
            &self,
            issue_id: Uuid,
            breakdown: &PriorityBreakdown,
        ) -> Result<(), EngineError> {
            if self.fail_persist.load(Ordering::SeqCst) {
                return Err(EngineError::Store(anyhow::anyhow!("persist unavailable")));
            }
            let mut state = self.state();
            if let Some(issue) = state.issues.get_mut(&issue_id) {
                issue.priority_score = breakdown.final_score;
                issue.priority_level = breakdown.priority_level;
                issue.priority_stale = false;
            }
            state.breakdowns.insert(issue_id, breakdown.clone());
            state.stale.remove(&issue_id);
            Ok(())
        }

        async fn append_priority_log(
            &self,
            entry: &PriorityLogEntry,
        ) -> Result<(), EngineError> {
            self.state().logs.push(entry.clone());
            Ok(())
        }

        async fn set_priority_stale(&self, issue_id: Uuid) -> Result<(), EngineError> {
            let mut state = self.state();
            if let Some(issue) = state.issues.get_mut(&issue_id) {
                issue.priority_stale = true;
            }
            state.stale.insert(issue_id);
            Ok(())
        }

        async fn set_ai_severity(&self, issue_id: Uuid, score: f64) -> Result<(), EngineError> {
            if let Some(issue) = self.state().issues.get_mut(&issue_id) {
                issue.ai_severity_score = Some(score);
            }
            Ok(())
        }

        async fn insert_issue(&self, issue: &IssueRecord) -> Result<(), EngineError> {
            self.state().issues.insert(issue.id, issue.clone());
            Ok(())
        }

        async fn recent_priority_logs(
            &self,
            limit: i64,
        ) -> Result<Vec<PriorityLogEntry>, EngineError> {
            let state = self.state();
            Ok(state.logs.iter().rev().take(limit as usize).cloned().collect())
        }
    }

    fn issue(category: IssueCategory, latitude: f64, longitude: f64) -> IssueRecord {
        IssueRecord {
            id: Uuid::new_v4(),
            category,
            title: "Pothole".to_string(),
            description: "deep crater near the junction".to_string(),
            status: IssueStatus::Pending,
            latitude,
            longitude,
            address: "5th Street".to_string(),
            created_at: Utc::now() - chrono::Duration::days(3),
            priority_score: 5.0,
            priority_level: PriorityLevel::Medium,
            ai_severity_score: None,
            priority_stale: false,
        }
    }

    fn engine_with(store: MemStore) -> (Arc<PriorityEngine>, Arc<MemStore>) {
        let store = Arc::new(store);
        let engine = Arc::new(PriorityEngine::new(
            Arc::clone(&store) as Arc<dyn IssueStore>,
            KeywordTaxonomy::default(),
        ));
        (engine, store)
    }

    #[tokio::test]
    async fn vote_out_of_range_is_rejected_before_any_write() {
        let target = issue(IssueCategory::Road, 12.97, 77.59);
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));

        let err = engine
            .submit_severity_vote(target.id, Uuid::new_v4(), 11)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let state = store.state();
        assert!(state.votes.is_empty());
        assert!(state.logs.is_empty());
    }

    #[tokio::test]
    async fn second_vote_from_same_user_updates_in_place() {
        let target = issue(IssueCategory::Road, 12.97, 77.59);
        let user = Uuid::new_v4();
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));

        engine.submit_severity_vote(target.id, user, 4).await.unwrap();
        engine.submit_severity_vote(target.id, user, 9).await.unwrap();

        let state = store.state();
        assert_eq!(state.votes.len(), 1);
        assert_eq!(state.votes.get(&(target.id, user)), Some(&9));
        // Exactly one recompute (one log entry) per submission.
        assert_eq!(state.logs.len(), 2);
        assert!(state
            .logs
            .iter()
            .all(|entry| entry.trigger_reason == TriggerReason::SeverityVote));
    }

    #[tokio::test]
    async fn vote_recompute_reflects_citizen_ratings() {
        let target = issue(IssueCategory::Road, 12.97, 77.59);
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));

        engine
            .submit_severity_vote(target.id, Uuid::new_v4(), 10)
            .await
            .unwrap();

        let state = store.state();
        let breakdown = state.breakdowns.get(&target.id).unwrap();
        // Road base 7.0 blended with a 10 vote: 7*0.7 + 10*0.3 = 7.9.
        assert_eq!(breakdown.factor_scores.severity, 7.9);
    }

    #[tokio::test]
    async fn self_duplicate_is_rejected_with_no_writes() {
        let target = issue(IssueCategory::Road, 12.97, 77.59);
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));

        let err = engine
            .mark_duplicate(target.id, target.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let state = store.state();
        assert!(state.links.is_empty());
        assert!(state.logs.is_empty());
    }

    #[tokio::test]
    async fn duplicate_mark_links_once_and_recomputes_both() {
        let first = issue(IssueCategory::Road, 12.9700, 77.5900);
        let second = issue(IssueCategory::Road, 12.9701, 77.5901);
        let (engine, store) =
            engine_with(MemStore::with_issues(vec![first.clone(), second.clone()]));

        engine
            .mark_duplicate(first.id, second.id, Uuid::new_v4())
            .await
            .unwrap();
        engine
            .mark_duplicate(first.id, second.id, Uuid::new_v4())
            .await
            .unwrap();

        let state = store.state();
        assert_eq!(state.links.len(), 1);
        assert!(state.links.contains(&(first.id, second.id)));
        // Two issues recomputed per mark call.
        assert_eq!(state.logs.len(), 4);
        assert!(state
            .logs
            .iter()
            .all(|entry| entry.trigger_reason == TriggerReason::DuplicateMark));
    }

    #[tokio::test]
    async fn failed_recompute_after_vote_flags_stale_but_succeeds() {
        let target = issue(IssueCategory::Road, 12.97, 77.59);
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));
        store.fail_persist.store(true, Ordering::SeqCst);

        engine
            .submit_severity_vote(target.id, Uuid::new_v4(), 8)
            .await
            .unwrap();

        let state = store.state();
        assert_eq!(state.votes.len(), 1);
        assert!(state.stale.contains(&target.id));
        assert!(state.issues.get(&target.id).unwrap().priority_stale);
    }

    #[tokio::test]
    async fn successful_recompute_clears_stale_flag() {
        let mut target = issue(IssueCategory::Road, 12.97, 77.59);
        target.priority_stale = true;
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));

        engine
            .recalculate(target.id, TriggerReason::AutomaticRecalculation)
            .await
            .unwrap();

        assert!(!store.state().issues.get(&target.id).unwrap().priority_stale);
    }

    #[tokio::test]
    async fn nearby_duplicates_raise_reports_score() {
        // Four unresolved road issues within 100 m of the target.
        let target = issue(IssueCategory::Road, 12.9700, 77.5900);
        let mut issues = vec![target.clone()];
        for offset in 1..=4 {
            let delta = offset as f64 * 0.0001;
            issues.push(issue(IssueCategory::Road, 12.9700 + delta, 77.5900));
        }
        let (engine, store) = engine_with(MemStore::with_issues(issues));

        engine
            .recalculate(target.id, TriggerReason::AutomaticRecalculation)
            .await
            .unwrap();

        let state = store.state();
        let breakdown = state.breakdowns.get(&target.id).unwrap();
        assert_eq!(breakdown.duplicate_count, 4);
        assert_eq!(breakdown.factor_scores.reports_count, 6.0);
    }

    #[tokio::test]
    async fn recalculate_all_skips_resolved_issues() {
        let mut resolved = issue(IssueCategory::Water, 12.95, 77.61);
        resolved.status = IssueStatus::Resolved;
        let issues = vec![
            issue(IssueCategory::Road, 12.97, 77.59),
            issue(IssueCategory::Electricity, 12.96, 77.60),
            issue(IssueCategory::Sanitation, 12.94, 77.58),
            resolved.clone(),
        ];
        let (engine, store) = engine_with(MemStore::with_issues(issues));

        let updated = engine.recalculate_all(2).await.unwrap();
        assert_eq!(updated, 3);

        let state = store.state();
        assert_eq!(state.logs.len(), 3);
        assert!(state
            .logs
            .iter()
            .all(|entry| entry.trigger_reason == TriggerReason::BatchRecalculation));
        assert!(!state.breakdowns.contains_key(&resolved.id));
    }

    #[tokio::test]
    async fn recompute_of_missing_issue_reports_not_found() {
        let (engine, _store) = engine_with(MemStore::default());
        let err = engine
            .recalculate(Uuid::new_v4(), TriggerReason::AutomaticRecalculation)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn image_severity_is_applied_and_recomputed() {
        let target = issue(IssueCategory::Electricity, 12.97, 77.59);
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));

        let estimate = engine
            .apply_image_severity(
                target.id,
                "uploads/pole.jpg",
                &crate::estimator::CategoryBaselineEstimator,
            )
            .await
            .unwrap();

        assert_eq!(estimate, Some(8.0));
        let state = store.state();
        assert_eq!(
            state.issues.get(&target.id).unwrap().ai_severity_score,
            Some(8.0)
        );
        assert!(state.breakdowns.contains_key(&target.id));
    }

    #[tokio::test]
    async fn concurrent_votes_on_one_issue_serialize_without_loss() {
        let target = issue(IssueCategory::Road, 12.97, 77.59);
        let (engine, store) = engine_with(MemStore::with_issues(vec![target.clone()]));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            let issue_id = target.id;
            handles.push(tokio::spawn(async move {
                engine
                    .submit_severity_vote(issue_id, Uuid::new_v4(), 10)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let state = store.state();
        assert_eq!(state.votes.len(), 8);
        assert_eq!(state.logs.len(), 8);
        // Road base 7.0 blended with unanimous 10s: 7*0.7 + 10*0.3.
        let breakdown = state.breakdowns.get(&target.id).unwrap();
        assert_eq!(breakdown.factor_scores.severity, 7.9);
    }
}
