//! Background automation loop: scrape, then match, tailor, write letters, prepare
//! applications and outreach for every automated candidate, then learn and clean up.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::applications::queue::SubmissionQueue;
use crate::applications::service::auto_submit;
use crate::candidates::{fetch_automated_candidates, fetch_primary_resume};
use crate::config::Config;
use crate::cover_letters::generator::generate_cover_letter;
use crate::cover_letters::personalization::Tone;
use crate::errors::AppError;
use crate::feedback::service::analyze_performance;
use crate::jobs::cleanup_old_jobs;
use crate::limits::LimitKind;
use crate::llm_client::LlmClient;
use crate::matching::engine::process_candidate;
use crate::matching::similarity::SemanticScorer;
use crate::models::candidate::CandidateRow;
use crate::outreach::service::{start_outreach, OutreachRequest};
use crate::scraping::scheduler::ScrapingScheduler;
use crate::tailoring::service::{tailor_resume, TailorOptions, TailoringMethod};

pub const BATCH_SIZE: usize = 10;
const MATCH_LIMIT: i64 = 50;
const TAILOR_TOP: usize = 2;
const APPLICATIONS_PER_CYCLE: usize = 2;
const CLEANUP_AFTER_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    UpdatingStats,
    Scraping,
    ProcessingCandidates,
    Feedback,
    Cleanup,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::UpdatingStats => "updating_stats",
            Phase::Scraping => "scraping",
            Phase::ProcessingCandidates => "processing_candidates",
            Phase::Feedback => "feedback",
            Phase::Cleanup => "cleanup",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateOutcome {
    pub candidate_id: Uuid,
    pub matches_found: usize,
    pub resumes_tailored: usize,
    pub cover_letters_generated: usize,
    pub applications_submitted: usize,
    pub outreach_sent: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub jobs_scraped: u64,
    pub candidates: Vec<CandidateOutcome>,
    pub feedback_report_id: Option<Uuid>,
    pub jobs_cleaned: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutomationStats {
    pub candidates_processed: u64,
    pub jobs_scraped: u64,
    pub matches_found: u64,
    pub resumes_tailored: u64,
    pub cover_letters_generated: u64,
    pub applications_submitted: u64,
    pub outreach_sent: u64,
    pub total_runtime_hours: f64,
    pub success_rate: f64,
    pub active_candidates: i64,
    pub errors: u64,
    pub cycles_completed: u64,
    pub last_cycle_time: Option<DateTime<Utc>>,
    pub current_phase: Phase,
}

impl Default for AutomationStats {
    fn default() -> Self {
        Self {
            candidates_processed: 0,
            jobs_scraped: 0,
            matches_found: 0,
            resumes_tailored: 0,
            cover_letters_generated: 0,
            applications_submitted: 0,
            outreach_sent: 0,
            total_runtime_hours: 0.0,
            success_rate: 0.0,
            active_candidates: 0,
            errors: 0,
            cycles_completed: 0,
            last_cycle_time: None,
            current_phase: Phase::Idle,
        }
    }
}

impl AutomationStats {
    pub fn absorb(&mut self, summary: &CycleSummary) {
        self.jobs_scraped += summary.jobs_scraped;
        for outcome in &summary.candidates {
            self.candidates_processed += 1;
            self.matches_found += outcome.matches_found as u64;
            self.resumes_tailored += outcome.resumes_tailored as u64;
            self.cover_letters_generated += outcome.cover_letters_generated as u64;
            self.applications_submitted += outcome.applications_submitted as u64;
            self.outreach_sent += outcome.outreach_sent as u64;
        }
        self.errors += summary.errors;
        self.cycles_completed += 1;
        self.last_cycle_time = Some(summary.finished_at);
    }
}

#[derive(Debug, Serialize)]
pub struct DailyLimits {
    pub applications: i64,
    pub outreach: i64,
    pub connections: i64,
    pub messages: i64,
}

impl Default for DailyLimits {
    fn default() -> Self {
        Self {
            applications: LimitKind::Applications.daily_limit(),
            outreach: LimitKind::Outreach.daily_limit(),
            connections: LimitKind::Connections.daily_limit(),
            messages: LimitKind::Messages.daily_limit(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AutomationStatus {
    pub is_running: bool,
    pub current_phase: Phase,
    pub active_candidates: i64,
    pub last_cycle_time: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub cycle_interval_secs: u64,
    pub daily_limits: DailyLimits,
}

/// Everything a cycle touches. Cloned out of the app state at startup.
#[derive(Clone)]
pub struct CycleContext {
    pub db: PgPool,
    pub redis: redis::Client,
    pub llm: LlmClient,
    pub config: Config,
    pub http: Client,
    pub scorer: Arc<dyn SemanticScorer>,
    pub scheduler: ScrapingScheduler,
    pub queue: SubmissionQueue,
}

/// Stop channel of the live loop. Present exactly while a loop is running; only
/// `begin` and `end` change it, so a loop that is still finishing a cycle after
/// `end` cannot clear the state of a newer one.
#[derive(Default)]
struct Lifecycle {
    stop_tx: StdMutex<Option<watch::Sender<bool>>>,
}

impl Lifecycle {
    fn slot(&self) -> MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.stop_tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_running(&self) -> bool {
        self.slot().is_some()
    }

    /// Receiver for the new loop, or `None` when one is already running.
    fn begin(&self) -> Option<watch::Receiver<bool>> {
        let mut slot = self.slot();
        if slot.is_some() {
            return None;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        *slot = Some(stop_tx);
        Some(stop_rx)
    }

    /// Signals the live loop. `false` when nothing was running.
    fn end(&self) -> bool {
        match self.slot().take() {
            Some(stop_tx) => {
                let _ = stop_tx.send(true);
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle; all clones drive the same loop.
#[derive(Clone)]
pub struct AutomationOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    ctx: CycleContext,
    interval: Duration,
    lifecycle: Lifecycle,
    stats: RwLock<AutomationStats>,
    started_at: RwLock<Option<DateTime<Utc>>>,
    cycle: Mutex<()>,
}

/// Sleeps `interval` unless a stop arrives first. `true` means stop.
pub async fn wait_or_stop(stop_rx: &mut watch::Receiver<bool>, interval: Duration) -> bool {
    if *stop_rx.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(interval) => false,
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
    }
}

async fn log_action(db: &PgPool, action: &str, data: Value) {
    let result = sqlx::query("INSERT INTO automation_logs (id, action, data) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(action)
        .bind(data)
        .execute(db)
        .await;
    if let Err(e) = result {
        warn!("Failed to write automation log '{action}': {e}");
    }
}

impl AutomationOrchestrator {
    pub fn new(ctx: CycleContext) -> Self {
        let interval = Duration::from_secs(ctx.config.automation_cycle_secs.max(1));
        Self {
            inner: Arc::new(OrchestratorInner {
                ctx,
                interval,
                lifecycle: Lifecycle::default(),
                stats: RwLock::new(AutomationStats::default()),
                started_at: RwLock::new(None),
                cycle: Mutex::new(()),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    /// Spawns the loop. Conflict when it is already running.
    pub async fn start(&self) -> Result<(), AppError> {
        let Some(mut stop_rx) = self.inner.lifecycle.begin() else {
            return Err(AppError::Conflict("Automation is already running".to_string()));
        };
        *self.inner.started_at.write().await = Some(Utc::now());

        let this = self.clone();
        tokio::spawn(async move {
            info!(
                "Automation loop started, cycle every {}s",
                this.inner.interval.as_secs()
            );
            loop {
                match this.run_cycle().await {
                    Ok(_) => {}
                    // a stopped loop may still be finishing its cycle
                    Err(AppError::Conflict(msg)) => debug!("Skipping cycle: {msg}"),
                    Err(e) => {
                        error!("Automation cycle failed: {e}");
                        this.inner.stats.write().await.errors += 1;
                    }
                }
                if wait_or_stop(&mut stop_rx, this.inner.interval).await {
                    break;
                }
            }
            info!("Automation loop stopped");
        });

        log_action(&self.inner.ctx.db, "automation_started", json!({})).await;
        Ok(())
    }

    /// Signals the loop to stop after the current cycle. Safe to call when stopped.
    pub async fn stop(&self) -> bool {
        let was_running = self.inner.lifecycle.end();
        if was_running {
            log_action(&self.inner.ctx.db, "automation_stopped", json!({})).await;
        }
        was_running
    }

    pub async fn status(&self) -> AutomationStatus {
        let stats = self.inner.stats.read().await;
        AutomationStatus {
            is_running: self.is_running(),
            current_phase: stats.current_phase,
            active_candidates: stats.active_candidates,
            last_cycle_time: stats.last_cycle_time,
            started_at: *self.inner.started_at.read().await,
            cycle_interval_secs: self.inner.interval.as_secs(),
            daily_limits: DailyLimits::default(),
        }
    }

    pub async fn stats(&self) -> AutomationStats {
        let mut stats = self.inner.stats.read().await.clone();
        if let (true, Some(started)) = (self.is_running(), *self.inner.started_at.read().await) {
            stats.total_runtime_hours = (Utc::now() - started).num_seconds() as f64 / 3600.0;
        }
        stats
    }

    async fn set_phase(&self, phase: Phase) {
        debug!("Automation phase: {}", phase.as_str());
        self.inner.stats.write().await.current_phase = phase;
    }

    /// Runs one full cycle. Conflict when another cycle is in progress.
    pub async fn run_cycle(&self) -> Result<CycleSummary, AppError> {
        let _guard = self
            .inner
            .cycle
            .try_lock()
            .map_err(|_| AppError::Conflict("An automation cycle is already in progress".to_string()))?;

        let ctx = &self.inner.ctx;
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut errors = 0u64;
        info!("Starting automation cycle {cycle_id}");

        self.set_phase(Phase::UpdatingStats).await;
        self.refresh_stats().await?;
        log_action(&ctx.db, "cycle_started", json!({ "cycle_id": cycle_id })).await;

        self.set_phase(Phase::Scraping).await;
        let outcomes = ctx.scheduler.run_due().await;
        let jobs_scraped: u64 = outcomes.iter().map(|o| u64::from(o.jobs_saved)).sum();
        log_action(
            &ctx.db,
            "job_scraping",
            json!({ "cycle_id": cycle_id, "runs": outcomes.len(), "jobs_saved": jobs_scraped }),
        )
        .await;

        self.set_phase(Phase::ProcessingCandidates).await;
        let candidates = fetch_automated_candidates(&ctx.db).await?;
        let mut results = Vec::with_capacity(candidates.len());
        for batch in candidates.chunks(BATCH_SIZE) {
            results.extend(join_all(batch.iter().map(|c| self.process_one(c))).await);
        }
        for outcome in &results {
            let action = if outcome.error.is_some() {
                errors += 1;
                "candidate_error"
            } else {
                "candidate_processed"
            };
            log_action(&ctx.db, action, json!({ "cycle_id": cycle_id, "outcome": outcome })).await;
        }

        self.set_phase(Phase::Feedback).await;
        let feedback_report_id = match analyze_performance(&ctx.db, &ctx.llm).await {
            Ok(report) => Some(report.report_id),
            Err(e) => {
                warn!("Feedback analysis failed in cycle {cycle_id}: {e}");
                errors += 1;
                None
            }
        };
        log_action(
            &ctx.db,
            "feedback_analysis",
            json!({ "cycle_id": cycle_id, "report_id": feedback_report_id }),
        )
        .await;

        self.set_phase(Phase::Cleanup).await;
        let jobs_cleaned = match cleanup_old_jobs(&ctx.db, CLEANUP_AFTER_DAYS).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Job cleanup failed in cycle {cycle_id}: {e}");
                errors += 1;
                0
            }
        };
        log_action(
            &ctx.db,
            "cleanup",
            json!({ "cycle_id": cycle_id, "jobs_deleted": jobs_cleaned }),
        )
        .await;

        let summary = CycleSummary {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            jobs_scraped,
            candidates: results,
            feedback_report_id,
            jobs_cleaned,
            errors,
        };
        {
            let mut stats = self.inner.stats.write().await;
            stats.absorb(&summary);
            stats.current_phase = Phase::Idle;
        }
        log_action(
            &ctx.db,
            "cycle_completed",
            json!({
                "cycle_id": cycle_id,
                "candidates": summary.candidates.len(),
                "errors": errors,
            }),
        )
        .await;
        info!(
            "Completed automation cycle {cycle_id}: {} candidates, {} jobs scraped, {} errors",
            summary.candidates.len(),
            jobs_scraped,
            errors
        );
        Ok(summary)
    }

    async fn refresh_stats(&self) -> Result<(), AppError> {
        let (active, today, successful): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM candidates WHERE is_active AND automation_enabled),
                (SELECT COUNT(*) FROM applications WHERE created_at >= CURRENT_DATE),
                (SELECT COUNT(*) FROM applications
                  WHERE created_at >= CURRENT_DATE AND status IN ('interviewed','offered','accepted'))
            "#,
        )
        .fetch_one(&self.inner.ctx.db)
        .await?;

        let mut stats = self.inner.stats.write().await;
        stats.active_candidates = active;
        stats.success_rate = if today > 0 {
            successful as f64 / today as f64 * 100.0
        } else {
            0.0
        };
        Ok(())
    }

    async fn process_one(&self, candidate: &CandidateRow) -> CandidateOutcome {
        match self.run_candidate(candidate).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Automation failed for candidate {}: {e}", candidate.id);
                CandidateOutcome {
                    candidate_id: candidate.id,
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        }
    }

    /// Matching failures abort the candidate; later steps log and continue.
    async fn run_candidate(&self, candidate: &CandidateRow) -> Result<CandidateOutcome, AppError> {
        let ctx = &self.inner.ctx;
        let mut outcome = CandidateOutcome {
            candidate_id: candidate.id,
            ..Default::default()
        };

        let matches =
            process_candidate(&ctx.db, &ctx.llm, ctx.scorer.as_ref(), candidate.id, MATCH_LIMIT)
                .await?;
        outcome.matches_found = matches.len();

        let top: Vec<Uuid> = matches
            .iter()
            .filter(|m| m.should_apply)
            .take(TAILOR_TOP)
            .map(|m| m.job_id)
            .collect();

        let resume = fetch_primary_resume(&ctx.db, candidate.id).await?;
        for job_id in &top {
            if let Some(resume) = &resume {
                let options = TailorOptions {
                    method: TailoringMethod::Genetic,
                    ..Default::default()
                };
                match tailor_resume(&ctx.db, &ctx.llm, resume.id, *job_id, options).await {
                    Ok(_) => outcome.resumes_tailored += 1,
                    Err(e) => warn!("Tailoring for job {job_id} failed: {e}"),
                }
            }
            match generate_cover_letter(
                &ctx.db,
                &ctx.llm,
                &ctx.http,
                candidate.id,
                *job_id,
                Tone::default(),
                None,
                None,
            )
            .await
            {
                Ok(_) => outcome.cover_letters_generated += 1,
                Err(e) => warn!("Cover letter for job {job_id} failed: {e}"),
            }
        }

        if !top.is_empty() {
            match auto_submit(
                &ctx.db,
                &ctx.redis,
                &ctx.config,
                &ctx.queue,
                candidate.id,
                APPLICATIONS_PER_CYCLE,
                None,
            )
            .await
            {
                Ok(summary) => outcome.applications_submitted = summary.queued,
                Err(AppError::RateLimited(_)) => {}
                Err(e) => warn!("Auto-submit for candidate {} failed: {e}", candidate.id),
            }

            let mut request = OutreachRequest::for_candidate(candidate.id);
            request.quotas = vec![LimitKind::Connections, LimitKind::Outreach];
            match start_outreach(&ctx.db, &ctx.redis, &ctx.llm, request).await {
                Ok(run) => outcome.outreach_sent = run.drafts.len(),
                Err(e) => warn!("Outreach for candidate {} failed: {e}", candidate.id),
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_summary(outcomes: Vec<CandidateOutcome>, errors: u64) -> CycleSummary {
        CycleSummary {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            jobs_scraped: 12,
            candidates: outcomes,
            feedback_report_id: None,
            jobs_cleaned: 0,
            errors,
        }
    }

    #[test]
    fn test_stats_absorb_accumulates() {
        let mut stats = AutomationStats::default();
        let outcome = CandidateOutcome {
            candidate_id: Uuid::new_v4(),
            matches_found: 5,
            resumes_tailored: 2,
            cover_letters_generated: 2,
            applications_submitted: 1,
            outreach_sent: 3,
            error: None,
        };
        stats.absorb(&make_summary(vec![outcome.clone(), outcome], 1));
        stats.absorb(&make_summary(Vec::new(), 0));

        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.candidates_processed, 2);
        assert_eq!(stats.matches_found, 10);
        assert_eq!(stats.outreach_sent, 6);
        assert_eq!(stats.jobs_scraped, 24);
        assert_eq!(stats.errors, 1);
        assert!(stats.last_cycle_time.is_some());
    }

    #[test]
    fn test_daily_limits_follow_quotas() {
        let limits = DailyLimits::default();
        assert_eq!(limits.applications, 50);
        assert_eq!(limits.outreach, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_or_stop_times_out_without_signal() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(!wait_or_stop(&mut rx, Duration::from_secs(300)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_or_stop_wakes_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { wait_or_stop(&mut rx, Duration::from_secs(300)).await });
        tx.send(true).unwrap();
        assert!(waiter.await.unwrap(), "Expected stop signal to end the wait");
    }

    #[tokio::test]
    async fn test_wait_or_stop_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        assert!(wait_or_stop(&mut rx, Duration::from_secs(300)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_survives_old_loop_exit() {
        let lifecycle = Arc::new(Lifecycle::default());
        let mut old_rx = lifecycle.begin().unwrap();
        assert!(lifecycle.begin().is_none(), "Expected a second begin to be refused");

        // the old loop is still mid-cycle when stop and start arrive
        let old_loop = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            wait_or_stop(&mut old_rx, Duration::from_secs(300)).await
        });
        assert!(lifecycle.end());
        let _new_rx = lifecycle.begin().unwrap();

        assert!(old_loop.await.unwrap(), "Expected the old loop to see its stop signal");
        assert!(
            lifecycle.is_running(),
            "Expected the new loop to stay registered after the old one exits"
        );
        assert!(lifecycle.begin().is_none(), "Expected start to conflict while the new loop runs");
    }

    #[test]
    fn test_end_is_idempotent() {
        let lifecycle = Lifecycle::default();
        assert!(!lifecycle.end());
        let rx = lifecycle.begin().unwrap();
        assert!(lifecycle.end());
        assert!(*rx.borrow(), "Expected the stop flag to be sent");
        assert!(!lifecycle.end());
        assert!(!lifecycle.is_running());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::ProcessingCandidates.as_str(), "processing_candidates");
        assert_eq!(
            serde_json::to_value(Phase::Idle).unwrap(),
            serde_json::json!("idle")
        );
    }
}
