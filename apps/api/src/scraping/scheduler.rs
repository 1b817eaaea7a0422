//! In-process scraping scheduler: named schedules, one interval task per enabled schedule.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::scraping::pipeline::{run_scrape, ScrapeOutcome};
use crate::scraping::source::JobSource;
use crate::scraping::ScrapeQuery;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub name: String,
    pub source: String,
    pub query: String,
    pub location: String,
    pub max_pages: u32,
    pub interval_hours: u32,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

impl ScheduleConfig {
    fn new(name: &str, query: &str, interval_hours: u32, max_pages: u32) -> Self {
        Self {
            name: name.to_string(),
            source: "indeed".to_string(),
            query: query.to_string(),
            location: "Remote".to_string(),
            max_pages,
            interval_hours,
            enabled: true,
            last_run: None,
            next_run: None,
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_hours) * 3600)
    }

    /// Never-run schedules are due immediately.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.map_or(true, |next| next <= now)
    }

    pub fn scrape_query(&self) -> ScrapeQuery {
        ScrapeQuery {
            query: self.query.clone(),
            location: self.location.clone(),
        }
    }
}

pub fn default_schedules() -> Vec<ScheduleConfig> {
    vec![
        ScheduleConfig::new("indeed_software", "Software Developer", 6, 3),
        ScheduleConfig::new("indeed_frontend", "Frontend Developer", 8, 2),
        ScheduleConfig::new("indeed_backend", "Backend Developer", 8, 2),
        ScheduleConfig::new("indeed_fullstack", "Full Stack Developer", 6, 3),
    ]
}

/// Fields an operator may change on an existing schedule.
#[derive(Debug, Default, Deserialize)]
pub struct SchedulePatch {
    pub query: Option<String>,
    pub location: Option<String>,
    pub max_pages: Option<u32>,
    pub interval_hours: Option<u32>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct SchedulerStats {
    pub runs: i64,
    pub successful_runs: i64,
    pub failed_runs: i64,
    pub jobs_scraped_24h: i64,
    pub total_jobs: i64,
}

#[derive(Debug, Serialize)]
pub struct SchedulerStatsResponse {
    pub total_scheduled: usize,
    pub is_running: bool,
    #[serde(flatten)]
    pub counts: SchedulerStats,
    pub success_rate: f64,
}

/// Cloneable handle; all clones share the same schedules and tasks.
#[derive(Clone)]
pub struct ScrapingScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    db: PgPool,
    source: Arc<dyn JobSource>,
    delay: Duration,
    schedules: RwLock<BTreeMap<String, ScheduleConfig>>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    running: AtomicBool,
}

pub fn validate_schedule(config: &ScheduleConfig, source_name: &str) -> Result<(), AppError> {
    if config.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if config.query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }
    if config.source != source_name {
        return Err(AppError::Validation(format!(
            "unsupported source '{}', expected '{source_name}'",
            config.source
        )));
    }
    if !(1..=10).contains(&config.max_pages) {
        return Err(AppError::Validation("max_pages must be between 1 and 10".to_string()));
    }
    if !(1..=168).contains(&config.interval_hours) {
        return Err(AppError::Validation(
            "interval_hours must be between 1 and 168".to_string(),
        ));
    }
    Ok(())
}

impl ScrapingScheduler {
    pub fn new(db: PgPool, source: Arc<dyn JobSource>, delay: Duration) -> Self {
        let schedules = default_schedules()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        Self {
            inner: Arc::new(SchedulerInner {
                db,
                source,
                delay,
                schedules: RwLock::new(schedules),
                tasks: Mutex::new(HashMap::new()),
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn source(&self) -> &Arc<dyn JobSource> {
        &self.inner.source
    }

    pub async fn schedules(&self) -> Vec<ScheduleConfig> {
        self.inner.schedules.read().await.values().cloned().collect()
    }

    pub async fn get(&self, name: &str) -> Result<ScheduleConfig, AppError> {
        self.inner
            .schedules
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Schedule '{name}' not found")))
    }

    /// Spawns a task for every enabled schedule. No-op when already running.
    pub async fn start(&self) {
        let schedules = self.schedules().await;
        let mut tasks = self.inner.tasks.lock().await;
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        for schedule in schedules.iter().filter(|s| s.enabled) {
            tasks.insert(schedule.name.clone(), self.spawn_task(schedule));
        }
        info!("Scraping scheduler started with {} active schedules", tasks.len());
    }

    pub async fn stop(&self) {
        let mut tasks = self.inner.tasks.lock().await;
        self.inner.running.store(false, Ordering::SeqCst);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
        info!("Scraping scheduler stopped");
    }

    pub async fn restart(&self) {
        self.stop().await;
        self.start().await;
    }

    pub async fn add(&self, config: ScheduleConfig) -> Result<ScheduleConfig, AppError> {
        validate_schedule(&config, self.inner.source.name())?;
        {
            let mut schedules = self.inner.schedules.write().await;
            if schedules.contains_key(&config.name) {
                return Err(AppError::Conflict(format!(
                    "Schedule '{}' already exists",
                    config.name
                )));
            }
            schedules.insert(config.name.clone(), config.clone());
        }
        self.reschedule(&config.name).await;
        info!("Added scraping schedule '{}'", config.name);
        Ok(config)
    }

    pub async fn update(&self, name: &str, patch: SchedulePatch) -> Result<ScheduleConfig, AppError> {
        let updated = {
            let mut schedules = self.inner.schedules.write().await;
            let current = schedules
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Schedule '{name}' not found")))?;

            let mut next = current;
            if let Some(query) = patch.query {
                next.query = query;
            }
            if let Some(location) = patch.location {
                next.location = location;
            }
            if let Some(max_pages) = patch.max_pages {
                next.max_pages = max_pages;
            }
            if let Some(interval_hours) = patch.interval_hours {
                next.interval_hours = interval_hours;
                next.next_run = next
                    .last_run
                    .map(|last| last + chrono::Duration::hours(i64::from(interval_hours)));
            }
            if let Some(enabled) = patch.enabled {
                next.enabled = enabled;
            }
            validate_schedule(&next, self.inner.source.name())?;
            schedules.insert(name.to_string(), next.clone());
            next
        };
        self.reschedule(name).await;
        Ok(updated)
    }

    pub async fn remove(&self, name: &str) -> Result<(), AppError> {
        let removed = self.inner.schedules.write().await.remove(name);
        if removed.is_none() {
            return Err(AppError::NotFound(format!("Schedule '{name}' not found")));
        }
        if let Some(handle) = self.inner.tasks.lock().await.remove(name) {
            handle.abort();
        }
        info!("Removed scraping schedule '{name}'");
        Ok(())
    }

    /// Runs one schedule now and records the run time.
    pub async fn run_schedule(&self, name: &str) -> Result<ScrapeOutcome, AppError> {
        let schedule = {
            let mut schedules = self.inner.schedules.write().await;
            let schedule = schedules
                .get_mut(name)
                .ok_or_else(|| AppError::NotFound(format!("Schedule '{name}' not found")))?;
            let now = Utc::now();
            schedule.last_run = Some(now);
            schedule.next_run =
                Some(now + chrono::Duration::hours(i64::from(schedule.interval_hours)));
            schedule.clone()
        };

        run_scrape(
            &self.inner.db,
            self.inner.source.as_ref(),
            &schedule.name,
            &schedule.scrape_query(),
            schedule.max_pages,
            self.inner.delay,
        )
        .await
    }

    /// Runs an ad-hoc scrape outside any schedule.
    pub async fn run_manual(
        &self,
        query: &ScrapeQuery,
        max_pages: u32,
    ) -> Result<ScrapeOutcome, AppError> {
        run_scrape(
            &self.inner.db,
            self.inner.source.as_ref(),
            "manual",
            query,
            max_pages,
            self.inner.delay,
        )
        .await
    }

    /// Runs every enabled schedule whose next run has passed. Used by the automation loop.
    pub async fn run_due(&self) -> Vec<ScrapeOutcome> {
        let now = Utc::now();
        let due: Vec<String> = self
            .schedules()
            .await
            .into_iter()
            .filter(|s| s.is_due(now))
            .map(|s| s.name)
            .collect();

        let mut outcomes = Vec::new();
        for name in due {
            match self.run_schedule(&name).await {
                Ok(outcome) => {
                    let blocked = outcome.blocked;
                    outcomes.push(outcome);
                    if blocked {
                        break;
                    }
                }
                Err(e) => warn!("Scheduled scrape '{name}' failed: {e}"),
            }
        }
        outcomes
    }

    pub async fn stats(&self) -> Result<SchedulerStatsResponse, AppError> {
        let counts = sqlx::query_as::<_, SchedulerStats>(
            r#"
            SELECT
                COUNT(*) AS runs,
                COUNT(*) FILTER (WHERE status = 'completed') AS successful_runs,
                COUNT(*) FILTER (WHERE status IN ('error', 'blocked')) AS failed_runs,
                COALESCE(SUM(jobs_saved), 0)::bigint AS jobs_scraped_24h,
                (SELECT COUNT(*) FROM jobs_raw) AS total_jobs
            FROM scraping_logs
            WHERE started_at > NOW() - INTERVAL '24 hours'
            "#,
        )
        .fetch_one(&self.inner.db)
        .await?;

        let success_rate = if counts.runs > 0 {
            counts.successful_runs as f64 / counts.runs as f64 * 100.0
        } else {
            0.0
        };

        Ok(SchedulerStatsResponse {
            total_scheduled: self.inner.schedules.read().await.len(),
            is_running: self.is_running(),
            counts,
            success_rate,
        })
    }

    /// Replaces the task for one schedule after a change. Only acts while running.
    /// The flag only changes under the `tasks` lock, so it is checked again there.
    async fn reschedule(&self, name: &str) {
        if !self.is_running() {
            return;
        }
        let schedule = self.inner.schedules.read().await.get(name).cloned();
        let mut tasks = self.inner.tasks.lock().await;
        if !self.is_running() {
            return;
        }
        if let Some(handle) = tasks.remove(name) {
            handle.abort();
        }
        if let Some(schedule) = schedule.filter(|s| s.enabled) {
            tasks.insert(name.to_string(), self.spawn_task(&schedule));
        }
    }

    fn spawn_task(&self, schedule: &ScheduleConfig) -> JoinHandle<()> {
        let scheduler = self.clone();
        let name = schedule.name.clone();
        let period = schedule.interval();
        let first_delay = schedule
            .next_run
            .and_then(|next| (next - Utc::now()).to_std().ok())
            .unwrap_or_default();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + first_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match scheduler.run_schedule(&name).await {
                    Ok(outcome) if outcome.blocked => {
                        warn!("Schedule '{name}' was blocked; will retry next interval")
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Schedule '{name}' run failed: {e}"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlx::postgres::PgPoolOptions;

    use crate::scraping::{ScrapeError, ScrapedJob};

    struct EmptySource;

    #[async_trait]
    impl JobSource for EmptySource {
        fn name(&self) -> &'static str {
            "indeed"
        }

        async fn search(&self, _: &ScrapeQuery, _: u32) -> Result<Vec<ScrapedJob>, ScrapeError> {
            Ok(Vec::new())
        }

        async fn fetch_details(&self, job: ScrapedJob) -> Result<ScrapedJob, ScrapeError> {
            Ok(job)
        }
    }

    fn make_scheduler() -> ScrapingScheduler {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/jobhunter_test")
            .unwrap();
        ScrapingScheduler::new(db, Arc::new(EmptySource), Duration::ZERO)
    }

    fn make_schedule(name: &str) -> ScheduleConfig {
        ScheduleConfig::new(name, "Rust Engineer", 12, 1)
    }

    #[tokio::test]
    async fn test_seeds_four_default_schedules() {
        let scheduler = make_scheduler();
        let names: Vec<String> = scheduler.schedules().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 4);
        for expected in ["indeed_software", "indeed_frontend", "indeed_backend", "indeed_fullstack"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        let software = scheduler.get("indeed_software").await.unwrap();
        assert_eq!(software.interval_hours, 6);
        assert_eq!(software.max_pages, 3);
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_name() {
        let scheduler = make_scheduler();
        let result = scheduler.add(make_schedule("indeed_software")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        scheduler.add(make_schedule("rust_jobs")).await.unwrap();
        assert_eq!(scheduler.schedules().await.len(), 5);
    }

    #[tokio::test]
    async fn test_add_validates_pages_and_source() {
        let scheduler = make_scheduler();
        let mut bad_pages = make_schedule("too_many_pages");
        bad_pages.max_pages = 50;
        assert!(matches!(
            scheduler.add(bad_pages).await,
            Err(AppError::Validation(_))
        ));

        let mut bad_source = make_schedule("other_board");
        bad_source.source = "monster".to_string();
        assert!(scheduler.add(bad_source).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let scheduler = make_scheduler();
        let updated = scheduler
            .update(
                "indeed_backend",
                SchedulePatch {
                    query: Some("Rust Backend".to_string()),
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.query, "Rust Backend");
        assert!(!updated.enabled);

        scheduler.remove("indeed_backend").await.unwrap();
        assert!(matches!(
            scheduler.remove("indeed_backend").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reschedule_after_concurrent_stop_spawns_nothing() {
        let scheduler = make_scheduler();
        let mut schedule = make_schedule("rust_jobs");
        schedule.next_run = Some(Utc::now() + chrono::Duration::days(1));
        scheduler
            .inner
            .schedules
            .write()
            .await
            .insert(schedule.name.clone(), schedule);
        scheduler.inner.running.store(true, Ordering::SeqCst);

        let tasks = scheduler.inner.tasks.lock().await;
        let pending = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.reschedule("rust_jobs").await })
        };
        // reschedule is now parked on the tasks lock; stop flips the flag under it
        tokio::task::yield_now().await;
        scheduler.inner.running.store(false, Ordering::SeqCst);
        drop(tasks);

        pending.await.unwrap();
        let tasks = scheduler.inner.tasks.lock().await;
        assert!(
            tasks.is_empty(),
            "Expected no task after stop, got {}",
            tasks.len()
        );
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_clears_tasks() {
        let scheduler = make_scheduler();
        for schedule in scheduler.schedules().await {
            scheduler
                .update(
                    &schedule.name,
                    SchedulePatch {
                        enabled: Some(false),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        scheduler.start().await;
        assert!(scheduler.is_running());
        scheduler.start().await;
        assert!(scheduler.is_running());
        assert!(scheduler.inner.tasks.lock().await.is_empty());

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let mut schedule = make_schedule("s");
        assert!(schedule.is_due(now));
        schedule.next_run = Some(now + chrono::Duration::hours(1));
        assert!(!schedule.is_due(now));
        schedule.next_run = Some(now - chrono::Duration::minutes(1));
        assert!(schedule.is_due(now));
        schedule.enabled = false;
        assert!(!schedule.is_due(now));
    }
}
