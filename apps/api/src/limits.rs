//! Per-candidate daily quotas backed by Redis counters.
//!
//! Keys look like `{kind}:{candidate_id}:{YYYY-MM-DD}` and expire after 48 hours,
//! so yesterday's counter is still readable for a while after midnight UTC.

use chrono::{NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

const KEY_TTL_SECS: i64 = 48 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Prepared application packages. 50 per day.
    Applications,
    /// Outreach drafts prepared by the orchestrator. 20 per day.
    Outreach,
    /// LinkedIn connection requests. 15 per day.
    Connections,
    /// LinkedIn direct messages and follow-ups. 25 per day.
    Messages,
}

impl LimitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitKind::Applications => "applications",
            LimitKind::Outreach => "outreach",
            LimitKind::Connections => "connections",
            LimitKind::Messages => "messages",
        }
    }

    pub fn daily_limit(self) -> i64 {
        match self {
            LimitKind::Applications => 50,
            LimitKind::Outreach => 20,
            LimitKind::Connections => 15,
            LimitKind::Messages => 25,
        }
    }
}

pub fn daily_key(kind: LimitKind, candidate_id: Uuid, date: NaiveDate) -> String {
    format!("{}:{}:{}", kind.as_str(), candidate_id, date.format("%Y-%m-%d"))
}

/// Takes one unit of today's quota. Returns `false` (and leaves the counter unchanged)
/// when the quota is already spent.
pub async fn try_acquire(
    redis: &redis::Client,
    kind: LimitKind,
    candidate_id: Uuid,
) -> Result<bool, AppError> {
    let key = daily_key(kind, candidate_id, Utc::now().date_naive());
    let mut conn = redis.get_multiplexed_async_connection().await?;

    let count: i64 = redis::cmd("INCR").arg(&key).query_async(&mut conn).await?;
    if count == 1 {
        redis::cmd("EXPIRE")
            .arg(&key)
            .arg(KEY_TTL_SECS)
            .query_async::<_, ()>(&mut conn)
            .await?;
    }

    if count > kind.daily_limit() {
        redis::cmd("DECR")
            .arg(&key)
            .query_async::<_, i64>(&mut conn)
            .await?;
        debug!("{} quota exhausted for candidate {candidate_id}", kind.as_str());
        return Ok(false);
    }

    Ok(true)
}

/// Like `try_acquire`, but maps an exhausted quota to `AppError::RateLimited`.
pub async fn acquire_or_reject(
    redis: &redis::Client,
    kind: LimitKind,
    candidate_id: Uuid,
) -> Result<(), AppError> {
    if try_acquire(redis, kind, candidate_id).await? {
        Ok(())
    } else {
        Err(AppError::RateLimited(format!(
            "Daily {} limit of {} reached for candidate {candidate_id}",
            kind.as_str(),
            kind.daily_limit()
        )))
    }
}

/// Gives back a unit taken by `try_acquire` when the guarded work did not happen.
pub async fn release(
    redis: &redis::Client,
    kind: LimitKind,
    candidate_id: Uuid,
) -> Result<(), AppError> {
    let key = daily_key(kind, candidate_id, Utc::now().date_naive());
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let count: i64 = redis::cmd("DECR").arg(&key).query_async(&mut conn).await?;
    if count < 0 {
        redis::cmd("SET")
            .arg(&key)
            .arg(0)
            .query_async::<_, ()>(&mut conn)
            .await?;
    }
    Ok(())
}

pub async fn used_today(
    redis: &redis::Client,
    kind: LimitKind,
    candidate_id: Uuid,
) -> Result<i64, AppError> {
    let key = daily_key(kind, candidate_id, Utc::now().date_naive());
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let count: Option<i64> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
    Ok(count.unwrap_or(0))
}

pub async fn remaining_today(
    redis: &redis::Client,
    kind: LimitKind,
    candidate_id: Uuid,
) -> Result<i64, AppError> {
    let used = used_today(redis, kind, candidate_id).await?;
    Ok((kind.daily_limit() - used).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_key_format() {
        let id = Uuid::nil();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            daily_key(LimitKind::Applications, id, date),
            "applications:00000000-0000-0000-0000-000000000000:2024-03-09"
        );
    }

    #[test]
    fn test_daily_limits() {
        assert_eq!(LimitKind::Applications.daily_limit(), 50);
        assert_eq!(LimitKind::Outreach.daily_limit(), 20);
        assert_eq!(LimitKind::Connections.daily_limit(), 15);
        assert_eq!(LimitKind::Messages.daily_limit(), 25);
    }
}
