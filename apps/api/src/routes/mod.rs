pub mod dashboard;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::applications::handlers as applications;
use crate::automation::handlers as automation;
use crate::candidates::handlers as candidates;
use crate::cover_letters::handlers as cover_letters;
use crate::feedback::handlers as feedback;
use crate::jobs::handlers as jobs;
use crate::matching::handlers as matching;
use crate::outreach::handlers as outreach;
use crate::scraping::handlers as scraping;
use crate::state::AppState;
use crate::tailoring::handlers as tailoring;

pub const MAX_PAGE_SIZE: i64 = 500;
/// Resume uploads are capped at 10 MB; the rest is multipart framing.
const UPLOAD_BODY_LIMIT: usize = 12 * 1024 * 1024;

pub fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        self.skip.max(0)
    }

    pub fn capped_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/", get(health::root_handler))
        .route("/api/health", get(health::health_handler))
        // Dashboard / analytics
        .route("/api/dashboard/stats", get(dashboard::handle_dashboard_stats))
        .route(
            "/api/analytics/mass-scale-dashboard",
            get(dashboard::handle_mass_scale_dashboard),
        )
        .route(
            "/api/analytics/candidate-performance/:id",
            get(dashboard::handle_candidate_performance),
        )
        // Candidates
        .route(
            "/api/candidates",
            get(candidates::handle_list_candidates).post(candidates::handle_create_candidate),
        )
        .route(
            "/api/candidates/:id",
            get(candidates::handle_get_candidate).put(candidates::handle_update_candidate),
        )
        .route(
            "/api/candidates/:id/resume/upload",
            post(candidates::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/candidates/:id/resumes", get(candidates::handle_list_resumes))
        .route(
            "/api/candidates/:id/matches",
            get(matching::handle_list_matches).post(matching::handle_process_matches),
        )
        .route(
            "/api/candidates/:id/resume-versions",
            get(tailoring::handle_list_versions),
        )
        .route(
            "/api/candidates/:id/resume-performance",
            get(tailoring::handle_candidate_resume_performance),
        )
        .route(
            "/api/candidates/:id/cover-letters",
            get(cover_letters::handle_candidate_cover_letters),
        )
        .route(
            "/api/candidates/:id/applications",
            get(applications::handle_candidate_applications),
        )
        // Jobs
        .route("/api/jobs/raw", get(jobs::handle_list_jobs))
        .route("/api/jobs/stats", get(jobs::handle_job_stats))
        .route("/api/jobs/search", get(jobs::handle_search_jobs))
        .route("/api/jobs/cleanup", post(jobs::handle_cleanup_jobs))
        .route("/api/jobs/:id", get(jobs::handle_get_job))
        // Scraping
        .route("/api/scraping/start", post(scraping::handle_start_scrape))
        .route(
            "/api/scraping/scheduler/:action",
            post(scraping::handle_scheduler_action),
        )
        .route("/api/scraping/status", get(scraping::handle_scraping_status))
        .route("/api/scraping/logs", get(scraping::handle_scraping_logs))
        .route("/api/scraping/schedules", post(scraping::handle_create_schedule))
        .route(
            "/api/scraping/schedules/:name",
            put(scraping::handle_update_schedule).delete(scraping::handle_delete_schedule),
        )
        // Matching
        .route("/api/matching/process-all", post(matching::handle_process_all))
        .route("/api/matching/stats", get(matching::handle_matching_stats))
        .route("/api/matching/test", post(matching::handle_test_match))
        // Resume tailoring
        .route("/api/resumes/ats-score", post(tailoring::handle_ats_score))
        .route(
            "/api/resumes/:resume_id/tailor",
            post(tailoring::handle_tailor_resume),
        )
        .route(
            "/api/resumes/:resume_id/generate-variants",
            post(tailoring::handle_generate_variants),
        )
        .route(
            "/api/resume-versions/:id/performance",
            get(tailoring::handle_get_version_performance)
                .post(tailoring::handle_update_version_performance),
        )
        .route(
            "/api/resume-tailoring/stats",
            get(tailoring::handle_tailoring_stats),
        )
        // Cover letters
        .route(
            "/api/cover-letters/generate",
            post(cover_letters::handle_generate_cover_letter),
        )
        .route(
            "/api/cover-letters/generate-multiple",
            post(cover_letters::handle_generate_multiple),
        )
        .route(
            "/api/cover-letters/stats/overview",
            get(cover_letters::handle_cover_letter_stats),
        )
        .route("/api/cover-letters/:id", get(cover_letters::handle_get_cover_letter))
        .route(
            "/api/cover-letters/:id/performance",
            get(cover_letters::handle_cover_letter_performance),
        )
        .route(
            "/api/cover-letters/:id/track-usage",
            post(cover_letters::handle_track_usage),
        )
        // Applications
        .route(
            "/api/applications/submit",
            post(applications::handle_submit_application),
        )
        .route(
            "/api/applications/auto-submit",
            post(applications::handle_auto_submit),
        )
        .route(
            "/api/applications/status",
            get(applications::handle_submission_status),
        )
        .route(
            "/api/applications/analytics",
            get(applications::handle_application_analytics),
        )
        .route(
            "/api/applications/:id/status",
            put(applications::handle_update_application_status),
        )
        .route("/api/track/pixel/:file", get(applications::handle_tracking_pixel))
        // LinkedIn outreach
        .route(
            "/api/linkedin/contacts",
            get(outreach::handle_list_contacts).post(outreach::handle_create_contact),
        )
        .route(
            "/api/linkedin/start-outreach",
            post(outreach::handle_start_outreach),
        )
        .route(
            "/api/linkedin/outreach-status/:candidate_id",
            get(outreach::handle_outreach_status),
        )
        .route("/api/linkedin/messages", get(outreach::handle_list_messages))
        .route(
            "/api/linkedin/messages/:id/status",
            put(outreach::handle_update_message_status),
        )
        .route(
            "/api/linkedin/campaigns",
            get(outreach::handle_list_campaigns).post(outreach::handle_create_campaign),
        )
        .route(
            "/api/linkedin/campaigns/:id/analytics",
            get(outreach::handle_campaign_analytics),
        )
        .route(
            "/api/linkedin/campaigns/:id/:action",
            post(outreach::handle_campaign_action),
        )
        .route(
            "/api/linkedin/follow-ups/process",
            post(outreach::handle_process_follow_ups),
        )
        // Feedback
        .route(
            "/api/feedback/analyze-performance",
            post(feedback::handle_analyze_performance),
        )
        .route(
            "/api/feedback/apply-optimizations",
            post(feedback::handle_apply_optimizations),
        )
        .route(
            "/api/feedback/success-patterns",
            get(feedback::handle_success_patterns),
        )
        .route("/api/feedback/trends", get(feedback::handle_performance_trends))
        .route("/api/feedback/predict", post(feedback::handle_predict_success))
        // Automation
        .route("/api/automation/status", get(automation::handle_automation_status))
        .route("/api/automation/stats", get(automation::handle_automation_stats))
        .route("/api/automation/start", post(automation::handle_start_automation))
        .route("/api/automation/stop", post(automation::handle_stop_automation))
        .route("/api/automation/run-cycle", post(automation::handle_run_cycle))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_caps_limit() {
        let page = Pagination { skip: -5, limit: 10_000 };
        assert_eq!(page.offset(), 0);
        assert_eq!(page.capped_limit(), MAX_PAGE_SIZE);

        let page: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(page.skip, 0);
        assert_eq!(page.limit, 100);
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        let page = Pagination { skip: 20, limit: 0 };
        assert_eq!(page.capped_limit(), 1);
        assert_eq!(page.offset(), 20);
    }
}
