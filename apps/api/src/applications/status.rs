use serde::{Deserialize, Serialize};

/// Application lifecycle:
/// `pending → prepared → applied → reviewing → interviewed → offered → accepted`,
/// with `rejected` and `failed` as side exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Prepared,
    Applied,
    Reviewing,
    Interviewed,
    Offered,
    Accepted,
    Rejected,
    Failed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 9] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Prepared,
        ApplicationStatus::Applied,
        ApplicationStatus::Reviewing,
        ApplicationStatus::Interviewed,
        ApplicationStatus::Offered,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Prepared => "prepared",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Interviewed => "interviewed",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Statuses that mean the employer answered. The first one stamps `response_at`.
    pub fn is_response(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Reviewing
                | ApplicationStatus::Interviewed
                | ApplicationStatus::Offered
                | ApplicationStatus::Rejected
        )
    }

    pub fn reached_interview(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Interviewed | ApplicationStatus::Offered | ApplicationStatus::Accepted
        )
    }

    pub fn reached_offer(self) -> bool {
        matches!(self, ApplicationStatus::Offered | ApplicationStatus::Accepted)
    }
}

/// Counter bumps owed when an application moves from `from` to `to`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OutcomeChange {
    pub response: bool,
    pub interview: bool,
    pub offer: bool,
}

impl OutcomeChange {
    pub fn between(from: Option<ApplicationStatus>, to: ApplicationStatus, had_response: bool) -> Self {
        let was = |f: fn(ApplicationStatus) -> bool| from.is_some_and(f);
        Self {
            response: to.is_response() && !had_response,
            interview: to.reached_interview() && !was(ApplicationStatus::reached_interview),
            offer: to.reached_offer() && !was(ApplicationStatus::reached_offer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(ApplicationStatus::parse("Interviewed"), Some(ApplicationStatus::Interviewed));
        assert_eq!(ApplicationStatus::parse("ghosted"), None);
        for status in ApplicationStatus::ALL {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_outcome_change_counts_once() {
        use ApplicationStatus::*;

        let first = OutcomeChange::between(Some(Applied), Interviewed, false);
        assert_eq!(
            first,
            OutcomeChange { response: true, interview: true, offer: false }
        );

        let offer = OutcomeChange::between(Some(Interviewed), Offered, true);
        assert_eq!(
            offer,
            OutcomeChange { response: false, interview: false, offer: true }
        );

        let accepted = OutcomeChange::between(Some(Offered), Accepted, true);
        assert_eq!(accepted, OutcomeChange::default());

        let rejected = OutcomeChange::between(Some(Applied), Rejected, false);
        assert!(rejected.response && !rejected.interview);
    }
}
