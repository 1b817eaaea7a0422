use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Stopped,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Stopped => "stopped",
            CampaignStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(CampaignStatus::Draft),
            "active" => Some(CampaignStatus::Active),
            "paused" => Some(CampaignStatus::Paused),
            "stopped" => Some(CampaignStatus::Stopped),
            "completed" => Some(CampaignStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl CampaignAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignAction::Start => "start",
            CampaignAction::Pause => "pause",
            CampaignAction::Resume => "resume",
            CampaignAction::Stop => "stop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "start" => Some(CampaignAction::Start),
            "pause" => Some(CampaignAction::Pause),
            "resume" => Some(CampaignAction::Resume),
            "stop" => Some(CampaignAction::Stop),
            _ => None,
        }
    }

    /// Start and resume prepare a fresh batch of drafts.
    pub fn prepares_drafts(self) -> bool {
        matches!(self, CampaignAction::Start | CampaignAction::Resume)
    }
}

/// The status after `action`, or `None` when the action is not allowed from `from`.
pub fn transition(from: CampaignStatus, action: CampaignAction) -> Option<CampaignStatus> {
    use CampaignAction::*;
    use CampaignStatus::*;

    match (from, action) {
        (Draft, Start) => Some(Active),
        (Active, Pause) => Some(Paused),
        (Paused, Resume) => Some(Active),
        (Draft | Active | Paused, Stop) => Some(Stopped),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use CampaignAction::*;
        use CampaignStatus::*;

        let statuses = [Draft, Active, Paused, Stopped, Completed];
        let actions = [Start, Pause, Resume, Stop];
        let allowed = [
            (Draft, Start, Active),
            (Draft, Stop, Stopped),
            (Active, Pause, Paused),
            (Active, Stop, Stopped),
            (Paused, Resume, Active),
            (Paused, Stop, Stopped),
        ];

        for from in statuses {
            for action in actions {
                let expected = allowed
                    .iter()
                    .find(|(f, a, _)| *f == from && *a == action)
                    .map(|(_, _, to)| *to);
                assert_eq!(
                    transition(from, action),
                    expected,
                    "Expected {expected:?} for {from:?} + {action:?}"
                );
            }
        }
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(CampaignAction::parse("Resume"), Some(CampaignAction::Resume));
        assert_eq!(CampaignAction::parse("restart"), None);
        assert!(CampaignAction::Start.prepares_drafts());
        assert!(!CampaignAction::Pause.prepares_drafts());
    }
}
