use serde::{Deserialize, Serialize};

/// Realization state of one entity produced from an intent path
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizedEntity {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub entity_type: String,

    /// REALIZED, ERROR, IN_PROGRESS, UNREALIZED, ...
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub intent_paths: Vec<String>,

    #[serde(default)]
    pub alarms: Vec<RealizationAlarm>,
}

/// Alarm raised while realizing an entity
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizationAlarm {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub error_id: String,
}

/// Response of the realized-entities query
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RealizedEntityList {
    #[serde(default)]
    pub results: Vec<RealizedEntity>,
}

/// Collapsed realization state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RealizationState {
    Realized,
    Error,
    Unknown,
}

impl RealizedEntity {
    pub fn realization_state(&self) -> RealizationState {
        match self.state.as_str() {
            "REALIZED" => RealizationState::Realized,
            "ERROR" => RealizationState::Error,
            _ => RealizationState::Unknown,
        }
    }

    /// Alarm messages joined for error reporting
    pub fn alarm_message(&self) -> String {
        self.alarms
            .iter()
            .map(|a| a.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Outcome of polling one intent path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealizationResult {
    pub path: String,
    pub state: RealizationState,
    /// Polls spent before reaching `state`
    pub attempts: u32,
}

/// Collapse a set of entities: any error wins, then any non-realized entity
pub fn aggregate(entities: &[RealizedEntity]) -> RealizationState {
    if entities.is_empty() {
        return RealizationState::Unknown;
    }
    if entities
        .iter()
        .any(|e| e.realization_state() == RealizationState::Error)
    {
        return RealizationState::Error;
    }
    if entities
        .iter()
        .all(|e| e.realization_state() == RealizationState::Realized)
    {
        RealizationState::Realized
    } else {
        RealizationState::Unknown
    }
}
