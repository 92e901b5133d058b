use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

/// One lane in the controller payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneRecord {
    #[serde(rename = "PATH")]
    pub path: String,
    #[serde(rename = "VEHICLE_COUNT")]
    pub vehicle_count: usize,
    #[serde(rename = "INDEX")]
    pub index: usize,
    #[serde(rename = "POSITION")]
    pub position: usize,
}

/// Ranking handed to the controller, busiest lane first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRecord {
    #[serde(rename = "DATA")]
    pub data: Vec<LaneRecord>,
    #[serde(rename = "COUNT")]
    pub count: usize,
}

impl RankingRecord {
    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string(self).map_err(|e| DomainError::OperationFailed(e.to_string()))
    }

    /// Short human-readable form for logs, e.g. `lane_2.jpg=7, lane_1.jpg=2`.
    pub fn summarize(&self) -> String {
        self.data
            .iter()
            .map(|r| format!("{}={}", r.path, r.vehicle_count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
