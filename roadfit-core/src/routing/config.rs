use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SearchBudget;
use crate::model::WeightMode;

/// Options for routing observed area pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub mode: WeightMode,
    /// Representative nodes routed per area pair; the median path is kept
    pub samples_per_area: usize,
    /// Wall-clock budget for a whole batch, unlimited when absent
    pub time_budget_secs: Option<u64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: WeightMode::Time,
            samples_per_area: 3,
            time_budget_secs: None,
        }
    }
}

impl RoutingConfig {
    pub fn budget(&self) -> SearchBudget {
        self.time_budget_secs
            .map_or_else(SearchBudget::unlimited, |secs| {
                SearchBudget::with_timeout(Duration::from_secs(secs))
            })
    }
}
