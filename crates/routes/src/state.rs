// crates/routes/src/state.rs

use std::sync::Arc;

use pipa_core::{HomeApi, RouteResult, RouteType};
use tracing::warn;

pub struct StateRoute {
    home: Arc<dyn HomeApi>,
}

impl StateRoute {
    pub fn new(home: Arc<dyn HomeApi>) -> Self {
        Self { home }
    }

    /// The recognized identifier goes straight through to the state lookup.
    pub async fn handle(&self, entity_id: Option<&str>) -> RouteResult {
        let Some(entity_id) = entity_id else {
            return RouteResult::degraded(
                RouteType::StructuredState,
                "没有识别到有效的设备标识。",
                "missing_entity_id",
            );
        };

        let state = match self.home.entity_state(entity_id).await {
            Ok(state) => state,
            Err(err) => {
                warn!(entity_id, error = %err, "State lookup failed");
                return RouteResult::degraded(
                    RouteType::StructuredState,
                    format!("抱歉，查询{}失败了。", entity_id),
                    "upstream_failed",
                );
            }
        };

        if matches!(state.state.as_str(), "unavailable" | "unknown") {
            return RouteResult::degraded(
                RouteType::StructuredState,
                format!("设备{}当前不可用。", entity_id),
                "entity_unavailable",
            );
        }

        let name = state
            .attribute_str("friendly_name")
            .unwrap_or(entity_id)
            .to_string();
        let unit = state.attribute_str("unit_of_measurement").unwrap_or("");

        RouteResult::speech(
            RouteType::StructuredState,
            format!("{}当前状态：{}{}。", name, state.state, unit),
        )
    }
}
