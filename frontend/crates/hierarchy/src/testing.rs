//! Fixtures shared by the unit tests: a scripted backend and a loop that runs
//! queued fetches until the controller is idle.

use crate::controller::{HierarchyController, Viewport};
use crate::effect::Effect;
use crate::error::GatewayError;
use crate::gateway::{ApiRequest, DataGateway};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use shared::{AppConfig, HierarchyMeta, LevelMeta, format_http_date};
use std::cell::RefCell;
use std::collections::BTreeSet;

pub fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap()
}

pub fn meta(height: u32) -> HierarchyMeta {
    let levels = (2..=height)
        .map(|level| {
            (
                level.to_string(),
                LevelMeta {
                    level,
                    window_size: 2u32.pow(level),
                    overlap: 1,
                },
            )
        })
        .collect();
    HierarchyMeta {
        time_1: format_http_date(origin()),
        time_2: format_http_date(origin() + Duration::days(364)),
        height,
        time_steps: Some(365),
        levels,
    }
}

pub fn controller(height: u32) -> HierarchyController {
    controller_with(height, &AppConfig::default())
}

pub fn controller_with(height: u32, config: &AppConfig) -> HierarchyController {
    HierarchyController::new(meta(height), config, Viewport::default()).unwrap()
}

fn query<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value.as_str())
}

/// Week-long snapshot at `position` weeks after the origin. Negative
/// positions have no data.
pub fn graph_body(level: u32, position: i64) -> String {
    if position < 0 {
        return "{}".to_string();
    }
    let start = origin() + Duration::weeks(position);
    json!({
        "graph": {
            "time": [format_http_date(start), format_http_date(start + Duration::days(6))],
            "metrics": {"density": 0.1 * (position + 1) as f64, "number_of_nodes": level},
            "embeddings": [level as f64, position as f64]
        },
        "nodes": [
            {"id": 1, "name": "alpha", "coord": [0.0, 0.0], "degree": 1.0},
            {"id": 2, "name": ["beta", "gamma"], "coord": [1.0, 1.0], "degree": 2.0}
        ],
        "links": [{"source": 1, "target": 2, "sentiment": -0.5}]
    })
    .to_string()
}

/// Backend double that answers from fixtures and logs every request.
#[derive(Default)]
pub struct MockGateway {
    requests: RefCell<Vec<ApiRequest>>,
    failing: RefCell<BTreeSet<&'static str>>,
}

impl MockGateway {
    pub fn fail(&self, path: &'static str) {
        self.failing.borrow_mut().insert(path);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    pub fn total(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl DataGateway for MockGateway {
    async fn send(&self, request: ApiRequest) -> Result<String, GatewayError> {
        self.requests.borrow_mut().push(request.clone());
        let path = request.path;
        if self.failing.borrow().contains(path) {
            return Err(GatewayError::Status {
                path: path.to_string(),
                status: 500,
            });
        }
        let level = query(&request, "level").and_then(|level| level.parse().ok()).unwrap_or(2);
        let position = query(&request, "num").and_then(|num| num.parse().ok()).unwrap_or(0);
        let body = match path {
            "graph" => graph_body(level, position),
            "check_graph" => (position >= 0).to_string(),
            "animation_data" => format!(
                "[{},{},{}]",
                graph_body(level, position),
                graph_body(level, position + 1),
                graph_body(level, position + 2)
            ),
            "timeseries" => json!([
                {"date": format_http_date(origin()), "density": 0.2, "transitivity": 0.4},
                {"date": format_http_date(origin() + Duration::days(1)), "density": 0.3}
            ])
            .to_string(),
            "hierarchy_meta" => serde_json::to_string(&meta(3)).unwrap_or_default(),
            "search_all_levels" => json!({
                "2": [{"graph_type": "union", "distance": 0.5, "level": 2, "position": 4,
                       "time1": format_http_date(origin()), "time2": format_http_date(origin() + Duration::days(6))}]
            })
            .to_string(),
            "intervall_tree" => json!({"level": 2, "pos": 7}).to_string(),
            _ => "{}".to_string(),
        };
        Ok(body)
    }
}

/// Runs fetches until none are queued and returns every other effect seen.
pub async fn settle(controller: &mut HierarchyController, gateway: &MockGateway) -> Vec<Effect> {
    let mut other = Vec::new();
    loop {
        let effects = controller.take_effects();
        if effects.is_empty() {
            return other;
        }
        for effect in effects {
            match effect {
                Effect::Fetch(request) => {
                    let completion = request.execute(gateway).await;
                    controller.complete(completion);
                }
                effect => other.push(effect),
            }
        }
    }
}
