//! Contract of the HTTP backend.
//!
//! Requests are plain [`ApiRequest`] values and responses are decoded by pure
//! functions, so a [`DataGateway`] implementation only has to move bytes.

use crate::error::GatewayError;
use serde::de::DeserializeOwned;
use shared::{
    GraphMode, GraphPayload, HierarchyMeta, IntervalHit, NodeEntry, NodeId, SearchResults,
    TimeSeriesPoint, TimeSpan, format_http_date,
};

pub const JSONAPI_MIMETYPE: &str = "application/vnd.api+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl ApiRequest {
    fn get(path: &'static str) -> Self {
        Self {
            method: Method::Get,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn hierarchy_meta() -> Self {
        Self::get("hierarchy_meta")
    }

    pub fn graph(level: u32, position: i64, mode: GraphMode, cluster: bool) -> Self {
        Self::get("graph")
            .param("level", level)
            .param("num", position)
            .param("graph_type", mode)
            .param("k", graph_k(level))
            .param("cluster", cluster)
    }

    pub fn check_graph(level: u32, position: i64) -> Self {
        Self::get("check_graph")
            .param("level", level)
            .param("num", position)
    }

    pub fn animation_data(level: u32, position: i64) -> Self {
        Self::get("animation_data")
            .param("level", level)
            .param("num", position)
    }

    pub fn time_series(span: TimeSpan) -> Self {
        Self::get("timeseries")
            .param("start_dateTime", format_http_date(span.start))
            .param("end_dateTime", format_http_date(span.end))
    }

    pub fn all_nodes() -> Self {
        Self::get("get_all_nodes")
    }

    /// Levels travel as a JSON array of strings, the form the level filter produces.
    pub fn search_all_levels(embedding: &[f64], levels: &[u32], k: u32) -> Self {
        let levels: Vec<String> = levels.iter().map(u32::to_string).collect();
        Self::get("search_all_levels")
            .param("embedding", json_text(&embedding))
            .param("levels", json_text(&levels))
            .param("k", k)
    }

    pub fn filter_nodes(ids: &[NodeId]) -> Self {
        Self {
            method: Method::Post,
            path: "filter_nodes",
            query: Vec::new(),
            body: Some(json_text(&ids)),
        }
    }

    pub fn interval_lookup(span: TimeSpan) -> Self {
        Self::get("intervall_tree")
            .param("start_dateTime", format_http_date(span.start))
            .param("end_dateTime", format_http_date(span.end))
    }
}

fn json_text<T: serde::Serialize + ?Sized>(value: &T) -> String {
    // Serializing slices of numbers and strings cannot fail
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

/// Neighbourhood size sent with graph requests: 2^(level-1).
pub fn graph_k(level: u32) -> u64 {
    1u64 << level.saturating_sub(1).min(63)
}

fn is_empty_object(body: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(body),
        Ok(serde_json::Value::Object(map)) if map.is_empty()
    )
}

pub fn decode_json<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|error| GatewayError::Decode {
        path: path.to_string(),
        message: error.to_string(),
    })
}

/// `{}` means the backend has no snapshot at that position.
pub fn decode_graph(body: &str) -> Result<Option<GraphPayload>, GatewayError> {
    if is_empty_object(body) {
        return Ok(None);
    }
    decode_json("graph", body).map(Some)
}

pub fn decode_animation(body: &str) -> Result<Vec<GraphPayload>, GatewayError> {
    if is_empty_object(body) {
        return Ok(Vec::new());
    }
    decode_json("animation_data", body)
}

/// Backend operations. Implementors provide [`DataGateway::send`]; the typed
/// operations build their request and decode the answer.
#[allow(async_fn_in_trait)]
pub trait DataGateway {
    /// Sends the request with `Accept: application/vnd.api+json` and returns the body.
    async fn send(&self, request: ApiRequest) -> Result<String, GatewayError>;

    async fn hierarchy_meta(&self) -> Result<HierarchyMeta, GatewayError> {
        let request = ApiRequest::hierarchy_meta();
        let path = request.path;
        decode_json(path, &self.send(request).await?)
    }

    async fn graph(
        &self,
        level: u32,
        position: i64,
        mode: GraphMode,
        cluster: bool,
    ) -> Result<Option<GraphPayload>, GatewayError> {
        let body = self
            .send(ApiRequest::graph(level, position, mode, cluster))
            .await?;
        decode_graph(&body)
    }

    async fn check_graph(&self, level: u32, position: i64) -> Result<bool, GatewayError> {
        let request = ApiRequest::check_graph(level, position);
        let path = request.path;
        decode_json(path, &self.send(request).await?)
    }

    async fn animation_frames(
        &self,
        level: u32,
        position: i64,
    ) -> Result<Vec<GraphPayload>, GatewayError> {
        let body = self.send(ApiRequest::animation_data(level, position)).await?;
        decode_animation(&body)
    }

    async fn time_series(&self, span: TimeSpan) -> Result<Vec<TimeSeriesPoint>, GatewayError> {
        let request = ApiRequest::time_series(span);
        let path = request.path;
        decode_json(path, &self.send(request).await?)
    }

    async fn all_nodes(&self) -> Result<Vec<NodeEntry>, GatewayError> {
        let request = ApiRequest::all_nodes();
        let path = request.path;
        decode_json(path, &self.send(request).await?)
    }

    async fn search_all_levels(
        &self,
        embedding: &[f64],
        levels: &[u32],
        k: u32,
    ) -> Result<SearchResults, GatewayError> {
        let request = ApiRequest::search_all_levels(embedding, levels, k);
        let path = request.path;
        decode_json(path, &self.send(request).await?)
    }

    /// The acknowledgement body is ignored.
    async fn filter_nodes(&self, ids: &[NodeId]) -> Result<(), GatewayError> {
        self.send(ApiRequest::filter_nodes(ids)).await.map(|_| ())
    }

    async fn interval_lookup(&self, span: TimeSpan) -> Result<IntervalHit, GatewayError> {
        let request = ApiRequest::interval_lookup(span);
        let path = request.path;
        decode_json(path, &self.send(request).await?)
    }
}
