use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ===== MODE TYPES =====

/// How the raw graphs inside a snapshot window are merged.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphMode {
    #[default]
    Union,
    Intersection,
    Disjoint,
}

impl GraphMode {
    pub const ALL: [GraphMode; 3] = [GraphMode::Union, GraphMode::Intersection, GraphMode::Disjoint];

    pub fn as_str(self) -> &'static str {
        match self {
            GraphMode::Union => "union",
            GraphMode::Intersection => "intersection",
            GraphMode::Disjoint => "disjoint",
        }
    }
}

impl fmt::Display for GraphMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationMode {
    #[default]
    Graph,
    Animation,
    Matrix,
    Timeline,
}

impl VisualizationMode {
    pub const ALL: [VisualizationMode; 4] = [
        VisualizationMode::Graph,
        VisualizationMode::Animation,
        VisualizationMode::Matrix,
        VisualizationMode::Timeline,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VisualizationMode::Graph => "graph",
            VisualizationMode::Animation => "animation",
            VisualizationMode::Matrix => "matrix",
            VisualizationMode::Timeline => "timeline",
        }
    }
}

impl fmt::Display for VisualizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row/column order of the adjacency matrix view.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatrixOrder {
    #[default]
    Name,
    Degree,
    Clustering,
    DegreeCentrality,
    ClusterSize,
}

impl MatrixOrder {
    pub const ALL: [MatrixOrder; 5] = [
        MatrixOrder::Name,
        MatrixOrder::Degree,
        MatrixOrder::Clustering,
        MatrixOrder::DegreeCentrality,
        MatrixOrder::ClusterSize,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MatrixOrder::Name => "Name",
            MatrixOrder::Degree => "Degree",
            MatrixOrder::Clustering => "Clustering",
            MatrixOrder::DegreeCentrality => "Degree centrality",
            MatrixOrder::ClusterSize => "Cluster size",
        }
    }
}

/// Per-node metric that can size the nodes of graph and animation cells.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeMetric {
    Degree,
    Clustering,
    DegreeCentrality,
    ClusterSize,
}

impl NodeMetric {
    pub const ALL: [NodeMetric; 4] = [
        NodeMetric::Degree,
        NodeMetric::Clustering,
        NodeMetric::DegreeCentrality,
        NodeMetric::ClusterSize,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NodeMetric::Degree => "Degree",
            NodeMetric::Clustering => "Clustering",
            NodeMetric::DegreeCentrality => "Degree centrality",
            NodeMetric::ClusterSize => "Cluster size",
        }
    }
}

impl MatrixOrder {
    /// Node metric behind a metric ordering; `None` for name order.
    pub fn metric(self) -> Option<NodeMetric> {
        match self {
            MatrixOrder::Name => None,
            MatrixOrder::Degree => Some(NodeMetric::Degree),
            MatrixOrder::Clustering => Some(NodeMetric::Clustering),
            MatrixOrder::DegreeCentrality => Some(NodeMetric::DegreeCentrality),
            MatrixOrder::ClusterSize => Some(NodeMetric::ClusterSize),
        }
    }
}

/// Vertical order of the levels in the similarity plot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelOrdering {
    #[default]
    Level,
    Visited,
    Visualized,
    Similarity,
}

impl LevelOrdering {
    pub const ALL: [LevelOrdering; 4] = [
        LevelOrdering::Level,
        LevelOrdering::Visited,
        LevelOrdering::Visualized,
        LevelOrdering::Similarity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LevelOrdering::Level => "Level",
            LevelOrdering::Visited => "Visited",
            LevelOrdering::Visualized => "Visualized",
            LevelOrdering::Similarity => "Similarity",
        }
    }
}

// ===== TIME =====

/// Date format used by the backend for every timestamp on the wire.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn parse_http_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|date| date.with_timezone(&Utc))
        })
}

pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn from_wire(start: &str, end: &str) -> Option<Self> {
        Some(Self::new(parse_http_date(start)?, parse_http_date(end)?))
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time <= self.end
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Fractional position of `time` inside the span, 0.0 at start and 1.0 at end.
    pub fn fraction_of(&self, time: DateTime<Utc>) -> f64 {
        let total = self.duration_seconds();
        if total <= 0.0 {
            return 0.0;
        }
        (time - self.start).num_milliseconds() as f64 / 1000.0 / total
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%x %I%p"),
            self.end.format("%x %I%p")
        )
    }
}

// ===== HIERARCHY METADATA =====

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LevelMeta {
    pub level: u32,
    pub window_size: u32,
    pub overlap: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HierarchyMeta {
    pub time_1: String,
    pub time_2: String,
    pub height: u32,
    #[serde(default)]
    pub time_steps: Option<u64>,
    pub levels: BTreeMap<String, LevelMeta>,
}

impl HierarchyMeta {
    pub fn span(&self) -> Option<TimeSpan> {
        TimeSpan::from_wire(&self.time_1, &self.time_2)
    }
}

// ===== GRAPH PAYLOADS =====

/// Node identifier; the backend sends either numbers or strings.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => NodeId(text),
            RawId::Int(value) => NodeId(value.to_string()),
            RawId::Float(value) => NodeId(value.to_string()),
        })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clustered nodes carry the list of member names instead of a single name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum NodeName {
    Single(String),
    Many(Vec<String>),
}

impl Default for NodeName {
    fn default() -> Self {
        NodeName::Single(String::new())
    }
}

impl NodeName {
    /// Label shown in the views; clusters show their first two members.
    pub fn display(&self) -> String {
        match self {
            NodeName::Single(name) => name.clone(),
            NodeName::Many(names) => names.iter().take(2).cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    #[serde(default)]
    pub name: NodeName,
    #[serde(default)]
    pub coord: Option<[f64; 2]>,
    #[serde(default)]
    pub is_cluster: bool,
    #[serde(default)]
    pub degree: Option<f64>,
    #[serde(default)]
    pub clustering: Option<f64>,
    #[serde(default)]
    pub degree_centrality: Option<f64>,
    #[serde(default)]
    pub cluster_size: Option<f64>,
}

impl GraphNode {
    pub fn metric(&self, metric: NodeMetric) -> Option<f64> {
        match metric {
            NodeMetric::Degree => self.degree,
            NodeMetric::Clustering => self.clustering,
            NodeMetric::DegreeCentrality => self.degree_centrality,
            NodeMetric::ClusterSize => self.cluster_size,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphLink {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub sentiment: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GraphInfo {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub embeddings: Vec<f64>,
}

/// One snapshot graph in node-link form. An empty JSON object decodes to the default.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GraphPayload {
    #[serde(default)]
    pub graph: Option<GraphInfo>,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default, alias = "edges")]
    pub links: Vec<GraphLink>,
}

impl GraphPayload {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn time_span(&self) -> Option<TimeSpan> {
        let time = &self.graph.as_ref()?.time;
        match time.as_slice() {
            [start, end, ..] => TimeSpan::from_wire(start, end),
            _ => None,
        }
    }

    /// Numeric graph metrics; non-numeric entries are skipped.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        self.graph
            .as_ref()
            .map(|graph| {
                graph
                    .metrics
                    .iter()
                    .filter_map(|(name, value)| value.as_f64().map(|number| (name.clone(), number)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn embeddings(&self) -> &[f64] {
        self.graph
            .as_ref()
            .map(|graph| graph.embeddings.as_slice())
            .unwrap_or(&[])
    }
}

// ===== SERIES, NODES, SEARCH =====

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl TimeSeriesPoint {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        parse_http_date(&self.date)
    }

    pub fn numeric_values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values
            .iter()
            .filter_map(|(key, value)| value.as_f64().map(|number| (key.as_str(), number)))
    }
}

/// `[id, name]` pair from `get_all_nodes`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeEntry(pub NodeId, pub NodeName);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NeighborHit {
    #[serde(default)]
    pub level: u32,
    pub position: i64,
    pub graph_type: GraphMode,
    pub distance: f64,
    pub time1: String,
    pub time2: String,
}

impl NeighborHit {
    pub fn time_span(&self) -> Option<TimeSpan> {
        TimeSpan::from_wire(&self.time1, &self.time2)
    }
}

/// Nearest neighbours keyed by level number.
pub type SearchResults = BTreeMap<String, Vec<NeighborHit>>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IntervalHit {
    pub level: u32,
    pub pos: i64,
}

// ===== CONFIG TYPES =====

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub backend: BackendSection,
    pub layout: LayoutSection,
    pub auto_collapse: AutoCollapseSection,
    pub playback: PlaybackSection,
    pub view: ViewSection,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

// AppSection carries the config format version so older files can be migrated
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSection {
    pub version: String,
}

impl AppSection {
    pub const CURRENT_VERSION: &'static str = "1.0.0";

    pub fn is_supported_version(&self) -> bool {
        matches!(self.version.as_str(), "1.0.0")
    }

    pub fn get_migration_strategy(&self) -> MigrationStrategy {
        match self.version.as_str() {
            "1.0.0" => MigrationStrategy::None,
            _ => MigrationStrategy::Recreate,
        }
    }
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MigrationStrategy {
    None,
    Recreate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendSection {
    pub base_url: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
        }
    }
}

/// Pixel constants of the hierarchy layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LayoutSection {
    pub abstract_height: f64,
    pub abstract_width: f64,
    pub level_gap: f64,
    pub timeline_height: f64,
    pub indicator_width: f64,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            abstract_height: 32.0,
            abstract_width: 32.0,
            level_gap: 4.0,
            timeline_height: 25.0,
            indicator_width: 15.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AutoCollapseSection {
    pub enabled: bool,
    pub max_levels: usize,
    pub max_cells: usize,
    pub delay_ms: u32,
}

impl Default for AutoCollapseSection {
    fn default() -> Self {
        Self {
            enabled: false,
            max_levels: 6,
            max_cells: 6,
            delay_ms: 3000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PlaybackSection {
    pub frame_interval_ms: u32,
}

impl Default for PlaybackSection {
    fn default() -> Self {
        Self {
            frame_interval_ms: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ViewSection {
    pub visualization: VisualizationMode,
    pub color_metric: Option<String>,
    pub matrix_order: MatrixOrder,
    /// Node radius follows this metric; uniform when unset.
    pub node_size: Option<NodeMetric>,
    pub cluster: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hierarchy_meta_with_string_level_keys() {
        let json = r#"{
            "height": 3,
            "time_steps": 120,
            "time_1": "Mon, 01 Jan 2018 00:00:00 GMT",
            "time_2": "Tue, 01 Jan 2019 00:00:00 GMT",
            "levels": {
                "2": {"level": 2, "window_size": 2, "overlap": 1},
                "3": {"level": 3, "window_size": 4, "overlap": 2}
            }
        }"#;
        let meta: HierarchyMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.height, 3);
        assert_eq!(meta.levels["3"].window_size, 4);
        let span = meta.span().unwrap();
        assert!(span.start < span.end);
    }

    #[test]
    fn empty_object_decodes_to_empty_graph() {
        let payload: GraphPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.is_empty());
        assert!(payload.time_span().is_none());
        assert!(payload.metrics().is_empty());
    }

    #[test]
    fn node_ids_accept_numbers_and_strings() {
        let json = r#"{
            "graph": {"time": ["Mon, 01 Jan 2018 00:00:00 GMT", "Mon, 08 Jan 2018 00:00:00 GMT"],
                      "metrics": {"density": 0.25, "label": "x"}, "embeddings": [0.5, 1.5]},
            "nodes": [{"id": 7, "name": ["alice", "bob", "carol"], "is_cluster": true},
                      {"id": "n2", "name": "dave", "coord": [1.0, 2.0]}],
            "links": [{"source": 7, "target": "n2", "sentiment": -0.5}]
        }"#;
        let payload: GraphPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.nodes[0].id, NodeId("7".to_string()));
        assert_eq!(payload.nodes[0].name.display(), "alice, bob");
        assert_eq!(payload.links[0].target, NodeId("n2".to_string()));
        assert_eq!(payload.metrics().get("density"), Some(&0.25));
        assert!(!payload.metrics().contains_key("label"));
        assert_eq!(payload.embeddings(), &[0.5, 1.5]);
    }

    #[test]
    fn http_dates_round_trip() {
        let date = parse_http_date("Fri, 05 Jan 2018 13:45:00 GMT").unwrap();
        assert_eq!(format_http_date(date), "Fri, 05 Jan 2018 13:45:00 GMT");
        assert!(parse_http_date("not a date").is_none());
    }

    #[test]
    fn neighbor_hits_decode_graph_type() {
        let json = r#"{"3": [{"level": 3, "position": 5, "graph_type": "intersection",
                       "distance": 0.4, "time1": "Mon, 01 Jan 2018 00:00:00 GMT",
                       "time2": "Mon, 08 Jan 2018 00:00:00 GMT"}]}"#;
        let results: SearchResults = serde_json::from_str(json).unwrap();
        assert_eq!(results["3"][0].graph_type, GraphMode::Intersection);
        assert_eq!(results["3"][0].position, 5);
    }

    #[test]
    fn neighbor_hit_without_position_is_rejected() {
        let json = r#"{"3": [{"level": 3, "graph_type": "union", "distance": 0.4,
                       "time1": "Mon, 01 Jan 2018 00:00:00 GMT",
                       "time2": "Mon, 08 Jan 2018 00:00:00 GMT"}]}"#;
        let error = serde_json::from_str::<SearchResults>(json).unwrap_err();
        assert!(error.to_string().contains("position"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            "[auto_collapse]\nenabled = true\nmax_cells = 3\n\n[view]\nvisualization = \"matrix\"\n",
        )
        .unwrap();
        assert!(config.auto_collapse.enabled);
        assert_eq!(config.auto_collapse.max_cells, 3);
        assert_eq!(config.auto_collapse.max_levels, 6);
        assert_eq!(config.view.visualization, VisualizationMode::Matrix);
        assert_eq!(config.view.node_size, None);
        assert_eq!(config.layout.abstract_width, 32.0);
        assert_eq!(config.app.get_migration_strategy(), MigrationStrategy::None);
    }
}
