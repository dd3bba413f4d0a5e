//! Layout and state of the hierarchy explorer, free of any UI framework.
//!
//! [`HierarchyController`] owns the levels and cells of one session. It never
//! performs I/O: mutations queue [`Effect`]s which the host executes against a
//! [`DataGateway`] and its timers, then reports back.

pub mod cell;
pub mod color;
pub mod controller;
pub mod effect;
pub mod error;
pub mod gateway;
pub mod indicator;
pub mod level;
pub mod query_plot;
pub mod render;
pub mod session;
pub mod timeline;
pub mod toolbar;

#[cfg(test)]
mod testing;

pub use cell::{Cell, CellGeometry, CellKey, FetchSlot, LoadState, Playback, RequestId};
pub use color::{Legend, MetricRegistry, Rgba};
pub use controller::{HierarchyController, NeighborProbe, Side, SnapshotChoice, Viewport};
pub use effect::{Completion, Effect, FetchKind, FetchOutcome, FetchRequest, Ticket};
pub use error::{GatewayError, HierarchyError, Notification, Severity, ValidationError};
pub use gateway::{ApiRequest, DataGateway, JSONAPI_MIMETYPE, Method};
pub use indicator::{HierarchyIndicator, IndicatorSlot};
pub use level::Level;
pub use query_plot::{PlotRow, QueryPlotController, SearchQuery};
pub use render::{CellRenderer, RenderOptions, Renderer, Scene, Shape, Surface};
pub use session::{SelectedSnapshot, Session, VisitedRecord};
pub use timeline::{HoverMark, Timeline};
pub use toolbar::{ToolbarAction, ToolbarController};
