//! Work the controller asks its host to do.
//!
//! The controller never touches the network or timers. It queues effects,
//! the host runs them and feeds the results back through
//! `HierarchyController::complete` and the `fire_*` methods.

use crate::cell::{CellKey, RequestId};
use crate::error::{GatewayError, Notification};
use crate::gateway::DataGateway;
use shared::{GraphMode, GraphPayload, TimeSeriesPoint, TimeSpan};

/// Generation stamp of a scheduled callback. A callback whose ticket is no
/// longer current does nothing when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(FetchRequest),
    ScheduleCollapse {
        ticket: Ticket,
        delay_ms: u32,
    },
    ScheduleLevelCollapse {
        level: u32,
        ticket: Ticket,
        delay_ms: u32,
    },
    SchedulePlayback {
        cell: CellKey,
        ticket: Ticket,
        delay_ms: u32,
    },
    Notify(Notification),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchKind {
    Graph { mode: GraphMode, cluster: bool },
    Animation,
    TimeSeries(TimeSpan),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub id: RequestId,
    pub cell: CellKey,
    pub kind: FetchKind,
}

impl FetchRequest {
    pub async fn execute<G: DataGateway>(self, gateway: &G) -> Completion {
        let CellKey { level, position } = self.cell;
        let outcome = match self.kind {
            FetchKind::Graph { mode, cluster } => {
                FetchOutcome::Graph(gateway.graph(level, position, mode, cluster).await)
            }
            FetchKind::Animation => {
                FetchOutcome::Animation(gateway.animation_frames(level, position).await)
            }
            FetchKind::TimeSeries(span) => {
                FetchOutcome::TimeSeries(gateway.time_series(span).await)
            }
        };
        Completion {
            id: self.id,
            cell: self.cell,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Graph(Result<Option<GraphPayload>, GatewayError>),
    Animation(Result<Vec<GraphPayload>, GatewayError>),
    TimeSeries(Result<Vec<TimeSeriesPoint>, GatewayError>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub id: RequestId,
    pub cell: CellKey,
    pub outcome: FetchOutcome,
}
