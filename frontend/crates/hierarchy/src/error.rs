use thiserror::Error;

/// Failures while talking to the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("Request to '{path}' failed: {message}")]
    Transport { path: String, message: String },
    #[error("Server answered '{path}' with status {status}")]
    Status { path: String, status: u16 },
    #[error("Could not decode '{path}' response: {message}")]
    Decode { path: String, message: String },
}

impl GatewayError {
    pub fn path(&self) -> &str {
        match self {
            GatewayError::Transport { path, .. }
            | GatewayError::Status { path, .. }
            | GatewayError::Decode { path, .. } => path,
        }
    }
}

/// Input rejected locally before any request is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Level {0} does not exist in this hierarchy")]
    UnknownLevel(u32),
    #[error("No snapshot at level {level}, position {position}")]
    UnknownCell { level: u32, position: i64 },
    #[error("Hierarchy levels must cover 2..={height}, got {found:?}")]
    NonContiguousLevels { height: u32, found: Vec<u32> },
    #[error("Hierarchy metadata has an unreadable time span")]
    InvalidHierarchySpan,
    #[error("Could not read the date '{0}'")]
    InvalidDate(String),
    #[error("The dates are not in the interval of: {span}")]
    OutsideSpan { span: String },
    #[error("The start date has to be before the end date")]
    StartNotBeforeEnd,
    #[error("You have to select a snapshot view first.")]
    NoSelectedSnapshot,
    #[error("Select at least one level to search")]
    NoSearchLevels,
    #[error("The number of neighbors has to be at least 1")]
    NoNeighborCount,
    #[error("Select at least one neighbor to show")]
    NoMarkersSelected,
    #[error("The snapshot at level {level}, position {position} has no loaded data")]
    SnapshotNotLoaded { level: u32, position: i64 },
    #[error("The snapshot has no animation frames to play")]
    NoAnimationFrames,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HierarchyError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// User-facing message produced by the core; the UI turns it into a toast.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Info,
        }
    }
}

impl From<&GatewayError> for Notification {
    fn from(error: &GatewayError) -> Self {
        Self {
            title: "Backend Error".to_string(),
            message: error.to_string(),
            severity: Severity::Error,
        }
    }
}

impl From<&ValidationError> for Notification {
    fn from(error: &ValidationError) -> Self {
        Self {
            title: "Invalid Input".to_string(),
            message: error.to_string(),
            severity: Severity::Warning,
        }
    }
}

impl From<&HierarchyError> for Notification {
    fn from(error: &HierarchyError) -> Self {
        match error {
            HierarchyError::Gateway(error) => error.into(),
            HierarchyError::Validation(error) => error.into(),
        }
    }
}
