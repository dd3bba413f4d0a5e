use crate::dataflow::{ActorVec, Relay, relay};
use futures::StreamExt;
use hierarchy::{Notification, Severity};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Toasts kept on screen at once; the oldest is dropped first.
const MAX_TOASTS: usize = 5;

/// Styling of a toast.
#[derive(Debug, Clone, PartialEq, Copy, Default)]
pub enum NotificationVariant {
    /// Red, backend failures
    #[default]
    Error,
    /// Amber, rejected input
    Warning,
    /// Blue, informational messages
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorAlert {
    pub id: String,
    pub title: String,
    pub message: String,
    /// Raw error text for the console
    pub technical_error: String,
    pub auto_dismiss_ms: u64,
    pub variant: NotificationVariant,
}

static TOAST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl ErrorAlert {
    pub fn from_notification(notification: &Notification, auto_dismiss_ms: u64) -> Self {
        let variant = match notification.severity {
            Severity::Error => NotificationVariant::Error,
            Severity::Warning => NotificationVariant::Warning,
            Severity::Info => NotificationVariant::Info,
        };
        Self {
            id: format!("toast_{}", TOAST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)),
            title: notification.title.clone(),
            message: make_error_user_friendly(&notification.message),
            technical_error: notification.message.clone(),
            auto_dismiss_ms,
            variant,
        }
    }

    pub fn new_connection_error(error: String) -> Self {
        Self {
            id: format!("conn_error_{}", js_sys::Date::now() as u64),
            title: "Connection Error".to_string(),
            message: make_error_user_friendly(&error),
            technical_error: format!("Connection error: {error}"),
            auto_dismiss_ms: 0,
            variant: NotificationVariant::Error,
        }
    }
}

/// Rewrites browser and HTTP failures into something a user can act on.
/// Validation messages pass through unchanged.
pub fn make_error_user_friendly(error: &str) -> String {
    let error_lower = error.to_lowercase();
    if error_lower.contains("failed to fetch") || error_lower.contains("networkerror") {
        "Cannot reach the backend. Please check that it is running.".to_string()
    } else if error_lower.contains("status 404") {
        format!("{} (endpoint not found)", error.trim())
    } else if error_lower.contains("status 5") {
        format!("{} (server error)", error.trim())
    } else if error_lower.contains("timeout") {
        "Request timed out. Please try again.".to_string()
    } else {
        error.trim().to_string()
    }
}

/// Toast list driven by Actor+Relay.
#[derive(Clone)]
pub struct ErrorDisplay {
    pub active_toasts: ActorVec<ErrorAlert>,
    pub toast_added_relay: Relay<ErrorAlert>,
    pub toast_dismissed_relay: Relay<String>,
}

impl ErrorDisplay {
    pub fn new() -> Self {
        let (toast_added_relay, toast_added_stream) = relay::<ErrorAlert>();
        let (toast_dismissed_relay, toast_dismissed_stream) = relay::<String>();

        let active_toasts = ActorVec::new(vec![], async move |toasts| {
            let mut toast_added_stream = toast_added_stream.fuse();
            let mut toast_dismissed_stream = toast_dismissed_stream.fuse();
            loop {
                futures::select! {
                    alert = toast_added_stream.next() => {
                        if let Some(alert) = alert {
                            zoon::eprintln!("[ERROR] {}: {}", alert.title, alert.technical_error);
                            // Same title and text replace the visible toast instead of stacking
                            let (title, message) = (alert.title.clone(), alert.message.clone());
                            toasts.upsert(alert, |existing| existing.title == title && existing.message == message);
                            while toasts.len() > MAX_TOASTS {
                                toasts.remove(0);
                            }
                        }
                    }
                    id = toast_dismissed_stream.next() => {
                        if let Some(id) = id {
                            toasts.retain(|alert| alert.id != id);
                        }
                    }
                    complete => break,
                }
            }
        });

        Self {
            active_toasts,
            toast_added_relay,
            toast_dismissed_relay,
        }
    }

    pub fn show(&self, alert: ErrorAlert) {
        self.toast_added_relay.send(alert);
    }

    pub fn dismiss(&self, id: &str) {
        self.toast_dismissed_relay.send(id.to_string());
    }
}
