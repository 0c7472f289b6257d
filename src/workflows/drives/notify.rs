//! Outbound notification boundary.
//!
//! The drive core commits its state transition first and then hands
//! notifications to a [`NotificationDispatcher`]; dispatch failures are
//! logged by the caller and never roll back or block the primary
//! operation. The production implementation writes to an unbounded tokio
//! channel so the core never awaits delivery.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::domain::{DriveId, StudentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One message destined for one student's inbox/dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub student: StudentId,
    pub message: String,
    pub severity: Severity,
    pub link: String,
    pub related_drive: DriveId,
}

/// Trait describing outbound alert hooks (in-app feed, email adapters).
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notice: Notification) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Dispatcher backed by an unbounded channel; the receiving half is drained
/// by a background task owned by the binary.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: UnboundedSender<Notification>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationDispatcher for ChannelDispatcher {
    fn dispatch(&self, notice: Notification) -> Result<(), DispatchError> {
        self.sender
            .send(notice)
            .map_err(|err| DispatchError::Transport(err.to_string()))
    }
}
