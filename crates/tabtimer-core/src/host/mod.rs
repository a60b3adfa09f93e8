//! The platform seam: everything the Authority needs from the browser.
//!
//! Delivery methods report failure so the caller can log it, but the
//! Authority never retries or escalates. A closed popup or a page that
//! refuses scripts is an ordinary condition, not an error path.

mod local;

pub use local::LocalHost;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;
use crate::events::{OverlayMessage, PanelMessage};

/// An open browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: u32,
    /// `None` while nothing has been loaded yet.
    pub url: Option<String>,
}

impl Tab {
    pub fn new(id: u32, url: impl Into<String>) -> Self {
        Self {
            id,
            url: Some(url.into()),
        }
    }

    /// A real page that may host an overlay: it has a URL and that URL does
    /// not start with any of the privileged prefixes.
    pub fn is_eligible(&self, blocked_prefixes: &[String]) -> bool {
        match &self.url {
            Some(url) if !url.is_empty() => !blocked_prefixes
                .iter()
                .any(|prefix| url.starts_with(prefix.as_str())),
            _ => false,
        }
    }
}

/// Toolbar badge contents. Empty text clears the badge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub lang: String,
}

pub trait Host: Send + Sync + 'static {
    /// Every open tab, eligible or not.
    fn tabs(&self) -> Vec<Tab>;

    /// Make sure the overlay agent runs in `tab`. Re-injecting into a page
    /// that already has one must not create a second overlay.
    fn inject_agent(&self, tab: &Tab) -> Result<(), DeliveryError>;

    fn send_to_tab(&self, tab: &Tab, message: &OverlayMessage) -> Result<(), DeliveryError>;

    /// Reaches the popup if one is open.
    fn send_to_panel(&self, message: &PanelMessage) -> Result<(), DeliveryError>;

    fn set_badge(&self, badge: &Badge);

    /// System notification on completion. Clicking it is reported back
    /// through [`AuthorityHandle::notification_clicked`](crate::AuthorityHandle::notification_clicked).
    fn notify(&self, notification: &Notification) -> Result<(), DeliveryError>;

    fn speak(&self, speech: &Speech) -> Result<(), DeliveryError>;

    /// Bring up the popup.
    fn open_panel(&self) -> Result<(), DeliveryError>;
}
