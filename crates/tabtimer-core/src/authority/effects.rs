//! Side effects of a transition: persistence, badge, and best-effort delivery
//! to every mirror. Nothing here returns an error; failures are logged and
//! dropped.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::Authority;
use crate::events::{OverlayMessage, PanelMessage};
use crate::host::{Badge, Host, Notification, Speech, Tab};
use crate::storage::SnapshotStore;

impl<S: SnapshotStore, H: Host> Authority<S, H> {
    pub(super) fn persist(&self) {
        if let Err(e) = self.store.save(&self.engine.snapshot()) {
            warn!("Error saving state: {e}");
        }
    }

    pub(super) fn update_badge(&self) {
        let remaining = self.engine.remaining_secs();
        let badge = if remaining == 0 {
            Badge::default()
        } else {
            Badge {
                text: self.engine.time_string(),
                color: Some(self.config.badge.running_color.clone()),
            }
        };
        self.host.set_badge(&badge);
    }

    pub(super) fn notify_panel(&self, message: PanelMessage) {
        // The popup is usually closed.
        if let Err(e) = self.host.send_to_panel(&message) {
            debug!("Panel not reachable: {e}");
        }
    }

    fn eligible_tabs(&self) -> Vec<Tab> {
        self.host
            .tabs()
            .into_iter()
            .filter(|tab| tab.is_eligible(&self.config.pages.blocked_prefixes))
            .collect()
    }

    fn send_to_tabs(&self, tabs: &[Tab], message: &OverlayMessage) {
        for tab in tabs {
            if let Err(e) = self.host.send_to_tab(tab, message) {
                debug!(tab_id = tab.id, "Failed to send message to tab: {e}");
            }
        }
    }

    fn broadcast_tabs(&self, message: &OverlayMessage) {
        self.send_to_tabs(&self.eligible_tabs(), message);
    }

    pub(super) fn inject_all(&self) {
        let tabs = self.eligible_tabs();
        debug!(count = tabs.len(), "Injecting overlay agent into existing tabs");
        for tab in &tabs {
            if let Err(e) = self.host.inject_agent(tab) {
                debug!(tab_id = tab.id, "Failed to inject overlay agent: {e}");
            }
        }
    }

    /// Skipped at zero: the completion path takes over from there.
    pub(super) fn send_time_to_tabs(&self) {
        if self.engine.remaining_secs() == 0 {
            return;
        }
        self.broadcast_tabs(&OverlayMessage::UpdateTimer(self.engine.time_string()));
    }

    pub(super) fn send_state_to_tabs(&self) {
        self.broadcast_tabs(&OverlayMessage::UpdateTimerState(self.engine.view()));
    }

    pub(super) fn hide_overlays(&self) {
        self.broadcast_tabs(&OverlayMessage::HideOverlay);
    }

    /// Follow-up to injection. All tabs get show, readout and paused state;
    /// a single newly loaded tab gets show and readout.
    pub(super) fn reveal_overlays(&self, tab: Option<Tab>) {
        match tab {
            None => {
                let tabs = self.eligible_tabs();
                self.send_to_tabs(&tabs, &OverlayMessage::ShowOverlay);
                if self.engine.remaining_secs() > 0 {
                    self.send_to_tabs(&tabs, &OverlayMessage::UpdateTimer(self.engine.time_string()));
                }
                self.send_to_tabs(&tabs, &OverlayMessage::UpdateTimerState(self.engine.view()));
            }
            Some(tab) => {
                let tabs = [tab];
                self.send_to_tabs(&tabs, &OverlayMessage::ShowOverlay);
                self.send_to_tabs(&tabs, &OverlayMessage::UpdateTimer(self.engine.time_string()));
            }
        }
    }

    /// Notification, speech, and a completion glyph on the badge that clears
    /// itself after a few seconds.
    pub(super) fn announce_completion(&self) {
        let notifications = &self.config.notifications;
        if notifications.enabled {
            let notification = Notification {
                title: notifications.title.clone(),
                message: notifications.message.clone(),
                at: Utc::now(),
            };
            if let Err(e) = self.host.notify(&notification) {
                debug!("Could not show notification: {e}");
            }
        }
        if notifications.speech_enabled {
            let speech = Speech {
                text: notifications.speech_text.clone(),
                rate: notifications.speech_rate,
                pitch: notifications.speech_pitch,
                volume: notifications.speech_volume,
                lang: notifications.speech_lang.clone(),
            };
            if let Err(e) = self.host.speak(&speech) {
                debug!("Could not play notification sound: {e}");
            }
        }

        let badge = &self.config.badge;
        self.host.set_badge(&Badge {
            text: badge.complete_glyph.clone(),
            color: Some(badge.complete_color.clone()),
        });
        let host = Arc::clone(&self.host);
        let revert = std::time::Duration::from_secs(badge.complete_revert_secs);
        tokio::spawn(async move {
            tokio::time::sleep(revert).await;
            host.set_badge(&Badge::default());
        });
    }
}
