//! Overlay agent: the floating countdown widget living inside one page.
//!
//! The agent is a mirror. It never counts time itself; it only replaces its
//! readout and paused styling with whatever the Authority pushes. Visibility
//! has two layers, a logical `visible` flag flipped immediately and a layout
//! attachment that is dropped only once the exit animation has run. The
//! animation delay is a plain timer, so a `show` that lands inside it is
//! undone when the timer fires.

use std::time::Duration;

use tracing::debug;

use crate::events::OverlayMessage;
use crate::host::Tab;
use crate::protocol::Command;
use crate::storage::Snapshot;
use crate::timer::format_time;

/// Readout before the first update arrives.
pub const PLACEHOLDER: &str = "--:--";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayAgent {
    visible: bool,
    attached: bool,
    time_text: String,
    paused: bool,
    hide_animation: Duration,
}

impl OverlayAgent {
    /// A hidden widget with the placeholder readout.
    pub fn new(hide_animation: Duration) -> Self {
        Self {
            visible: false,
            attached: false,
            time_text: PLACEHOLDER.to_string(),
            paused: false,
            hide_animation,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the widget currently takes part in layout. Stays true for the
    /// length of the exit animation after `hide`.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn time_text(&self) -> &str {
        &self.time_text
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// No-op while already visible.
    pub fn show(&mut self) -> bool {
        if self.visible {
            debug!("Overlay already visible");
            return false;
        }
        self.visible = true;
        self.attached = true;
        true
    }

    /// Start the exit animation. Returns the delay after which the caller
    /// must invoke [`finish_exit`](Self::finish_exit), or `None` if the
    /// widget was already hidden.
    pub fn hide(&mut self) -> Option<Duration> {
        if !self.visible {
            debug!("Overlay already hidden");
            return None;
        }
        self.visible = false;
        Some(self.hide_animation)
    }

    /// End of the exit animation: detach from layout.
    pub fn finish_exit(&mut self) {
        self.attached = false;
    }

    /// Replace the readout. Returns false when the text is unchanged.
    pub fn set_time_text(&mut self, text: &str) -> bool {
        if self.time_text == text {
            return false;
        }
        self.time_text = text.to_string();
        true
    }

    /// Apply one control message. Returns the exit delay when it hid the widget.
    pub fn handle(&mut self, message: &OverlayMessage) -> Option<Duration> {
        match message {
            OverlayMessage::ShowOverlay => {
                self.show();
                None
            }
            OverlayMessage::HideOverlay => self.hide(),
            OverlayMessage::UpdateTimer(text) => {
                self.set_time_text(text);
                None
            }
            OverlayMessage::UpdateTimerState(state) => {
                self.paused = state.is_paused;
                None
            }
        }
    }

    /// Click on the readout.
    pub fn click_readout(&self) -> Command {
        Command::ToggleTimer
    }

    /// Click on the reset control: the command to send, plus an optimistic
    /// local hide that the next broadcast confirms or corrects.
    pub fn click_reset(&mut self) -> (Command, Option<Duration>) {
        (Command::ResetAndOpenPopup, self.hide())
    }

    /// One-time check against the persisted snapshot on page load.
    pub fn apply_snapshot(&mut self, snapshot: Option<&Snapshot>) -> Option<Duration> {
        let snapshot = snapshot?;
        if snapshot.overlay_visible() {
            self.show();
            self.set_time_text(&format_time(snapshot.remaining_seconds));
            None
        } else {
            self.hide()
        }
    }
}

/// A loaded page. Holds at most one overlay no matter how often the agent
/// script is injected.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub tab: Tab,
    overlay: Option<OverlayAgent>,
}

impl PageContext {
    pub fn new(tab: Tab) -> Self {
        Self { tab, overlay: None }
    }

    /// Install the agent. Returns false when one is already present, in which
    /// case the existing agent is kept untouched.
    pub fn install_overlay(&mut self, hide_animation: Duration) -> bool {
        if self.overlay.is_some() {
            debug!(tab_id = self.tab.id, "Overlay already initialized, skipping");
            return false;
        }
        self.overlay = Some(OverlayAgent::new(hide_animation));
        true
    }

    pub fn overlay(&self) -> Option<&OverlayAgent> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut OverlayAgent> {
        self.overlay.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StateView;
    use crate::timer::Phase;

    const EXIT: Duration = Duration::from_millis(300);

    fn state(is_paused: bool) -> StateView {
        StateView {
            is_running: !is_paused,
            is_paused,
            remaining_seconds: 90,
            total_seconds: 300,
            current_preset: 5,
            time_string: "1:30".into(),
        }
    }

    #[test]
    fn starts_hidden_with_placeholder() {
        let agent = OverlayAgent::new(EXIT);
        assert!(!agent.is_visible());
        assert!(!agent.is_attached());
        assert_eq!(agent.time_text(), PLACEHOLDER);
    }

    #[test]
    fn show_and_hide_are_idempotent() {
        let mut agent = OverlayAgent::new(EXIT);
        assert!(agent.show());
        assert!(!agent.show());
        assert_eq!(agent.hide(), Some(EXIT));
        assert_eq!(agent.hide(), None);
    }

    #[test]
    fn hide_detaches_after_exit_animation() {
        let mut agent = OverlayAgent::new(EXIT);
        agent.show();
        agent.hide();
        assert!(!agent.is_visible());
        assert!(agent.is_attached(), "still animating out");
        agent.finish_exit();
        assert!(!agent.is_attached());
    }

    #[test]
    fn late_exit_timer_detaches_a_reshown_widget() {
        let mut agent = OverlayAgent::new(EXIT);
        agent.show();
        agent.hide();
        agent.show();
        agent.finish_exit();
        assert!(agent.is_visible());
        assert!(!agent.is_attached());
    }

    #[test]
    fn messages_replace_text_and_paused_state() {
        let mut agent = OverlayAgent::new(EXIT);
        agent.handle(&OverlayMessage::ShowOverlay);
        agent.handle(&OverlayMessage::UpdateTimer("24:57".into()));
        agent.handle(&OverlayMessage::UpdateTimerState(state(true)));
        assert!(agent.is_visible());
        assert_eq!(agent.time_text(), "24:57");
        assert!(agent.is_paused());

        agent.handle(&OverlayMessage::UpdateTimerState(state(false)));
        assert!(!agent.is_paused());
        assert_eq!(agent.handle(&OverlayMessage::HideOverlay), Some(EXIT));
    }

    #[test]
    fn clicks_map_to_commands() {
        let mut agent = OverlayAgent::new(EXIT);
        agent.show();
        assert_eq!(agent.click_readout(), Command::ToggleTimer);
        let (command, exit) = agent.click_reset();
        assert_eq!(command, Command::ResetAndOpenPopup);
        assert_eq!(exit, Some(EXIT));
        assert!(!agent.is_visible());
    }

    #[test]
    fn snapshot_decides_initial_visibility() {
        let active = Snapshot {
            timer_state: Phase::Paused,
            remaining_seconds: 754,
            total_seconds: 1500,
            current_preset: 25,
        };
        let mut agent = OverlayAgent::new(EXIT);
        assert_eq!(agent.apply_snapshot(Some(&active)), None);
        assert!(agent.is_visible());
        assert_eq!(agent.time_text(), "12:34");

        let stopped = Snapshot {
            timer_state: Phase::Stopped,
            ..active
        };
        assert_eq!(agent.apply_snapshot(Some(&stopped)), Some(EXIT));

        let mut fresh = OverlayAgent::new(EXIT);
        assert_eq!(fresh.apply_snapshot(None), None);
        assert!(!fresh.is_visible());
    }

    #[test]
    fn page_keeps_a_single_overlay() {
        let mut page = PageContext::new(Tab::new(7, "https://example.com"));
        assert!(page.install_overlay(EXIT));
        page.overlay_mut().unwrap().set_time_text("3:00");
        assert!(!page.install_overlay(EXIT));
        assert_eq!(page.overlay().unwrap().time_text(), "3:00");
    }
}
