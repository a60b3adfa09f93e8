//! In-process browser: pages with overlay agents, an optional popup, a badge.
//!
//! Used by the CLI to host the Authority without a real browser, and by the
//! integration tests to observe every mirror.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use super::{Badge, Host, Notification, Speech, Tab};
use crate::error::DeliveryError;
use crate::events::{OverlayMessage, PanelMessage};
use crate::overlay::{OverlayAgent, PageContext};
use crate::panel::{PanelView, CELEBRATION};
use crate::storage::{Config, Snapshot};

type SnapshotReader = Box<dyn Fn() -> Option<Snapshot> + Send + Sync>;

struct LocalPage {
    page: PageContext,
    rejects_injection: bool,
}

#[derive(Default)]
struct Browser {
    pages: BTreeMap<u32, LocalPage>,
    next_tab_id: u32,
    panel: Option<PanelView>,
    badge: Badge,
    notifications: Vec<Notification>,
    spoken: Vec<String>,
    panel_opens: usize,
}

pub struct LocalHost {
    browser: Arc<Mutex<Browser>>,
    panel_requested: Arc<Notify>,
    snapshot_reader: Option<SnapshotReader>,
    blocked_prefixes: Vec<String>,
    hide_animation: Duration,
}

impl LocalHost {
    pub fn new(config: &Config) -> Self {
        Self {
            browser: Arc::new(Mutex::new(Browser {
                next_tab_id: 1,
                ..Browser::default()
            })),
            panel_requested: Arc::new(Notify::new()),
            snapshot_reader: None,
            blocked_prefixes: config.pages.blocked_prefixes.clone(),
            hide_animation: config.overlay.hide_animation(),
        }
    }

    /// Where freshly installed overlays read the persisted snapshot from.
    pub fn with_snapshot_reader(
        mut self,
        reader: impl Fn() -> Option<Snapshot> + Send + Sync + 'static,
    ) -> Self {
        self.snapshot_reader = Some(Box::new(reader));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Browser> {
        lock(&self.browser)
    }

    // ── Pages ───────────────────────────────────────────────────────

    /// Open a tab and load `url`. Eligible pages get their agent at load
    /// time, the way a declared content script would.
    pub fn load_page(&self, url: &str) -> Tab {
        let mut browser = self.lock();
        let id = browser.next_tab_id;
        browser.next_tab_id += 1;
        let tab = Tab::new(id, url);
        browser.pages.insert(
            id,
            LocalPage {
                page: PageContext::new(tab.clone()),
                rejects_injection: false,
            },
        );
        drop(browser);
        if tab.is_eligible(&self.blocked_prefixes) {
            self.install(&tab);
        }
        tab
    }

    /// Make a page refuse further script execution.
    pub fn reject_injection(&self, tab_id: u32) {
        if let Some(page) = self.lock().pages.get_mut(&tab_id) {
            page.rejects_injection = true;
        }
    }

    pub fn close_tab(&self, tab_id: u32) {
        self.lock().pages.remove(&tab_id);
    }

    /// Drop a page's agent, as a reload into a page without the script would.
    pub fn clear_agent(&self, tab_id: u32) {
        if let Some(page) = self.lock().pages.get_mut(&tab_id) {
            page.page = PageContext::new(page.page.tab.clone());
        }
    }

    pub fn overlay(&self, tab_id: u32) -> Option<OverlayAgent> {
        self.lock()
            .pages
            .get(&tab_id)
            .and_then(|page| page.page.overlay().cloned())
    }

    /// Simulate a click on a page's readout or reset control. Returns the
    /// command the agent would send, or `None` if the page has no agent.
    pub fn click_overlay(&self, tab_id: u32, reset: bool) -> Option<crate::protocol::Command> {
        let mut browser = self.lock();
        let agent = browser.pages.get_mut(&tab_id)?.page.overlay_mut()?;
        if !reset {
            return Some(agent.click_readout());
        }
        let (command, exit) = agent.click_reset();
        drop(browser);
        if let Some(delay) = exit {
            self.schedule_exit(tab_id, delay);
        }
        Some(command)
    }

    fn install(&self, tab: &Tab) {
        let snapshot = self.snapshot_reader.as_ref().and_then(|read| read());
        let exit = {
            let mut browser = self.lock();
            let Some(page) = browser.pages.get_mut(&tab.id) else {
                return;
            };
            if !page.page.install_overlay(self.hide_animation) {
                return;
            }
            page.page
                .overlay_mut()
                .and_then(|agent| agent.apply_snapshot(snapshot.as_ref()))
        };
        if let Some(delay) = exit {
            self.schedule_exit(tab.id, delay);
        }
    }

    fn schedule_exit(&self, tab_id: u32, delay: Duration) {
        let browser = Arc::clone(&self.browser);
        let finish = move || {
            if let Some(agent) = lock(&browser)
                .pages
                .get_mut(&tab_id)
                .and_then(|page| page.page.overlay_mut())
            {
                agent.finish_exit();
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    finish();
                });
            }
            Err(_) => finish(),
        }
    }

    // ── Panel ───────────────────────────────────────────────────────

    /// Show a popup seeded with a `getState` reply.
    pub fn attach_panel(&self, view: PanelView) {
        self.lock().panel = Some(view);
    }

    pub fn close_panel(&self) {
        self.lock().panel = None;
    }

    pub fn panel(&self) -> Option<PanelView> {
        self.lock().panel.clone()
    }

    /// Run `f` against the open popup, as a click inside it would.
    pub fn with_panel<R>(&self, f: impl FnOnce(&mut PanelView) -> R) -> Option<R> {
        self.lock().panel.as_mut().map(f)
    }

    /// Resolves after the Authority asked for the popup to open.
    pub async fn panel_requested(&self) {
        self.panel_requested.notified().await;
    }

    pub fn panel_opens(&self) -> usize {
        self.lock().panel_opens
    }

    // ── Side channels ───────────────────────────────────────────────

    pub fn badge(&self) -> Badge {
        self.lock().badge.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Click the most recent notification. False when none was ever shown.
    pub fn click_notification(&self) -> bool {
        !self.lock().notifications.is_empty()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.lock().spoken.clone()
    }
}

fn lock(browser: &Mutex<Browser>) -> MutexGuard<'_, Browser> {
    // The browser model stays consistent even if a holder panicked.
    browser.lock().unwrap_or_else(|e| e.into_inner())
}

impl Host for LocalHost {
    fn tabs(&self) -> Vec<Tab> {
        self.lock()
            .pages
            .values()
            .map(|page| page.page.tab.clone())
            .collect()
    }

    fn inject_agent(&self, tab: &Tab) -> Result<(), DeliveryError> {
        {
            let browser = self.lock();
            let page = browser
                .pages
                .get(&tab.id)
                .ok_or(DeliveryError::TabUnreachable { tab_id: tab.id })?;
            if page.rejects_injection {
                return Err(DeliveryError::InjectionRefused {
                    tab_id: tab.id,
                    reason: "page rejects script execution".into(),
                });
            }
            if !page.page.tab.is_eligible(&self.blocked_prefixes) {
                return Err(DeliveryError::InjectionRefused {
                    tab_id: tab.id,
                    reason: "cannot access a privileged page".into(),
                });
            }
        }
        self.install(tab);
        Ok(())
    }

    fn send_to_tab(&self, tab: &Tab, message: &OverlayMessage) -> Result<(), DeliveryError> {
        let exit = {
            let mut browser = self.lock();
            let agent = browser
                .pages
                .get_mut(&tab.id)
                .and_then(|page| page.page.overlay_mut())
                .ok_or(DeliveryError::TabUnreachable { tab_id: tab.id })?;
            agent.handle(message)
        };
        if let Some(delay) = exit {
            self.schedule_exit(tab.id, delay);
        }
        Ok(())
    }

    fn send_to_panel(&self, message: &PanelMessage) -> Result<(), DeliveryError> {
        {
            let mut browser = self.lock();
            let panel = browser.panel.as_mut().ok_or(DeliveryError::NoReceiver)?;
            panel.apply(message);
        }
        if *message == PanelMessage::TimerCompleted {
            let browser = Arc::clone(&self.browser);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    tokio::time::sleep(CELEBRATION).await;
                    if let Some(panel) = lock(&browser).panel.as_mut() {
                        panel.finish_celebration();
                    }
                });
            }
        }
        Ok(())
    }

    fn set_badge(&self, badge: &Badge) {
        self.lock().badge = badge.clone();
    }

    fn notify(&self, notification: &Notification) -> Result<(), DeliveryError> {
        debug!(title = %notification.title, "notification");
        self.lock().notifications.push(notification.clone());
        Ok(())
    }

    fn speak(&self, speech: &Speech) -> Result<(), DeliveryError> {
        self.lock().spoken.push(speech.text.clone());
        Ok(())
    }

    fn open_panel(&self) -> Result<(), DeliveryError> {
        self.lock().panel_opens += 1;
        self.panel_requested.notify_one();
        Ok(())
    }
}
