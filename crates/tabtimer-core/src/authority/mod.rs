//! The Timer Authority: the only writer of timer state.
//!
//! One tokio task owns the [`TimerEngine`], the snapshot store and the
//! one-second interval. Mirrors talk to it through an [`AuthorityHandle`];
//! it answers with broadcasts through the [`Host`]. The interval exists
//! exactly while the engine is `Running`, and it is always dropped before a
//! new one is created.

mod effects;
mod handle;

pub use handle::AuthorityHandle;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::events::PanelMessage;
use crate::host::{Host, Tab};
use crate::protocol::Command;
use crate::storage::{restore_engine, Config, SnapshotStore};
use crate::timer::{format_time, Phase, TimerEngine, Transition};

use handle::Request;

const TICK: Duration = Duration::from_secs(1);

pub struct Authority<S, H> {
    engine: TimerEngine,
    store: S,
    host: Arc<H>,
    config: Arc<Config>,
    ticker: Option<Interval>,
    tx: mpsc::WeakUnboundedSender<Request>,
    rx: mpsc::UnboundedReceiver<Request>,
}

impl<S: SnapshotStore, H: Host> Authority<S, H> {
    /// Restore state from `store` (defaults on an empty or unreadable store).
    pub fn new(store: S, host: Arc<H>, config: Config) -> (Self, AuthorityHandle) {
        let engine = restore_engine(&store, config.timer.default_minutes);
        Self::with_engine(engine, store, host, config)
    }

    pub fn with_engine(
        engine: TimerEngine,
        store: S,
        host: Arc<H>,
        config: Config,
    ) -> (Self, AuthorityHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let authority = Self {
            engine,
            store,
            host,
            config: Arc::new(config),
            ticker: None,
            tx: tx.downgrade(),
            rx,
        };
        (authority, AuthorityHandle { tx })
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    /// Run on the current tokio runtime.
    pub fn spawn(store: S, host: Arc<H>, config: Config) -> (AuthorityHandle, JoinHandle<()>) {
        let (authority, handle) = Self::new(store, host, config);
        let task = tokio::spawn(authority.run());
        (handle, task)
    }

    /// Event loop. Returns once every handle is dropped or `shutdown` is sent.
    pub async fn run(mut self) {
        self.resume_after_restart();
        loop {
            tokio::select! {
                request = self.rx.recv() => match request {
                    None | Some(Request::Shutdown) => break,
                    Some(request) => self.handle(request),
                },
                _ = next_tick(&mut self.ticker) => {
                    if let Some(transition) = self.engine.tick() {
                        self.apply(transition);
                    }
                }
            }
        }
        self.disarm();
        info!("Timer authority stopped");
    }

    fn resume_after_restart(&mut self) {
        self.update_badge();
        if self.engine.is_running() && self.engine.remaining_secs() > 0 {
            info!(
                remaining = self.engine.remaining_secs(),
                "Resuming timer that was running before restart"
            );
            self.apply(Transition::Started { resumed: true });
        }
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Command(command) => self.command(command),
            Request::GetState(reply) => {
                let _ = reply.send(self.engine.view());
            }
            Request::TabLoaded(tab) => self.tab_loaded(tab),
            Request::Reveal(tab) => self.reveal_overlays(tab),
            Request::NotificationClicked => {
                if let Err(e) = self.host.open_panel() {
                    debug!("Could not open popup: {e}");
                }
            }
            Request::Shutdown => {}
        }
    }

    fn command(&mut self, command: Command) {
        debug!(action = command.name(), "Received message");
        let transition = match command {
            Command::Start => self.engine.start(),
            Command::Pause => self.engine.pause(),
            Command::Reset => self.engine.reset(),
            Command::ResetAndOpenPopup => {
                let transition = self.engine.reset();
                self.open_panel_later();
                transition
            }
            Command::ToggleTimer => self.engine.toggle(),
            Command::SetPreset(minutes) | Command::SetCustom(minutes) => {
                let transition = self.engine.set_duration(minutes);
                if transition.is_none() {
                    debug!(minutes, "Ignoring out-of-range duration");
                }
                transition
            }
            Command::GetState => None,
        };
        match transition {
            Some(transition) => self.apply(transition),
            None => debug!(action = command.name(), "No state change"),
        }
    }

    fn tab_loaded(&mut self, tab: Tab) {
        if !self.engine.is_running() || !tab.is_eligible(&self.config.pages.blocked_prefixes) {
            return;
        }
        info!(tab_id = tab.id, "New tab loaded, injecting overlay agent");
        if let Err(e) = self.host.inject_agent(&tab) {
            debug!(tab_id = tab.id, "Failed to inject overlay agent into new tab: {e}");
            return;
        }
        self.reveal_later(Some(tab));
    }

    /// Turn one engine transition into its side effects.
    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Started { resumed } => {
                info!(resumed, remaining = self.engine.remaining_secs(), "Timer started");
                self.arm();
                self.inject_all();
                self.reveal_later(None);
                self.update_badge();
                self.persist();
                self.notify_panel(PanelMessage::TimerStarted);
            }
            Transition::Paused => {
                info!(remaining = self.engine.remaining_secs(), "Timer paused");
                self.disarm();
                self.update_badge();
                self.send_state_to_tabs();
                self.persist();
                self.notify_panel(PanelMessage::TimerPaused);
            }
            Transition::Reset { from } => {
                info!(from = from.as_str(), "Timer reset");
                self.disarm();
                self.update_badge();
                self.hide_overlays();
                self.send_state_to_tabs();
                self.persist();
                self.notify_panel(PanelMessage::TimerReset);
            }
            Transition::DurationChanged { minutes, from } => {
                info!(minutes, "Duration changed");
                self.disarm();
                self.update_badge();
                if from != Phase::Stopped {
                    self.hide_overlays();
                    self.send_state_to_tabs();
                }
                self.persist();
                self.notify_panel(PanelMessage::PresetChanged { preset: minutes });
            }
            Transition::Ticked { remaining_secs } => {
                self.update_badge();
                self.send_time_to_tabs();
                self.persist();
                self.notify_panel(PanelMessage::TimerUpdate {
                    remaining_seconds: remaining_secs,
                    time_string: format_time(remaining_secs),
                });
            }
            Transition::Completed => {
                info!(total = self.engine.total_secs(), "Timer completed");
                // The zero reading goes out before the completion, like any
                // other tick; mirrors then refill on `timerCompleted`.
                self.notify_panel(PanelMessage::TimerUpdate {
                    remaining_seconds: 0,
                    time_string: format_time(0),
                });
                self.disarm();
                self.update_badge();
                self.hide_overlays();
                self.persist();
                self.announce_completion();
                self.notify_panel(PanelMessage::TimerCompleted);
            }
        }
    }

    fn arm(&mut self) {
        self.disarm();
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    fn disarm(&mut self) {
        self.ticker = None;
    }

    fn open_panel_later(&self) {
        let host = Arc::clone(&self.host);
        let delay = self.config.overlay.popup_open_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = host.open_panel() {
                debug!("Could not open popup: {e}");
            }
        });
    }

    /// After the settle delay, ask the loop to reveal overlays with the state
    /// current at that moment.
    fn reveal_later(&self, tab: Option<Tab>) {
        let tx = self.tx.clone();
        let delay = self.config.overlay.inject_settle();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Request::Reveal(tab));
            }
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
