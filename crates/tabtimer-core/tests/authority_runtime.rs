//! Authority runtime tests against the in-process browser.
//!
//! Time is paused, so every `sleep` below advances the clock deterministically
//! and the one-second interval fires exactly on the boundaries.

use std::sync::Arc;
use std::time::Duration;

use tabtimer_core::host::Host;
use tabtimer_core::{
    Authority, AuthorityHandle, Command, Config, LocalHost, MemoryStore, PanelView, Phase,
    Snapshot,
};
use tokio::task::JoinHandle;
use tokio::time::sleep;

struct Fixture {
    host: Arc<LocalHost>,
    store: MemoryStore,
    handle: AuthorityHandle,
    task: JoinHandle<()>,
}

fn fixture_with(store: MemoryStore) -> Fixture {
    let config = Config::default();
    let reader = store.clone();
    let host = Arc::new(LocalHost::new(&config).with_snapshot_reader(move || reader.current()));
    let (handle, task) = Authority::spawn(store.clone(), Arc::clone(&host), config);
    Fixture {
        host,
        store,
        handle,
        task,
    }
}

fn fixture() -> Fixture {
    fixture_with(MemoryStore::new())
}

async fn open_panel(fx: &Fixture) {
    let state = fx.handle.get_state().await.unwrap();
    fx.host
        .attach_panel(PanelView::from_state(state, Config::default().timer.presets));
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

// ============================================================================
// Countdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn default_scenario_start_tick_pause_reset() {
    let fx = fixture();
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(3.05)).await;

    let state = fx.handle.get_state().await.unwrap();
    assert!(state.is_running);
    assert_eq!(state.remaining_seconds, 1497);
    assert_eq!(state.time_string, "24:57");
    assert_eq!(fx.host.badge().text, "24:57");
    assert_eq!(fx.store.current().unwrap().remaining_seconds, 1497);

    fx.handle.send(Command::Pause).unwrap();
    sleep(secs(5.0)).await;
    let state = fx.handle.get_state().await.unwrap();
    assert!(state.is_paused);
    assert_eq!(state.remaining_seconds, 1497);

    fx.handle.send(Command::Reset).unwrap();
    let state = fx.handle.get_state().await.unwrap();
    assert!(!state.is_running && !state.is_paused);
    assert_eq!(state.remaining_seconds, 1500);
    assert_eq!(state.time_string, "25:00");

    sleep(secs(4.0)).await;
    let state = fx.handle.get_state().await.unwrap();
    assert_eq!(state.remaining_seconds, 1500, "no tick source after reset");
    assert_eq!(fx.store.current().unwrap().timer_state, Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn start_twice_does_not_double_the_tick_rate() {
    let fx = fixture();
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(0.5)).await;
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(2.0)).await;
    let state = fx.handle.get_state().await.unwrap();
    assert_eq!(state.remaining_seconds, 1498);
}

#[tokio::test(start_paused = true)]
async fn five_minute_preset_completes_once() {
    let fx = fixture();
    open_panel(&fx).await;

    fx.handle.send(Command::SetPreset(5)).unwrap();
    let state = fx.handle.get_state().await.unwrap();
    assert_eq!(state.total_seconds, 300);
    assert_eq!(state.remaining_seconds, 300);
    assert_eq!(fx.host.panel().unwrap().status(), "Timer set to 5 minutes");

    fx.handle.send(Command::Start).unwrap();
    sleep(secs(300.5)).await;

    let state = fx.handle.get_state().await.unwrap();
    assert!(!state.is_running && !state.is_paused);
    assert_eq!(state.remaining_seconds, 300);
    assert_eq!(fx.host.notifications().len(), 1);
    assert_eq!(fx.host.spoken(), vec!["Timer completed".to_string()]);
    assert_eq!(fx.host.badge().text, "✓");

    let panel = fx.host.panel().unwrap();
    assert!(panel.is_celebrating());
    assert_eq!(panel.minutes_text(), "05");
    assert_eq!(panel.start_label(), "Start");

    sleep(secs(5.0)).await;
    assert_eq!(fx.host.badge().text, "", "completion glyph reverts");
    assert!(!fx.host.panel().unwrap().is_celebrating());

    sleep(secs(30.0)).await;
    assert_eq!(fx.host.notifications().len(), 1);
    assert_eq!(fx.handle.get_state().await.unwrap().remaining_seconds, 300);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_durations_are_ignored() {
    let fx = fixture();
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(1.05)).await;
    let before = fx.handle.get_state().await.unwrap();
    let writes = fx.store.writes();

    for minutes in [0, -1, 1000, 99_999] {
        fx.handle.send(Command::SetCustom(minutes)).unwrap();
        fx.handle.send(Command::SetPreset(minutes)).unwrap();
    }
    let after = fx.handle.get_state().await.unwrap();
    assert_eq!(after, before);
    assert_eq!(fx.store.writes(), writes);
}

#[tokio::test(start_paused = true)]
async fn toggle_walks_start_pause_resume() {
    let fx = fixture();
    fx.handle.send(Command::ToggleTimer).unwrap();
    sleep(secs(2.05)).await;
    fx.handle.send(Command::ToggleTimer).unwrap();
    let paused = fx.handle.get_state().await.unwrap();
    assert!(paused.is_paused);
    assert_eq!(paused.remaining_seconds, 1498);

    fx.handle.send(Command::ToggleTimer).unwrap();
    sleep(secs(1.05)).await;
    let resumed = fx.handle.get_state().await.unwrap();
    assert!(resumed.is_running);
    assert_eq!(resumed.remaining_seconds, 1497);
}

// ============================================================================
// Overlays
// ============================================================================

#[tokio::test(start_paused = true)]
async fn start_reveals_overlays_on_eligible_pages_only() {
    let fx = fixture();
    let page = fx.host.load_page("https://example.com");
    let privileged = fx.host.load_page("chrome://settings");
    let stubborn = fx.host.load_page("https://locked.example");
    fx.host.clear_agent(stubborn.id);
    fx.host.reject_injection(stubborn.id);

    fx.handle.send(Command::Start).unwrap();
    sleep(secs(0.6)).await;

    let overlay = fx.host.overlay(page.id).unwrap();
    assert!(overlay.is_visible());
    assert_eq!(overlay.time_text(), "25:00");
    assert!(!overlay.is_paused());
    assert!(fx.host.overlay(privileged.id).is_none());
    assert!(fx.host.overlay(stubborn.id).is_none());

    sleep(secs(0.5)).await;
    assert_eq!(fx.host.overlay(page.id).unwrap().time_text(), "24:59");
    assert!(fx.handle.get_state().await.unwrap().is_running);
}

#[tokio::test(start_paused = true)]
async fn pause_keeps_overlay_and_reset_hides_it() {
    let fx = fixture();
    let page = fx.host.load_page("https://example.com");
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(1.05)).await;

    fx.handle.send(Command::Pause).unwrap();
    fx.handle.get_state().await.unwrap();
    let overlay = fx.host.overlay(page.id).unwrap();
    assert!(overlay.is_visible());
    assert!(overlay.is_paused());

    fx.handle.send(Command::Reset).unwrap();
    fx.handle.get_state().await.unwrap();
    let overlay = fx.host.overlay(page.id).unwrap();
    assert!(!overlay.is_visible());
    assert!(overlay.is_attached(), "exit animation still running");

    sleep(secs(0.35)).await;
    assert!(!fx.host.overlay(page.id).unwrap().is_attached());
}

#[tokio::test(start_paused = true)]
async fn overlay_clicks_drive_the_authority() {
    let fx = fixture();
    let page = fx.host.load_page("https://example.com");
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(1.05)).await;

    let toggle = fx.host.click_overlay(page.id, false).unwrap();
    fx.handle.send(toggle).unwrap();
    assert!(fx.handle.get_state().await.unwrap().is_paused);

    let reset = fx.host.click_overlay(page.id, true).unwrap();
    assert!(!fx.host.overlay(page.id).unwrap().is_visible(), "optimistic hide");
    fx.handle.send(reset).unwrap();
    let state = fx.handle.get_state().await.unwrap();
    assert_eq!(state.remaining_seconds, 1500);

    sleep(secs(0.15)).await;
    assert_eq!(fx.host.panel_opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn page_loaded_mid_run_gets_overlay() {
    let fx = fixture();
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(2.05)).await;

    let late = fx.host.load_page("https://late.example");
    let overlay = fx.host.overlay(late.id).unwrap();
    assert!(overlay.is_visible(), "snapshot check on load");
    assert_eq!(overlay.time_text(), "24:58");

    fx.handle.tab_loaded(late.clone()).unwrap();
    sleep(secs(1.5)).await;
    let overlay = fx.host.overlay(late.id).unwrap();
    assert!(overlay.is_visible());
    assert_eq!(overlay.time_text(), "24:57");
}

#[tokio::test(start_paused = true)]
async fn stopped_timer_ignores_page_loads() {
    let fx = fixture();
    let tab = fx.host.load_page("https://example.com");
    fx.handle.tab_loaded(tab.clone()).unwrap();
    sleep(secs(1.0)).await;
    assert!(!fx.host.overlay(tab.id).unwrap().is_visible());
}

// ============================================================================
// Persistence and restart
// ============================================================================

#[tokio::test(start_paused = true)]
async fn running_snapshot_resumes_after_restart() {
    let store = MemoryStore::with_snapshot(Snapshot {
        timer_state: Phase::Running,
        remaining_seconds: 61,
        total_seconds: 300,
        current_preset: 5,
    });
    let fx = fixture_with(store);
    let page = fx.host.load_page("https://example.com");

    sleep(secs(1.05)).await;
    let state = fx.handle.get_state().await.unwrap();
    assert!(state.is_running);
    assert_eq!(state.remaining_seconds, 60);
    assert_eq!(state.current_preset, 5);
    assert!(fx.host.overlay(page.id).unwrap().is_visible());
}

#[tokio::test(start_paused = true)]
async fn paused_snapshot_restores_without_ticking() {
    let store = MemoryStore::with_snapshot(Snapshot {
        timer_state: Phase::Paused,
        remaining_seconds: 100,
        total_seconds: 300,
        current_preset: 5,
    });
    let fx = fixture_with(store);
    sleep(secs(3.0)).await;
    let state = fx.handle.get_state().await.unwrap();
    assert!(state.is_paused);
    assert_eq!(state.remaining_seconds, 100);
    assert_eq!(fx.host.badge().text, "1:40");
}

#[tokio::test(start_paused = true)]
async fn storage_failures_do_not_stop_the_timer() {
    let store = MemoryStore::new();
    store.set_failing(true);
    let fx = fixture_with(store);
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(2.05)).await;
    let state = fx.handle.get_state().await.unwrap();
    assert_eq!(state.remaining_seconds, 1498);
    assert_eq!(fx.store.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn closed_popup_is_not_an_error() {
    let fx = fixture();
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(1.05)).await;
    assert!(fx.host.panel().is_none());
    assert!(fx.host.send_to_panel(&tabtimer_core::PanelMessage::TimerStarted).is_err());
    assert_eq!(fx.handle.get_state().await.unwrap().remaining_seconds, 1499);
}

#[tokio::test(start_paused = true)]
async fn panel_mirrors_live_updates() {
    let fx = fixture();
    open_panel(&fx).await;
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(3.05)).await;

    let panel = fx.host.panel().unwrap();
    assert_eq!(panel.minutes_text(), "24");
    assert_eq!(panel.seconds_text(), "57");
    assert!(!panel.start_enabled());
    assert_eq!(panel.status(), "Timer running...");
}

#[tokio::test(start_paused = true)]
async fn shutdown_ends_the_task() {
    let fx = fixture();
    fx.handle.shutdown();
    fx.task.await.unwrap();
    assert!(fx.handle.get_state().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn clicking_the_notification_opens_the_popup() {
    let fx = fixture();
    fx.handle.send(Command::SetPreset(1)).unwrap();
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(60.5)).await;
    assert!(fx.host.click_notification());
    assert_eq!(fx.host.panel_opens(), 0);

    fx.handle.notification_clicked().unwrap();
    fx.handle.get_state().await.unwrap();
    assert_eq!(fx.host.panel_opens(), 1);
}

// ============================================================================
// Duration changes mid-run
// ============================================================================

#[tokio::test(start_paused = true)]
async fn preset_while_running_stops_and_hides() {
    let fx = fixture();
    let page = fx.host.load_page("https://example.com");
    open_panel(&fx).await;
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(2.05)).await;
    assert!(fx.host.overlay(page.id).unwrap().is_visible());

    fx.handle.send(Command::SetPreset(15)).unwrap();
    sleep(secs(3.0)).await;

    let state = fx.handle.get_state().await.unwrap();
    assert!(!state.is_running && !state.is_paused);
    assert_eq!(state.remaining_seconds, 900);
    assert_eq!(state.current_preset, 15);

    let overlay = fx.host.overlay(page.id).unwrap();
    assert!(!overlay.is_visible());
    assert!(!overlay.is_attached());
    assert!(!overlay.is_paused());

    let panel = fx.host.panel().unwrap();
    assert_eq!(panel.minutes_text(), "15");
    assert_eq!(panel.seconds_text(), "00");
    assert_eq!(panel.status(), "Timer set to 15 minutes");
    assert_eq!(panel.active_preset(), Some(15));

    let saved = fx.store.current().unwrap();
    assert_eq!(saved.timer_state, Phase::Stopped);
    assert_eq!(saved.remaining_seconds, 900);
    assert_eq!(fx.host.badge().text, "15:00");
}

#[tokio::test(start_paused = true)]
async fn custom_while_paused_stops_and_hides() {
    let fx = fixture();
    let page = fx.host.load_page("https://example.com");
    fx.handle.send(Command::Start).unwrap();
    sleep(secs(1.05)).await;
    fx.handle.send(Command::Pause).unwrap();
    fx.handle.send(Command::SetCustom(42)).unwrap();
    sleep(secs(2.0)).await;

    let state = fx.handle.get_state().await.unwrap();
    assert!(!state.is_running && !state.is_paused);
    assert_eq!(state.remaining_seconds, 2520);
    assert!(!fx.host.overlay(page.id).unwrap().is_visible());
    assert_eq!(fx.store.current().unwrap().timer_state, Phase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn preset_while_stopped_leaves_overlays_alone() {
    let fx = fixture();
    let page = fx.host.load_page("https://example.com");
    fx.handle.send(Command::SetPreset(45)).unwrap();
    let state = fx.handle.get_state().await.unwrap();
    assert_eq!(state.total_seconds, 2700);
    let overlay = fx.host.overlay(page.id).unwrap();
    assert!(!overlay.is_visible());
    assert_eq!(overlay.time_text(), "--:--");
}
