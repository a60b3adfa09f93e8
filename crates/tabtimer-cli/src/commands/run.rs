//! `tabtimer run`: the Authority hosted against an in-process browser.
//!
//! Each stdin line is one input:
//!
//! ```text
//! start | pause | reset | toggle | preset N | custom N
//!                        buttons go through the popup while it is open
//! state                  print the getState reply
//! open URL               load a page (gets an overlay if eligible)
//! close ID               close a tab
//! click ID               click a page's overlay readout
//! reset-click ID         click a page's overlay reset control
//! panel | panel-close    open or close the popup
//! notification-click     click the completion notification
//! tabs                   list pages with their overlay state
//! quit
//! {"action": ...}        a raw wire command
//! ```

use std::sync::{Arc, Mutex};

use clap::Args;
use serde::Serialize;
use tabtimer_core::host::Host;
use tabtimer_core::storage::{Database, MemoryStore, SnapshotStore};
use tabtimer_core::{Authority, AuthorityHandle, Command, Config, LocalHost, PanelView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Args)]
pub struct RunArgs {
    /// Page to open before reading input (repeatable)
    #[arg(long = "page", value_name = "URL")]
    pages: Vec<String>,
}

/// A control that exists both in the popup and as a direct command.
#[derive(Debug, PartialEq, Eq)]
enum Button {
    Start,
    Pause,
    Reset,
    Preset(u32),
    Custom(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Button(Button),
    State,
    Open(String),
    Close(u32),
    Click { tab_id: u32, reset: bool },
    Panel,
    ClosePanel,
    ClickNotification,
    Tabs,
    Quit,
}

impl Input {
    /// `Ok(None)` for blank lines.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if line.starts_with('{') {
            return Command::decode(line)
                .map(|command| Some(Self::Command(command)))
                .map_err(|e| e.to_string());
        }
        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, Some(arg.trim())),
            None => (line, None),
        };
        let input = match (word, arg) {
            ("start", None) => Self::Button(Button::Start),
            ("pause", None) => Self::Button(Button::Pause),
            ("reset", None) => Self::Button(Button::Reset),
            ("toggle", None) => Self::Command(Command::ToggleTimer),
            ("preset", Some(n)) => Self::Button(Button::Preset(
                n.parse().map_err(|_| format!("not a preset: {n}"))?,
            )),
            ("custom", Some(raw)) => Self::Button(Button::Custom(raw.to_string())),
            ("state", None) => Self::State,
            ("open", Some(url)) => Self::Open(url.to_string()),
            ("close", Some(id)) => Self::Close(tab_id(id)?),
            ("click", Some(id)) => Self::Click {
                tab_id: tab_id(id)?,
                reset: false,
            },
            ("reset-click", Some(id)) => Self::Click {
                tab_id: tab_id(id)?,
                reset: true,
            },
            ("panel", None) => Self::Panel,
            ("panel-close", None) => Self::ClosePanel,
            ("notification-click", None) => Self::ClickNotification,
            ("tabs", None) => Self::Tabs,
            ("quit" | "exit", None) => Self::Quit,
            _ => return Err(format!("unrecognized input: {line}")),
        };
        Ok(Some(input))
    }
}

fn number(raw: &str) -> Result<i64, String> {
    raw.parse().map_err(|_| format!("not a number: {raw}"))
}

fn tab_id(raw: &str) -> Result<u32, String> {
    raw.parse().map_err(|_| format!("not a tab id: {raw}"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabReport {
    id: u32,
    url: Option<String>,
    overlay: Option<OverlayReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OverlayReport {
    visible: bool,
    paused: bool,
    time_text: String,
}

pub fn run(args: RunArgs) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(args))
}

async fn serve(args: RunArgs) -> CliResult<()> {
    let config = Config::load_or_default();
    match (Database::open(), Database::open()) {
        (Ok(store), Ok(reader)) => {
            let reader = Mutex::new(reader);
            let host = LocalHost::new(&config).with_snapshot_reader(move || {
                reader.lock().ok().and_then(|db| db.load().ok().flatten())
            });
            session(store, host, config, args).await
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!("Could not open database, state will not outlive this session: {e}");
            let store = MemoryStore::new();
            let reader = store.clone();
            let host = LocalHost::new(&config).with_snapshot_reader(move || reader.current());
            session(store, host, config, args).await
        }
    }
}

async fn session<S: SnapshotStore>(
    store: S,
    host: LocalHost,
    config: Config,
    args: RunArgs,
) -> CliResult<()> {
    let presets = config.timer.presets;
    let host = Arc::new(host);
    let (handle, task) = Authority::spawn(store, Arc::clone(&host), config);
    for url in &args.pages {
        open_page(&host, &handle, url)?;
    }
    info!("Timer authority ready, reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(input)) => {
                        if let Err(e) = execute(input, &host, &handle, presets).await {
                            eprintln!("error: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            _ = host.panel_requested() => {
                let state = handle.get_state().await?;
                host.attach_panel(PanelView::from_state(state, presets));
                info!("Popup opened");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    task.await?;
    Ok(())
}

async fn execute(
    input: Input,
    host: &LocalHost,
    handle: &AuthorityHandle,
    presets: [u32; 5],
) -> CliResult<()> {
    match input {
        Input::Command(Command::GetState) | Input::State => {
            let state = handle.get_state().await?;
            println!("{}", serde_json::to_string(&state)?);
        }
        Input::Command(command) => handle.send(command)?,
        Input::Button(button) => match press(host, button)? {
            Some(command) => handle.send(command)?,
            None => {
                if let Some(view) = host.panel() {
                    println!("{}", describe_panel(&view));
                }
            }
        },
        Input::Open(url) => open_page(host, handle, &url)?,
        Input::Close(tab_id) => host.close_tab(tab_id),
        Input::Click { tab_id, reset } => {
            let command = host
                .click_overlay(tab_id, reset)
                .ok_or_else(|| format!("tab {tab_id} has no overlay"))?;
            handle.send(command)?;
        }
        Input::Panel => {
            let state = handle.get_state().await?;
            let view = PanelView::from_state(state, presets);
            println!("{}", describe_panel(&view));
            host.attach_panel(view);
        }
        Input::ClosePanel => host.close_panel(),
        Input::ClickNotification => {
            if !host.click_notification() {
                return Err("no notification to click".into());
            }
            handle.notification_clicked()?;
        }
        Input::Tabs => {
            for tab in host.tabs() {
                let overlay = host.overlay(tab.id).map(|agent| OverlayReport {
                    visible: agent.is_visible(),
                    paused: agent.is_paused(),
                    time_text: agent.time_text().to_string(),
                });
                let report = TabReport {
                    id: tab.id,
                    url: tab.url,
                    overlay,
                };
                println!("{}", serde_json::to_string(&report)?);
            }
        }
        Input::Quit => {}
    }
    Ok(())
}

/// Resolve a button press. With the popup open the press goes through it,
/// so its validation applies; `None` means it refused and sent nothing.
fn press(host: &LocalHost, button: Button) -> CliResult<Option<Command>> {
    let from_panel = host.with_panel(|panel| match &button {
        Button::Start => Some(panel.start()),
        Button::Pause => Some(panel.pause()),
        Button::Reset => Some(panel.reset()),
        Button::Preset(minutes) => Some(panel.select_preset(*minutes)),
        Button::Custom(raw) => panel.submit_custom(raw),
    });
    if let Some(command) = from_panel {
        return Ok(command);
    }
    let command = match button {
        Button::Start => Command::Start,
        Button::Pause => Command::Pause,
        Button::Reset => Command::Reset,
        Button::Preset(minutes) => Command::SetPreset(minutes as i64),
        Button::Custom(raw) => Command::SetCustom(number(&raw)?),
    };
    Ok(Some(command))
}

fn open_page(host: &LocalHost, handle: &AuthorityHandle, url: &str) -> CliResult<()> {
    let tab = host.load_page(url);
    println!("tab {} {url}", tab.id);
    handle.tab_loaded(tab)?;
    Ok(())
}

fn describe_panel(view: &PanelView) -> String {
    let mut line = format!(
        "{}:{} [{}]",
        view.minutes_text(),
        view.seconds_text(),
        view.start_label()
    );
    line.push_str(" presets");
    for preset in view.presets() {
        if view.active_preset() == Some(preset) {
            line.push_str(&format!(" *{preset}"));
        } else {
            line.push_str(&format!(" {preset}"));
        }
    }
    if !view.status().is_empty() {
        line.push(' ');
        line.push_str(view.status());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_words_and_arguments() {
        assert_eq!(Input::parse("start"), Ok(Some(Input::Button(Button::Start))));
        assert_eq!(
            Input::parse("  preset 15 "),
            Ok(Some(Input::Button(Button::Preset(15))))
        );
        assert_eq!(
            Input::parse("custom ten"),
            Ok(Some(Input::Button(Button::Custom("ten".into()))))
        );
        assert_eq!(
            Input::parse("notification-click"),
            Ok(Some(Input::ClickNotification))
        );
        assert_eq!(
            Input::parse("open https://example.com"),
            Ok(Some(Input::Open("https://example.com".into())))
        );
        assert_eq!(
            Input::parse("reset-click 3"),
            Ok(Some(Input::Click {
                tab_id: 3,
                reset: true
            }))
        );
        assert_eq!(Input::parse(""), Ok(None));
        assert_eq!(Input::parse("quit"), Ok(Some(Input::Quit)));
    }

    #[test]
    fn parses_raw_wire_commands() {
        assert_eq!(
            Input::parse(r#"{"action":"overlayPause"}"#),
            Ok(Some(Input::Command(Command::Pause)))
        );
        assert!(Input::parse(r#"{"action":"selfDestruct"}"#).is_err());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(Input::parse("preset").is_err());
        assert!(Input::parse("preset -5").is_err());
        assert!(Input::parse("click first").is_err());
        assert!(Input::parse("start now").is_err());
    }

    #[test]
    fn panel_summary_reads_like_the_popup() {
        let view = PanelView::placeholder([5, 15, 25, 45, 60]);
        assert_eq!(describe_panel(&view), "25:00 [Start] presets 5 15 *25 45 60");
    }

    fn host_with_panel() -> LocalHost {
        let host = LocalHost::new(&Config::default());
        host.attach_panel(PanelView::placeholder([5, 15, 25, 45, 60]));
        host
    }

    #[test]
    fn open_popup_validates_custom_minutes() {
        let host = host_with_panel();
        assert_eq!(press(&host, Button::Custom("0".into())).unwrap(), None);
        assert_eq!(
            host.panel().unwrap().status(),
            "Please enter a valid time (1-999 minutes)"
        );
        assert_eq!(
            press(&host, Button::Custom(" 42 ".into())).unwrap(),
            Some(Command::SetCustom(42))
        );
    }

    #[test]
    fn open_popup_turns_presses_into_commands() {
        let host = host_with_panel();
        assert_eq!(
            press(&host, Button::Preset(15)).unwrap(),
            Some(Command::SetPreset(15))
        );
        assert_eq!(press(&host, Button::Start).unwrap(), Some(Command::Start));
        assert_eq!(press(&host, Button::Reset).unwrap(), Some(Command::Reset));
    }

    #[test]
    fn closed_popup_sends_presses_directly() {
        let host = LocalHost::new(&Config::default());
        assert_eq!(
            press(&host, Button::Custom("1000".into())).unwrap(),
            Some(Command::SetCustom(1000))
        );
        assert_eq!(press(&host, Button::Pause).unwrap(), Some(Command::Pause));
        assert!(press(&host, Button::Custom("ten".into())).is_err());
    }
}
