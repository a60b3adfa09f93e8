use tokio::sync::{mpsc, oneshot};

use crate::error::{CoreError, Result};
use crate::host::Tab;
use crate::protocol::{Command, StateView};

pub(super) enum Request {
    Command(Command),
    GetState(oneshot::Sender<StateView>),
    TabLoaded(Tab),
    /// Delayed follow-up to an injection: show the overlay on one tab, or on
    /// every eligible tab when `None`.
    Reveal(Option<Tab>),
    NotificationClicked,
    Shutdown,
}

/// Cheap, cloneable sender side of a running Authority.
#[derive(Debug, Clone)]
pub struct AuthorityHandle {
    pub(super) tx: mpsc::UnboundedSender<Request>,
}

impl AuthorityHandle {
    fn request(&self, request: Request) -> Result<()> {
        self.tx.send(request).map_err(|_| CoreError::AuthorityClosed)
    }

    /// Fire-and-forget command. `GetState` sent this way is answered into the void.
    pub fn send(&self, command: Command) -> Result<()> {
        match command {
            Command::GetState => {
                let (reply, _) = oneshot::channel();
                self.request(Request::GetState(reply))
            }
            command => self.request(Request::Command(command)),
        }
    }

    /// Request/response read of the full current state.
    pub async fn get_state(&self) -> Result<StateView> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::GetState(reply))?;
        rx.await.map_err(|_| CoreError::AuthorityClosed)
    }

    /// Send any wire command, awaiting the reply only for `GetState`.
    pub async fn dispatch(&self, command: Command) -> Result<Option<StateView>> {
        match command {
            Command::GetState => self.get_state().await.map(Some),
            command => self.send(command).map(|()| None),
        }
    }

    /// A tab finished loading a page.
    pub fn tab_loaded(&self, tab: Tab) -> Result<()> {
        self.request(Request::TabLoaded(tab))
    }

    /// The user clicked the completion notification.
    pub fn notification_clicked(&self) -> Result<()> {
        self.request(Request::NotificationClicked)
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Request::Shutdown);
    }
}
