//! NotifierService facade for the presentation layer
//!
//! The presentation layer talks to the engine with [`UiEvent`]s and listens
//! for [`Notification`]s. Both are plain serde enums so a host can carry them
//! over any message channel as JSON.

use std::sync::mpsc::Sender;

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::auth::{OAuthSession, TokenStore};
use crate::config::NotifierConfig;
use crate::gmail::GmailClient;
use crate::models::MessageDisplayData;
use crate::provider::MailProvider;
use crate::sync::{PollScheduler, PollWorker, SlotUpdate};

// ============================================================================
// Messages
// ============================================================================

/// Engine → presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notification", content = "payload", rename_all = "kebab-case")]
pub enum Notification {
    /// Work is in progress (startup or authorization)
    ShowLoading,
    /// No usable credential; show the authorize affordance
    ShowAuthRequired,
    /// Open the provider's consent page
    ShowAuthWindow { url: String },
    /// Replace row `index`; `data: None` clears it
    SlotUpdated {
        index: usize,
        data: Option<MessageDisplayData>,
    },
}

impl From<SlotUpdate> for Notification {
    fn from(update: SlotUpdate) -> Self {
        Self::SlotUpdated {
            index: update.index,
            data: update.data,
        }
    }
}

/// Presentation → engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum UiEvent {
    /// Configure (or reconfigure) the engine and start polling
    Init(NotifierConfig),
    RequestAuthUrl,
    /// The consent flow redirected to the configured redirect URL
    #[serde(rename_all = "camelCase")]
    AuthCodeReceived { redirect_url: String },
}

/// Destination for notifications
///
/// Called from the poll thread, so implementations must be `Send`.
pub trait NotificationSink: Send {
    fn notify(&self, notification: Notification);
}

impl NotificationSink for Sender<Notification> {
    fn notify(&self, notification: Notification) {
        // The presentation layer has gone away; nothing left to tell
        if self.send(notification).is_err() {
            debug!("Notification receiver dropped");
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Owns the poll thread for the current configuration
///
/// Each `init` replaces the previous worker, so the slot table and cache
/// start out empty for the new configuration.
pub struct NotifierService<S> {
    sink: S,
    scheduler: Option<PollScheduler>,
}

impl<S: NotificationSink + Clone + 'static> NotifierService<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            scheduler: None,
        }
    }

    /// Dispatch one event from the presentation layer
    pub fn handle_event(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::Init(config) => self.init(config),
            UiEvent::RequestAuthUrl => self.scheduler()?.request_auth_url(),
            UiEvent::AuthCodeReceived { redirect_url } => {
                self.scheduler()?.auth_code_received(redirect_url)
            }
        }
    }

    /// Configure against the Gmail API and start polling
    pub fn init(&mut self, config: NotifierConfig) -> Result<()> {
        let provider = GmailClient::from_config(&config);
        self.init_with_provider(config, provider)
    }

    /// Configure against an arbitrary provider and start polling
    ///
    /// Without a stored credential the worker stays stopped and asks for
    /// authorization instead.
    pub fn init_with_provider<P>(&mut self, config: NotifierConfig, provider: P) -> Result<()>
    where
        P: MailProvider + 'static,
    {
        config.validate()?;

        if let Some(previous) = self.scheduler.take() {
            info!("Reinitializing, stopping previous poller");
            previous.shutdown()?;
        }
        self.sink.notify(Notification::ShowLoading);

        let token_path = config.token_path()?;
        debug!("Using token file {}", token_path.display());
        let session = OAuthSession::new(
            provider,
            TokenStore::new(token_path),
            config.email.clone(),
            config.scopes.clone(),
        );

        let worker = PollWorker::new(session, config.max_results(), self.sink.clone());
        let scheduler = PollScheduler::spawn(worker, config.poll_interval())?;
        scheduler.start()?;
        info!(
            "Notifier initialized for {} ({} slots, every {:?})",
            config.email,
            config.max_results(),
            config.poll_interval()
        );

        self.scheduler = Some(scheduler);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(PollScheduler::is_running)
    }

    /// Pause polling without dropping the configuration
    pub fn stop(&self) -> Result<()> {
        self.scheduler()?.stop()
    }

    /// Resume polling with an immediate cycle
    pub fn start(&self) -> Result<()> {
        self.scheduler()?.start()
    }

    /// Stop the poll thread and wait for it
    pub fn shutdown(&mut self) -> Result<()> {
        match self.scheduler.take() {
            Some(scheduler) => scheduler.shutdown(),
            None => Ok(()),
        }
    }

    fn scheduler(&self) -> Result<&PollScheduler> {
        match &self.scheduler {
            Some(scheduler) => Ok(scheduler),
            None => {
                warn!("Event received before init");
                bail!("Notifier has not been initialized")
            }
        }
    }
}

/// Parse a [`UiEvent`] from its JSON form
pub fn parse_event(json: &str) -> Result<UiEvent> {
    serde_json::from_str(json).context("Failed to parse UI event")
}
