//! Single-owner poll worker
//!
//! Holds the OAuth session, the slot table and the cache, and implements
//! the Stopped/Running state machine. Everything here runs on one thread;
//! [`super::PollScheduler`] feeds it commands and timer ticks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use super::{CycleOutcome, SlotReconciler};
use crate::auth::{OAuthSession, extract_auth_code};
use crate::provider::MailProvider;
use crate::service::{Notification, NotificationSink};

pub struct PollWorker<P, S> {
    session: OAuthSession<P>,
    reconciler: SlotReconciler,
    sink: S,
    running: Arc<AtomicBool>,
}

impl<P: MailProvider, S: NotificationSink> PollWorker<P, S> {
    pub fn new(session: OAuthSession<P>, slot_count: usize, sink: S) -> Self {
        Self {
            session,
            reconciler: SlotReconciler::new(slot_count),
            sink,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with the scheduler handle so `stop` takes effect at once
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &OAuthSession<P> {
        &self.session
    }

    pub fn reconciler(&self) -> &SlotReconciler {
        &self.reconciler
    }

    /// Stopped → Running, with one immediate cycle
    ///
    /// Without a valid credential the worker asks for authorization and stays
    /// stopped. Returns whether the worker is running afterwards.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Mail checker already running");
            return true;
        }

        if !self.session.is_authorized() {
            info!("No valid credentials, authorization required");
            self.sink.notify(Notification::ShowAuthRequired);
            return false;
        }

        info!("Starting mail checker for {}", self.session.mailbox());
        self.running.store(true, Ordering::SeqCst);
        self.run_cycle();
        self.is_running()
    }

    /// Running → Stopped; returns whether the worker was running
    pub fn stop(&mut self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if was_running {
            info!("Stopping mail checker");
        }
        was_running
    }

    /// Timer tick: run a cycle if still running
    pub fn tick(&mut self) -> Option<CycleOutcome> {
        if !self.is_running() {
            return None;
        }
        self.run_cycle()
    }

    /// Send the consent URL to the presentation layer
    pub fn request_auth_url(&mut self) {
        let url = self.session.authorization_url();
        self.sink.notify(Notification::ShowAuthWindow { url });
    }

    /// Complete authorization from the provider's redirect URL
    ///
    /// On success the credential is persisted and polling (re)starts with an
    /// immediate cycle. Returns whether the worker is running afterwards.
    pub fn handle_auth_redirect(&mut self, redirect_url: &str) -> bool {
        let code = match extract_auth_code(redirect_url) {
            Ok(code) => code,
            Err(e) => {
                warn!("{}", e);
                self.sink.notify(Notification::ShowAuthRequired);
                return false;
            }
        };

        self.sink.notify(Notification::ShowLoading);
        match self.session.exchange_code(&code) {
            Ok(_) => {
                self.stop();
                self.start()
            }
            Err(e) => {
                warn!("{}", e);
                self.sink.notify(Notification::ShowAuthRequired);
                false
            }
        }
    }

    fn run_cycle(&mut self) -> Option<CycleOutcome> {
        let running = &self.running;
        let sink = &self.sink;
        let result = self.reconciler.reconcile(&mut self.session, &mut |update| {
            if !running.load(Ordering::SeqCst) {
                debug!("Discarding update for slot {} after stop", update.index);
                return false;
            }
            sink.notify(update.into());
            true
        });

        match result {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("{}", e);
                if self.stop() {
                    self.sink.notify(Notification::ShowAuthRequired);
                }
                None
            }
        }
    }
}
