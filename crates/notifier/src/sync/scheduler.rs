//! Background poll thread
//!
//! [`PollScheduler`] moves a [`PollWorker`] onto its own thread and drives
//! it with commands and a fixed-delay timer. The worker is never shared, so
//! cycles cannot overlap and slot state needs no locking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use log::{debug, error, info};

use super::PollWorker;
use crate::provider::MailProvider;
use crate::service::NotificationSink;

enum Command {
    Start,
    Stop,
    RequestAuthUrl,
    AuthRedirect(String),
    Shutdown,
}

/// Handle to the poll thread; dropping it stops and joins the thread
pub struct PollScheduler {
    commands: Sender<Command>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawn the poll thread; the worker starts out stopped
    pub fn spawn<P, S>(worker: PollWorker<P, S>, interval: Duration) -> Result<Self>
    where
        P: MailProvider + 'static,
        S: NotificationSink + 'static,
    {
        let (commands, receiver) = mpsc::channel();
        let running = worker.running_flag();

        let thread = thread::Builder::new()
            .name("mail-poller".to_string())
            .spawn(move || run(worker, receiver, interval))
            .context("Failed to spawn poll thread")?;

        Ok(Self {
            commands,
            running,
            thread: Some(thread),
        })
    }

    /// Begin polling with an immediate cycle; no-op if already running
    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    /// Stop polling; results of an in-flight cycle are discarded
    pub fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.send(Command::Stop)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn request_auth_url(&self) -> Result<()> {
        self.send(Command::RequestAuthUrl)
    }

    /// Hand the OAuth redirect URL to the worker
    pub fn auth_code_received(&self, redirect_url: impl Into<String>) -> Result<()> {
        self.send(Command::AuthRedirect(redirect_url.into()))
    }

    /// Stop the thread and wait for it to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Poll thread has exited"))
    }

    fn join(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::SeqCst);
        // The thread may already be gone; joining still reports a panic
        let _ = self.commands.send(Command::Shutdown);
        thread.join().map_err(|_| anyhow!("Poll thread panicked"))
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            error!("{}", e);
        }
    }
}

fn run<P, S>(mut worker: PollWorker<P, S>, commands: Receiver<Command>, interval: Duration)
where
    P: MailProvider,
    S: NotificationSink,
{
    debug!("Poll thread started, interval {:?}", interval);
    let mut next_due: Option<Instant> = None;

    loop {
        let command = match next_due {
            Some(due) if worker.is_running() => {
                match commands.recv_timeout(due.saturating_duration_since(Instant::now())) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => Some(Command::Shutdown),
                }
            }
            _ => Some(commands.recv().unwrap_or(Command::Shutdown)),
        };

        let running = match command {
            None => {
                worker.tick();
                worker.is_running()
            }
            Some(Command::Start) => worker.start(),
            Some(Command::Stop) => {
                worker.stop();
                false
            }
            Some(Command::RequestAuthUrl) => {
                worker.request_auth_url();
                worker.is_running()
            }
            Some(Command::AuthRedirect(url)) => worker.handle_auth_redirect(&url),
            Some(Command::Shutdown) => break,
        };

        next_due = match (running, next_due) {
            (false, _) => None,
            // Timer keeps its deadline across unrelated commands
            (true, Some(due)) if due > Instant::now() => Some(due),
            (true, _) => Some(Instant::now() + interval),
        };
    }

    worker.stop();
    info!("Poll thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{OAuthSession, TokenStore};
    use crate::models::Credential;
    use crate::provider::fake::FakeProvider;
    use crate::service::Notification;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    fn spawn(
        dir: &TempDir,
        provider: &FakeProvider,
        interval: Duration,
    ) -> (PollScheduler, Receiver<Notification>) {
        let store = TokenStore::new(dir.path().join("gmail-oauth.json"));
        store.save(&Credential::new("access", Some("refresh".to_string()))).unwrap();
        let session = OAuthSession::new(provider.clone(), store, "me", Vec::new());
        let (tx, rx) = mpsc::channel();
        let worker = PollWorker::new(session, 2, tx);
        (PollScheduler::spawn(worker, interval).unwrap(), rx)
    }

    fn slot_update(rx: &Receiver<Notification>) -> (usize, Option<String>) {
        match rx.recv_timeout(WAIT).unwrap() {
            Notification::SlotUpdated { index, data } => (index, data.and_then(|d| d.subject)),
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[test]
    fn test_polls_on_interval() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        provider.set_unread(&["a"]);
        let (scheduler, rx) = spawn(&dir, &provider, Duration::from_millis(20));

        scheduler.start().unwrap();
        assert_eq!(slot_update(&rx), (0, Some("Subject a".to_string())));
        assert!(scheduler.is_running());

        // Picked up by a later timer tick, not by another command
        provider.set_unread(&["b", "a"]);
        assert_eq!(slot_update(&rx), (0, Some("Subject b".to_string())));
        assert_eq!(slot_update(&rx), (1, Some("Subject a".to_string())));

        scheduler.shutdown().unwrap();
        assert!(provider.state().list_calls >= 2);
    }

    #[test]
    fn test_stop_halts_polling() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        provider.set_unread(&["a"]);
        let (scheduler, rx) = spawn(&dir, &provider, Duration::from_millis(10));

        scheduler.start().unwrap();
        slot_update(&rx);
        scheduler.stop().unwrap();
        assert!(!scheduler.is_running());

        // Let any in-flight cycle finish before sampling
        thread::sleep(Duration::from_millis(50));
        let calls = provider.state().list_calls;
        thread::sleep(Duration::from_millis(100));
        assert_eq!(provider.state().list_calls, calls);

        provider.set_unread(&["b"]);
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_restart_runs_immediate_cycle() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        provider.set_unread(&["a"]);
        let (scheduler, rx) = spawn(&dir, &provider, Duration::from_secs(3600));

        scheduler.start().unwrap();
        slot_update(&rx);
        scheduler.stop().unwrap();

        provider.set_unread(&["b"]);
        scheduler.start().unwrap();
        assert_eq!(slot_update(&rx), (0, Some("Subject b".to_string())));
    }

    #[test]
    fn test_auth_url_request_is_forwarded() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let (scheduler, rx) = spawn(&dir, &provider, Duration::from_secs(3600));

        scheduler.request_auth_url().unwrap();
        assert!(matches!(
            rx.recv_timeout(WAIT).unwrap(),
            Notification::ShowAuthWindow { .. }
        ));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_drop_joins_thread() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let (scheduler, rx) = spawn(&dir, &provider, Duration::from_millis(10));
        scheduler.start().unwrap();
        drop(scheduler);

        // The worker, and with it the sender, is gone once the thread exits
        // An empty inbox over empty slots is silent
        let remaining: Vec<Notification> = rx.iter().collect();
        assert!(remaining.is_empty());
    }
}
