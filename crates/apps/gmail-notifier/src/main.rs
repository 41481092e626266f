//! gmail-notifier - A terminal unread-mail notifier
//!
//! Plays the presentation layer for the notifier engine: prints the unread
//! rows, shows the consent URL and hands the OAuth redirect back.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use notifier::{Notification, NotificationSink, NotifierConfig, NotifierService, UiEvent};

mod callback;
mod render;

use callback::RedirectListener;
use render::Display;

#[derive(Parser)]
#[command(name = "gmail-notifier")]
#[command(about = "Show your most recent unread Gmail messages", long_about = None)]
struct Cli {
    /// Notifier config file (defaults to ~/.config/gmail-notifier/notifier.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print notifications as JSON lines instead of rows
    #[arg(long)]
    json: bool,

    /// Do not open the consent URL in a browser
    #[arg(long)]
    no_browser: bool,

    /// Do not listen for the OAuth redirect locally
    #[arg(long)]
    no_listen: bool,
}

/// Everything the main loop reacts to
enum AppEvent {
    Notification(Notification),
    Input(String),
    Redirect(String),
    InputClosed,
}

/// Routes engine notifications into the main loop
#[derive(Clone)]
struct AppSink(Sender<AppEvent>);

impl NotificationSink for AppSink {
    fn notify(&self, notification: Notification) {
        if self.0.send(AppEvent::Notification(notification)).is_err() {
            debug!("Main loop has exited");
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let notifier_config = match &cli.config {
        Some(path) => NotifierConfig::from_file(path)?,
        None => NotifierConfig::load()?,
    };
    if !notifier_config.has_credentials()
        && let Some(path) = notifier::GmailCredentials::default_credentials_path()
    {
        warn!(
            "To configure Gmail access, either:\n\
             1. Set clientId/clientSecret in your notifier config\n\
             2. Place your Google OAuth credentials at: {}\n\
             3. Or set environment variables: GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
            path.display()
        );
    }
    let redirect_url = notifier_config.redirect_url.clone();

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone())?;

    let mut service = NotifierService::new(AppSink(tx.clone()));
    service
        .handle_event(UiEvent::Init(notifier_config))
        .context("Failed to start notifier")?;

    let mut display = Display::new();
    let mut listening = false;

    for event in rx.iter() {
        match event {
            AppEvent::Notification(notification) => {
                if cli.json {
                    println!("{}", serde_json::to_string(&notification)?);
                } else if display.apply(&notification) {
                    println!("\n{}", display.render());
                }

                if let Notification::ShowAuthWindow { url } = &notification {
                    show_auth_window(url, &cli);
                    if !cli.no_listen && !listening {
                        listening = spawn_redirect_listener(&redirect_url, tx.clone());
                    }
                }
            }
            AppEvent::Redirect(url) => {
                listening = false;
                forward_redirect(&mut service, url);
            }
            AppEvent::Input(line) => match line.trim() {
                "" => {}
                "quit" | "exit" => break,
                "auth" => {
                    if let Err(e) = service.handle_event(UiEvent::RequestAuthUrl) {
                        error!("{:#}", e);
                    }
                }
                "stop" => {
                    if let Err(e) = service.stop() {
                        error!("{:#}", e);
                    }
                }
                "start" => {
                    if let Err(e) = service.start() {
                        error!("{:#}", e);
                    }
                }
                url if url.starts_with("http") => forward_redirect(&mut service, url.to_string()),
                other => {
                    eprintln!(
                        "Unknown command {:?}. Commands: auth, <redirect URL>, stop, start, quit",
                        other
                    );
                }
            },
            AppEvent::InputClosed => {
                debug!("stdin closed");
                break;
            }
        }
    }

    service.shutdown()?;
    info!("gmail-notifier stopped");
    Ok(())
}

fn show_auth_window(url: &str, cli: &Cli) {
    println!("\nOpen this URL to authorize:\n{}", url);
    if !cli.no_listen {
        println!("Waiting for the redirect (or paste the redirect URL here)...");
    } else {
        println!("Then paste the URL you were redirected to here.");
    }

    if !cli.no_browser
        && let Err(e) = open::that(url)
    {
        warn!("Failed to open browser: {}. Please open the URL manually.", e);
    }
}

fn forward_redirect(service: &mut NotifierService<AppSink>, redirect_url: String) {
    if let Err(e) = service.handle_event(UiEvent::AuthCodeReceived { redirect_url }) {
        error!("{:#}", e);
    }
}

fn spawn_stdin_reader(tx: Sender<AppEvent>) -> Result<()> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(AppEvent::Input(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(AppEvent::InputClosed);
        })
        .context("Failed to spawn stdin reader")?;
    Ok(())
}

/// Returns whether a listener is now waiting
fn spawn_redirect_listener(redirect_url: &str, tx: Sender<AppEvent>) -> bool {
    let listener = match RedirectListener::bind(redirect_url) {
        Ok(listener) => listener,
        Err(e) => {
            warn!("Not listening for the OAuth redirect: {:#}", e);
            return false;
        }
    };
    if let Ok(addr) = listener.local_addr() {
        info!("Listening for the OAuth redirect on {}", addr);
    }

    let spawned = thread::Builder::new()
        .name("oauth-redirect".to_string())
        .spawn(move || match listener.accept() {
            Ok(url) => {
                let _ = tx.send(AppEvent::Redirect(url));
            }
            Err(e) => warn!("OAuth redirect listener failed: {:#}", e),
        });

    match spawned {
        Ok(_) => true,
        Err(e) => {
            warn!("Failed to spawn OAuth redirect listener: {}", e);
            false
        }
    }
}
