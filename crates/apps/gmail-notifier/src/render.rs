//! Terminal rendering of the notifier rows

use notifier::{MessageDisplayData, Notification};

/// What the display currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    AuthRequired,
    Feed,
}

/// Row contents mirrored from `slot-updated` notifications
pub struct Display {
    screen: Screen,
    rows: Vec<Option<MessageDisplayData>>,
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    pub fn new() -> Self {
        Self {
            screen: Screen::Loading,
            rows: Vec::new(),
        }
    }

    /// Apply a notification; returns whether the screen should be redrawn
    pub fn apply(&mut self, notification: &Notification) -> bool {
        match notification {
            Notification::ShowLoading => self.screen = Screen::Loading,
            Notification::ShowAuthRequired => self.screen = Screen::AuthRequired,
            Notification::ShowAuthWindow { .. } => return false,
            Notification::SlotUpdated { index, data } => {
                if self.rows.len() <= *index {
                    self.rows.resize(index + 1, None);
                }
                self.rows[*index] = data.clone();
                self.screen = Screen::Feed;
            }
        }
        true
    }

    pub fn render(&self) -> String {
        match self.screen {
            Screen::Loading => "Loading...".to_string(),
            Screen::AuthRequired => {
                "Authorization Required.\nType `auth` to authorize.".to_string()
            }
            Screen::Feed => {
                let mut out = Vec::new();
                for (index, row) in self.rows.iter().enumerate() {
                    let (subject, info) = render_row(index, row.as_ref());
                    out.push(subject);
                    out.push(format!("    {}", info));
                }
                out.join("\n")
            }
        }
    }
}

/// Subject line and info line for one slot
pub fn render_row(index: usize, data: Option<&MessageDisplayData>) -> (String, String) {
    match data {
        None if index == 0 => ("No unread messages.".to_string(), String::new()),
        None => (String::new(), String::new()),
        Some(data) => (
            data.subject.clone().unwrap_or_else(|| "Some Message".to_string()),
            format!(
                "From {} ({}) at {} on {}",
                data.sender_name.as_deref().unwrap_or("someone"),
                data.sender_address.as_deref().unwrap_or("somewhere"),
                data.time.as_deref().unwrap_or("some time"),
                data.date.as_deref().unwrap_or("some day"),
            ),
        ),
    }
}
