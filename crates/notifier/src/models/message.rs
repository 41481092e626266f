//! Message identifiers and the per-message display summary

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject shown for a slot whose metadata could not be retrieved
pub const ERROR_SUBJECT: &str = "Error Retrieving Message.";

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Parse an address from a `From` header like `"John Doe" <john@example.com>`
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }
}

/// Raw metadata headers of one message, as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<String>,
}

/// What a slot shows for one message
///
/// Every field is optional; the presentation layer substitutes its own
/// defaults for missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDisplayData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
    /// Received day, formatted `M/D`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Received time, formatted `h:mma`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl MessageDisplayData {
    /// Placeholder for a slot whose metadata fetch failed
    pub fn error_placeholder() -> Self {
        Self {
            subject: Some(ERROR_SUBJECT.to_string()),
            ..Default::default()
        }
    }

    /// Build display data from message headers, rendering the date in `tz`
    pub fn from_headers<Tz>(headers: &MessageHeaders, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut data = Self {
            subject: headers.subject.clone().filter(|s| !s.is_empty()),
            ..Default::default()
        };

        if let Some(from) = headers.from.as_deref().filter(|s| !s.trim().is_empty()) {
            let sender = EmailAddress::parse(from);
            data.sender_name = sender.name;
            data.sender_address = Some(sender.email).filter(|e| !e.is_empty());
        }

        if let Some(received) = headers.date.as_deref().and_then(parse_date) {
            let local = received.with_timezone(tz);
            data.date = Some(local.format("%-m/%-d").to_string());
            data.time = Some(local.format("%-I:%M%P").to_string());
        }

        data
    }
}

/// Parse an RFC 2822 `Date` header, ignoring a trailing `(zone)` comment
fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = match raw.find('(') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    DateTime::parse_from_rfc2822(trimmed.trim()).ok()
}
