//! Core shortcut types.
//!
//! This module provides:
//! - `Shortcut` - A launchable home-screen entry with icon and usage counter
//! - `ShortcutKind` - file / link / contact / message / slideshow / text
//! - `ShortcutIcon` - emoji, literal text, or a base64 raster thumbnail
//! - `ShortcutDraft` / `ShortcutPatch` - create and edit payloads that cannot
//!   touch identity, kind, creation time or the usage counter

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::SyncError;

/// Errors that can occur when parsing a shortcut kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutKindParseError {
    #[error("unknown shortcut kind '{0}'")]
    Unknown(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcutKind {
    File,
    Link,
    Contact,
    Message,
    Slideshow,
    Text,
}

impl ShortcutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortcutKind::File => "file",
            ShortcutKind::Link => "link",
            ShortcutKind::Contact => "contact",
            ShortcutKind::Message => "message",
            ShortcutKind::Slideshow => "slideshow",
            ShortcutKind::Text => "text",
        }
    }
}

impl fmt::Display for ShortcutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShortcutKind {
    type Err = ShortcutKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(ShortcutKind::File),
            "link" | "url" => Ok(ShortcutKind::Link),
            "contact" => Ok(ShortcutKind::Contact),
            "message" => Ok(ShortcutKind::Message),
            "slideshow" => Ok(ShortcutKind::Slideshow),
            "text" => Ok(ShortcutKind::Text),
            other => Err(ShortcutKindParseError::Unknown(other.to_string())),
        }
    }
}

/// Icon shown on the home screen, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShortcutIcon {
    Emoji { value: String },
    Text { value: String },
    /// Base64-encoded raster image
    Thumbnail { data: String },
}

impl ShortcutIcon {
    pub fn thumbnail_from_bytes(bytes: &[u8]) -> Self {
        ShortcutIcon::Thumbnail {
            data: BASE64.encode(bytes),
        }
    }

    /// Decoded raster bytes, if this is a valid thumbnail
    pub fn thumbnail_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ShortcutIcon::Thumbnail { data } => BASE64.decode(data).ok(),
            _ => None,
        }
    }
}

impl Default for ShortcutIcon {
    fn default() -> Self {
        ShortcutIcon::Emoji {
            value: "⭐".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagingApp {
    Sms,
    Whatsapp,
    Telegram,
    Signal,
    Slack,
}

/// Optional kind-specific fields. Flattened into the persisted shortcut.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_app: Option<MessagingApp>,
    /// Quick-reply templates for message shortcuts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_messages: Vec<String>,
    /// Images of a slideshow, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_advance_interval_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_checklist: Option<bool>,
    /// Resume playback / reading position when reopened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A launchable shortcut.
///
/// `id` and `kind` never change after creation and `usage_count` only grows.
/// Mutate through [`ShortcutPatch`] and [`Shortcut::record_usage`] only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortcut {
    pub id: String,
    pub name: String,
    pub kind: ShortcutKind,
    /// URI or inline payload, depending on kind
    #[serde(default)]
    pub content_uri: String,
    #[serde(default)]
    pub icon: ShortcutIcon,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(flatten)]
    pub details: ShortcutDetails,
}

impl Shortcut {
    /// Add `taps` to the usage counter. Never decreases.
    pub fn record_usage(&mut self, taps: u64) {
        self.usage_count = self.usage_count.saturating_add(taps);
    }
}

/// Payload of a create request. ID and timestamp are assigned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDraft {
    pub name: String,
    pub kind: ShortcutKind,
    #[serde(default)]
    pub content_uri: String,
    #[serde(default)]
    pub icon: ShortcutIcon,
    #[serde(flatten)]
    pub details: ShortcutDetails,
}

impl ShortcutDraft {
    pub fn new(name: impl Into<String>, kind: ShortcutKind, content_uri: impl Into<String>) -> Self {
        ShortcutDraft {
            name: name.into(),
            kind,
            content_uri: content_uri.into(),
            icon: ShortcutIcon::default(),
            details: ShortcutDetails::default(),
        }
    }

    /// Check the fields each kind needs to be launchable.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.name.trim().is_empty() {
            return Err(SyncError::InvalidInput("Shortcut name is empty".to_string()));
        }
        let missing = |what: &str| -> Result<(), SyncError> {
            Err(SyncError::InvalidInput(format!(
                "A {} shortcut needs {}",
                self.kind, what
            )))
        };
        match self.kind {
            ShortcutKind::File | ShortcutKind::Link if self.content_uri.trim().is_empty() => {
                missing("a target")
            }
            ShortcutKind::Contact | ShortcutKind::Message
                if self.details.phone_number.as_deref().map_or(true, str::is_empty) =>
            {
                missing("a phone number")
            }
            ShortcutKind::Slideshow if self.details.image_uris.is_empty() => {
                missing("at least one image")
            }
            ShortcutKind::Text if self.details.text_body.is_none() => missing("a text body"),
            _ => Ok(()),
        }
    }

    pub fn into_shortcut(self, id: String, created_at: i64) -> Shortcut {
        Shortcut {
            id,
            name: self.name.trim().to_string(),
            kind: self.kind,
            content_uri: self.content_uri,
            icon: self.icon,
            created_at,
            usage_count: 0,
            details: self.details,
        }
    }
}

/// Edit payload. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<ShortcutIcon>,
    /// Replaces all kind-specific fields at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ShortcutDetails>,
}

impl ShortcutPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        ShortcutPatch {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content_uri.is_none() && self.icon.is_none() && self.details.is_none()
    }

    /// Whether applying this patch changes what the home-screen icon shows
    pub fn touches_pinned_fields(&self) -> bool {
        self.name.is_some() || self.content_uri.is_some() || self.icon.is_some()
    }

    pub fn apply(&self, shortcut: &mut Shortcut) {
        if let Some(name) = &self.name {
            shortcut.name = name.trim().to_string();
        }
        if let Some(content_uri) = &self.content_uri {
            shortcut.content_uri = content_uri.clone();
        }
        if let Some(icon) = &self.icon {
            shortcut.icon = icon.clone();
        }
        if let Some(details) = &self.details {
            shortcut.details = details.clone();
        }
    }
}
