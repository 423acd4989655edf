//! User-visible notifications.
//!
//! Everything the user should hear about a sync pass, a local addition, or
//! an import goes through a [`Notifier`]. Sinks:
//!
//! | Sink | Output |
//! |------|--------|
//! | [`StderrNotifier`] | one human line per notice on stderr |
//! | [`JsonNotifier`] | one JSON object per line on stderr |
//! | [`NotificationLog`] | in-memory; notices auto-dismiss after a TTL |
//! | [`NoNotifier`] | discards everything |
//!
//! Notices go to stderr so stdout stays parseable for scripts (`export`,
//! `list`).

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quote_sync_core::models::Record;
use serde::Serialize;

/// What a notice is about.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A remote record that was not present locally.
    Added,
    /// A remote record replaced a differing local copy.
    Conflict,
    /// The remote batch could not be fetched or parsed.
    FetchFailed,
    /// A locally authored record could not be sent to the remote.
    PushFailed,
    /// A locally authored record reached the remote.
    Pushed,
    /// A record was authored and persisted locally.
    LocalAdded,
    /// A bulk import was appended to the store.
    Imported,
    /// A bulk import payload was malformed and discarded.
    ImportRejected,
}

impl NoticeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NoticeKind::Added => "added",
            NoticeKind::Conflict => "conflict",
            NoticeKind::FetchFailed => "fetch_failed",
            NoticeKind::PushFailed => "push_failed",
            NoticeKind::Pushed => "pushed",
            NoticeKind::LocalAdded => "local_added",
            NoticeKind::Imported => "imported",
            NoticeKind::ImportRejected => "import_rejected",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            NoticeKind::FetchFailed | NoticeKind::PushFailed | NoticeKind::ImportRejected
        )
    }
}

/// A single human-readable message.
#[derive(Clone, Debug, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn added(record: &Record) -> Self {
        Self::new(
            NoticeKind::Added,
            format!("New quote from server: \"{}\" ({})", record.text, record.category),
        )
    }

    pub fn conflict(record: &Record) -> Self {
        Self::new(
            NoticeKind::Conflict,
            format!(
                "Conflict on {} resolved, server version kept: \"{}\"",
                record.id, record.text
            ),
        )
    }

    pub fn fetch_failed(error: &anyhow::Error) -> Self {
        Self::new(
            NoticeKind::FetchFailed,
            format!("Failed to fetch from server: {:#}", error),
        )
    }

    pub fn push_failed(record: &Record, error: &anyhow::Error) -> Self {
        Self::new(
            NoticeKind::PushFailed,
            format!("Failed to sync \"{}\" with server: {:#}", record.text, error),
        )
    }

    pub fn pushed(record: &Record) -> Self {
        Self::new(
            NoticeKind::Pushed,
            format!("Quote \"{}\" synced with server.", record.text),
        )
    }

    pub fn local_added(record: &Record) -> Self {
        Self::new(
            NoticeKind::LocalAdded,
            format!("Quote added locally: \"{}\" ({})", record.text, record.category),
        )
    }

    pub fn imported(count: usize) -> Self {
        Self::new(
            NoticeKind::Imported,
            format!("{} quote(s) imported successfully.", count),
        )
    }

    pub fn import_rejected(error: &anyhow::Error) -> Self {
        Self::new(
            NoticeKind::ImportRejected,
            format!("Invalid import file: {:#}", error),
        )
    }
}

/// Receives notices. Implementations decide where they are shown.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Human-friendly notices on stderr: `[conflict] Conflict on srv1 resolved, ...`.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let line = format!("[{}] {}\n", notice.kind.label(), notice.message);
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable notices: one JSON object per line on stderr.
pub struct JsonNotifier;

impl Notifier for JsonNotifier {
    fn notify(&self, notice: Notice) {
        let obj = serde_json::json!({
            "event": "notice",
            "kind": notice.kind,
            "message": notice.message,
            "at": notice.created_at.to_rfc3339(),
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// Discards notices.
pub struct NoNotifier;

impl Notifier for NoNotifier {
    fn notify(&self, _notice: Notice) {}
}

/// In-memory notice surface with auto-dismiss.
///
/// Notices older than the TTL are dismissed: they stop being
/// [`active`](NotificationLog::active) and are dropped from
/// [`history`](NotificationLog::history) the next time the log is written to
/// or asked for its active notices. At most [`MAX_RETAINED`] notices are kept
/// regardless of age. A log built with
/// [`forwarding`](NotificationLog::forwarding) also passes each notice on to
/// another sink.
pub struct NotificationLog {
    ttl: Duration,
    entries: Mutex<VecDeque<Notice>>,
    forward: Option<Box<dyn Notifier>>,
}

/// Upper bound on retained notices, oldest dropped first.
pub const MAX_RETAINED: usize = 256;

impl NotificationLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(VecDeque::new()),
            forward: None,
        }
    }

    pub fn forwarding(ttl: Duration, sink: Box<dyn Notifier>) -> Self {
        Self {
            forward: Some(sink),
            ..Self::new(ttl)
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Retained notices, oldest first.
    pub fn history(&self) -> Vec<Notice> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Notices that have not yet been dismissed.
    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Utc::now())
    }

    /// Notices still live at `now`. Expired ones are dropped.
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notice> {
        match self.entries.lock() {
            Ok(mut entries) => {
                self.dismiss_expired(&mut entries, now);
                entries.iter().cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    /// Retained notices of one kind, oldest first.
    pub fn of_kind(&self, kind: NoticeKind) -> Vec<Notice> {
        self.entries
            .lock()
            .map(|entries| entries.iter().filter(|n| n.kind == kind).cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn dismiss_expired(&self, entries: &mut VecDeque<Notice>, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(self.ttl)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        entries.retain(|n| now.signed_duration_since(n.created_at) < ttl);
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notice: Notice) {
        if let Some(sink) = &self.forward {
            sink.notify(notice.clone());
        }
        if let Ok(mut entries) = self.entries.lock() {
            self.dismiss_expired(&mut entries, notice.created_at);
            entries.push_back(notice);
            while entries.len() > MAX_RETAINED {
                entries.pop_front();
            }
        }
    }
}

/// Notification mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotifyMode {
    Off,
    Human,
    Json,
}

impl NotifyMode {
    /// Default: human notices when stderr is a TTY, otherwise JSON lines.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            NotifyMode::Human
        } else {
            NotifyMode::Json
        }
    }

    /// Parse `auto`, `human`, `json`, or `off`.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "auto" => Ok(Self::default_for_tty()),
            "human" => Ok(NotifyMode::Human),
            "json" => Ok(NotifyMode::Json),
            "off" => Ok(NotifyMode::Off),
            other => anyhow::bail!(
                "Unknown notify mode: '{}'. Must be auto, human, json, or off.",
                other
            ),
        }
    }

    pub fn notifier(&self) -> Box<dyn Notifier> {
        match self {
            NotifyMode::Off => Box::new(NoNotifier),
            NotifyMode::Human => Box::new(StderrNotifier),
            NotifyMode::Json => Box::new(JsonNotifier),
        }
    }
}
