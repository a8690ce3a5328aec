use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::chat::ChatMessage;

/// One row of a chat session's `events.jsonl`.
///
/// The variant name becomes the `type` field; a message row carries the
/// message's own fields next to it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent<'a> {
    SessionStarted { provider: &'a str, model: &'a str },
    MessageAppended(&'a ChatMessage),
    GenerationFailed { error: &'a str },
}

/// Appends [`SessionEvent`] rows, stamped with the session id and a UTC
/// timestamp, to a JSONL file.
#[derive(Debug)]
pub struct EventWriter {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
            lock: Mutex::new(()),
        }
    }

    /// Writes one line and returns the row as written.
    pub fn record(&self, event: &SessionEvent<'_>) -> Result<Value> {
        let mut row = match serde_json::to_value(event)? {
            Value::Object(row) => row,
            other => bail!("session event did not serialize to an object: {other}"),
        };
        row.insert("session_id".to_string(), Value::String(self.session_id.clone()));
        row.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        let line = serde_json::to_string(&row)?;

        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open event log {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;

        Ok(Value::Object(row))
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::chat::Role;
    use crate::settings::GenerationSettings;

    fn read_rows(path: &std::path::Path) -> anyhow::Result<Vec<Value>> {
        fs::read_to_string(path)?
            .lines()
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }

    #[test]
    fn rows_are_tagged_and_stamped() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("out").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-7");

        let written = writer.record(&SessionEvent::SessionStarted {
            provider: "gemini",
            model: "gemini-3-pro-image-preview",
        })?;
        writer.record(&SessionEvent::GenerationFailed { error: "Gemini request failed (503)" })?;

        let rows = read_rows(&path)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], written);
        assert_eq!(rows[0]["type"], "session_started");
        assert_eq!(rows[0]["provider"], "gemini");
        assert_eq!(rows[0]["model"], "gemini-3-pro-image-preview");
        assert_eq!(rows[1]["type"], "generation_failed");
        assert_eq!(rows[1]["error"], "Gemini request failed (503)");
        for row in &rows {
            assert_eq!(row["session_id"], "session-7");
            DateTime::parse_from_rfc3339(row["ts"].as_str().unwrap_or_default())?;
        }
        Ok(())
    }

    #[test]
    fn message_rows_carry_message_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-7");

        let message = ChatMessage::user("a lighthouse", GenerationSettings::default(), None);
        writer.record(&SessionEvent::MessageAppended(&message))?;

        let rows = read_rows(&path)?;
        assert_eq!(rows[0]["type"], "message_appended");
        assert_eq!(rows[0]["id"], Value::String(message.id.clone()));
        assert_eq!(rows[0]["role"], serde_json::to_value(Role::User)?);
        assert_eq!(rows[0]["content"], "a lighthouse");
        assert_eq!(rows[0]["settings"]["resolution"], "4K");
        assert!(rows[0].get("attachment").is_none());
        Ok(())
    }

    #[test]
    fn unwritable_log_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path(), "session-7");
        let err = writer
            .record(&SessionEvent::GenerationFailed { error: "boom" })
            .err()
            .map(|err| format!("{err:#}"))
            .unwrap_or_default();
        assert!(err.contains("failed to open event log"));
        Ok(())
    }
}
