//! Append-only JSONL audit trail shared by the runtime and HTTP ingress.

use std::{
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use trestle_core::{current_rfc3339, current_unix_timestamp_ms};

#[derive(Clone)]
/// Best-effort event log; one JSON object per line.
pub struct AuditLog {
    path: PathBuf,
    file: Arc<Mutex<std::fs::File>>,
}

impl AuditLog {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Appends a timestamped event. `fields` must be a JSON object; its
    /// entries are merged beside the envelope fields.
    pub fn append(&self, event: &str, fields: Value) -> Result<()> {
        let mut entry = json!({
            "ts": current_rfc3339(),
            "ts_unix_ms": current_unix_timestamp_ms(),
            "event": event,
        });
        if let (Some(envelope), Value::Object(extra)) = (entry.as_object_mut(), fields) {
            for (key, value) in extra {
                envelope.insert(key, value);
            }
        }
        let line = serde_json::to_string(&entry).context("failed to encode audit event")?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("audit log mutex is poisoned"))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }

    /// Fire-and-forget append; failures are logged, never escalated.
    pub fn record(&self, event: &str, fields: Value) {
        if let Err(error) = self.append(event, fields) {
            tracing::warn!(event, error = %format!("{error:#}"), "failed to append audit event");
        }
    }
}
