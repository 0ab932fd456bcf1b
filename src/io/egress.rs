//! Population snapshot egress
//!
//! After each full tracking cycle a snapshot of last-known locations
//! is appended to a JSONL file (one JSON object per line). This is
//! the feed the external HTTP layer reads.

use crate::domain::types::{Coordinate, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug, Serialize)]
pub struct PopulationSnapshot {
    pub taken_at: DateTime<Utc>,
    pub cycle: u64,
    pub locations: HashMap<UserId, Coordinate>,
}

/// Appends population snapshots to a JSONL file
pub struct SnapshotWriter {
    file_path: String,
}

impl SnapshotWriter {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "snapshot_egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write one snapshot. Returns true on success.
    pub fn write(&self, snapshot: &PopulationSnapshot) -> bool {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "snapshot_serialize_failed");
                return false;
            }
        };

        match self.append_line(&json) {
            Ok(()) => {
                info!(
                    cycle = %snapshot.cycle,
                    users = %snapshot.locations.len(),
                    "snapshot_egressed"
                );
                true
            }
            Err(e) => {
                error!(cycle = %snapshot.cycle, error = %e, "snapshot_egress_failed");
                false
            }
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "snapshot_written");
        Ok(())
    }
}
