//! Spool-directory message queue.
//!
//! ```text
//! <root>/<queue>/0001-msg.json    message body
//! <root>/<queue>/0001-msg.lease  {"receipt": ..., "visible_at": ...}
//! ```
//!
//! Messages are read in file name order. A message is in flight while its
//! lease names a future `visible_at`; an expired or unreadable lease makes it
//! visible again. Deleting removes the body and the lease.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared_types::TimeSource;
use uuid::Uuid;

use crate::ports::outbound::{MessageQueue, ReceivedMessage, TransportError};

const BODY_EXTENSION: &str = "json";
const LEASE_EXTENSION: &str = "lease";

#[derive(Debug, Serialize, Deserialize)]
struct Lease {
    receipt: String,
    visible_at: DateTime<Utc>,
}

pub struct SpoolMessageQueue<T: TimeSource> {
    dir: PathBuf,
    clock: T,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TransportError + '_ {
    move |source| TransportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl<T: TimeSource> SpoolMessageQueue<T> {
    /// The queue `name` under `root`.
    pub fn new(root: impl AsRef<Path>, name: &str, clock: T) -> Self {
        Self {
            dir: root.as_ref().join(name),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_lease(&self, path: &Path) -> Option<Lease> {
        let bytes = tokio::fs::read(path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn bodies(&self) -> Result<Vec<PathBuf>, TransportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;
        let mut bodies = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&self.dir))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(BODY_EXTENSION) {
                bodies.push(path);
            }
        }
        bodies.sort();
        Ok(bodies)
    }
}

#[async_trait::async_trait]
impl<T: TimeSource> MessageQueue for SpoolMessageQueue<T> {
    async fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, TransportError> {
        let now = self.clock.now();
        let mut out = Vec::new();
        for body_path in self.bodies().await? {
            if out.len() == max_messages {
                break;
            }
            let lease_path = body_path.with_extension(LEASE_EXTENSION);
            if let Some(lease) = self.read_lease(&lease_path).await {
                if lease.visible_at > now {
                    continue;
                }
            }

            let body = match tokio::fs::read_to_string(&body_path).await {
                Ok(body) => body,
                // Deleted by another consumer since the listing.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&body_path)(e)),
            };
            let lease = Lease {
                receipt: Uuid::new_v4().to_string(),
                visible_at: now + visibility_timeout,
            };
            let encoded = serde_json::to_vec(&lease)
                .map_err(|e| TransportError::Request(e.to_string()))?;
            tokio::fs::write(&lease_path, encoded)
                .await
                .map_err(io_error(&lease_path))?;

            let name = body_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            out.push(ReceivedMessage {
                receipt: format!("{name}#{}", lease.receipt),
                body,
            });
        }
        Ok(out)
    }

    async fn delete(&self, receipt: &str) -> Result<(), TransportError> {
        let unknown = || TransportError::UnknownReceipt(receipt.to_string());
        let (name, token) = receipt.split_once('#').ok_or_else(unknown)?;
        let body_path = self.dir.join(name);
        let lease_path = body_path.with_extension(LEASE_EXTENSION);

        let lease = self.read_lease(&lease_path).await.ok_or_else(unknown)?;
        if lease.receipt != token {
            return Err(unknown());
        }
        tokio::fs::remove_file(&body_path)
            .await
            .map_err(io_error(&body_path))?;
        tokio::fs::remove_file(&lease_path)
            .await
            .map_err(io_error(&lease_path))?;
        Ok(())
    }
}
