#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Change events emitted when a patient record's owner or consents change.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::broadcast};
use uuid::Uuid;

/// What happened to the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordChange {
    /// Ownership moved from one user to another.
    OwnerChanged {
        /// Fully qualified previous owner.
        previous: String,
        /// Fully qualified new owner.
        current: String,
    },
    /// A consent flipped to granted.
    ConsentGranted {
        /// Consent identifier.
        consent: String,
    },
    /// A consent flipped to revoked.
    ConsentRevoked {
        /// Consent identifier.
        consent: String,
    },
}

impl RecordChange {
    /// Dotted event name used in logs.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::OwnerChanged { .. } => "patient.owner.changed",
            Self::ConsentGranted { .. } => "patient.consent.granted",
            Self::ConsentRevoked { .. } => "patient.consent.revoked",
        }
    }
}

/// Event envelope published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    /// Unique identifier.
    pub id: Uuid,
    /// Component producing the event.
    pub source: String,
    /// Patient record the change applies to.
    pub patient_id: String,
    /// User who performed the change, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// The change itself.
    pub change: RecordChange,
    /// When the change was committed.
    pub timestamp: DateTime<Utc>,
}

impl RecordEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        patient_id: impl Into<String>,
        actor: Option<String>,
        change: RecordChange,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            patient_id: patient_id.into(),
            actor,
            change,
            timestamp: Utc::now(),
        }
    }
}

/// Event publisher interface.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event to the bus.
    async fn publish(&self, event: RecordEvent) -> Result<()>;
}

/// Event subscriber interface.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Returns a receiver for events published after the call.
    async fn subscribe(&self) -> Result<broadcast::Receiver<RecordEvent>>;
}

/// In-memory broadcast bus that also keeps a bounded backlog for inspection.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<RecordEvent>,
    backlog: Arc<Mutex<VecDeque<RecordEvent>>>,
    capacity: usize,
}

impl MemoryEventBus {
    /// Creates a new bus retaining at most `capacity` events (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Snapshot of recent events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecordEvent> {
        self.backlog.lock().iter().cloned().collect()
    }

    /// Recent events concerning a single patient record.
    #[must_use]
    pub fn for_patient(&self, patient_id: &str) -> Vec<RecordEvent> {
        self.backlog
            .lock()
            .iter()
            .filter(|event| event.patient_id == patient_id)
            .cloned()
            .collect()
    }
}

/// File-backed publisher appending one JSON line per event.
#[derive(Debug, Clone)]
pub struct FileEventPublisher {
    path: PathBuf,
}

impl FileEventPublisher {
    /// Creates a publisher that appends JSON lines to the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, event: RecordEvent) -> Result<()> {
        {
            let mut backlog = self.backlog.lock();
            if backlog.len() == self.capacity {
                backlog.pop_front();
            }
            backlog.push_back(event.clone());
        }
        // no receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for MemoryEventBus {
    async fn subscribe(&self) -> Result<broadcast::Receiver<RecordEvent>> {
        Ok(self.sender.subscribe())
    }
}

#[async_trait]
impl EventPublisher for FileEventPublisher {
    async fn publish(&self, event: RecordEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut data = serde_json::to_vec(&event)?;
        data.push(b'\n');
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }
}
