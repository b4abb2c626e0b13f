use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_event_bus::{EventPublisher, RecordChange, RecordEvent};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use tokio::{
    runtime::{Builder, Handle, Runtime},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};

/// Builder configuring telemetry for owner and consent operations.
pub struct PatientAccessTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl PatientAccessTelemetryBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            event_publisher: None,
        }
    }

    /// Sets the JSON log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops log records below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Assigns the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<PatientAccessTelemetry> {
        let logger = self
            .log_path
            .map(|path| JsonLogger::with_min_level(path, self.min_level))
            .transpose()?
            .map(Arc::new);
        let failures = FailureLog {
            module: self.module.clone(),
            logger: logger.clone(),
        };
        Ok(PatientAccessTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
                event: self
                    .event_publisher
                    .map(|publisher| EventHandle::new(publisher, failures)),
            }),
        })
    }
}

/// Telemetry handle shared by the access services.
#[derive(Clone)]
pub struct PatientAccessTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for PatientAccessTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatientAccessTelemetry")
            .field("module", &self.inner.module)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<Arc<JsonLogger>>,
    event: Option<EventHandle>,
}

/// Writes publish failures to the JSON log at warn.
#[derive(Clone)]
struct FailureLog {
    module: String,
    logger: Option<Arc<JsonLogger>>,
}

impl FailureLog {
    fn report(&self, event: &EventSummary, err: &anyhow::Error) {
        let Some(logger) = &self.logger else {
            return;
        };
        let mut record = LogRecord::new(&self.module, LogLevel::Warn, "record.event.publish_failed")
            .with_fields(&json!({
                "patient": event.patient_id,
                "event_id": event.id,
                "event_type": event.event_type,
                "error": format!("{err:#}"),
            }));
        if let Some(actor) = &event.actor {
            record = record.with_actor(actor);
        }
        let _ = logger.log(&record);
    }
}

/// What a failure report needs once the event itself has been handed to the publisher.
struct EventSummary {
    id: String,
    patient_id: String,
    actor: Option<String>,
    event_type: &'static str,
}

impl From<&RecordEvent> for EventSummary {
    fn from(event: &RecordEvent) -> Self {
        Self {
            id: event.id.to_string(),
            patient_id: event.patient_id.clone(),
            actor: event.actor.clone(),
            event_type: event.change.event_type(),
        }
    }
}

/// Publishes events in commit order.
///
/// Inside a tokio runtime events go through one queue drained by a single task.
/// Outside one they are published inline on a runtime built on first use.
struct EventHandle {
    publisher: Arc<dyn EventPublisher>,
    failures: FailureLog,
    queue: Mutex<Option<UnboundedSender<RecordEvent>>>,
    runtime: OnceCell<Runtime>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>, failures: FailureLog) -> Self {
        Self {
            publisher,
            failures,
            queue: Mutex::new(None),
            runtime: OnceCell::new(),
        }
    }

    fn publish(&self, event: RecordEvent) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            return self.enqueue(&handle, event);
        }
        let summary = EventSummary::from(&event);
        let outcome = self
            .runtime
            .get_or_try_init(|| Builder::new_current_thread().enable_all().build())
            .map_err(anyhow::Error::from)
            .and_then(|runtime| runtime.block_on(self.publisher.publish(event)));
        if let Err(err) = &outcome {
            self.failures.report(&summary, err);
        }
        outcome
    }

    fn enqueue(&self, handle: &Handle, event: RecordEvent) -> Result<()> {
        let mut queue = self.queue.lock();
        let event = match queue.as_ref() {
            Some(sender) => match sender.send(event) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };
        // First event, or the previous drain task went away with its runtime.
        let (sender, receiver) = mpsc::unbounded_channel();
        handle.spawn(drain(receiver, Arc::clone(&self.publisher), self.failures.clone()));
        let result = sender.send(event).map_err(|mpsc::error::SendError(event)| {
            let err = anyhow!("event queue closed");
            self.failures.report(&EventSummary::from(&event), &err);
            err
        });
        *queue = Some(sender);
        result
    }
}

async fn drain(
    mut receiver: UnboundedReceiver<RecordEvent>,
    publisher: Arc<dyn EventPublisher>,
    failures: FailureLog,
) {
    while let Some(event) = receiver.recv().await {
        let summary = EventSummary::from(&event);
        if let Err(err) = publisher.publish(event).await {
            failures.report(&summary, &err);
        }
    }
}

impl PatientAccessTelemetry {
    /// Returns a builder for this telemetry helper.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> PatientAccessTelemetryBuilder {
        PatientAccessTelemetryBuilder::new(module)
    }

    /// Logs a structured record attributed to `actor`.
    pub fn log(
        &self,
        level: LogLevel,
        message: &str,
        actor: Option<&str>,
        metadata: &Value,
    ) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let mut record = LogRecord::new(&self.inner.module, level, message).with_fields(metadata);
            if let Some(actor) = actor {
                record = record.with_actor(actor);
            }
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Publishes a committed change.
    ///
    /// A failed publish is written to the log at warn. Inside a tokio runtime the event
    /// is queued behind earlier ones and this returns immediately; outside one the
    /// publish completes before returning and its failure is also returned.
    pub fn event(&self, patient_id: &str, actor: Option<String>, change: RecordChange) -> Result<()> {
        let Some(handle) = &self.inner.event else {
            return Ok(());
        };
        handle.publish(RecordEvent::new(&self.inner.module, patient_id, actor, change))
    }
}
