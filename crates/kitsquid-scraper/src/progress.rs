// Copyright 2026 Kitsquid Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for pipeline telemetry.
//!
//! The orchestrator and the bounded executor emit `ProgressEvent`s while a
//! run is in flight. They flow through a `tokio::sync::broadcast` channel to
//! any subscriber (CLI spinner, JSON log). When nobody listens, events are
//! silently dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A progress event emitted during a scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number within the run.
    pub seq: u64,
    pub event: ProgressEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// A phase has started with this many jobs queued.
    PhaseStarted { phase: Phase, jobs: usize },
    /// One job of a phase finished, successfully or not.
    JobFinished { phase: Phase, label: String, ok: bool },
    /// A job never ran because no concurrency slot could be acquired.
    JobSkipped { phase: Phase, label: String },
    PhaseCompleted {
        phase: Phase,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        elapsed_ms: u64,
    },
    /// A non-fatal warning.
    Warning { message: String },
}

/// Pipeline phase identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Faculties,
    Categories,
    Listings,
    Details,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Faculties => write!(f, "Faculties"),
            Self::Categories => write!(f, "Categories"),
            Self::Listings => write!(f, "Event listings"),
            Self::Details => write!(f, "Event details"),
        }
    }
}

pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel.
///
/// A full catalog run emits a few thousand job events; slow receivers
/// lag and skip rather than block the pipeline.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(1024)
}

/// Cloneable emitter shared by the orchestrator and concurrent jobs.
#[derive(Clone)]
pub struct ProgressReporter {
    run_id: Arc<str>,
    seq: Arc<AtomicU64>,
    tx: Option<ProgressSender>,
}

impl ProgressReporter {
    /// A reporter for a fresh run; `None` makes every emit a no-op.
    pub fn new(tx: Option<ProgressSender>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string().into(),
            seq: Arc::new(AtomicU64::new(0)),
            tx,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(ProgressEvent {
                run_id: self.run_id.to_string(),
                seq,
                event,
            });
        }
    }
}
