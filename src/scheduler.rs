//! Refresh triggering with single-flight execution
//!
//! At most one pipeline runs at a time. Triggers that arrive while one is
//! running collapse into a single follow-up run. Every run gets a fresh,
//! strictly increasing generation number, and all its events are tagged
//! with it so the presentation side can drop stale results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::orchestrator::{FetchOrchestrator, FetchOutcome, FetchState};

/// What asked for a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Manual,
    Periodic,
}

/// Result of a trigger request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new pipeline was started
    Started,
    /// A pipeline was already running; one follow-up run is queued
    Coalesced,
}

/// Event produced by a pipeline run
#[derive(Debug)]
pub enum PipelineEvent {
    Status {
        generation: u64,
        state: FetchState,
    },
    Completed {
        generation: u64,
        outcome: FetchOutcome,
    },
}

impl PipelineEvent {
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            PipelineEvent::Status { generation, .. }
            | PipelineEvent::Completed { generation, .. } => *generation,
        }
    }
}

/// Shared, monotonically increasing generation counter
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    /// Claim the next generation (first is 1)
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently started generation, 0 if none
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Flight {
    running: bool,
    pending: bool,
}

fn lock(flight: &Mutex<Flight>) -> MutexGuard<'_, Flight> {
    flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Starts pipelines on demand, never more than one at a time
pub struct RefreshScheduler {
    orchestrator: Arc<FetchOrchestrator>,
    generations: GenerationCounter,
    flight: Arc<Mutex<Flight>>,
    events: mpsc::UnboundedSender<PipelineEvent>,
}

impl RefreshScheduler {
    /// Create a scheduler and the receiving end of its event stream
    pub fn new(
        orchestrator: Arc<FetchOrchestrator>,
    ) -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            orchestrator,
            generations: GenerationCounter::default(),
            flight: Arc::new(Mutex::new(Flight::default())),
            events,
        };
        (scheduler, receiver)
    }

    /// Handle on the generation counter for stale-result filtering
    #[must_use]
    pub fn generations(&self) -> GenerationCounter {
        self.generations.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.flight).running
    }

    /// Request a refresh. Must be called from within a tokio runtime.
    pub fn trigger(&self, trigger: Trigger) -> TriggerOutcome {
        {
            let mut flight = lock(&self.flight);
            if flight.running {
                flight.pending = true;
                debug!("Refresh already in flight, coalescing {:?} trigger", trigger);
                return TriggerOutcome::Coalesced;
            }
            flight.running = true;
        }

        info!("Starting refresh ({:?})", trigger);
        tokio::spawn(run_until_idle(
            self.orchestrator.clone(),
            self.generations.clone(),
            self.flight.clone(),
            self.events.clone(),
        ));
        TriggerOutcome::Started
    }
}

/// Run pipelines back to back until no trigger is pending
async fn run_until_idle(
    orchestrator: Arc<FetchOrchestrator>,
    generations: GenerationCounter,
    flight: Arc<Mutex<Flight>>,
    events: mpsc::UnboundedSender<PipelineEvent>,
) {
    loop {
        let generation = generations.next();
        let status_events = events.clone();
        let mut observer = move |state: FetchState| {
            let _ = status_events.send(PipelineEvent::Status { generation, state });
        };

        let outcome = orchestrator.run(generation, &mut observer).await;
        if events
            .send(PipelineEvent::Completed {
                generation,
                outcome,
            })
            .is_err()
        {
            debug!("Event receiver dropped, result of generation {} lost", generation);
        }

        let again = {
            let mut flight = lock(&flight);
            if flight.pending {
                flight.pending = false;
                true
            } else {
                flight.running = false;
                false
            }
        };
        if !again {
            break;
        }
        debug!("Running coalesced refresh");
    }
}

/// Fire a periodic trigger every `period`, first tick one period from now
pub fn spawn_periodic(scheduler: Arc<RefreshScheduler>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            scheduler.trigger(Trigger::Periodic);
        }
    })
}
