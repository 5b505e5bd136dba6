//! Per-NPC training coordination in front of an [`IntentClassifier`].
//!
//! Each NPC gets its own slot: an async mutex guarding a [`TrainingState`].
//! Training holds the slot for its whole duration, so two training requests
//! for the same NPC queue instead of racing on the model, while NPCs never
//! contend with each other. Inference briefly takes the same slot, which
//! makes it wait for an in-flight training to settle.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use super::engine::{ClassifierError, IntentClassifier, TrainingIntent};
use crate::types::{DbId, Timestamp};

/// Lifecycle of one NPC's model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingState {
    /// Never trained (or forgotten).
    Idle,
    /// A training run currently holds the slot.
    Training,
    /// The engine holds a model built from `intent_count` intents.
    Trained {
        intent_count: usize,
        trained_at: Timestamp,
    },
}

type Slot = Arc<AsyncMutex<TrainingState>>;

/// Trigger policy and exclusion for classifier training.
pub struct ClassifierGateway {
    engine: Arc<dyn IntentClassifier>,
    /// One slot per NPC that has asked for training. Callers resolve the
    /// NPC before training, so this is bounded by the number of NPCs;
    /// entries leave only through [`ClassifierGateway::forget`].
    slots: Mutex<HashMap<DbId, Slot>>,
}

impl ClassifierGateway {
    pub fn new(engine: Arc<dyn IntentClassifier>) -> Self {
        Self {
            engine,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Train the NPC's model when `training_required` is set.
    ///
    /// `snapshot` loads the training material. It runs only after the NPC's
    /// slot is held, so a queued retrain always sees the catalog as of its
    /// own turn. When `training_required` is false this is a no-op and the
    /// existing model state (possibly none) is used as-is.
    ///
    /// A failed or cancelled run restores the state that preceded it.
    pub async fn ensure_trained<F, Fut, E>(
        &self,
        npc_id: DbId,
        training_required: bool,
        snapshot: F,
    ) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<TrainingIntent>, E>>,
        E: From<ClassifierError>,
    {
        if !training_required {
            tracing::debug!(npc_id, "Training not requested, using current model state");
            return Ok(());
        }

        let slot = self.slot(npc_id);
        let attempt = TrainingAttempt::begin(slot.lock().await);

        let intents = snapshot().await?;
        let started = Instant::now();
        tracing::info!(npc_id, intents = intents.len(), "Training classifier");

        if let Err(e) = self.engine.train(npc_id, &intents).await {
            tracing::warn!(npc_id, error = %e, "Classifier training failed");
            return Err(e.into());
        }

        attempt.complete(TrainingState::Trained {
            intent_count: intents.len(),
            trained_at: chrono::Utc::now(),
        });
        tracing::info!(
            npc_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Classifier trained",
        );
        Ok(())
    }

    /// Produce a reply for `utterance`.
    ///
    /// Fails with [`ClassifierError::ModelUnavailable`] if the NPC has never
    /// been trained through this gateway.
    pub async fn infer(&self, npc_id: DbId, utterance: &str) -> Result<String, ClassifierError> {
        let slot = self.slot(npc_id);
        {
            let state = slot.lock().await;
            if !matches!(*state, TrainingState::Trained { .. }) {
                return Err(ClassifierError::ModelUnavailable { npc_id });
            }
        }
        self.engine.infer(npc_id, utterance).await
    }

    /// Current state of the NPC's model. Reports [`TrainingState::Training`]
    /// while the slot is busy.
    pub fn state(&self, npc_id: DbId) -> TrainingState {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get(&npc_id) {
                Some(slot) => Arc::clone(slot),
                None => return TrainingState::Idle,
            }
        };
        slot.try_lock()
            .map(|state| state.clone())
            .unwrap_or(TrainingState::Training)
    }

    /// Drop the NPC's slot and model. Waits for an in-flight training first.
    pub async fn forget(&self, npc_id: DbId) {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&npc_id);
        if let Some(slot) = slot {
            let _settled = slot.lock().await;
        }
        self.engine.forget(npc_id).await;
        tracing::debug!(npc_id, "Classifier state forgotten");
    }

    fn slot(&self, npc_id: DbId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(npc_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(TrainingState::Idle))),
        )
    }
}

/// Holds a slot in [`TrainingState::Training`] and puts the previous state
/// back on drop unless [`complete`](Self::complete) was called.
struct TrainingAttempt<'a> {
    state: MutexGuard<'a, TrainingState>,
    previous: Option<TrainingState>,
}

impl<'a> TrainingAttempt<'a> {
    fn begin(mut state: MutexGuard<'a, TrainingState>) -> Self {
        let previous = std::mem::replace(&mut *state, TrainingState::Training);
        Self {
            state,
            previous: Some(previous),
        }
    }

    fn complete(mut self, next: TrainingState) {
        self.previous = None;
        *self.state = next;
    }
}

impl Drop for TrainingAttempt<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.state = previous;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    /// Engine that records concurrency and can be told to fail.
    #[derive(Default)]
    struct RecordingEngine {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        trains: AtomicUsize,
        fail_training: bool,
    }

    #[async_trait::async_trait]
    impl IntentClassifier for RecordingEngine {
        async fn train(
            &self,
            npc_id: DbId,
            _intents: &[TrainingIntent],
        ) -> Result<(), ClassifierError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.trains.fetch_add(1, Ordering::SeqCst);
            if self.fail_training {
                return Err(ClassifierError::Training {
                    npc_id,
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }

        async fn infer(&self, _npc_id: DbId, utterance: &str) -> Result<String, ClassifierError> {
            Ok(format!("echo: {utterance}"))
        }

        async fn forget(&self, _npc_id: DbId) {}
    }

    fn greeting() -> Vec<TrainingIntent> {
        vec![TrainingIntent {
            tag: "greeting".to_string(),
            patterns: vec!["hi".to_string()],
            responses: vec!["Hello".to_string()],
        }]
    }

    async fn snapshot() -> Result<Vec<TrainingIntent>, ClassifierError> {
        Ok(greeting())
    }

    #[tokio::test]
    async fn infer_without_training_is_model_unavailable() {
        let gateway = ClassifierGateway::new(Arc::new(RecordingEngine::default()));

        gateway
            .ensure_trained::<_, _, ClassifierError>(1, false, snapshot)
            .await
            .unwrap();
        let result = gateway.infer(1, "hi").await;

        assert_matches!(result, Err(ClassifierError::ModelUnavailable { npc_id: 1 }));
    }

    #[tokio::test]
    async fn training_not_requested_skips_snapshot() {
        let gateway = ClassifierGateway::new(Arc::new(RecordingEngine::default()));

        let result = gateway
            .ensure_trained(1, false, || async {
                Err::<Vec<TrainingIntent>, _>(ClassifierError::Training {
                    npc_id: 1,
                    reason: "snapshot should not load".to_string(),
                })
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(gateway.state(1), TrainingState::Idle);
    }

    #[tokio::test]
    async fn trained_npc_answers() {
        let gateway = ClassifierGateway::new(Arc::new(RecordingEngine::default()));

        gateway.ensure_trained(5, true, snapshot).await.unwrap();

        assert_matches!(gateway.state(5), TrainingState::Trained { intent_count: 1, .. });
        assert_eq!(gateway.infer(5, "hi").await.unwrap(), "echo: hi");
        // Other NPCs are unaffected.
        assert_matches!(
            gateway.infer(6, "hi").await,
            Err(ClassifierError::ModelUnavailable { npc_id: 6 })
        );
    }

    #[tokio::test]
    async fn concurrent_trainings_for_one_npc_never_overlap() {
        let engine = Arc::new(RecordingEngine::default());
        let gateway = Arc::new(ClassifierGateway::new(engine.clone()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gateway = Arc::clone(&gateway);
            handles.push(tokio::spawn(async move {
                gateway.ensure_trained(9, true, snapshot).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(engine.trains.load(Ordering::SeqCst), 4);
        assert_eq!(engine.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_npcs_train_in_parallel() {
        let engine = Arc::new(RecordingEngine::default());
        let gateway = Arc::new(ClassifierGateway::new(engine.clone()));

        let a = {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.ensure_trained(1, true, snapshot).await })
        };
        let b = {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.ensure_trained(2, true, snapshot).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(engine.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_training_restores_previous_state() {
        let gateway = ClassifierGateway::new(Arc::new(RecordingEngine {
            fail_training: true,
            ..Default::default()
        }));

        let result = gateway.ensure_trained(3, true, snapshot).await;

        assert_matches!(result, Err(ClassifierError::Training { npc_id: 3, .. }));
        assert_eq!(gateway.state(3), TrainingState::Idle);
        assert_matches!(
            gateway.infer(3, "hi").await,
            Err(ClassifierError::ModelUnavailable { .. })
        );
    }

    #[tokio::test]
    async fn failed_snapshot_restores_previous_state() {
        let gateway = ClassifierGateway::new(Arc::new(RecordingEngine::default()));
        gateway.ensure_trained(4, true, snapshot).await.unwrap();

        let result = gateway
            .ensure_trained(4, true, || async {
                Err::<Vec<TrainingIntent>, _>(ClassifierError::Training {
                    npc_id: 4,
                    reason: "catalog unavailable".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_matches!(gateway.state(4), TrainingState::Trained { .. });
    }

    #[tokio::test]
    async fn forget_returns_npc_to_idle() {
        let gateway = ClassifierGateway::new(Arc::new(RecordingEngine::default()));
        gateway.ensure_trained(8, true, snapshot).await.unwrap();

        gateway.forget(8).await;

        assert_eq!(gateway.state(8), TrainingState::Idle);
        assert_matches!(
            gateway.infer(8, "hi").await,
            Err(ClassifierError::ModelUnavailable { .. })
        );
    }

    #[tokio::test]
    async fn state_reports_training_while_run_is_in_flight() {
        let gateway = Arc::new(ClassifierGateway::new(Arc::new(RecordingEngine::default())));
        let release = Arc::new(tokio::sync::Notify::new());

        let run = {
            let gateway = Arc::clone(&gateway);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                gateway
                    .ensure_trained(3, true, || async move {
                        release.notified().await;
                        snapshot().await
                    })
                    .await
            })
        };

        while gateway.state(3) != TrainingState::Training {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        release.notify_one();
        run.await.unwrap().unwrap();

        assert_matches!(gateway.state(3), TrainingState::Trained { intent_count: 1, .. });
    }
}
