//! Composition root wiring a [`JobClient`] to a [`SquadStore`].

use crate::{CloseHandle, JobClient, Result, Subscription};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use warband::{
    BuildCatalog, ConstraintValidator, GroupId, JobId, JobOptions, MoveOutcome, OptimizationJob,
    PlayerId, SquadSnapshot, SquadStore, StoreError, Warning, validate_squad_size,
};

/// The job currently streaming into the store.
struct ActiveJob {
    handle: CloseHandle,
    task: JoinHandle<()>,
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.handle.close();
    }
}

/// Owns a squad store and at most one live job stream feeding it.
///
/// Local edits go straight to the store. [`start`](Self::start) submits the
/// current squad and spawns a task that applies each received frame under
/// the store lock. Starting a job or resizing the squad closes the previous
/// stream first, so frames of a retired job never reach the store.
pub struct SquadSession {
    client: JobClient,
    store: Arc<Mutex<SquadStore>>,
    active: Option<ActiveJob>,
    job_tx: watch::Sender<OptimizationJob>,
}

impl SquadSession {
    pub fn new(client: JobClient, store: SquadStore) -> Self {
        let (job_tx, _) = watch::channel(store.job().clone());
        Self {
            client,
            store: Arc::new(Mutex::new(store)),
            active: None,
            job_tx,
        }
    }

    /// Shared handle to the store, for callers that need several reads under
    /// one lock.
    #[must_use]
    pub fn store(&self) -> &Arc<Mutex<SquadStore>> {
        &self.store
    }

    #[must_use]
    pub fn snapshot(&self) -> SquadSnapshot {
        self.store.lock().snapshot()
    }

    #[must_use]
    pub fn job(&self) -> OptimizationJob {
        self.store.lock().job().clone()
    }

    /// Receives the job state after every change the session makes to it.
    ///
    /// Updates are sent under the store lock, so a borrow of the receiver
    /// must not be held while calling back into the session.
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<OptimizationJob> {
        self.job_tx.subscribe()
    }

    #[must_use]
    pub fn warnings(&self, validator: &ConstraintValidator) -> Vec<Warning> {
        validator.validate(&self.snapshot())
    }

    /// Resizes the squad. An accepted resize stops the running job stream.
    ///
    /// # Errors
    ///
    /// [`StoreError`] if `size` is out of range or `builds` is empty; the
    /// running job, if any, is left alone.
    pub fn initialize_squad(
        &mut self,
        size: usize,
        builds: Arc<BuildCatalog>,
    ) -> Result<(), StoreError> {
        validate_squad_size(size)?;
        if builds.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }

        self.stop();
        let mut store = self.store.lock();
        store.initialize_squad(size, builds)?;
        self.job_tx.send_replace(store.job().clone());
        Ok(())
    }

    pub fn move_player(&self, player_id: PlayerId, target: GroupId) -> MoveOutcome {
        self.store.lock().move_player(player_id, target)
    }

    pub fn recalculate_coverage(&self) {
        self.store.lock().recalculate_coverage();
    }

    /// Submits the current squad and starts streaming the job's frames into
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns the [`SubmissionError`](crate::SubmissionError); the job is
    /// then marked `error` and no stream is opened.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(mode = %options.mode)))]
    pub async fn start(&mut self, options: &JobOptions) -> Result<JobId> {
        self.stop();
        let request = self.store.lock().optimize_request(options);

        let job_id = match self.client.submit(&request).await {
            Ok(job_id) => job_id,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Submission failed: {e}");
                self.publish(SquadStore::fail_submission);
                return Err(e);
            }
        };

        let queued = job_id.clone();
        self.publish(move |store| store.begin_job(queued));

        let subscription = self.client.open_stream(job_id.clone());
        self.active = Some(self.forward(subscription));
        Ok(job_id)
    }

    /// Closes the running job stream, if any. Idempotent.
    ///
    /// The job keeps whatever status it last reached.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            // closing under the lock guarantees no frame is mid-apply
            let _store = self.store.lock();
            active.handle.close();
        }
    }

    /// `true` while a job stream is still feeding the store.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_closed() && !active.task.is_finished())
    }

    /// Mutates the store and publishes the resulting job state. The send
    /// happens under the store lock so watchers see job states in store
    /// order.
    fn publish(&self, mutate: impl FnOnce(&mut SquadStore)) {
        let mut store = self.store.lock();
        mutate(&mut *store);
        self.job_tx.send_replace(store.job().clone());
    }

    fn forward(&self, mut subscription: Subscription) -> ActiveJob {
        let handle = subscription.close_handle();
        let store = Arc::clone(&self.store);
        let job_tx = self.job_tx.clone();

        let task = tokio::spawn(async move {
            while let Some(frame) = subscription.next().await {
                let mut store = store.lock();
                if subscription.is_closed() {
                    break;
                }
                let _outcome = store.apply_frame(&frame);
                #[cfg(feature = "tracing")]
                tracing::trace!(?_outcome, status = %frame.status, "Frame applied");
                job_tx.send_replace(store.job().clone());
            }
        });

        ActiveJob { handle, task }
    }
}

impl Drop for SquadSession {
    fn drop(&mut self) {
        self.stop();
    }
}
