use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::runtime::Runtime;

use crate::ai::{AiOutcome, AiRequest, TextGenerator};

/// Runs AI requests off the UI thread and hands finished outcomes back
/// through a channel drained on each tick.
pub struct AiDispatcher {
    runtime: Runtime,
    generator: Arc<dyn TextGenerator>,
    tx: Sender<AiOutcome>,
    rx: Receiver<AiOutcome>,
}

impl AiDispatcher {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("zennote-ai")
            .enable_all()
            .build()
            .context("starting AI runtime")?;
        let (tx, rx) = unbounded();
        Ok(Self {
            runtime,
            generator,
            tx,
            rx,
        })
    }

    pub fn dispatch(&self, request: AiRequest) {
        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        tracing::debug!(id = %request.note_id, action = %request.action, "dispatching ai request");
        self.runtime.spawn(async move {
            let outcome = request.execute(generator.as_ref()).await;
            if tx.send(outcome).is_err() {
                tracing::debug!("ai outcome dropped, receiver gone");
            }
        });
    }

    pub fn try_recv(&self) -> Option<AiOutcome> {
        self.rx.try_recv().ok()
    }
}
