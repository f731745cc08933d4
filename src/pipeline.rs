//! Rule processing pipeline stage
//!
//! A [`RuleProcessor`] consumes [`TargetMetrics`] from an input queue, runs
//! every transform stage on each unit and publishes the result on a bounded
//! output queue. A full output queue blocks the worker until the consumer
//! catches up.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::transformer::{ProcessingRule, TargetMetrics, TransformEngine};

/// Pipeline stage applying processing rules to scrape units
#[derive(Debug, Clone)]
pub struct RuleProcessor {
    engine: Arc<TransformEngine>,
    queue_length: usize,
}

impl RuleProcessor {
    /// Create a processor from rule bundles
    ///
    /// The bundles are flattened once here. `queue_length` is the capacity
    /// of the output queue and is raised to 1 when zero.
    pub fn new(processing_rules: &[ProcessingRule], queue_length: usize) -> Self {
        Self::with_engine(
            TransformEngine::from_processing_rules(processing_rules),
            queue_length,
        )
    }

    /// Create a processor around an existing engine
    pub fn with_engine(engine: TransformEngine, queue_length: usize) -> Self {
        Self {
            engine: Arc::new(engine),
            queue_length: queue_length.max(1),
        }
    }

    /// Capacity of the output queue
    pub fn queue_length(&self) -> usize {
        self.queue_length
    }

    /// Engine applied to every unit
    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    /// Start the worker on `input`
    ///
    /// Returns the output queue and the worker handle, which resolves to
    /// the number of units published. The output queue closes once `input`
    /// is closed and drained, or when the consumer drops the output
    /// receiver.
    pub fn spawn(
        &self,
        input: mpsc::Receiver<TargetMetrics>,
    ) -> (mpsc::Receiver<TargetMetrics>, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(self.queue_length);
        let engine = Arc::clone(&self.engine);

        info!(
            queue_length = self.queue_length,
            rules = engine.rules().len(),
            "Starting rule processor"
        );
        let handle = tokio::spawn(run(engine, input, tx));

        (rx, handle)
    }
}

/// Worker loop; owns the output sender so it is dropped on every exit path
async fn run(
    engine: Arc<TransformEngine>,
    mut input: mpsc::Receiver<TargetMetrics>,
    output: mpsc::Sender<TargetMetrics>,
) -> usize {
    let mut published = 0;

    while let Some(mut unit) = input.recv().await {
        engine.process(&mut unit);

        if output.send(unit).await.is_err() {
            debug!("Output queue receiver dropped, stopping rule processor");
            break;
        }
        published += 1;
    }

    info!(published, "Rule processor stopped");
    published
}
