//! Shared prediction service with per-request deadlines

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::error::{ChurnError, Result};
use crate::inference::{ChurnPredictor, Prediction, RawRecord};
use crate::pipeline::ArtifactLayout;

/// Default deadline for one prediction
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves predictions from one predictor loaded at startup
#[derive(Debug, Clone)]
pub struct PredictionService {
    predictor: Arc<ChurnPredictor>,
    timeout: Duration,
}

impl PredictionService {
    /// Load the artifacts once. Fails if any artifact is missing or invalid.
    pub fn start(layout: &ArtifactLayout, timeout: Duration) -> Result<Self> {
        let predictor = ChurnPredictor::load(layout)?;
        info!("Prediction service ready (timeout {:?})", timeout);
        Ok(Self::with_predictor(Arc::new(predictor), timeout))
    }

    pub fn with_predictor(predictor: Arc<ChurnPredictor>, timeout: Duration) -> Self {
        Self { predictor, timeout }
    }

    pub fn predictor(&self) -> &Arc<ChurnPredictor> {
        &self.predictor
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Predict on the calling thread, without a deadline
    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        self.predictor.predict(record)
    }

    /// Predict on the rayon pool, giving up after the service timeout.
    ///
    /// Jobs share the global pool, so concurrent work is bounded by its
    /// thread count. A timed-out job still runs to completion on the pool and
    /// its result is dropped.
    pub fn predict_with_timeout(&self, record: RawRecord) -> Result<Prediction> {
        let (sender, receiver) = mpsc::channel();
        let predictor = Arc::clone(&self.predictor);

        rayon::spawn(move || {
            // The receiver is gone if the caller already timed out
            let _ = sender.send(predictor.predict(&record));
        });

        await_prediction(&receiver, self.timeout)
    }
}

fn await_prediction(receiver: &mpsc::Receiver<Result<Prediction>>, timeout: Duration) -> Result<Prediction> {
    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("Prediction exceeded {:?}", timeout);
            Err(ChurnError::Timeout(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ChurnError::Internal(
            "prediction worker exited without a result".to_string(),
        )),
    }
}
