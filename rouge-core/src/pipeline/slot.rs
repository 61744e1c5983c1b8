//! Single-slot hand-off for detectors that report through a callback.
//!
//! The detector side offers each result; the frame loop awaits it. Since the
//! driver only asks for a new detection after the previous one has been
//! processed, the slot never holds more than one result.

use crate::landmarks::Landmark;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

pub type DetectionResult = anyhow::Result<Option<Vec<Landmark>>>;

pub fn detection_slot() -> (DetectionSender, DetectionReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (DetectionSender { tx }, DetectionReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct DetectionSender {
    tx: mpsc::Sender<DetectionResult>,
}

impl DetectionSender {
    /// Hands a result to the frame loop. Returns false if it was not taken.
    pub fn offer(&self, result: DetectionResult) -> bool {
        match self.tx.try_send(result) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Detection slot still occupied; dropping result");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Frame loop stopped; dropping result");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct DetectionReceiver {
    rx: mpsc::Receiver<DetectionResult>,
}

impl DetectionReceiver {
    /// Waits for the next result. `None` once every sender is gone or the
    /// slot was closed.
    pub async fn recv(&mut self) -> Option<DetectionResult> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::FutureExt;

    #[test]
    fn test_single_slot() {
        let (tx, mut rx) = detection_slot();
        assert!(tx.offer(Ok(None)));
        assert!(!tx.offer(Ok(None)));

        assert!(matches!(rx.recv().block_on(), Some(Ok(None))));
        assert!(tx.offer(Ok(Some(vec![Landmark::default()]))));
        let got = rx.recv().block_on();
        assert!(matches!(got, Some(Ok(Some(v))) if v.len() == 1));
    }

    #[test]
    fn test_closed() {
        let (tx, mut rx) = detection_slot();
        rx.close();
        assert!(tx.is_closed());
        assert!(!tx.offer(Ok(None)));
        assert!(rx.recv().block_on().is_none());

        let (tx, mut rx) = detection_slot();
        drop(tx);
        assert!(rx.recv().block_on().is_none());
    }
}
