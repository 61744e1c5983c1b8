use super::slot::DetectionReceiver;
use super::{FrameReport, Session};
use crate::landmarks::Landmark;
use futures::{Stream, StreamExt};
use std::cell::RefCell;
use std::future::Future;
use std::ops::ControlFlow;
use tracing::{Level, debug, span};

/// An asynchronous face landmark detector. Yields at most one face per
/// frame.
pub trait Detector {
    type Frame;

    fn detect(
        &mut self,
        frame: &Self::Frame,
    ) -> impl Future<Output = anyhow::Result<Option<Vec<Landmark>>>>;
}

/// Runs frames through `detector` and `session` one at a time until the
/// stream ends or `on_frame` breaks. A failed detection is recorded and the
/// loop moves on to the next frame.
pub async fn run<D, S, F>(
    session: &mut Session,
    mut frames: S,
    detector: &mut D,
    mut on_frame: F,
) -> u64
where
    D: Detector,
    S: Stream<Item = D::Frame> + Unpin,
    F: FnMut(&Session, &FrameReport) -> ControlFlow<()>,
{
    let mut processed = 0;
    while let Some(frame) = frames.next().await {
        let report = match detector.detect(&frame).await {
            Ok(landmarks) => session.process(landmarks.as_deref()),
            Err(e) => session.record_detector_error(&e),
        };
        processed += 1;

        if on_frame(session, &report).is_break() {
            debug!("Frame loop stopped after {processed} frames");
            break;
        }
    }

    processed
}

/// Like [`run`], for detectors that deliver through a
/// [`DetectionSender`](super::slot::DetectionSender). The session is only
/// mutably borrowed while a result is being processed; `on_frame` gets a
/// shared borrow, so user input can reach it between frames.
pub async fn run_slot<F>(
    session: &RefCell<Session>,
    receiver: &mut DetectionReceiver,
    mut on_frame: F,
) -> u64
where
    F: FnMut(&Session, &FrameReport) -> ControlFlow<()>,
{
    let mut processed = 0;
    while let Some(result) = receiver.recv().await {
        let span = span!(Level::DEBUG, "frame");
        let _guard = span.enter();

        let report = {
            let mut session = session.borrow_mut();
            match result {
                Ok(landmarks) => session.process(landmarks.as_deref()),
                Err(e) => session.record_detector_error(&e),
            }
        };
        processed += 1;

        if on_frame(&session.borrow(), &report).is_break() {
            debug!("Frame loop stopped after {processed} frames");
            break;
        }
    }

    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::DetectionStatus;
    use crate::pipeline::slot::detection_slot;
    use anyhow::Error;
    use pollster::FutureExt;

    struct Scripted;

    impl Detector for Scripted {
        type Frame = u32;

        async fn detect(&mut self, frame: &u32) -> anyhow::Result<Option<Vec<Landmark>>> {
            match frame {
                0 => Err(Error::msg("detector not ready")),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_errors_do_not_stop_the_loop() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        let frames = futures::stream::iter([0u32, 1, 0, 1, 1]);
        let mut statuses = Vec::new();

        let processed = run(&mut session, frames, &mut Scripted, |_, report| {
            statuses.push(report.status);
            ControlFlow::Continue(())
        })
        .block_on();

        assert_eq!(processed, 5);
        assert_eq!(statuses[0], DetectionStatus::DetectorError);
        assert_eq!(statuses[4], DetectionStatus::NoFace);
        assert_eq!(session.stats().detector_errors, 2);
    }

    #[test]
    fn test_break_stops_requesting_frames() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        let frames = futures::stream::iter(1u32..100);
        let processed = run(&mut session, frames, &mut Scripted, |s, _| {
            if s.stats().frames == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .block_on();
        assert_eq!(processed, 3);
    }

    #[test]
    fn test_slot_driver() {
        let session = RefCell::new(Session::new(PipelineConfig::default()).unwrap());
        let (tx, mut rx) = detection_slot();

        assert!(tx.offer(Err(Error::msg("boom"))));
        let mut statuses = Vec::new();
        run_slot(&session, &mut rx, |_, report| {
            statuses.push(report.status);
            ControlFlow::Break(())
        })
        .block_on();

        assert!(tx.offer(Ok(None)));
        drop(tx);
        run_slot(&session, &mut rx, |_, report| {
            statuses.push(report.status);
            ControlFlow::Continue(())
        })
        .block_on();

        assert_eq!(
            statuses,
            [DetectionStatus::DetectorError, DetectionStatus::NoFace]
        );
        assert_eq!(session.borrow().stats().frames, 2);
    }
}
