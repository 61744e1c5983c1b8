use anyhow::{Error, Result};
use futures::Stream;
use rouge_core::landmarks::Landmark;
use rouge_core::pipeline::driver::Detector;
use serde::Deserialize;
use std::path::Path;
use tracing::{Level, span, trace};

/// One line of a recording: the detector's answer for that frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    /// Set when the detector call itself failed.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self> {
        let span = span!(Level::DEBUG, "Recording#load");
        let _guard = span.enter();
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Parses JSON Lines. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let frames = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| Error::msg(format!("recording line {}: {e}", n + 1)))
            })
            .collect::<Result<Vec<RecordedFrame>>>()?;

        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn stream(&self) -> impl Stream<Item = RecordedFrame> + Unpin {
        futures::stream::iter(self.frames.clone())
    }
}

/// Plays back what a detector answered when the recording was made.
pub struct RecordingDetector;

impl Detector for RecordingDetector {
    type Frame = RecordedFrame;

    async fn detect(&mut self, frame: &RecordedFrame) -> Result<Option<Vec<Landmark>>> {
        if let Some(e) = &frame.error {
            return Err(Error::msg(e.clone()));
        }
        trace!(
            "Replaying {} landmarks",
            frame.landmarks.as_ref().map(|l| l.len()).unwrap_or(0)
        );
        Ok(frame.landmarks.clone())
    }
}
