//! Full-video windowed inference.

use std::collections::VecDeque;

use fungen_common::{FungenError, FungenResult, ProgressSink, ProgressTicker};
use fungen_script_model::{RawSignal, FALLBACK_FRAME_RATE};

use crate::frames::{prepare_frame, FrameSource};
use crate::model::{PreparedFrame, SequenceModel};

/// Result of a full inference run.
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    /// One prediction per decoded frame. The caller persists the CSV
    /// side file and runs postprocessing; nothing here is written to
    /// disk.
    pub signal: RawSignal,
}

/// Run the model over every frame of the source.
///
/// Maintains a sliding window of the last `sequence_length` preprocessed
/// frames; a frame only reaches the model once the window is full, and
/// earlier frames are defined to predict exactly 0. The cancellation
/// predicate is checked once before decoding starts and once per frame;
/// cancellation surfaces as [`FungenError::Cancelled`], distinct from
/// decode failures.
pub fn run_inference(
    source: &mut dyn FrameSource,
    model: &mut dyn SequenceModel,
    sink: &dyn ProgressSink,
) -> FungenResult<InferenceOutput> {
    if sink.should_cancel() {
        return Err(FungenError::Cancelled);
    }
    if model.channels() != 3 {
        return Err(FungenError::model(format!(
            "unsupported channel count: {}",
            model.channels()
        )));
    }

    let mut frame_rate = source.frame_rate();
    if frame_rate <= 1e-3 {
        frame_rate = FALLBACK_FRAME_RATE;
    }
    let total = source.frame_count().filter(|&t| t > 0);
    sink.log(&format!("Decoding video at ~{frame_rate:.2} fps"));

    let sequence_length = model.sequence_length();
    let mut window: VecDeque<PreparedFrame> = VecDeque::with_capacity(sequence_length);
    let mut predictions: Vec<f32> = Vec::new();
    let ticker = ProgressTicker::new(total);

    let mut frame_index: u64 = 0;
    loop {
        if sink.should_cancel() {
            return Err(FungenError::Cancelled);
        }

        let Some(frame) = source.read_frame()? else {
            break;
        };
        if frame.is_empty() {
            continue;
        }

        if window.len() == sequence_length {
            window.pop_front();
        }
        window.push_back(prepare_frame(&frame, model.width(), model.height()));

        let value = if window.len() == sequence_length {
            model.infer(window.make_contiguous())?
        } else {
            0.0
        };
        predictions.push(value);
        frame_index += 1;

        if ticker.should_tick(frame_index) {
            let message = match total {
                Some(t) => format!("Processing {frame_index}/{t} frames"),
                None => format!("Processing {frame_index} frames"),
            };
            sink.progress(ticker.fraction(frame_index), &message);
        }
    }

    sink.progress(0.95, "Finalising predictions");

    if predictions.is_empty() {
        return Err(FungenError::NoFrames);
    }

    // The first window's worth of frames never saw a full sequence.
    let cutoff = (sequence_length.saturating_sub(1)).min(predictions.len());
    for value in &mut predictions[..cutoff] {
        *value = 0.0;
    }

    tracing::info!(
        frames = predictions.len(),
        frame_rate,
        "inference run complete"
    );

    Ok(InferenceOutput {
        signal: RawSignal::from_values(predictions, frame_rate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::Frame;
    use fungen_common::NullSink;
    use std::cell::RefCell;

    struct TestSource {
        brightness: Vec<u8>,
        position: usize,
        frame_rate: f64,
        reported_count: Option<u64>,
        fail_at: Option<usize>,
    }

    impl TestSource {
        fn new(brightness: Vec<u8>) -> Self {
            Self {
                brightness,
                position: 0,
                frame_rate: 30.0,
                reported_count: None,
                fail_at: None,
            }
        }

        fn with_count(mut self) -> Self {
            self.reported_count = Some(self.brightness.len() as u64);
            self
        }
    }

    impl FrameSource for TestSource {
        fn frame_rate(&self) -> f64 {
            self.frame_rate
        }

        fn frame_count(&self) -> Option<u64> {
            self.reported_count
        }

        fn read_frame(&mut self) -> FungenResult<Option<Frame>> {
            if Some(self.position) == self.fail_at {
                return Err(FungenError::decode("corrupt packet"));
            }
            let Some(&value) = self.brightness.get(self.position) else {
                return Ok(None);
            };
            self.position += 1;
            Ok(Some(Frame {
                width: 4,
                height: 4,
                data: vec![value; 4 * 4 * 3],
            }))
        }

        fn seek_to_frame(&mut self, index: u64) -> FungenResult<()> {
            self.position = index as usize;
            Ok(())
        }
    }

    /// Model that reports the mean brightness of the newest window frame.
    struct MeanModel {
        sequence_length: usize,
    }

    impl SequenceModel for MeanModel {
        fn height(&self) -> u32 {
            4
        }

        fn width(&self) -> u32 {
            4
        }

        fn channels(&self) -> u32 {
            3
        }

        fn sequence_length(&self) -> usize {
            self.sequence_length
        }

        fn infer(&mut self, window: &[PreparedFrame]) -> FungenResult<f32> {
            assert_eq!(window.len(), self.sequence_length);
            let newest = window.last().unwrap();
            Ok(newest.iter().sum::<f32>() / newest.len() as f32)
        }

        fn name(&self) -> &str {
            "mean-test"
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        progress_calls: RefCell<Vec<(f64, String)>>,
        cancel_after: Option<usize>,
        polls: RefCell<usize>,
    }

    impl ProgressSink for RecordingSink {
        fn progress(&self, fraction: f64, message: &str) {
            self.progress_calls
                .borrow_mut()
                .push((fraction, message.to_string()));
        }

        fn log(&self, _message: &str) {}

        fn should_cancel(&self) -> bool {
            let mut polls = self.polls.borrow_mut();
            *polls += 1;
            match self.cancel_after {
                Some(limit) => *polls > limit,
                None => false,
            }
        }
    }

    #[test]
    fn test_window_fill_produces_leading_zeros() {
        // 12 dark frames then a bright spike at index 12.
        let mut brightness = vec![0u8; 12];
        brightness.push(255);
        brightness.extend(vec![0u8; 7]);

        let mut source = TestSource::new(brightness);
        let mut model = MeanModel {
            sequence_length: 12,
        };
        let output = run_inference(&mut source, &mut model, &NullSink).unwrap();

        let values = output.signal.values();
        assert_eq!(values.len(), 20);
        // Indices 0–10 predate a full window and are exactly 0.
        for (i, &v) in values[..11].iter().enumerate() {
            assert_eq!(v, 0.0, "index {i} should be zero before window fills");
        }
        // Index 12 sees the bright frame as the newest window entry.
        assert!(values[12] > 0.9);
    }

    #[test]
    fn test_short_video_is_all_zeros_but_succeeds() {
        let mut source = TestSource::new(vec![128; 5]);
        let mut model = MeanModel {
            sequence_length: 12,
        };
        let output = run_inference(&mut source, &mut model, &NullSink).unwrap();
        assert_eq!(output.signal.len(), 5);
        assert!(output.signal.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_source_is_no_frames_error() {
        let mut source = TestSource::new(Vec::new());
        let mut model = MeanModel { sequence_length: 4 };
        let err = run_inference(&mut source, &mut model, &NullSink).unwrap_err();
        assert!(matches!(err, FungenError::NoFrames));
    }

    #[test]
    fn test_decode_error_propagates() {
        let mut source = TestSource::new(vec![10; 8]);
        source.fail_at = Some(4);
        let mut model = MeanModel { sequence_length: 2 };
        let err = run_inference(&mut source, &mut model, &NullSink).unwrap_err();
        assert!(matches!(err, FungenError::Decode { .. }));
    }

    #[test]
    fn test_cancellation_is_distinct() {
        let mut source = TestSource::new(vec![10; 50]);
        let mut model = MeanModel { sequence_length: 2 };
        let sink = RecordingSink {
            cancel_after: Some(5),
            ..RecordingSink::default()
        };
        let err = run_inference(&mut source, &mut model, &sink).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_progress_cadence_with_known_total() {
        let mut source = TestSource::new(vec![50; 200]).with_count();
        let mut model = MeanModel { sequence_length: 2 };
        let sink = RecordingSink::default();
        run_inference(&mut source, &mut model, &sink).unwrap();

        let calls = sink.progress_calls.borrow();
        // 200/20 = every 10 frames → 20 reports plus the final one.
        assert_eq!(calls.len(), 21);
        assert!(calls[..20].iter().all(|(f, m)| f.is_finite() && m.contains("/200")));
        assert!((calls[19].0 - 1.0).abs() < 1e-12);
        assert_eq!(calls[20].1, "Finalising predictions");
    }

    #[test]
    fn test_progress_indeterminate_without_total() {
        let mut source = TestSource::new(vec![50; 90]);
        let mut model = MeanModel { sequence_length: 2 };
        let sink = RecordingSink::default();
        run_inference(&mut source, &mut model, &sink).unwrap();

        let calls = sink.progress_calls.borrow();
        // Every 30 frames → 3 reports plus the final one.
        assert_eq!(calls.len(), 4);
        assert!(calls[..3].iter().all(|(f, m)| f.is_nan() && m.contains("frames")));
    }

    #[test]
    fn test_zero_frame_rate_falls_back() {
        let mut source = TestSource::new(vec![50; 4]);
        source.frame_rate = 0.0;
        let mut model = MeanModel { sequence_length: 2 };
        let output = run_inference(&mut source, &mut model, &NullSink).unwrap();
        assert!((output.signal.frame_rate() - FALLBACK_FRAME_RATE).abs() < 1e-9);
    }
}
