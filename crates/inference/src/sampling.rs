//! Representative-segment sampling for quick recommendation passes.
//!
//! Instead of decoding the whole video, a handful of windows spread
//! across it are run through the model to cheaply approximate the
//! signal's statistics. Good enough for parameter recommendation, not a
//! substitute for the full run.

use std::collections::VecDeque;

use fungen_common::{FungenError, FungenResult, ProgressSink};
use fungen_script_model::{RawSignal, SignalSample, FALLBACK_FRAME_RATE};

use crate::frames::{prepare_frame, FrameSource};
use crate::model::{PreparedFrame, SequenceModel};

/// Default number of frames sampled per segment.
pub const DEFAULT_FRAMES_PER_SEGMENT: u64 = 250;

/// A half-open frame interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
}

impl Segment {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Number of segments to sample for a video of the given length.
pub fn segment_count_for(total_frames: u64) -> usize {
    if total_frames < 5_000 {
        // Under ~3 minutes at 30fps.
        2
    } else if total_frames < 20_000 {
        4
    } else if total_frames < 60_000 {
        6
    } else {
        10
    }
}

/// Place `num_segments` sampling windows across the video.
///
/// The first and last windows are always included; the remaining ones
/// are centered on an even grid across the middle. Overlapping or
/// duplicate placements are removed by a sorted merge over the ordered
/// interval list, keyed by start offset.
pub fn select_segments(
    total_frames: u64,
    num_segments: usize,
    frames_per_segment: u64,
) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();

    if num_segments <= 1 {
        let start = total_frames.saturating_sub(frames_per_segment) / 2;
        segments.push(Segment {
            start,
            end: (start + frames_per_segment).min(total_frames),
        });
    } else {
        segments.push(Segment {
            start: 0,
            end: frames_per_segment.min(total_frames),
        });

        if num_segments > 2 {
            let step = total_frames as f64 / (num_segments - 1) as f64;
            for i in 1..num_segments - 1 {
                let center = (i as f64 * step) as u64;
                let start = center.saturating_sub(frames_per_segment / 2);
                let end = (start + frames_per_segment).min(total_frames);
                if end > start {
                    segments.push(Segment { start, end });
                }
            }
        }

        segments.push(Segment {
            start: total_frames.saturating_sub(frames_per_segment),
            end: total_frames,
        });
    }

    segments.sort_by_key(|s| s.start);
    segments.dedup_by_key(|s| s.start);
    segments.retain(|s| !s.is_empty());
    segments
}

/// Run the model over representative segments only.
///
/// Seeks directly to each segment start; the sliding window is cleared
/// at every boundary because a seek breaks temporal continuity, so the
/// first `sequence_length - 1` frames of each segment predict 0.
pub fn sample_signal(
    source: &mut dyn FrameSource,
    model: &mut dyn SequenceModel,
    frames_per_segment: u64,
    sink: &dyn ProgressSink,
) -> FungenResult<RawSignal> {
    let Some(total_frames) = source.frame_count().filter(|&t| t > 0) else {
        return Err(FungenError::decode("cannot determine video frame count"));
    };

    let mut frame_rate = source.frame_rate();
    if frame_rate <= 1e-3 {
        frame_rate = FALLBACK_FRAME_RATE;
    }
    let frame_ms = 1000.0 / frame_rate;

    let num_segments = segment_count_for(total_frames);
    let mut frames_per_segment = frames_per_segment.max(1);
    if total_frames < frames_per_segment * num_segments as u64 {
        frames_per_segment = (total_frames / (num_segments as u64 + 1)).max(100);
    }

    let segments = select_segments(total_frames, num_segments, frames_per_segment);
    sink.log(&format!(
        "Sampling {} segments of ~{frames_per_segment} frames",
        segments.len()
    ));

    let sequence_length = model.sequence_length();
    let mut window: VecDeque<PreparedFrame> = VecDeque::with_capacity(sequence_length);
    let mut samples: Vec<SignalSample> = Vec::new();

    for (segment_index, segment) in segments.iter().enumerate() {
        source.seek_to_frame(segment.start)?;
        window.clear();

        let mut local_index: u64 = 0;
        while local_index < segment.len() {
            if sink.should_cancel() {
                return Err(FungenError::Cancelled);
            }

            let Some(frame) = source.read_frame()? else {
                break;
            };
            if frame.is_empty() {
                continue;
            }

            let global_index = segment.start + local_index;
            if window.len() == sequence_length {
                window.pop_front();
            }
            window.push_back(prepare_frame(&frame, model.width(), model.height()));

            let value = if window.len() == sequence_length {
                model.infer(window.make_contiguous())?
            } else {
                0.0
            };

            samples.push(SignalSample {
                frame_index: global_index as u32,
                timestamp_ms: global_index as f64 * frame_ms,
                value,
            });
            local_index += 1;
        }

        sink.progress(
            (segment_index + 1) as f64 / segments.len() as f64,
            &format!("Sampled segment {}/{}", segment_index + 1, segments.len()),
        );
    }

    if samples.is_empty() {
        return Err(FungenError::NoFrames);
    }

    Ok(RawSignal::from_samples(samples, frame_rate))
}
