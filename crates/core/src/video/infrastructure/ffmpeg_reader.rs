use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{SeekPrecision, VideoReader};
use crate::video::infrastructure::decode;

/// Frame-accurate backend over ffmpeg-next (libavformat + libavcodec).
///
/// Seeks land on the keyframe at or before the target, then the next
/// iteration decodes and discards the run-up so the first emitted frame
/// is the first one presented at or after the requested timestamp.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
    time_base: f64,
    pending_min_pts: Option<f64>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            time_base: 0.0,
            pending_min_pts: None,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let opened = decode::open_input(path)?;
        self.video_stream_index = opened.stream_index;
        self.time_base = opened.time_base;
        self.input_ctx = Some(opened.input);
        self.pending_min_pts = None;
        Ok(opened.metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let min_pts = self.pending_min_pts.take();
        let stream_index = self.video_stream_index;
        let time_base = self.time_base;
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };

        match decode::FrameIter::new(ictx, stream_index, time_base, min_pts) {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn seek(&mut self, timestamp: f64) -> Result<(), Box<dyn std::error::Error>> {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(format!("invalid seek timestamp: {timestamp}").into());
        }
        let ictx = self
            .input_ctx
            .as_mut()
            .ok_or("FfmpegReader: not opened")?;
        decode::seek_to(ictx, timestamp)?;
        self.pending_min_pts = Some(timestamp);
        Ok(())
    }

    fn seek_precision(&self) -> SeekPrecision {
        SeekPrecision::Exact
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.pending_min_pts = None;
    }
}
