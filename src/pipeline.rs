use std::path::Path;

use image::{GrayImage, RgbImage};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::errors::Result;
use crate::model::DepthEstimator;
use crate::postprocess::{normalize_depth, resize_to, smooth};
use crate::transform::DepthTransform;
use crate::video::{
    FrameSink, FrameSource, HeadlessPreview, MaybePreview, Preview, PreviewAction, VideoBackend,
};

/// Outcome of converting one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoReport {
    pub frames_written: u64,
    /// The preview's quit key ended the video before the stream ran out.
    pub interrupted: bool,
}

/// Shared, read-only context for converting frames into depth images.
pub struct DepthPipeline<'a, M: DepthEstimator> {
    model: &'a M,
    transform: &'a DepthTransform,
}

impl<'a, M: DepthEstimator> DepthPipeline<'a, M> {
    pub const fn new(model: &'a M, transform: &'a DepthTransform) -> Self {
        Self { model, transform }
    }

    /// Depth image of `frame` at the frame's own resolution.
    pub fn process_frame(&self, frame: &RgbImage) -> Result<GrayImage> {
        let image = DepthTransform::to_unit_range(frame);
        let tensor = self.transform.apply(&image);
        let depth = self.model.estimate(tensor.view())?;

        let gray = normalize_depth(&depth);
        let smoothed = smooth(&gray);
        Ok(resize_to(&smoothed, frame.width(), frame.height()))
    }

    /// Converts `input` into a grayscale depth video at `output`.
    ///
    /// Capture, writer and preview are owned by this call and released on
    /// every return path, including errors and the quit key.
    pub fn process_video<B: VideoBackend>(
        &self,
        backend: &B,
        input: &Path,
        output: &Path,
        show_preview: bool,
        progress: &MultiProgress,
    ) -> Result<VideoReport> {
        let mut source = backend.open_source(input)?;
        let info = source.info();
        let mut sink = backend.create_sink(output, &info)?;
        let mut preview = if show_preview {
            MaybePreview::Window(backend.open_preview()?)
        } else {
            MaybePreview::Headless(HeadlessPreview)
        };

        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!(
            "Processing {} ({}x{} @ {:.2} fps)",
            name,
            info.width,
            info.height,
            info.fps
        );
        let frames_bar = progress.add(frame_progress_bar(info.frame_count, &name));

        let mut report = VideoReport {
            frames_written: 0,
            interrupted: false,
        };
        while info
            .frame_count
            .map_or(true, |count| report.frames_written < count)
        {
            let Some(frame) = source.read_frame()? else {
                break;
            };

            let depth = self.process_frame(&frame)?;
            sink.write_frame(&depth)?;
            report.frames_written += 1;
            frames_bar.inc(1);

            if preview.show(&depth)? == PreviewAction::Quit {
                log::warn!(
                    "Quit requested, stopping {} after {} frames",
                    name,
                    report.frames_written
                );
                report.interrupted = true;
                break;
            }
        }

        frames_bar.finish_and_clear();
        progress.remove(&frames_bar);
        log::info!("Wrote {} frames to {}", report.frames_written, output.display());
        Ok(report)
    }
}

fn frame_progress_bar(frame_count: Option<u64>, name: &str) -> ProgressBar {
    let bar = match frame_count {
        Some(count) => ProgressBar::new(count),
        None => ProgressBar::no_length(),
    };
    if let Ok(style) = ProgressStyle::with_template(
        "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})",
    ) {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar.set_message(format!("Processing frames of {}", name));
    bar
}
