#[cfg(feature = "opencv")]
mod opencv_backend;

#[cfg(feature = "opencv")]
pub use opencv_backend::{OpenCvBackend, OpenCvPreview, OpenCvSink, OpenCvSource};

use std::path::Path;

use image::{GrayImage, RgbImage};

use crate::errors::Result;

/// Title of the preview window.
pub const PREVIEW_WINDOW: &str = "Depth Anywhere";

/// Stream properties read from an opened video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Frame count reported by the container, if any.
    pub frame_count: Option<u64>,
}

/// Sequential frame reader. Released when dropped.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    /// Next frame in RGB order, or `None` once the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Grayscale frame writer. Released when dropped.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &GrayImage) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewAction {
    Continue,
    Quit,
}

/// Interactive display of processed frames. Closed when dropped.
pub trait Preview {
    fn show(&mut self, frame: &GrayImage) -> Result<PreviewAction>;
}

/// Opens the per-video handles used by the frame processor.
pub trait VideoBackend {
    type Source: FrameSource;
    type Sink: FrameSink;
    type Preview: Preview;

    fn open_source(&self, path: &Path) -> Result<Self::Source>;

    /// Writer matching the source frame rate and dimensions, single channel.
    fn create_sink(&self, path: &Path, info: &VideoInfo) -> Result<Self::Sink>;

    fn open_preview(&self) -> Result<Self::Preview>;
}

/// Preview for headless runs: shows nothing and never asks to quit.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPreview;

impl Preview for HeadlessPreview {
    fn show(&mut self, _frame: &GrayImage) -> Result<PreviewAction> {
        Ok(PreviewAction::Continue)
    }
}

/// Either the backend's own preview or a headless one.
pub enum MaybePreview<P: Preview> {
    Window(P),
    Headless(HeadlessPreview),
}

impl<P: Preview> Preview for MaybePreview<P> {
    fn show(&mut self, frame: &GrayImage) -> Result<PreviewAction> {
        match self {
            Self::Window(preview) => preview.show(frame),
            Self::Headless(preview) => preview.show(frame),
        }
    }
}
