use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, RgbImage};
use ndarray::prelude::*;
use parking_lot::Mutex;

use crate::errors::{DepthMapError, Result};
use crate::model::DepthEstimator;
use crate::video::{FrameSink, FrameSource, Preview, PreviewAction, VideoBackend, VideoInfo};

/// Test depth model: returns a depth map of the input's spatial size.
#[derive(Debug)]
pub struct MockDepthEstimator {
    constant: Option<f32>,
    last_input_shape: Mutex<Option<[usize; 4]>>,
}

impl MockDepthEstimator {
    /// Depth increasing left to right and top to bottom.
    pub const fn gradient() -> Self {
        Self {
            constant: None,
            last_input_shape: Mutex::new(None),
        }
    }

    pub const fn constant(value: f32) -> Self {
        Self {
            constant: Some(value),
            last_input_shape: Mutex::new(None),
        }
    }

    pub fn last_input_shape(&self) -> Option<[usize; 4]> {
        *self.last_input_shape.lock()
    }
}

impl DepthEstimator for MockDepthEstimator {
    fn estimate(&self, tensor: ArrayView4<f32>) -> Result<Array2<f32>> {
        let (n, c, h, w) = tensor.dim();
        *self.last_input_shape.lock() = Some([n, c, h, w]);

        Ok(match self.constant {
            Some(value) => Array2::from_elem((h, w), value),
            None => Array2::from_shape_fn((h, w), |(y, x)| (x + y) as f32),
        })
    }
}

/// Frames and properties of an in-memory video.
#[derive(Debug, Clone)]
pub struct MemoryVideo {
    pub info: VideoInfo,
    pub frames: Vec<RgbImage>,
}

impl MemoryVideo {
    /// `frame_count` solid frames of `width` x `height`, with the count reported.
    pub fn solid(width: u32, height: u32, fps: f64, frame_count: usize) -> Self {
        let frames = (0..frame_count)
            .map(|i| RgbImage::from_pixel(width, height, image::Rgb([i as u8, 64, 128])))
            .collect();
        Self {
            info: VideoInfo {
                fps,
                width,
                height,
                frame_count: Some(frame_count as u64),
            },
            frames,
        }
    }
}

/// Everything a `MemoryBackend` observed, shared with its handles.
#[derive(Debug, Default)]
pub struct MemoryLog {
    pub opened: Vec<PathBuf>,
    pub written: HashMap<PathBuf, (VideoInfo, Vec<GrayImage>)>,
    pub released_sources: usize,
    pub released_sinks: usize,
    pub closed_previews: usize,
}

/// Video backend over in-memory videos keyed by path.
///
/// Paths without a registered video fail to open, like a corrupt file.
/// Sinks touch their output path on disk so directory listings see them.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    videos: HashMap<PathBuf, MemoryVideo>,
    quit_after: Option<u64>,
    log: Arc<Mutex<MemoryLog>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, path: impl Into<PathBuf>, video: MemoryVideo) -> Self {
        self.videos.insert(path.into(), video);
        self
    }

    /// Previews request quit after showing `frames` frames.
    pub fn with_quit_after(mut self, frames: u64) -> Self {
        self.quit_after = Some(frames);
        self
    }

    pub fn log(&self) -> parking_lot::MutexGuard<'_, MemoryLog> {
        self.log.lock()
    }
}

impl VideoBackend for MemoryBackend {
    type Source = MemorySource;
    type Sink = MemorySink;
    type Preview = MemoryPreview;

    fn open_source(&self, path: &Path) -> Result<MemorySource> {
        let video = self
            .videos
            .get(path)
            .cloned()
            .ok_or_else(|| DepthMapError::VideoOpen {
                path: path.to_path_buf(),
            })?;
        self.log.lock().opened.push(path.to_path_buf());
        Ok(MemorySource {
            info: video.info,
            frames: video.frames.into_iter(),
            log: Arc::clone(&self.log),
        })
    }

    fn create_sink(&self, path: &Path, info: &VideoInfo) -> Result<MemorySink> {
        fs::write(path, b"").map_err(|e| DepthMapError::FileSystem {
            path: path.to_path_buf(),
            operation: "create output video".to_string(),
            source: e,
        })?;
        self.log
            .lock()
            .written
            .insert(path.to_path_buf(), (*info, Vec::new()));
        Ok(MemorySink {
            path: path.to_path_buf(),
            log: Arc::clone(&self.log),
        })
    }

    fn open_preview(&self) -> Result<MemoryPreview> {
        Ok(MemoryPreview {
            shown: 0,
            quit_after: self.quit_after,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct MemorySource {
    info: VideoInfo,
    frames: std::vec::IntoIter<RgbImage>,
    log: Arc<Mutex<MemoryLog>>,
}

impl FrameSource for MemorySource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.next())
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.log.lock().released_sources += 1;
    }
}

pub struct MemorySink {
    path: PathBuf,
    log: Arc<Mutex<MemoryLog>>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &GrayImage) -> Result<()> {
        if let Some((_, frames)) = self.log.lock().written.get_mut(&self.path) {
            frames.push(frame.clone());
        }
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.log.lock().released_sinks += 1;
    }
}

pub struct MemoryPreview {
    shown: u64,
    quit_after: Option<u64>,
    log: Arc<Mutex<MemoryLog>>,
}

impl Preview for MemoryPreview {
    fn show(&mut self, _frame: &GrayImage) -> Result<PreviewAction> {
        self.shown += 1;
        match self.quit_after {
            Some(limit) if self.shown >= limit => Ok(PreviewAction::Quit),
            _ => Ok(PreviewAction::Continue),
        }
    }
}

impl Drop for MemoryPreview {
    fn drop(&mut self) {
        self.log.lock().closed_previews += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_matches_input_size() -> Result<()> {
        let mock = MockDepthEstimator::gradient();
        let input = Array4::<f32>::zeros((1, 3, 28, 42));

        let depth = mock.estimate(input.view())?;
        assert_eq!(depth.dim(), (28, 42));
        assert_eq!(depth[[0, 0]], 0.0);
        assert_eq!(depth[[27, 41]], 68.0);
        assert_eq!(mock.last_input_shape(), Some([1, 3, 28, 42]));
        Ok(())
    }

    #[test]
    fn test_unknown_path_fails_to_open() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.open_source(Path::new("missing.mp4")),
            Err(DepthMapError::VideoOpen { .. })
        ));
    }

    #[test]
    fn test_source_release_is_counted() -> Result<()> {
        let backend =
            MemoryBackend::new().with_video("a.mp4", MemoryVideo::solid(8, 6, 25.0, 2));
        {
            let mut source = backend.open_source(Path::new("a.mp4"))?;
            assert!(source.read_frame()?.is_some());
        }
        assert_eq!(backend.log().released_sources, 1);
        Ok(())
    }
}
