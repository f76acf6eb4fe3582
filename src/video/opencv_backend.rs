use std::path::Path;

use image::{GrayImage, RgbImage};
use opencv::{
    core::{AlgorithmHint, Mat, Scalar, Size, CV_8UC1},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};

use super::{FrameSink, FrameSource, Preview, PreviewAction, VideoBackend, VideoInfo, PREVIEW_WINDOW};
use crate::errors::{DepthMapError, Result};

/// Video I/O through OpenCV's `videoio` and `highgui` modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvBackend;

impl VideoBackend for OpenCvBackend {
    type Source = OpenCvSource;
    type Sink = OpenCvSink;
    type Preview = OpenCvPreview;

    fn open_source(&self, path: &Path) -> Result<OpenCvSource> {
        OpenCvSource::open(path)
    }

    fn create_sink(&self, path: &Path, info: &VideoInfo) -> Result<OpenCvSink> {
        OpenCvSink::create(path, info)
    }

    fn open_preview(&self) -> Result<OpenCvPreview> {
        OpenCvPreview::open()
    }
}

pub struct OpenCvSource {
    capture: VideoCapture,
    info: VideoInfo,
    bgr: Mat,
    rgb: Mat,
}

impl OpenCvSource {
    pub fn open(path: &Path) -> Result<Self> {
        let not_openable = || DepthMapError::VideoOpen {
            path: path.to_path_buf(),
        };
        let path_str = path.to_str().ok_or_else(not_openable)?;
        let capture =
            VideoCapture::from_file(path_str, videoio::CAP_ANY).map_err(|_| not_openable())?;
        if !capture.is_opened()? {
            return Err(not_openable());
        }

        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        let info = VideoInfo {
            fps: capture.get(videoio::CAP_PROP_FPS)?,
            width: capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            frame_count: (frame_count > 0.0).then_some(frame_count as u64),
        };
        log::debug!("Opened {}: {:?}", path.display(), info);

        Ok(Self {
            capture,
            info,
            bgr: Mat::default(),
            rgb: Mat::default(),
        })
    }
}

impl FrameSource for OpenCvSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.capture.read(&mut self.bgr)? || self.bgr.empty() {
            return Ok(None);
        }

        imgproc::cvt_color(
            &self.bgr,
            &mut self.rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;

        let width = self.rgb.cols() as u32;
        let height = self.rgb.rows() as u32;
        let data = self.rgb.data_bytes()?.to_vec();
        RgbImage::from_vec(width, height, data)
            .map(Some)
            .ok_or_else(|| {
                DepthMapError::video(
                    "frame conversion",
                    format!("{}x{} frame does not hold packed RGB data", width, height),
                )
            })
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("Failed to release video capture: {}", e);
        }
    }
}

pub struct OpenCvSink {
    writer: VideoWriter,
    frame: Mat,
}

impl OpenCvSink {
    pub fn create(path: &Path, info: &VideoInfo) -> Result<Self> {
        let path_str = path.to_str().ok_or_else(|| DepthMapError::Configuration {
            message: format!("output path is not valid UTF-8: {:?}", path),
        })?;
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let size = Size::new(info.width as i32, info.height as i32);
        let writer = VideoWriter::new(path_str, fourcc, info.fps, size, false)?;
        if !writer.is_opened()? {
            return Err(DepthMapError::video(
                "video writer initialization",
                format!("cannot write {}", path.display()),
            ));
        }

        let frame = Mat::new_rows_cols_with_default(size.height, size.width, CV_8UC1, Scalar::all(0.0))?;
        Ok(Self { writer, frame })
    }
}

impl FrameSink for OpenCvSink {
    fn write_frame(&mut self, frame: &GrayImage) -> Result<()> {
        let expected = (self.frame.cols() as u32, self.frame.rows() as u32);
        if frame.dimensions() != expected {
            return Err(DepthMapError::video(
                "frame write",
                format!(
                    "frame is {}x{}, writer expects {}x{}",
                    frame.width(),
                    frame.height(),
                    expected.0,
                    expected.1
                ),
            ));
        }
        self.frame.data_bytes_mut()?.copy_from_slice(frame.as_raw());
        self.writer.write(&self.frame)?;
        Ok(())
    }
}

impl Drop for OpenCvSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.release() {
            log::warn!("Failed to release video writer: {}", e);
        }
    }
}

pub struct OpenCvPreview {
    frame: Mat,
}

impl OpenCvPreview {
    pub fn open() -> Result<Self> {
        highgui::named_window(PREVIEW_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            frame: Mat::default(),
        })
    }
}

impl Preview for OpenCvPreview {
    fn show(&mut self, frame: &GrayImage) -> Result<PreviewAction> {
        let (width, height) = (frame.width() as i32, frame.height() as i32);
        if self.frame.cols() != width || self.frame.rows() != height {
            self.frame = Mat::new_rows_cols_with_default(height, width, CV_8UC1, Scalar::all(0.0))?;
        }
        self.frame.data_bytes_mut()?.copy_from_slice(frame.as_raw());
        highgui::imshow(PREVIEW_WINDOW, &self.frame)?;

        let key = highgui::wait_key(1)?;
        if key & 0xFF == i32::from(b'q') {
            Ok(PreviewAction::Quit)
        } else {
            Ok(PreviewAction::Continue)
        }
    }
}

impl Drop for OpenCvPreview {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(PREVIEW_WINDOW) {
            log::warn!("Failed to close preview window: {}", e);
        }
    }
}
