pub mod batch;
pub mod config;
pub mod errors;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod transform;
pub mod video;

pub mod mocks;

pub use batch::{BatchDriver, BatchReport};
pub use config::{Config, Encoder};
pub use errors::{DepthMapError, Result};
pub use logging::ProgressLogger;
pub use model::{DepthEstimator, Model, ModelSource};
pub use pipeline::{DepthPipeline, VideoReport};
pub use transform::DepthTransform;
pub use video::{FrameSink, FrameSource, Preview, PreviewAction, VideoBackend, VideoInfo};

#[cfg(feature = "opencv")]
pub use video::OpenCvBackend;
