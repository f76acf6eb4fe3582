use std::path::Path;

use ndarray::prelude::*;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
    value::TensorRef,
};
use parking_lot::Mutex;

use crate::errors::{DepthMapError, Result};

/// Monocular depth estimation over a preprocessed `[1, 3, H, W]` tensor.
pub trait DepthEstimator: Send + Sync {
    /// Relative depth for the single image in `tensor`, shaped `(H', W')`.
    fn estimate(&self, tensor: ArrayView4<f32>) -> Result<Array2<f32>>;
}

/// Where the ONNX weights come from.
#[derive(Debug, Clone, Copy)]
pub enum ModelSource<'a> {
    Url(&'a str),
    File(&'a Path),
}

pub struct Model {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl Model {
    /// Loads the model and runs one warm-up pass of `warmup_size` x `warmup_size`.
    pub fn new(source: ModelSource<'_>, device_id: i32, warmup_size: u32) -> Result<Self> {
        let builder = SessionBuilder::new()
            .map_err(|e| DepthMapError::model("session builder initialization", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| DepthMapError::model("execution provider registration", e))?
            .with_memory_pattern(true)
            .map_err(|e| DepthMapError::model("memory pattern configuration", e))?;

        let mut session = match source {
            ModelSource::Url(url) => {
                log::info!("Fetching pretrained weights from {}", url);
                builder
                    .commit_from_url(url)
                    .map_err(|e| DepthMapError::model(format!("model download: {}", url), e))?
            }
            ModelSource::File(path) => builder.commit_from_file(path).map_err(|e| {
                DepthMapError::model(format!("model file load: {}", path.display()), e)
            })?,
        };

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| DepthMapError::model("model input lookup", "model declares no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                DepthMapError::model("model output lookup", "model declares no outputs")
            })?;
        log::debug!("Model input `{}`, output `{}`", input_name, output_name);

        let size = warmup_size as usize;
        let data = Array4::<f32>::zeros((1, 3, size, size));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data)?])
            .map_err(|e| DepthMapError::model("warm-up run", e))?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl DepthEstimator for Model {
    fn estimate(&self, tensor: ArrayView4<f32>) -> Result<Array2<f32>> {
        let tensor = tensor.as_standard_layout();
        let mut session = self.session.lock();
        let outputs = session.run(
            ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(&tensor)?],
        )?;
        let depth = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
        squeeze_depth(depth.view())
    }
}

/// Drops the leading unit axes of a `[1, H, W]` or `[1, 1, H, W]` model output.
pub fn squeeze_depth(depth: ArrayViewD<f32>) -> Result<Array2<f32>> {
    let shape = depth.shape().to_vec();
    let leading_units = shape.len() >= 2 && shape[..shape.len() - 2].iter().all(|&d| d == 1);
    if !leading_units {
        return Err(DepthMapError::model(
            "depth output squeeze",
            format!("unexpected depth output shape {:?}", shape),
        ));
    }

    let (height, width) = (shape[shape.len() - 2], shape[shape.len() - 1]);
    Ok(depth
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((height, width))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squeeze_three_dimensional_output() -> Result<()> {
        let depth = Array3::<f32>::from_shape_fn((1, 2, 3), |(_, y, x)| (y * 3 + x) as f32);
        let squeezed = squeeze_depth(depth.view().into_dyn())?;
        assert_eq!(squeezed, array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);
        Ok(())
    }

    #[test]
    fn test_squeeze_four_dimensional_output() -> Result<()> {
        let depth = Array4::<f32>::ones((1, 1, 5, 7));
        let squeezed = squeeze_depth(depth.view().into_dyn())?;
        assert_eq!(squeezed.dim(), (5, 7));
        Ok(())
    }

    #[test]
    fn test_squeeze_rejects_batched_output() {
        let depth = Array3::<f32>::zeros((2, 4, 4));
        assert!(squeeze_depth(depth.view().into_dyn()).is_err());
    }

    #[test]
    fn test_squeeze_rejects_flat_output() {
        let depth = Array1::<f32>::zeros(16);
        assert!(squeeze_depth(depth.view().into_dyn()).is_err());
    }
}
