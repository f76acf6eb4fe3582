use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Patch granularity of the ViT encoders; model input sides must divide by it.
pub const PATCH_SIZE: u32 = 14;

/// Default lower bound of the resized model input.
pub const DEFAULT_INPUT_SIZE: u32 = 532;

#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about = "Batch process videos for depth estimation with matched output resolution.",
    long_about = None
)]
pub struct Config {
    /// Encoder for the depth model.
    #[arg(long, value_enum, default_value_t = Encoder::Vitl)]
    pub encoder: Encoder,

    /// Path to the input folder containing video files.
    #[arg(long = "input_folder", visible_alias = "input-folder")]
    pub input_folder: PathBuf,

    /// Path to the output folder for processed videos.
    #[arg(long = "output_folder", visible_alias = "output-folder")]
    pub output_folder: PathBuf,

    /// Local ONNX model to use instead of downloading the pretrained weights.
    #[arg(short, long)]
    pub model_path: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Lower bound for the shorter side of the model input.
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE, value_parser = check_input_size)]
    pub input_size: u32,

    /// Do not open a preview window.
    #[arg(long)]
    pub no_preview: bool,

    /// Log a failing video and move on to the next one instead of aborting the batch.
    #[arg(long)]
    pub continue_on_error: bool,
}

/// Depth Anything encoder variants, small to large.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoder {
    Vits,
    Vitb,
    Vitl,
}

impl Encoder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vits => "vits",
            Self::Vitb => "vitb",
            Self::Vitl => "vitl",
        }
    }

    /// ONNX export of `LiheYoung/depth_anything_<encoder>14` on the Hugging Face hub.
    pub const fn model_url(self) -> &'static str {
        match self {
            Self::Vits => {
                "https://huggingface.co/Xenova/depth-anything-small-hf/resolve/main/onnx/model.onnx"
            }
            Self::Vitb => {
                "https://huggingface.co/Xenova/depth-anything-base-hf/resolve/main/onnx/model.onnx"
            }
            Self::Vitl => {
                "https://huggingface.co/Xenova/depth-anything-large-hf/resolve/main/onnx/model.onnx"
            }
        }
    }

    /// Published parameter count of the pretrained checkpoint.
    pub const fn parameter_count(self) -> u64 {
        match self {
            Self::Vits => 24_785_089,
            Self::Vitb => 97_470_785,
            Self::Vitl => 335_315_649,
        }
    }
}

fn check_input_size(s: &str) -> Result<u32, String> {
    let size: u32 = s
        .parse()
        .map_err(|_| format!("`{}` is not a positive integer", s))?;
    if size == 0 || size % PATCH_SIZE != 0 {
        return Err(format!(
            "{} is not a positive multiple of the patch size {}",
            size, PATCH_SIZE
        ));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("depthmap-rs").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--input_folder", "in", "--output_folder", "out"]).unwrap();
        assert_eq!(config.encoder, Encoder::Vitl);
        assert_eq!(config.input_folder, PathBuf::from("in"));
        assert_eq!(config.output_folder, PathBuf::from("out"));
        assert_eq!(config.input_size, DEFAULT_INPUT_SIZE);
        assert!(config.model_path.is_none());
        assert!(!config.no_preview);
        assert!(!config.continue_on_error);
    }

    #[test]
    fn test_encoder_choices() {
        for (arg, expected) in [
            ("vits", Encoder::Vits),
            ("vitb", Encoder::Vitb),
            ("vitl", Encoder::Vitl),
        ] {
            let config = parse(&[
                "--encoder",
                arg,
                "--input_folder",
                "in",
                "--output_folder",
                "out",
            ])
            .unwrap();
            assert_eq!(config.encoder, expected);
            assert_eq!(config.encoder.as_str(), arg);
        }

        assert!(parse(&["--encoder", "vitg", "--input_folder", "in", "--output_folder", "out"]).is_err());
    }

    #[test]
    fn test_folders_are_required() {
        assert!(parse(&["--input_folder", "in"]).is_err());
        assert!(parse(&["--output_folder", "out"]).is_err());
    }

    #[test]
    fn test_hyphenated_aliases() {
        let config = parse(&["--input-folder", "a", "--output-folder", "b"]).unwrap();
        assert_eq!(config.input_folder, PathBuf::from("a"));
        assert_eq!(config.output_folder, PathBuf::from("b"));
    }

    #[test]
    fn test_input_size_must_be_patch_multiple() {
        assert_eq!(check_input_size("518"), Ok(518));
        assert!(check_input_size("520").is_err());
        assert!(check_input_size("0").is_err());
        assert!(check_input_size("abc").is_err());
    }

    #[test]
    fn test_parameter_counts_are_ordered() {
        assert!(Encoder::Vits.parameter_count() < Encoder::Vitb.parameter_count());
        assert!(Encoder::Vitb.parameter_count() < Encoder::Vitl.parameter_count());
    }
}
