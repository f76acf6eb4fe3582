use anyhow::{Context, Result};
use clap::Parser;
use depthmap_rs::{
    BatchDriver, Config, DepthPipeline, DepthTransform, Model, ModelSource, OpenCvBackend,
    ProgressLogger,
};
use indicatif::MultiProgress;

fn main() -> Result<()> {
    let progress = MultiProgress::new();
    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).build();
    ProgressLogger::init(logger, progress.clone()).context("Failed to install logger")?;

    let config = Config::parse();

    let source = match &config.model_path {
        Some(path) => ModelSource::File(path),
        None => ModelSource::Url(config.encoder.model_url()),
    };
    let model = Model::new(source, config.device_id, config.input_size)
        .with_context(|| format!("Failed to load the {} depth model", config.encoder.as_str()))?;
    if config.model_path.is_none() {
        println!(
            "Total parameters: {:.2}M",
            config.encoder.parameter_count() as f64 / 1e6
        );
    }

    let transform = DepthTransform::new(config.input_size);

    let driver = BatchDriver::new(DepthPipeline::new(&model, &transform), OpenCvBackend)
        .with_preview(!config.no_preview)
        .with_continue_on_error(config.continue_on_error)
        .with_progress(progress);
    let report = driver
        .run(&config.input_folder, &config.output_folder)
        .with_context(|| format!("Failed to process {}", config.input_folder.display()))?;

    log::info!(
        "Converted {} videos, {} failed",
        report.completed.len(),
        report.failed.len()
    );
    if !report.failed.is_empty() {
        anyhow::bail!("{} videos could not be processed", report.failed.len());
    }

    Ok(())
}
