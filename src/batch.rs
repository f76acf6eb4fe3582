use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::errors::{DepthMapError, Result};
use crate::model::DepthEstimator;
use crate::pipeline::{DepthPipeline, VideoReport};
use crate::video::VideoBackend;

pub const OUTPUT_PREFIX: &str = "processed_";

pub const VIDEO_SUFFIXES: [&str; 3] = [".mp4", ".avi", ".mov"];

/// File name ends in `.mp4`, `.avi` or `.mov`, any case. A bare `.mp4` counts.
pub fn is_supported_video(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .is_some_and(|name| VIDEO_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

/// Video files directly under `input_dir`, sorted by file name.
///
/// Symlinks are listed when they resolve to a file.
pub fn collect_video_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| DepthMapError::FileSystem {
            path: input_dir.to_path_buf(),
            operation: "list input folder".to_string(),
            source: e.into(),
        })?;
        if entry.path().is_file() && is_supported_video(entry.path()) {
            videos.push(entry.into_path());
        }
    }
    Ok(videos)
}

/// `output_dir/processed_<file name>`, keeping the container extension.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}{}", OUTPUT_PREFIX, name))
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<(PathBuf, VideoReport)>,
    /// Videos skipped after an error; only filled when errors do not abort the batch.
    pub failed: Vec<(PathBuf, DepthMapError)>,
}

/// Runs the depth pipeline over every video of a folder, one after another.
pub struct BatchDriver<'a, M: DepthEstimator, B: VideoBackend> {
    pipeline: DepthPipeline<'a, M>,
    backend: B,
    show_preview: bool,
    continue_on_error: bool,
    progress: MultiProgress,
}

impl<'a, M: DepthEstimator, B: VideoBackend> BatchDriver<'a, M, B> {
    pub fn new(pipeline: DepthPipeline<'a, M>, backend: B) -> Self {
        Self {
            pipeline,
            backend,
            show_preview: true,
            continue_on_error: false,
            progress: MultiProgress::new(),
        }
    }

    pub fn with_preview(mut self, show_preview: bool) -> Self {
        self.show_preview = show_preview;
        self
    }

    /// Keep going after a failing video instead of aborting the batch.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Draws progress through `progress`, e.g. a hidden target for non-interactive runs.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
        fs::create_dir_all(output_dir).map_err(|e| DepthMapError::FileSystem {
            path: output_dir.to_path_buf(),
            operation: "create output folder".to_string(),
            source: e,
        })?;
        let videos = collect_video_files(input_dir)?;

        if videos.is_empty() {
            log::warn!("No video files found in {}", input_dir.display());
            return Ok(BatchReport::default());
        }
        log::info!("Found {} videos in {}", videos.len(), input_dir.display());

        let videos_bar = self.progress.add(ProgressBar::new(videos.len() as u64));
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({eta})",
        ) {
            videos_bar.set_style(style.progress_chars("#>-"));
        }
        videos_bar.set_message("Processing videos");

        let mut report = BatchReport::default();
        for video in videos {
            let output = output_path_for(&video, output_dir);
            match self.pipeline.process_video(
                &self.backend,
                &video,
                &output,
                self.show_preview,
                &self.progress,
            ) {
                Ok(video_report) => report.completed.push((video, video_report)),
                Err(e) if self.continue_on_error => {
                    log::error!("Skipping {}: {}", video.display(), e);
                    report.failed.push((video, e));
                }
                Err(e) => {
                    videos_bar.abandon();
                    return Err(e);
                }
            }
            videos_bar.inc(1);
        }

        videos_bar.finish();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_supported_extensions() {
        let test_cases = vec![
            ("clip.mp4", true),
            ("clip.MP4", true),
            ("clip.avi", true),
            ("clip.Mov", true),
            (".mp4", true),
            ("archive.tar.MOV", true),
            ("clip.mkv", false),
            ("clip.gif", false),
            ("notes.txt", false),
            ("mp4", false),
            ("clip", false),
        ];

        for (filename, expected) in test_cases {
            assert_eq!(is_supported_video(Path::new(filename)), expected, "{}", filename);
        }
    }

    #[test]
    fn test_output_path_prefixes_file_name() {
        let output = output_path_for(Path::new("/videos/in/Clip One.MOV"), Path::new("/out"));
        assert_eq!(output, PathBuf::from("/out/processed_Clip One.MOV"));
    }

    #[test]
    fn test_collect_is_flat_and_filtered() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        for name in ["b.mp4", "a.AVI", "c.mov", "notes.txt", "anim.gif"] {
            fs::write(root.join(name), b"")?;
        }
        fs::create_dir_all(root.join("nested"))?;
        fs::write(root.join("nested").join("deep.mp4"), b"")?;
        fs::create_dir_all(root.join("folder.mp4"))?;

        let videos = collect_video_files(root)?;
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.AVI", "b.mp4", "c.mov"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_follows_symlinked_videos() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let storage = temp_dir.path().join("storage");
        let input = temp_dir.path().join("input");
        fs::create_dir_all(&storage)?;
        fs::create_dir_all(&input)?;
        fs::write(storage.join("real.mp4"), b"")?;
        std::os::unix::fs::symlink(storage.join("real.mp4"), input.join("clip.mp4"))?;
        std::os::unix::fs::symlink(storage.join("gone.mp4"), input.join("dangling.mp4"))?;
        std::os::unix::fs::symlink(&storage, input.join("linked_dir.mov"))?;

        let videos = collect_video_files(&input)?;
        assert_eq!(videos, vec![input.join("clip.mp4")]);
        Ok(())
    }

    #[test]
    fn test_collect_includes_bare_extension_name() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(".mp4"), b"")?;
        fs::write(temp_dir.path().join(".hidden"), b"")?;

        let videos = collect_video_files(temp_dir.path())?;
        assert_eq!(videos, vec![temp_dir.path().join(".mp4")]);
        Ok(())
    }

    #[test]
    fn test_collect_missing_folder_is_filesystem_error() {
        let result = collect_video_files(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(DepthMapError::FileSystem { .. })));
    }
}
