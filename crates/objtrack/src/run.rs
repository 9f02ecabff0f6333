//! Batch runner: track over a list of image files and report per-frame results.

use log::{debug, info};
use objtrack_core::{DetectionResult, Rect};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use crate::config::{base_dir, write_pretty};
use crate::interop::{load_frame, save_frame, InteropError};
use crate::{ConfigError, TrackerConfig, TrackingEngine, TrackingMode};

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{path:?}: {source}")]
    Frame {
        path: PathBuf,
        #[source]
        source: InteropError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Region captured as the markerless template before the first frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateCapture {
    pub frame: PathBuf,
    pub rect: Rect,
}

/// Inputs of a batch run. Relative paths are resolved against the config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub frames: Vec<PathBuf>,
    /// Where annotated PNGs are written; nothing is written when absent.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Overrides `tracker.mode`.
    #[serde(default)]
    pub mode: Option<TrackingMode>,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub template: Option<TemplateCapture>,
    #[serde(default)]
    pub segmentation_payload: Option<PathBuf>,
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl RunConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&raw)?;
        config.resolve_paths(base_dir(path))?;
        Ok(config)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_pretty(self, path.as_ref())
    }

    /// Make every path absolute-or-relative-to-`base` and load the dictionary.
    pub fn resolve_paths(&mut self, base: &Path) -> Result<(), ConfigError> {
        let join = |p: &mut PathBuf| *p = base.join(&*p);
        self.frames.iter_mut().for_each(join);
        self.output_dir
            .iter_mut()
            .chain(self.segmentation_payload.iter_mut())
            .chain(self.report_path.iter_mut())
            .chain(self.template.iter_mut().map(|t| &mut t.frame))
            .for_each(join);
        self.tracker.resolve_dictionary(base)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub path: PathBuf,
    pub result: DetectionResult,
    pub elapsed_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: TrackingMode,
    /// Marker stages that were available for this run.
    pub stages: Vec<String>,
    pub frames: Vec<FrameReport>,
}

impl RunReport {
    pub fn found_count(&self) -> usize {
        self.frames.iter().filter(|f| f.result.is_found()).count()
    }
}

fn load(path: &Path) -> Result<objtrack_core::Frame, RunError> {
    load_frame(path).map_err(|source| RunError::Frame {
        path: path.to_path_buf(),
        source,
    })
}

fn annotated_path(dir: &Path, frame: &Path, index: usize) -> PathBuf {
    let stem = frame
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("frame_{index:04}"));
    dir.join(format!("{stem}_tracked.png"))
}

/// Run the engine over `config.frames` in order.
///
/// The mode override is applied before the template is captured and the
/// segmentation payload is loaded, so both survive into the run.
pub fn run(config: &RunConfig) -> Result<RunReport, RunError> {
    let mut engine = TrackingEngine::new(&config.tracker);
    if let Some(mode) = config.mode {
        engine.set_mode(mode);
    }
    if let Some(capture) = &config.template {
        let frame = load(&capture.frame)?;
        engine.set_template(capture.rect, &frame.view());
    }
    if let Some(path) = &config.segmentation_payload {
        let payload = fs::read(path)?;
        engine.load_segmentation_data(&payload);
    }
    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir)?;
    }

    let mut frames = Vec::with_capacity(config.frames.len());
    for (index, path) in config.frames.iter().enumerate() {
        let frame = load(path)?;
        let started = Instant::now();
        let outcome = engine.process_frame(&frame.view());
        let elapsed_ms = started.elapsed().as_secs_f64() * 1e3;
        debug!(
            "{}: found={} in {elapsed_ms:.2} ms",
            path.display(),
            outcome.result.is_found()
        );

        let annotated = match &config.output_dir {
            Some(dir) => {
                let out = annotated_path(dir, path, index);
                save_frame(&outcome.annotated, &out).map_err(|source| RunError::Frame {
                    path: out.clone(),
                    source,
                })?;
                Some(out)
            }
            None => None,
        };

        frames.push(FrameReport {
            path: path.clone(),
            result: outcome.result,
            elapsed_ms,
            annotated,
        });
    }

    let report = RunReport {
        mode: engine.mode(),
        stages: engine
            .cascade()
            .available_stages()
            .into_iter()
            .map(str::to_owned)
            .collect(),
        frames,
    };
    info!(
        "{} mode: {}/{} frames tracked",
        report.mode,
        report.found_count(),
        report.frames.len()
    );

    if let Some(path) = &config.report_path {
        write_pretty(&report, path)?;
    }
    Ok(report)
}
