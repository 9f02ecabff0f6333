//! JSON configuration for the tracking engine.

use objtrack_marker::{Dictionary, DictionaryError, MarkerCascadeParams};
use objtrack_segment::SegmentationParams;
use objtrack_template::TemplateParams;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{SelectorParams, TrackingMode};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to load marker dictionary {path:?}: {source}")]
    Dictionary {
        path: PathBuf,
        #[source]
        source: DictionaryError,
    },
}

/// Engine parameters. Every field falls back to its default when omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Mode the engine starts in.
    pub mode: TrackingMode,
    pub marker: MarkerCascadeParams,
    /// Fiducial dictionary file; replaces `marker.fiducial.dictionary` once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_path: Option<PathBuf>,
    pub template: TemplateParams,
    pub segmentation: SegmentationParams,
    pub selector: SelectorParams,
}

impl TrackerConfig {
    /// Load a JSON config and resolve `dictionary_path` against the file's directory.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&raw)?;
        config.resolve_dictionary(base_dir(path))?;
        Ok(config)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_pretty(self, path.as_ref())
    }

    /// Load the dictionary named by `dictionary_path` into the fiducial stage.
    ///
    /// Relative paths are taken relative to `base`. A no-op without a path.
    pub fn resolve_dictionary(&mut self, base: &Path) -> Result<(), ConfigError> {
        let Some(rel) = self.dictionary_path.as_ref() else {
            return Ok(());
        };
        let path = base.join(rel);
        let dictionary = Dictionary::load_json(&path)
            .map_err(|source| ConfigError::Dictionary { path, source })?;
        self.marker.fiducial.dictionary = Some(dictionary);
        Ok(())
    }
}

pub(crate) fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

pub(crate) fn write_pretty<T: Serialize>(value: &T, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default_config() {
        let config: TrackerConfig = serde_json::from_str("{}").expect("json");
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.mode, TrackingMode::Marker);
        assert_eq!(config.template.accept_threshold, 0.6);
        assert_eq!(config.selector.min_size, 10.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{"mode": "sam2", "marker": {"code": {"enabled": false}}, "template": {"accept_threshold": 0.8}}"#,
        )
        .expect("json");
        assert_eq!(config.mode, TrackingMode::Segmentation);
        assert!(!config.marker.code.enabled);
        assert!(config.marker.contour.enabled);
        assert_eq!(config.template.accept_threshold, 0.8);
        assert_eq!(config.template.flat_tolerance, 1.0);
    }

    #[test]
    fn write_then_load_preserves_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("tracker.json");

        let mut config = TrackerConfig {
            mode: TrackingMode::Markerless,
            ..TrackerConfig::default()
        };
        config.marker.contour.min_area = 800.0;
        config.write_json(&path).expect("write");

        let loaded = TrackerConfig::load_json(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn dictionary_path_is_resolved_next_to_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("dict.json"),
            r#"{"name": "tiny", "marker_size": 4, "codes": [45169, 27075]}"#,
        )
        .expect("write dict");
        fs::write(
            dir.path().join("tracker.json"),
            r#"{"dictionary_path": "dict.json"}"#,
        )
        .expect("write config");

        let config = TrackerConfig::load_json(dir.path().join("tracker.json")).expect("load");
        let dict = config.marker.fiducial.dictionary.expect("dictionary");
        assert_eq!(dict.name, "tiny");
        assert_eq!(dict.codes.len(), 2);
    }

    #[test]
    fn missing_dictionary_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracker.json");
        fs::write(&path, r#"{"dictionary_path": "nope.json"}"#).expect("write");
        let err = TrackerConfig::load_json(&path).expect_err("missing dictionary");
        assert!(matches!(err, ConfigError::Dictionary { .. }));
    }
}
