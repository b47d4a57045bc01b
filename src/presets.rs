//! Named effector presets, built in and loaded from RON files on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use thiserror::Error;

use crate::effector::EffectorSettings;

/// File suffix for preset files.
pub const PRESET_SUFFIX: &str = ".slicer.ron";

/// Default directory presets are read from.
pub const DEFAULT_PRESET_DIR: &str = "assets/slicer";

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to read preset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse preset {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Library of named effector presets.
#[derive(Resource, Debug, Clone, Default)]
pub struct EffectorPresets {
    pub presets: HashMap<String, EffectorSettings>,
}

impl EffectorPresets {
    pub fn get(&self, name: &str) -> Option<&EffectorSettings> {
        self.presets.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, settings: EffectorSettings) {
        self.presets.insert(name.into(), settings);
    }
}

/// Presets shipped with the crate.
pub fn default_presets() -> Vec<(&'static str, EffectorSettings)> {
    vec![
        ("default", EffectorSettings::default()),
        (
            "wide_sweep",
            EffectorSettings {
                range: 4.0,
                offset: -2.0,
                density: 8.0,
                speed: 2.0,
                color: LinearRgba::new(0.2, 0.6, 3.0, 1.0),
            },
        ),
        (
            "fast_scan",
            EffectorSettings {
                range: 0.5,
                offset: 0.0,
                density: 40.0,
                speed: 12.0,
                color: LinearRgba::new(4.0, 1.0, 0.2, 1.0),
            },
        ),
    ]
}

/// Parse preset settings from RON. Missing fields take their defaults.
pub fn parse_preset(source: &str) -> Result<EffectorSettings, ron::error::SpannedError> {
    ron::from_str(source)
}

pub fn load_preset(path: &Path) -> Result<EffectorSettings, PresetError> {
    let contents = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_preset(&contents).map_err(|source| PresetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Preset name for a file path, if the file is a preset.
fn preset_name(path: &Path) -> Option<String> {
    let fname = path.file_name()?.to_str()?;
    let name = fname.strip_suffix(PRESET_SUFFIX)?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Load every preset in `dir` into `library`, returning how many were loaded.
///
/// Unreadable or malformed files are logged and skipped.
pub fn load_presets_from_dir(dir: &Path, library: &mut EffectorPresets) -> usize {
    if !dir.is_dir() {
        return 0;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        warn!("Failed to read preset directory {:?}", dir);
        return 0;
    };

    let mut loaded = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = preset_name(&path) else {
            continue;
        };
        match load_preset(&path) {
            Ok(settings) => {
                library.insert(name, settings);
                loaded += 1;
            }
            Err(e) => warn!("{}", e),
        }
    }
    loaded
}

/// Where [`init_effector_presets`] looks for preset files.
#[derive(Resource, Debug, Clone, Default)]
pub struct PresetDir(pub Option<PathBuf>);

pub fn init_effector_presets(mut library: ResMut<EffectorPresets>, dir: Res<PresetDir>) {
    for (name, settings) in default_presets() {
        library.presets.entry(name.to_string()).or_insert(settings);
    }
    if let Some(dir) = &dir.0 {
        let loaded = load_presets_from_dir(dir, &mut library);
        if loaded > 0 {
            info!("Loaded {} slicer preset(s) from {:?}", loaded, dir);
        }
    }
}
