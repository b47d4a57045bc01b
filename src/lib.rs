//! # bevy_slicer
//!
//! Drives a slicing shader effect from an [`Effector`] entity.
//!
//! Every frame, after transforms propagate, each effector writes its range,
//! offset, density, speed, color, world-to-local matrix, and local time into
//! the [`MaterialOverrides`] of every entity it links to. A renderer reads
//! those overrides by name.
//!
//! A timeline can take over an effector's clock for scrubbing by sending
//! [`TimeControlMessage`]s, or by calling the [`TimeControl`] hooks directly.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_slicer::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins((DefaultPlugins, SlicerPlugin::default()))
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands) {
//!     let target = commands.spawn(Name::new("Sliced")).id();
//!     commands.spawn((
//!         Effector::default().with_range(2.0).with_targets([target]),
//!         Transform::from_xyz(0.0, 1.0, 0.0),
//!     ));
//! }
//! ```
//!
//! ## Editor visualization
//!
//! With the `editor` feature (on by default) and gizmos available, each
//! effector draws a grid at both ends of its slice region.

use std::path::PathBuf;

use bevy::prelude::*;
use bevy::transform::TransformSystems;

#[cfg(feature = "editor")]
pub mod debug_grid;
pub mod effector;
pub mod overrides;
pub mod presets;
pub mod time_control;

pub use effector::{sync_effector_params, Effector, EffectorSettings, SliceParams, LOCAL_TIME_BIAS};
pub use overrides::{names, MaterialOverrides, ShaderParam};
pub use presets::{EffectorPresets, PresetError};
pub use time_control::{
    ControlTime, PlayMode, PropertyCollector, PropertyPreview, ScrubState, TimeCommand,
    TimeControl, TimeControlMessage,
};

pub mod prelude {
    pub use crate::{
        Effector, EffectorPresets, EffectorSettings, MaterialOverrides, PlayMode, SlicerPlugin,
        TimeControl, TimeControlMessage,
    };
}

/// System sets for ordering against the slicer.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlicerSystems {
    /// Applies timeline messages (`Update`).
    TimeControl,
    /// Writes material overrides (`PostUpdate`, after transform propagation).
    Sync,
}

/// Registers the effector, its time control, and its editor gizmos.
pub struct SlicerPlugin {
    /// Directory scanned for `*.slicer.ron` presets at startup. `None` skips disk loading.
    pub preset_dir: Option<PathBuf>,
}

impl Default for SlicerPlugin {
    fn default() -> Self {
        Self {
            preset_dir: Some(PathBuf::from(presets::DEFAULT_PRESET_DIR)),
        }
    }
}

impl Plugin for SlicerPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Effector>()
            .register_type::<EffectorSettings>()
            .register_type::<PlayMode>()
            .register_type::<ScrubState>()
            .init_resource::<PlayMode>()
            .init_resource::<EffectorPresets>()
            .insert_resource(presets::PresetDir(self.preset_dir.clone()))
            .add_message::<TimeControlMessage>()
            .configure_sets(PostUpdate, SlicerSystems::Sync.after(TransformSystems::Propagate))
            .add_systems(PreStartup, presets::init_effector_presets)
            .add_systems(
                Update,
                time_control::apply_time_control_messages.in_set(SlicerSystems::TimeControl),
            )
            .add_systems(
                PostUpdate,
                sync_effector_params
                    .in_set(SlicerSystems::Sync)
                    .run_if(any_with_component::<Effector>),
            );

        #[cfg(feature = "editor")]
        app.add_observer(debug_grid::release_debug_grid)
            .add_observer(debug_grid::release_effector_grid);
    }

    // Gizmo support is decided once every plugin is in, so plugin order
    // doesn't matter.
    #[cfg(feature = "editor")]
    fn finish(&self, app: &mut App) {
        if !app.is_plugin_added::<bevy::gizmos::GizmoPlugin>() {
            debug!("Gizmos unavailable, slicer debug grid disabled");
            return;
        }
        app.add_systems(
            PostUpdate,
            (debug_grid::prepare_debug_grids, debug_grid::draw_effector_gizmos)
                .chain()
                .after(TransformSystems::Propagate),
        );
    }
}
