//! The slicing effector component and its per-frame parameter sync.
//!
//! Each frame, after transforms settle, every [`Effector`] resolves its local
//! time and writes the same set of shader parameters into the
//! [`MaterialOverrides`] of each linked target entity.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::overrides::{names, MaterialOverrides};
use crate::time_control::{
    ControlTime, PlayMode, PropertyCollector, PropertyPreview, ScrubState, TimeControl,
};

#[cfg(feature = "editor")]
use crate::debug_grid::DebugGrid;

/// Added to the resolved time before it reaches the shader.
pub const LOCAL_TIME_BIAS: f32 = 10.0;

/// Drives the slicing shader on a set of linked renderable entities.
///
/// The slice region runs along the effector's local +Z axis, starting at
/// `offset` and extending `range` units. None of the values are validated;
/// whatever is configured reaches the shader as-is.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component, Default)]
#[require(Transform)]
#[cfg_attr(feature = "editor", require(DebugGrid))]
pub struct Effector {
    /// Length of the slice region along local +Z.
    pub range: f32,
    /// Start of the slice region along local +Z.
    pub offset: f32,
    pub density: f32,
    pub speed: f32,
    /// HDR color in linear space. Channels are not clamped.
    pub color: LinearRgba,
    /// Entities whose material overrides are written each frame.
    pub linked_targets: Vec<Entity>,
    #[reflect(ignore)]
    control: ControlTime,
}

impl Default for Effector {
    fn default() -> Self {
        Self::from_settings(&EffectorSettings::default())
    }
}

impl Effector {
    pub fn from_settings(settings: &EffectorSettings) -> Self {
        Self {
            range: settings.range,
            offset: settings.offset,
            density: settings.density,
            speed: settings.speed,
            color: settings.color,
            linked_targets: Vec::new(),
            control: ControlTime::default(),
        }
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = Entity>) -> Self {
        self.linked_targets = targets.into_iter().collect();
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_color(mut self, color: impl Into<LinearRgba>) -> Self {
        self.color = color.into();
        self
    }

    /// Snapshot of the tunable values, without the linked targets.
    pub fn settings(&self) -> EffectorSettings {
        EffectorSettings {
            range: self.range,
            offset: self.offset,
            density: self.density,
            speed: self.speed,
            color: self.color,
        }
    }

    /// Overwrite the tunable values, keeping linked targets and time control.
    pub fn apply_settings(&mut self, settings: &EffectorSettings) {
        self.range = settings.range;
        self.offset = settings.offset;
        self.density = settings.density;
        self.speed = settings.speed;
        self.color = settings.color;
    }

    pub fn control_time(&self) -> &ControlTime {
        &self.control
    }

    pub fn scrub_state(&self) -> ScrubState {
        self.control.state()
    }

    /// Time the effect runs at, before the shader bias.
    pub fn local_time(&self, playing: bool, clock: f32) -> f32 {
        self.control.effective_time(playing, clock)
    }

    /// The parameter set to push this frame.
    pub fn frame_params(&self, world_to_local: Mat4, local_time: f32) -> SliceParams {
        SliceParams {
            density: self.density,
            speed: self.speed,
            range: self.range,
            offset: self.offset,
            matrix: world_to_local,
            color: self.color,
            local_time: local_time + LOCAL_TIME_BIAS,
        }
    }
}

impl TimeControl for Effector {
    fn on_control_time_start(&mut self) {
        self.control.on_control_time_start();
    }

    fn on_control_time_stop(&mut self) {
        self.control.on_control_time_stop();
    }

    fn set_time(&mut self, time: f64) {
        self.control.set_time(time);
    }
}

impl PropertyPreview for Effector {
    /// Nothing on the effector is keyframed individually, so nothing is reported.
    fn gather_properties(&self, _director: Entity, _collector: &mut dyn PropertyCollector) {}
}

/// Serializable tuning values for an [`Effector`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Reflect)]
#[serde(default)]
pub struct EffectorSettings {
    pub range: f32,
    pub offset: f32,
    pub density: f32,
    pub speed: f32,
    pub color: LinearRgba,
}

impl Default for EffectorSettings {
    fn default() -> Self {
        Self {
            range: 1.0,
            offset: 0.0,
            density: 20.0,
            speed: 5.0,
            color: LinearRgba::NONE,
        }
    }
}

/// One frame's worth of shader parameters, shared by every target of an effector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceParams {
    pub density: f32,
    pub speed: f32,
    pub range: f32,
    pub offset: f32,
    pub matrix: Mat4,
    pub color: LinearRgba,
    /// Already biased by [`LOCAL_TIME_BIAS`].
    pub local_time: f32,
}

impl SliceParams {
    pub fn write_into(&self, block: &mut MaterialOverrides) {
        block.set_float(names::DENSITY, self.density);
        block.set_float(names::SPEED, self.speed);
        block.set_float(names::EFFECTOR_RANGE, self.range);
        block.set_float(names::EFFECTOR_OFFSET, self.offset);
        block.set_matrix(names::EFFECTOR_MATRIX, self.matrix);
        block.set_color(names::EFFECTOR_COLOR, self.color);
        block.set_float(names::LOCAL_TIME, self.local_time);
    }

    pub fn to_overrides(&self) -> MaterialOverrides {
        let mut block = MaterialOverrides::new();
        self.write_into(&mut block);
        block
    }
}

/// Push every effector's parameters into its linked targets.
///
/// Runs after transform propagation so the world-to-local matrix reflects
/// this frame's placement.
pub fn sync_effector_params(
    mut commands: Commands,
    time: Res<Time>,
    play_mode: Res<PlayMode>,
    effectors: Query<(Entity, &Effector, &GlobalTransform)>,
    mut targets: Query<Option<&mut MaterialOverrides>>,
) {
    let playing = play_mode.is_playing();
    let clock = time.elapsed_secs();

    for (entity, effector, global) in &effectors {
        if effector.linked_targets.is_empty() {
            continue;
        }

        let world_to_local = Mat4::from(global.affine().inverse());
        let params = effector.frame_params(world_to_local, effector.local_time(playing, clock));

        for &target in &effector.linked_targets {
            match targets.get_mut(target) {
                Ok(Some(mut block)) => params.write_into(&mut block),
                Ok(None) => {
                    commands.entity(target).try_insert(params.to_overrides());
                }
                Err(_) => {
                    debug!("Effector {:?}: linked target {:?} is gone", entity, target);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::transform::{TransformPlugin, TransformSystems};

    use super::*;
    use crate::time_control::{apply_time_control_messages, TimeControlMessage};

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(TransformPlugin)
            .init_resource::<Time>()
            .init_resource::<PlayMode>()
            .add_message::<TimeControlMessage>()
            .add_systems(Update, apply_time_control_messages)
            .add_systems(
                PostUpdate,
                sync_effector_params.after(TransformSystems::Propagate),
            );
        app
    }

    fn set_clock(app: &mut App, secs: f32) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_to(Duration::from_secs_f32(secs));
    }

    fn scenario_effector(target: Entity) -> Effector {
        Effector {
            range: 2.0,
            offset: 1.0,
            density: 10.0,
            speed: 3.0,
            color: LinearRgba::new(1.0, 0.0, 0.0, 1.0),
            ..default()
        }
        .with_targets([target])
    }

    fn overrides(app: &App, target: Entity) -> MaterialOverrides {
        app.world()
            .get::<MaterialOverrides>(target)
            .cloned()
            .expect("target should carry overrides")
    }

    #[test]
    fn defaults_match_inspector_values() {
        let effector = Effector::default();
        assert_eq!(effector.range, 1.0);
        assert_eq!(effector.offset, 0.0);
        assert_eq!(effector.density, 20.0);
        assert_eq!(effector.speed, 5.0);
        assert_eq!(effector.color, LinearRgba::NONE);
        assert!(effector.linked_targets.is_empty());
    }

    #[test]
    fn frame_params_bias_time() {
        let params = Effector::default().frame_params(Mat4::IDENTITY, 2.5);
        assert_eq!(params.local_time, 12.5);
    }

    #[test]
    fn write_into_sets_exactly_seven_params() {
        let params = scenario_effector(Entity::PLACEHOLDER).frame_params(Mat4::IDENTITY, 5.0);
        let block = params.to_overrides();
        assert_eq!(block.len(), names::ALL.len());
        for name in names::ALL {
            assert!(block.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn write_into_keeps_unrelated_params() {
        let mut block = MaterialOverrides::new();
        block.set_float("Glossiness", 0.25);
        Effector::default()
            .frame_params(Mat4::IDENTITY, 0.0)
            .write_into(&mut block);
        assert_eq!(block.float("Glossiness"), Some(0.25));
        assert_eq!(block.len(), 8);
    }

    #[test]
    fn live_sync_writes_all_params() {
        let mut app = test_app();
        let target = app.world_mut().spawn_empty().id();
        let effector = app
            .world_mut()
            .spawn((scenario_effector(target), Transform::from_xyz(1.0, 2.0, 3.0)))
            .id();
        set_clock(&mut app, 5.0);
        app.update();

        let block = overrides(&app, target);
        assert_eq!(block.len(), 7);
        assert_eq!(block.float(names::EFFECTOR_RANGE), Some(2.0));
        assert_eq!(block.float(names::EFFECTOR_OFFSET), Some(1.0));
        assert_eq!(block.float(names::DENSITY), Some(10.0));
        assert_eq!(block.float(names::SPEED), Some(3.0));
        assert_eq!(
            block.color(names::EFFECTOR_COLOR),
            Some(LinearRgba::new(1.0, 0.0, 0.0, 1.0))
        );
        assert_eq!(block.float(names::LOCAL_TIME), Some(15.0));

        let global = app.world().get::<GlobalTransform>(effector).unwrap();
        let expected = Mat4::from(global.affine().inverse());
        let matrix = block.matrix(names::EFFECTOR_MATRIX).unwrap();
        assert!(matrix.abs_diff_eq(expected, 1e-6));
        assert!(matrix
            .transform_point3(Vec3::new(1.0, 2.0, 3.0))
            .abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn empty_targets_touch_nothing() {
        let mut app = test_app();
        let bystander = app.world_mut().spawn_empty().id();
        app.world_mut().spawn(Effector::default());
        app.update();
        assert!(app.world().get::<MaterialOverrides>(bystander).is_none());
    }

    #[test]
    fn scrub_time_overrides_clock_until_stop() {
        let mut app = test_app();
        let target = app.world_mut().spawn_empty().id();
        let effector = app.world_mut().spawn(scenario_effector(target)).id();
        set_clock(&mut app, 5.0);

        app.world_mut()
            .write_message(TimeControlMessage::set_time(effector, 2.5));
        app.update();
        assert_eq!(overrides(&app, target).float(names::LOCAL_TIME), Some(12.5));

        app.world_mut()
            .write_message(TimeControlMessage::stop(effector));
        app.update();
        assert_eq!(overrides(&app, target).float(names::LOCAL_TIME), Some(15.0));
    }

    #[test]
    fn scrub_start_alone_keeps_live_time() {
        let mut app = test_app();
        let target = app.world_mut().spawn_empty().id();
        let effector = app.world_mut().spawn(scenario_effector(target)).id();
        set_clock(&mut app, 5.0);

        app.world_mut()
            .write_message(TimeControlMessage::start(effector));
        app.update();
        assert_eq!(overrides(&app, target).float(names::LOCAL_TIME), Some(15.0));
        assert_eq!(
            app.world().get::<Effector>(effector).unwrap().scrub_state(),
            ScrubState::Scrubbing
        );
    }

    #[test]
    fn editing_mode_pins_time_to_zero() {
        let mut app = test_app();
        app.insert_resource(PlayMode::Editing);
        let target = app.world_mut().spawn_empty().id();
        let effector = app.world_mut().spawn(scenario_effector(target)).id();
        set_clock(&mut app, 5.0);
        app.update();
        assert_eq!(overrides(&app, target).float(names::LOCAL_TIME), Some(10.0));

        // An override still applies outside playback.
        app.world_mut()
            .write_message(TimeControlMessage::set_time(effector, 1.0));
        app.update();
        assert_eq!(overrides(&app, target).float(names::LOCAL_TIME), Some(11.0));
    }

    #[test]
    fn existing_block_is_updated_in_place() {
        let mut app = test_app();
        let mut block = MaterialOverrides::new();
        block.set_float("Glossiness", 0.5);
        let target = app.world_mut().spawn(block).id();
        app.world_mut().spawn(scenario_effector(target));
        app.update();

        let block = overrides(&app, target);
        assert_eq!(block.float("Glossiness"), Some(0.5));
        assert_eq!(block.float(names::DENSITY), Some(10.0));
    }

    #[test]
    fn every_target_gets_the_same_params() {
        let mut app = test_app();
        let a = app.world_mut().spawn_empty().id();
        let b = app.world_mut().spawn_empty().id();
        app.world_mut()
            .spawn(scenario_effector(a).with_targets([a, b]));
        set_clock(&mut app, 1.0);
        app.update();
        assert_eq!(overrides(&app, a), overrides(&app, b));
    }

    #[test]
    fn despawned_target_is_skipped() {
        let mut app = test_app();
        let gone = app.world_mut().spawn_empty().id();
        app.world_mut().despawn(gone);
        let live = app.world_mut().spawn_empty().id();
        app.world_mut()
            .spawn(scenario_effector(gone).with_targets([gone, live]));
        app.update();
        assert!(app.world().get::<MaterialOverrides>(live).is_some());
    }

    #[test]
    fn config_is_not_mutated_by_sync() {
        let mut app = test_app();
        let target = app.world_mut().spawn_empty().id();
        let effector = app.world_mut().spawn(scenario_effector(target)).id();
        app.update();
        let after = app.world().get::<Effector>(effector).unwrap();
        assert_eq!(after.settings(), scenario_effector(target).settings());
        assert_eq!(after.linked_targets, vec![target]);
    }

    #[test]
    fn gather_properties_reports_nothing() {
        struct Counter(usize);
        impl PropertyCollector for Counter {
            fn add_property(&mut self, _target: Entity, _name: &str) {
                self.0 += 1;
            }
        }

        let mut counter = Counter(0);
        Effector::default().gather_properties(Entity::PLACEHOLDER, &mut counter);
        assert_eq!(counter.0, 0);
    }

    #[test]
    fn settings_round_trip_through_component() {
        let settings = EffectorSettings {
            range: 4.0,
            offset: -1.0,
            density: 3.0,
            speed: 0.5,
            color: LinearRgba::new(8.0, 4.0, 0.0, 1.0),
        };
        let mut effector = Effector::from_settings(&settings).with_targets([Entity::PLACEHOLDER]);
        assert_eq!(effector.settings(), settings);

        effector.set_time(3.0);
        effector.apply_settings(&EffectorSettings::default());
        assert_eq!(effector.linked_targets.len(), 1);
        assert_eq!(effector.control_time().override_value(), Some(3.0));
    }
}
