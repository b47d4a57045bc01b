//! Demo binary: one effector sweeping over a cube.
//!
//! - `Space`: start/stop scrubbing
//! - `Left`/`Right`: step the scrub time
//! - `P`: toggle between playing and editing

use bevy::prelude::*;
use bevy_slicer::prelude::*;
use bevy_slicer::{names, ScrubState};

const SCRUB_STEP: f64 = 0.25;

#[derive(Component)]
struct DemoEffector;

#[derive(Component)]
struct DemoTarget;

#[derive(Resource, Default)]
struct ScrubCursor(f64);

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Bevy Slicer".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(SlicerPlugin::default())
        .init_resource::<ScrubCursor>()
        .insert_resource(LogTimer(Timer::from_seconds(1.0, TimerMode::Repeating)))
        .add_systems(Startup, setup)
        .add_systems(Update, (handle_scrub_input, toggle_play_mode, log_local_time))
        .run();
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    presets: Res<EffectorPresets>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-3.0, 3.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight::default(),
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let target = commands
        .spawn((
            DemoTarget,
            Name::new("Sliced Cube"),
            Mesh3d(meshes.add(Cuboid::new(1.0, 1.0, 1.0))),
            MeshMaterial3d(materials.add(Color::srgb(0.8, 0.7, 0.6))),
        ))
        .id();

    let settings = presets.get("wide_sweep").copied().unwrap_or_default();
    commands.spawn((
        DemoEffector,
        Name::new("Effector"),
        Effector::from_settings(&settings).with_targets([target]),
        Transform::from_xyz(0.0, 0.0, -1.0),
    ));
}

fn handle_scrub_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    effectors: Query<(Entity, &Effector), With<DemoEffector>>,
    mut cursor: ResMut<ScrubCursor>,
    mut messages: MessageWriter<TimeControlMessage>,
) {
    for (entity, effector) in &effectors {
        if keyboard.just_pressed(KeyCode::Space) {
            match effector.scrub_state() {
                ScrubState::Live => {
                    messages.write(TimeControlMessage::start(entity));
                    messages.write(TimeControlMessage::set_time(entity, cursor.0));
                }
                ScrubState::Scrubbing => {
                    messages.write(TimeControlMessage::stop(entity));
                }
            }
        }

        if effector.scrub_state() != ScrubState::Scrubbing {
            continue;
        }
        let step = if keyboard.just_pressed(KeyCode::ArrowRight) {
            SCRUB_STEP
        } else if keyboard.just_pressed(KeyCode::ArrowLeft) {
            -SCRUB_STEP
        } else {
            continue;
        };
        cursor.0 = (cursor.0 + step).max(0.0);
        messages.write(TimeControlMessage::set_time(entity, cursor.0));
    }
}

fn toggle_play_mode(keyboard: Res<ButtonInput<KeyCode>>, mut play_mode: ResMut<PlayMode>) {
    if keyboard.just_pressed(KeyCode::KeyP) {
        *play_mode = match *play_mode {
            PlayMode::Playing => PlayMode::Editing,
            PlayMode::Editing => PlayMode::Playing,
        };
        info!("Play mode: {:?}", *play_mode);
    }
}

#[derive(Resource)]
struct LogTimer(Timer);

fn log_local_time(
    time: Res<Time>,
    mut timer: ResMut<LogTimer>,
    targets: Query<&MaterialOverrides, With<DemoTarget>>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }
    for block in &targets {
        if let Some(local_time) = block.float(names::LOCAL_TIME) {
            info!("LocalTime = {:.2}", local_time);
        }
    }
}
