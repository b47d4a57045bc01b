//! Scrub/preview time source.
//!
//! A timeline collaborator can take over an effector's clock while it previews
//! or scrubs. The effector keeps resolving its own time until the collaborator
//! actually pushes a value with [`TimeControl::set_time`]; starting a control
//! session on its own changes nothing.

use bevy::prelude::*;

use crate::effector::Effector;

/// Whether the host is in live playback.
///
/// The live clock only feeds effectors while `Playing`; in `Editing` an
/// effector without a time override sits at zero.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
#[reflect(Resource)]
pub enum PlayMode {
    #[default]
    Playing,
    Editing,
}

impl PlayMode {
    pub fn is_playing(self) -> bool {
        self == Self::Playing
    }
}

/// Scrub session state, as last signalled by the timeline collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum ScrubState {
    #[default]
    Live,
    Scrubbing,
}

/// Hooks a timeline collaborator uses to drive an object's clock.
pub trait TimeControl {
    fn on_control_time_start(&mut self);
    fn on_control_time_stop(&mut self);
    fn set_time(&mut self, time: f64);
}

/// Sink for animatable properties discovered during a preview pass.
pub trait PropertyCollector {
    fn add_property(&mut self, target: Entity, name: &str);
}

/// Enumerates the properties an object wants tracked while a timeline previews it.
pub trait PropertyPreview {
    fn gather_properties(&self, director: Entity, collector: &mut dyn PropertyCollector);
}

/// Marks an unset override. Any negative value resolves to the live clock.
const UNSET: f32 = -1.0;

/// Externally injected time override plus the scrub state it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ControlTime {
    state: ScrubState,
    value: f32,
}

impl Default for ControlTime {
    fn default() -> Self {
        Self {
            state: ScrubState::Live,
            value: UNSET,
        }
    }
}

impl ControlTime {
    pub fn state(&self) -> ScrubState {
        self.state
    }

    /// The injected time, if one is in effect.
    pub fn override_value(&self) -> Option<f32> {
        (self.value >= 0.0).then_some(self.value)
    }

    /// Resolves the time an effector should run at this frame.
    pub fn effective_time(&self, playing: bool, clock: f32) -> f32 {
        match self.override_value() {
            Some(t) => t,
            None if playing => clock,
            None => 0.0,
        }
    }
}

impl TimeControl for ControlTime {
    fn on_control_time_start(&mut self) {
        // The override only kicks in once a time is pushed.
        self.state = ScrubState::Scrubbing;
    }

    fn on_control_time_stop(&mut self) {
        self.state = ScrubState::Live;
        self.value = UNSET;
    }

    fn set_time(&mut self, time: f64) {
        self.value = time as f32;
    }
}

/// A time control signal addressed to one effector entity.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct TimeControlMessage {
    pub target: Entity,
    pub command: TimeCommand,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeCommand {
    Start,
    Stop,
    SetTime(f64),
}

impl TimeControlMessage {
    pub fn start(target: Entity) -> Self {
        Self {
            target,
            command: TimeCommand::Start,
        }
    }

    pub fn stop(target: Entity) -> Self {
        Self {
            target,
            command: TimeCommand::Stop,
        }
    }

    pub fn set_time(target: Entity, time: f64) -> Self {
        Self {
            target,
            command: TimeCommand::SetTime(time),
        }
    }
}

/// Route timeline messages to the effectors they address.
pub fn apply_time_control_messages(
    mut messages: MessageReader<TimeControlMessage>,
    mut effectors: Query<&mut Effector>,
) {
    for message in messages.read() {
        let Ok(mut effector) = effectors.get_mut(message.target) else {
            warn!(
                "Time control {:?} sent to {:?}, which has no Effector",
                message.command, message.target
            );
            continue;
        };

        match message.command {
            TimeCommand::Start => {
                effector.on_control_time_start();
                debug!("Effector {:?}: time control started", message.target);
            }
            TimeCommand::Stop => {
                effector.on_control_time_stop();
                debug!("Effector {:?}: time control stopped", message.target);
            }
            TimeCommand::SetTime(time) => effector.set_time(time),
        }
    }
}
