//! Keyboard-driven character movement.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};
use lf_core::animation::{ActionId, AnimationMixer, ClipInfo};
use lf_core::input::{InputState, Key, DIRECTIONAL_KEYS};
use lf_physics::PhysicsWorld;
use lf_render::SceneGraph;

use crate::binder::Entity;

pub const IDLE_CLIP: &str = "Idle";

/// Clip name to mixer action, built once from the clips bundled with the model.
pub type AnimationClipMap = HashMap<String, ActionId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocomotionState {
    #[default]
    Idle,
    Walk,
    Run,
}

impl LocomotionState {
    pub fn from_input(input: &InputState) -> Self {
        match (input.any_directional_held(), input.sprint_held()) {
            (true, true) => Self::Run,
            (true, false) => Self::Walk,
            (false, _) => Self::Idle,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Walk => "Walk",
            Self::Run => "Run",
        }
    }
}

/// The controllable character: one bound entity plus its animation state.
pub struct CharacterRig {
    pub entity: Entity,
    pub clips: AnimationClipMap,
    pub mixer: AnimationMixer,
    /// Clip most recently selected by the director.
    pub current_clip: Option<ActionId>,
    /// Yaw in radians, set from input.
    pub facing: f32,
    pub locomotion: LocomotionState,
}

impl CharacterRig {
    /// Register every clip and start `Idle` if the model has one.
    pub fn new(entity: Entity, clips: &[ClipInfo]) -> Self {
        let mut mixer = AnimationMixer::new();
        let mut map = AnimationClipMap::new();
        for clip in clips {
            let id = mixer.add_clip(clip.clone());
            map.insert(clip.name.clone(), id);
        }

        let current_clip = map.get(IDLE_CLIP).copied();
        match current_clip.and_then(|id| mixer.action_mut(id)) {
            Some(action) => {
                action.play();
            }
            None if clips.is_empty() => log::warn!("Character model has no animations"),
            None => log::warn!("Character model has no '{}' clip", IDLE_CLIP),
        }

        Self {
            entity,
            clips: map,
            mixer,
            current_clip,
            facing: 0.0,
            locomotion: LocomotionState::Idle,
        }
    }

    pub fn position(&self, scene: &SceneGraph) -> Option<Vec3> {
        scene.mesh(self.entity.mesh).map(|node| node.transform.translation)
    }

    pub fn current_clip_name(&self) -> Option<&str> {
        let id = self.current_clip?;
        self.mixer.action(id).map(|action| action.clip.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutcome {
    /// Any directional key was held.
    pub is_moving: bool,
    /// Unit direction of the last directional key applied.
    pub direction: Vec3,
    pub speed: f32,
    pub velocity: Vec3,
    /// Facing chosen this tick; `None` keeps the previous one.
    pub facing: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterController {
    pub walk_speed: f32,
    pub run_speed: f32,
}

impl CharacterController {
    pub fn new(walk_speed: f32, run_speed: f32) -> Self {
        Self {
            walk_speed,
            run_speed,
        }
    }

    /// Turn held keys into a velocity. Keys are applied in
    /// [`DIRECTIONAL_KEYS`] order and each one overwrites its axis and the
    /// facing, so later keys win. `vertical` passes through untouched.
    pub fn resolve(&self, input: &InputState, vertical: f32) -> ControlOutcome {
        let speed = if input.sprint_held() {
            self.run_speed
        } else {
            self.walk_speed
        };

        let mut outcome = ControlOutcome {
            is_moving: false,
            direction: Vec3::ZERO,
            speed,
            velocity: Vec3::new(0.0, vertical, 0.0),
            facing: None,
        };
        for key in DIRECTIONAL_KEYS {
            if !input.is_held(key) {
                continue;
            }
            let (direction, facing) = match key {
                Key::ArrowUp => (Vec3::NEG_Z, 0.0),
                Key::ArrowDown => (Vec3::Z, PI),
                Key::ArrowLeft => (Vec3::NEG_X, FRAC_PI_2),
                Key::ArrowRight => (Vec3::X, -FRAC_PI_2),
                _ => continue,
            };
            if direction.x != 0.0 {
                outcome.velocity.x = direction.x * speed;
            } else {
                outcome.velocity.z = direction.z * speed;
            }
            outcome.direction = direction;
            outcome.facing = Some(facing);
            outcome.is_moving = true;
        }
        outcome
    }

    /// Apply input to the rig: write the body velocity, then move the mesh to
    /// the body and turn it to face the input direction.
    pub fn step(
        &self,
        input: &InputState,
        rig: &mut CharacterRig,
        physics: &mut PhysicsWorld,
        scene: &mut SceneGraph,
    ) -> ControlOutcome {
        let vertical = physics
            .body(rig.entity.body)
            .map_or(0.0, |body| body.velocity.y);
        let outcome = self.resolve(input, vertical);
        physics.set_velocity(rig.entity.body, outcome.velocity);

        if let Some(facing) = outcome.facing {
            rig.facing = facing;
        }
        rig.locomotion = LocomotionState::from_input(input);

        if let (Some(body), Some(node)) = (physics.body(rig.entity.body), scene.mesh_mut(rig.entity.mesh)) {
            node.transform.translation = body.position - rig.entity.anchor;
            node.transform.rotation = Quat::from_rotation_y(rig.facing);
        }
        outcome
    }
}
