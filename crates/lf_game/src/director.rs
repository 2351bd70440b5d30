//! Chooses and cross-fades the character's animation clip.

use crate::character::{CharacterRig, IDLE_CLIP};
use crate::config::ClipPolicy;

pub const WALK_CLIP: &str = "Walk";
pub const RUN_CLIP: &str = "Run";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationDirector {
    pub fade_seconds: f32,
    /// Speeds above this pick the run clip.
    pub walk_speed: f32,
    pub policy: ClipPolicy,
}

impl AnimationDirector {
    pub fn new(fade_seconds: f32, walk_speed: f32, policy: ClipPolicy) -> Self {
        Self {
            fade_seconds,
            walk_speed,
            policy,
        }
    }

    pub fn target_clip(&self, is_moving: bool, speed: f32) -> &'static str {
        let locomotion = if speed > self.walk_speed {
            RUN_CLIP
        } else {
            WALK_CLIP
        };
        match (self.policy, is_moving) {
            (ClipPolicy::Literal, false) | (ClipPolicy::Corrected, true) => locomotion,
            (ClipPolicy::Literal, true) | (ClipPolicy::Corrected, false) => IDLE_CLIP,
        }
    }

    /// Switch to the clip for this tick's input. A change of clip fades the
    /// previous one out while the new one fades in; the fade is started once
    /// per change, not every tick. A selected clip that has stopped is
    /// restarted. Missing clips are ignored.
    pub fn step(&self, rig: &mut CharacterRig, is_moving: bool, speed: f32) {
        let name = self.target_clip(is_moving, speed);
        let Some(&target) = rig.clips.get(name) else {
            return;
        };

        if rig.current_clip == Some(target) {
            if let Some(action) = rig.mixer.action_mut(target) {
                if !action.is_running() {
                    action.reset().fade_in(self.fade_seconds).play();
                }
            }
            return;
        }

        if let Some(previous) = rig.current_clip.and_then(|id| rig.mixer.action_mut(id)) {
            if previous.is_running() {
                previous.fade_out(self.fade_seconds);
            }
        }
        if let Some(action) = rig.mixer.action_mut(target) {
            action.reset().fade_in(self.fade_seconds).play();
        }
        log::trace!("Animation -> {}", name);
        rig.current_clip = Some(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder;
    use glam::Vec3;
    use lf_core::animation::ClipInfo;
    use lf_core::color::Color;
    use lf_physics::{PhysicsConfig, PhysicsWorld};
    use lf_render::{Geometry, Material, SceneGraph};

    fn rig() -> CharacterRig {
        let mut scene = SceneGraph::new(Color::BLACK);
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let geometry = scene.add_geometry(Geometry::cuboid(Vec3::splat(0.5)));
        let material = scene.add_material(Material { color: Color::WHITE });
        let entity = binder::spawn(&mut scene, &mut physics, geometry, material, Vec3::ONE, 1.0).unwrap();
        let clips: Vec<ClipInfo> = ["Idle", "Walk", "Run"]
            .iter()
            .map(|name| ClipInfo {
                name: name.to_string(),
                duration: 1.0,
            })
            .collect();
        CharacterRig::new(entity, &clips)
    }

    fn running_clips(rig: &CharacterRig) -> Vec<&str> {
        let mut names: Vec<&str> = rig.mixer.running().map(|(_, a)| a.clip.name.as_str()).collect();
        names.sort();
        names
    }

    #[test]
    fn literal_policy_picks_idle_while_moving() {
        let director = AnimationDirector::new(0.2, 2.0, ClipPolicy::Literal);
        assert_eq!(director.target_clip(true, 2.0), "Idle");
        assert_eq!(director.target_clip(true, 5.0), "Idle");
        assert_eq!(director.target_clip(false, 2.0), "Walk");
        assert_eq!(director.target_clip(false, 5.0), "Run");
    }

    #[test]
    fn corrected_policy_picks_locomotion_while_moving() {
        let director = AnimationDirector::new(0.2, 2.0, ClipPolicy::Corrected);
        assert_eq!(director.target_clip(false, 5.0), "Idle");
        assert_eq!(director.target_clip(true, 2.0), "Walk");
        assert_eq!(director.target_clip(true, 5.0), "Run");
    }

    #[test]
    fn change_of_clip_overlaps_fades() {
        let director = AnimationDirector::new(0.2, 2.0, ClipPolicy::Corrected);
        let mut rig = rig();
        director.step(&mut rig, true, 2.0);

        assert_eq!(rig.current_clip_name(), Some("Walk"));
        assert_eq!(running_clips(&rig), ["Idle", "Walk"]);
        let idle = rig.mixer.action(rig.clips["Idle"]).unwrap();
        let walk = rig.mixer.action(rig.clips["Walk"]).unwrap();
        assert!(idle.is_fading() && walk.is_fading());
        assert_eq!(walk.weight, 0.0);

        rig.mixer.update(0.25);
        assert_eq!(running_clips(&rig), ["Walk"]);
        assert_eq!(rig.mixer.action(rig.clips["Walk"]).unwrap().weight, 1.0);
    }

    #[test]
    fn fade_is_not_restarted_on_following_ticks() {
        let director = AnimationDirector::new(0.2, 2.0, ClipPolicy::Corrected);
        let mut rig = rig();
        director.step(&mut rig, true, 2.0);
        rig.mixer.update(0.1);
        director.step(&mut rig, true, 2.0);
        let walk = rig.mixer.action(rig.clips["Walk"]).unwrap();
        assert!(walk.time > 0.0);
        assert!(walk.weight > 0.4);
    }

    #[test]
    fn stopped_current_clip_is_restarted() {
        let director = AnimationDirector::new(0.2, 2.0, ClipPolicy::Corrected);
        let mut rig = rig();
        let idle = rig.clips["Idle"];
        rig.mixer.action_mut(idle).unwrap().stop();
        director.step(&mut rig, false, 2.0);
        let action = rig.mixer.action(idle).unwrap();
        assert!(action.is_running());
        assert!(action.is_fading());
    }

    #[test]
    fn missing_clip_leaves_rig_untouched() {
        let director = AnimationDirector::new(0.2, 2.0, ClipPolicy::Corrected);
        let mut rig = rig();
        rig.clips.remove("Run");
        director.step(&mut rig, true, 5.0);
        assert_eq!(rig.current_clip_name(), Some("Idle"));
        assert_eq!(running_clips(&rig), ["Idle"]);
    }
}
