//! Rigid-body simulation capability.
//!
//! Every body is a single box collider. The world owns body lifetime: a body
//! stays simulated until [`PhysicsWorld::remove_body`] is called, so callers
//! that discard a handle without removing it leak simulation state.
//!
//! Stepping follows the accumulator model: wall-clock time is banked and
//! consumed in fixed slices, at most `max_sub_steps` per call. Leftover time
//! beyond the cap is dropped so a slow frame cannot snowball.

mod convert;

use convert::{quat, vec3, vector};
use glam::{Quat, Vec3};
use rapier3d::prelude::{
    BroadPhaseMultiSap, CCDSolver, ColliderBuilder, ColliderSet, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, Real,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet, Vector,
};

/// Smallest half extent handed to the collider builder. Flat geometry (a
/// plane, a glyph with no depth) would otherwise produce a degenerate box.
const MIN_HALF_EXTENT: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    pub friction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.82, 0.0),
            friction: 0.4,
        }
    }
}

/// Box body description. `mass == 0` means static.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxBodyDesc {
    pub half_extents: Vec3,
    pub position: Vec3,
    pub mass: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

/// Snapshot of one body's kinematic state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub is_static: bool,
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    friction: f32,
    accumulator: f32,
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            gravity: vector(config.gravity),
            friction: config.friction,
            accumulator: 0.0,
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    pub fn add_box(&mut self, desc: BoxBodyDesc) -> BodyHandle {
        let builder = if desc.mass > 0.0 {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = builder.translation(vector(desc.position)).build();
        let handle = self.bodies.insert(body);

        let half = desc.half_extents.abs().max(Vec3::splat(MIN_HALF_EXTENT));
        let mut collider = ColliderBuilder::cuboid(half.x, half.y, half.z).friction(self.friction);
        if desc.mass > 0.0 {
            collider = collider.mass(desc.mass);
        }
        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);

        BodyHandle(handle)
    }

    /// Remove a body and its collider. Returns false for unknown handles.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies
            .remove(
                handle.0,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        let body = self.bodies.get(handle.0)?;
        Some(BodyState {
            position: vec3(body.translation()),
            rotation: quat(body.rotation()),
            velocity: vec3(body.linvel()),
            is_static: body.is_fixed(),
        })
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(handle.0) else {
            return false;
        };
        body.set_linvel(vector(velocity), true);
        true
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> bool {
        let Some(body) = self.bodies.get_mut(handle.0) else {
            return false;
        };
        body.set_translation(vector(position), true);
        true
    }

    /// Keep the body upright; it still translates freely.
    pub fn lock_rotations(&mut self, handle: BodyHandle) -> bool {
        let Some(body) = self.bodies.get_mut(handle.0) else {
            return false;
        };
        body.lock_rotations(true, true);
        true
    }

    /// Bank `elapsed` seconds and run up to `max_sub_steps` fixed steps of
    /// `fixed_dt`. Returns the number of steps taken.
    pub fn step(&mut self, fixed_dt: f32, elapsed: f32, max_sub_steps: u32) -> u32 {
        if fixed_dt <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed.max(0.0);

        let mut sub_steps = 0;
        while self.accumulator >= fixed_dt && sub_steps < max_sub_steps {
            self.internal_step(fixed_dt);
            self.accumulator -= fixed_dt;
            sub_steps += 1;
        }
        if self.accumulator >= fixed_dt {
            log::trace!(
                "Physics hit {} sub-steps, dropping {:.3}s",
                max_sub_steps,
                self.accumulator - self.accumulator % fixed_dt
            );
        }
        self.accumulator %= fixed_dt;
        sub_steps
    }

    fn internal_step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }
}
