//! The running game: every piece of mutable state the frame loop touches,
//! owned in one place and passed explicitly into [`GameSession::tick`].

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use glam::Vec3;
use lf_core::color::{Color, ColorParseError};
use lf_core::input::InputState;
use lf_core::tunable::{TunableParam, Tunables};
use lf_devtools::OverlayStats;
use lf_physics::{BodyHandle, BoxBodyDesc, PhysicsConfig, PhysicsWorld};
use lf_render::{Camera3D, FrameSink, Geometry, GeometryId, Material, MaterialId, MeshId, SceneGraph, Transform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assets::{
    spawn_background, AssetKind, AssetSource, BackgroundItem, LoadObserver, LoadProgress, LoadedAssets,
    ManifestItem,
};
use crate::binder::{self, Entity};
use crate::camera_rig::CameraRig;
use crate::character::{CharacterController, CharacterRig};
use crate::config::GameConfig;
use crate::director::AnimationDirector;
use crate::font::Font;
use crate::sequencer::{LoadPhase, LoadSequencer};
use crate::text::{TextAssembler, TextLine};

pub const CHARACTER_ASSET: &str = "character";
pub const BUILDING_ASSET: &str = "building";
pub const FONT_ASSET: &str = "font";

const FLOOR_THICKNESS: f32 = 0.1;

/// Essential manifest in load order.
pub fn essential_manifest(config: &GameConfig) -> Vec<ManifestItem> {
    vec![
        ManifestItem::new(CHARACTER_ASSET, AssetKind::Model, &config.assets.character),
        ManifestItem::new(BUILDING_ASSET, AssetKind::Model, &config.assets.building),
        ManifestItem::new(FONT_ASSET, AssetKind::Font, &config.assets.font),
    ]
}

/// Progress as seen by the UI layer.
#[derive(Debug, Default)]
pub struct LoadingStatus {
    pub progress: Option<LoadProgress>,
    pub completions: u32,
}

impl LoadObserver for LoadingStatus {
    fn on_progress(&mut self, progress: &LoadProgress) {
        self.progress = Some(progress.clone());
    }

    fn on_complete(&mut self) {
        self.completions += 1;
        log::info!("Loading complete");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub meshes_removed: usize,
    pub bodies_removed: usize,
    /// Bodies still in the world afterwards. Anything but zero is a leak.
    pub leaked_bodies: usize,
}

struct Floor {
    mesh: MeshId,
    body: BodyHandle,
    geometry: GeometryId,
}

pub struct GameSession {
    config: GameConfig,
    pub input: InputState,
    physics: PhysicsWorld,
    scene: SceneGraph,
    camera: Camera3D,
    camera_rig: CameraRig,
    controller: CharacterController,
    director: AnimationDirector,
    assembler: TextAssembler,
    tunables: Tunables,
    text_material: MaterialId,
    plane_material: MaterialId,
    floor: Option<Floor>,
    character: Option<CharacterRig>,
    building: Vec<Entity>,
    text: TextLine,
    font: Option<Font>,
    trees: Vec<MeshId>,
    /// Model geometries (building, character, trees) released on teardown.
    model_geometries: Vec<GeometryId>,
    source: Arc<dyn AssetSource>,
    sequencer: LoadSequencer,
    loading: LoadingStatus,
    background: Option<Receiver<BackgroundItem>>,
    rng: StdRng,
}

impl GameSession {
    /// Build the empty world and start loading essential assets.
    pub fn new(config: GameConfig, source: Arc<dyn AssetSource>, viewport: (u32, u32)) -> Self {
        let mut physics = PhysicsWorld::new(PhysicsConfig {
            gravity: config.physics.gravity,
            friction: config.physics.friction,
        });

        let colors = &config.colors;
        let mut scene = SceneGraph::new(colors.background);
        scene.lighting.dir_color = colors.dir_light;
        let text_material = scene.add_material(Material { color: colors.text });
        let plane_material = scene.add_material(Material { color: colors.plane });
        let tunables = Tunables {
            text_color: colors.text,
            plane_color: colors.plane,
            dir_light_color: colors.dir_light,
        };

        let floor = config.floor.enabled.then(|| {
            let half = config.floor.half_extent;
            let geometry = scene.add_geometry(Geometry::plane(half));
            let mesh = scene.add_mesh(geometry, plane_material, Transform::IDENTITY);
            let body = physics.add_box(BoxBodyDesc {
                half_extents: Vec3::new(half, FLOOR_THICKNESS * 0.5, half),
                position: Vec3::new(0.0, -FLOOR_THICKNESS * 0.5, 0.0),
                mass: 0.0,
            });
            Floor { mesh, body, geometry }
        });

        let mut camera = Camera3D::new(viewport.0, viewport.1);
        camera.position = config.camera.start;
        camera.fov_y_deg = config.camera.fov_deg;
        camera.near = config.camera.near;
        camera.far = config.camera.far;

        let mut sequencer = LoadSequencer::new();
        sequencer.start(source.clone(), essential_manifest(&config));

        Self {
            input: InputState::new(),
            physics,
            scene,
            camera,
            camera_rig: CameraRig::new(config.camera.offset, config.camera.lerp_factor),
            controller: CharacterController::new(config.character.walk_speed, config.character.run_speed),
            director: AnimationDirector::new(
                config.animation.fade_seconds,
                config.character.walk_speed,
                config.animation.clip_policy,
            ),
            assembler: TextAssembler::from_config(&config.text),
            tunables,
            text_material,
            plane_material,
            floor,
            character: None,
            building: Vec::new(),
            text: TextLine::default(),
            font: None,
            trees: Vec::new(),
            model_geometries: Vec::new(),
            source,
            sequencer,
            loading: LoadingStatus::default(),
            background: None,
            rng: StdRng::from_entropy(),
            config,
        }
    }

    /// One frame. Physics is stepped before anything reads body state, and
    /// every mesh is synced before the scene is submitted.
    pub fn tick(&mut self, dt: f32, sink: &mut dyn FrameSink) {
        self.pump_loading();

        let physics = &self.config.physics;
        self.physics.step(physics.fixed_dt(), dt, physics.max_sub_steps);

        if let Some(rig) = self.character.as_mut() {
            let outcome = self.controller.step(&self.input, rig, &mut self.physics, &mut self.scene);
            self.director.step(rig, outcome.is_moving, outcome.speed);
        }

        for entity in &self.building {
            entity.sync(&self.physics, &mut self.scene);
        }
        self.text.sync(&self.physics, &mut self.scene);

        if let Some(rig) = self.character.as_mut() {
            rig.mixer.update(dt);
        }

        if let Some(target) = self.character.as_ref().and_then(|rig| rig.position(&self.scene)) {
            self.camera_rig.step(target, &mut self.camera);
        }

        sink.submit(&self.scene, &self.camera);
    }

    fn pump_loading(&mut self) {
        if let Some(assets) = self.sequencer.poll(&mut self.loading) {
            self.populate(assets);
            self.start_background();
        }

        let arrived: Vec<BackgroundItem> = match &self.background {
            Some(rx) => rx.try_iter().collect(),
            None => return,
        };
        for item in arrived {
            self.add_tree(item);
        }
    }

    fn populate(&mut self, mut assets: LoadedAssets) {
        match assets.take_model(BUILDING_ASSET) {
            Some(model) => {
                let scale = Vec3::splat(self.config.building.scale);
                for part in model.parts {
                    let geometry = self.scene.add_geometry(part.geometry);
                    self.model_geometries.push(geometry);
                    let material = self.scene.add_material(Material { color: part.base_color });
                    match binder::spawn(
                        &mut self.scene,
                        &mut self.physics,
                        geometry,
                        material,
                        scale,
                        self.config.building.mass,
                    ) {
                        Some(entity) => self.building.push(entity),
                        None => log::debug!("Building part '{}' has no geometry", part.name),
                    }
                }
            }
            None => log::warn!("Building asset missing from loaded set"),
        }

        match assets.take_model(CHARACTER_ASSET) {
            Some(model) => {
                let material = self.scene.add_material(Material {
                    color: model.primary_color(),
                });
                let geometry = self.scene.add_geometry(model.merged_geometry());
                self.model_geometries.push(geometry);
                let scale = Vec3::splat(self.config.character.scale);
                if let Some(entity) = binder::spawn(
                    &mut self.scene,
                    &mut self.physics,
                    geometry,
                    material,
                    scale,
                    self.config.character.mass,
                ) {
                    self.physics.lock_rotations(entity.body);
                    self.character = Some(CharacterRig::new(entity, &model.clips));
                }
            }
            None => log::warn!("Character asset missing from loaded set"),
        }

        match assets.take_font(FONT_ASSET) {
            Some(font) => {
                self.font = Some(font);
                let word = self.config.text.word.clone();
                self.set_text(&word);
            }
            None => log::warn!("Font asset missing from loaded set"),
        }
    }

    fn start_background(&mut self) {
        let paths = self.config.assets.trees.clone();
        if paths.is_empty() {
            return;
        }
        let stagger = Duration::from_millis(self.config.trees.stagger_ms);
        match spawn_background(self.source.clone(), paths, stagger) {
            Ok(rx) => self.background = Some(rx),
            Err(err) => log::warn!("Background loading unavailable: {}", err),
        }
    }

    fn add_tree(&mut self, item: BackgroundItem) {
        let i = item.index as f32;
        let translation = Vec3::new(
            -i * self.rng.gen::<f32>() + 0.5,
            0.0,
            -i * self.rng.gen::<f32>() + 0.5,
        );
        let material = self.scene.add_material(Material {
            color: item.model.primary_color(),
        });
        let geometry = self.scene.add_geometry(item.model.merged_geometry());
        self.model_geometries.push(geometry);
        let mesh = self.scene.add_mesh(
            geometry,
            material,
            Transform {
                translation,
                scale: Vec3::splat(self.config.trees.scale),
                ..Transform::IDENTITY
            },
        );
        self.trees.push(mesh);
    }

    /// Replace the floating text. Old glyphs are fully removed first.
    /// Returns false while no font is loaded.
    pub fn set_text(&mut self, word: &str) -> bool {
        let Some(font) = &self.font else {
            log::warn!("Cannot set text '{}' before the font has loaded", word);
            return false;
        };
        self.text.clear(&mut self.physics, &mut self.scene);
        self.text = self.assembler.assemble(
            word,
            font,
            self.text_material,
            &mut self.scene,
            &mut self.physics,
            &mut self.rng,
        );
        log::debug!("Text rebuilt: '{}' ({} glyphs)", word, self.text.len());
        true
    }

    pub fn rebuild_text(&mut self) -> bool {
        let word = self.config.text.word.clone();
        self.set_text(&word)
    }

    /// Parse a `#rrggbb` value and apply it immediately.
    pub fn apply_tunable(&mut self, param: TunableParam, value: &str) -> Result<Color, ColorParseError> {
        let color: Color = value.parse()?;
        self.apply_tunable_color(param, color);
        Ok(color)
    }

    pub fn apply_tunable_color(&mut self, param: TunableParam, color: Color) {
        self.tunables.set(param, color);
        let material = match param {
            TunableParam::TextColor => Some(self.text_material),
            TunableParam::PlaneColor => Some(self.plane_material),
            TunableParam::DirLightColor => {
                self.scene.lighting.dir_color = color;
                None
            }
        };
        if let Some(material) = material.and_then(|id| self.scene.material_mut(id)) {
            material.color = color;
        }
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
    }

    pub fn load_phase(&self) -> &LoadPhase {
        self.sequencer.phase()
    }

    pub fn loading(&self) -> &LoadingStatus {
        &self.loading
    }

    pub fn overlay_stats(&self) -> OverlayStats {
        let progress = self.loading.progress.as_ref();
        OverlayStats {
            loader_phase: match self.sequencer.phase() {
                LoadPhase::Failed(message) => format!("failed: {message}"),
                phase => phase.label().to_string(),
            },
            loaded_items: progress.map_or(0, |p| p.loaded),
            total_items: progress.map_or(0, |p| p.total),
            load_percentage: progress.map_or(0, |p| p.percentage),
            current_item: progress.and_then(|p| p.current_item.clone()),
            background_loaded: self.trees.len(),
            locomotion: self.character.as_ref().map(|rig| rig.locomotion.label().to_string()),
            current_clip: self
                .character
                .as_ref()
                .and_then(|rig| rig.current_clip_name())
                .map(str::to_string),
            body_count: self.physics.body_count(),
            mesh_count: self.scene.mesh_count(),
            letter_count: self.text.len(),
        }
    }

    /// Remove everything this session put into the scene and the physics
    /// world. In-flight background loads notice the dropped channel and stop.
    pub fn teardown(mut self) -> TeardownReport {
        self.background = None;
        let meshes_before = self.scene.mesh_count();
        let bodies_before = self.physics.body_count();

        self.text.clear(&mut self.physics, &mut self.scene);
        for entity in self.building.drain(..) {
            entity.remove(&mut self.physics, &mut self.scene);
        }
        if let Some(rig) = self.character.take() {
            rig.entity.remove(&mut self.physics, &mut self.scene);
        }
        if let Some(floor) = self.floor.take() {
            self.scene.remove_mesh(floor.mesh);
            self.physics.remove_body(floor.body);
            self.scene.remove_geometry(floor.geometry);
        }
        for mesh in self.trees.drain(..) {
            self.scene.remove_mesh(mesh);
        }
        for geometry in self.model_geometries.drain(..) {
            self.scene.remove_geometry(geometry);
        }

        let report = TeardownReport {
            meshes_removed: meshes_before - self.scene.mesh_count(),
            bodies_removed: bodies_before - self.physics.body_count(),
            leaked_bodies: self.physics.body_count(),
        };
        if report.leaked_bodies > 0 {
            log::warn!("Teardown leaked {} physics bodies", report.leaked_bodies);
        }
        log::info!(
            "Session torn down ({} meshes, {} bodies removed)",
            report.meshes_removed,
            report.bodies_removed
        );
        report
    }

    #[cfg(test)]
    fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    #[cfg(test)]
    fn camera(&self) -> &Camera3D {
        &self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, MemorySource};
    use lf_core::input::Key;
    use std::collections::HashMap;
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        frames: usize,
        last_mesh_count: usize,
        last_camera: Option<Camera3D>,
        /// Mesh translations exactly as the last submitted frame saw them.
        last_translations: HashMap<MeshId, Vec3>,
    }

    impl FrameSink for RecordingSink {
        fn submit(&mut self, scene: &SceneGraph, camera: &Camera3D) {
            self.frames += 1;
            self.last_mesh_count = scene.mesh_count();
            self.last_camera = Some(*camera);
            self.last_translations = scene
                .meshes()
                .map(|(id, node)| (id, node.transform.translation))
                .collect();
        }
    }

    const DT: f32 = 1.0 / 60.0;

    fn config_without_trees() -> GameConfig {
        let mut config = GameConfig::default();
        config.assets.trees.clear();
        config
    }

    fn tick_until(session: &mut GameSession, sink: &mut RecordingSink, done: impl Fn(&GameSession) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done(&*session) {
            assert!(Instant::now() < deadline, "condition not reached in time");
            session.tick(DT, sink);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ready_session(config: GameConfig, source: MemorySource) -> (GameSession, RecordingSink) {
        let mut session = GameSession::new(config, Arc::new(source), (1280, 720));
        let mut sink = RecordingSink::default();
        tick_until(&mut session, &mut sink, |s| s.load_phase() == &LoadPhase::Ready);
        (session, sink)
    }

    #[test]
    fn full_startup_then_frames_without_trees() {
        let (mut session, mut sink) = ready_session(config_without_trees(), fixtures::scene_source());

        let progress = session.loading().progress.clone().unwrap();
        assert_eq!(progress.loaded, 3);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.percentage, 100);
        assert_eq!(session.loading().completions, 1);

        session.input.key_down(Key::ArrowLeft);
        for _ in 0..120 {
            session.tick(DT, &mut sink);
        }
        assert_eq!(session.loading().completions, 1);
        assert!(sink.frames >= 120);

        let stats = session.overlay_stats();
        assert_eq!(stats.letter_count, 7);
        // floor + building part + character + letters
        assert_eq!(stats.body_count, 1 + 1 + 1 + 7);
        assert_eq!(stats.locomotion.as_deref(), Some("Walk"));
        assert_eq!(sink.last_mesh_count, session.scene().mesh_count());
    }

    #[test]
    fn nothing_character_driven_runs_before_ready() {
        let mut source = fixtures::scene_source();
        source.insert("models/soldier.glb", b"broken".to_vec());
        let mut session = GameSession::new(config_without_trees(), Arc::new(source), (800, 600));
        let mut sink = RecordingSink::default();
        tick_until(&mut session, &mut sink, |s| matches!(s.load_phase(), LoadPhase::Failed(_)));

        for _ in 0..10 {
            session.tick(DT, &mut sink);
        }
        let stats = session.overlay_stats();
        assert!(stats.loader_phase.contains("'character'"));
        assert_eq!(stats.letter_count, 0);
        assert_eq!(stats.body_count, 1);
        assert_eq!(session.loading().completions, 0);
        assert_eq!(sink.last_camera.unwrap().position, Vec3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn submitted_frame_shows_this_ticks_physics() {
        let (mut session, mut sink) = ready_session(config_without_trees(), fixtures::scene_source());
        let letters: Vec<Entity> = session.text.letters().iter().map(|l| l.entity).collect();
        assert!(!letters.is_empty());
        let before: Vec<Vec3> = letters
            .iter()
            .map(|e| session.scene().mesh(e.mesh).unwrap().transform.translation)
            .collect();

        // Two fixed steps' worth so at least one step runs.
        session.tick(2.0 * DT, &mut sink);

        for (entity, before) in letters.iter().zip(before) {
            let body = session.physics.body(entity.body).unwrap();
            let stepped = body.position - body.rotation * entity.anchor;
            let submitted = sink.last_translations[&entity.mesh];
            assert!((submitted - stepped).length() < 1e-6, "{submitted} vs {stepped}");
            assert!((submitted - before).length() > 1e-6, "glyph did not move");
        }
    }

    #[test]
    fn camera_follows_character() {
        let (mut session, mut sink) = ready_session(config_without_trees(), fixtures::scene_source());
        for _ in 0..60 {
            session.tick(DT, &mut sink);
        }
        let rig = session.character.as_ref().unwrap();
        let target = rig.position(session.scene()).unwrap();
        assert_eq!(session.camera().target, target);
    }

    #[test]
    fn set_text_replaces_letters_without_leaking() {
        let (mut session, mut sink) = ready_session(config_without_trees(), fixtures::scene_source());
        let bodies_before = session.overlay_stats().body_count;
        assert!(session.set_text("HI"));
        session.tick(DT, &mut sink);
        let stats = session.overlay_stats();
        assert_eq!(stats.letter_count, 2);
        assert_eq!(stats.body_count, bodies_before - 7 + 2);
    }

    #[test]
    fn set_text_before_font_is_refused() {
        let mut session = GameSession::new(config_without_trees(), Arc::new(MemorySource::default()), (800, 600));
        assert!(!session.set_text("HI"));
    }

    #[test]
    fn tunables_apply_immediately() {
        let mut session = GameSession::new(config_without_trees(), Arc::new(MemorySource::default()), (800, 600));
        let color = session.apply_tunable(TunableParam::TextColor, "#ff0000").unwrap();
        assert_eq!(session.scene().material(session.text_material).unwrap().color, color);

        session.apply_tunable(TunableParam::DirLightColor, "#00ff00").unwrap();
        assert_eq!(session.scene().lighting.dir_color.to_hex(), "#00ff00");

        let before = session.tunables().plane_color;
        assert!(session.apply_tunable(TunableParam::PlaneColor, "purple").is_err());
        assert_eq!(session.tunables().plane_color, before);
        assert_eq!(session.scene().material(session.plane_material).unwrap().color, before);
    }

    #[test]
    fn background_trees_arrive_after_ready() {
        let mut config = GameConfig::default();
        config.assets.trees = vec!["models/tree1.glb".to_string(), "models/missing.glb".to_string()];
        config.trees.stagger_ms = 0;
        let mut source = fixtures::scene_source();
        source.insert("models/tree1.glb", fixtures::box_model_glb(&[]));

        let (mut session, mut sink) = ready_session(config, source);
        tick_until(&mut session, &mut sink, |s| s.overlay_stats().background_loaded == 1);

        let tree = session.scene().mesh(session.trees[0]).unwrap();
        assert_eq!(tree.transform.translation, Vec3::new(0.5, 0.0, 0.5));
        assert_eq!(tree.transform.scale, Vec3::splat(0.008));
    }

    #[test]
    fn teardown_removes_everything() {
        let (session, _) = ready_session(config_without_trees(), fixtures::scene_source());
        let report = session.teardown();
        assert_eq!(report.leaked_bodies, 0);
        assert_eq!(report.bodies_removed, 10);
        assert_eq!(report.meshes_removed, 10);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut session = GameSession::new(config_without_trees(), Arc::new(MemorySource::default()), (800, 600));
        session.resize(1000, 500);
        assert_eq!(session.camera().aspect, 2.0);
    }
}
