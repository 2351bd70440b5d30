//! Game configuration loaded from `assets/config/game.json`.
//!
//! Every field has a default, so an empty object (or a missing file) is a
//! valid configuration. Only the values that differ need to be written.

use std::fs;
use std::path::Path;

use glam::Vec3;
use lf_core::color::Color;
use serde::Deserialize;

pub const CONFIG_PATH: &str = "assets/config/game.json";

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct GameConfig {
    pub window: WindowConfig,
    pub physics: PhysicsSettings,
    pub character: CharacterConfig,
    pub camera: CameraConfig,
    pub building: BuildingConfig,
    pub trees: TreeConfig,
    pub animation: AnimationConfig,
    pub text: TextConfig,
    pub floor: FloorConfig,
    pub colors: ColorConfig,
    pub assets: AssetPaths,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Letterfall".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: Vec3,
    pub friction: f32,
    pub step_hz: f32,
    pub max_sub_steps: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.82, 0.0),
            friction: 0.4,
            step_hz: 60.0,
            max_sub_steps: 3,
        }
    }
}

impl PhysicsSettings {
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.step_hz
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CharacterConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub scale: f32,
    pub mass: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            walk_speed: 2.0,
            run_speed: 5.0,
            scale: 0.3,
            mass: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub offset: Vec3,
    pub lerp_factor: f32,
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub start: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 1.0, 2.0),
            lerp_factor: 0.1,
            fov_deg: 70.0,
            near: 0.01,
            far: 1000.0,
            start: Vec3::new(0.0, 1.0, 2.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BuildingConfig {
    pub scale: f32,
    pub mass: f32,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            scale: 0.0009,
            mass: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TreeConfig {
    pub scale: f32,
    pub stagger_ms: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            scale: 0.008,
            stagger_ms: 500,
        }
    }
}

/// Which clip the director picks for a given input state.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipPolicy {
    /// Locomotion clips while no direction is held, Idle while moving.
    #[default]
    Literal,
    /// Idle while standing, locomotion clips while moving.
    Corrected,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub fade_seconds: f32,
    pub clip_policy: ClipPolicy,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fade_seconds: 0.2,
            clip_policy: ClipPolicy::Literal,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub word: String,
    pub size: f32,
    pub depth: f32,
    /// Straight pieces per outline curve.
    pub curve_segments: u32,
    pub letter_spacing: f32,
    pub initial_y: f32,
    pub z_offset: f32,
    pub mass: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            word: "CHINEDU".to_string(),
            size: 0.22,
            depth: 0.07,
            curve_segments: 17,
            letter_spacing: 1.5,
            initial_y: 2.0,
            z_offset: 0.5,
            mass: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FloorConfig {
    pub enabled: bool,
    pub half_extent: f32,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            half_extent: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    pub text: Color,
    pub plane: Color,
    pub dir_light: Color,
    pub background: Color,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            text: Color::from_rgb8([0xb7, 0xb7, 0xb7]),
            plane: Color::BLACK,
            dir_light: Color::WHITE,
            background: Color::from_rgb8([0xae, 0xf1, 0xff]),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AssetPaths {
    pub root: String,
    pub character: String,
    pub building: String,
    pub font: String,
    pub trees: Vec<String>,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            character: "models/soldier.glb".to_string(),
            building: "models/building.glb".to_string(),
            font: "fonts/bruno_ace_regular.json".to_string(),
            trees: [1, 2, 5, 3, 4, 6, 7]
                .iter()
                .map(|n| format!("models/tree{n}.glb"))
                .collect(),
        }
    }
}

/// Load and validate the config. A missing file yields the defaults.
pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(GameConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    parse_config(&raw).map_err(|e| format!("{} ({})", e, path.display()))
}

pub fn parse_config(raw: &str) -> Result<GameConfig, String> {
    let config: GameConfig =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse config JSON: {e}"))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    let c = &config.character;
    if c.walk_speed <= 0.0 || c.run_speed <= 0.0 {
        return Err("Config validation failed: character speeds must be positive".to_string());
    }
    if c.run_speed < c.walk_speed {
        return Err(format!(
            "Config validation failed: run_speed {} is below walk_speed {}",
            c.run_speed, c.walk_speed
        ));
    }
    let lerp = config.camera.lerp_factor;
    if !(lerp > 0.0 && lerp <= 1.0) {
        return Err(format!(
            "Config validation failed: camera lerp_factor {lerp} must be in (0, 1]"
        ));
    }
    if config.physics.step_hz <= 0.0 {
        return Err("Config validation failed: physics step_hz must be positive".to_string());
    }
    if config.physics.max_sub_steps == 0 {
        return Err("Config validation failed: physics max_sub_steps must be at least 1".to_string());
    }
    if config.text.size <= 0.0 {
        return Err("Config validation failed: text size must be positive".to_string());
    }
    if config.text.curve_segments == 0 {
        return Err("Config validation failed: text curve_segments must be at least 1".to_string());
    }
    let scales = [
        ("character", c.scale),
        ("building", config.building.scale),
        ("trees", config.trees.scale),
    ];
    for (name, scale) in scales {
        if scale <= 0.0 {
            return Err(format!("Config validation failed: {name} scale must be positive"));
        }
    }
    let masses = [
        ("character", c.mass),
        ("building", config.building.mass),
        ("text", config.text.mass),
    ];
    for (name, mass) in masses {
        if mass < 0.0 {
            return Err(format!("Config validation failed: {name} mass must not be negative"));
        }
    }
    if config.floor.enabled && config.floor.half_extent <= 0.0 {
        return Err("Config validation failed: floor half_extent must be positive".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "lf_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_config("{}").expect("empty config should load");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.text.word, "CHINEDU");
        assert_eq!(config.assets.trees.len(), 7);
        assert_eq!(config.assets.trees[2], "models/tree5.glb");
        assert_eq!(config.animation.clip_policy, ClipPolicy::Literal);
    }

    #[test]
    fn partial_groups_keep_remaining_defaults() {
        let config = parse_config(
            r#"{ "character": { "run_speed": 8.0 }, "animation": { "clip_policy": "corrected" } }"#,
        )
        .unwrap();
        assert_eq!(config.character.run_speed, 8.0);
        assert_eq!(config.character.walk_speed, 2.0);
        assert_eq!(config.animation.clip_policy, ClipPolicy::Corrected);
        assert_eq!(config.animation.fade_seconds, 0.2);
    }

    #[test]
    fn colours_parse_from_hex() {
        let config = parse_config(r##"{ "colors": { "text": "#ff0000" } }"##).unwrap();
        assert_eq!(config.colors.text, Color::new(1.0, 0.0, 0.0));
        assert_eq!(config.colors.background.to_hex(), "#aef1ff");

        let err = parse_config(r#"{ "colors": { "text": "red" } }"#).unwrap_err();
        assert!(err.contains("Failed to parse config JSON"));
    }

    #[test]
    fn rejects_run_slower_than_walk() {
        let err = parse_config(r#"{ "character": { "walk_speed": 3.0, "run_speed": 1.0 } }"#)
            .unwrap_err();
        assert!(err.contains("run_speed"));
    }

    #[test]
    fn rejects_out_of_range_lerp_and_steps() {
        assert!(parse_config(r#"{ "camera": { "lerp_factor": 0.0 } }"#).is_err());
        assert!(parse_config(r#"{ "camera": { "lerp_factor": 1.5 } }"#).is_err());
        assert!(parse_config(r#"{ "physics": { "max_sub_steps": 0 } }"#).is_err());
        assert!(parse_config(r#"{ "building": { "mass": -1.0 } }"#).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = temp_file_path("missing");
        let config = load_config_from_path(&path).expect("missing file is not an error");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn load_config_from_path_reads_file() {
        let path = temp_file_path("valid");
        fs::write(&path, r#"{ "text": { "word": "HELLO" } }"#).expect("failed to write temp config");
        let config = load_config_from_path(&path).expect("valid config should load");
        assert_eq!(config.text.word, "HELLO");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn fixed_dt_follows_step_rate() {
        let physics = PhysicsSettings::default();
        assert!((physics.fixed_dt() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let raw = include_str!("../../../assets/config/game.json");
        assert_eq!(parse_config(raw).unwrap(), GameConfig::default());
    }
}
