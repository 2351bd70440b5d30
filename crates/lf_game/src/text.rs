//! Physics-backed 3D text: one falling extruded glyph per character, each
//! riding a box collider sized to the glyph.

use glam::Vec3;
use lf_physics::{BoxBodyDesc, PhysicsWorld};
use lf_render::{GeometryId, MaterialId, SceneGraph, Transform};
use rand::Rng;

use crate::binder::Entity;
use crate::config::TextConfig;
use crate::font::Font;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letter {
    pub ch: char,
    pub entity: Entity,
    /// Each glyph owns its geometry; it goes away with the letter.
    pub geometry: GeometryId,
}

/// The glyph entities of one word. Built and cleared as a unit.
#[derive(Debug, Default)]
pub struct TextLine {
    letters: Vec<Letter>,
}

impl TextLine {
    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn sync(&self, physics: &PhysicsWorld, scene: &mut SceneGraph) {
        for letter in &self.letters {
            letter.entity.sync(physics, scene);
        }
    }

    /// Remove every glyph's mesh, geometry and body.
    pub fn clear(&mut self, physics: &mut PhysicsWorld, scene: &mut SceneGraph) {
        for letter in self.letters.drain(..) {
            letter.entity.remove(physics, scene);
            scene.remove_geometry(letter.geometry);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAssembler {
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    pub spacing: f32,
    pub initial_y: f32,
    pub z_offset: f32,
    pub mass: f32,
}

impl TextAssembler {
    pub fn from_config(config: &TextConfig) -> Self {
        Self {
            size: config.size,
            depth: config.depth,
            curve_segments: config.curve_segments,
            spacing: config.letter_spacing,
            initial_y: config.initial_y,
            z_offset: config.z_offset,
            mass: config.mass,
        }
    }

    /// X of the first glyph: half of `len` glyph sizes left of zero. Glyphs
    /// advance by `size * spacing`, so with spacing above 1 the line reaches
    /// further right than left.
    pub fn line_offset(&self, len: usize) -> f32 {
        -(len as f32 * self.size) / 2.0
    }

    /// Build one entity per character of `word`, left to right. Each glyph
    /// starts `initial_y` plus up to one unit of jitter above the ground.
    pub fn assemble(
        &self,
        word: &str,
        font: &Font,
        material: MaterialId,
        scene: &mut SceneGraph,
        physics: &mut PhysicsWorld,
        rng: &mut impl Rng,
    ) -> TextLine {
        let offset = self.line_offset(word.chars().count());
        let letters = word
            .chars()
            .enumerate()
            .map(|(i, ch)| {
                let glyph = font.glyph_geometry(ch, self.size, self.depth, self.curve_segments);
                let half_extents = glyph.bounds().map_or(Vec3::ZERO, |b| b.size() * 0.5);
                let position = Vec3::new(
                    offset + i as f32 * self.size * self.spacing,
                    self.initial_y + rng.gen::<f32>(),
                    self.z_offset,
                );

                let geometry = scene.add_geometry(glyph);
                let mesh = scene.add_mesh(
                    geometry,
                    material,
                    Transform {
                        translation: position,
                        ..Transform::IDENTITY
                    },
                );
                let body = physics.add_box(BoxBodyDesc {
                    half_extents,
                    position,
                    mass: self.mass,
                });
                Letter {
                    ch,
                    entity: Entity {
                        mesh,
                        body,
                        anchor: Vec3::ZERO,
                    },
                    geometry,
                }
            })
            .collect();
        TextLine { letters }
    }
}
