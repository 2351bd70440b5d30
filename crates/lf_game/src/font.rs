//! Typeface JSON fonts (the format produced by facetype.js).
//!
//! Glyph outlines are flattened into polygons, filled with lyon and extruded
//! to the text depth. The outline bounding box is kept alongside for blank
//! glyphs and for shapes that do not tessellate.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use lf_render::Geometry;
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, TessellationError,
    VertexBuffers,
};
use serde::Deserialize;

const FALLBACK_GLYPH: char = '?';

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("invalid typeface JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("typeface resolution must be positive, got {0}")]
    BadResolution(f32),
    #[error("glyph '{glyph}' has a malformed outline near '{token}'")]
    BadOutline { glyph: String, token: String },
}

#[derive(Deserialize)]
struct TypefaceFile {
    glyphs: HashMap<String, TypefaceGlyph>,
    resolution: f32,
    #[serde(rename = "familyName", default)]
    family_name: String,
}

#[derive(Deserialize)]
struct TypefaceGlyph {
    #[serde(default)]
    ha: f32,
    #[serde(default)]
    o: Option<String>,
}

/// One drawing command of a glyph outline, in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineSegment {
    Move(Vec2),
    Line(Vec2),
    Quad { ctrl: Vec2, to: Vec2 },
    Cubic { ctrl1: Vec2, ctrl2: Vec2, to: Vec2 },
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub advance: f32,
    /// Bounding box of every outline point, control points included, in font
    /// units; `None` for blank glyphs.
    pub bounds: Option<(Vec2, Vec2)>,
    pub outline: Vec<OutlineSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub family: String,
    pub resolution: f32,
    glyphs: HashMap<char, Glyph>,
}

impl Font {
    /// Look up `ch`, falling back to `?`.
    pub fn resolve(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&FALLBACK_GLYPH))
    }

    /// Extruded geometry for one glyph, `size` tall per font resolution and
    /// `depth` thick, centred on the origin. Curves are split into
    /// `curve_segments` straight pieces. Blank glyphs become a flat box of
    /// their advance; characters the font cannot draw at all become a square
    /// of side `size`.
    pub fn glyph_geometry(&self, ch: char, size: f32, depth: f32, curve_segments: u32) -> Geometry {
        let scale = size / self.resolution;
        let Some(glyph) = self.resolve(ch) else {
            return Geometry::cuboid(Vec3::new(size * 0.5, size * 0.5, depth * 0.5));
        };
        let Some((min, max)) = glyph.bounds else {
            return Geometry::cuboid(Vec3::new(glyph.advance * scale * 0.5, 0.0, depth * 0.5));
        };
        let footprint = (max - min) * scale;
        let fallback = || Geometry::cuboid(Vec3::new(footprint.x * 0.5, footprint.y * 0.5, depth * 0.5));

        let contours = flatten(&glyph.outline, curve_segments);
        match extrude(&contours, scale, depth) {
            Ok(geometry) if !geometry.indices.is_empty() => geometry.centered(),
            Ok(_) => {
                log::debug!("Glyph '{}' encloses no area, using its bounds", ch);
                fallback()
            }
            Err(err) => {
                log::warn!("Glyph '{}' failed to tessellate ({:?}), using its bounds", ch, err);
                fallback()
            }
        }
    }
}

pub fn decode_font(bytes: &[u8]) -> Result<Font, FontError> {
    let file: TypefaceFile = serde_json::from_slice(bytes)?;
    if file.resolution <= 0.0 || !file.resolution.is_finite() {
        return Err(FontError::BadResolution(file.resolution));
    }

    let mut glyphs = HashMap::with_capacity(file.glyphs.len());
    for (key, glyph) in &file.glyphs {
        // Keys are single characters; anything else cannot be typed.
        let mut chars = key.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            log::trace!("Ignoring multi-character glyph key '{}'", key);
            continue;
        };
        let outline = match &glyph.o {
            Some(outline) => parse_outline(key, outline)?,
            None => Vec::new(),
        };
        glyphs.insert(
            ch,
            Glyph {
                advance: glyph.ha,
                bounds: outline_bounds(&outline),
                outline,
            },
        );
    }

    Ok(Font {
        family: file.family_name,
        resolution: file.resolution,
        glyphs,
    })
}

/// Parse an `o` command string. Curve commands list the end point before
/// their control points.
fn parse_outline(glyph: &str, outline: &str) -> Result<Vec<OutlineSegment>, FontError> {
    let bad = |token: &str| FontError::BadOutline {
        glyph: glyph.to_string(),
        token: token.to_string(),
    };

    let mut tokens = outline.split_whitespace();
    let mut segments = Vec::new();
    while let Some(cmd) = tokens.next() {
        let count = match cmd {
            "m" | "l" => 1,
            "q" => 2,
            "b" => 3,
            "z" => 0,
            other => return Err(bad(other)),
        };
        let mut points = [Vec2::ZERO; 3];
        for slot in points.iter_mut().take(count) {
            let mut coord = || -> Result<f32, FontError> {
                let token = tokens.next().ok_or_else(|| bad(cmd))?;
                token.parse::<f32>().map_err(|_| bad(token))
            };
            *slot = Vec2::new(coord()?, coord()?);
        }
        let [a, b, c] = points;
        segments.push(match cmd {
            "m" => OutlineSegment::Move(a),
            "l" => OutlineSegment::Line(a),
            "q" => OutlineSegment::Quad { to: a, ctrl: b },
            "b" => OutlineSegment::Cubic {
                to: a,
                ctrl1: b,
                ctrl2: c,
            },
            _ => OutlineSegment::Close,
        });
    }
    Ok(segments)
}

fn outline_bounds(outline: &[OutlineSegment]) -> Option<(Vec2, Vec2)> {
    outline
        .iter()
        .flat_map(|segment| match *segment {
            OutlineSegment::Move(p) | OutlineSegment::Line(p) => vec![p],
            OutlineSegment::Quad { ctrl, to } => vec![ctrl, to],
            OutlineSegment::Cubic { ctrl1, ctrl2, to } => vec![ctrl1, ctrl2, to],
            OutlineSegment::Close => Vec::new(),
        })
        .fold(None, |bounds, p| match bounds {
            Some((min, max)) => Some((Vec2::min(min, p), Vec2::max(max, p))),
            None => Some((p, p)),
        })
}

/// Turn the outline into closed polygons. Degenerate contours (fewer than
/// three distinct points) are dropped.
fn flatten(outline: &[OutlineSegment], curve_segments: u32) -> Vec<Vec<Vec2>> {
    let steps = curve_segments.max(1);
    let mut contours = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    for segment in outline {
        let from = current.last().copied().unwrap_or(Vec2::ZERO);
        match *segment {
            OutlineSegment::Move(p) => {
                close_contour(&mut current, &mut contours);
                current.push(p);
            }
            OutlineSegment::Line(p) => current.push(p),
            OutlineSegment::Quad { ctrl, to } => current.extend((1..=steps).map(|k| {
                let t = k as f32 / steps as f32;
                let u = 1.0 - t;
                from * (u * u) + ctrl * (2.0 * u * t) + to * (t * t)
            })),
            OutlineSegment::Cubic { ctrl1, ctrl2, to } => current.extend((1..=steps).map(|k| {
                let t = k as f32 / steps as f32;
                let u = 1.0 - t;
                from * (u * u * u) + ctrl1 * (3.0 * u * u * t) + ctrl2 * (3.0 * u * t * t) + to * (t * t * t)
            })),
            OutlineSegment::Close => close_contour(&mut current, &mut contours),
        }
    }
    close_contour(&mut current, &mut contours);
    contours
}

fn close_contour(current: &mut Vec<Vec2>, contours: &mut Vec<Vec<Vec2>>) {
    let mut points = std::mem::take(current);
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() >= 3 {
        contours.push(points);
    }
}

fn signed_area(contour: &[Vec2]) -> f32 {
    let n = contour.len();
    (0..n).map(|i| contour[i].perp_dot(contour[(i + 1) % n])).sum::<f32>() * 0.5
}

/// Fill the contours (non-zero winding, so counter-wound contours cut holes)
/// and extrude them. Tessellation runs in font units; `scale` maps the result
/// into world units.
fn extrude(contours: &[Vec<Vec2>], scale: f32, depth: f32) -> Result<Geometry, TessellationError> {
    let mut builder = Path::builder();
    for contour in contours {
        let Some((first, rest)) = contour.split_first() else {
            continue;
        };
        builder.begin(point(first.x, first.y));
        for p in rest {
            builder.line_to(point(p.x, p.y));
        }
        builder.end(true);
    }
    let path = builder.build();

    let mut face: VertexBuffers<Vec2, u32> = VertexBuffers::new();
    FillTessellator::new().tessellate_path(
        &path,
        &FillOptions::default().with_fill_rule(FillRule::NonZero),
        &mut BuffersBuilder::new(&mut face, |vertex: FillVertex| {
            let p = vertex.position();
            Vec2::new(p.x, p.y)
        }),
    )?;

    let half = depth * 0.5;
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for (z, normal) in [(half, Vec3::Z), (-half, Vec3::NEG_Z)] {
        let base = positions.len() as u32;
        positions.extend(face.vertices.iter().map(|v| (*v * scale).extend(z)));
        normals.extend(std::iter::repeat(normal).take(face.vertices.len()));
        for tri in face.indices.chunks_exact(3) {
            if z > 0.0 {
                indices.extend([base + tri[0], base + tri[1], base + tri[2]]);
            } else {
                indices.extend([base + tri[0], base + tri[2], base + tri[1]]);
            }
        }
    }

    // Walls face away from the filled side. Fonts disagree on which way outer
    // contours wind, so the largest contour decides.
    let outward = match contours
        .iter()
        .map(|c| signed_area(c))
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
    {
        Some(area) if area < 0.0 => -1.0,
        _ => 1.0,
    };
    for contour in contours {
        for (i, &a) in contour.iter().enumerate() {
            let b = contour[(i + 1) % contour.len()];
            let Some(dir) = (b - a).try_normalize() else {
                continue;
            };
            let normal = Vec3::new(dir.y, -dir.x, 0.0) * outward;
            let (a, b) = (a * scale, b * scale);
            let base = positions.len() as u32;
            positions.extend([a.extend(half), b.extend(half), b.extend(-half), a.extend(-half)]);
            normals.extend([normal; 4]);
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    Ok(Geometry::new(positions, normals, indices))
}
