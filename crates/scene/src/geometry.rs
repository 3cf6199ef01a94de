//! Procedural shapes.
//!
//! All shapes are left-handed with clockwise front faces: for every triangle
//! `(a, b, c)`, `(b - a) x (c - a)` points away from the surface.

use crate::error::SceneError;
use crate::mesh::MeshData;
use framestep_common::Vertex;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Built-in meshes, in mesh-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshKind {
    Triangle,
    Trapezoid,
    Square,
    Cone,
    Helix,
    Sphere,
}

impl MeshKind {
    pub const ALL: [MeshKind; 6] = [
        MeshKind::Triangle,
        MeshKind::Trapezoid,
        MeshKind::Square,
        MeshKind::Cone,
        MeshKind::Helix,
        MeshKind::Sphere,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Triangle => "triangle",
            Self::Trapezoid => "trapezoid",
            Self::Square => "square",
            Self::Cone => "cone",
            Self::Helix => "helix",
            Self::Sphere => "sphere",
        }
    }

    /// Position in [`MeshKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Model file under `Models/` that overrides the procedural shape.
    pub fn obj_file(self) -> Option<&'static str> {
        match self {
            Self::Cone => Some("cone.obj"),
            Self::Helix => Some("helix.obj"),
            Self::Sphere => Some("sphere.obj"),
            _ => None,
        }
    }

    pub fn procedural(self) -> Result<MeshData, SceneError> {
        match self {
            Self::Triangle => triangle(),
            Self::Trapezoid => trapezoid(),
            Self::Square => square(),
            Self::Cone => cone(32, 0.5, 1.0),
            Self::Helix => helix(2.0, 96, 12, 0.6, 0.15, 1.5),
            Self::Sphere => sphere(16, 32, 0.5),
        }
    }
}

const FACING: [f32; 3] = [0.0, 0.0, -1.0];

fn flat(points: &[[f32; 3]], indices: Vec<u32>) -> Result<MeshData, SceneError> {
    let vertices = points
        .iter()
        .map(|&p| Vertex::new(p, FACING, [0.0, 0.0]))
        .collect();
    MeshData::new(vertices, indices)
}

pub fn triangle() -> Result<MeshData, SceneError> {
    flat(
        &[[0.0, 1.0, 0.0], [1.5, -1.0, 0.0], [-1.5, -1.0, 0.0]],
        vec![0, 1, 2],
    )
}

pub fn trapezoid() -> Result<MeshData, SceneError> {
    flat(
        &[
            [2.0, -0.5, 0.0],
            [2.5, -0.5, 0.0],
            [3.0, 0.5, 0.0],
            [1.5, 0.5, 0.0],
        ],
        vec![2, 1, 0, 0, 3, 2],
    )
}

pub fn square() -> Result<MeshData, SceneError> {
    flat(
        &[
            [-3.5, -0.5, 0.0],
            [-2.0, -0.5, 0.0],
            [-2.0, 0.5, 0.0],
            [-3.5, 0.5, 0.0],
        ],
        vec![2, 1, 0, 0, 3, 2],
    )
}

/// Indices for a `(rows + 1) x (cols + 1)` vertex grid laid out row-major.
fn grid_indices(rows: u32, cols: u32) -> Vec<u32> {
    let stride = cols + 1;
    let mut indices = Vec::with_capacity((rows * cols * 6) as usize);
    for r in 0..rows {
        for c in 0..cols {
            let a = r * stride + c;
            let b = a + stride;
            let next = a + 1;
            let d = b + 1;
            indices.extend_from_slice(&[a, next, b, next, d, b]);
        }
    }
    indices
}

/// UV sphere centred on the origin.
pub fn sphere(rings: u32, segments: u32, radius: f32) -> Result<MeshData, SceneError> {
    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    for r in 0..=rings {
        let v = r as f32 / rings as f32;
        let phi = v * std::f32::consts::PI;
        for s in 0..=segments {
            let u = s as f32 / segments as f32;
            let theta = u * TAU;
            let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            vertices.push(Vertex::new((n * radius).to_array(), n.to_array(), [u, v]));
        }
    }
    MeshData::new(vertices, grid_indices(rings, segments))
}

/// Cone with its base centred at `y = -height / 2`, apex at `+height / 2`.
pub fn cone(segments: u32, radius: f32, height: f32) -> Result<MeshData, SceneError> {
    let half = height * 0.5;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Side: one apex vertex per segment so each carries its own normal.
    for s in 0..=segments {
        let u = s as f32 / segments as f32;
        let theta = u * TAU;
        let (sin, cos) = theta.sin_cos();
        let normal = Vec3::new(cos * height, radius, sin * height).normalize();
        vertices.push(Vertex::new(
            [cos * radius, -half, sin * radius],
            normal.to_array(),
            [u, 1.0],
        ));
        vertices.push(Vertex::new([0.0, half, 0.0], normal.to_array(), [u, 0.0]));
    }
    for s in 0..segments {
        let base = s * 2;
        let next_base = base + 2;
        let apex = base + 1;
        indices.extend_from_slice(&[apex, next_base, base]);
    }

    // Base cap.
    let center = vertices.len() as u32;
    vertices.push(Vertex::new([0.0, -half, 0.0], [0.0, -1.0, 0.0], [0.5, 0.5]));
    let ring = vertices.len() as u32;
    for s in 0..=segments {
        let theta = s as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();
        vertices.push(Vertex::new(
            [cos * radius, -half, sin * radius],
            [0.0, -1.0, 0.0],
            [0.5 + cos * 0.5, 0.5 + sin * 0.5],
        ));
    }
    for s in 0..segments {
        indices.extend_from_slice(&[center, ring + s, ring + s + 1]);
    }

    MeshData::new(vertices, indices)
}

/// A tube swept along a vertical helix centred on the origin.
pub fn helix(
    turns: f32,
    steps: u32,
    sides: u32,
    radius: f32,
    tube_radius: f32,
    height: f32,
) -> Result<MeshData, SceneError> {
    let mut vertices = Vec::with_capacity(((steps + 1) * (sides + 1)) as usize);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let theta = t * turns * TAU;
        let (sin, cos) = theta.sin_cos();
        let center = Vec3::new(cos * radius, -height * 0.5 + t * height, sin * radius);
        let outward = Vec3::new(cos, 0.0, sin);
        for j in 0..=sides {
            let v = j as f32 / sides as f32;
            let (s, c) = (v * TAU).sin_cos();
            let normal = outward * c + Vec3::Y * s;
            vertices.push(Vertex::new(
                (center + normal * tube_radius).to_array(),
                normal.to_array(),
                [t * turns, v],
            ));
        }
    }
    MeshData::new(vertices, grid_indices(steps, sides))
}
