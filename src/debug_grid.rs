//! Editor-only visualization of an effector's slice region.
//!
//! Each effector lazily builds a small cross-hatched grid mesh the first time
//! it is drawn, then reuses it until the effector goes away. The grid is drawn
//! at both ends of the slice region, joined by a thin wire box.

use bevy::asset::RenderAssetUsages;
use bevy::math::Affine3A;
use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;

use crate::effector::Effector;
use crate::time_control::PlayMode;

/// Grid lines per axis, minus one.
pub const GRID_COLUMNS: u32 = 10;
/// Half-size of the grid square.
pub const GRID_EXTENT: f32 = 0.5;

pub const GRID_COLOR: Color = Color::srgba(1.0, 1.0, 0.0, 0.5);
pub const SPAN_COLOR: Color = Color::srgba(1.0, 0.0, 0.0, 0.5);
/// Cross-section of the wire box joining the two grids.
pub const SPAN_THICKNESS: f32 = 0.02;

/// Vertex positions of the grid, four per step.
///
/// For each step `x` runs across `[-ext, ext]`; the four vertices are the two
/// ends of a vertical line at `x` and the two ends of a horizontal line at `x`.
/// `columns` must be at least 1; zero yields no vertices.
pub fn grid_cross_positions(columns: u32, ext: f32) -> Vec<Vec3> {
    if columns == 0 {
        return Vec::new();
    }
    let mut positions = Vec::with_capacity(4 * (columns as usize + 1));
    for i in 0..=columns {
        let x = ext * (2.0 * i as f32 / columns as f32 - 1.0);
        positions.push(Vec3::new(x, -ext, 0.0));
        positions.push(Vec3::new(x, ext, 0.0));
        positions.push(Vec3::new(-ext, x, 0.0));
        positions.push(Vec3::new(ext, x, 0.0));
    }
    positions
}

/// Build the grid as a line-list mesh.
///
/// Each vertex is indexed as it is pushed, so the index buffer is simply
/// `0..vertex_count`. Normals repeat the positions; nothing lights this mesh.
/// The mesh stays in the main world for the gizmo pass to read.
pub fn build_grid_mesh(columns: u32, ext: f32) -> Mesh {
    let positions = grid_cross_positions(columns, ext);
    let indices: Vec<u32> = (0..positions.len() as u32).collect();
    let normals = positions.clone();

    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::MAIN_WORLD)
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(indices))
}

/// Line segments of a line-list mesh, in mesh space.
pub fn line_segments(mesh: &Mesh) -> Vec<(Vec3, Vec3)> {
    if mesh.primitive_topology() != PrimitiveTopology::LineList {
        return Vec::new();
    }
    let Some(VertexAttributeValues::Float32x3(positions)) =
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return Vec::new();
    };
    let Some(indices) = mesh.indices() else {
        return Vec::new();
    };

    let indices: Vec<usize> = indices.iter().collect();
    indices
        .chunks_exact(2)
        .filter_map(|pair| {
            let a = positions.get(pair[0])?;
            let b = positions.get(pair[1])?;
            Some((Vec3::from(*a), Vec3::from(*b)))
        })
        .collect()
}

/// Lazily built grid mesh owned by one effector.
#[derive(Component, Debug, Default)]
pub struct DebugGrid {
    mesh: Option<Handle<Mesh>>,
}

impl DebugGrid {
    pub fn handle(&self) -> Option<&Handle<Mesh>> {
        self.mesh.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.mesh.is_some()
    }

    /// Returns the grid mesh, building it on first use.
    pub fn get_or_build(&mut self, meshes: &mut Assets<Mesh>) -> Handle<Mesh> {
        self.mesh
            .get_or_insert_with(|| meshes.add(build_grid_mesh(GRID_COLUMNS, GRID_EXTENT)))
            .clone()
    }

    /// Give the mesh back.
    ///
    /// Outside a running simulation the asset is removed on the spot. While
    /// running, the handle is dropped and asset tracking frees it later.
    /// Does nothing if the grid was never built.
    pub fn release(&mut self, meshes: &mut Assets<Mesh>, simulation_running: bool) {
        let Some(handle) = self.mesh.take() else {
            return;
        };
        if !simulation_running {
            meshes.remove(&handle);
        }
    }
}

/// Free an effector's grid mesh when its [`DebugGrid`] goes away.
pub fn release_debug_grid(
    remove: On<Remove, DebugGrid>,
    mut grids: Query<&mut DebugGrid>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    play_mode: Res<PlayMode>,
) {
    let Ok(mut grid) = grids.get_mut(remove.entity) else {
        return;
    };
    let Some(mut meshes) = meshes else {
        return;
    };
    grid.release(&mut meshes, play_mode.is_playing());
}

/// Free the grid mesh when the [`Effector`] itself is removed, and drop the
/// now ownerless [`DebugGrid`].
pub fn release_effector_grid(
    remove: On<Remove, Effector>,
    mut commands: Commands,
    mut grids: Query<&mut DebugGrid>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    play_mode: Res<PlayMode>,
) {
    let entity = remove.entity;
    let Ok(mut grid) = grids.get_mut(entity) else {
        return;
    };
    if let Some(mut meshes) = meshes {
        grid.release(&mut meshes, play_mode.is_playing());
    }
    commands.entity(entity).try_remove::<DebugGrid>();
}

/// Build the grid mesh for effectors drawn for the first time.
pub fn prepare_debug_grids(
    mut meshes: ResMut<Assets<Mesh>>,
    mut grids: Query<&mut DebugGrid, With<Effector>>,
) {
    for mut grid in &mut grids {
        if !grid.is_built() {
            grid.get_or_build(&mut meshes);
        }
    }
}

/// World-space gizmo lines for one effector.
///
/// The grid `segments` are placed at local `+Z * offset` and
/// `+Z * (offset + range)`, followed by the edges of the box spanning them.
pub fn effector_gizmo_lines(
    effector: &Effector,
    local_to_world: &Affine3A,
    segments: &[(Vec3, Vec3)],
) -> Vec<(Vec3, Vec3, Color)> {
    let near = Vec3::Z * effector.offset;
    let far = Vec3::Z * (effector.offset + effector.range);
    let half = Vec3::new(SPAN_THICKNESS, SPAN_THICKNESS, effector.range) * 0.5;

    let grid_lines = [near, far].into_iter().flat_map(|base| {
        segments
            .iter()
            .map(move |&(a, b)| (base + a, base + b, GRID_COLOR))
    });
    let span_lines = box_edges((near + far) * 0.5, half)
        .into_iter()
        .map(|(a, b)| (a, b, SPAN_COLOR));

    grid_lines
        .chain(span_lines)
        .map(|(a, b, color)| {
            (
                local_to_world.transform_point3(a),
                local_to_world.transform_point3(b),
                color,
            )
        })
        .collect()
}

/// Draw each effector's slice region.
pub fn draw_effector_gizmos(
    mut gizmos: Gizmos,
    meshes: Res<Assets<Mesh>>,
    effectors: Query<(&Effector, &GlobalTransform, &DebugGrid)>,
) {
    for (effector, global, grid) in &effectors {
        let Some(mesh) = grid.handle().and_then(|handle| meshes.get(handle)) else {
            continue;
        };
        let segments = line_segments(mesh);
        for (a, b, color) in effector_gizmo_lines(effector, &global.affine(), &segments) {
            gizmos.line(a, b, color);
        }
    }
}

/// The twelve edges of an axis-aligned box.
fn box_edges(center: Vec3, half: Vec3) -> [(Vec3, Vec3); 12] {
    let corner = |x: f32, y: f32, z: f32| center + half * Vec3::new(x, y, z);
    let [a, b, c, d] = [
        corner(-1.0, -1.0, -1.0),
        corner(1.0, -1.0, -1.0),
        corner(1.0, 1.0, -1.0),
        corner(-1.0, 1.0, -1.0),
    ];
    let [e, f, g, h] = [
        corner(-1.0, -1.0, 1.0),
        corner(1.0, -1.0, 1.0),
        corner(1.0, 1.0, 1.0),
        corner(-1.0, 1.0, 1.0),
    ];
    [
        (a, b),
        (b, c),
        (c, d),
        (d, a),
        (e, f),
        (f, g),
        (g, h),
        (h, e),
        (a, e),
        (b, f),
        (c, g),
        (d, h),
    ]
}
