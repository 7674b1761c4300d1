use bytemuck::{Pod, Zeroable};

/// Vertex layouts known to the device. Each format gets its own arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Flat,
    World,
}

impl VertexFormat {
    pub const ALL: [VertexFormat; 2] = [VertexFormat::Flat, VertexFormat::World];

    /// Bytes per vertex.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            VertexFormat::Flat => std::mem::size_of::<FlatVertex>(),
            VertexFormat::World => std::mem::size_of::<WorldVertex>(),
        }
    }

    /// Position in [`VertexFormat::ALL`]; used to index per-format tables.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            VertexFormat::Flat => 0,
            VertexFormat::World => 1,
        }
    }
}

/// Marker for vertex types that can be uploaded into an arena.
pub trait Vertex: Pod {
    const FORMAT: VertexFormat;
}

// ── flat vertex ───────────────────────────────────────────────────────────

/// Position, packed ARGB color and texture coordinates. 24 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct FlatVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub color: u32,
    pub u: f32,
    pub v: f32,
}

impl FlatVertex {
    pub const fn new(x: f32, y: f32, z: f32, color: u32, u: f32, v: f32) -> Self {
        Self { x, y, z, color, u, v }
    }
}

impl Vertex for FlatVertex {
    const FORMAT: VertexFormat = VertexFormat::Flat;
}

// ── world vertex ──────────────────────────────────────────────────────────

/// [`FlatVertex`] plus a normal. 36 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct WorldVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub color: u32,
    pub u: f32,
    pub v: f32,
    pub nx: f32,
    pub ny: f32,
    pub nz: f32,
}

impl Vertex for WorldVertex {
    const FORMAT: VertexFormat = VertexFormat::World;
}
