/// Primitive topology for draw calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Lines,
    Triangles,
    TriangleStrip,
}

impl PrimitiveType {
    /// Vertices consumed by `count` primitives, `None` if that does not fit a `u32`.
    #[inline]
    pub const fn vertex_count(self, count: u32) -> Option<u32> {
        match self {
            PrimitiveType::Lines => count.checked_mul(2),
            PrimitiveType::Triangles => count.checked_mul(3),
            PrimitiveType::TriangleStrip => count.checked_add(2),
        }
    }
}
