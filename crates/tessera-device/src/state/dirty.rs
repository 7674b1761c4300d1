use bitflags::bitflags;

bitflags! {
    /// Categories of pending render state that differ from what the backend holds.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        const SHADER        = 1 << 0;
        const VERTEX_BUFFER = 1 << 1;
        const INDEX_BUFFER  = 1 << 2;
        const UNIFORMS      = 1 << 3;
        const TEXTURES      = 1 << 4;
        const RASTERIZER    = 1 << 5;
        const BLEND         = 1 << 6;
        const DEPTH         = 1 << 7;
    }
}

/// One committable state category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StateCategory {
    Shader,
    VertexBuffer,
    IndexBuffer,
    Uniforms,
    Textures,
    Rasterizer,
    Blend,
    Depth,
}

impl StateCategory {
    /// The order categories are applied in. Uniform pushes need the program bound,
    /// and the index buffer binding lives inside the vertex array.
    pub const COMMIT_ORDER: [StateCategory; 8] = [
        StateCategory::Shader,
        StateCategory::VertexBuffer,
        StateCategory::IndexBuffer,
        StateCategory::Uniforms,
        StateCategory::Textures,
        StateCategory::Rasterizer,
        StateCategory::Blend,
        StateCategory::Depth,
    ];

    pub const fn flag(self) -> DirtyFlags {
        match self {
            StateCategory::Shader => DirtyFlags::SHADER,
            StateCategory::VertexBuffer => DirtyFlags::VERTEX_BUFFER,
            StateCategory::IndexBuffer => DirtyFlags::INDEX_BUFFER,
            StateCategory::Uniforms => DirtyFlags::UNIFORMS,
            StateCategory::Textures => DirtyFlags::TEXTURES,
            StateCategory::Rasterizer => DirtyFlags::RASTERIZER,
            StateCategory::Blend => DirtyFlags::BLEND,
            StateCategory::Depth => DirtyFlags::DEPTH,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}
