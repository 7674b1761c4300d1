//! Render-state enums accepted by the device setters.

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    #[default]
    None,
    /// Cull back faces with clockwise winding as front.
    Clockwise,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Blend {
    InverseSourceAlpha,
    SourceAlpha,
    One,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    #[default]
    Add,
    ReverseSubtract,
}

/// Texture filtering, used for minification, magnification and mip selection.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    #[default]
    None,
    Point,
    Linear,
    Anisotropic,
}

impl TextureFilter {
    #[inline]
    pub(crate) fn is_nearest(self) -> bool {
        matches!(self, TextureFilter::None | TextureFilter::Point)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum TextureAddress {
    #[default]
    Wrap,
    Clamp,
}

impl TextureAddress {
    pub const ALL: [TextureAddress; 2] = [TextureAddress::Wrap, TextureAddress::Clamp];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            TextureAddress::Wrap => 0,
            TextureAddress::Clamp => 1,
        }
    }
}
