//! Typed views of the native enums the wrappers pass through.

use std::fmt;
use std::ops::BitOr;

/// Buffer category; selects the binding point a buffer attaches to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

impl BufferKind {
    pub fn target(self) -> u32 {
        match self {
            BufferKind::Vertex => glow::ARRAY_BUFFER,
            BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
            BufferKind::Uniform => glow::UNIFORM_BUFFER,
        }
    }
}

/// Usage hint passed along with a full upload.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

impl BufferUsage {
    pub fn gl_enum(self) -> u32 {
        match self {
            BufferUsage::StaticDraw => glow::STATIC_DRAW,
            BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
            BufferUsage::StreamDraw => glow::STREAM_DRAW,
        }
    }
}

/// Component type of a vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    HalfFloat,
    Float,
}

impl AttributeType {
    pub fn gl_enum(self) -> u32 {
        match self {
            AttributeType::Byte => glow::BYTE,
            AttributeType::UnsignedByte => glow::UNSIGNED_BYTE,
            AttributeType::Short => glow::SHORT,
            AttributeType::UnsignedShort => glow::UNSIGNED_SHORT,
            AttributeType::Int => glow::INT,
            AttributeType::UnsignedInt => glow::UNSIGNED_INT,
            AttributeType::HalfFloat => glow::HALF_FLOAT,
            AttributeType::Float => glow::FLOAT,
        }
    }
}

/// Element type of an index buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

impl IndexType {
    pub fn gl_enum(self) -> u32 {
        match self {
            IndexType::U8 => glow::UNSIGNED_BYTE,
            IndexType::U16 => glow::UNSIGNED_SHORT,
            IndexType::U32 => glow::UNSIGNED_INT,
        }
    }
}

/// Primitive assembly mode for draw calls.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn gl_enum(self) -> u32 {
        match self {
            PrimitiveMode::Points => glow::POINTS,
            PrimitiveMode::Lines => glow::LINES,
            PrimitiveMode::LineStrip => glow::LINE_STRIP,
            PrimitiveMode::Triangles => glow::TRIANGLES,
            PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
            PrimitiveMode::TriangleFan => glow::TRIANGLE_FAN,
        }
    }
}

/// Texture target kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[non_exhaustive]
pub enum TextureTarget {
    #[default]
    Texture2D,
}

impl TextureTarget {
    pub fn gl_enum(self) -> u32 {
        match self {
            TextureTarget::Texture2D => glow::TEXTURE_2D,
        }
    }
}

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Framebuffer planes cleared by [`GlContext::clear`](super::GlContext::clear).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ClearMask(u32);

impl ClearMask {
    pub const COLOR: ClearMask = ClearMask(glow::COLOR_BUFFER_BIT);
    pub const DEPTH: ClearMask = ClearMask(glow::DEPTH_BUFFER_BIT);
    pub const STENCIL: ClearMask = ClearMask(glow::STENCIL_BUFFER_BIT);

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for ClearMask {
    type Output = ClearMask;

    fn bitor(self, rhs: ClearMask) -> ClearMask {
        ClearMask(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_kinds_map_to_distinct_targets() {
        assert_eq!(BufferKind::Vertex.target(), glow::ARRAY_BUFFER);
        assert_eq!(BufferKind::Index.target(), glow::ELEMENT_ARRAY_BUFFER);
        assert_eq!(BufferKind::Uniform.target(), glow::UNIFORM_BUFFER);
    }

    #[test]
    fn clear_mask_combines_bits() {
        let mask = ClearMask::COLOR | ClearMask::DEPTH;
        assert_eq!(mask.bits(), glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
    }
}
