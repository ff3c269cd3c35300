//! Lumen engine crate.
//!
//! Owned OpenGL resources and the window that hosts them. Every resource
//! holds a [`gl::GlContext`] and releases its native object when dropped.

pub mod buffer;
pub mod error;
pub mod gl;
pub mod logging;
pub mod shader;
pub mod texture;
pub mod time;
pub mod vertex_array;
pub mod window;

pub use buffer::Buffer;
pub use error::{EngineError, Result};
pub use shader::ShaderProgram;
pub use texture::{Texture, TextureDimensions};
pub use vertex_array::{VertexArray, VertexAttribute};
pub use window::{Window, WindowConfig};
