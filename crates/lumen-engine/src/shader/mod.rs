//! Shader programs.
//!
//! A [`ShaderProgram`] is built from a vertex and a fragment stage and is
//! immutable afterwards:
//! - both stages are compiled, then linked; stage objects never outlive the build
//! - active attributes, uniforms and uniform blocks are reflected once
//! - uniform locations are memoized per name, including misses

mod program;
mod reflect;
mod uniform;

pub use program::ShaderProgram;
pub use reflect::{AttributeInfo, UniformBlockInfo, UniformInfo};
pub use uniform::UniformValue;
