use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::gl::{BindGuard, GlApi, GlContext, ShaderStage};
use crate::texture::Texture;

use super::reflect::{self, AttributeInfo, Reflection, UniformBlockInfo, UniformInfo};
use super::uniform::UniformValue;

/// Compiled stage object, deleted when dropped.
struct StageObject<'a> {
    api: &'a dyn GlApi,
    handle: u32,
}

impl<'a> StageObject<'a> {
    fn compile(api: &'a dyn GlApi, stage: ShaderStage, source: &str) -> Result<Self> {
        let handle = api.create_shader(stage.gl_enum());
        if handle == 0 {
            return Err(EngineError::CompileFailed {
                stage,
                log: "device refused to allocate a shader object".into(),
            });
        }
        let object = Self { api, handle };
        api.shader_source(handle, source);
        api.compile_shader(handle);
        if !api.shader_compile_status(handle) {
            let log = api.shader_info_log(handle);
            log::error!("{stage} shader compilation failed:\n{log}");
            return Err(EngineError::CompileFailed { stage, log });
        }
        Ok(object)
    }
}

impl Drop for StageObject<'_> {
    fn drop(&mut self) {
        self.api.delete_shader(self.handle);
    }
}

/// A linked vertex + fragment program, released when dropped.
///
/// Construction either yields a linked program or an error; there is no
/// half-built state. Reflection runs once after linking.
pub struct ShaderProgram {
    ctx: GlContext,
    handle: u32,
    reflection: Reflection,
    locations: RefCell<HashMap<String, Option<i32>>>,
}

impl ShaderProgram {
    /// Reads both stages from disk and builds the program.
    pub fn from_files(
        ctx: &GlContext,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let vertex = read_source(vertex_path.as_ref())?;
        let fragment = read_source(fragment_path.as_ref())?;
        Self::from_sources(ctx, &vertex, &fragment)
    }

    /// Compiles and links the two stages.
    ///
    /// Both stages are compiled even if the first fails, so the log shows
    /// every diagnostic; the first failure is returned.
    pub fn from_sources(ctx: &GlContext, vertex_src: &str, fragment_src: &str) -> Result<Self> {
        let api = ctx.api();
        let vertex = StageObject::compile(api, ShaderStage::Vertex, vertex_src);
        let fragment = StageObject::compile(api, ShaderStage::Fragment, fragment_src);
        let (vertex, fragment) = (vertex?, fragment?);

        let handle = api.create_program();
        if handle == 0 {
            return Err(EngineError::LinkFailed {
                log: "device refused to allocate a program object".into(),
            });
        }
        let mut program = Self {
            ctx: ctx.clone(),
            handle,
            reflection: Reflection::default(),
            locations: RefCell::new(HashMap::new()),
        };

        api.attach_shader(handle, vertex.handle);
        api.attach_shader(handle, fragment.handle);
        api.link_program(handle);
        let linked = api.program_link_status(handle);
        api.detach_shader(handle, vertex.handle);
        api.detach_shader(handle, fragment.handle);

        if !linked {
            let log = api.program_info_log(handle);
            log::error!("shader program linking failed:\n{log}");
            return Err(EngineError::LinkFailed { log });
        }

        program.reflection = reflect::reflect(api, handle);
        program.locations = RefCell::new(
            program
                .reflection
                .uniforms
                .iter()
                .map(|u| (u.name.clone(), Some(u.location)))
                .collect(),
        );
        log::debug!(
            "linked program {handle}: {} attributes, {} uniforms, {} uniform blocks",
            program.reflection.attributes.len(),
            program.reflection.uniforms.len(),
            program.reflection.blocks.len(),
        );
        Ok(program)
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.reflection.attributes
    }

    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.reflection.uniforms
    }

    pub fn uniform_blocks(&self) -> &[UniformBlockInfo] {
        &self.reflection.blocks
    }

    /// Makes this the current program.
    pub fn use_program(&self) {
        self.ctx.api().use_program(self.handle);
    }

    /// Location of `name`, queried from the driver at most once.
    ///
    /// Misses are cached too and warned about on the first lookup only.
    pub fn uniform_location(&self, name: &str) -> Option<i32> {
        if let Some(cached) = self.locations.borrow().get(name) {
            return *cached;
        }
        let location = match self.ctx.api().uniform_location(self.handle, name) {
            -1 => {
                log::warn!("uniform '{name}' is not active in program {}", self.handle);
                None
            }
            location => Some(location),
        };
        self.locations.borrow_mut().insert(name.to_owned(), location);
        location
    }

    /// Writes `value` to the uniform `name`; unknown names are ignored.
    ///
    /// The previously current program is restored afterwards.
    pub fn set_uniform(&self, name: &str, value: impl UniformValue) {
        let Some(location) = self.uniform_location(name) else {
            return;
        };
        let api = self.ctx.api();
        let _current = BindGuard::program(api, self.handle);
        value.apply(api, location);
    }

    /// Points sampler `name` at `unit` and binds `texture` there.
    pub fn set_texture(&self, name: &str, texture: &Texture, unit: u32) {
        self.set_uniform(name, unit as i32);
        texture.bind(unit);
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.ctx.api().delete_program(self.handle);
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("attributes", &self.reflection.attributes)
            .field("uniforms", &self.reflection.uniforms)
            .field("uniform_blocks", &self.reflection.blocks)
            .finish()
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| {
        log::error!("failed to read shader source {}: {source}", path.display());
        EngineError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{TextureTarget, UniformData};
    use std::rc::Rc;

    const VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec2 aUv;
in float aUnused;
out vec2 vUv;
uniform mat4 uModel;
uniform float uDead;
layout (std140) uniform Camera {
    mat4 view;
    vec3 eye;
};
void main() {
    vUv = aUv;
    gl_Position = view * uModel * vec4(aPos, 1.0);
}
";

    const FRAGMENT: &str = "#version 330 core
in vec2 vUv;
out vec4 FragColor;
uniform sampler2D uTexture;
uniform vec4 uTint;
uniform float uWeights[3];
void main() {
    FragColor = texture(uTexture, vUv) * uTint * uWeights[1];
}
";

    fn program() -> (ShaderProgram, Rc<crate::gl::HeadlessGl>) {
        let (ctx, gl) = GlContext::headless();
        let program = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        (program, gl)
    }

    // ── build ──────────────────────────────────────────────────────────────

    #[test]
    fn linked_program_has_a_handle_and_no_stage_objects() {
        let (program, gl) = program();
        assert_ne!(program.handle(), 0);
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 1);
        drop(program);
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn compile_error_names_the_stage_and_cleans_up() {
        let (ctx, gl) = GlContext::headless();
        let broken = "#version 330 core\nout vec4 c;\nvoid main() { c = vec4(1.0);\n";

        let err = ShaderProgram::from_sources(&ctx, VERTEX, broken).unwrap_err();

        match err {
            EngineError::CompileFailed { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn vertex_failure_wins_when_both_stages_fail() {
        let (ctx, _gl) = GlContext::headless();
        let err = ShaderProgram::from_sources(&ctx, "void f() {}", "void g() {}").unwrap_err();
        assert!(matches!(
            err,
            EngineError::CompileFailed { stage: ShaderStage::Vertex, .. }
        ));
    }

    #[test]
    fn link_error_is_reported_and_program_released() {
        let (ctx, gl) = GlContext::headless();
        let fragment = "in vec3 vNormal;\nout vec4 c;\nvoid main() { c = vec4(vNormal, 1.0); }\n";

        let err = ShaderProgram::from_sources(&ctx, VERTEX, fragment).unwrap_err();

        assert!(matches!(err, EngineError::LinkFailed { .. }));
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn unreadable_source_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.vert");
        let (ctx, _gl) = GlContext::headless();

        let err = ShaderProgram::from_files(&ctx, &missing, &missing).unwrap_err();

        match err {
            EngineError::SourceUnreadable { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_files_reads_both_stages() {
        let dir = tempfile::tempdir().unwrap();
        let vs = dir.path().join("a.vert");
        let fs = dir.path().join("a.frag");
        std::fs::write(&vs, VERTEX).unwrap();
        std::fs::write(&fs, FRAGMENT).unwrap();
        let (ctx, _gl) = GlContext::headless();

        let program = ShaderProgram::from_files(&ctx, &vs, &fs).unwrap();
        assert_eq!(program.uniforms().len(), 4);
    }

    // ── reflection ─────────────────────────────────────────────────────────

    #[test]
    fn reflection_lists_only_active_declarations() {
        let (program, _gl) = program();

        let attributes: Vec<_> = program
            .attributes()
            .iter()
            .map(|a| (a.name.as_str(), a.location, a.ty))
            .collect();
        assert_eq!(
            attributes,
            [("aPos", 0, glow::FLOAT_VEC3), ("aUv", 1, glow::FLOAT_VEC2)]
        );

        let uniforms: Vec<_> = program
            .uniforms()
            .iter()
            .map(|u| (u.name.as_str(), u.size))
            .collect();
        assert_eq!(
            uniforms,
            [("uModel", 1), ("uTexture", 1), ("uTint", 1), ("uWeights[0]", 3)]
        );

        let blocks = program.uniform_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "Camera");
        assert_eq!(blocks[0].index, 0);
        assert_eq!(blocks[0].data_size, 80);
        assert_eq!(blocks[0].binding, 0);
    }

    // ── uniforms ───────────────────────────────────────────────────────────

    #[test]
    fn unknown_uniform_is_queried_once() {
        let (program, gl) = program();
        let before = gl.uniform_location_queries();

        assert_eq!(program.uniform_location("uMissing"), None);
        assert_eq!(program.uniform_location("uMissing"), None);
        program.set_uniform("uMissing", 1.0f32);

        assert_eq!(gl.uniform_location_queries(), before + 1);
    }

    #[test]
    fn miss_does_not_evict_an_earlier_hit() {
        let (program, _gl) = program();
        let tint = program.uniform_location("uTint");
        assert!(tint.is_some());
        assert_eq!(program.uniform_location("nope"), None);
        assert_eq!(program.uniform_location("uTint"), tint);
    }

    #[test]
    fn block_members_are_not_addressable_uniforms() {
        let (program, gl) = program();
        // uModel, uTexture, uTint, uWeights[0], then view and eye from Camera.
        assert_eq!(gl.active_uniform_count(program.handle()), 6);
        assert!(program.uniforms().iter().all(|u| u.location >= 0));

        assert_eq!(program.uniform_location("view"), None);
        assert_eq!(program.uniform_location("eye"), None);
        program.set_uniform("view", glam::Mat4::IDENTITY);
        assert!(gl.take_errors().is_empty());
    }

    #[test]
    fn array_elements_resolve_past_the_base() {
        let (program, _gl) = program();
        let base = program.uniform_location("uWeights[0]").unwrap();
        assert_eq!(program.uniform_location("uWeights[2]"), Some(base + 2));
        assert_eq!(program.uniform_location("uWeights[3]"), None);
    }

    #[test]
    fn set_uniform_writes_typed_values() {
        let (program, gl) = program();
        let h = program.handle();

        program.set_uniform("uTint", glam::Vec4::new(1.0, 0.5, 0.25, 1.0));
        program.set_uniform("uWeights[1]", 0.75f32);
        program.set_uniform("uModel", glam::Mat4::from_translation(glam::Vec3::X));

        let tint = program.uniform_location("uTint").unwrap();
        assert_eq!(
            gl.uniform_value(h, tint),
            Some(UniformData::Floats(vec![1.0, 0.5, 0.25, 1.0]))
        );
        let weight = program.uniform_location("uWeights[1]").unwrap();
        assert_eq!(gl.uniform_value(h, weight), Some(UniformData::Floats(vec![0.75])));
        let model = program.uniform_location("uModel").unwrap();
        match gl.uniform_value(h, model) {
            Some(UniformData::Floats(m)) => assert_eq!(&m[12..16], &[1.0, 0.0, 0.0, 1.0]),
            other => panic!("unexpected value: {other:?}"),
        }
        assert!(gl.take_errors().is_empty());
    }

    #[test]
    fn set_uniform_restores_the_current_program() {
        let (ctx, gl) = GlContext::headless();
        let a = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        let b = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        a.use_program();

        b.set_uniform("uTint", [0.0f32, 1.0, 0.0, 1.0]);

        assert_eq!(gl.current_program(), a.handle());
    }

    #[test]
    fn set_texture_binds_the_unit() {
        let (ctx, gl) = GlContext::headless();
        let program = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        let texture = Texture::new(&ctx, TextureTarget::Texture2D);

        program.set_texture("uTexture", &texture, 2);

        let sampler = program.uniform_location("uTexture").unwrap();
        assert_eq!(gl.uniform_value(program.handle(), sampler), Some(UniformData::Int(2)));
        assert_eq!(gl.texture_on_unit(2, glow::TEXTURE_2D), texture.handle());
    }
}
