/// Name, type tag and array size of one active program variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    /// Native type tag (`glow::FLOAT_VEC3`, `glow::SAMPLER_2D`, ...).
    pub ty: u32,
    pub size: i32,
}

/// The slice of OpenGL 3.3 core the wrappers are written against.
///
/// Handles are raw names with `0` as the null handle; uniform locations use
/// `-1` for "not found", as the native API does. Implementations must only
/// be used on the thread whose context is current.
pub trait GlApi {
    // ── buffers ───────────────────────────────────────────────────────────

    /// Allocates a buffer name, or returns `0` when the device refuses.
    fn create_buffer(&self) -> u32;
    fn delete_buffer(&self, buffer: u32);
    fn bind_buffer(&self, target: u32, buffer: u32);
    fn buffer_binding(&self, target: u32) -> u32;
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]);
    fn get_buffer_sub_data(&self, target: u32, offset: usize, dst: &mut [u8]);

    // ── vertex arrays ─────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> u32;
    fn delete_vertex_array(&self, vertex_array: u32);
    fn bind_vertex_array(&self, vertex_array: u32);
    fn vertex_array_binding(&self) -> u32;
    fn enable_vertex_attrib_array(&self, slot: u32);
    fn vertex_attrib_pointer(
        &self,
        slot: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> u32;
    fn delete_texture(&self, texture: u32);
    /// Selects texture unit `unit` (zero based, not `TEXTURE0 + n`).
    fn active_texture(&self, unit: u32);
    fn active_texture_unit(&self) -> u32;
    fn bind_texture(&self, target: u32, texture: u32);
    /// Texture bound to `target` on the active unit.
    fn texture_binding(&self, target: u32) -> u32;
    fn tex_image_2d_rgba8(&self, target: u32, width: u32, height: u32, pixels: &[u8]);
    fn generate_mipmap(&self, target: u32);
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);

    // ── shaders & programs ────────────────────────────────────────────────

    fn create_shader(&self, stage: u32) -> u32;
    fn delete_shader(&self, shader: u32);
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn shader_compile_status(&self, shader: u32) -> bool;
    fn shader_info_log(&self, shader: u32) -> String;

    fn create_program(&self) -> u32;
    fn delete_program(&self, program: u32);
    fn attach_shader(&self, program: u32, shader: u32);
    fn detach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, program: u32);
    fn program_link_status(&self, program: u32) -> bool;
    fn program_info_log(&self, program: u32) -> String;
    fn use_program(&self, program: u32);
    fn current_program(&self) -> u32;

    // ── reflection ────────────────────────────────────────────────────────

    fn active_attribute_count(&self, program: u32) -> u32;
    fn active_attribute(&self, program: u32, index: u32) -> Option<ActiveVariable>;
    fn attribute_location(&self, program: u32, name: &str) -> i32;
    fn active_uniform_count(&self, program: u32) -> u32;
    fn active_uniform(&self, program: u32, index: u32) -> Option<ActiveVariable>;
    fn uniform_location(&self, program: u32, name: &str) -> i32;
    fn active_uniform_block_count(&self, program: u32) -> u32;
    fn uniform_block_name(&self, program: u32, index: u32) -> String;
    /// Queries `UNIFORM_BLOCK_DATA_SIZE`, `UNIFORM_BLOCK_BINDING`, ...
    fn uniform_block_parameter(&self, program: u32, index: u32, parameter: u32) -> i32;

    // ── uniforms (current program) ────────────────────────────────────────

    fn uniform_1_i32(&self, location: i32, value: i32);
    fn uniform_1_f32(&self, location: i32, value: f32);
    fn uniform_2_f32(&self, location: i32, value: &[f32; 2]);
    fn uniform_3_f32(&self, location: i32, value: &[f32; 3]);
    fn uniform_4_f32(&self, location: i32, value: &[f32; 4]);
    /// Column-major 4×4 matrix.
    fn uniform_matrix_4_f32(&self, location: i32, value: &[f32; 16]);

    // ── framebuffer & draws ───────────────────────────────────────────────

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: u32);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32);
}
