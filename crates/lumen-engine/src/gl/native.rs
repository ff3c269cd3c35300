//! [`GlApi`] backed by a live `glow::Context`.

use std::cell::Cell;
use std::num::NonZeroU32;

use glow::HasContext;

use super::api::{ActiveVariable, GlApi};

/// Function table of a real OpenGL context.
///
/// The owning window calls [`GlowApi::release`] before it destroys the
/// context; from then on deletions are skipped instead of calling into a
/// dead context.
pub struct GlowApi {
    gl: glow::Context,
    live: Cell<bool>,
}

impl GlowApi {
    /// Wraps a loaded function table.
    ///
    /// # Safety
    ///
    /// The context `gl` was loaded from must be current on this thread and
    /// stay current until [`release`](Self::release) is called.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            live: Cell::new(true),
        }
    }

    /// Marks the context as destroyed.
    pub fn release(&self) {
        self.live.set(false);
    }

    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    /// The driver's `GL_VERSION` string.
    pub fn version_string(&self) -> String {
        unsafe { self.gl.get_parameter_string(glow::VERSION) }
    }
}

fn nz(handle: u32) -> Option<NonZeroU32> {
    NonZeroU32::new(handle)
}

fn location(location: i32) -> Option<glow::NativeUniformLocation> {
    u32::try_from(location).ok().map(glow::NativeUniformLocation)
}

// SAFETY (all blocks below): `GlowApi::new` requires the context to be
// current on the calling thread while the value is live.
impl GlApi for GlowApi {
    fn create_buffer(&self) -> u32 {
        match unsafe { self.gl.create_buffer() } {
            Ok(buffer) => buffer.0.get(),
            Err(e) => {
                log::warn!("glGenBuffers failed: {e}");
                0
            }
        }
    }

    fn delete_buffer(&self, buffer: u32) {
        if let (true, Some(id)) = (self.is_live(), nz(buffer)) {
            unsafe { self.gl.delete_buffer(glow::NativeBuffer(id)) }
        }
    }

    fn bind_buffer(&self, target: u32, buffer: u32) {
        unsafe { self.gl.bind_buffer(target, nz(buffer).map(glow::NativeBuffer)) }
    }

    fn buffer_binding(&self, target: u32) -> u32 {
        let query = match target {
            glow::ARRAY_BUFFER => glow::ARRAY_BUFFER_BINDING,
            glow::ELEMENT_ARRAY_BUFFER => glow::ELEMENT_ARRAY_BUFFER_BINDING,
            glow::UNIFORM_BUFFER => glow::UNIFORM_BUFFER_BINDING,
            _ => return 0,
        };
        unsafe { self.gl.get_parameter_i32(query) as u32 }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset as i32, data) }
    }

    fn get_buffer_sub_data(&self, target: u32, offset: usize, dst: &mut [u8]) {
        unsafe { self.gl.get_buffer_sub_data(target, offset as i32, dst) }
    }

    fn create_vertex_array(&self) -> u32 {
        match unsafe { self.gl.create_vertex_array() } {
            Ok(vao) => vao.0.get(),
            Err(e) => {
                log::warn!("glGenVertexArrays failed: {e}");
                0
            }
        }
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        if let (true, Some(id)) = (self.is_live(), nz(vertex_array)) {
            unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(id)) }
        }
    }

    fn bind_vertex_array(&self, vertex_array: u32) {
        unsafe {
            self.gl
                .bind_vertex_array(nz(vertex_array).map(glow::NativeVertexArray))
        }
    }

    fn vertex_array_binding(&self) -> u32 {
        unsafe { self.gl.get_parameter_i32(glow::VERTEX_ARRAY_BINDING) as u32 }
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(slot) }
    }

    fn vertex_attrib_pointer(
        &self,
        slot: u32,
        components: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(slot, components, ty, normalized, stride, offset)
        }
    }

    fn create_texture(&self) -> u32 {
        match unsafe { self.gl.create_texture() } {
            Ok(texture) => texture.0.get(),
            Err(e) => {
                log::warn!("glGenTextures failed: {e}");
                0
            }
        }
    }

    fn delete_texture(&self, texture: u32) {
        if let (true, Some(id)) = (self.is_live(), nz(texture)) {
            unsafe { self.gl.delete_texture(glow::NativeTexture(id)) }
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn active_texture_unit(&self) -> u32 {
        let active = unsafe { self.gl.get_parameter_i32(glow::ACTIVE_TEXTURE) } as u32;
        active.saturating_sub(glow::TEXTURE0)
    }

    fn bind_texture(&self, target: u32, texture: u32) {
        unsafe { self.gl.bind_texture(target, nz(texture).map(glow::NativeTexture)) }
    }

    fn texture_binding(&self, target: u32) -> u32 {
        let query = match target {
            glow::TEXTURE_2D => glow::TEXTURE_BINDING_2D,
            _ => return 0,
        };
        unsafe { self.gl.get_parameter_i32(query) as u32 }
    }

    fn tex_image_2d_rgba8(&self, target: u32, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            )
        }
    }

    fn generate_mipmap(&self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }

    fn create_shader(&self, stage: u32) -> u32 {
        match unsafe { self.gl.create_shader(stage) } {
            Ok(shader) => shader.0.get(),
            Err(e) => {
                log::warn!("glCreateShader failed: {e}");
                0
            }
        }
    }

    fn delete_shader(&self, shader: u32) {
        if let (true, Some(id)) = (self.is_live(), nz(shader)) {
            unsafe { self.gl.delete_shader(glow::NativeShader(id)) }
        }
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(id) = nz(shader) {
            unsafe { self.gl.shader_source(glow::NativeShader(id), source) }
        }
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(id) = nz(shader) {
            unsafe { self.gl.compile_shader(glow::NativeShader(id)) }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        nz(shader).is_some_and(|id| unsafe {
            self.gl.get_shader_compile_status(glow::NativeShader(id))
        })
    }

    fn shader_info_log(&self, shader: u32) -> String {
        nz(shader)
            .map(|id| unsafe { self.gl.get_shader_info_log(glow::NativeShader(id)) })
            .unwrap_or_default()
    }

    fn create_program(&self) -> u32 {
        match unsafe { self.gl.create_program() } {
            Ok(program) => program.0.get(),
            Err(e) => {
                log::warn!("glCreateProgram failed: {e}");
                0
            }
        }
    }

    fn delete_program(&self, program: u32) {
        if let (true, Some(id)) = (self.is_live(), nz(program)) {
            unsafe { self.gl.delete_program(glow::NativeProgram(id)) }
        }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let (Some(p), Some(s)) = (nz(program), nz(shader)) {
            unsafe {
                self.gl
                    .attach_shader(glow::NativeProgram(p), glow::NativeShader(s))
            }
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        if let (Some(p), Some(s)) = (nz(program), nz(shader)) {
            unsafe {
                self.gl
                    .detach_shader(glow::NativeProgram(p), glow::NativeShader(s))
            }
        }
    }

    fn link_program(&self, program: u32) {
        if let Some(id) = nz(program) {
            unsafe { self.gl.link_program(glow::NativeProgram(id)) }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        nz(program).is_some_and(|id| unsafe {
            self.gl.get_program_link_status(glow::NativeProgram(id))
        })
    }

    fn program_info_log(&self, program: u32) -> String {
        nz(program)
            .map(|id| unsafe { self.gl.get_program_info_log(glow::NativeProgram(id)) })
            .unwrap_or_default()
    }

    fn use_program(&self, program: u32) {
        unsafe { self.gl.use_program(nz(program).map(glow::NativeProgram)) }
    }

    fn current_program(&self) -> u32 {
        unsafe { self.gl.get_parameter_i32(glow::CURRENT_PROGRAM) as u32 }
    }

    fn active_attribute_count(&self, program: u32) -> u32 {
        nz(program)
            .map(|id| unsafe { self.gl.get_active_attributes(glow::NativeProgram(id)) })
            .unwrap_or(0)
    }

    fn active_attribute(&self, program: u32, index: u32) -> Option<ActiveVariable> {
        let id = nz(program)?;
        let attribute = unsafe { self.gl.get_active_attribute(glow::NativeProgram(id), index) }?;
        Some(ActiveVariable {
            name: attribute.name,
            ty: attribute.atype,
            size: attribute.size,
        })
    }

    fn attribute_location(&self, program: u32, name: &str) -> i32 {
        nz(program)
            .and_then(|id| unsafe { self.gl.get_attrib_location(glow::NativeProgram(id), name) })
            .map_or(-1, |slot| slot as i32)
    }

    fn active_uniform_count(&self, program: u32) -> u32 {
        nz(program)
            .map(|id| unsafe { self.gl.get_active_uniforms(glow::NativeProgram(id)) })
            .unwrap_or(0)
    }

    fn active_uniform(&self, program: u32, index: u32) -> Option<ActiveVariable> {
        let id = nz(program)?;
        let uniform = unsafe { self.gl.get_active_uniform(glow::NativeProgram(id), index) }?;
        Some(ActiveVariable {
            name: uniform.name,
            ty: uniform.utype,
            size: uniform.size,
        })
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        nz(program)
            .and_then(|id| unsafe { self.gl.get_uniform_location(glow::NativeProgram(id), name) })
            .map_or(-1, |loc| loc.0 as i32)
    }

    fn active_uniform_block_count(&self, program: u32) -> u32 {
        nz(program)
            .map(|id| unsafe {
                self.gl
                    .get_program_parameter_i32(glow::NativeProgram(id), glow::ACTIVE_UNIFORM_BLOCKS)
            })
            .map_or(0, |count| count.max(0) as u32)
    }

    fn uniform_block_name(&self, program: u32, index: u32) -> String {
        nz(program)
            .map(|id| unsafe {
                self.gl
                    .get_active_uniform_block_name(glow::NativeProgram(id), index)
            })
            .unwrap_or_default()
    }

    fn uniform_block_parameter(&self, program: u32, index: u32, parameter: u32) -> i32 {
        nz(program)
            .map(|id| unsafe {
                self.gl.get_active_uniform_block_parameter_i32(
                    glow::NativeProgram(id),
                    index,
                    parameter,
                )
            })
            .unwrap_or(0)
    }

    fn uniform_1_i32(&self, loc: i32, value: i32) {
        unsafe { self.gl.uniform_1_i32(location(loc).as_ref(), value) }
    }

    fn uniform_1_f32(&self, loc: i32, value: f32) {
        unsafe { self.gl.uniform_1_f32(location(loc).as_ref(), value) }
    }

    fn uniform_2_f32(&self, loc: i32, value: &[f32; 2]) {
        unsafe { self.gl.uniform_2_f32_slice(location(loc).as_ref(), value) }
    }

    fn uniform_3_f32(&self, loc: i32, value: &[f32; 3]) {
        unsafe { self.gl.uniform_3_f32_slice(location(loc).as_ref(), value) }
    }

    fn uniform_4_f32(&self, loc: i32, value: &[f32; 4]) {
        unsafe { self.gl.uniform_4_f32_slice(location(loc).as_ref(), value) }
    }

    fn uniform_matrix_4_f32(&self, loc: i32, value: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(location(loc).as_ref(), false, value)
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, index_type, offset) }
    }
}
