//! Software model of the OpenGL object and binding-point state machine.
//!
//! `HeadlessGl` implements [`GlApi`] without a driver. It keeps buffer and
//! texture storage in memory, tracks every binding point, links programs
//! with the interface scanner in [`glsl`], and resolves indexed draws
//! against the bound vertex layout. Misuse that a driver reports through
//! `glGetError` is recorded and can be drained with
//! [`take_errors`](HeadlessGl::take_errors).

mod glsl;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use super::api::{ActiveVariable, GlApi};

/// Attribute pointer state of one vertex-array slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttribPointer {
    pub enabled: bool,
    pub buffer: u32,
    pub components: i32,
    pub ty: u32,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

impl Default for AttribPointer {
    fn default() -> Self {
        Self {
            enabled: false,
            buffer: 0,
            components: 4,
            ty: glow::FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }
}

/// Last value written to a uniform location.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Int(i32),
    Floats(Vec<f32>),
}

/// One resolved indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub mode: u32,
    pub program: u32,
    pub indices: Vec<u32>,
    /// Per enabled slot, the components fetched for each index, in order.
    pub fetched: BTreeMap<u32, Vec<f32>>,
}

#[derive(Debug, Default)]
struct VertexArrayState {
    slots: BTreeMap<u32, AttribPointer>,
    element_buffer: u32,
}

#[derive(Debug, Default)]
struct TextureState {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    levels: u32,
    parameters: HashMap<u32, i32>,
}

#[derive(Debug)]
struct ShaderObject {
    stage: u32,
    source: String,
    interface: Option<glsl::Interface>,
    log: String,
}

#[derive(Debug, Clone)]
struct LinkedUniform {
    variable: ActiveVariable,
    base: String,
    location: i32,
}

#[derive(Debug, Clone)]
struct LinkedBlock {
    name: String,
    size: i32,
    binding: i32,
}

#[derive(Debug, Default)]
struct LinkedProgram {
    attributes: Vec<(ActiveVariable, i32)>,
    uniforms: Vec<LinkedUniform>,
    blocks: Vec<LinkedBlock>,
    values: HashMap<i32, UniformData>,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: Option<LinkedProgram>,
    log: String,
}

#[derive(Debug, Default)]
struct State {
    next_name: u32,
    deny_allocations: bool,

    buffers: HashMap<u32, Vec<u8>>,
    buffer_bindings: HashMap<u32, u32>,

    vertex_arrays: HashMap<u32, VertexArrayState>,
    bound_vertex_array: u32,

    textures: HashMap<u32, TextureState>,
    active_unit: u32,
    unit_bindings: HashMap<(u32, u32), u32>,

    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    current_program: u32,

    clear_color: [f32; 4],
    clears: usize,
    viewport: [i32; 4],
    draws: Vec<DrawRecord>,
    errors: Vec<u32>,
    uniform_location_queries: usize,
}

impl State {
    fn allocate(&mut self) -> u32 {
        if self.deny_allocations {
            return 0;
        }
        self.next_name += 1;
        self.next_name
    }

    fn error(&mut self, code: u32) {
        self.errors.push(code);
    }

    /// The vertex array that currently owns the element-array binding point.
    fn vertex_array_state(&mut self) -> &mut VertexArrayState {
        self.vertex_arrays
            .entry(self.bound_vertex_array)
            .or_default()
    }

    fn bound_buffer(&self, target: u32) -> u32 {
        if target == glow::ELEMENT_ARRAY_BUFFER {
            return self
                .vertex_arrays
                .get(&self.bound_vertex_array)
                .map_or(0, |vao| vao.element_buffer);
        }
        self.buffer_bindings.get(&target).copied().unwrap_or(0)
    }

    fn bound_storage(&mut self, target: u32) -> Option<&mut Vec<u8>> {
        let id = self.bound_buffer(target);
        if id == 0 {
            self.error(glow::INVALID_OPERATION);
            return None;
        }
        self.buffers.get_mut(&id)
    }

    fn bound_texture(&self, target: u32) -> u32 {
        self.unit_bindings
            .get(&(self.active_unit, target))
            .copied()
            .unwrap_or(0)
    }

    fn set_uniform(&mut self, location: i32, data: UniformData) {
        if location == -1 {
            return;
        }
        let current = self.current_program;
        let Some(linked) = self
            .programs
            .get_mut(&current)
            .and_then(|p| p.linked.as_mut())
        else {
            self.error(glow::INVALID_OPERATION);
            return;
        };
        let valid = linked.uniforms.iter().any(|u| {
            u.location >= 0
                && location >= u.location
                && location < u.location + u.variable.size.max(1)
        });
        if !valid {
            self.errors.push(glow::INVALID_OPERATION);
            return;
        }
        linked.values.insert(location, data);
    }
}

/// Driverless [`GlApi`] implementation.
#[derive(Debug, Default)]
pub struct HeadlessGl {
    state: RefCell<State>,
}

impl HeadlessGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `create_*` call return the null handle.
    pub fn deny_allocations(&self, deny: bool) {
        self.state.borrow_mut().deny_allocations = deny;
    }

    /// Drains the recorded error codes (`glow::INVALID_OPERATION`, ...).
    pub fn take_errors(&self) -> Vec<u32> {
        std::mem::take(&mut self.state.borrow_mut().errors)
    }

    pub fn buffer_contents(&self, buffer: u32) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state
            .borrow()
            .vertex_arrays
            .keys()
            .filter(|&&id| id != 0)
            .count()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn attrib_pointer(&self, vertex_array: u32, slot: u32) -> Option<AttribPointer> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .and_then(|vao| vao.slots.get(&slot).copied())
    }

    pub fn element_buffer(&self, vertex_array: u32) -> u32 {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map_or(0, |vao| vao.element_buffer)
    }

    pub fn texture_size(&self, texture: u32) -> Option<(u32, u32)> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|t| (t.width, t.height))
    }

    pub fn texture_pixels(&self, texture: u32) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|t| t.pixels.clone())
    }

    pub fn texture_levels(&self, texture: u32) -> u32 {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map_or(0, |t| t.levels)
    }

    pub fn texture_parameter(&self, texture: u32, parameter: u32) -> Option<i32> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .and_then(|t| t.parameters.get(&parameter).copied())
    }

    /// Texture bound to `target` on `unit`, regardless of the active unit.
    pub fn texture_on_unit(&self, unit: u32, target: u32) -> u32 {
        self.state
            .borrow()
            .unit_bindings
            .get(&(unit, target))
            .copied()
            .unwrap_or(0)
    }

    pub fn uniform_value(&self, program: u32, location: i32) -> Option<UniformData> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.values.get(&location).cloned())
    }

    /// Number of `uniform_location` calls served so far.
    pub fn uniform_location_queries(&self) -> usize {
        self.state.borrow().uniform_location_queries
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    pub fn clear_count(&self) -> usize {
        self.state.borrow().clears
    }

    pub fn viewport_rect(&self) -> [i32; 4] {
        self.state.borrow().viewport
    }

    fn link(state: &State, attached: &[u32]) -> Result<LinkedProgram, String> {
        let mut vertex = None;
        let mut fragment = None;
        for id in attached {
            let Some(shader) = state.shaders.get(id) else {
                continue;
            };
            let Some(interface) = shader.interface.as_ref() else {
                return Err(format!(
                    "error: attached shader {id} has not been compiled successfully"
                ));
            };
            match shader.stage {
                glow::VERTEX_SHADER => vertex = Some(interface),
                glow::FRAGMENT_SHADER => fragment = Some(interface),
                _ => {}
            }
        }
        let vertex = vertex.ok_or("error: program has no vertex shader attached")?;
        let fragment = fragment.ok_or("error: program has no fragment shader attached")?;

        for input in fragment.with_storage(glsl::Storage::In).filter(|d| d.active) {
            let written = vertex
                .with_storage(glsl::Storage::Out)
                .find(|out| out.name == input.name);
            match written {
                None => {
                    return Err(format!(
                        "error: fragment shader input '{}' is not written by the vertex shader",
                        input.name
                    ));
                }
                Some(out) if out.ty != input.ty => {
                    return Err(format!(
                        "error: type mismatch for varying '{}' ({} vs {})",
                        input.name, out.ty, input.ty
                    ));
                }
                Some(_) => {}
            }
        }

        let mut linked = LinkedProgram::default();

        // Attributes: explicit locations first, then the lowest free slot.
        let inputs: Vec<_> = vertex
            .with_storage(glsl::Storage::In)
            .filter(|d| d.active)
            .collect();
        let mut taken: Vec<i32> = inputs
            .iter()
            .filter_map(|d| d.location.map(|l| l as i32))
            .collect();
        for input in inputs {
            let location = match input.location {
                Some(l) => l as i32,
                None => {
                    let free = (0..).find(|l| !taken.contains(l)).unwrap_or(0);
                    taken.push(free);
                    free
                }
            };
            let variable = ActiveVariable {
                name: input.name.clone(),
                ty: glsl::type_tag(&input.ty).unwrap_or(glow::FLOAT),
                size: input.array_len.map_or(1, |n| n as i32),
            };
            linked.attributes.push((variable, location));
        }

        // Default-block uniforms, merged across stages.
        let mut next_location = 0;
        for decl in vertex
            .with_storage(glsl::Storage::Uniform)
            .chain(fragment.with_storage(glsl::Storage::Uniform))
        {
            if let Some(existing) = linked.uniforms.iter().find(|u| u.base == decl.name) {
                let ty = glsl::type_tag(&decl.ty).unwrap_or(0);
                if existing.variable.ty != ty {
                    return Err(format!(
                        "error: uniform '{}' declared with different types across stages",
                        decl.name
                    ));
                }
                continue;
            }
            let active = vertex
                .with_storage(glsl::Storage::Uniform)
                .chain(fragment.with_storage(glsl::Storage::Uniform))
                .any(|d| d.name == decl.name && d.active);
            if !active {
                continue;
            }
            let size = decl.array_len.map_or(1, |n| n as i32);
            let name = match decl.array_len {
                Some(_) => format!("{}[0]", decl.name),
                None => decl.name.clone(),
            };
            linked.uniforms.push(LinkedUniform {
                variable: ActiveVariable {
                    name,
                    ty: glsl::type_tag(&decl.ty).unwrap_or(0),
                    size,
                },
                base: decl.name.clone(),
                location: next_location,
            });
            next_location += size;
        }

        for block in vertex.blocks.iter().chain(fragment.blocks.iter()) {
            if !block.active || linked.blocks.iter().any(|b| b.name == block.name) {
                continue;
            }
            linked.blocks.push(LinkedBlock {
                name: block.name.clone(),
                size: glsl::std140_block_size(&block.members) as i32,
                binding: block.binding.map_or(0, |b| b as i32),
            });
            // Block members are active uniforms without a location.
            for member in &block.members {
                let size = member.array_len.map_or(1, |n| n as i32);
                let name = match member.array_len {
                    Some(_) => format!("{}[0]", member.name),
                    None => member.name.clone(),
                };
                linked.uniforms.push(LinkedUniform {
                    variable: ActiveVariable {
                        name,
                        ty: glsl::type_tag(&member.ty).unwrap_or(0),
                        size,
                    },
                    base: member.name.clone(),
                    location: -1,
                });
            }
        }

        Ok(linked)
    }

    /// Reads the indices and every enabled attribute they reference, or
    /// `None` when any read falls outside its buffer.
    fn resolve_draw(
        s: &State,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: i32,
    ) -> Option<DrawRecord> {
        if count < 0 || offset < 0 {
            return None;
        }
        let vao = s
            .vertex_arrays
            .get(&s.bound_vertex_array)
            .filter(|_| s.bound_vertex_array != 0)?;
        let index_bytes = s.buffers.get(&vao.element_buffer)?.get(offset as usize..)?;
        let indices = (0..count as usize)
            .map(|i| Self::fetch_index(index_bytes, index_type, i))
            .collect::<Option<Vec<_>>>()?;

        let mut fetched = BTreeMap::new();
        for (slot, pointer) in vao.slots.iter().filter(|(_, p)| p.enabled) {
            let storage = s.buffers.get(&pointer.buffer)?;
            let component = Self::component_size(pointer.ty);
            let element = component * pointer.components as usize;
            let stride = match pointer.stride {
                0 => element,
                explicit => explicit as usize,
            };

            let mut values = Vec::with_capacity(indices.len() * pointer.components as usize);
            for &index in &indices {
                let start = (index as usize)
                    .checked_mul(stride)?
                    .checked_add(usize::try_from(pointer.offset).ok()?)?;
                let bytes = storage.get(start..start.checked_add(element)?)?;
                values.extend(
                    bytes
                        .chunks_exact(component)
                        .map(|c| Self::decode_component(c, pointer.ty)),
                );
            }
            fetched.insert(*slot, values);
        }

        Some(DrawRecord {
            mode,
            program: s.current_program,
            indices,
            fetched,
        })
    }

    fn fetch_index(bytes: &[u8], index_type: u32, i: usize) -> Option<u32> {
        match index_type {
            glow::UNSIGNED_BYTE => bytes.get(i).map(|&b| b as u32),
            glow::UNSIGNED_SHORT => bytes
                .get(i * 2..i * 2 + 2)
                .map(|b| u16::from_ne_bytes([b[0], b[1]]) as u32),
            glow::UNSIGNED_INT => bytes
                .get(i * 4..i * 4 + 4)
                .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
            _ => None,
        }
    }

    fn decode_component(bytes: &[u8], ty: u32) -> f32 {
        match ty {
            glow::FLOAT => f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            glow::INT => i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            glow::UNSIGNED_INT => u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            glow::SHORT => i16::from_ne_bytes([bytes[0], bytes[1]]) as f32,
            glow::UNSIGNED_SHORT => u16::from_ne_bytes([bytes[0], bytes[1]]) as f32,
            glow::BYTE => bytes[0] as i8 as f32,
            glow::UNSIGNED_BYTE => bytes[0] as f32,
            _ => 0.0,
        }
    }

    fn component_size(ty: u32) -> usize {
        match ty {
            glow::BYTE | glow::UNSIGNED_BYTE => 1,
            glow::SHORT | glow::UNSIGNED_SHORT | glow::HALF_FLOAT => 2,
            _ => 4,
        }
    }
}

impl GlApi for HeadlessGl {
    fn create_buffer(&self) -> u32 {
        let mut s = self.state.borrow_mut();
        let id = s.allocate();
        if id != 0 {
            s.buffers.insert(id, Vec::new());
        }
        id
    }

    fn delete_buffer(&self, buffer: u32) {
        let mut s = self.state.borrow_mut();
        if s.buffers.remove(&buffer).is_none() {
            s.error(glow::INVALID_VALUE);
            return;
        }
        // Deleting a bound buffer resets the binding to zero.
        s.buffer_bindings.retain(|_, bound| *bound != buffer);
        for vao in s.vertex_arrays.values_mut() {
            if vao.element_buffer == buffer {
                vao.element_buffer = 0;
            }
        }
    }

    fn bind_buffer(&self, target: u32, buffer: u32) {
        let mut s = self.state.borrow_mut();
        if buffer != 0 && !s.buffers.contains_key(&buffer) {
            s.error(glow::INVALID_OPERATION);
            return;
        }
        if target == glow::ELEMENT_ARRAY_BUFFER {
            s.vertex_array_state().element_buffer = buffer;
        } else {
            s.buffer_bindings.insert(target, buffer);
        }
    }

    fn buffer_binding(&self, target: u32) -> u32 {
        self.state.borrow().bound_buffer(target)
    }

    fn buffer_data(&self, target: u32, data: &[u8], _usage: u32) {
        let mut s = self.state.borrow_mut();
        if let Some(storage) = s.bound_storage(target) {
            *storage = data.to_vec();
        }
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        let mut s = self.state.borrow_mut();
        let Some(storage) = s.bound_storage(target) else {
            return;
        };
        match storage.get_mut(offset..offset + data.len()) {
            Some(range) => range.copy_from_slice(data),
            None => s.error(glow::INVALID_VALUE),
        }
    }

    fn get_buffer_sub_data(&self, target: u32, offset: usize, dst: &mut [u8]) {
        let mut s = self.state.borrow_mut();
        let Some(storage) = s.bound_storage(target) else {
            return;
        };
        match storage.get(offset..offset + dst.len()) {
            Some(range) => dst.copy_from_slice(range),
            None => s.error(glow::INVALID_VALUE),
        }
    }

    fn create_vertex_array(&self) -> u32 {
        let mut s = self.state.borrow_mut();
        let id = s.allocate();
        if id != 0 {
            s.vertex_arrays.insert(id, VertexArrayState::default());
        }
        id
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        let mut s = self.state.borrow_mut();
        if vertex_array == 0 || s.vertex_arrays.remove(&vertex_array).is_none() {
            s.error(glow::INVALID_VALUE);
            return;
        }
        if s.bound_vertex_array == vertex_array {
            s.bound_vertex_array = 0;
        }
    }

    fn bind_vertex_array(&self, vertex_array: u32) {
        let mut s = self.state.borrow_mut();
        if vertex_array != 0 && !s.vertex_arrays.contains_key(&vertex_array) {
            s.error(glow::INVALID_OPERATION);
            return;
        }
        s.bound_vertex_array = vertex_array;
    }

    fn vertex_array_binding(&self) -> u32 {
        self.state.borrow().bound_vertex_array
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        let mut s = self.state.borrow_mut();
        if s.bound_vertex_array == 0 {
            s.error(glow::INVALID_OPERATION);
            return;
        }
        s.vertex_array_state().slots.entry(slot).or_default().enabled = true;
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
        let mut s = self.state.borrow_mut();
        let buffer = s.bound_buffer(glow::ARRAY_BUFFER);
        if s.bound_vertex_array == 0 || buffer == 0 {
            s.error(glow::INVALID_OPERATION);
            return;
        }
        if !(1..=4).contains(&components) || stride < 0 || offset < 0 {
            s.error(glow::INVALID_VALUE);
            return;
        }
        let pointer = s.vertex_array_state().slots.entry(slot).or_default();
        *pointer = AttribPointer {
            enabled: pointer.enabled,
            buffer,
            components,
            ty,
            normalized,
            stride,
            offset,
        };
    }

    fn create_texture(&self) -> u32 {
        let mut s = self.state.borrow_mut();
        let id = s.allocate();
        if id != 0 {
            s.textures.insert(id, TextureState::default());
        }
        id
    }

    fn delete_texture(&self, texture: u32) {
        let mut s = self.state.borrow_mut();
        if s.textures.remove(&texture).is_none() {
            s.error(glow::INVALID_VALUE);
            return;
        }
        s.unit_bindings.retain(|_, bound| *bound != texture);
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
    }

    fn active_texture_unit(&self) -> u32 {
        self.state.borrow().active_unit
    }

    fn bind_texture(&self, target: u32, texture: u32) {
        let mut s = self.state.borrow_mut();
        if texture != 0 && !s.textures.contains_key(&texture) {
            s.error(glow::INVALID_OPERATION);
            return;
        }
        let unit = s.active_unit;
        s.unit_bindings.insert((unit, target), texture);
    }

    fn texture_binding(&self, target: u32) -> u32 {
        self.state.borrow().bound_texture(target)
    }

    fn tex_image_2d_rgba8(&self, target: u32, width: u32, height: u32, pixels: &[u8]) {
        let mut s = self.state.borrow_mut();
        let id = s.bound_texture(target);
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            s.error(glow::INVALID_VALUE);
            return;
        }
        match s.textures.get_mut(&id) {
            Some(texture) => {
                texture.width = width;
                texture.height = height;
                texture.pixels = pixels.to_vec();
                texture.levels = 1;
            }
            None => s.error(glow::INVALID_OPERATION),
        }
    }

    fn generate_mipmap(&self, target: u32) {
        let mut s = self.state.borrow_mut();
        let id = s.bound_texture(target);
        match s.textures.get_mut(&id) {
            Some(texture) if texture.levels > 0 => {
                let largest = texture.width.max(texture.height).max(1);
                texture.levels = u32::BITS - largest.leading_zeros();
            }
            _ => s.error(glow::INVALID_OPERATION),
        }
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        let mut s = self.state.borrow_mut();
        let id = s.bound_texture(target);
        match s.textures.get_mut(&id) {
            Some(texture) => {
                texture.parameters.insert(parameter, value);
            }
            None => s.error(glow::INVALID_OPERATION),
        }
    }

    fn create_shader(&self, stage: u32) -> u32 {
        let mut s = self.state.borrow_mut();
        let id = s.allocate();
        if id != 0 {
            s.shaders.insert(
                id,
                ShaderObject {
                    stage,
                    source: String::new(),
                    interface: None,
                    log: String::new(),
                },
            );
        }
        id
    }

    fn delete_shader(&self, shader: u32) {
        let mut s = self.state.borrow_mut();
        if s.shaders.remove(&shader).is_none() {
            s.error(glow::INVALID_VALUE);
        }
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut s = self.state.borrow_mut();
        match s.shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_string(),
            None => s.error(glow::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: u32) {
        let mut s = self.state.borrow_mut();
        let Some(object) = s.shaders.get_mut(&shader) else {
            s.error(glow::INVALID_VALUE);
            return;
        };
        match glsl::scan(&object.source) {
            Ok(interface) => {
                object.interface = Some(interface);
                object.log.clear();
            }
            Err(log) => {
                object.interface = None;
                object.log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.interface.is_some())
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> u32 {
        let mut s = self.state.borrow_mut();
        let id = s.allocate();
        if id != 0 {
            s.programs.insert(id, ProgramObject::default());
        }
        id
    }

    fn delete_program(&self, program: u32) {
        let mut s = self.state.borrow_mut();
        if s.programs.remove(&program).is_none() {
            s.error(glow::INVALID_VALUE);
            return;
        }
        if s.current_program == program {
            s.current_program = 0;
        }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut s = self.state.borrow_mut();
        if !s.shaders.contains_key(&shader) {
            s.error(glow::INVALID_VALUE);
            return;
        }
        let code = match s.programs.get_mut(&program) {
            Some(p) if p.attached.contains(&shader) => glow::INVALID_OPERATION,
            Some(p) => {
                p.attached.push(shader);
                return;
            }
            None => glow::INVALID_VALUE,
        };
        s.error(code);
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut s = self.state.borrow_mut();
        let detached = s.programs.get_mut(&program).is_some_and(|p| {
            let before = p.attached.len();
            p.attached.retain(|&id| id != shader);
            p.attached.len() != before
        });
        if !detached {
            s.error(glow::INVALID_OPERATION);
        }
    }

    fn link_program(&self, program: u32) {
        let mut s = self.state.borrow_mut();
        let Some(attached) = s.programs.get(&program).map(|p| p.attached.clone()) else {
            s.error(glow::INVALID_VALUE);
            return;
        };
        let result = Self::link(&s, &attached);
        if let Some(p) = s.programs.get_mut(&program) {
            match result {
                Ok(linked) => {
                    p.linked = Some(linked);
                    p.log.clear();
                }
                Err(log) => {
                    p.linked = None;
                    p.log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked.is_some())
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: u32) {
        let mut s = self.state.borrow_mut();
        let linked = program == 0
            || s.programs
                .get(&program)
                .is_some_and(|p| p.linked.is_some());
        if !linked {
            s.error(glow::INVALID_OPERATION);
            return;
        }
        s.current_program = program;
    }

    fn current_program(&self) -> u32 {
        self.state.borrow().current_program
    }

    fn active_attribute_count(&self, program: u32) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .map_or(0, |l| l.attributes.len() as u32)
    }

    fn active_attribute(&self, program: u32, index: u32) -> Option<ActiveVariable> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.attributes.get(index as usize))
            .map(|(variable, _)| variable.clone())
    }

    fn attribute_location(&self, program: u32, name: &str) -> i32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.attributes.iter().find(|(v, _)| v.name == name))
            .map_or(-1, |(_, location)| *location)
    }

    fn active_uniform_count(&self, program: u32) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .map_or(0, |l| l.uniforms.len() as u32)
    }

    fn active_uniform(&self, program: u32, index: u32) -> Option<ActiveVariable> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.uniforms.get(index as usize))
            .map(|u| u.variable.clone())
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        let mut s = self.state.borrow_mut();
        s.uniform_location_queries += 1;

        let (base, element) = match name.split_once('[') {
            Some((base, rest)) => (base, rest.trim_end_matches(']').parse::<i32>().ok()),
            None => (name, Some(0)),
        };
        let Some(element) = element else {
            return -1;
        };

        s.programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.uniforms.iter().find(|u| u.base == base))
            .filter(|u| u.location >= 0 && element < u.variable.size)
            .map_or(-1, |u| u.location + element)
    }

    fn active_uniform_block_count(&self, program: u32) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .map_or(0, |l| l.blocks.len() as u32)
    }

    fn uniform_block_name(&self, program: u32, index: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.blocks.get(index as usize))
            .map(|b| b.name.clone())
            .unwrap_or_default()
    }

    fn uniform_block_parameter(&self, program: u32, index: u32, parameter: u32) -> i32 {
        let s = self.state.borrow();
        let Some(block) = s
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .and_then(|l| l.blocks.get(index as usize))
        else {
            return 0;
        };
        match parameter {
            glow::UNIFORM_BLOCK_DATA_SIZE => block.size,
            glow::UNIFORM_BLOCK_BINDING => block.binding,
            _ => 0,
        }
    }

    fn uniform_1_i32(&self, location: i32, value: i32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformData::Int(value));
    }

    fn uniform_1_f32(&self, location: i32, value: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformData::Floats(vec![value]));
    }

    fn uniform_2_f32(&self, location: i32, value: &[f32; 2]) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformData::Floats(value.to_vec()));
    }

    fn uniform_3_f32(&self, location: i32, value: &[f32; 3]) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformData::Floats(value.to_vec()));
    }

    fn uniform_4_f32(&self, location: i32, value: &[f32; 4]) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformData::Floats(value.to_vec()));
    }

    fn uniform_matrix_4_f32(&self, location: i32, value: &[f32; 16]) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformData::Floats(value.to_vec()));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.state.borrow_mut().clear_color = [r, g, b, a];
    }

    fn clear(&self, _mask: u32) {
        self.state.borrow_mut().clears += 1;
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().viewport = [x, y, width, height];
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32) {
        let mut s = self.state.borrow_mut();
        match Self::resolve_draw(&s, mode, count, index_type, offset) {
            Some(record) => s.draws.push(record),
            None => s.error(glow::INVALID_OPERATION),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "#version 330 core
layout (location = 0) in vec3 aPos;
out vec3 vColor;
uniform mat4 uMvp;
uniform float uScale[2];
void main() { vColor = aPos; gl_Position = uMvp * vec4(aPos * uScale[0], 1.0); }
";

    const FS: &str = "#version 330 core
in vec3 vColor;
out vec4 FragColor;
uniform vec4 uTint;
void main() { FragColor = vec4(vColor, 1.0) * uTint; }
";

    fn linked_program(gl: &HeadlessGl, vs: &str, fs: &str) -> u32 {
        let program = gl.create_program();
        for (stage, src) in [(glow::VERTEX_SHADER, vs), (glow::FRAGMENT_SHADER, fs)] {
            let shader = gl.create_shader(stage);
            gl.shader_source(shader, src);
            gl.compile_shader(shader);
            gl.attach_shader(program, shader);
        }
        gl.link_program(program);
        program
    }

    #[test]
    fn element_binding_is_vertex_array_state() {
        let gl = HeadlessGl::new();
        let ebo = gl.create_buffer();
        let a = gl.create_vertex_array();
        let b = gl.create_vertex_array();

        gl.bind_vertex_array(a);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, ebo);
        gl.bind_vertex_array(b);
        assert_eq!(gl.buffer_binding(glow::ELEMENT_ARRAY_BUFFER), 0);
        gl.bind_vertex_array(a);
        assert_eq!(gl.buffer_binding(glow::ELEMENT_ARRAY_BUFFER), ebo);
    }

    #[test]
    fn deleting_a_bound_buffer_clears_the_binding() {
        let gl = HeadlessGl::new();
        let vbo = gl.create_buffer();
        gl.bind_buffer(glow::ARRAY_BUFFER, vbo);
        gl.delete_buffer(vbo);
        assert_eq!(gl.buffer_binding(glow::ARRAY_BUFFER), 0);
        assert_eq!(gl.live_buffers(), 0);
    }

    #[test]
    fn buffer_ops_without_binding_record_errors() {
        let gl = HeadlessGl::new();
        gl.buffer_data(glow::ARRAY_BUFFER, &[1, 2, 3], glow::STATIC_DRAW);
        assert_eq!(gl.take_errors(), vec![glow::INVALID_OPERATION]);
    }

    #[test]
    fn linking_assigns_locations_and_reflects_arrays() {
        let gl = HeadlessGl::new();
        let program = linked_program(&gl, VS, FS);
        assert!(gl.program_link_status(program), "{}", gl.program_info_log(program));

        assert_eq!(gl.attribute_location(program, "aPos"), 0);
        assert_eq!(gl.active_uniform_count(program), 3);

        let names: Vec<_> = (0..3)
            .map(|i| gl.active_uniform(program, i).unwrap().name)
            .collect();
        assert_eq!(names, ["uMvp", "uScale[0]", "uTint"]);

        assert_eq!(gl.uniform_location(program, "uMvp"), 0);
        assert_eq!(gl.uniform_location(program, "uScale"), 1);
        assert_eq!(gl.uniform_location(program, "uScale[1]"), 2);
        assert_eq!(gl.uniform_location(program, "uScale[2]"), -1);
        assert_eq!(gl.uniform_location(program, "uTint"), 3);
    }

    #[test]
    fn block_members_are_listed_without_a_location() {
        let gl = HeadlessGl::new();
        let vs = "layout (std140) uniform Camera {\n    mat4 view;\n    vec4 lights[2];\n};\n\
                  in vec3 aPos;\nvoid main() { gl_Position = view * vec4(aPos, 1.0); }\n";
        let fs = "out vec4 c;\nvoid main() { c = vec4(1.0); }\n";
        let program = linked_program(&gl, vs, fs);
        assert!(gl.program_link_status(program), "{}", gl.program_info_log(program));

        assert_eq!(gl.active_uniform_block_count(program), 1);
        let names: Vec<_> = (0..gl.active_uniform_count(program))
            .map(|i| gl.active_uniform(program, i).unwrap().name)
            .collect();
        assert_eq!(names, ["view", "lights[0]"]);
        assert_eq!(gl.uniform_location(program, "view"), -1);
        assert_eq!(gl.uniform_location(program, "lights[1]"), -1);

        gl.use_program(program);
        gl.uniform_1_f32(0, 1.0);
        assert_eq!(gl.take_errors(), vec![glow::INVALID_OPERATION]);
    }

    #[test]
    fn unmatched_varying_fails_to_link() {
        let gl = HeadlessGl::new();
        let fs = "in vec2 vUv;\nout vec4 c;\nvoid main() { c = vec4(vUv, 0.0, 1.0); }\n";
        let program = linked_program(&gl, VS, fs);
        assert!(!gl.program_link_status(program));
        assert!(gl.program_info_log(program).contains("'vUv'"));
    }

    #[test]
    fn uniforms_require_a_current_program() {
        let gl = HeadlessGl::new();
        let program = linked_program(&gl, VS, FS);

        gl.uniform_1_f32(0, 1.0);
        assert_eq!(gl.take_errors(), vec![glow::INVALID_OPERATION]);

        gl.use_program(program);
        gl.uniform_4_f32(3, &[1.0, 0.5, 0.25, 1.0]);
        gl.uniform_1_f32(-1, 9.0);
        assert!(gl.take_errors().is_empty());
        assert_eq!(
            gl.uniform_value(program, 3),
            Some(UniformData::Floats(vec![1.0, 0.5, 0.25, 1.0]))
        );
    }

    #[test]
    fn mipmap_chain_covers_largest_dimension() {
        let gl = HeadlessGl::new();
        let tex = gl.create_texture();
        gl.bind_texture(glow::TEXTURE_2D, tex);
        gl.tex_image_2d_rgba8(glow::TEXTURE_2D, 8, 3, &[0; 8 * 3 * 4]);
        gl.generate_mipmap(glow::TEXTURE_2D);
        assert_eq!(gl.texture_levels(tex), 4);
    }

    #[test]
    fn negative_attribute_offset_is_rejected() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array();
        let vbo = gl.create_buffer();
        gl.bind_vertex_array(vao);
        gl.bind_buffer(glow::ARRAY_BUFFER, vbo);

        gl.vertex_attrib_pointer(0, 3, glow::FLOAT, false, 12, -4);

        assert_eq!(gl.take_errors(), vec![glow::INVALID_VALUE]);
        assert_eq!(gl.attrib_pointer(vao, 0), None);
    }

    #[test]
    fn draw_past_the_vertex_buffer_is_rejected() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array();
        let vbo = gl.create_buffer();
        let ebo = gl.create_buffer();

        gl.bind_vertex_array(vao);
        gl.bind_buffer(glow::ARRAY_BUFFER, vbo);
        gl.buffer_data(glow::ARRAY_BUFFER, bytemuck::cast_slice(&[0.0f32; 6]), glow::STATIC_DRAW);
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer(0, 3, glow::FLOAT, false, 12, 0);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, ebo);
        gl.buffer_data(
            glow::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&[0u32, 1, 2]),
            glow::STATIC_DRAW,
        );

        gl.draw_elements(glow::TRIANGLES, 3, glow::UNSIGNED_INT, 0);
        assert_eq!(gl.take_errors(), vec![glow::INVALID_OPERATION]);
        assert!(gl.draws().is_empty());

        gl.draw_elements(glow::TRIANGLES, 2, glow::UNSIGNED_INT, 0);
        assert!(gl.take_errors().is_empty());
        assert_eq!(gl.draws()[0].indices, vec![0, 1]);
    }
}
