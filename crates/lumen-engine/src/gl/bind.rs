use super::api::GlApi;

#[derive(Debug, Copy, Clone)]
enum Point {
    Buffer(u32),
    VertexArray,
    Texture { unit: u32, target: u32 },
    Program,
}

/// Scoped binding: binds on construction, restores the previous binding on
/// drop.
///
/// Wrapper operations use this so that touching one object never changes
/// what the caller had bound.
pub struct BindGuard<'a> {
    api: &'a dyn GlApi,
    point: Point,
    previous: u32,
}

impl<'a> BindGuard<'a> {
    pub fn buffer(api: &'a dyn GlApi, target: u32, buffer: u32) -> Self {
        let previous = api.buffer_binding(target);
        api.bind_buffer(target, buffer);
        Self {
            api,
            point: Point::Buffer(target),
            previous,
        }
    }

    pub fn vertex_array(api: &'a dyn GlApi, vertex_array: u32) -> Self {
        let previous = api.vertex_array_binding();
        api.bind_vertex_array(vertex_array);
        Self {
            api,
            point: Point::VertexArray,
            previous,
        }
    }

    /// Binds on the currently active texture unit.
    pub fn texture(api: &'a dyn GlApi, target: u32, texture: u32) -> Self {
        let unit = api.active_texture_unit();
        let previous = api.texture_binding(target);
        api.bind_texture(target, texture);
        Self {
            api,
            point: Point::Texture { unit, target },
            previous,
        }
    }

    pub fn program(api: &'a dyn GlApi, program: u32) -> Self {
        let previous = api.current_program();
        api.use_program(program);
        Self {
            api,
            point: Point::Program,
            previous,
        }
    }
}

impl Drop for BindGuard<'_> {
    fn drop(&mut self) {
        match self.point {
            Point::Buffer(target) => self.api.bind_buffer(target, self.previous),
            Point::VertexArray => self.api.bind_vertex_array(self.previous),
            Point::Texture { unit, target } => {
                let active = self.api.active_texture_unit();
                if active != unit {
                    self.api.active_texture(unit);
                }
                self.api.bind_texture(target, self.previous);
                if active != unit {
                    self.api.active_texture(active);
                }
            }
            Point::Program => self.api.use_program(self.previous),
        }
    }
}
