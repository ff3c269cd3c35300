use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::gl::GlApi;

/// A host value that can be written to a uniform location of the current
/// program.
pub trait UniformValue {
    fn apply(&self, api: &dyn GlApi, location: i32);
}

impl UniformValue for i32 {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        api.uniform_1_i32(location, *self);
    }
}

impl UniformValue for f32 {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        api.uniform_1_f32(location, *self);
    }
}

impl UniformValue for [f32; 2] {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        api.uniform_2_f32(location, self);
    }
}

impl UniformValue for [f32; 3] {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        api.uniform_3_f32(location, self);
    }
}

impl UniformValue for [f32; 4] {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        api.uniform_4_f32(location, self);
    }
}

impl UniformValue for Vec2 {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        self.to_array().apply(api, location);
    }
}

impl UniformValue for Vec3 {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        self.to_array().apply(api, location);
    }
}

impl UniformValue for Vec4 {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        self.to_array().apply(api, location);
    }
}

/// Column-major, uploaded without transposition.
impl UniformValue for Mat4 {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        api.uniform_matrix_4_f32(location, &self.to_cols_array());
    }
}

/// Four columns of four floats.
impl UniformValue for [[f32; 4]; 4] {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        let flat: &[f32; 16] = bytemuck::cast_ref(self);
        api.uniform_matrix_4_f32(location, flat);
    }
}

impl<T: UniformValue + ?Sized> UniformValue for &T {
    fn apply(&self, api: &dyn GlApi, location: i32) {
        (**self).apply(api, location);
    }
}
