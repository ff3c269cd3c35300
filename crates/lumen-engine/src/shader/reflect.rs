use crate::gl::GlApi;

/// Active vertex input of a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub ty: u32,
    pub location: i32,
}

/// Active default-block uniform. Arrays are reported once, as `name[0]`.
///
/// Members of uniform blocks are listed by the driver without a location
/// and are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub ty: u32,
    pub location: i32,
    pub size: i32,
}

/// Active uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockInfo {
    pub name: String,
    pub index: u32,
    pub data_size: i32,
    pub binding: i32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Reflection {
    pub attributes: Vec<AttributeInfo>,
    pub uniforms: Vec<UniformInfo>,
    pub blocks: Vec<UniformBlockInfo>,
}

pub(crate) fn reflect(api: &dyn GlApi, program: u32) -> Reflection {
    let attributes = (0..api.active_attribute_count(program))
        .filter_map(|i| api.active_attribute(program, i))
        .map(|var| AttributeInfo {
            location: api.attribute_location(program, &var.name),
            name: var.name,
            ty: var.ty,
        })
        .collect();

    let uniforms = (0..api.active_uniform_count(program))
        .filter_map(|i| api.active_uniform(program, i))
        .filter_map(|var| {
            let location = api.uniform_location(program, &var.name);
            (location != -1).then_some(UniformInfo {
                location,
                name: var.name,
                ty: var.ty,
                size: var.size,
            })
        })
        .collect();

    let blocks = (0..api.active_uniform_block_count(program))
        .map(|index| UniformBlockInfo {
            name: api.uniform_block_name(program, index),
            index,
            data_size: api.uniform_block_parameter(program, index, glow::UNIFORM_BLOCK_DATA_SIZE),
            binding: api.uniform_block_parameter(program, index, glow::UNIFORM_BLOCK_BINDING),
        })
        .collect();

    Reflection {
        attributes,
        uniforms,
        blocks,
    }
}
