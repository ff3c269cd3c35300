use lumen_engine::gl::{
    BufferKind, BufferUsage, ClearMask, GlContext, IndexType, PrimitiveMode, TextureTarget,
    UniformData,
};
use lumen_engine::{Buffer, ShaderProgram, Texture, VertexArray, VertexAttribute};

const VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 aPos;
void main() { gl_Position = vec4(aPos, 1.0); }
";

const FRAGMENT: &str = "#version 330 core
out vec4 FragColor;
uniform vec4 uTint;
void main() { FragColor = uTint; }
";

const TRIANGLE: [f32; 12] = [
    -0.5, -0.5, 0.0, //
    0.5, -0.5, 0.0, //
    0.0, 0.5, 0.0, //
    9.0, 9.0, 9.0, // trailing vertex, never indexed
];

#[test]
fn indexed_draw_reads_exactly_the_uploaded_vertices() {
    let (ctx, gl) = GlContext::headless();

    let mut vbo = Buffer::new(&ctx, BufferKind::Vertex);
    vbo.upload(&TRIANGLE, BufferUsage::StaticDraw).unwrap();
    let mut ebo = Buffer::new(&ctx, BufferKind::Index);
    ebo.upload(&[0u32, 1, 2], BufferUsage::StaticDraw).unwrap();

    let mut vao = VertexArray::new(&ctx);
    vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 12, 0));
    vao.set_index_buffer(&ebo);

    let program = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
    program.use_program();
    program.set_uniform("uTint", [1.0f32, 0.0, 0.0, 1.0]);

    ctx.clear_color([0.82, 0.0, 0.07, 1.0]);
    ctx.clear(ClearMask::COLOR);
    vao.draw(PrimitiveMode::Triangles, 3, IndexType::U32);

    assert!(gl.take_errors().is_empty());
    let draws = gl.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].program, program.handle());
    assert_eq!(draws[0].indices, vec![0, 1, 2]);
    assert_eq!(draws[0].fetched[&0], TRIANGLE[..9].to_vec());

    let tint = program.uniform_location("uTint").unwrap();
    assert_eq!(
        gl.uniform_value(program.handle(), tint),
        Some(UniformData::Floats(vec![1.0, 0.0, 0.0, 1.0]))
    );
}

#[test]
fn index_past_the_vertex_buffer_is_not_drawn() {
    let (ctx, gl) = GlContext::headless();

    let mut vbo = Buffer::new(&ctx, BufferKind::Vertex);
    vbo.upload(&TRIANGLE[..9], BufferUsage::StaticDraw).unwrap();
    let mut ebo = Buffer::new(&ctx, BufferKind::Index);
    ebo.upload(&[0u16, 1, 3], BufferUsage::StaticDraw).unwrap();

    let mut vao = VertexArray::new(&ctx);
    vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 0, 0));
    vao.set_index_buffer(&ebo);
    vao.draw(PrimitiveMode::Triangles, 3, IndexType::U16);

    assert!(gl.draws().is_empty());
    assert_eq!(gl.take_errors(), vec![glow::INVALID_OPERATION]);
}

#[test]
fn textured_quad_binds_sampler_and_unit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checker.png");
    image::RgbaImage::from_fn(4, 4, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([0, 0, 0, 255])
        }
    })
    .save(&path)
    .unwrap();

    let (ctx, gl) = GlContext::headless();
    let mut texture = Texture::new(&ctx, TextureTarget::Texture2D);
    texture.load_from_file(&path).unwrap();

    let program = ShaderProgram::from_sources(
        &ctx,
        "layout (location = 0) in vec3 aPos;\nlayout (location = 1) in vec2 aUv;\nout vec2 vUv;\nvoid main() { vUv = aUv; gl_Position = vec4(aPos, 1.0); }\n",
        "in vec2 vUv;\nout vec4 FragColor;\nuniform sampler2D uTexture;\nvoid main() { FragColor = texture(uTexture, vUv); }\n",
    )
    .unwrap();
    program.set_texture("uTexture", &texture, 0);

    assert_eq!(gl.texture_on_unit(0, glow::TEXTURE_2D), texture.handle());
    assert_eq!(texture.dimensions().map(|d| d.channels), Some(4));
    assert_eq!(program.uniforms()[0].ty, glow::SAMPLER_2D);
}

#[test]
fn every_native_object_is_released() {
    let (ctx, gl) = GlContext::headless();
    {
        let mut vbo = Buffer::new(&ctx, BufferKind::Vertex);
        vbo.upload(&TRIANGLE, BufferUsage::StaticDraw).unwrap();
        let mut vao = VertexArray::new(&ctx);
        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 12, 0));
        let _texture = Texture::new(&ctx, TextureTarget::Texture2D);
        let _program = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
    }
    assert_eq!(gl.live_buffers(), 0);
    assert_eq!(gl.live_vertex_arrays(), 0);
    assert_eq!(gl.live_textures(), 0);
    assert_eq!(gl.live_programs(), 0);
    assert_eq!(gl.live_shaders(), 0);
    assert!(gl.take_errors().is_empty());
}
