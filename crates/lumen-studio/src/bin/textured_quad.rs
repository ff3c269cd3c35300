use std::io::Cursor;
use std::mem::{offset_of, size_of};

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use image::{ImageFormat, Rgb, RgbImage};
use lumen_engine::gl::{
    BufferKind, BufferUsage, ClearMask, GlContext, IndexType, PrimitiveMode, TextureTarget,
};
use lumen_engine::{Buffer, ShaderProgram, Texture, VertexArray, VertexAttribute};
use lumen_studio::{asset_path, open_window, run_frames, UPLOAD_FAILED};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 3],
    uv: [f32; 2],
}

const VERTICES: [Vertex; 4] = [
    Vertex { pos: [-0.5, -0.5, 0.0], uv: [0.0, 0.0] },
    Vertex { pos: [0.5, -0.5, 0.0], uv: [1.0, 0.0] },
    Vertex { pos: [0.5, 0.5, 0.0], uv: [1.0, 1.0] },
    Vertex { pos: [-0.5, 0.5, 0.0], uv: [0.0, 1.0] },
];
const INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

struct Quad {
    vao: VertexArray,
    _vertices: Buffer,
    _indices: Buffer,
}

impl Quad {
    fn upload(gl: &GlContext) -> Result<Self> {
        let mut vertices = Buffer::new(gl, BufferKind::Vertex);
        vertices
            .upload(&VERTICES, BufferUsage::StaticDraw)
            .context("vertex upload")?;
        let mut indices = Buffer::new(gl, BufferKind::Index);
        indices
            .upload(&INDICES, BufferUsage::StaticDraw)
            .context("index upload")?;

        let stride = size_of::<Vertex>() as i32;
        let mut vao = VertexArray::new(gl);
        vao.add_vertex_attribute(
            &vertices,
            0,
            VertexAttribute::floats(3, stride, offset_of!(Vertex, pos) as i32),
        );
        vao.add_vertex_attribute(
            &vertices,
            1,
            VertexAttribute::floats(2, stride, offset_of!(Vertex, uv) as i32),
        );
        vao.set_index_buffer(&indices);
        Ok(Self {
            vao,
            _vertices: vertices,
            _indices: indices,
        })
    }
}

/// 64×64 checkerboard, PNG-encoded.
fn generated_checker() -> Result<Vec<u8>> {
    let image = RgbImage::from_fn(64, 64, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgb([235, 235, 235])
        } else {
            Rgb([40, 40, 48])
        }
    });
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

fn load_texture(gl: &GlContext) -> Result<Texture> {
    let mut texture = Texture::new(gl, TextureTarget::Texture2D);
    let path = asset_path("checker.png");
    if let Err(e) = texture.load_from_file(&path) {
        log::warn!("{e}; using a generated checkerboard");
        texture.load_from_memory(&generated_checker()?)?;
    }
    Ok(texture)
}

fn main() -> Result<()> {
    let mut window = open_window("Textured Quad")?;
    let gl = window.gl();

    let quad = match Quad::upload(&gl) {
        Ok(quad) => quad,
        Err(e) => {
            log::error!("geometry upload failed: {e:#}");
            std::process::exit(UPLOAD_FAILED);
        }
    };
    let texture = load_texture(&gl)?;
    let shader = ShaderProgram::from_files(
        &gl,
        asset_path("shaders/textured.vert"),
        asset_path("shaders/textured.frag"),
    )
    .context("failed to build the textured shader")?;

    run_frames(&mut window, |gl, time| {
        gl.clear_color([0.82, 0.0, 0.07, 1.0]);
        gl.clear(ClearMask::COLOR);

        shader.set_uniform("uTransform", Mat4::from_rotation_z(time.elapsed * 0.5));
        shader.set_texture("uTexture", &texture, 0);
        shader.use_program();
        quad.vao
            .draw(PrimitiveMode::Triangles, INDICES.len() as i32, IndexType::U16);
        Ok(())
    })
}
