use anyhow::{Context, Result};
use glam::Vec4;
use lumen_engine::gl::{BufferKind, BufferUsage, ClearMask, GlContext, IndexType, PrimitiveMode};
use lumen_engine::{Buffer, ShaderProgram, VertexArray, VertexAttribute};
use lumen_studio::{asset_path, open_window, run_frames, UPLOAD_FAILED};

const POSITIONS: [f32; 9] = [
    -0.5, -0.5, 0.0, //
    0.5, -0.5, 0.0, //
    0.0, 0.5, 0.0,
];
const INDICES: [u32; 3] = [0, 1, 2];

struct Triangle {
    vao: VertexArray,
    _vertices: Buffer,
    _indices: Buffer,
}

impl Triangle {
    fn upload(gl: &GlContext) -> Result<Self> {
        let mut vertices = Buffer::new(gl, BufferKind::Vertex);
        vertices
            .upload(&POSITIONS, BufferUsage::StaticDraw)
            .context("vertex upload")?;
        let mut indices = Buffer::new(gl, BufferKind::Index);
        indices
            .upload(&INDICES, BufferUsage::StaticDraw)
            .context("index upload")?;

        let mut vao = VertexArray::new(gl);
        vao.add_vertex_attribute(&vertices, 0, VertexAttribute::floats(3, 12, 0));
        vao.set_index_buffer(&indices);
        Ok(Self {
            vao,
            _vertices: vertices,
            _indices: indices,
        })
    }
}

fn main() -> Result<()> {
    let mut window = open_window("Triangle")?;
    let gl = window.gl();

    let triangle = match Triangle::upload(&gl) {
        Ok(triangle) => triangle,
        Err(e) => {
            log::error!("geometry upload failed: {e:#}");
            std::process::exit(UPLOAD_FAILED);
        }
    };
    let shader = ShaderProgram::from_files(
        &gl,
        asset_path("shaders/triangle.vert"),
        asset_path("shaders/triangle.frag"),
    )
    .context("failed to build the triangle shader")?;

    run_frames(&mut window, |gl, time| {
        gl.clear_color([0.1, 0.1, 0.12, 1.0]);
        gl.clear(ClearMask::COLOR);

        let pulse = 0.5 + 0.5 * (time.elapsed * 2.0).sin();
        shader.set_uniform("uTint", Vec4::new(1.0, pulse, 0.2, 1.0));
        shader.use_program();
        triangle
            .vao
            .draw(PrimitiveMode::Triangles, INDICES.len() as i32, IndexType::U32);
        Ok(())
    })
}
