use anyhow::Result;
use lumen_engine::gl::ClearMask;

const BACKGROUND: [f32; 4] = [0.82, 0.0, 0.07, 1.0];

fn main() -> Result<()> {
    let mut window = lumen_studio::open_window("Clear")?;
    lumen_studio::run_frames(&mut window, |gl, _| {
        gl.clear_color(BACKGROUND);
        gl.clear(ClearMask::COLOR);
        Ok(())
    })
}
