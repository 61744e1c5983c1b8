pub mod gpu;
pub mod mesh;
pub mod overlay;
mod util;
pub mod vertex;
