//! File-backed inputs: geometry and shader sources.

mod geometry;
mod shader;

pub use geometry::{
    load_geometry, parse_geometry, Geometry, GeometryError, POINT_COMPONENTS, TRIANGLE_CORNERS,
};
pub use shader::{create_shader_module, load_shader_source};
