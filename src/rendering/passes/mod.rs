pub mod ground_pass;
pub mod mesh_pass;
pub mod pass;
pub mod shadow_pass;
pub mod sky_pass;
