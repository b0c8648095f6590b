pub mod control_plane;
pub mod endpoints;
