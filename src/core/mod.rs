pub mod bounds;
pub mod config;
pub mod constants;
pub mod frame;
pub mod geo;
pub mod map;
pub mod transform;
pub mod view;
