pub mod camera;
pub mod detection;
pub mod errors;
pub mod group;
pub mod lane;
pub mod model;
pub mod record;
pub mod selector;
