pub mod camera_source;
pub mod capture;
