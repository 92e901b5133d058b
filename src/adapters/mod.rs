pub mod controller;
pub mod fs;
pub mod onnx;
pub mod v4l2;
