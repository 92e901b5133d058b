use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraId { pub path: String }

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Size every lane frame is normalised to on load.
    pub const LANE: FrameSize = FrameSize { width: 1200, height: 640 };
    /// Size of the composed mosaic.
    pub const MOSAIC: FrameSize = FrameSize { width: 1360, height: 600 };
}
