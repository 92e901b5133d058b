use anyhow::{bail, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::fs;
use tracing::{debug, info};

use crate::application::ports::DetectorPort;
use crate::domain::detection::{suppress_overlaps, BoundingBox, DetectionResult};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::YoloParams;

/// YOLOv8/11 detector over an ONNX session.
pub struct OnnxYoloEngine {
    session: Session,
    params: YoloParams,
}

impl OnnxYoloEngine {
    pub fn load(path: &str, params: YoloParams) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA is optional: register it when available, otherwise stay on CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        // Without ort's default features the model is committed from memory.
        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!(path, input_size = params.input_size, "YOLO model loaded");

        Ok(Self { session, params })
    }

    /// Vehicle candidates for `rgb` after class/score filtering and NMS.
    pub fn infer(&mut self, rgb: &RgbImage, nms_threshold: f32) -> Result<DetectionResult> {
        let imgsz = self.params.input_size as usize;
        if imgsz == 0 {
            bail!("input_size must be positive");
        }
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Tensor::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        // [1, 4 + classes, candidates]
        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[1] <= 4 {
            bail!("unexpected YOLO output shape {dims:?}");
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0);

        let num_candidates = view.shape()[1];
        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let mut candidates = Vec::new();
        for i in 0..num_candidates {
            let scores = view.slice(s![4.., i]);
            let Some((class_id, &score)) = scores
                .indexed_iter()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
            else {
                continue;
            };

            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            candidates.push(BoundingBox::from_corners(
                ((cx - w / 2.0) * sx).max(0.0),
                ((cy - h / 2.0) * sy).max(0.0),
                ((cx + w / 2.0) * sx).min(rgb.width() as f32),
                ((cy + h / 2.0) * sy).min(rgb.height() as f32),
                score,
                class_id,
            ));
        }

        let vehicles = DetectionResult::from_candidates(candidates);
        let mut kept = suppress_overlaps(vehicles.boxes().to_vec(), nms_threshold);
        kept.truncate(self.params.max_detections);
        debug!(candidates = num_candidates, vehicles = kept.len(), "inference done");

        Ok(DetectionResult::new(kept))
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn detect(&mut self, frame: &RgbImage, nms_threshold: f32) -> DomainResult<DetectionResult> {
        self.infer(frame, nms_threshold)
            .map_err(|e| DomainError::OperationFailed(format!("{e:#}")))
    }
}
