use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

/// Checks model files on the local filesystem before the engine loads them.
pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput(format!("model `{}`: onnx_path empty", model.name)));
        }
        let path = Path::new(&model.onnx_path);
        if !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("onnx")) {
            return Err(DomainError::InvalidInput(format!("not an .onnx file: {}", model.onnx_path)));
        }
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| DomainError::NotFound(format!("model file not found: {}", model.onnx_path)))?;
        if !meta.is_file() || meta.len() == 0 {
            return Err(DomainError::InvalidInput(format!("model file is empty: {}", model.onnx_path)));
        }
        Ok(())
    }
}
