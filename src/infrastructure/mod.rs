//! 基础设施层
//!
//! 持有外部识别引擎，只暴露"图片 → 文字"的能力

pub mod tesseract;

use std::path::Path;

use crate::error::ExtractionError;
use crate::models::OcrResult;

pub use tesseract::TesseractExtractor;

/// 文字识别能力
///
/// 职责：
/// - 读取一张图片，返回文字和置信度
/// - 不认识评分方案 / 题目
/// - 不处理业务流程
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image_path: &Path) -> Result<OcrResult, ExtractionError>;
}
