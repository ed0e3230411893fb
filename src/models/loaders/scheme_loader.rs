use crate::error::SchemeError;
use crate::models::scheme::{MarkingScheme, RawScheme};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// 评分方案文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeFormat {
    Toml,
    Json,
}

impl SchemeFormat {
    /// 根据扩展名判断文件格式
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => Some(SchemeFormat::Toml),
            Some("json") => Some(SchemeFormat::Json),
            _ => None,
        }
    }
}

/// 从文件加载并校验评分方案
pub async fn load_scheme(path: &Path) -> Result<MarkingScheme, SchemeError> {
    let format = SchemeFormat::from_path(path).ok_or_else(|| SchemeError::UnknownFormat {
        path: path.display().to_string(),
    })?;

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| SchemeError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    let scheme = parse_scheme(&content, format, &path.display().to_string())?;
    info!(
        "✓ 已加载评分方案 `{}`: {} 道题, 满分 {}",
        scheme.name(),
        scheme.questions().len(),
        scheme.max_marks()
    );
    Ok(scheme)
}

/// 解析评分方案文本
///
/// `origin` 只用于错误信息。
pub fn parse_scheme(
    content: &str,
    format: SchemeFormat,
    origin: &str,
) -> Result<MarkingScheme, SchemeError> {
    let raw: RawScheme = match format {
        SchemeFormat::Toml => toml::from_str(content).map_err(|source| {
            SchemeError::TomlParseFailed {
                path: origin.to_string(),
                source,
            }
        })?,
        SchemeFormat::Json => serde_json::from_str(content).map_err(|source| {
            SchemeError::JsonParseFailed {
                path: origin.to_string(),
                source,
            }
        })?,
    };
    raw.into_scheme()
}
