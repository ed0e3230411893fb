//! 复核清单写入服务 - 业务能力层
//!
//! 只负责"写 review.txt"能力，不关心流程

use anyhow::{Context, Result};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::MarkingResult;

/// 复核清单写入服务
///
/// 职责：
/// - 将建议人工复核的提交追加写入清单
/// - 只处理单个提交
/// - 不关心流程顺序
pub struct ReviewWriter {
    review_file_path: String,
}

impl ReviewWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            review_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.review_file_path
    }

    /// 追加一条复核记录
    ///
    /// # 参数
    /// - `result`: 评分结果
    /// - `reason`: 需要复核的原因
    pub async fn write(&self, result: &MarkingResult, reason: &str) -> Result<()> {
        debug!(
            "写入复核记录: 提交 {} | 原因: {}",
            result.submission_id(),
            reason
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.review_file_path)
            .await
            .with_context(|| format!("无法打开复核清单: {}", self.review_file_path))?;

        file.write_all(format_line(result, reason).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

impl Default for ReviewWriter {
    fn default() -> Self {
        Self::with_path("review.txt")
    }
}

fn format_line(result: &MarkingResult, reason: &str) -> String {
    format!(
        "提交 {} | 得分 {}/{} ({}%) | 置信度 {:.2} | 原因: {}\n",
        result.submission_id(),
        result.total_marks(),
        result.max_marks(),
        result.percentage(),
        result.confidence(),
        reason
    )
}
