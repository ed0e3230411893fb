//! 单份提交处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责一份提交从评分到落盘的全过程，是提交级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **限时评分**：在阻塞线程中运行 `MarkingFlow`，超时按识别失败处理
//! 2. **结果落盘**：写入 `<输出目录>/<提交标识>.json`
//! 3. **复核清单**：需要复核的提交追加写入复核清单
//! 4. **结果分类**：返回已评分 / 降级 / 失败，供批量统计

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{ExtractionError, ExtractionFailure};
use crate::models::{MarkingScheme, MarkingSuggestion, Submission};
use crate::services::ReviewWriter;
use crate::utils::truncate_text;
use crate::workflow::MarkingFlow;

/// 单份提交的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// 正常评分
    Scored { needs_review: bool },
    /// 识别失败或超时，已生成 0 分结果
    Degraded,
    /// 未评分（如文件格式不受支持）
    Failed,
}

/// 落盘的评分结果
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredResult<'a> {
    generated_at: String,
    #[serde(flatten)]
    suggestion: &'a MarkingSuggestion,
}

/// 处理单份提交
///
/// # 参数
/// - `flow`: 评分流程（多个任务共享）
/// - `scheme`: 评分方案
/// - `submission`: 待评分的提交
/// - `config`: 配置
/// - `review_writer`: 复核清单
/// - `permit`: 并发名额，识别线程结束后才归还
pub async fn process_submission(
    flow: Arc<MarkingFlow>,
    scheme: Arc<MarkingScheme>,
    submission: Submission,
    config: &Config,
    review_writer: &ReviewWriter,
    permit: OwnedSemaphorePermit,
) -> Result<SubmissionOutcome> {
    info!("{} 开始评分", submission);

    let suggestion = match mark_with_deadline(&flow, &scheme, &submission, config, permit).await? {
        Some(suggestion) => suggestion,
        None => return Ok(SubmissionOutcome::Failed),
    };
    let degraded = suggestion.extracted.is_none();

    if config.verbose_logging {
        if let Some(extracted) = &suggestion.extracted {
            info!(
                "{} 识别文本: {}",
                submission,
                truncate_text(&extracted.raw_text, 120)
            );
        }
    }

    let output_path = write_result(&config.output_folder, &submission.id, &suggestion).await?;
    info!("{} 💾 结果已保存: {}", submission, output_path.display());

    if suggestion.needs_review {
        let reason = if degraded {
            "识别失败，需要人工评分".to_string()
        } else {
            flow.review_reason(&suggestion.result).unwrap_or_default()
        };
        review_writer.write(&suggestion.result, &reason).await?;
        info!("{} 🔎 已加入复核清单: {}", submission, reason);
    }

    Ok(if degraded {
        SubmissionOutcome::Degraded
    } else {
        SubmissionOutcome::Scored {
            needs_review: suggestion.needs_review,
        }
    })
}

/// 在阻塞线程中评分，并限制识别时长
///
/// 超时后不再等待结果；并发名额随阻塞线程一起释放，
/// 识别器自身的时限负责结束外部进程。
async fn mark_with_deadline(
    flow: &Arc<MarkingFlow>,
    scheme: &Arc<MarkingScheme>,
    submission: &Submission,
    config: &Config,
    permit: OwnedSemaphorePermit,
) -> Result<Option<MarkingSuggestion>> {
    let task = {
        let flow = Arc::clone(flow);
        let scheme = Arc::clone(scheme);
        let submission = submission.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            flow.run_with_review(&submission, &scheme)
        })
    };

    let deadline = Duration::from_secs(config.ocr_timeout_secs);
    match tokio::time::timeout(deadline, task).await {
        Ok(joined) => match joined.with_context(|| format!("{} 评分任务异常退出", submission))? {
            Ok(suggestion) => Ok(Some(suggestion)),
            Err(e) => {
                error!("{} ❌ 未评分: {}", submission, e);
                Ok(None)
            }
        },
        Err(_) => {
            let failure = ExtractionError::failed(
                submission.file_path.display().to_string(),
                ExtractionFailure::Timeout {
                    secs: config.ocr_timeout_secs,
                },
            );
            warn!("{} ⚠️ {}", submission, failure);
            let result = flow.degraded_result(&submission.id, scheme, &failure.to_string());
            Ok(Some(MarkingSuggestion {
                needs_review: flow.needs_review(&result),
                result,
                extracted: None,
            }))
        }
    }
}

/// 写入评分结果 JSON
async fn write_result(
    output_folder: &str,
    submission_id: &str,
    suggestion: &MarkingSuggestion,
) -> Result<PathBuf> {
    let stored = StoredResult {
        generated_at: chrono::Local::now().to_rfc3339(),
        suggestion,
    };
    let json = serde_json::to_string_pretty(&stored)?;

    let path = Path::new(output_folder).join(format!("{}.json", submission_id));
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("无法写入评分结果: {}", path.display()))?;
    Ok(path)
}
