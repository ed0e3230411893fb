//! 批量评分处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量提交的评分和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、加载评分配置和评分方案、组装评分流程
//! 2. **批量加载**：扫描提交目录（不递归，按文件名排序）
//! 3. **并发控制**：使用 Semaphore 限制同时评分的数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **全局统计**：汇总已评分 / 建议复核 / 降级 / 失败数量
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单份提交的细节，委托 submission_processor
//! - **共享只读**：评分流程和评分方案通过 `Arc` 在任务间共享

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::{Config, ScoringConfig};
use crate::models::{load_scheme, MarkingScheme, Submission};
use crate::orchestrator::submission_processor::{process_submission, SubmissionOutcome};
use crate::services::ReviewWriter;
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_startup, log_submissions_loaded,
    print_final_stats,
};
use crate::workflow::MarkingFlow;

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<MarkingFlow>,
    scheme: Arc<MarkingScheme>,
    review_writer: Arc<ReviewWriter>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config);

        let scoring = match &config.scoring_config_file {
            Some(path) => {
                info!("⚙️ 加载评分配置: {}", path);
                ScoringConfig::from_toml_file(Path::new(path))
                    .with_context(|| format!("无法加载评分配置: {}", path))?
            }
            None => ScoringConfig::default(),
        };

        let scheme = load_scheme(Path::new(&config.scheme_file))
            .await
            .with_context(|| format!("无法加载评分方案: {}", config.scheme_file))?;

        let flow = MarkingFlow::with_tesseract(&config, scoring)?;

        Ok(Self::with_flow(config, flow, scheme))
    }

    /// 使用已组装的评分流程创建应用（不写日志文件、不读方案文件）
    pub fn with_flow(config: Config, flow: MarkingFlow, scheme: MarkingScheme) -> Self {
        let review_writer = ReviewWriter::with_path(config.review_file.clone());
        Self {
            config,
            flow: Arc::new(flow),
            scheme: Arc::new(scheme),
            review_writer: Arc::new(review_writer),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        // 加载所有待评分的提交
        let submissions = self.load_submissions().await?;

        if submissions.is_empty() {
            warn!("⚠️ 没有找到待评分的提交，程序结束");
            return Ok(ProcessingStats::default());
        }

        tokio::fs::create_dir_all(&self.config.output_folder)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.config.output_folder))?;

        log_submissions_loaded(submissions.len(), self.config.max_concurrent_submissions);

        let stats = self.process_all_submissions(submissions).await?;

        // 输出最终统计
        print_final_stats(&stats, &self.config.output_log_file)?;

        Ok(stats)
    }

    /// 扫描提交目录
    async fn load_submissions(&self) -> Result<Vec<Submission>> {
        info!("\n📁 正在扫描待评分的提交...");
        let folder = &self.config.submissions_folder;

        let mut entries = tokio::fs::read_dir(folder)
            .await
            .with_context(|| format!("无法读取提交目录: {}", folder))?;

        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let hidden = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with('.'))
                .unwrap_or(true);
            if entry.file_type().await?.is_file() && !hidden {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths.iter().map(|p| Submission::from_path(p)).collect())
    }

    /// 处理所有提交
    async fn process_all_submissions(
        &self,
        submissions: Vec<Submission>,
    ) -> Result<ProcessingStats> {
        let max_concurrent = self.config.max_concurrent_submissions.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = submissions.len();
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        // 分批处理
        let total_batches = total.div_ceil(max_concurrent);
        for (batch_idx, batch) in submissions.chunks(max_concurrent).enumerate() {
            let batch_start = batch_idx * max_concurrent;
            let batch_num = batch_idx + 1;

            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let outcomes = self.process_batch(batch, semaphore.clone()).await?;
            for outcome in &outcomes {
                stats.record(*outcome);
            }

            let finished = outcomes
                .iter()
                .filter(|o| **o != SubmissionOutcome::Failed)
                .count();
            log_batch_complete(batch_num, finished, batch.len());
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[Submission],
        semaphore: Arc<Semaphore>,
    ) -> Result<Vec<SubmissionOutcome>> {
        let mut handles = Vec::new();

        for submission in batch {
            let permit = semaphore.clone().acquire_owned().await?;

            let flow = self.flow.clone();
            let scheme = self.scheme.clone();
            let config = self.config.clone();
            let review_writer = self.review_writer.clone();
            let submission = submission.clone();
            let label = submission.to_string();

            let handle = tokio::spawn(async move {
                process_submission(flow, scheme, submission, &config, &review_writer, permit).await
            });
            handles.push((label, handle));
        }

        // 等待本批所有任务完成
        let mut outcomes = Vec::with_capacity(handles.len());
        for (label, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!("{} ❌ 处理过程中发生错误: {:#}", label, e);
                    SubmissionOutcome::Failed
                }
                Err(e) => {
                    error!("{} 任务执行失败: {}", label, e);
                    SubmissionOutcome::Failed
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total: usize,
    /// 正常评分（含建议复核）
    pub scored: usize,
    pub needs_review: usize,
    /// 识别失败，生成了 0 分结果
    pub degraded: usize,
    pub failed: usize,
}

impl ProcessingStats {
    fn record(&mut self, outcome: SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Scored { needs_review } => {
                self.scored += 1;
                if needs_review {
                    self.needs_review += 1;
                }
            }
            SubmissionOutcome::Degraded => {
                self.degraded += 1;
                self.needs_review += 1;
            }
            SubmissionOutcome::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record() {
        let mut stats = ProcessingStats::default();
        stats.record(SubmissionOutcome::Scored { needs_review: false });
        stats.record(SubmissionOutcome::Scored { needs_review: true });
        stats.record(SubmissionOutcome::Degraded);
        stats.record(SubmissionOutcome::Failed);
        assert_eq!(stats.scored, 2);
        assert_eq!(stats.needs_review, 2);
        assert_eq!(stats.degraded, 1);
        assert_eq!(stats.failed, 1);
    }
}
