use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供运行日志文件和批量评分横幅的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;

use crate::config::Config;
use crate::orchestrator::ProcessingStats;

/// 初始化日志文件（覆盖上一次运行的内容）
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量评分日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 向日志文件追加内容
pub fn append_log(log_file_path: &str, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量评分模式");
    info!("📊 最大并发数: {}", config.max_concurrent_submissions);
    info!("📁 提交目录: {}", config.submissions_folder);
    info!("📋 评分方案: {}", config.scheme_file);
    info!(
        "🔤 识别语言: {} (psm {}, 时限 {}s)",
        config.ocr_languages, config.ocr_psm, config.ocr_timeout_secs
    );
    info!("{}", "=".repeat(60));
}

/// 记录提交加载信息
///
/// # 参数
/// - `total`: 提交总数
/// - `max_concurrent`: 最大并发数
pub fn log_submissions_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 份待评分的提交", total);
    info!("📋 将以每批 {} 份的方式处理", max_concurrent);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始提交编号
/// - `end`: 结束提交编号
/// - `total`: 提交总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批提交: {}-{} / 共 {} 份", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, finished: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 评分 {}/{}", batch_num, finished, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息，并写入日志文件
///
/// # 参数
/// - `stats`: 全部提交的统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(stats: &ProcessingStats, log_file_path: &str) -> Result<()> {
    let finished_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    info!("\n{}", "=".repeat(60));
    info!("📊 全部评分完成统计");
    info!("完成时间: {}", finished_at);
    info!("{}", "=".repeat(60));
    info!("✅ 已评分: {}/{}", stats.scored, stats.total);
    info!("🔎 建议复核: {}", stats.needs_review);
    info!("⚠️ 识别失败（降级）: {}", stats.degraded);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);

    append_log(
        log_file_path,
        &format!(
            "完成时间: {}\n已评分: {}/{}\n建议复核: {}\n识别失败（降级）: {}\n失败: {}\n",
            finished_at,
            stats.scored,
            stats.total,
            stats.needs_review,
            stats.degraded,
            stats.failed
        ),
    )
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
