//! # OCR Marking
//!
//! 对手写/扫描答卷图片进行文字识别，并按评分方案自动给出评分建议
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部识别引擎，只暴露"图片 → 文字"能力
//! - `TesseractExtractor` - 调用 tesseract 命令行，解析 TSV 输出
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单道题 / 单段文本
//! - `RegexFieldParser` - 从识别文本中解析学生信息和各题作答
//! - `AnswerEvaluator` - 按分档规则给单道题打分
//! - `compose_feedback` - 生成总评
//! - `ReviewWriter` - 写复核清单能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份提交"的完整评分流程
//! - `MarkingFlow` - 流程编排（识别 → 解析 → 评分 → 汇总 → 总评 → 复核建议）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量评分处理器，管理并发
//! - `orchestrator/submission_processor` - 单份提交处理器，限时评分并落盘
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, ScoringConfig};
pub use error::{AppError, AppResult};
pub use infrastructure::{TesseractExtractor, TextExtractor};
pub use models::{MarkingResult, MarkingScheme, MarkingSchemeQuestion, MarkingSuggestion, Submission};
pub use orchestrator::App;
pub use services::{AnswerEvaluator, FieldExtractor, RegexFieldParser};
pub use workflow::MarkingFlow;
