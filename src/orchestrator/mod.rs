//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量评分和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量评分处理器
//! - 管理应用生命周期（初始化、运行）
//! - 扫描提交目录（Vec<Submission>）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `submission_processor` - 单份提交处理器
//! - 在阻塞线程中限时运行 MarkingFlow
//! - 写入评分结果 JSON
//! - 追加复核清单
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Submission>)
//!     ↓
//! submission_processor (处理单份 Submission)
//!     ↓
//! workflow::MarkingFlow (识别 → 解析 → 评分 → 总评)
//!     ↓
//! services (能力层：parse / evaluate / feedback / review)
//!     ↓
//! infrastructure (基础设施：tesseract)
//! ```

pub mod batch_processor;
pub mod submission_processor;

// 重新导出主要类型
pub use batch_processor::{App, ProcessingStats};
pub use submission_processor::{process_submission, SubmissionOutcome};
