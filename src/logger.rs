//! 控制台日志初始化
//!
//! `RUST_LOG` 控制过滤级别，未设置时为 `info`。

use tracing_subscriber::EnvFilter;

/// 安装全局 fmt 订阅器，重复调用不会报错
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
