use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AnalyzeError, Result};

/// 初始化日志输出，`RUST_LOG` 优先于配置的日志级别
pub fn init_logging(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| filter_for_level(log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| AnalyzeError::config(format!("初始化日志失败: {e}")))
}

fn filter_for_level(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level.trim())
        .map_err(|e| AnalyzeError::config(format!("无效的日志级别 \"{log_level}\": {e}")))
}
