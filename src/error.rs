use std::path::PathBuf;
use thiserror::Error;

/// 视频分析结果类型
pub type Result<T> = std::result::Result<T, AnalyzeError>;

/// 视频分析过程中可能出现的错误
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("视频文件不存在: {0}")]
    NotFound(PathBuf),

    #[error("无法打开视频文件 {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("无法读取 {timestamp:.3}s 处的视频帧: {message}")]
    FrameRead { timestamp: f64, message: String },

    #[error("目标检测失败{}: {message}", frame_suffix(.frame))]
    Detection { frame: Option<usize>, message: String },

    #[error("无法加载模型 {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("报告序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzeError {
    pub fn open(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Open {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn frame_read(timestamp: f64, message: impl ToString) -> Self {
        Self::FrameRead {
            timestamp,
            message: message.to_string(),
        }
    }

    pub fn detection(message: impl ToString) -> Self {
        Self::Detection {
            frame: None,
            message: message.to_string(),
        }
    }

    /// 为单帧检测错误补充其在批次中的位置
    pub fn at_frame(self, index: usize) -> Self {
        match self {
            Self::Detection { message, .. } => Self::Detection {
                frame: Some(index),
                message,
            },
            other => other,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// 输入文件缺失时，调用方通常给出友好提示而不是完整错误链
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn frame_suffix(frame: &Option<usize>) -> String {
    frame
        .map(|i| format!("（第 {} 帧）", i + 1))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_error_carries_frame_index() {
        let err = AnalyzeError::detection("ONNX 推理失败").at_frame(2);
        match &err {
            AnalyzeError::Detection { frame, .. } => assert_eq!(*frame, Some(2)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("第 3 帧"));
    }

    #[test]
    fn test_at_frame_leaves_other_errors_untouched() {
        let err = AnalyzeError::frame_read(12.5, "超出视频时长").at_frame(4);
        assert!(matches!(err, AnalyzeError::FrameRead { .. }));
        assert!(err.to_string().contains("12.500s"));
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        assert!(AnalyzeError::NotFound(PathBuf::from("missing.mp4")).is_not_found());
        assert!(!AnalyzeError::config("bad").is_not_found());
    }
}
