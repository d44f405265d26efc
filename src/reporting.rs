//! 分析过程的进度上报接口。
//!
//! 每个组件都持有一个 `Arc<dyn Reporter>`，而不是直接依赖全局日志配置。
//! 默认使用 [`TracingReporter`] 输出到 tracing，测试中可以注入记录型实现。

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::metadata::{SceneInterval, VideoMetadata};

/// 分析流水线所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Open,
    Metadata,
    Segment,
    Extract,
    Detect,
    Aggregate,
    Done,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "打开视频",
            Self::Metadata => "读取视频信息",
            Self::Segment => "场景检测",
            Self::Extract => "提取关键帧",
            Self::Detect => "目标检测",
            Self::Aggregate => "汇总结果",
            Self::Done => "分析完成",
        };
        f.write_str(name)
    }
}

/// 进度上报接口，所有方法默认不做任何事
pub trait Reporter: Send + Sync {
    fn stage(&self, _stage: AnalysisStage) {}
    fn video_opened(&self, _path: &Path, _metadata: &VideoMetadata) {}
    fn scene_detected(&self, _scene_id: usize, _interval: &SceneInterval) {}
    fn scenes_complete(&self, _count: usize) {}
    fn frames_extracted(&self, _count: usize) {}
    fn model_loaded(&self, _model: &Path) {}
    fn frame_detected(&self, _index: usize, _total: usize, _detections: usize) {}
    fn warning(&self, _message: &str) {}
}

/// 丢弃所有上报
pub struct NullReporter;

impl Reporter for NullReporter {}

/// 将上报转发到 tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage(&self, stage: AnalysisStage) {
        info!("⏳ [视频分析] {}", stage);
    }

    fn video_opened(&self, path: &Path, metadata: &VideoMetadata) {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        info!("✅ [视频分析] 已加载: {}", name);
        info!("  • 分辨率: {}x{}", metadata.width, metadata.height);
        info!("  • 帧率: {:.2} fps", metadata.fps);
        info!("  • 总帧数: {} 帧，时长 {:.2}秒", metadata.frame_count, metadata.duration);
    }

    fn scene_detected(&self, scene_id: usize, interval: &SceneInterval) {
        debug!(
            "  • 场景 {}: {:.2}s - {:.2}s ({:.2}s)",
            scene_id,
            interval.start,
            interval.end,
            interval.length()
        );
    }

    fn scenes_complete(&self, count: usize) {
        info!("✅ [场景检测] 检测到场景数: {} 个", count);
    }

    fn frames_extracted(&self, count: usize) {
        info!("✅ [视频分析] 提取关键帧: {} 帧", count);
    }

    fn model_loaded(&self, model: &Path) {
        info!("✅ [目标检测] 模型已加载: {}", model.display());
    }

    fn frame_detected(&self, index: usize, total: usize, detections: usize) {
        info!("  • 第 {}/{} 帧: {} 个目标", index + 1, total, detections);
    }

    fn warning(&self, message: &str) {
        warn!("⚠️  {}", message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// 记录所有上报事件，供测试断言
    #[derive(Default)]
    pub struct RecordingReporter {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Reporter for RecordingReporter {
        fn stage(&self, stage: AnalysisStage) {
            self.push(format!("stage:{stage:?}"));
        }

        fn scene_detected(&self, scene_id: usize, _interval: &SceneInterval) {
            self.push(format!("scene:{scene_id}"));
        }

        fn frames_extracted(&self, count: usize) {
            self.push(format!("frames:{count}"));
        }

        fn frame_detected(&self, index: usize, total: usize, detections: usize) {
            self.push(format!("detect:{index}/{total}:{detections}"));
        }

        fn warning(&self, message: &str) {
            self.push(format!("warn:{message}"));
        }
    }
}
