use serde::{Deserialize, Serialize};

/// 视频基础信息，打开视频时计算一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// 视频帧率
    pub fps: f64,
    /// 视频总帧数
    #[serde(rename = "total_frames")]
    pub frame_count: u64,
    /// 视频时长（秒），fps 为 0 时为 0
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    /// 由帧率和帧数推导时长
    pub fn new(fps: f64, frame_count: u64, width: u32, height: u32) -> Self {
        let duration = if fps > 0.0 {
            frame_count as f64 / fps
        } else {
            0.0
        };

        Self {
            fps,
            frame_count,
            duration,
            width,
            height,
        }
    }
}

/// 单个场景的时间区间（秒），序列化为 `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct SceneInterval {
    pub start: f64,
    pub end: f64,
}

impl SceneInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// 场景中点，作为该场景的关键帧时间
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

impl From<(f64, f64)> for SceneInterval {
    fn from((start, end): (f64, f64)) -> Self {
        Self { start, end }
    }
}

impl From<SceneInterval> for (f64, f64) {
    fn from(interval: SceneInterval) -> Self {
        (interval.start, interval.end)
    }
}

/// 场景长度统计
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneStatistics {
    pub total_scenes: usize,
    #[serde(rename = "avg_scene_length")]
    pub average_length: f64,
    #[serde(rename = "shortest_scene")]
    pub shortest_length: f64,
    #[serde(rename = "longest_scene")]
    pub longest_length: f64,
}

impl SceneStatistics {
    /// 由场景列表计算统计信息；没有场景时所有字段为 0
    pub fn from_intervals(intervals: &[SceneInterval]) -> Self {
        if intervals.is_empty() {
            return Self::default();
        }

        let lengths: Vec<f64> = intervals.iter().map(SceneInterval::length).collect();
        let total: f64 = lengths.iter().sum();

        Self {
            total_scenes: intervals.len(),
            average_length: total / lengths.len() as f64,
            shortest_length: lengths.iter().copied().fold(f64::INFINITY, f64::min),
            longest_length: lengths.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// 每个场景一个关键帧，scene_id 从 1 开始
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub scene_id: usize,
    pub timestamp: f64,
}

/// 单个检测到的目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// COCO 类别 ID
    pub class_id: usize,
    pub class_name: String,
    /// 置信度 [0, 1]
    pub confidence: f32,
    /// 源帧像素坐标 (x1, y1, x2, y2)
    #[serde(rename = "bbox")]
    pub bounding_box: [f32; 4],
}

/// 全片目标统计
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectSummary {
    #[serde(rename = "total_objects_detected")]
    pub total_detections: usize,
    #[serde(rename = "unique_objects")]
    pub unique_class_count: usize,
    /// 出现次数最多的类别（最多 5 个）
    #[serde(rename = "top_objects")]
    pub top_classes: Vec<(String, usize)>,
}

/// 单个场景的检测概要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDetail {
    pub scene_id: usize,
    pub timestamp: f64,
    #[serde(rename = "objects_detected")]
    pub detection_count: usize,
    /// 去重后的类别名称，按首次出现顺序
    #[serde(rename = "objects")]
    pub class_names: Vec<String>,
}

/// 场景分析部分：统计信息与场景列表
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneAnalysis {
    #[serde(flatten)]
    pub statistics: SceneStatistics,
    pub scenes: Vec<SceneInterval>,
}

/// 完整的视频分析报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub video_info: VideoMetadata,
    pub scene_analysis: SceneAnalysis,
    pub num_key_frames: usize,
    pub key_timestamps: Vec<f64>,
    pub object_summary: ObjectSummary,
    pub scene_details: Vec<SceneDetail>,
}
