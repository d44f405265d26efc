use image::RgbImage;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AnalyzeError, Result};
use crate::metadata::{Keyframe, SceneInterval, SceneStatistics};
use crate::reporting::{Reporter, TracingReporter};
use crate::video_processor::VideoProcessor;

/// 默认内容变化阈值，值越小检测到的场景越多、越短
pub const DEFAULT_THRESHOLD: f64 = 27.0;
/// 两次切换之间至少间隔的帧数
pub const DEFAULT_MIN_SCENE_LEN: u64 = 15;
/// 分析前将帧缩小到不低于该宽度
const ANALYSIS_WIDTH: u32 = 256;

/// 场景分割：一次检测同时给出场景列表、统计信息和关键帧时间
pub trait SceneSegmenter {
    fn segment(&self, path: &Path) -> Result<Segmentation>;
}

/// 一次场景检测的全部结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segmentation {
    pub intervals: Vec<SceneInterval>,
    pub statistics: SceneStatistics,
    pub keyframe_timestamps: Vec<f64>,
}

impl Segmentation {
    pub fn from_intervals(intervals: Vec<SceneInterval>) -> Self {
        let statistics = SceneStatistics::from_intervals(&intervals);
        let keyframe_timestamps = keyframe_timestamps_for(&intervals);
        Self {
            intervals,
            statistics,
            keyframe_timestamps,
        }
    }

    pub fn keyframes(&self) -> Vec<Keyframe> {
        self.keyframe_timestamps
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| Keyframe {
                scene_id: i + 1,
                timestamp,
            })
            .collect()
    }
}

/// 每个场景取中点作为关键帧时间
pub fn keyframe_timestamps_for(intervals: &[SceneInterval]) -> Vec<f64> {
    intervals.iter().map(SceneInterval::midpoint).collect()
}

/// 将切换帧号转换为场景时间区间
///
/// 切换点 `c1..cn` 与总帧数 `total_frames` 给出 `[0,c1), [c1,c2), ..., [cn,total_frames)`。
/// 没有切换点时返回空列表，除非 `start_in_scene` 为 true（此时整段视频为一个场景）。
pub fn intervals_from_cuts(
    cuts: &[u64],
    total_frames: u64,
    fps: f64,
    start_in_scene: bool,
) -> Vec<SceneInterval> {
    if fps <= 0.0 || total_frames == 0 {
        return Vec::new();
    }
    if cuts.is_empty() && !start_in_scene {
        return Vec::new();
    }

    let mut boundaries = Vec::with_capacity(cuts.len() + 2);
    boundaries.push(0);
    boundaries.extend(cuts.iter().copied().filter(|&c| c > 0 && c < total_frames));
    boundaries.push(total_frames);

    boundaries
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| SceneInterval::new(w[0] as f64 / fps, w[1] as f64 / fps))
        .collect()
}

/// 分析时的缩小倍数：宽度不足 256 时不缩小
pub fn downscale_factor(width: u32) -> u32 {
    if width < ANALYSIS_WIDTH {
        1
    } else {
        width / ANALYSIS_WIDTH
    }
}

/// 基于 HSV 内容差异的逐帧切换检测
///
/// 每帧转换到 HSV（H 0-180，S/V 0-255），与上一帧逐通道计算平均绝对差，
/// 三个通道的平均值不低于阈值、且距上一次切换至少 `min_scene_len` 帧时记为切换。
pub struct ContentDetector {
    threshold: f64,
    min_scene_len: u64,
    last_frame: Option<HsvFrame>,
    last_cut: Option<u64>,
}

impl ContentDetector {
    pub fn new(threshold: f64, min_scene_len: u64) -> Self {
        Self {
            threshold,
            min_scene_len,
            last_frame: None,
            last_cut: None,
        }
    }

    /// 处理一帧，检测到切换时返回切换所在的帧号
    pub fn process_frame(&mut self, frame_index: u64, frame: &RgbImage) -> Option<u64> {
        let current = HsvFrame::from_rgb(frame);
        // 第一帧视为起点，首个切换同样受最小场景长度约束
        let last_cut = *self.last_cut.get_or_insert(frame_index);

        let mut cut = None;
        if let Some(previous) = &self.last_frame {
            let score = current.score_against(previous);
            if score >= self.threshold && frame_index - last_cut >= self.min_scene_len {
                debug!("✂️  [场景检测] 第 {} 帧切换，内容差异 {:.2}", frame_index, score);
                self.last_cut = Some(frame_index);
                cut = Some(frame_index);
            }
        }

        self.last_frame = Some(current);
        cut
    }
}

/// 单帧的 HSV 通道（OpenCV 8 位取值范围）
struct HsvFrame {
    width: u32,
    height: u32,
    hue: Vec<u8>,
    saturation: Vec<u8>,
    value: Vec<u8>,
}

impl HsvFrame {
    fn from_rgb(frame: &RgbImage) -> Self {
        let pixel_count = (frame.width() * frame.height()) as usize;
        let mut hue = Vec::with_capacity(pixel_count);
        let mut saturation = Vec::with_capacity(pixel_count);
        let mut value = Vec::with_capacity(pixel_count);

        for pixel in frame.pixels() {
            let (h, s, v) = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
            hue.push(h);
            saturation.push(s);
            value.push(v);
        }

        Self {
            width: frame.width(),
            height: frame.height(),
            hue,
            saturation,
            value,
        }
    }

    /// 三个通道平均绝对差的均值；尺寸不同视为完全不同
    fn score_against(&self, other: &HsvFrame) -> f64 {
        if self.width != other.width || self.height != other.height || self.hue.is_empty() {
            return 255.0;
        }

        let delta_h = mean_pixel_distance(&self.hue, &other.hue);
        let delta_s = mean_pixel_distance(&self.saturation, &other.saturation);
        let delta_v = mean_pixel_distance(&self.value, &other.value);
        (delta_h + delta_s + delta_v) / 3.0
    }
}

fn mean_pixel_distance(a: &[u8], b: &[u8]) -> f64 {
    let sum: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs() as u64)
        .sum();
    sum as f64 / a.len() as f64
}

/// RGB 转 HSV，H 取 0-180（角度的一半），S/V 取 0-255
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g.max(b));
    let min = r.min(g.min(b));
    let delta = max - min;

    // 色调
    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    // 饱和度
    let s = if max == 0.0 { 0.0 } else { delta / max };

    (
        (h / 2.0).round().min(180.0) as u8,
        (s * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    )
}

/// 场景检测器，用于检测视频中的镜头切换点
pub struct SceneDetector {
    /// 内容变化阈值
    threshold: f64,
    /// 最小场景长度（帧）
    min_scene_len: u64,
    /// 没有切换点时是否把整段视频当作一个场景
    start_in_scene: bool,
    reporter: Arc<dyn Reporter>,
}

impl Default for SceneDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SceneDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            start_in_scene: false,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_min_scene_len(mut self, min_scene_len: u64) -> Self {
        self.min_scene_len = min_scene_len;
        self
    }

    pub fn with_start_in_scene(mut self, start_in_scene: bool) -> Self {
        self.start_in_scene = start_in_scene;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// 检测场景，返回按开始时间排序的 (开始, 结束) 区间
    pub fn detect_scenes(&self, path: impl AsRef<Path>) -> Result<Vec<SceneInterval>> {
        let path = path.as_ref();
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        debug!("🎬 [场景检测] 检测 {} 的场景（阈值 {:.1}）", name, self.threshold);

        let mut processor = VideoProcessor::open_with_reporter(path, self.reporter.clone())?;
        let fps = processor.metadata().fps;
        if fps <= 0.0 {
            return Err(AnalyzeError::open(path, "无法获取视频帧率，无法计算场景时间"));
        }

        let factor = downscale_factor(processor.metadata().width);
        let mut content = ContentDetector::new(self.threshold, self.min_scene_len);
        let mut cuts = Vec::new();

        let total_frames = processor.scan_frames(1, factor, |index, frame| {
            if let Some(cut) = content.process_frame(index, &frame) {
                cuts.push(cut);
            }
            Ok(ControlFlow::Continue(()))
        })?;
        processor.close();

        let intervals = intervals_from_cuts(&cuts, total_frames, fps, self.start_in_scene);
        for (i, interval) in intervals.iter().enumerate() {
            self.reporter.scene_detected(i + 1, interval);
        }
        self.reporter.scenes_complete(intervals.len());

        Ok(intervals)
    }

    /// 场景统计；没有检测到场景时所有字段为 0
    pub fn compute_statistics(&self, path: impl AsRef<Path>) -> Result<SceneStatistics> {
        let intervals = self.detect_scenes(path)?;
        Ok(SceneStatistics::from_intervals(&intervals))
    }

    /// 每个场景中点的时间戳
    pub fn keyframe_timestamps(&self, path: impl AsRef<Path>) -> Result<Vec<f64>> {
        let intervals = self.detect_scenes(path)?;
        let timestamps = keyframe_timestamps_for(&intervals);
        debug!("🔑 [场景检测] 关键帧时间戳: {} 个", timestamps.len());
        Ok(timestamps)
    }
}

impl SceneSegmenter for SceneDetector {
    fn segment(&self, path: &Path) -> Result<Segmentation> {
        self.detect_scenes(path).map(Segmentation::from_intervals)
    }
}
