//! 完整的视频分析流水线：场景检测 → 关键帧提取 → 目标检测 → 汇总

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::AnalyzeConfig;
use crate::error::Result;
use crate::metadata::{AnalysisReport, SceneAnalysis};
use crate::object_detector::{ObjectDetector, ObjectRecognizer, DEFAULT_CONFIDENCE};
use crate::report::{scene_details, summarize_objects};
use crate::reporting::{AnalysisStage, Reporter, TracingReporter};
use crate::scene_detector::{SceneDetector, SceneSegmenter};
use crate::video_processor::{FrameSource, VideoProcessor};

/// 视频分析器，组合场景分割和目标识别
pub struct VideoAnalyzer<S, R> {
    segmenter: S,
    recognizer: R,
    confidence_threshold: f32,
    reporter: Arc<dyn Reporter>,
}

impl VideoAnalyzer<SceneDetector, ObjectDetector> {
    /// 按配置构建默认的分析器，加载检测模型
    pub fn from_config(config: &AnalyzeConfig, reporter: Arc<dyn Reporter>) -> Result<Self> {
        let segmenter = SceneDetector::new(config.threshold)
            .with_min_scene_len(config.min_scene_len)
            .with_start_in_scene(config.start_in_scene)
            .with_reporter(reporter.clone());
        let model_path = config.model_dir.join(config.model_size.file_name());
        let recognizer = ObjectDetector::from_path(model_path, reporter.clone())?;

        Ok(Self::new(segmenter, recognizer)
            .with_confidence_threshold(config.confidence_threshold)
            .with_reporter(reporter))
    }
}

impl<S: SceneSegmenter, R: ObjectRecognizer> VideoAnalyzer<S, R> {
    pub fn new(segmenter: S, recognizer: R) -> Self {
        Self {
            segmenter,
            recognizer,
            confidence_threshold: DEFAULT_CONFIDENCE,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_confidence_threshold(mut self, confidence_threshold: f32) -> Self {
        self.confidence_threshold = confidence_threshold;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// 分析视频文件
    ///
    /// 任一阶段失败都会中止分析，不返回部分结果。视频句柄在所有路径上都会释放。
    pub fn analyze(&self, path: impl AsRef<Path>) -> Result<AnalysisReport> {
        let path = path.as_ref();
        info!("🎬 [视频分析] 开始分析: {}", path.display());

        self.reporter.stage(AnalysisStage::Open);
        let mut processor = VideoProcessor::open_with_reporter(path, self.reporter.clone())?;
        let result = self.analyze_source(path, &mut processor);
        processor.close();
        result
    }

    /// 基于已打开的帧源执行分析，`path` 交给场景分割使用
    pub fn analyze_source<F: FrameSource>(
        &self,
        path: &Path,
        source: &mut F,
    ) -> Result<AnalysisReport> {
        self.reporter.stage(AnalysisStage::Metadata);
        let video_info = source.metadata().clone();

        self.reporter.stage(AnalysisStage::Segment);
        let segmentation = self.segmenter.segment(path)?;

        self.reporter.stage(AnalysisStage::Extract);
        let key_frames = segmentation
            .keyframe_timestamps
            .iter()
            .map(|&ts| source.frame_at(ts))
            .collect::<Result<Vec<_>>>()?;
        self.reporter.frames_extracted(key_frames.len());

        self.reporter.stage(AnalysisStage::Detect);
        let all_detections = self
            .recognizer
            .detect_batch(&key_frames, self.confidence_threshold)?;

        self.reporter.stage(AnalysisStage::Aggregate);
        let report = AnalysisReport {
            video_info,
            num_key_frames: key_frames.len(),
            object_summary: summarize_objects(&all_detections),
            scene_details: scene_details(&segmentation.keyframe_timestamps, &all_detections),
            key_timestamps: segmentation.keyframe_timestamps,
            scene_analysis: SceneAnalysis {
                statistics: segmentation.statistics,
                scenes: segmentation.intervals,
            },
        };

        self.reporter.stage(AnalysisStage::Done);
        info!(
            "✅ [视频分析] 分析完成: {} 个场景，{} 个目标",
            report.scene_analysis.statistics.total_scenes,
            report.object_summary.total_detections
        );
        Ok(report)
    }
}
