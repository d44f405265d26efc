pub mod analyzer;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod object_detector;
pub mod report;
pub mod reporting;
pub mod scene_detector;
pub mod video_processor;

pub use analyzer::VideoAnalyzer;
pub use config::{AnalyzeConfig, ConfigLoader, ConfigOverrides};
pub use error::{AnalyzeError, Result};
pub use metadata::{
    AnalysisReport, Detection, Keyframe, ObjectSummary, SceneAnalysis, SceneDetail, SceneInterval,
    SceneStatistics, VideoMetadata,
};
pub use object_detector::{ModelSize, ObjectDetector, ObjectRecognizer};
pub use reporting::{AnalysisStage, NullReporter, Reporter, TracingReporter};
pub use scene_detector::{SceneDetector, SceneSegmenter, Segmentation};
pub use video_processor::{FrameSource, VideoProcessor};
