//! 分析结果汇总、文本摘要和 JSON 输出

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::metadata::{AnalysisReport, Detection, ObjectSummary, SceneDetail};

/// 摘要中最多列出的高频类别数
pub const TOP_OBJECTS: usize = 5;
/// 摘要中最多列出的场景数
const SUMMARY_SCENES: usize = 5;
/// 每个场景最多列出的类别名
const SUMMARY_NAMES_PER_SCENE: usize = 3;

/// 统计所有关键帧的检测结果
///
/// 高频类别按出现次数降序，次数相同时按首次出现顺序。
pub fn summarize_objects(all_detections: &[Vec<Detection>]) -> ObjectSummary {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for det in all_detections.iter().flatten() {
        let count = counts.entry(det.class_name.as_str()).or_insert_with(|| {
            order.push(det.class_name.as_str());
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .iter()
        .map(|name| (name.to_string(), counts[name]))
        .collect();
    // 稳定排序，保证同频类别保持首次出现顺序
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(TOP_OBJECTS);

    ObjectSummary {
        total_detections: all_detections.iter().map(Vec::len).sum(),
        unique_class_count: order.len(),
        top_classes: ranked,
    }
}

/// 按场景生成检测概要，scene_id 从 1 开始
pub fn scene_details(timestamps: &[f64], all_detections: &[Vec<Detection>]) -> Vec<SceneDetail> {
    timestamps
        .iter()
        .zip(all_detections)
        .enumerate()
        .map(|(i, (&timestamp, detections))| {
            let mut class_names: Vec<String> = Vec::new();
            for det in detections {
                if !class_names.contains(&det.class_name) {
                    class_names.push(det.class_name.clone());
                }
            }

            SceneDetail {
                scene_id: i + 1,
                timestamp,
                detection_count: detections.len(),
                class_names,
            }
        })
        .collect()
}

/// 面向人阅读的分析摘要，可直接用于 `{}` 格式化
pub struct Summary<'a>(pub &'a AnalysisReport);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let info = &report.video_info;
        let stats = &report.scene_analysis.statistics;
        let objects = &report.object_summary;

        writeln!(f)?;
        writeln!(f, "VIDEO ANALYSIS SUMMARY")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f)?;
        writeln!(f, "Video Details:")?;
        writeln!(f, "- Duration: {:.2} seconds", info.duration)?;
        writeln!(f, "- Resolution: {}x{}", info.width, info.height)?;
        writeln!(f, "- FPS: {:.2}", info.fps)?;
        writeln!(f, "- Total Frames: {}", info.frame_count)?;
        writeln!(f)?;
        writeln!(f, "Scene Analysis:")?;
        writeln!(f, "- Total Scenes Detected: {}", stats.total_scenes)?;
        writeln!(f, "- Average Scene Length: {:.2}s", stats.average_length)?;
        writeln!(f, "- Shortest Scene: {:.2}s", stats.shortest_length)?;
        writeln!(f, "- Longest Scene: {:.2}s", stats.longest_length)?;
        writeln!(f)?;
        writeln!(f, "Object Detection (from {} key frames):", report.num_key_frames)?;
        writeln!(f, "- Total Objects Detected: {}", objects.total_detections)?;
        writeln!(f, "- Unique Object Types: {}", objects.unique_class_count)?;
        writeln!(f, "- Most Common Objects:")?;
        for (name, count) in &objects.top_classes {
            writeln!(f, "  • {}: {} occurrences", name, count)?;
        }

        writeln!(f)?;
        writeln!(f, "Scene Breakdown:")?;
        for scene in report.scene_details.iter().take(SUMMARY_SCENES) {
            let names: Vec<&str> = scene
                .class_names
                .iter()
                .take(SUMMARY_NAMES_PER_SCENE)
                .map(String::as_str)
                .collect();
            writeln!(
                f,
                "  Scene {} ({:.1}s): {} objects - {}",
                scene.scene_id,
                scene.timestamp,
                scene.detection_count,
                names.join(", ")
            )?;
        }
        Ok(())
    }
}

/// 生成面向人阅读的分析摘要
pub fn render_summary(report: &AnalysisReport) -> String {
    Summary(report).to_string()
}

pub fn to_json_value(report: &AnalysisReport) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(report)?)
}

pub fn to_json_pretty(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// 写入 JSON 报告，必要时创建父目录
pub fn write_json(report: &AnalysisReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, to_json_pretty(report)?)?;
    info!("💾 [视频分析] 报告已保存: {}", path.display());
    Ok(())
}
