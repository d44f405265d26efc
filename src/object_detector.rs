//! 基于 YOLOv8 ONNX 模型的目标检测。
//!
//! 模型在构造时加载一次，之后每次调用只做推理。预处理和后处理沿用
//! Ultralytics 的默认值：letterbox 等比缩放并以灰色 (114) 填充，候选下限
//! 0.25，同类别 NMS 的 IoU 为 0.7，每帧最多保留 300 个目标。调用方的置信度
//! 阈值在此基础上再做过滤。

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{AnalyzeError, Result};
use crate::metadata::Detection;
use crate::reporting::{NullReporter, Reporter, TracingReporter};

/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE: f32 = 0.5;
/// 模型输出的候选框下限，低于该值的候选不进入 NMS
const MODEL_CONFIDENCE_FLOOR: f32 = 0.25;
const NMS_IOU_THRESHOLD: f32 = 0.7;
const MAX_DETECTIONS: usize = 300;
const INPUT_SIZE: u32 = 640;
const LETTERBOX_FILL: u8 = 114;

/// COCO 类别名称（80 类）
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// 目标识别：单帧检测和按顺序的批量检测
pub trait ObjectRecognizer {
    /// 检测单帧中的目标，只保留置信度不低于 `confidence_threshold` 的结果
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>>;

    fn reporter(&self) -> &dyn Reporter {
        &NullReporter
    }

    /// 逐帧检测，结果与输入一一对应；任一帧失败则整体失败
    fn detect_batch(
        &self,
        images: &[DynamicImage],
        confidence_threshold: f32,
    ) -> Result<Vec<Vec<Detection>>> {
        let mut results = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let detections = self
                .detect(image, confidence_threshold)
                .map_err(|e| e.at_frame(i))?;
            self.reporter().frame_detected(i, images.len(), detections.len());
            results.push(detections);
        }
        Ok(results)
    }
}

/// YOLOv8 模型规格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSize {
    #[default]
    Nano,
    Small,
    Medium,
    Large,
    XLarge,
}

impl ModelSize {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Nano => "n",
            Self::Small => "s",
            Self::Medium => "m",
            Self::Large => "l",
            Self::XLarge => "x",
        }
    }

    /// 模型文件名，例如 `yolov8n.onnx`
    pub fn file_name(&self) -> String {
        format!("yolov8{}.onnx", self.suffix())
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for ModelSize {
    type Err = AnalyzeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "n" | "nano" => Ok(Self::Nano),
            "s" | "small" => Ok(Self::Small),
            "m" | "medium" => Ok(Self::Medium),
            "l" | "large" => Ok(Self::Large),
            "x" | "xlarge" => Ok(Self::XLarge),
            other => Err(AnalyzeError::config(format!(
                "未知的模型规格: {other}（可选 n/s/m/l/x）"
            ))),
        }
    }
}

/// 原图与 640x640 模型输入之间的等比缩放和居中填充
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    width: u32,
    height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn new(orig_width: u32, orig_height: u32) -> Self {
        let input = INPUT_SIZE as f32;
        let scale = (input / orig_width.max(1) as f32).min(input / orig_height.max(1) as f32);
        let width = ((orig_width as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
        let height = ((orig_height as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);

        Self {
            scale,
            width,
            height,
            pad_x: (INPUT_SIZE - width) / 2,
            pad_y: (INPUT_SIZE - height) / 2,
        }
    }

    /// 模型输入坐标 -> 原图坐标
    fn source_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// 等比缩放到 640x640 以内，居中放到灰色画布上
fn letterbox_image(img: &DynamicImage) -> RgbImage {
    let letterbox = Letterbox::new(img.width(), img.height());
    let resized = img
        .resize_exact(letterbox.width, letterbox.height, FilterType::Triangle)
        .to_rgb8();

    let mut canvas = RgbImage::from_pixel(INPUT_SIZE, INPUT_SIZE, Rgb([LETTERBOX_FILL; 3]));
    imageops::overlay(&mut canvas, &resized, letterbox.pad_x as i64, letterbox.pad_y as i64);
    canvas
}

/// YOLOv8 ONNX 目标检测器
pub struct ObjectDetector {
    session: Mutex<Session>,
    reporter: Arc<dyn Reporter>,
}

impl ObjectDetector {
    /// 从 `model_dir` 加载对应规格的模型
    pub fn new(model_size: ModelSize, model_dir: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_dir.as_ref().join(model_size.file_name());
        Self::from_path(model_path, Arc::new(TracingReporter))
    }

    pub fn from_path(
        model_path: impl Into<PathBuf>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let model_path = model_path.into();
        if !model_path.exists() {
            return Err(AnalyzeError::ModelLoad {
                path: model_path,
                message: "模型文件不存在".to_string(),
            });
        }

        info!("⏳ [目标检测] 正在加载模型: {}", model_path.display());
        let session = create_session(&model_path)?;
        reporter.model_loaded(&model_path);

        Ok(Self {
            session: Mutex::new(session),
            reporter,
        })
    }

    /// 预处理：letterbox 到 640x640，归一化到 [0, 1]，NCHW 排列
    fn preprocess(&self, img: &DynamicImage) -> Result<Value> {
        let rgb = letterbox_image(img);
        let (w, h) = (INPUT_SIZE as usize, INPUT_SIZE as usize);

        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| AnalyzeError::detection(format!("创建输入张量失败: {e}")))
    }

    /// 执行推理，返回输出形状和数据
    fn run_inference(&self, input: Value) -> Result<(Vec<i64>, Vec<f32>)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| AnalyzeError::detection("推理会话锁已失效"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| AnalyzeError::detection(format!("ONNX 推理失败: {e}")))?;

        // YOLOv8 输出为 [1, 4 + 类别数, 候选数]
        let output = outputs
            .get("output0")
            .ok_or_else(|| AnalyzeError::detection("缺少 output0 输出"))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzeError::detection(format!("读取输出张量失败: {e}")))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}

impl ObjectRecognizer for ObjectDetector {
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let input = self.preprocess(image)?;
        let (shape, outputs) = self.run_inference(input)?;
        let candidates = decode_output(&shape, &outputs, width, height)?;
        let detections = filter_by_confidence(candidates, confidence_threshold);

        debug!("🔍 [目标检测] 检测到 {} 个目标", detections.len());
        Ok(detections)
    }

    fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }
}

/// 按置信度过滤，保持模型输出顺序
pub fn filter_by_confidence(
    detections: Vec<Detection>,
    confidence_threshold: f32,
) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= confidence_threshold)
        .collect()
}

/// 解析 YOLOv8 输出：取每个候选的最高类别分数，坐标换算回原图像素，再做 NMS
fn decode_output(
    shape: &[i64],
    outputs: &[f32],
    orig_width: u32,
    orig_height: u32,
) -> Result<Vec<Detection>> {
    if shape.len() != 3 || shape[1] <= 4 {
        return Err(AnalyzeError::detection(format!("模型输出形状不符合预期: {shape:?}")));
    }
    let num_features = shape[1] as usize;
    let num_boxes = shape[2] as usize;
    let num_classes = num_features - 4;

    // [特征, 候选] -> [候选, 特征]
    let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
        .map_err(|e| AnalyzeError::detection(format!("输出数据长度与形状不符: {e}")))?;
    let transposed = output_array.t();

    let letterbox = Letterbox::new(orig_width, orig_height);
    let max_x = orig_width as f32;
    let max_y = orig_height as f32;

    let mut candidates = Vec::new();
    for i in 0..num_boxes {
        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for c in 0..num_classes {
            let score = transposed[[i, 4 + c]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < MODEL_CONFIDENCE_FLOOR {
            continue;
        }

        // 中心点格式 -> 角点格式
        let cx = transposed[[i, 0]];
        let cy = transposed[[i, 1]];
        let w = transposed[[i, 2]];
        let h = transposed[[i, 3]];

        let (x1, y1) = letterbox.source_point(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.source_point(cx + w / 2.0, cy + h / 2.0);

        candidates.push(Detection {
            class_id: best_class,
            class_name: class_name(best_class),
            confidence: best_score.min(1.0),
            bounding_box: [
                x1.clamp(0.0, max_x),
                y1.clamp(0.0, max_y),
                x2.clamp(0.0, max_x),
                y2.clamp(0.0, max_y),
            ],
        });
    }

    let mut detections = non_maximum_suppression(candidates, NMS_IOU_THRESHOLD);
    detections.truncate(MAX_DETECTIONS);
    Ok(detections)
}

fn class_name(class_id: usize) -> String {
    COCO_CLASSES
        .get(class_id)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("class_{class_id}"))
}

/// 按置信度降序做同类别 NMS
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && iou(kept, &candidate) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let [ax1, ay1, ax2, ay2] = a.bounding_box;
    let [bx1, by1, bx2, by2] = b.bounding_box;

    let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
    let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
    let intersection = inter_w * inter_h;

    let area_a = (ax2 - ax1) * (ay2 - ay1);
    let area_b = (bx2 - bx1) * (by2 - by1);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// 创建 ONNX Runtime 会话（CPU）
fn create_session(model_path: &Path) -> Result<Session> {
    let load_error = |message: String| AnalyzeError::ModelLoad {
        path: model_path.to_path_buf(),
        message,
    };

    let model_bytes = std::fs::read(model_path)
        .map_err(|e| load_error(format!("读取模型文件失败: {e}")))?;

    Session::builder()
        .map_err(|e| load_error(format!("创建会话失败: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_error(format!("设置优化级别失败: {e}")))?
        .commit_from_memory(&model_bytes)
        .map_err(|e| load_error(format!("加载 ONNX 模型失败: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::testing::RecordingReporter;

    fn detection(class_id: usize, confidence: f32, bbox: [f32; 4]) -> Detection {
        Detection {
            class_id,
            class_name: class_name(class_id),
            confidence,
            bounding_box: bbox,
        }
    }

    /// 构造 [1, 84, N] 的 YOLOv8 输出
    fn yolo_output(boxes: &[([f32; 4], usize, f32)]) -> (Vec<i64>, Vec<f32>) {
        let num_boxes = boxes.len();
        let mut data = vec![0.0f32; 84 * num_boxes];
        for (i, (bbox, class_id, score)) in boxes.iter().enumerate() {
            for (f, value) in bbox.iter().enumerate() {
                data[f * num_boxes + i] = *value;
            }
            data[(4 + class_id) * num_boxes + i] = *score;
        }
        (vec![1, 84, num_boxes as i64], data)
    }

    /// 返回固定结果的识别器
    struct FixedRecognizer {
        detections: Vec<Detection>,
        fail_on_width: Option<u32>,
        reporter: RecordingReporter,
    }

    impl ObjectRecognizer for FixedRecognizer {
        fn detect(
            &self,
            image: &DynamicImage,
            confidence_threshold: f32,
        ) -> Result<Vec<Detection>> {
            if Some(image.width()) == self.fail_on_width {
                return Err(AnalyzeError::detection("推理失败"));
            }
            Ok(filter_by_confidence(self.detections.clone(), confidence_threshold))
        }

        fn reporter(&self) -> &dyn Reporter {
            &self.reporter
        }
    }

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES.len(), 80);
        assert_eq!(class_name(0), "person");
        assert_eq!(class_name(2), "car");
        assert_eq!(class_name(99), "class_99");
    }

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("n".parse::<ModelSize>().unwrap(), ModelSize::Nano);
        assert_eq!("Medium".parse::<ModelSize>().unwrap(), ModelSize::Medium);
        assert_eq!(ModelSize::Large.file_name(), "yolov8l.onnx");
        assert!("huge".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_missing_model_is_load_error() {
        let err = ObjectDetector::new(ModelSize::Nano, "no/such/dir").err().unwrap();
        assert!(matches!(err, AnalyzeError::ModelLoad { .. }));
    }

    #[test]
    fn test_decode_output_scales_to_source_pixels() {
        // 1280x720 缩放 0.5 后为 640x360，上下各填充 140
        let (shape, data) = yolo_output(&[([320.0, 320.0, 64.0, 64.0], 2, 0.9)]);
        let detections = decode_output(&shape, &data, 1280, 720).unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.class_name, "car");
        let expected = [576.0, 296.0, 704.0, 424.0];
        for (got, want) in det.bounding_box.iter().zip(expected) {
            assert!((got - want).abs() < 1e-3, "{:?}", det.bounding_box);
        }
    }

    #[test]
    fn test_decode_output_clamps_padding_region() {
        // 框的上半部分落在填充区，换算后截到原图边界
        let (shape, data) = yolo_output(&[([320.0, 150.0, 100.0, 40.0], 0, 0.9)]);
        let detections = decode_output(&shape, &data, 1280, 720).unwrap();

        let [_, y1, _, y2] = detections[0].bounding_box;
        assert_eq!(y1, 0.0);
        assert!((y2 - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_letterbox_geometry() {
        let landscape = Letterbox::new(1280, 720);
        assert_eq!((landscape.width, landscape.height), (640, 360));
        assert_eq!((landscape.pad_x, landscape.pad_y), (0, 140));

        let portrait = Letterbox::new(720, 1280);
        assert_eq!((portrait.width, portrait.height), (360, 640));
        assert_eq!((portrait.pad_x, portrait.pad_y), (140, 0));

        let square = Letterbox::new(320, 320);
        assert_eq!(square.scale, 2.0);
        assert_eq!((square.pad_x, square.pad_y), (0, 0));
    }

    #[test]
    fn test_letterbox_image_pads_with_gray() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1280, 720, Rgb([0, 0, 0])));
        let canvas = letterbox_image(&img);

        assert_eq!(canvas.dimensions(), (640, 640));
        assert_eq!(canvas.get_pixel(0, 0).0, [114, 114, 114]);
        assert_eq!(canvas.get_pixel(320, 639).0, [114, 114, 114]);
        assert_eq!(canvas.get_pixel(320, 320).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(0, 140).0, [0, 0, 0]);
    }

    #[test]
    fn test_decode_output_drops_low_scores_and_overlaps() {
        let (shape, data) = yolo_output(&[
            ([100.0, 100.0, 50.0, 50.0], 0, 0.8),
            ([102.0, 101.0, 50.0, 50.0], 0, 0.7),
            ([102.0, 101.0, 50.0, 50.0], 16, 0.6),
            ([400.0, 400.0, 50.0, 50.0], 0, 0.1),
        ]);
        let detections = decode_output(&shape, &data, 640, 640).unwrap();

        let summary: Vec<(&str, f32)> = detections
            .iter()
            .map(|d| (d.class_name.as_str(), d.confidence))
            .collect();
        assert_eq!(summary, vec![("person", 0.8), ("dog", 0.6)]);
    }

    #[test]
    fn test_nms_keeps_moderate_overlap() {
        // IoU 约 0.54，低于 0.7，两个框都保留
        let (shape, data) = yolo_output(&[
            ([100.0, 100.0, 50.0, 50.0], 0, 0.8),
            ([115.0, 100.0, 50.0, 50.0], 0, 0.7),
        ]);
        let detections = decode_output(&shape, &data, 640, 640).unwrap();
        assert_eq!(detections.len(), 2);
    }

    #[test]
    fn test_decode_output_caps_detection_count() {
        // 20x20 网格，互不重叠
        let boxes: Vec<([f32; 4], usize, f32)> = (0..400)
            .map(|i| {
                let cx = 16.0 + (i % 20) as f32 * 32.0;
                let cy = 16.0 + (i / 20) as f32 * 32.0;
                ([cx, cy, 10.0, 10.0], 0, 0.9)
            })
            .collect();
        let (shape, data) = yolo_output(&boxes);

        let detections = decode_output(&shape, &data, 640, 640).unwrap();
        assert_eq!(detections.len(), MAX_DETECTIONS);
    }

    #[test]
    fn test_decode_output_rejects_bad_shape() {
        assert!(decode_output(&[1, 4, 10], &[0.0; 40], 640, 640).is_err());
        assert!(decode_output(&[1, 84, 10], &[0.0; 10], 640, 640).is_err());
    }

    #[test]
    fn test_confidence_filter_is_monotonic() {
        let detections = vec![
            detection(0, 0.95, [0.0, 0.0, 10.0, 10.0]),
            detection(2, 0.55, [0.0, 0.0, 10.0, 10.0]),
            detection(0, 0.30, [20.0, 20.0, 30.0, 30.0]),
        ];

        let mut previous = usize::MAX;
        for threshold in [0.0, 0.3, 0.5, 0.6, 0.96] {
            let count = filter_by_confidence(detections.clone(), threshold).len();
            assert!(count <= previous);
            previous = count;
        }
        assert_eq!(filter_by_confidence(detections.clone(), 0.5).len(), 2);
        assert_eq!(filter_by_confidence(detections, 0.96).len(), 0);
    }

    #[test]
    fn test_iou() {
        let a = detection(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
        let b = detection(0, 0.9, [5.0, 0.0, 15.0, 10.0]);
        let c = detection(0, 0.9, [20.0, 20.0, 30.0, 30.0]);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(iou(&a, &c), 0.0);
    }

    #[test]
    fn test_detect_batch_is_index_aligned() {
        let recognizer = FixedRecognizer {
            detections: vec![
                detection(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
                detection(2, 0.4, [0.0, 0.0, 10.0, 10.0]),
            ],
            fail_on_width: None,
            reporter: RecordingReporter::default(),
        };
        let images = vec![DynamicImage::new_rgb8(8, 8); 3];

        let results = recognizer.detect_batch(&images, 0.5).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.len() == 1));
        assert_eq!(
            recognizer.reporter.events(),
            vec!["detect:0/3:1", "detect:1/3:1", "detect:2/3:1"]
        );

        assert!(recognizer.detect_batch(&[], 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_detect_batch_keeps_empty_results() {
        let recognizer = FixedRecognizer {
            detections: vec![detection(0, 0.2, [0.0, 0.0, 1.0, 1.0])],
            fail_on_width: None,
            reporter: RecordingReporter::default(),
        };
        let images = vec![DynamicImage::new_rgb8(4, 4); 2];

        let results = recognizer.detect_batch(&images, 0.5).unwrap();
        assert_eq!(results, vec![Vec::<Detection>::new(), Vec::new()]);
    }

    #[test]
    fn test_detect_batch_reports_failing_frame() {
        let recognizer = FixedRecognizer {
            detections: Vec::new(),
            fail_on_width: Some(16),
            reporter: RecordingReporter::default(),
        };
        let images = vec![
            DynamicImage::new_rgb8(8, 8),
            DynamicImage::new_rgb8(16, 16),
            DynamicImage::new_rgb8(8, 8),
        ];

        let err = recognizer.detect_batch(&images, 0.5).unwrap_err();
        assert!(matches!(err, AnalyzeError::Detection { frame: Some(1), .. }));
        assert_eq!(recognizer.reporter.events(), vec!["detect:0/3:0"]);
    }
}
