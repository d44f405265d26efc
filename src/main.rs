use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use video_analyze::config::{AnalyzeConfig, ConfigLoader, ConfigOverrides};
use video_analyze::logging::init_logging;
use video_analyze::report::{write_json, Summary};
use video_analyze::{
    AnalyzeError, ModelSize, ObjectDetector, ObjectRecognizer, Reporter, SceneDetector,
    SceneSegmenter, TracingReporter, VideoAnalyzer, VideoProcessor,
};

/// 视频内容分析工具 - 场景检测、关键帧提取与目标识别
#[derive(Parser, Debug)]
#[command(name = "video-analyze")]
#[command(about = "视频内容分析：检测场景切换、提取关键帧、识别画面中的目标", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 完整分析：输出文本摘要并保存 JSON 报告
    Analyze {
        /// 输入视频文件路径
        #[arg(short, long)]
        input: PathBuf,

        /// JSON 报告输出路径
        /// 可通过环境变量 VIDEO_ANALYZE_OUTPUT_PATH 或配置文件设置
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        scene: SceneArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// 配置文件路径（可选，支持 .ini 格式）
        /// 优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// 显示视频基础信息
    Info {
        /// 输入视频文件路径
        #[arg(short, long)]
        input: PathBuf,
    },
    /// 只做场景检测，输出场景统计和关键帧时间
    Scenes {
        /// 输入视频文件路径
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        scene: SceneArgs,

        /// 配置文件路径
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// 按固定间隔采样视频帧并保存为 PNG
    Sample {
        /// 输入视频文件路径
        #[arg(short, long)]
        input: PathBuf,

        /// 采样间隔（帧）
        #[arg(long, default_value_t = 30)]
        stride: u64,

        /// 最多采样帧数
        #[arg(long)]
        max_frames: Option<usize>,

        /// 输出目录
        #[arg(short, long, default_value = "output/frames")]
        output: PathBuf,
    },
    /// 对采样帧运行目标检测，以 JSON 输出检测结果
    Detect {
        /// 输入视频文件路径
        #[arg(short, long)]
        input: PathBuf,

        /// 采样间隔（帧）
        #[arg(long, default_value_t = 60)]
        stride: u64,

        /// 最多检测帧数
        #[arg(long, default_value_t = 3)]
        max_frames: usize,

        #[command(flatten)]
        model: ModelArgs,

        /// 配置文件路径
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// 生成默认配置文件
    InitConfig {
        /// 配置文件路径
        #[arg(default_value = "video-analyze.ini")]
        path: PathBuf,
    },
}

/// 场景检测参数
#[derive(Args, Debug, Clone, Default)]
struct SceneArgs {
    /// 场景切换阈值，值越小越敏感（默认 27.0）
    /// 可通过环境变量 VIDEO_ANALYZE_THRESHOLD 或配置文件设置
    #[arg(long)]
    threshold: Option<f64>,

    /// 最小场景长度（帧，默认 15）
    /// 可通过环境变量 VIDEO_ANALYZE_MIN_SCENE_LEN 或配置文件设置
    #[arg(long)]
    min_scene_len: Option<u64>,

    /// 没有检测到切换时把整段视频当作一个场景
    #[arg(long)]
    start_in_scene: bool,
}

/// 目标检测参数
#[derive(Args, Debug, Clone, Default)]
struct ModelArgs {
    /// 置信度阈值 [0, 1]（默认 0.5）
    /// 可通过环境变量 VIDEO_ANALYZE_CONFIDENCE 或配置文件设置
    #[arg(long)]
    confidence: Option<f32>,

    /// YOLOv8 模型规格：n, s, m, l, x
    #[arg(long)]
    model_size: Option<ModelSize>,

    /// 模型文件目录
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

impl SceneArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            threshold: self.threshold,
            min_scene_len: self.min_scene_len,
            start_in_scene: self.start_in_scene.then_some(true),
            ..Default::default()
        }
    }
}

impl ModelArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            confidence_threshold: self.confidence,
            model_size: self.model_size,
            model_dir: self.model_dir.clone(),
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let not_found = e.chain().any(|cause| {
                cause
                    .downcast_ref::<AnalyzeError>()
                    .is_some_and(AnalyzeError::is_not_found)
            });
            if not_found {
                eprintln!("\n❌ {e:#}");
                eprintln!("   请先添加视频文件，例如 data/videos/sample_video.mp4");
            } else {
                eprintln!("\n❌ 错误: {e}");
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            scene,
            model,
            config,
        } => {
            let cli_overrides = ConfigOverrides {
                output_path: output,
                ..scene.overrides().or(model.overrides())
            };
            let config = load_config(config.as_deref(), cli_overrides)?;
            run_analyze(&input, &config)
        }
        Commands::Info { input } => {
            load_config(None, ConfigOverrides::default())?;
            let processor = VideoProcessor::open(&input).context("打开视频失败")?;
            let meta = processor.metadata();
            println!("📹 视频信息: {}", input.display());
            println!("  • 分辨率: {}x{}", meta.width, meta.height);
            println!("  • 帧率: {:.2} fps", meta.fps);
            println!("  • 总帧数: {}", meta.frame_count);
            println!("  • 时长: {:.2} 秒", meta.duration);
            Ok(())
        }
        Commands::Scenes { input, scene, config } => {
            let config = load_config(config.as_deref(), scene.overrides())?;
            run_scenes(&input, &config)
        }
        Commands::Sample {
            input,
            stride,
            max_frames,
            output,
        } => {
            load_config(None, ConfigOverrides::default())?;
            run_sample(&input, stride, max_frames, &output)
        }
        Commands::Detect {
            input,
            stride,
            max_frames,
            model,
            config,
        } => {
            let config = load_config(config.as_deref(), model.overrides())?;
            run_detect(&input, stride, max_frames, &config)
        }
        Commands::InitConfig { path } => {
            ConfigLoader::create_default_config(&path)
                .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
            println!("✅ 已生成默认配置文件: {}", path.display());
            Ok(())
        }
    }
}

/// 加载配置并按配置的日志级别初始化日志
fn load_config(config_file: Option<&Path>, cli: ConfigOverrides) -> Result<AnalyzeConfig> {
    let config = ConfigLoader::load_config(config_file, cli).context("加载配置失败")?;
    init_logging(&config.log_level).context("初始化日志失败")?;
    Ok(config)
}

fn run_analyze(input: &Path, config: &AnalyzeConfig) -> Result<()> {
    println!("\n🎬 开始视频分析...\n");
    println!(
        "使用配置: threshold={:.1}, min_scene_len={}, confidence={:.2}, model=yolov8{}",
        config.threshold, config.min_scene_len, config.confidence_threshold, config.model_size
    );

    let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter);
    let analyzer = VideoAnalyzer::from_config(config, reporter).context("初始化分析器失败")?;
    let report = analyzer.analyze(input).context("视频分析失败")?;

    println!("{}", Summary(&report));

    write_json(&report, &config.output_path)
        .with_context(|| format!("保存报告失败: {}", config.output_path.display()))?;
    println!("\n💾 详细结果已保存: {}", config.output_path.display());
    println!("\n✅ 分析完成!");
    Ok(())
}

fn run_scenes(input: &Path, config: &AnalyzeConfig) -> Result<()> {
    let detector = SceneDetector::new(config.threshold)
        .with_min_scene_len(config.min_scene_len)
        .with_start_in_scene(config.start_in_scene);
    let segmentation = detector.segment(input).context("场景检测失败")?;
    let stats = &segmentation.statistics;

    println!("\n{}", "=".repeat(60));
    println!("场景检测结果");
    println!("{}", "=".repeat(60));
    println!("\n场景总数: {}", stats.total_scenes);
    println!("平均场景长度: {:.2}s", stats.average_length);
    println!("最短场景: {:.2}s", stats.shortest_length);
    println!("最长场景: {:.2}s", stats.longest_length);

    for (interval, keyframe) in segmentation.intervals.iter().zip(segmentation.keyframes()) {
        println!(
            "  • 场景 {}: {:.2}s - {:.2}s，关键帧 {:.2}s",
            keyframe.scene_id, interval.start, interval.end, keyframe.timestamp
        );
    }
    Ok(())
}

fn run_sample(input: &Path, stride: u64, max_frames: Option<usize>, output: &Path) -> Result<()> {
    let mut processor = VideoProcessor::open(input).context("打开视频失败")?;
    let frames = processor.sample_frames(stride, max_frames).context("采样视频帧失败")?;
    processor.close();

    std::fs::create_dir_all(output)
        .with_context(|| format!("创建输出目录失败: {}", output.display()))?;
    for (i, frame) in frames.iter().enumerate() {
        let path = output.join(format!("frame_{:04}.png", i));
        frame
            .save(&path)
            .with_context(|| format!("保存帧失败: {}", path.display()))?;
    }

    println!("✅ 已采样 {} 帧，保存到: {}", frames.len(), output.display());
    Ok(())
}

fn run_detect(input: &Path, stride: u64, max_frames: usize, config: &AnalyzeConfig) -> Result<()> {
    let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter);
    let mut processor =
        VideoProcessor::open_with_reporter(input, reporter.clone()).context("打开视频失败")?;
    let frames = processor
        .sample_frames(stride, Some(max_frames))
        .context("采样视频帧失败")?;
    processor.close();

    let model_path = config.model_dir.join(config.model_size.file_name());
    let detector = ObjectDetector::from_path(model_path, reporter).context("加载检测模型失败")?;
    let results = detector
        .detect_batch(&frames, config.confidence_threshold)
        .context("目标检测失败")?;

    let output: Vec<serde_json::Value> = results
        .iter()
        .enumerate()
        .map(|(i, detections)| {
            serde_json::json!({
                "frame": i as u64 * stride,
                "detections": detections,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
