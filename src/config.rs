use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{AnalyzeError, Result};
use crate::object_detector::{ModelSize, DEFAULT_CONFIDENCE};
use crate::scene_detector::{DEFAULT_MIN_SCENE_LEN, DEFAULT_THRESHOLD};

const SECTION_ANALYZE: &str = "video_analyze";
const SECTION_MODEL: &str = "model";
const SECTION_LOGGING: &str = "logging";

/// 视频分析配置
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeConfig {
    /// 场景切换阈值
    pub threshold: f64,
    /// 最小场景长度（帧）
    pub min_scene_len: u64,
    /// 没有切换点时是否把整段视频当作一个场景
    pub start_in_scene: bool,
    /// 目标检测置信度阈值
    pub confidence_threshold: f32,
    pub model_size: ModelSize,
    /// 模型文件目录
    pub model_dir: PathBuf,
    /// JSON 报告输出路径
    pub output_path: PathBuf,
    /// 日志级别（trace, debug, info, warn, error）
    pub log_level: String,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            start_in_scene: false,
            confidence_threshold: DEFAULT_CONFIDENCE,
            model_size: ModelSize::default(),
            model_dir: PathBuf::from("models"),
            output_path: PathBuf::from("output/analysis.json"),
            log_level: "info".to_string(),
        }
    }
}

impl AnalyzeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0) {
            return Err(AnalyzeError::config(format!("threshold 必须大于 0，当前为 {}", self.threshold)));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AnalyzeError::config(format!(
                "confidence_threshold 必须在 [0, 1] 范围内，当前为 {}",
                self.confidence_threshold
            )));
        }
        if self.min_scene_len < 1 {
            return Err(AnalyzeError::config("min_scene_len 至少为 1"));
        }
        Ok(())
    }
}

/// 单个配置来源给出的部分配置，未设置的字段为 None
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub threshold: Option<f64>,
    pub min_scene_len: Option<u64>,
    pub start_in_scene: Option<bool>,
    pub confidence_threshold: Option<f32>,
    pub model_size: Option<ModelSize>,
    pub model_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// 以 self 为高优先级合并另一个来源
    pub fn or(self, lower: ConfigOverrides) -> Self {
        Self {
            threshold: self.threshold.or(lower.threshold),
            min_scene_len: self.min_scene_len.or(lower.min_scene_len),
            start_in_scene: self.start_in_scene.or(lower.start_in_scene),
            confidence_threshold: self.confidence_threshold.or(lower.confidence_threshold),
            model_size: self.model_size.or(lower.model_size),
            model_dir: self.model_dir.or(lower.model_dir),
            output_path: self.output_path.or(lower.output_path),
            log_level: self.log_level.or(lower.log_level),
        }
    }

    /// 未设置的字段使用默认值
    pub fn resolve(self) -> AnalyzeConfig {
        let defaults = AnalyzeConfig::default();
        AnalyzeConfig {
            threshold: self.threshold.unwrap_or(defaults.threshold),
            min_scene_len: self.min_scene_len.unwrap_or(defaults.min_scene_len),
            start_in_scene: self.start_in_scene.unwrap_or(defaults.start_in_scene),
            confidence_threshold: self
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
            model_size: self.model_size.unwrap_or(defaults.model_size),
            model_dir: self.model_dir.unwrap_or(defaults.model_dir),
            output_path: self.output_path.unwrap_or(defaults.output_path),
            log_level: self.log_level.unwrap_or(defaults.log_level),
        }
    }
}

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从多个源加载配置，优先级：命令行参数 > 环境变量 > 配置文件 > 默认值
    pub fn load_config(config_file: Option<&Path>, cli: ConfigOverrides) -> Result<AnalyzeConfig> {
        Self::load_config_with_env(config_file, cli, |key| env::var(key).ok())
    }

    /// 同 [`ConfigLoader::load_config`]，环境变量通过 `lookup` 读取
    pub fn load_config_with_env<E>(
        config_file: Option<&Path>,
        cli: ConfigOverrides,
        lookup: E,
    ) -> Result<AnalyzeConfig>
    where
        E: Fn(&str) -> Option<String>,
    {
        // 1. 配置文件：显式指定的必须存在，否则按默认位置查找
        let file_config = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::find_default_config(lookup("HOME").map(PathBuf::from)) {
                Some(path) => Self::load_from_file(&path)?,
                None => ConfigOverrides::default(),
            },
        };

        // 2. 环境变量
        let env_config = Self::load_from_env(&lookup)?;

        // 3. 合并并校验
        let config = cli.or(env_config).or(file_config).resolve();
        config.validate()?;
        debug!("⚙️  [配置] {:?}", config);
        Ok(config)
    }

    fn load_from_env<E>(lookup: &E) -> Result<ConfigOverrides>
    where
        E: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(ConfigOverrides {
            threshold: parse_opt("VIDEO_ANALYZE_THRESHOLD", get("VIDEO_ANALYZE_THRESHOLD"))?,
            min_scene_len: parse_opt(
                "VIDEO_ANALYZE_MIN_SCENE_LEN",
                get("VIDEO_ANALYZE_MIN_SCENE_LEN"),
            )?,
            start_in_scene: get("VIDEO_ANALYZE_START_IN_SCENE").map(|v| parse_bool(&v)),
            confidence_threshold: parse_opt(
                "VIDEO_ANALYZE_CONFIDENCE",
                get("VIDEO_ANALYZE_CONFIDENCE"),
            )?,
            model_size: parse_opt("VIDEO_ANALYZE_MODEL_SIZE", get("VIDEO_ANALYZE_MODEL_SIZE"))?,
            model_dir: get("VIDEO_ANALYZE_MODEL_DIR").map(PathBuf::from),
            output_path: get("VIDEO_ANALYZE_OUTPUT_PATH").map(PathBuf::from),
            log_level: get("LOG_LEVEL"),
        })
    }

    /// 从INI配置文件加载配置
    pub fn load_from_file(config_path: &Path) -> Result<ConfigOverrides> {
        if !config_path.exists() {
            return Err(AnalyzeError::config(format!("配置文件不存在: {}", config_path.display())));
        }

        let mut ini = configparser::ini::Ini::new();
        ini.load(config_path).map_err(|e| {
            AnalyzeError::config(format!("读取配置文件失败: {}: {}", config_path.display(), e))
        })?;

        // 先读指定节，没有则回退到 [DEFAULT] 节
        let get = |section: &str, key: &str| {
            ini.get(section, key)
                .or_else(|| ini.get("DEFAULT", key))
                .filter(|v| !v.trim().is_empty())
        };

        debug!("⚙️  [配置] 已读取配置文件: {}", config_path.display());
        Ok(ConfigOverrides {
            threshold: parse_opt("threshold", get(SECTION_ANALYZE, "threshold"))?,
            min_scene_len: parse_opt("min_scene_len", get(SECTION_ANALYZE, "min_scene_len"))?,
            start_in_scene: get(SECTION_ANALYZE, "start_in_scene").map(|v| parse_bool(&v)),
            output_path: get(SECTION_ANALYZE, "output_path").map(PathBuf::from),
            confidence_threshold: parse_opt(
                "confidence_threshold",
                get(SECTION_MODEL, "confidence_threshold"),
            )?,
            model_size: parse_opt("size", get(SECTION_MODEL, "size"))?,
            model_dir: get(SECTION_MODEL, "dir").map(PathBuf::from),
            log_level: get(SECTION_LOGGING, "level"),
        })
    }

    /// 默认配置文件位置，按查找顺序排列
    pub fn default_locations(home: Option<PathBuf>) -> Vec<PathBuf> {
        let mut locations = vec![
            PathBuf::from("video-analyze.ini"),
            PathBuf::from(".video-analyze.ini"),
        ];
        if let Some(home) = home {
            locations.push(home.join(".video-analyze.ini"));
        }
        locations.push(PathBuf::from("/etc/video-analyze.ini"));
        locations
    }

    fn find_default_config(home: Option<PathBuf>) -> Option<PathBuf> {
        Self::default_locations(home).into_iter().find(|p| p.exists())
    }

    /// 创建默认配置文件
    pub fn create_default_config(config_path: &Path) -> Result<()> {
        let defaults = AnalyzeConfig::default();
        let mut ini = configparser::ini::Ini::new();
        ini.set(SECTION_ANALYZE, "threshold", Some(format!("{:.1}", defaults.threshold)));
        ini.set(SECTION_ANALYZE, "min_scene_len", Some(defaults.min_scene_len.to_string()));
        ini.set(SECTION_ANALYZE, "start_in_scene", Some(defaults.start_in_scene.to_string()));
        ini.set(SECTION_ANALYZE, "output_path", Some(defaults.output_path.display().to_string()));
        ini.set(SECTION_MODEL, "size", Some(defaults.model_size.to_string()));
        ini.set(SECTION_MODEL, "dir", Some(defaults.model_dir.display().to_string()));
        ini.set(
            SECTION_MODEL,
            "confidence_threshold",
            Some(defaults.confidence_threshold.to_string()),
        );
        ini.set(SECTION_LOGGING, "level", Some(defaults.log_level));

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        ini.write(config_path)?;
        Ok(())
    }
}

fn parse_opt<T>(key: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.trim()
            .parse::<T>()
            .map_err(|e| AnalyzeError::config(format!("{key} 的值无效 \"{v}\": {e}")))
    })
    .transpose()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_ini(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("analyze.ini");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = AnalyzeConfig::default();
        assert_eq!(config.threshold, 27.0);
        assert_eq!(config.min_scene_len, 15);
        assert!(!config.start_in_scene);
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.model_size, ModelSize::Nano);
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = AnalyzeConfig::default();
        config.threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalyzeConfig::default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AnalyzeConfig::default();
        config.min_scene_len = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ini(
            dir.path(),
            "[video_analyze]\nthreshold = 30.5\nmin_scene_len = 10\nstart_in_scene = true\n\n\
             [model]\nsize = s\nconfidence_threshold = 0.4\n\n\
             [logging]\nlevel = debug\n",
        );

        let config =
            ConfigLoader::load_config_with_env(Some(&path), ConfigOverrides::default(), env_of(&[]))
                .unwrap();

        assert_eq!(config.threshold, 30.5);
        assert_eq!(config.min_scene_len, 10);
        assert!(config.start_in_scene);
        assert_eq!(config.model_size, ModelSize::Small);
        assert_eq!(config.confidence_threshold, 0.4);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_priority_cli_over_env_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ini(
            dir.path(),
            "[video_analyze]\nthreshold = 30\nmin_scene_len = 10\n\n[model]\ndir = /opt/models\n",
        );
        let env = env_of(&[
            ("VIDEO_ANALYZE_THRESHOLD", "20"),
            ("VIDEO_ANALYZE_MIN_SCENE_LEN", "5"),
        ]);
        let cli = ConfigOverrides {
            threshold: Some(12.0),
            ..Default::default()
        };

        let config = ConfigLoader::load_config_with_env(Some(&path), cli, env).unwrap();

        assert_eq!(config.threshold, 12.0);
        assert_eq!(config.min_scene_len, 5);
        assert_eq!(config.model_dir, PathBuf::from("/opt/models"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = ConfigLoader::load_config_with_env(
            Some(Path::new("no/such/config.ini")),
            ConfigOverrides::default(),
            env_of(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyzeError::Config(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let env = env_of(&[("VIDEO_ANALYZE_CONFIDENCE", "high")]);
        assert!(ConfigLoader::load_config_with_env(None, ConfigOverrides::default(), env).is_err());

        let env = env_of(&[("VIDEO_ANALYZE_CONFIDENCE", "2.0")]);
        assert!(ConfigLoader::load_config_with_env(None, ConfigOverrides::default(), env).is_err());
    }

    #[test]
    fn test_default_locations_order() {
        let locations = ConfigLoader::default_locations(Some(PathBuf::from("/home/user")));
        assert_eq!(
            locations,
            vec![
                PathBuf::from("video-analyze.ini"),
                PathBuf::from(".video-analyze.ini"),
                PathBuf::from("/home/user/.video-analyze.ini"),
                PathBuf::from("/etc/video-analyze.ini"),
            ]
        );
        assert_eq!(ConfigLoader::default_locations(None).len(), 3);
    }

    #[test]
    fn test_create_default_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/video-analyze.ini");

        ConfigLoader::create_default_config(&path).unwrap();
        let config =
            ConfigLoader::load_config_with_env(Some(&path), ConfigOverrides::default(), env_of(&[]))
                .unwrap();

        assert_eq!(config, AnalyzeConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }
}
