use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时评分的提交数量
    pub max_concurrent_submissions: usize,
    /// 待评分的提交文件目录
    pub submissions_folder: String,
    /// 评分方案文件（.toml 或 .json）
    pub scheme_file: String,
    /// 评分结果输出目录
    pub output_folder: String,
    /// 需要人工复核的提交清单
    pub review_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    // --- OCR 配置 ---
    pub ocr_languages: String,
    pub ocr_psm: u32,
    /// 单个提交的识别时限，超时按识别失败处理
    pub ocr_timeout_secs: u64,
    /// 评分阈值配置文件（可选）
    pub scoring_config_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_submissions: 4,
            submissions_folder: "submissions".to_string(),
            scheme_file: "scheme.toml".to_string(),
            output_folder: "results".to_string(),
            review_file: "review.txt".to_string(),
            output_log_file: "marking_log.txt".to_string(),
            ocr_languages: "eng".to_string(),
            ocr_psm: 3,
            ocr_timeout_secs: 120,
            scoring_config_file: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            max_concurrent_submissions: env_parse(
                "MAX_CONCURRENT_SUBMISSIONS",
                default.max_concurrent_submissions,
                "usize",
            )?
            .max(1),
            submissions_folder: std::env::var("SUBMISSIONS_FOLDER")
                .unwrap_or(default.submissions_folder),
            scheme_file: std::env::var("SCHEME_FILE").unwrap_or(default.scheme_file),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            review_file: std::env::var("REVIEW_FILE").unwrap_or(default.review_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            ocr_languages: std::env::var("OCR_LANGUAGES").unwrap_or(default.ocr_languages),
            ocr_psm: env_parse("OCR_PSM", default.ocr_psm, "u32")?,
            ocr_timeout_secs: env_parse("OCR_TIMEOUT_SECS", default.ocr_timeout_secs, "u64")?,
            scoring_config_file: std::env::var("SCORING_CONFIG").ok(),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging, "bool")?,
        })
    }
}

fn env_parse<T: FromStr>(var_name: &str, default: T, expected_type: &str) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => parse_value(var_name, &value, expected_type),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var_name: &str, value: &str, expected_type: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        })
}

/// 评分阈值配置
///
/// 分档的得分比例（100%/80%/50%/25%/0%）和各档置信度是固定的，
/// 这里只开放相似度与关键词覆盖率的分档线、及格线和复核阈值。
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// 相似度达到此值直接给满分
    pub full_similarity: f64,
    pub high_similarity: f64,
    pub high_keyword: f64,
    pub mid_similarity: f64,
    pub mid_keyword: f64,
    pub low_similarity: f64,
    pub low_keyword: f64,
    /// 及格线（百分比）
    pub pass_percentage: u32,
    /// 整体置信度低于此值需要人工复核
    pub review_overall_confidence: f64,
    /// 任一题置信度低于此值需要人工复核
    pub review_question_confidence: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            full_similarity: 0.90,
            high_similarity: 0.70,
            high_keyword: 0.80,
            mid_similarity: 0.50,
            mid_keyword: 0.50,
            low_similarity: 0.30,
            low_keyword: 0.30,
            pass_percentage: 50,
            review_overall_confidence: 0.70,
            review_question_confidence: 0.50,
        }
    }
}

impl ScoringConfig {
    /// 从 TOML 文件加载评分配置，缺省项使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: ScoringConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验阈值范围与分档顺序
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = [
            ("full_similarity", self.full_similarity),
            ("high_similarity", self.high_similarity),
            ("high_keyword", self.high_keyword),
            ("mid_similarity", self.mid_similarity),
            ("mid_keyword", self.mid_keyword),
            ("low_similarity", self.low_similarity),
            ("low_keyword", self.low_keyword),
            ("review_overall_confidence", self.review_overall_confidence),
            ("review_question_confidence", self.review_question_confidence),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} = {} 不在 [0, 1] 范围内",
                    name, value
                )));
            }
        }

        if !(1..=100).contains(&self.pass_percentage) {
            return Err(ConfigError::Invalid(format!(
                "pass_percentage = {} 不在 1-100 范围内",
                self.pass_percentage
            )));
        }

        let similarity_descending = self.full_similarity >= self.high_similarity
            && self.high_similarity >= self.mid_similarity
            && self.mid_similarity >= self.low_similarity;
        let keyword_descending =
            self.high_keyword >= self.mid_keyword && self.mid_keyword >= self.low_keyword;
        if !similarity_descending || !keyword_descending {
            return Err(ConfigError::Invalid("分档阈值必须从高到低排列".to_string()));
        }

        Ok(())
    }
}
