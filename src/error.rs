use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文字识别相关错误
    #[error("识别错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 评分方案错误
    #[error("评分方案错误: {0}")]
    Scheme(#[from] SchemeError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 正则表达式编译失败
    #[error("正则表达式无效: {0}")]
    Pattern(#[from] regex::Error),
}

/// 文字识别错误
///
/// 只有 `UnsupportedFormat` 会被直接抛给调用方，
/// `Failed` 在评分流程中会被转换为降级结果。
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 不支持的文件格式（例如 PDF）
    #[error("不支持的文件格式 `{extension}` ({path})，仅支持 PNG/JPG/BMP/TIFF/WEBP 图片")]
    UnsupportedFormat { path: String, extension: String },
    /// 识别失败
    #[error("文字识别失败 ({path}): {failure}")]
    Failed {
        path: String,
        #[source]
        failure: ExtractionFailure,
    },
}

impl ExtractionError {
    pub fn failed(path: impl Into<String>, failure: ExtractionFailure) -> Self {
        ExtractionError::Failed {
            path: path.into(),
            failure,
        }
    }

    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, ExtractionError::UnsupportedFormat { .. })
    }
}

/// 识别失败的具体原因
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("文件不存在")]
    NotFound,
    #[error("无法读取文件: {0}")]
    Unreadable(#[source] std::io::Error),
    #[error("图片解码失败: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("无法启动 tesseract（是否已安装？）: {0}")]
    EngineUnavailable(#[source] std::io::Error),
    #[error("tesseract 执行失败 (退出码: {status:?}): {stderr}")]
    EngineError { status: Option<i32>, stderr: String },
    #[error("识别超时 ({secs} 秒)")]
    Timeout { secs: u64 },
}

/// 评分方案错误
#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("读取评分方案失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("JSON 解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("无法识别的评分方案文件类型: {path}")]
    UnknownFormat { path: String },
    #[error("评分方案 `{scheme}` 没有任何题目")]
    NoQuestions { scheme: String },
    #[error("题号必须为正整数 (第 {position} 条记录)")]
    InvalidQuestionNumber { position: usize },
    #[error("题目 {question_number} 的分值必须大于 0")]
    ZeroMarks { question_number: u32 },
    #[error("题目 {question_number} 缺少标准答案")]
    EmptyExpectedAnswer { question_number: u32 },
    #[error("题号 {question_number} 重复")]
    DuplicateQuestionNumber { question_number: u32 },
    #[error("评分方案 `{scheme}` 总分超出上限 {max}", max = u32::MAX)]
    TotalMarksOverflow { scheme: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    #[error("读取评分配置失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("评分配置解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("评分配置无效: {0}")]
    Invalid(String),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
