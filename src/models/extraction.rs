use serde::{Deserialize, Serialize};

/// 单词包围盒（像素坐标，左上角 x0/y0，右下角 x1/y1）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    /// 0-100
    pub confidence: f64,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    /// 0-100
    pub confidence: f64,
}

/// 文字识别结果
///
/// 置信度保持识别引擎原生的 0-100 刻度。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,
    pub words: Vec<OcrWord>,
    pub lines: Vec<OcrLine>,
}

/// 从文本中解析出的一道题的作答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedAnswer {
    pub question_number: u32,
    pub answer: String,
}

impl ExtractedAnswer {
    pub fn new(question_number: u32, answer: impl Into<String>) -> Self {
        Self {
            question_number,
            answer: answer.into(),
        }
    }
}

/// 结构化字段，缺失的字段为 `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<ExtractedAnswer>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub raw_text: String,
    /// 识别引擎原生刻度 0-100
    pub confidence: f64,
    pub extracted_info: ExtractedInfo,
}

impl ExtractedData {
    /// 查找指定题号的作答；同一题号出现多次时取第一次
    pub fn answer_for(&self, question_number: u32) -> Option<&str> {
        self.extracted_info
            .answers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|a| a.question_number == question_number)
            .map(|a| a.answer.as_str())
    }

    /// 仅包含作答的数据，用于调用方已有答案的场景
    pub fn from_answers(answers: Vec<ExtractedAnswer>) -> Self {
        Self {
            raw_text: String::new(),
            confidence: 100.0,
            extracted_info: ExtractedInfo {
                answers: (!answers.is_empty()).then_some(answers),
                ..Default::default()
            },
        }
    }
}
