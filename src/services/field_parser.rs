//! 字段解析服务 - 业务能力层
//!
//! 只负责"从识别文本中提取结构化字段"，尽力而为：
//! 任何字段或作答缺失都是正常结果，不是错误。

use regex::Regex;
use tracing::debug;

use crate::error::AppResult;
use crate::models::{ExtractedAnswer, ExtractedData, ExtractedInfo, OcrResult};

/// 结构化字段提取能力
///
/// 输入原始文本，输出可选的结构化字段。更强的提取方法可以直接替换实现，
/// 不影响评分和编排。
pub trait FieldExtractor: Send + Sync {
    /// `confidence` 为识别引擎给出的整体置信度（0-100），原样带入结果
    fn parse_fields(&self, raw_text: &str, confidence: f64) -> ExtractedData;

    fn parse_ocr(&self, ocr: &OcrResult) -> ExtractedData {
        self.parse_fields(&ocr.text, ocr.confidence)
    }
}

/// 基于正则表达式的字段解析器
pub struct RegexFieldParser {
    student_name: Regex,
    student_id: Regex,
    unit_code: Regex,
    unit_name: Regex,
    question_marker: Regex,
}

impl RegexFieldParser {
    /// 编译全部规则
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            student_name: Regex::new(
                r"(?i)(?:student\s*name|name|candidate)\s*[:\-]?\s*([A-Za-z \t]+)",
            )?,
            student_id: Regex::new(
                r"(?i)(?:student\s*id|id\s*number|registration\s*number|adm\s*no)\s*[:\-]?\s*([A-Z0-9/]+)",
            )?,
            unit_code: Regex::new(
                r"(?i)(?:unit\s*code|course\s*code|code)\s*[:\-]?\s*([A-Z]{2,4}\s*\d{3,4}[A-Z]?)",
            )?,
            unit_name: Regex::new(
                r"(?i)(?:unit\s*name|course\s*name|subject)\s*[:\-]?\s*([A-Za-z \t&]+?)(?:\n|$)",
            )?,
            question_marker: Regex::new(r"(?i)\b(?:question|q\.?)\s*(\d+)\s*[:\-.]?")?,
        })
    }

    fn capture_field(pattern: &Regex, text: &str) -> Option<String> {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// 按题号标记切分作答：每个标记之后到下一个标记（或文本末尾）为该题作答
    fn extract_answers(&self, text: &str) -> Vec<ExtractedAnswer> {
        let markers: Vec<(Option<u32>, usize, usize)> = self
            .question_marker
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                Some((number, whole.start(), whole.end()))
            })
            .collect();

        let mut answers = Vec::new();
        for (i, (number, _, answer_start)) in markers.iter().enumerate() {
            let answer_end = markers
                .get(i + 1)
                .map(|(_, next_start, _)| *next_start)
                .unwrap_or(text.len());
            let answer = text[*answer_start..answer_end].trim();

            match number {
                Some(n) if *n > 0 && !answer.is_empty() => {
                    answers.push(ExtractedAnswer::new(*n, answer));
                }
                _ => debug!("跳过无效作答片段: 题号 {:?}", number),
            }
        }
        answers
    }
}

impl FieldExtractor for RegexFieldParser {
    fn parse_fields(&self, raw_text: &str, confidence: f64) -> ExtractedData {
        let answers = self.extract_answers(raw_text);
        debug!("解析到 {} 道题的作答", answers.len());

        ExtractedData {
            raw_text: raw_text.to_string(),
            confidence,
            extracted_info: ExtractedInfo {
                student_name: Self::capture_field(&self.student_name, raw_text),
                student_id: Self::capture_field(&self.student_id, raw_text),
                unit_code: Self::capture_field(&self.unit_code, raw_text),
                unit_name: Self::capture_field(&self.unit_name, raw_text),
                answers: (!answers.is_empty()).then_some(answers),
            },
        }
    }
}
