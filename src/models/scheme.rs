use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SchemeError;

/// 评分方案中的一道题
///
/// 只能通过 [`MarkingScheme::new`] 校验后进入评分流程。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkingSchemeQuestion {
    pub question_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub expected_answer: String,
    /// 本题满分
    pub marks: u32,
    pub keywords: Vec<String>,
    pub alternative_answers: Vec<String>,
}

impl MarkingSchemeQuestion {
    /// 只包含标准答案的题目
    pub fn new(question_number: u32, expected_answer: impl Into<String>, marks: u32) -> Self {
        Self {
            question_number,
            question: None,
            expected_answer: expected_answer.into(),
            marks,
            keywords: Vec::new(),
            alternative_answers: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternative_answers = alternatives.into_iter().map(Into::into).collect();
        self
    }
}

/// 评分方案
///
/// 题目按题号升序排列，题号唯一，分值为正。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkingScheme {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    questions: Vec<MarkingSchemeQuestion>,
}

impl MarkingScheme {
    /// 校验并构建评分方案
    pub fn new(
        name: impl Into<String>,
        questions: Vec<MarkingSchemeQuestion>,
    ) -> Result<Self, SchemeError> {
        let name = name.into();
        if questions.is_empty() {
            return Err(SchemeError::NoQuestions { scheme: name });
        }

        let mut seen = HashSet::new();
        let mut total: u32 = 0;
        let mut cleaned = Vec::with_capacity(questions.len());
        for (position, mut question) in questions.into_iter().enumerate() {
            if question.question_number == 0 {
                return Err(SchemeError::InvalidQuestionNumber {
                    position: position + 1,
                });
            }
            if !seen.insert(question.question_number) {
                return Err(SchemeError::DuplicateQuestionNumber {
                    question_number: question.question_number,
                });
            }
            if question.marks == 0 {
                return Err(SchemeError::ZeroMarks {
                    question_number: question.question_number,
                });
            }
            if question.expected_answer.trim().is_empty() {
                return Err(SchemeError::EmptyExpectedAnswer {
                    question_number: question.question_number,
                });
            }
            total = total
                .checked_add(question.marks)
                .ok_or_else(|| SchemeError::TotalMarksOverflow { scheme: name.clone() })?;
            // 空关键词会匹配任何答案
            question.keywords.retain(|k| !k.trim().is_empty());
            question.alternative_answers.retain(|a| !a.trim().is_empty());
            cleaned.push(question);
        }
        cleaned.sort_by_key(|q| q.question_number);

        Ok(Self {
            id: None,
            name,
            questions: cleaned,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn questions(&self) -> &[MarkingSchemeQuestion] {
        &self.questions
    }

    /// 各题满分之和（构建时已确认不会溢出）
    pub fn max_marks(&self) -> u32 {
        self.questions.iter().map(|q| q.marks).sum()
    }
}

/// 评分方案文件的原始结构（TOML / JSON 共用）
#[derive(Debug, Clone, Deserialize)]
pub struct RawScheme {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "totalMarks")]
    pub total_marks: Option<u32>,
    #[serde(default)]
    pub questions: Vec<RawSchemeQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSchemeQuestion {
    #[serde(alias = "questionNumber")]
    pub question_number: i64,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(alias = "expectedAnswer")]
    pub expected_answer: String,
    pub marks: i64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, alias = "alternativeAnswers")]
    pub alternative_answers: Vec<String>,
}

impl RawScheme {
    /// 转换为校验后的评分方案
    pub fn into_scheme(self) -> Result<MarkingScheme, SchemeError> {
        let mut questions = Vec::with_capacity(self.questions.len());
        for (position, raw) in self.questions.into_iter().enumerate() {
            let question_number = u32::try_from(raw.question_number)
                .ok()
                .filter(|n| *n > 0)
                .ok_or(SchemeError::InvalidQuestionNumber {
                    position: position + 1,
                })?;
            let marks = u32::try_from(raw.marks)
                .ok()
                .filter(|m| *m > 0)
                .ok_or(SchemeError::ZeroMarks { question_number })?;
            questions.push(MarkingSchemeQuestion {
                question_number,
                question: raw.question.filter(|q| !q.trim().is_empty()),
                expected_answer: raw.expected_answer,
                marks,
                keywords: raw.keywords,
                alternative_answers: raw.alternative_answers,
            });
        }

        let mut scheme = MarkingScheme::new(self.name, questions)?;
        scheme.id = self.id;

        if let Some(declared) = self.total_marks {
            let actual = scheme.max_marks();
            if declared != actual {
                warn!(
                    "⚠️ 评分方案 `{}` 声明总分 {} 与各题分值之和 {} 不一致，以各题之和为准",
                    scheme.name, declared, actual
                );
            }
        }

        Ok(scheme)
    }
}

// 方案 ID 在 JSON 里常是数字，在 TOML 里常是字符串
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer scheme id")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_sorted_by_number() {
        let scheme = MarkingScheme::new(
            "期中测验",
            vec![
                MarkingSchemeQuestion::new(2, "blue", 5),
                MarkingSchemeQuestion::new(1, "42", 10),
            ],
        )
        .unwrap();
        let numbers: Vec<u32> = scheme.questions().iter().map(|q| q.question_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(scheme.max_marks(), 15);
    }

    #[test]
    fn test_rejects_total_marks_overflow() {
        let raw: RawScheme = toml::from_str(
            r#"
            name = "超大分值"

            [[questions]]
            question_number = 1
            expected_answer = "a"
            marks = 3000000000

            [[questions]]
            question_number = 2
            expected_answer = "b"
            marks = 3000000000
            "#,
        )
        .unwrap();
        assert!(matches!(
            raw.into_scheme(),
            Err(SchemeError::TotalMarksOverflow { .. })
        ));

        let largest = MarkingScheme::new(
            "上限",
            vec![
                MarkingSchemeQuestion::new(1, "a", u32::MAX - 1),
                MarkingSchemeQuestion::new(2, "b", 1),
            ],
        )
        .unwrap();
        assert_eq!(largest.max_marks(), u32::MAX);
    }

    #[test]
    fn test_rejects_duplicate_numbers() {
        let err = MarkingScheme::new(
            "重复题号",
            vec![
                MarkingSchemeQuestion::new(1, "a", 1),
                MarkingSchemeQuestion::new(1, "b", 1),
            ],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemeError::DuplicateQuestionNumber { question_number: 1 }
        ));
    }

    #[test]
    fn test_rejects_empty_scheme_and_bad_questions() {
        assert!(matches!(
            MarkingScheme::new("空方案", Vec::new()),
            Err(SchemeError::NoQuestions { .. })
        ));
        assert!(matches!(
            MarkingScheme::new("零分", vec![MarkingSchemeQuestion::new(1, "a", 0)]),
            Err(SchemeError::ZeroMarks { question_number: 1 })
        ));
        assert!(matches!(
            MarkingScheme::new("无答案", vec![MarkingSchemeQuestion::new(3, "  ", 2)]),
            Err(SchemeError::EmptyExpectedAnswer { question_number: 3 })
        ));
    }

    #[test]
    fn test_blank_keywords_are_dropped() {
        let scheme = MarkingScheme::new(
            "关键词",
            vec![MarkingSchemeQuestion::new(1, "blue", 4).with_keywords(["sky", " ", ""])],
        )
        .unwrap();
        assert_eq!(scheme.questions()[0].keywords, vec!["sky".to_string()]);
    }

    #[test]
    fn test_raw_scheme_rejects_negative_marks() {
        let raw: RawScheme = serde_json::from_str(
            r#"{"id": 7, "name": "x", "questions": [{"questionNumber": 1, "expectedAnswer": "a", "marks": -2}]}"#,
        )
        .unwrap();
        assert_eq!(raw.id.as_deref(), Some("7"));
        assert!(matches!(
            raw.into_scheme(),
            Err(SchemeError::ZeroMarks { question_number: 1 })
        ));
    }
}
