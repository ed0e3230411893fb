//! 评分流程 - 流程层
//!
//! 核心职责：定义"一份提交"的完整评分流程
//!
//! 流程顺序（线性，不回退）：
//! 1. 识别 → 失败时直接生成降级结果（全部 0 分，提示人工评分）
//! 2. 解析作答
//! 3. 按方案顺序逐题评分（缺失的作答按空字符串处理）
//! 4. 汇总总分、百分比、是否合格
//! 5. 生成总评
//! 6. 判断是否建议人工复核（仅作提示，不阻断、不重试）

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, ScoringConfig};
use crate::error::AppResult;
use crate::infrastructure::{TesseractExtractor, TextExtractor};
use crate::models::{
    ExtractedData, MarkingResult, MarkingScheme, MarkingSuggestion, MatchTier, QuestionEvaluation,
    Submission,
};
use crate::services::feedback_composer::{
    compose_degraded_feedback, compose_feedback, OCR_FAILED_QUESTION_FEEDBACK,
};
use crate::services::{AnswerEvaluator, FieldExtractor, RegexFieldParser};

/// 置信度比较容差，避免均值的浮点误差越过阈值
const CONFIDENCE_TOLERANCE: f64 = 1e-9;

/// 评分流程
///
/// - 编排识别 → 解析 → 评分 → 汇总
/// - 每次调用只处理一份提交，不持有可变状态，可在多个线程中并发使用
/// - 只依赖业务能力（services）和识别能力（infrastructure）
pub struct MarkingFlow {
    extractor: Arc<dyn TextExtractor>,
    parser: Arc<dyn FieldExtractor>,
    evaluator: AnswerEvaluator,
}

impl MarkingFlow {
    /// 创建新的评分流程
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        parser: Arc<dyn FieldExtractor>,
        evaluator: AnswerEvaluator,
    ) -> Self {
        Self {
            extractor,
            parser,
            evaluator,
        }
    }

    /// 使用 tesseract 识别和正则解析的默认组合
    pub fn with_tesseract(config: &Config, scoring: ScoringConfig) -> AppResult<Self> {
        Ok(Self::new(
            Arc::new(TesseractExtractor::from_config(config)),
            Arc::new(RegexFieldParser::new()?),
            AnswerEvaluator::new(scoring),
        ))
    }

    pub fn scoring(&self) -> &ScoringConfig {
        self.evaluator.config()
    }

    /// 对一份提交评分
    ///
    /// 只有文件格式不受支持时返回错误；识别失败返回降级结果。
    pub fn run_marking(
        &self,
        submission: &Submission,
        scheme: &MarkingScheme,
    ) -> AppResult<MarkingResult> {
        Ok(self.run_with_review(submission, scheme)?.result)
    }

    /// 对一份提交评分，并给出是否建议人工复核
    pub fn run_with_review(
        &self,
        submission: &Submission,
        scheme: &MarkingScheme,
    ) -> AppResult<MarkingSuggestion> {
        info!(
            "{} 🔍 开始识别: {}",
            submission,
            submission.file_path.display()
        );

        // ========== 步骤 1: 识别 ==========
        let ocr = match self.extractor.extract(&submission.file_path) {
            Ok(ocr) => ocr,
            Err(e) if e.is_unsupported_format() => {
                warn!("{} ❌ {}", submission, e);
                return Err(e.into());
            }
            Err(e) => {
                warn!("{} ⚠️ 识别失败，生成降级结果: {}", submission, e);
                let result = self.degraded_result(&submission.id, scheme, &e.to_string());
                return Ok(MarkingSuggestion {
                    needs_review: self.needs_review(&result),
                    result,
                    extracted: None,
                });
            }
        };
        info!(
            "{} ✓ 识别完成: {} 行, 置信度 {:.1}",
            submission,
            ocr.lines.len(),
            ocr.confidence
        );

        // ========== 步骤 2: 解析 ==========
        let extracted = self.parser.parse_ocr(&ocr);

        // ========== 步骤 3-5: 评分、汇总、总评 ==========
        let result = self.mark_extracted(&submission.id, &extracted, scheme);

        // ========== 步骤 6: 复核建议 ==========
        let needs_review = self.needs_review(&result);
        info!(
            "{} ✓ 评分完成: {}/{} ({}%), 置信度 {:.2}{}",
            submission,
            result.total_marks(),
            result.max_marks(),
            result.percentage(),
            result.confidence(),
            if needs_review { ", 建议人工复核" } else { "" }
        );

        Ok(MarkingSuggestion {
            result,
            extracted: Some(extracted),
            needs_review,
        })
    }

    /// 用已解析的数据评分（跳过识别）
    pub fn mark_extracted(
        &self,
        submission_id: &str,
        extracted: &ExtractedData,
        scheme: &MarkingScheme,
    ) -> MarkingResult {
        let evaluations: Vec<QuestionEvaluation> = scheme
            .questions()
            .iter()
            .map(|question| {
                let answer = extracted.answer_for(question.question_number).unwrap_or("");
                self.evaluator.evaluate_question(answer, question)
            })
            .collect();

        let mut result = MarkingResult::aggregate(
            submission_id,
            evaluations,
            self.scoring().pass_percentage,
        );
        result.overall_feedback = compose_feedback(
            result.question_results(),
            result.percentage(),
            result.is_competent(),
        );
        result
    }

    /// 识别失败时的结果：每题 0 分、置信度 0，总评提示人工评分
    pub fn degraded_result(
        &self,
        submission_id: &str,
        scheme: &MarkingScheme,
        reason: &str,
    ) -> MarkingResult {
        let evaluations = scheme
            .questions()
            .iter()
            .map(|question| QuestionEvaluation {
                question_number: question.question_number,
                extracted_answer: String::new(),
                expected_answer: question.expected_answer.clone(),
                marks_awarded: 0,
                max_marks: question.marks,
                feedback: OCR_FAILED_QUESTION_FEEDBACK.to_string(),
                confidence: 0.0,
                tier: MatchTier::NotMarked,
            })
            .collect();

        let mut result = MarkingResult::aggregate(
            submission_id,
            evaluations,
            self.scoring().pass_percentage,
        );
        result.withhold_competency();
        result.overall_feedback = compose_degraded_feedback(reason);
        result
    }

    /// 整体置信度低于阈值，或任一题置信度低于阈值时建议复核
    pub fn needs_review(&self, result: &MarkingResult) -> bool {
        self.review_reason(result).is_some()
    }

    /// 建议复核的原因，不需要复核时为 `None`
    pub fn review_reason(&self, result: &MarkingResult) -> Option<String> {
        let scoring = self.scoring();
        if result.confidence() < scoring.review_overall_confidence - CONFIDENCE_TOLERANCE {
            return Some(format!(
                "整体置信度 {:.2} 低于 {:.2}",
                result.confidence(),
                scoring.review_overall_confidence
            ));
        }

        let low: Vec<String> = result
            .question_results()
            .iter()
            .filter(|q| q.confidence < scoring.review_question_confidence - CONFIDENCE_TOLERANCE)
            .map(|q| q.question_number.to_string())
            .collect();
        if low.is_empty() {
            None
        } else {
            Some(format!(
                "题目 {} 置信度低于 {:.2}",
                low.join(", "),
                scoring.review_question_confidence
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ExtractionError, ExtractionFailure};
    use crate::models::{ExtractedAnswer, MarkingSchemeQuestion, OcrResult};
    use std::path::Path;

    /// 返回固定文本的识别器
    struct FixedText(&'static str);

    impl TextExtractor for FixedText {
        fn extract(&self, _image_path: &Path) -> Result<OcrResult, ExtractionError> {
            Ok(OcrResult {
                text: self.0.to_string(),
                confidence: 91.0,
                ..Default::default()
            })
        }
    }

    /// 总是失败的识别器
    struct Broken;

    impl TextExtractor for Broken {
        fn extract(&self, image_path: &Path) -> Result<OcrResult, ExtractionError> {
            crate::infrastructure::tesseract::check_supported_format(image_path)?;
            Err(ExtractionError::failed(
                image_path.display().to_string(),
                ExtractionFailure::EngineError {
                    status: Some(1),
                    stderr: "Error in pixReadStream".to_string(),
                },
            ))
        }
    }

    fn flow(extractor: Arc<dyn TextExtractor>) -> MarkingFlow {
        MarkingFlow::new(
            extractor,
            Arc::new(RegexFieldParser::new().unwrap()),
            AnswerEvaluator::default(),
        )
    }

    fn scheme() -> MarkingScheme {
        MarkingScheme::new(
            "Sample",
            vec![
                MarkingSchemeQuestion::new(1, "42", 10),
                MarkingSchemeQuestion::new(2, "blue", 10).with_keywords(["sky", "color"]),
            ],
        )
        .unwrap()
    }

    fn result_with_confidences(confidences: &[f64]) -> MarkingResult {
        let evaluations = confidences
            .iter()
            .enumerate()
            .map(|(i, c)| QuestionEvaluation {
                question_number: i as u32 + 1,
                extracted_answer: String::new(),
                expected_answer: String::new(),
                marks_awarded: 1,
                max_marks: 1,
                feedback: String::new(),
                confidence: *c,
                tier: MatchTier::Exact,
            })
            .collect();
        MarkingResult::aggregate("s", evaluations, 50)
    }

    #[test]
    fn test_end_to_end_with_fixed_text() {
        let flow = flow(Arc::new(FixedText("Question 1: 42\nQuestion 2: sky is blue")));
        let suggestion = flow
            .run_with_review(&Submission::new("sub-1", "scan.png"), &scheme())
            .unwrap();

        let result = &suggestion.result;
        assert_eq!(result.submission_id(), "sub-1");
        let q = result.question_results();
        assert_eq!(q[0].marks_awarded, 10);
        assert_eq!(q[0].tier, MatchTier::Exact);
        // 相似度约 0.36，关键词命中 1/2 → 50%
        assert_eq!(q[1].marks_awarded, 5);
        assert_eq!(q[1].tier, MatchTier::Partial);
        assert_eq!(result.total_marks(), 15);
        assert_eq!(result.max_marks(), 20);
        assert_eq!(result.percentage(), 75);
        assert!(result.is_competent());
        assert!((result.confidence() - 0.8).abs() < 1e-9);
        assert!(!suggestion.needs_review);
        assert_eq!(suggestion.extracted.as_ref().unwrap().confidence, 91.0);
    }

    #[test]
    fn test_missing_answer_scores_zero() {
        let flow = flow(Arc::new(FixedText("Question 1: 42")));
        let suggestion = flow
            .run_with_review(&Submission::new("sub-2", "scan.png"), &scheme())
            .unwrap();
        let q2 = &suggestion.result.question_results()[1];
        assert_eq!(q2.extracted_answer, "");
        assert_eq!(q2.marks_awarded, 0);
        assert_eq!(q2.confidence, 0.20);
        assert!(suggestion.needs_review);
    }

    #[test]
    fn test_extraction_failure_degrades() {
        let flow = flow(Arc::new(Broken));
        let suggestion = flow
            .run_with_review(&Submission::new("sub-3", "scan.png"), &scheme())
            .unwrap();
        let result = &suggestion.result;
        assert_eq!(result.total_marks(), 0);
        assert_eq!(result.max_marks(), 20);
        assert_eq!(result.percentage(), 0);
        assert!(!result.is_competent());
        assert_eq!(result.confidence(), 0.0);
        assert!(result
            .question_results()
            .iter()
            .all(|q| q.marks_awarded == 0 && q.confidence == 0.0 && q.tier == MatchTier::NotMarked));
        assert!(result.overall_feedback.contains("OCR processing failure"));
        assert!(suggestion.extracted.is_none());
        assert!(suggestion.needs_review);
    }

    #[test]
    fn test_degraded_result_never_competent() {
        let lenient = ScoringConfig {
            pass_percentage: 0,
            ..Default::default()
        };
        let flow = MarkingFlow::new(
            Arc::new(Broken),
            Arc::new(RegexFieldParser::new().unwrap()),
            AnswerEvaluator::new(lenient),
        );
        let result = flow.degraded_result("sub-6", &scheme(), "识别超时");
        assert_eq!(result.percentage(), 0);
        assert!(!result.is_competent());
        assert!(result.overall_feedback.ends_with("Reason: 识别超时"));
    }

    #[test]
    fn test_unsupported_format_is_an_error() {
        let flow = flow(Arc::new(Broken));
        let err = flow
            .run_marking(&Submission::new("sub-4", "essay.pdf"), &scheme())
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_review_boundary() {
        let flow = flow(Arc::new(Broken));
        // 平均 0.69 → 复核
        assert!(flow.needs_review(&result_with_confidences(&[0.69])));
        // 平均恰为 0.70 → 不复核
        assert!(!flow.needs_review(&result_with_confidences(&[0.75, 0.60, 0.75])));
        assert!(!flow.needs_review(&result_with_confidences(&[0.70])));
        // 整体足够高，但有一题低于 0.50
        let low_question = result_with_confidences(&[1.0, 1.0, 1.0, 0.4]);
        assert!(low_question.confidence() >= 0.7);
        assert_eq!(
            flow.review_reason(&low_question).as_deref(),
            Some("题目 4 置信度低于 0.50")
        );
        // 恰为 0.50 不算低
        assert!(!flow.needs_review(&result_with_confidences(&[1.0, 0.5, 1.0])));
    }

    #[test]
    fn test_mark_extracted_matches_answers_by_number() {
        let flow = flow(Arc::new(Broken));
        let extracted = ExtractedData::from_answers(vec![
            ExtractedAnswer::new(2, "blue"),
            ExtractedAnswer::new(9, "ignored"),
        ]);
        let result = flow.mark_extracted("sub-5", &extracted, &scheme());
        assert_eq!(result.question_results()[0].marks_awarded, 0);
        assert_eq!(result.question_results()[1].marks_awarded, 10);
        assert_eq!(result.percentage(), 50);
        assert!(result.overall_feedback.starts_with("Overall Score: 50%\nStatus: Competent"));
    }
}
