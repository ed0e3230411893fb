//! 作答评分服务 - 业务能力层
//!
//! 只负责"给一道题打分"，不关心流程
//!
//! ## 分档规则（按顺序，命中即停止）
//! 1. 与标准答案一致（忽略大小写和首尾空白）→ 满分，置信度 1.0
//! 2. 与任一备选答案一致 → 满分，置信度 0.95
//! 3. 相似度 ≥ 满分线 → 满分，置信度 0.90
//! 4. 相似度 ≥ 高档线 或 关键词覆盖率 ≥ 高档线 → 80%，置信度 0.75
//! 5. 相似度 ≥ 中档线 或 关键词覆盖率 ≥ 中档线 → 50%，置信度 0.60
//! 6. 相似度 ≥ 低档线 或 关键词覆盖率 ≥ 低档线 → 25%，置信度 0.40
//! 7. 其余 → 0 分，置信度 0.20
//!
//! 得分只可能是满分的 100% / 80% / 50% / 25% / 0%（四舍五入），
//! 复核时仅凭档位即可还原给分原因。

use tracing::debug;

use crate::config::ScoringConfig;
use crate::models::{MarkingSchemeQuestion, MatchTier, QuestionEvaluation};
use crate::services::similarity::{keyword_coverage, normalize, similarity, KeywordCoverage};

/// 单题评分
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub marks: u32,
    pub feedback: String,
    /// 0-1
    pub confidence: f64,
    pub tier: MatchTier,
}

/// 作答评分服务
///
/// 职责：
/// - 按分档规则给单道题打分
/// - 纯函数，相同输入总是得到相同结果
/// - 不出现提交 / 方案整体
#[derive(Debug, Clone, Default)]
pub struct AnswerEvaluator {
    config: ScoringConfig,
}

impl AnswerEvaluator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// 给一道题的作答打分
    pub fn evaluate(&self, extracted_answer: &str, question: &MarkingSchemeQuestion) -> Evaluation {
        let answer = normalize(extracted_answer);

        if answer == normalize(&question.expected_answer) {
            return self.build(MatchTier::Exact, question, "Correct answer.".to_string());
        }

        if question
            .alternative_answers
            .iter()
            .any(|alt| answer == normalize(alt))
        {
            return self.build(
                MatchTier::Alternative,
                question,
                "Correct answer (alternative).".to_string(),
            );
        }

        let similarity = similarity(extracted_answer, &question.expected_answer);
        let keywords = keyword_coverage(extracted_answer, &question.keywords);
        let tier = self.classify(similarity, keywords.score);
        debug!(
            "题目 {}: 相似度 {:.3}, 关键词覆盖率 {:.3} → {:?}",
            question.question_number, similarity, keywords.score, tier
        );

        let feedback = feedback_for(tier, &keywords);
        self.build(tier, question, feedback)
    }

    /// 评分并组装为单题结果
    pub fn evaluate_question(
        &self,
        extracted_answer: &str,
        question: &MarkingSchemeQuestion,
    ) -> QuestionEvaluation {
        let evaluation = self.evaluate(extracted_answer, question);
        QuestionEvaluation {
            question_number: question.question_number,
            extracted_answer: extracted_answer.to_string(),
            expected_answer: question.expected_answer.clone(),
            marks_awarded: evaluation.marks,
            max_marks: question.marks,
            feedback: evaluation.feedback,
            confidence: evaluation.confidence,
            tier: evaluation.tier,
        }
    }

    /// 按相似度和关键词覆盖率确定档位（精确匹配之后的部分）
    pub fn classify(&self, similarity: f64, keyword_score: f64) -> MatchTier {
        let c = &self.config;
        if similarity >= c.full_similarity {
            MatchTier::NearExact
        } else if similarity >= c.high_similarity || keyword_score >= c.high_keyword {
            MatchTier::Strong
        } else if similarity >= c.mid_similarity || keyword_score >= c.mid_keyword {
            MatchTier::Partial
        } else if similarity >= c.low_similarity || keyword_score >= c.low_keyword {
            MatchTier::Weak
        } else {
            MatchTier::NoMatch
        }
    }

    fn build(&self, tier: MatchTier, question: &MarkingSchemeQuestion, feedback: String) -> Evaluation {
        Evaluation {
            marks: tier.award(question.marks),
            feedback,
            confidence: tier.confidence(),
            tier,
        }
    }
}

fn feedback_for(tier: MatchTier, keywords: &KeywordCoverage) -> String {
    let found = if keywords.found.is_empty() {
        "none".to_string()
    } else {
        keywords.found.join(", ")
    };
    match tier {
        MatchTier::NearExact => {
            "Answer is very close to expected. Minor differences in wording.".to_string()
        }
        MatchTier::Strong => format!(
            "Good answer. Contains most key concepts. Keywords found: {}",
            found
        ),
        MatchTier::Partial => format!(
            "Partial answer. Some concepts present. Keywords found: {}",
            found
        ),
        MatchTier::Weak => format!(
            "Answer shows some understanding. Review recommended. Keywords found: {}",
            found
        ),
        _ => "Answer does not match expected response. Manual review recommended.".to_string(),
    }
}
