use serde::Serialize;

use crate::models::extraction::ExtractedData;

/// 评分命中的档位，按判定顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// 与标准答案完全一致（忽略大小写和首尾空白）
    Exact,
    /// 与某个备选答案一致
    Alternative,
    /// 相似度达到满分线
    NearExact,
    /// 80%
    Strong,
    /// 50%
    Partial,
    /// 25%
    Weak,
    NoMatch,
    /// 识别失败，未评分
    NotMarked,
}

impl MatchTier {
    /// 本档得分占满分的百分比
    pub fn credit_percent(self) -> u32 {
        match self {
            MatchTier::Exact | MatchTier::Alternative | MatchTier::NearExact => 100,
            MatchTier::Strong => 80,
            MatchTier::Partial => 50,
            MatchTier::Weak => 25,
            MatchTier::NoMatch | MatchTier::NotMarked => 0,
        }
    }

    /// 本档固定置信度
    pub fn confidence(self) -> f64 {
        match self {
            MatchTier::Exact => 1.0,
            MatchTier::Alternative => 0.95,
            MatchTier::NearExact => 0.90,
            MatchTier::Strong => 0.75,
            MatchTier::Partial => 0.60,
            MatchTier::Weak => 0.40,
            MatchTier::NoMatch => 0.20,
            MatchTier::NotMarked => 0.0,
        }
    }

    /// 按本档比例计算得分（四舍五入）
    pub fn award(self, max_marks: u32) -> u32 {
        let scaled = u64::from(max_marks) * u64::from(self.credit_percent());
        ((scaled + 50) / 100) as u32
    }
}

/// 单题评分结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEvaluation {
    pub question_number: u32,
    pub extracted_answer: String,
    pub expected_answer: String,
    pub marks_awarded: u32,
    pub max_marks: u32,
    pub feedback: String,
    /// 0-1
    pub confidence: f64,
    pub tier: MatchTier,
}

impl QuestionEvaluation {
    pub fn is_full_marks(&self) -> bool {
        self.marks_awarded == self.max_marks
    }

    pub fn is_partial(&self) -> bool {
        self.marks_awarded > 0 && self.marks_awarded < self.max_marks
    }

    pub fn is_zero(&self) -> bool {
        self.marks_awarded == 0
    }
}

/// 一份提交的汇总评分结果
///
/// 总分、满分、百分比、是否合格和整体置信度都由各题结果计算得出，
/// 不能单独修改。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkingResult {
    submission_id: String,
    total_marks: u32,
    max_marks: u32,
    percentage: u32,
    is_competent: bool,
    question_results: Vec<QuestionEvaluation>,
    pub overall_feedback: String,
    confidence: f64,
}

impl MarkingResult {
    /// 汇总各题结果，`overall_feedback` 留空由调用方填写
    pub fn aggregate(
        submission_id: impl Into<String>,
        question_results: Vec<QuestionEvaluation>,
        pass_percentage: u32,
    ) -> Self {
        // u64 累加，任意 u32 分值都不会溢出
        let total_marks: u64 = question_results
            .iter()
            .map(|q| u64::from(q.marks_awarded))
            .sum();
        let max_marks: u64 = question_results
            .iter()
            .map(|q| u64::from(q.max_marks))
            .sum();
        let percentage = wide_percentage(total_marks, max_marks);
        let confidence = if question_results.is_empty() {
            0.0
        } else {
            question_results.iter().map(|q| q.confidence).sum::<f64>()
                / question_results.len() as f64
        };

        Self {
            submission_id: submission_id.into(),
            total_marks: u32::try_from(total_marks).unwrap_or(u32::MAX),
            max_marks: u32::try_from(max_marks).unwrap_or(u32::MAX),
            percentage,
            is_competent: percentage >= pass_percentage,
            question_results,
            overall_feedback: String::new(),
            confidence,
        }
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    pub fn max_marks(&self) -> u32 {
        self.max_marks
    }

    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    pub fn is_competent(&self) -> bool {
        self.is_competent
    }

    /// 未完成评分（如识别失败）时不能判定为合格
    pub(crate) fn withhold_competency(&mut self) {
        self.is_competent = false;
    }

    pub fn question_results(&self) -> &[QuestionEvaluation] {
        &self.question_results
    }

    /// 各题置信度的平均值（0-1）
    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// round(total / max * 100)，满分为 0 时记 0
pub fn percentage_of(total: u32, max: u32) -> u32 {
    wide_percentage(u64::from(total), u64::from(max))
}

fn wide_percentage(total: u64, max: u64) -> u32 {
    if max == 0 {
        return 0;
    }
    let (total, max) = (u128::from(total), u128::from(max));
    ((200 * total + max) / (2 * max)) as u32
}

/// 评分建议：结果 + 识别数据 + 是否建议人工复核
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkingSuggestion {
    pub result: MarkingResult,
    pub extracted: Option<ExtractedData>,
    pub needs_review: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(number: u32, awarded: u32, max: u32, confidence: f64) -> QuestionEvaluation {
        QuestionEvaluation {
            question_number: number,
            extracted_answer: String::new(),
            expected_answer: String::new(),
            marks_awarded: awarded,
            max_marks: max,
            feedback: String::new(),
            confidence,
            tier: MatchTier::NoMatch,
        }
    }

    #[test]
    fn test_award_rounds_half_up() {
        assert_eq!(MatchTier::Weak.award(10), 3); // 2.5
        assert_eq!(MatchTier::Partial.award(5), 3); // 2.5
        assert_eq!(MatchTier::Strong.award(3), 2); // 2.4
        assert_eq!(MatchTier::Strong.award(10), 8);
        assert_eq!(MatchTier::Weak.award(1), 0); // 0.25
        assert_eq!(MatchTier::NearExact.award(7), 7);
        assert_eq!(MatchTier::NoMatch.award(7), 0);
    }

    #[test]
    fn test_percentage_recomputed_from_totals() {
        assert_eq!(percentage_of(15, 20), 75);
        assert_eq!(percentage_of(1, 8), 13); // 12.5
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
        assert_eq!(percentage_of(0, 0), 0);
    }

    #[test]
    fn test_aggregate_totals_and_competency() {
        let result = MarkingResult::aggregate(
            "s-1",
            vec![evaluation(1, 10, 10, 1.0), evaluation(2, 0, 10, 0.2)],
            50,
        );
        assert_eq!(result.total_marks(), 10);
        assert_eq!(result.max_marks(), 20);
        assert_eq!(result.percentage(), 50);
        assert!(result.is_competent());
        assert!((result.confidence() - 0.6).abs() < 1e-9);

        let failing = MarkingResult::aggregate("s-2", vec![evaluation(1, 4, 10, 0.6)], 50);
        assert_eq!(failing.percentage(), 40);
        assert!(!failing.is_competent());
    }

    #[test]
    fn test_aggregate_large_marks_does_not_overflow() {
        let result = MarkingResult::aggregate(
            "s-3",
            vec![
                evaluation(1, 3_000_000_000, 3_000_000_000, 1.0),
                evaluation(2, 0, 3_000_000_000, 0.2),
            ],
            50,
        );
        assert_eq!(result.percentage(), 50);
        assert!(result.is_competent());
    }
}
