//! 总评生成
//!
//! 固定模板，无随机性，不依赖外部状态。

use crate::models::QuestionEvaluation;

/// 识别失败时每道题的评语
pub const OCR_FAILED_QUESTION_FEEDBACK: &str = "OCR processing failed. Manual marking required.";

/// 识别失败时的总评
pub const OCR_FAILED_OVERALL_FEEDBACK: &str =
    "Automated marking could not be performed due to OCR processing failure. Please mark manually.";

/// 根据各题结果生成总评
pub fn compose_feedback(
    evaluations: &[QuestionEvaluation],
    percentage: u32,
    is_competent: bool,
) -> String {
    let correct = evaluations.iter().filter(|q| q.is_full_marks()).count();
    let partial = evaluations.iter().filter(|q| q.is_partial()).count();
    let incorrect = evaluations.iter().filter(|q| q.is_zero()).count();

    let mut feedback = format!("Overall Score: {}%\n", percentage);
    feedback.push_str(&format!(
        "Status: {}\n\n",
        if is_competent {
            "Competent"
        } else {
            "Not Yet Competent"
        }
    ));
    feedback.push_str("Summary:\n");
    feedback.push_str(&format!("- {} question(s) answered correctly\n", correct));
    feedback.push_str(&format!("- {} question(s) partially correct\n", partial));
    feedback.push_str(&format!("- {} question(s) need improvement\n\n", incorrect));

    if is_competent {
        feedback.push_str("Congratulations! You have demonstrated competency in this assessment.");
        if partial > 0 || incorrect > 0 {
            feedback.push_str(" However, there are areas that could use improvement.");
        }
    } else {
        feedback.push_str(
            "Additional study and practice is recommended. Please review the feedback for each question and consider resubmitting after addressing the gaps.",
        );
    }

    feedback
}

/// 识别失败时的总评，附带失败原因
pub fn compose_degraded_feedback(reason: &str) -> String {
    format!("{}\nReason: {}", OCR_FAILED_OVERALL_FEEDBACK, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchTier;

    fn evaluation(awarded: u32, max: u32) -> QuestionEvaluation {
        QuestionEvaluation {
            question_number: 1,
            extracted_answer: String::new(),
            expected_answer: String::new(),
            marks_awarded: awarded,
            max_marks: max,
            feedback: String::new(),
            confidence: 1.0,
            tier: MatchTier::Exact,
        }
    }

    #[test]
    fn test_competent_with_gaps() {
        let evaluations = vec![evaluation(10, 10), evaluation(5, 10), evaluation(0, 10)];
        let feedback = compose_feedback(&evaluations, 50, true);
        assert_eq!(
            feedback,
            "Overall Score: 50%\n\
             Status: Competent\n\n\
             Summary:\n\
             - 1 question(s) answered correctly\n\
             - 1 question(s) partially correct\n\
             - 1 question(s) need improvement\n\n\
             Congratulations! You have demonstrated competency in this assessment. However, there are areas that could use improvement."
        );
    }

    #[test]
    fn test_all_correct_has_no_improvement_note() {
        let feedback = compose_feedback(&[evaluation(4, 4)], 100, true);
        assert!(feedback.ends_with("competency in this assessment."));
        assert!(feedback.contains("- 1 question(s) answered correctly"));
    }

    #[test]
    fn test_not_competent_remediation() {
        let feedback = compose_feedback(&[evaluation(0, 4), evaluation(1, 4)], 13, false);
        assert!(feedback.starts_with("Overall Score: 13%\nStatus: Not Yet Competent\n"));
        assert!(feedback.contains("- 1 question(s) partially correct"));
        assert!(feedback.ends_with("consider resubmitting after addressing the gaps."));
    }

    #[test]
    fn test_degraded_feedback_mentions_ocr() {
        let feedback = compose_degraded_feedback("文件不存在");
        assert!(feedback.starts_with(OCR_FAILED_OVERALL_FEEDBACK));
        assert!(feedback.contains("OCR processing failure"));
        assert!(feedback.ends_with("文件不存在"));
    }
}
