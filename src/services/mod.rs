pub mod answer_evaluator;
pub mod feedback_composer;
pub mod field_parser;
pub mod review_writer;
pub mod similarity;

pub use answer_evaluator::{AnswerEvaluator, Evaluation};
pub use feedback_composer::compose_feedback;
pub use field_parser::{FieldExtractor, RegexFieldParser};
pub use review_writer::ReviewWriter;
