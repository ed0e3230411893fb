pub mod extraction;
pub mod loaders;
pub mod result;
pub mod scheme;
pub mod submission;

pub use extraction::{BBox, ExtractedAnswer, ExtractedData, ExtractedInfo, OcrLine, OcrResult, OcrWord};
pub use loaders::{load_scheme, parse_scheme, SchemeFormat};
pub use result::{MarkingResult, MarkingSuggestion, MatchTier, QuestionEvaluation};
pub use scheme::{MarkingScheme, MarkingSchemeQuestion};
pub use submission::Submission;
