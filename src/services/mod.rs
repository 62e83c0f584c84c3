pub mod delegate;
pub mod pipeline;
pub mod scratch;
pub mod stager;
pub mod text_extractor;
pub mod validator;

pub use delegate::{ExtractionDelegate, LlmDelegate};
pub use pipeline::{IntakePipeline, ProcessOutcome};
pub use scratch::ScratchSpace;
pub use stager::{StagedFile, Stager};
pub use text_extractor::TextExtractor;
pub use validator::UploadValidator;
