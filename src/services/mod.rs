pub mod extractor;
pub mod history_store;
pub mod llm_service;
pub mod prompt_builder;
pub mod pseudonym;
pub mod validator;

pub use extractor::{SegmentExtractor, StagedDocument};
pub use history_store::HistoryStore;
pub use llm_service::{GenerationBackend, LlmService};
pub use prompt_builder::{PromptBuilder, PromptMessages};
pub use pseudonym::Pseudonymizer;
pub use validator::{ResponseValidator, ValidatedBatch, ValidatedRecord};
