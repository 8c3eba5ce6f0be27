//! AI implementations.

mod openai;

pub use openai::OpenAiRecipeExtractor;
