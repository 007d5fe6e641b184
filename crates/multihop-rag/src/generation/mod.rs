//! Answer generation: prompts, the backend cascade and the rule-based fallback

pub mod citation;
pub mod fallback;
pub mod prompt;
pub mod synthesizer;

pub use fallback::FallbackContentAnalyzer;
pub use prompt::PromptBuilder;
pub use synthesizer::{ResponseSynthesizer, SynthesisContext, SynthesisState};
