pub mod config;
pub mod gemini;

pub use config::ClientConfig;
pub use gemini::{GeminiClient, GeneratedText, GenerativeClient, ModelListing};
