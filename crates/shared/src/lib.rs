// Public modules
pub mod arxiv;
pub mod config;
pub mod error;
pub mod filters;
pub mod io;
pub mod models;
pub mod report;
pub mod summarizer;

// Re-export commonly used types
pub use arxiv::ArxivClient;
pub use config::{Config, Provider};
pub use error::{Result, ScoutError};
pub use io::{load_digest_json, save_digest_json};
pub use models::{DigestData, PaperRecord, RunMetadata, RunSettings, SummaryResult};
pub use report::ReportBuilder;
pub use summarizer::{CompletionClient, LlmClient, Summarizer};
