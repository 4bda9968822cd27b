//! # Paperboy Core
//!
//! Core library for the paperboy digest bot: state-aware window
//! computation, multi-source paper fetching, budget-capped LLM
//! classification and summarization, and report delivery.

pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod gemini;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod state;
pub mod summarize;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{PaperboyConfig, load_config};
pub use error::{PaperboyError, Result};
pub use llm::{CallBudget, LlmClient};
pub use output::SmtpSender;
pub use pipeline::{RunFlags, RunOutcome, run};
pub use report::DigestReport;
pub use state::{RunState, compute_window};
pub use types::{Classification, ClassifiedPaper, PaperRecord, Window};
