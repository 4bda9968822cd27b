//! Paper sources: arXiv (primary), Semantic Scholar, and HuggingFace
//! Daily Papers. Each source degrades to an empty result on failure;
//! cross-source merging lives in `crate::dedup` and `crate::fetch`.

pub mod arxiv;
pub mod huggingface;
pub mod semantic_scholar;

pub use arxiv::ArxivClient;
pub use huggingface::HuggingFaceClient;
pub use semantic_scholar::SemanticScholarClient;
