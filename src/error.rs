use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analysis of {path} was cancelled")]
    Cancelled { path: String },
}
