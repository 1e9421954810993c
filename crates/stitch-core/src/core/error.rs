use thiserror::Error;

pub type StitchResult<T> = Result<T, StitchError>;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Type syntax error: {0}")]
    TypeSyntax(String),

    /// A broken internal invariant. These are defects in the generator,
    /// never user errors, and abort the whole pass.
    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    /// The pass finished but reported error diagnostics.
    /// The CLI exits with code 1 without printing anything further.
    #[error("Generation failed with {0} error(s)")]
    GenerationFailed(usize),

    #[error("Generation cancelled")]
    Cancelled,
}
