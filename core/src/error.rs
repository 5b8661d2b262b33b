use thiserror::Error;

/// Conditions that leave the pipeline with nothing useful to do.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no targets supplied; provide a URL or use -l <file>")]
    NoTargets,

    #[error("no live URLs after filtering")]
    NoLiveUrls,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
