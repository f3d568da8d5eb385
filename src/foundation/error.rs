/// Convenience result type used across afterimage.
pub type AfterimageResult<T> = Result<T, AfterimageError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum AfterimageError {
    /// Invalid configuration or caller-provided parameters.
    #[error("config error: {0}")]
    Config(String),

    /// Target allocation, lookup or graphics-context failures.
    #[error("resource error: {0}")]
    Resource(String),

    /// Failures while executing a render or full-screen pass.
    #[error("render error: {0}")]
    Render(String),

    /// A pre- or post-render hook reported a failure.
    #[error("hook error: {0}")]
    Hook(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AfterimageError {
    /// Build an [`AfterimageError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build an [`AfterimageError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build an [`AfterimageError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build an [`AfterimageError::Hook`] value.
    pub fn hook(msg: impl Into<String>) -> Self {
        Self::Hook(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
