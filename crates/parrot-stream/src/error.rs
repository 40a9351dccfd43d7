use std::fmt;

/// Failure reported by a synthesis stream for one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisError {
    /// The engine rejected this particular text.
    InvalidText(String),
    /// Quota or activation exhausted. No further calls will succeed.
    ResourceLimit(String),
    /// Any other engine failure.
    Engine(String),
}

impl SynthesisError {
    /// Whether the session can go on after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SynthesisError::ResourceLimit(_))
    }
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::InvalidText(msg) => write!(f, "invalid text: {msg}"),
            SynthesisError::ResourceLimit(msg) => write!(f, "resource limit reached: {msg}"),
            SynthesisError::Engine(msg) => write!(f, "engine error: {msg}"),
        }
    }
}

impl std::error::Error for SynthesisError {}

/// Failure surfaced to the caller of a [`Speaker`](crate::Speaker).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeakError {
    /// The engine ran out of quota; the session cannot continue.
    ResourceLimit(String),
    /// The engine could not open or reopen a stream.
    Engine(String),
    /// The synthesis worker thread panicked.
    WorkerPanicked,
}

impl fmt::Display for SpeakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeakError::ResourceLimit(msg) => write!(f, "resource limit reached: {msg}"),
            SpeakError::Engine(msg) => write!(f, "engine error: {msg}"),
            SpeakError::WorkerPanicked => write!(f, "synthesis worker panicked"),
        }
    }
}

impl std::error::Error for SpeakError {}

impl From<SynthesisError> for SpeakError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::ResourceLimit(msg) => SpeakError::ResourceLimit(msg),
            SynthesisError::InvalidText(msg) | SynthesisError::Engine(msg) => {
                SpeakError::Engine(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_resource_limit_is_fatal() {
        assert!(SynthesisError::ResourceLimit("quota".to_string()).is_fatal());
        assert!(!SynthesisError::InvalidText("x".to_string()).is_fatal());
        assert!(!SynthesisError::Engine("x".to_string()).is_fatal());
    }

    #[test]
    fn test_synthesis_error_conversion() {
        assert_eq!(
            SpeakError::from(SynthesisError::ResourceLimit("quota".to_string())),
            SpeakError::ResourceLimit("quota".to_string())
        );
        assert_eq!(
            SpeakError::from(SynthesisError::InvalidText("bad".to_string())),
            SpeakError::Engine("bad".to_string())
        );
        assert_eq!(SpeakError::WorkerPanicked.to_string(), "synthesis worker panicked");
    }
}
