use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioError {
    Device(String),
    Stream(String),
    Io(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Device(msg) => write!(f, "device error: {msg}"),
            AudioError::Stream(msg) => write!(f, "stream error: {msg}"),
            AudioError::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::Io(err.to_string())
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(err) => AudioError::Io(err.to_string()),
            other => AudioError::Stream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AudioError::from(err);
        assert_eq!(err, AudioError::Io("no such file".to_string()));
        assert_eq!(err.to_string(), "io error: no such file");
    }

    #[test]
    fn test_hound_error_conversion() {
        let err = AudioError::from(hound::Error::Unsupported);
        assert!(matches!(err, AudioError::Stream(_)));
    }
}
