//! Error taxonomy for the tutoring session.
//!
//! Engine-specific failures are converted into these types at the adapter
//! boundary, so the controller never sees raw engine strings or HTTP errors.

/// Why a speech capture session ended without a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    NoInput,
    DeviceDenied,
    Network,
    ServiceUnavailable,
    Aborted,
    Other,
}

impl CaptureErrorKind {
    /// Maps a recognizer error code (`no-speech`, `not-allowed`, ...) onto the taxonomy.
    pub fn from_engine_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "no-speech" | "no-input" => Self::NoInput,
            "not-allowed" | "audio-capture" | "permission-denied" => Self::DeviceDenied,
            "network" => Self::Network,
            "service-not-allowed" | "language-not-supported" | "service-unavailable" => {
                Self::ServiceUnavailable
            }
            "aborted" => Self::Aborted,
            _ => Self::Other,
        }
    }

    /// Short text shown to the learner.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoInput => "I didn't hear anything. Please try again.",
            Self::DeviceDenied => "Microphone access was denied. Check your permissions.",
            Self::Network => "Speech recognition lost its network connection.",
            Self::ServiceUnavailable => "Speech recognition is unavailable right now.",
            Self::Aborted => "Listening was cancelled.",
            Self::Other => "Something went wrong while listening.",
        }
    }
}

impl std::fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoInput => "no-input",
            Self::DeviceDenied => "device-denied",
            Self::Network => "network",
            Self::ServiceUnavailable => "service-unavailable",
            Self::Aborted => "aborted",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("speech recognition is not available in this environment")]
    EngineUnavailable,
    #[error("speech capture failed: {0}")]
    Failed(CaptureErrorKind),
}

/// Failure talking to the answering service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("answering service is unavailable (status {status:?})")]
    UpstreamUnavailable { status: Option<u16> },
    #[error("answering service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not read the answering service response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }
}

/// Rejections returned by controller operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a reply is still pending; wait for it before sending another message")]
    TurnInFlight,
    #[error("speech capture is disabled for this session")]
    CaptureDisabled,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("camera error: {0}")]
    Media(#[from] MediaError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("camera permission denied")]
    Denied,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}
