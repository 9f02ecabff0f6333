use objtrack_core::MarkerKind;

/// A detection stage could not be constructed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendUnavailable {
    #[error("{stage:?} stage disabled by configuration")]
    Disabled { stage: MarkerKind },
    #[error("no marker dictionary configured")]
    MissingDictionary,
    #[error("dictionary `{name}` has no codes")]
    EmptyDictionary { name: String },
    #[error("dictionary `{name}` uses {bits} bits per marker, at most 64 are supported")]
    UnsupportedMarkerSize { name: String, bits: usize },
}

/// A stage failed on one frame. The cascade logs it and moves on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionFailure {
    #[error("frame {width}x{height} is below the {min}px minimum side")]
    FrameTooSmall {
        width: usize,
        height: usize,
        min: usize,
    },
    #[error("{stage}: {reason}")]
    Backend { stage: &'static str, reason: String },
}
