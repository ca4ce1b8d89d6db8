/// Errors reported by the capture pipeline and the AR session.
///
/// None of these are fatal to a session: pose and projection failures are
/// recovered locally, the rest are surfaced to the caller for user feedback.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    /// The motion tracker could not provide a valid pose at the requested time.
    #[error("no valid pose at timestamp {timestamp}")]
    InvalidPose {
        /// Timestamp of the failed query, in seconds.
        timestamp: f64,
    },

    /// Merge was requested before any point was captured.
    #[error("cannot merge keyframes without any captured point")]
    EmptyInput,

    /// A point could not be projected because it lies on or behind the camera plane.
    #[error("point is on or behind the camera plane")]
    DegenerateProjection,

    /// The sensor or the renderer is not ready for the request.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(&'static str),

    /// The raw xyz buffer holds fewer than `3 * count` floats, or `3 * count` overflows.
    #[error("point cloud declares {count} points but holds {len} floats")]
    MalformedPointCloud {
        /// Declared number of points.
        count: usize,
        /// Number of floats in the buffer.
        len: usize,
    },

    /// A rotation quaternion was zero or not finite.
    #[error("rotation quaternion cannot be normalized")]
    InvalidRotation,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Glob(#[from] glob::PatternError),
}
