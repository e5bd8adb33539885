pub type ScrawlResult<T> = Result<T, ScrawlError>;

#[derive(thiserror::Error, Debug)]
pub enum ScrawlError {
    /// Structurally invalid scene input. Terminal: retrying a deterministic
    /// validation failure cannot change its outcome.
    #[error("malformed scene: {0}")]
    MalformedScene(String),

    /// Two bracketing keyframes of one shape have incompatible path topology
    /// (differing subpath counts). Terminal; carries enough context to point
    /// the author at the offending pair.
    #[error("incompatible keyframes for shape '{shape_id}' at t={t0}s and t={t1}s: {detail}")]
    IncompatibleKeyframes {
        shape_id: String,
        t0: f64,
        t1: f64,
        detail: String,
    },

    /// A per-shape failure sank the whole frame. Partial frames are never
    /// emitted; a malformed frame is worse than a missing one in a sequence.
    #[error("frame render failed at shape '{shape_id}'")]
    FrameRenderFailed {
        shape_id: String,
        #[source]
        source: Box<ScrawlError>,
    },

    /// Transient resource failure (memory, surfaces). Retryable.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The job ran past its configured deadline. Transient: a retry on a
    /// fresh worker claim may succeed.
    #[error("job exceeded its time limit of {limit:?}")]
    Timeout { limit: std::time::Duration },

    /// A transient failure that exhausted its retry budget.
    #[error("job failed permanently after {attempts} attempts")]
    JobFailedPermanently {
        attempts: u32,
        #[source]
        source: Box<ScrawlError>,
    },

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrawlError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedScene(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn frame_failed(shape_id: impl Into<String>, source: ScrawlError) -> Self {
        Self::FrameRenderFailed {
            shape_id: shape_id.into(),
            source: Box::new(source),
        }
    }

    /// The single classification point the scheduler consults: transient
    /// errors are nacked and retried with backoff, everything else is
    /// terminal on the first attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_) | Self::Timeout { .. })
    }

    /// Stable machine-readable kind for the per-job outcome record.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedScene(_) => ErrorKind::MalformedScene,
            Self::IncompatibleKeyframes { .. } => ErrorKind::IncompatibleKeyframes,
            Self::FrameRenderFailed { .. } => ErrorKind::FrameRenderFailed,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::JobFailedPermanently { .. } => ErrorKind::JobFailedPermanently,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    MalformedScene,
    IncompatibleKeyframes,
    FrameRenderFailed,
    ResourceExhausted,
    Timeout,
    JobFailedPermanently,
    Encode,
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ScrawlError::resource("oom").is_transient());
        assert!(
            ScrawlError::Timeout {
                limit: std::time::Duration::from_secs(1)
            }
            .is_transient()
        );
        assert!(!ScrawlError::malformed("x").is_transient());
        assert!(
            !ScrawlError::IncompatibleKeyframes {
                shape_id: "s".into(),
                t0: 0.0,
                t1: 1.0,
                detail: "2 vs 3 subpaths".into(),
            }
            .is_transient()
        );
    }

    #[test]
    fn frame_failed_preserves_source_and_shape() {
        let err = ScrawlError::frame_failed("circle-1", ScrawlError::malformed("bad"));
        assert!(err.to_string().contains("circle-1"));
        assert_eq!(err.kind(), ErrorKind::FrameRenderFailed);
        match err {
            ScrawlError::FrameRenderFailed { source, .. } => {
                assert_eq!(source.kind(), ErrorKind::MalformedScene);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ScrawlError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
