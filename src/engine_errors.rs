use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Fetch of catalog source '{source_id}' failed: {cause}")]
    Fetch { source_id: String, cause: String },

    #[error("Unable to parse catalog source '{source_id}': {reason}")]
    Parse { source_id: String, reason: String },

    #[error("Ephemeris capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("No catalog could be built from remote sources or the fallback dataset")]
    CatalogUnavailable,

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("UT1 provider error: {0}")]
    Ut1Error(#[from] hifitime::HifitimeError),

    #[error("Invalid storage path for the ephemeris data: {0}")]
    InvalidStoragePath(String),

    #[error("Visibility computation aborted: {0}")]
    ComputationAborted(String),

    #[error("System clock unreadable: {0}")]
    ClockError(hifitime::HifitimeError),
}

impl EngineError {
    /// Whether the engine can keep serving after this error.
    ///
    /// Only a missing catalog (no source and no fallback) and bad configuration are terminal
    /// for a request.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            EngineError::CatalogUnavailable | EngineError::Configuration(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        use EngineError::*;
        match (self, other) {
            (
                Fetch {
                    source_id: a,
                    cause: c,
                },
                Fetch {
                    source_id: b,
                    cause: d,
                },
            ) => a == b && c == d,
            (
                Parse {
                    source_id: a,
                    reason: c,
                },
                Parse {
                    source_id: b,
                    reason: d,
                },
            ) => a == b && c == d,
            (CapabilityUnavailable(a), CapabilityUnavailable(b)) => a == b,
            (Configuration(a), Configuration(b)) => a == b,
            (InvalidStoragePath(a), InvalidStoragePath(b)) => a == b,
            (ComputationAborted(a), ComputationAborted(b)) => a == b,

            // not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (ReqwestError(_), ReqwestError(_)) => true,
            (Ut1Error(_), Ut1Error(_)) => true,
            (ClockError(_), ClockError(_)) => true,

            (CatalogUnavailable, CatalogUnavailable) => true,

            _ => false,
        }
    }
}
