//! Error type for fatal counter-source conditions.
//!
//! Only unusable-source conditions surface as errors; degraded states
//! (a domain that failed to enable, an unknown metric name) are logged
//! and absorbed where they occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The source could not produce a probe snapshot; it is unusable.
    #[error("counter source is unusable: {0}")]
    Unusable(String),

    /// I/O failure while talking to the counter hardware.
    #[error("counter source I/O error: {0}")]
    Io(#[from] std::io::Error),
}
