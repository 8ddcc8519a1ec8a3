//! Status code and error taxonomy shared across the planner, runtime and
//! configuration surface.

use thiserror::Error;

/// Errors the core can report. Mirrors the numeric stat-code table a shell
/// would surface to an operator; every variant here has a matching
/// [`StatCode`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatError {
    #[error("unsupported configuration value")]
    InputValueUnsupported,
    #[error("unknown configuration parameter")]
    ParameterNotFound,
    #[error("malformed numeric value")]
    BadNumberFormat,
    #[error("move has zero length")]
    ZeroLengthMove,
    #[error("planner buffer is full, retry after yielding")]
    BufferFullNonFatal,
    #[error("planner buffer overrun: caller violated flow control")]
    BufferFullFatal,
    #[error("arc radius/endpoints are inconsistent")]
    ArcSpecificationError,
    #[error("requested feed rate exceeds axis maximum")]
    MaxFeedRateExceeded,
    #[error("requested travel exceeds axis limit")]
    MaxTravelExceeded,
    #[error("motion math produced a non-finite value")]
    FloatingPointError,
    #[error("iterative solve failed to converge")]
    FailedToConverge,
    #[error("step generator reported a hardware assertion failure")]
    StepperAssertionFailure,
    #[error("internal invariant violated")]
    InternalError,
}

/// Numeric projection of [`StatError`] for the status-report channel.
/// Stable across releases; do not renumber existing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatCode {
    InputValueUnsupported = 1,
    ParameterNotFound = 2,
    BadNumberFormat = 3,
    ZeroLengthMove = 4,
    BufferFullNonFatal = 5,
    BufferFullFatal = 6,
    ArcSpecificationError = 7,
    MaxFeedRateExceeded = 8,
    MaxTravelExceeded = 9,
    FloatingPointError = 10,
    FailedToConverge = 11,
    StepperAssertionFailure = 12,
    InternalError = 13,
}

impl From<StatError> for StatCode {
    fn from(e: StatError) -> Self {
        match e {
            StatError::InputValueUnsupported => StatCode::InputValueUnsupported,
            StatError::ParameterNotFound => StatCode::ParameterNotFound,
            StatError::BadNumberFormat => StatCode::BadNumberFormat,
            StatError::ZeroLengthMove => StatCode::ZeroLengthMove,
            StatError::BufferFullNonFatal => StatCode::BufferFullNonFatal,
            StatError::BufferFullFatal => StatCode::BufferFullFatal,
            StatError::ArcSpecificationError => StatCode::ArcSpecificationError,
            StatError::MaxFeedRateExceeded => StatCode::MaxFeedRateExceeded,
            StatError::MaxTravelExceeded => StatCode::MaxTravelExceeded,
            StatError::FloatingPointError => StatCode::FloatingPointError,
            StatError::FailedToConverge => StatCode::FailedToConverge,
            StatError::StepperAssertionFailure => StatCode::StepperAssertionFailure,
            StatError::InternalError => StatCode::InternalError,
        }
    }
}

/// Non-error flow-control outcomes. Kept out of [`StatError`] since "success"
/// values read poorly inside a `thiserror` enum driven by `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerOutcome {
    /// The call made progress and there is nothing further to report.
    Ok,
    /// The call had nothing to do (e.g. queue already empty).
    Noop,
    /// The call could not make progress yet; the caller should retry later.
    Eagain,
    /// The operation (e.g. an arc being decomposed) has finished.
    Complete,
}

pub type StatResult<T = PlannerOutcome> = Result<T, StatError>;
