//! Error types for fastcalc operations.
//!
//! Two layers live here. [`ErrorCode`] is the per-element fault taxonomy that
//! every evaluation reports alongside its value; it is plain data and never
//! unwinds. [`FastcalcError`] covers failures of the call itself, such as
//! mismatched buffer lengths or an aligned allocation that could not be made.

use std::fmt;

use thiserror::Error;

/// Errors that can occur during fastcalc operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FastcalcError {
    /// Memory allocation failed.
    #[error("Memory allocation failed: {message} (requested {requested_size} bytes with {requested_alignment} byte alignment)")]
    Allocation {
        /// The size that was requested to be allocated.
        requested_size: usize,
        /// The alignment that was requested.
        requested_alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Invalid layout parameters were provided.
    #[error("Invalid memory layout: {message} (size: {size}, alignment: {alignment})")]
    Layout {
        /// The size parameter that caused the error.
        size: usize,
        /// The alignment parameter that caused the error.
        alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Input validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },
    /// A dedicated worker pool could not be built.
    #[error("Worker pool error: {0}")]
    Pool(String),
}

/// Result type alias for fastcalc operations.
pub type Result<T> = std::result::Result<T, FastcalcError>;

/// Creates an allocation error.
pub fn allocation_error(size: usize, alignment: usize, message: impl Into<String>) -> FastcalcError {
    FastcalcError::Allocation {
        requested_size: size,
        requested_alignment: alignment,
        message: message.into(),
    }
}

/// Creates a layout error.
pub fn layout_error(size: usize, alignment: usize, message: impl Into<String>) -> FastcalcError {
    FastcalcError::Layout {
        size,
        alignment,
        message: message.into(),
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> FastcalcError {
    FastcalcError::Validation {
        message: message.into(),
    }
}

/// Fault classification attached to every computed element.
///
/// The discriminants are stable and match the integer codes the calculator
/// front end expects, so a `&[ErrorCode]` can be handed over as `&[i32]`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// No fault.
    #[default]
    Success = 0,
    /// Mathematically undefined input.
    DomainError = 1,
    /// Well-defined input whose result is not a valid number.
    RangeError = 2,
    /// Singularity. Reserved: no operation currently reports it.
    PoleError = 3,
    /// Magnitude above the trusted range.
    OverflowError = 4,
    /// Non-zero magnitude below the trusted range.
    UnderflowError = 5,
    /// Non-positive integral exponent applied to a zero base.
    DivisionByZero = 6,
    /// The worker processing this element failed unexpectedly.
    InvalidArgument = 7,
}

impl ErrorCode {
    /// Returns `true` for [`ErrorCode::Success`].
    #[inline(always)]
    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }

    /// The stable integer code.
    #[inline(always)]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    fn describe(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::DomainError => "domain error",
            ErrorCode::RangeError => "range error",
            ErrorCode::PoleError => "pole error",
            ErrorCode::OverflowError => "overflow",
            ErrorCode::UnderflowError => "underflow",
            ErrorCode::DivisionByZero => "division by zero",
            ErrorCode::InvalidArgument => "invalid argument",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = FastcalcError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::DomainError),
            2 => Ok(ErrorCode::RangeError),
            3 => Ok(ErrorCode::PoleError),
            4 => Ok(ErrorCode::OverflowError),
            5 => Ok(ErrorCode::UnderflowError),
            6 => Ok(ErrorCode::DivisionByZero),
            7 => Ok(ErrorCode::InvalidArgument),
            other => Err(validation_error(format!("unknown error code {other}"))),
        }
    }
}

/// A computed value and the fault code that goes with it.
///
/// The value is always meaningful to read: on failure it carries the
/// sentinel the operation defines (NaN, `-1`, or a clamped magnitude).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub code: ErrorCode,
}

impl<T> Outcome<T> {
    #[inline(always)]
    pub fn ok(value: T) -> Self {
        Outcome {
            value,
            code: ErrorCode::Success,
        }
    }

    #[inline(always)]
    pub fn fault(value: T, code: ErrorCode) -> Self {
        Outcome { value, code }
    }

    #[inline(always)]
    pub fn is_ok(&self) -> bool {
        self.code.is_success()
    }

    /// Drops the sentinel value of a failed outcome.
    pub fn into_result(self) -> std::result::Result<T, ErrorCode> {
        if self.is_ok() {
            Ok(self.value)
        } else {
            Err(self.code)
        }
    }
}
