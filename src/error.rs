use thiserror::Error;

/// Failure raised across the caller boundary.
///
/// `Type` is a caller passing the wrong kind of value; `Runtime` is a well-typed call
/// that is invalid at run time (null dereference, out-of-bounds slot, oversized view).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RefError {
    #[error("TypeError: {op}: {message}")]
    Type { op: &'static str, message: String },

    #[error("Error: {op}: {message}")]
    Runtime { op: &'static str, message: String },

    #[error("native library lookup failed: {0}")]
    Native(#[from] NativeError),
}

impl RefError {
    pub fn type_error(op: &'static str, message: impl Into<String>) -> Self {
        Self::Type {
            op,
            message: message.into(),
        }
    }

    pub fn runtime(op: &'static str, message: impl Into<String>) -> Self {
        Self::Runtime {
            op,
            message: message.into(),
        }
    }

    pub fn buffer_expected(op: &'static str) -> Self {
        Self::type_error(op, "Buffer instance expected")
    }

    pub fn null_read(op: &'static str) -> Self {
        Self::runtime(op, "Cannot read from NULL pointer")
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::Type { .. })
    }

    pub fn op(&self) -> Option<&'static str> {
        match self {
            Self::Type { op, .. } | Self::Runtime { op, .. } => Some(op),
            Self::Native(_) => None,
        }
    }
}

/// Failure inside a raw memory operation, before it is attributed to an export.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error("Cannot {action} NULL pointer")]
    NullPointer { action: &'static str },
    #[error("offset + pointer size must be less than equals buffer size")]
    OutOfBounds { offset: i64, len: usize },
    #[error("buffer of {len} bytes cannot hold a pointer")]
    SlotTooShort { len: usize },
    #[error("length {length} exceeds the maximum buffer length {max}")]
    TooLong { length: usize, max: usize },
    #[error("writing {needed} bytes at offset {offset} overflows a buffer of {len} bytes")]
    Overflow {
        offset: i64,
        needed: usize,
        len: usize,
    },
    #[error("reference handle table is full")]
    HandlesExhausted,
    #[error(transparent)]
    Parse(#[from] ParseIntError),
}

impl AccessError {
    pub(crate) const READ: Self = Self::NullPointer {
        action: "read from",
    };
    pub(crate) const WRITE: Self = Self::NullPointer { action: "write to" };
    pub(crate) const REINTERPRET: Self = Self::NullPointer {
        action: "reinterpret from",
    };

    /// Attributes the failure to `op`. Malformed literals are type errors; everything
    /// else is a run-time error.
    pub fn at(self, op: &'static str) -> RefError {
        match self {
            Self::Parse(_) => RefError::type_error(op, self.to_string()),
            _ => RefError::runtime(op, self.to_string()),
        }
    }
}

/// Failure parsing a 64-bit integer literal with C `strtoll`/`strtoull` rules.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseIntError {
    #[error("no digits we found in input String")]
    NoDigits,
    #[error("input String numerical value out of range")]
    OutOfRange,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NativeError {
    #[error("could not open library {name}: {reason}")]
    Library { name: String, reason: String },
    #[error("symbol {symbol} not found in {library}: {reason}")]
    Symbol {
        library: String,
        symbol: String,
        reason: String,
    },
}
