use gc_arena::{Collect, Collection, Gc};
use std::fmt::{self, Debug, Formatter};

pub mod buffer;
pub mod object;
pub mod wide_int;

pub use buffer::{Buffer, BufferKind, BufferRef};
pub use object::{Object, ObjectRef};
pub use wide_int::WideInt;

/// A caller-side value, as seen on the managed side of the boundary.
#[derive(Clone)]
pub enum Value<'gc> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Buffer(BufferRef<'gc>),
    Object(ObjectRef<'gc>),
}

unsafe impl<'gc> Collect for Value<'gc> {
    fn trace(&self, cc: &Collection) {
        match self {
            Self::Buffer(b) => b.trace(cc),
            Self::Object(o) => o.trace(cc),
            _ => {}
        }
    }
}

impl Debug for Value<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Buffer(b) => write!(f, "{:?}", &**b),
            Self::Object(o) => write!(f, "{o:?}"),
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(l), Self::Bool(r)) => l == r,
            (Self::Number(l), Self::Number(r)) => l == r,
            (Self::String(l), Self::String(r)) => l == r,
            (Self::Buffer(l), Self::Buffer(r)) => Gc::ptr_eq(*l, *r),
            (Self::Object(l), Self::Object(r)) => l == r,
            _ => false,
        }
    }
}

impl<'gc> From<BufferRef<'gc>> for Value<'gc> {
    fn from(b: BufferRef<'gc>) -> Self {
        Self::Buffer(b)
    }
}

impl<'gc> From<ObjectRef<'gc>> for Value<'gc> {
    fn from(o: ObjectRef<'gc>) -> Self {
        Self::Object(o)
    }
}

impl From<WideInt> for Value<'_> {
    fn from(v: WideInt) -> Self {
        match v {
            WideInt::Exact(i) => Self::Number(i as f64),
            WideInt::Text(s) => Self::String(s),
        }
    }
}

impl<'gc> Value<'gc> {
    pub fn as_buffer(&self) -> Option<BufferRef<'gc>> {
        match self {
            Self::Buffer(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectRef<'gc>> {
        match self {
            Self::Object(o) => Some(*o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    /// Offsets: numbers truncate and saturate to 64 bits, anything else reads as zero.
    pub fn to_int64_or_zero(&self) -> i64 {
        match self {
            // `as` saturates and maps NaN to 0
            Self::Number(n) => *n as i64,
            _ => 0,
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => !(*n == 0.0 || n.is_nan()),
            Self::String(s) => !s.is_empty(),
            Self::Buffer(_) | Self::Object(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => *b as u8 as f64,
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Buffer(_) | Self::Object(_) => f64::NAN,
        }
    }

    /// Modular conversion to `u32`, used for lengths and sizes.
    pub fn to_uint32(&self) -> u32 {
        to_int_modular(self.to_number()) as u32
    }

    /// Modular conversion to `i32`, used for signed deltas.
    pub fn to_int32(&self) -> i32 {
        to_int_modular(self.to_number()) as u32 as i32
    }
}

fn to_int_modular(n: f64) -> u64 {
    if !n.is_finite() {
        return 0;
    }
    let t = n.trunc() % 4294967296.0;
    let t = if t < 0.0 { t + 4294967296.0 } else { t };
    t as u64
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    let radix = |prefix: &str, radix: u32| {
        s.strip_prefix(prefix)
            .or_else(|| s.strip_prefix(&prefix.to_uppercase()))
            .map(|digits| {
                u64::from_str_radix(digits, radix)
                    .map(|v| v as f64)
                    .unwrap_or(f64::NAN)
            })
    };
    if let Some(v) = radix("0x", 16).or_else(|| radix("0o", 8)).or_else(|| radix("0b", 2)) {
        return v;
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if s.contains(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => s.parse().unwrap_or(f64::NAN),
    }
}
