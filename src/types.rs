//! Sizes and alignments of the primitive C types on the host platform.

use std::{
    ffi::{
        c_char, c_int, c_long, c_longlong, c_short, c_uchar, c_uint, c_ulong, c_ulonglong,
        c_ushort,
    },
    mem::{align_of, size_of},
};

#[cfg(windows)]
type WChar = u16;
#[cfg(not(windows))]
type WChar = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
}

macro_rules! primitive {
    ($name:literal => $t:ty) => {
        Primitive {
            name: $name,
            size: size_of::<$t>(),
            align: align_of::<$t>(),
        }
    };
}

pub static PRIMITIVES: &[Primitive] = &[
    primitive!("int8" => i8),
    primitive!("uint8" => u8),
    primitive!("int16" => i16),
    primitive!("uint16" => u16),
    primitive!("int32" => i32),
    primitive!("uint32" => u32),
    primitive!("int64" => i64),
    primitive!("uint64" => u64),
    primitive!("float" => f32),
    primitive!("double" => f64),
    primitive!("bool" => bool),
    primitive!("byte" => c_uchar),
    primitive!("char" => c_char),
    primitive!("uchar" => c_uchar),
    primitive!("short" => c_short),
    primitive!("ushort" => c_ushort),
    primitive!("int" => c_int),
    primitive!("uint" => c_uint),
    primitive!("long" => c_long),
    primitive!("ulong" => c_ulong),
    primitive!("longlong" => c_longlong),
    primitive!("ulonglong" => c_ulonglong),
    primitive!("pointer" => *const u8),
    primitive!("size_t" => usize),
    primitive!("wchar_t" => WChar),
    // an embedded reference is one handle word
    primitive!("Object" => usize),
];

pub fn lookup(name: &str) -> Option<&'static Primitive> {
    PRIMITIVES.iter().find(|p| p.name == name)
}

pub fn size_of_type(name: &str) -> Option<usize> {
    lookup(name).map(|p| p.size)
}

pub fn align_of_type(name: &str) -> Option<usize> {
    lookup(name).map(|p| p.align)
}
