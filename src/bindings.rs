//! The boundary surface: every exported operation as a [`NativeHandler`] over [`Value`]s.
//!
//! Handlers coerce their arguments the way a dynamic caller expects (offsets truncate,
//! flags use truthiness, lengths wrap to 32 bits) and trust the addresses carried by the
//! buffers they are handed. Nothing here can tell a dangling address from a live one.

use crate::{
    error::{AccessError, RefError},
    memory::{
        address, embed, endianness, pointer, scalar, scan, ByteOrder, IntInput, RefKind,
        POINTER_SIZE,
    },
    types::PRIMITIVES,
    value::{Buffer, BufferRef, ObjectRef, Value},
    vm::CallContext,
};
use tracing::trace;

pub type NativeHandler =
    for<'a, 'gc> fn(&mut CallContext<'a, 'gc>, &[Value<'gc>]) -> Result<Value<'gc>, RefError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Errors are returned to the caller.
    FailFast,
    /// Errors are reported on the call context and the call returns `undefined`.
    FailSoft,
}

pub struct Export {
    pub name: &'static str,
    pub policy: ErrorPolicy,
    pub handler: NativeHandler,
}

macro_rules! export {
    ($name:literal => $handler:expr) => {
        export!($name => $handler, FailFast)
    };
    ($name:literal => $handler:expr, $policy:ident) => {
        Export {
            name: $name,
            policy: ErrorPolicy::$policy,
            handler: $handler,
        }
    };
}

pub static EXPORTS: &[Export] = &[
    export!("address" => address),
    export!("hexAddress" => hex_address),
    export!("isNull" => is_null),
    export!("containsNullPointer" => contains_null_pointer),
    export!("readObject" => read_object),
    export!("writeObject" => write_object),
    export!("readPointer" => read_pointer),
    export!("writePointer" => write_pointer),
    export!("readFromPointer" => read_from_pointer),
    export!("comparePointer" => compare_pointer),
    export!("ref" => reference),
    export!("readInt64" => read_int64),
    export!("readInt64BE" => read_int64_be),
    export!("readInt64LE" => read_int64_le),
    export!("readUInt64" => read_uint64),
    export!("readUInt64BE" => read_uint64_be),
    export!("readUInt64LE" => read_uint64_le),
    export!("writeInt64" => write_int64),
    export!("writeInt64BE" => write_int64_be),
    export!("writeInt64LE" => write_int64_le),
    export!("writeUInt64" => write_uint64),
    export!("writeUInt64BE" => write_uint64_be),
    export!("writeUInt64LE" => write_uint64_le),
    export!("readCString" => read_c_string),
    export!("writeCString" => write_c_string),
    export!("allocCString" => alloc_c_string),
    export!("reinterpret" => reinterpret),
    export!("reinterpretUntilZeros" => reinterpret_until_zeros),
    export!("copyMemory" => copy_memory, FailSoft),
    export!("addOffset" => add_offset, FailSoft),
    export!("getNullPointer" => get_null_pointer),
];

pub fn lookup(name: &str) -> Option<&'static Export> {
    EXPORTS.iter().find(|e| e.name == name)
}

/// Invokes the export called `name`, applying its error policy.
pub fn call<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    name: &str,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let Some(export) = lookup(name) else {
        return Err(RefError::Type {
            op: "call",
            message: format!("{name} is not a function"),
        });
    };
    trace!(op = export.name, argc = args.len(), "call");

    match ((export.handler)(ctx, args), export.policy) {
        (Err(e), ErrorPolicy::FailSoft) => {
            ctx.report(e);
            Ok(Value::Undefined)
        }
        (result, _) => result,
    }
}

/// The constant exports: `sizeof`, `alignof`, `endianness`, `NULL` and `NULL_POINTER`.
pub fn constants<'gc>(ctx: &CallContext<'_, 'gc>) -> ObjectRef<'gc> {
    let gc = ctx.gc;
    let sizes = PRIMITIVES
        .iter()
        .map(|p| (p.name, Value::Number(p.size as f64)));
    let aligns = PRIMITIVES
        .iter()
        .map(|p| (p.name, Value::Number(p.align as f64)));

    ObjectRef::from_properties(
        gc,
        [
            ("sizeof", ObjectRef::from_properties(gc, sizes).into()),
            ("alignof", ObjectRef::from_properties(gc, aligns).into()),
            (
                "endianness",
                Value::String(endianness().as_str().to_string()),
            ),
            ("NULL", ctx.null_view().into()),
            ("NULL_POINTER", ctx.null_pointer().into()),
        ],
    )
}

fn buffer_arg<'gc>(
    op: &'static str,
    args: &[Value<'gc>],
    i: usize,
) -> Result<BufferRef<'gc>, RefError> {
    args.get(i)
        .and_then(Value::as_buffer)
        .ok_or_else(|| RefError::buffer_expected(op))
}

fn offset_arg(args: &[Value<'_>], i: usize) -> i64 {
    args.get(i).map_or(0, Value::to_int64_or_zero)
}

fn flag_arg(args: &[Value<'_>], i: usize) -> bool {
    args.get(i).is_some_and(Value::to_boolean)
}

fn length_arg(args: &[Value<'_>], i: usize) -> usize {
    args.get(i).map_or(0, Value::to_uint32) as usize
}

fn address<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg("address", args, 0)?;
    let addr = unsafe { address::address_with(&buf, offset_arg(args, 1), flag_arg(args, 2)) };
    Ok(Value::Number(addr as f64))
}

fn hex_address<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg("hexAddress", args, 0)?;
    let hex = unsafe { address::hex_address(&buf, offset_arg(args, 1), flag_arg(args, 2)) };
    Ok(Value::String(hex))
}

fn is_null<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg("isNull", args, 0)?;
    Ok(Value::Bool(address::is_null(&buf, offset_arg(args, 1))))
}

fn contains_null_pointer<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "containsNullPointer";
    let buf = buffer_arg(OP, args, 0)?;
    let null = unsafe { address::contains_null_pointer(&buf, offset_arg(args, 1)) }
        .map_err(|e| e.at(OP))?;
    Ok(Value::Bool(null))
}

fn read_object<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg("readObject", args, 0)?;
    let object = unsafe { embed::read_object(ctx.heap, &buf, offset_arg(args, 1)) }
        .map_err(|e| e.at("readObject"))?;
    Ok(object.map_or(Value::Null, Value::Object))
}

fn write_object<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "writeObject";
    let buf = buffer_arg(OP, args, 0)?;
    let offset = offset_arg(args, 1);
    let object = args
        .get(2)
        .and_then(Value::as_object)
        .ok_or_else(|| RefError::type_error(OP, "Object expected"))?;
    let kind = RefKind::from_persistent(flag_arg(args, 3));

    unsafe { embed::write_object(ctx.heap, &buf, offset, object, kind) }.map_err(|e| e.at(OP))?;
    Ok(Value::Undefined)
}

fn read_pointer<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg("readPointer", args, 0)?;
    let offset = offset_arg(args, 1);
    let length = length_arg(args, 2);
    let external = flag_arg(args, 3);

    let view = unsafe { pointer::read_pointer(ctx, &buf, offset, length, external) }
        .map_err(|e| e.at("readPointer"))?;
    Ok(view.into())
}

fn write_pointer<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "writePointer";
    let buf = buffer_arg(OP, args, 0)?;
    let offset = offset_arg(args, 1);
    let input = match args.get(2) {
        Some(Value::Null) => None,
        Some(Value::Buffer(b)) => Some(*b),
        _ => return Err(RefError::type_error(OP, "input must be a Buffer or null")),
    };
    let external = flag_arg(args, 3);

    unsafe { pointer::write_pointer(&buf, offset, input.as_deref(), external) }
        .map_err(|e| e.at(OP))?;
    if let (Some(pointee), false) = (input, external) {
        Buffer::attach(ctx.gc, buf, pointee);
    }
    Ok(Value::Undefined)
}

fn read_from_pointer<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "readFromPointer";
    let slot = buffer_arg(OP, args, 0)?;
    let offset = offset_arg(args, 1);
    let size = length_arg(args, 2);
    let view =
        unsafe { pointer::read_from_pointer(ctx, slot, offset, size) }.map_err(|e| e.at(OP))?;
    Ok(view.into())
}

/// `-1`, `0` or `1` as the first stored address is below, equal to or above the second.
fn compare_pointer<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "comparePointer";
    let a = buffer_arg(OP, args, 0)?;
    let b = buffer_arg(OP, args, 1)?;
    let ordering = pointer::compare_pointer(&a, &b, offset_arg(args, 2), offset_arg(args, 3))
        .map_err(|e| e.at(OP))?;
    Ok(Value::Number(ordering as i8 as f64))
}

fn reference<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let target = buffer_arg("ref", args, 0)?;
    Ok(pointer::reference(ctx, target).into())
}

fn read_int64_as<'gc>(
    op: &'static str,
    args: &[Value<'gc>],
    signed: bool,
    order: ByteOrder,
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg(op, args, 0)?;
    let offset = offset_arg(args, 1);
    let result = unsafe {
        if signed {
            scalar::read_int64(&buf, offset, order)
        } else {
            scalar::read_uint64(&buf, offset, order)
        }
    };
    match result {
        Ok(v) => Ok(v.into()),
        Err(e @ AccessError::NullPointer { .. }) => Err(RefError::type_error(op, e.to_string())),
        Err(e) => Err(e.at(op)),
    }
}

fn write_int64_as<'gc>(
    op: &'static str,
    args: &[Value<'gc>],
    signed: bool,
    order: ByteOrder,
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg(op, args, 0)?;
    let offset = offset_arg(args, 1);
    let input = match args.get(2) {
        Some(Value::Number(n)) => IntInput::Number(*n),
        Some(Value::String(s)) => IntInput::Text(s),
        _ => return Err(RefError::type_error(op, "Number/String 64-bit value required")),
    };
    unsafe {
        if signed {
            scalar::write_int64(&buf, offset, input, order)
        } else {
            scalar::write_uint64(&buf, offset, input, order)
        }
    }
    .map_err(|e| e.at(op))?;
    Ok(Value::Undefined)
}

macro_rules! int64_handlers {
    ($($handler:ident => $via:ident($op:literal, $signed:literal, $order:ident);)*) => {
        $(
            fn $handler<'gc>(
                _ctx: &mut CallContext<'_, 'gc>,
                args: &[Value<'gc>],
            ) -> Result<Value<'gc>, RefError> {
                $via($op, args, $signed, ByteOrder::$order)
            }
        )*
    };
}

int64_handlers! {
    read_int64 => read_int64_as("readInt64", true, Native);
    read_int64_be => read_int64_as("readInt64BE", true, Big);
    read_int64_le => read_int64_as("readInt64LE", true, Little);
    read_uint64 => read_int64_as("readUInt64", false, Native);
    read_uint64_be => read_int64_as("readUInt64BE", false, Big);
    read_uint64_le => read_int64_as("readUInt64LE", false, Little);
    write_int64 => write_int64_as("writeInt64", true, Native);
    write_int64_be => write_int64_as("writeInt64BE", true, Big);
    write_int64_le => write_int64_as("writeInt64LE", true, Little);
    write_uint64 => write_int64_as("writeUInt64", false, Native);
    write_uint64_be => write_int64_as("writeUInt64BE", false, Big);
    write_uint64_le => write_int64_as("writeUInt64LE", false, Little);
}

fn read_c_string<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg("readCString", args, 0)?;
    let s = unsafe { scan::read_c_string(&buf, offset_arg(args, 1)) }
        .map_err(|e| e.at("readCString"))?;
    Ok(Value::String(s))
}

fn write_c_string<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "writeCString";
    let buf = buffer_arg(OP, args, 0)?;
    let offset = offset_arg(args, 1);
    let s = args
        .get(2)
        .and_then(Value::as_str)
        .ok_or_else(|| RefError::type_error(OP, "String expected"))?;
    scan::write_c_string(&buf, offset, s).map_err(|e| e.at(OP))?;
    Ok(Value::Undefined)
}

/// `null`, `undefined` and null buffers map to the `NULL` view.
fn alloc_c_string<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = match args.first() {
        None | Some(Value::Null | Value::Undefined) => ctx.null_view(),
        Some(Value::Buffer(b)) if b.address() == 0 => ctx.null_view(),
        Some(Value::String(s)) => scan::alloc_c_string(ctx, s),
        Some(_) => return Err(RefError::type_error("allocCString", "String expected")),
    };
    Ok(buf.into())
}

fn reinterpret<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = buffer_arg("reinterpret", args, 0)?;
    let view = scan::reinterpret(ctx, buf, length_arg(args, 1), offset_arg(args, 2))
        .map_err(|e| e.at("reinterpret"))?;
    Ok(view.into())
}

fn reinterpret_until_zeros<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "reinterpretUntilZeros";
    let buf = buffer_arg(OP, args, 0)?;
    let view = unsafe {
        scan::reinterpret_until_zeros(ctx, buf, length_arg(args, 1), offset_arg(args, 2))
    }
    .map_err(|e| e.at(OP))?;
    Ok(view.into())
}

fn slot_arg<'gc>(
    op: &'static str,
    args: &[Value<'gc>],
    i: usize,
    ordinal: &str,
) -> Result<BufferRef<'gc>, RefError> {
    args[i].as_buffer().ok_or_else(|| {
        RefError::runtime(op, format!("expect {ordinal} argument Array buffer view"))
    })
}

fn copy_memory<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "copyMemory";
    if args.len() < 3 {
        return Err(RefError::runtime(OP, "expect arguments length greater than 2"));
    }
    let dst = slot_arg(OP, args, 0, "1st")?;
    let src = slot_arg(OP, args, 1, "2nd")?;
    let size = args[2].to_uint32() as usize;

    unsafe { pointer::copy_memory(&dst, &src, size) }.map_err(|e| e.at(OP))?;
    Ok(Value::Undefined)
}

fn add_offset<'gc>(
    _ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    const OP: &str = "addOffset";
    if args.len() < 2 {
        return Err(RefError::runtime(OP, "expect arguments length greater than 1"));
    }
    let slot = slot_arg(OP, args, 0, "1st")?;
    let delta = args[1].to_int32();

    unsafe { pointer::add_offset(&slot, delta) }.map_err(|e| e.at(OP))?;
    Ok(Value::Undefined)
}

fn get_null_pointer<'gc>(
    ctx: &mut CallContext<'_, 'gc>,
    args: &[Value<'gc>],
) -> Result<Value<'gc>, RefError> {
    let buf = if flag_arg(args, 0) {
        ctx.alloc(POINTER_SIZE)
    } else {
        ctx.null_pointer()
    };
    Ok(buf.into())
}
