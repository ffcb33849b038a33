use memref::{
    bindings::call,
    memory::POINTER_SIZE,
    value::{Value, WideInt},
    CallContext, Runtime,
};

fn num<'gc>(n: f64) -> Value<'gc> {
    Value::Number(n)
}

fn text<'gc>(s: &str) -> Value<'gc> {
    Value::String(s.to_string())
}

fn address_of<'gc>(ctx: &mut CallContext<'_, 'gc>, v: Value<'gc>) -> f64 {
    match call(ctx, "address", &[v]).unwrap() {
        Value::Number(n) => n,
        other => panic!("address returned {other:?}"),
    }
}

#[test]
fn is_null_agrees_with_address() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.alloc(4);
        let null = ctx.null_view();
        for (b, offset) in [(buf, 0.0), (buf, 3.0), (null, 0.0), (null, 1.0)] {
            let is_null = call(ctx, "isNull", &[b.into(), num(offset)]).unwrap();
            let addr = address_of(ctx, b.into()) + offset;
            assert_eq!(is_null, Value::Bool(addr == 0.0));
        }
        assert_eq!(
            call(ctx, "hexAddress", &[null.into()]).unwrap(),
            text("0")
        );
    });
}

#[test]
fn signed_round_trip() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.alloc(8);
        let cases = [
            (num(9007199254740992.0), num(9007199254740992.0)),
            (num(-9007199254740992.0), num(-9007199254740992.0)),
            (num(-42.9), num(-42.0)),
            (text("9007199254740993"), text("9007199254740993")),
            (text("-9223372036854775808"), text("-9223372036854775808")),
            (text("0x10"), num(16.0)),
        ];
        for (input, expected) in cases {
            call(ctx, "writeInt64", &[buf.into(), num(0.0), input]).unwrap();
            assert_eq!(call(ctx, "readInt64", &[buf.into(), num(0.0)]).unwrap(), expected);
        }
    });
}

#[test]
fn unsigned_round_trip_and_overflow() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.alloc(8);
        call(ctx, "writeUInt64", &[buf.into(), num(0.0), text("18446744073709551615")]).unwrap();
        assert_eq!(
            call(ctx, "readUInt64", &[buf.into(), num(0.0)]).unwrap(),
            Value::from(WideInt::from_u64(u64::MAX))
        );

        let err = call(ctx, "writeUInt64", &[buf.into(), num(0.0), text("18446744073709551616")])
            .unwrap_err();
        assert!(err.is_type_error());
        assert!(err.to_string().contains("out of range"));

        // the failed write stored nothing
        assert_eq!(
            call(ctx, "readUInt64", &[buf.into(), num(0.0)]).unwrap(),
            text("18446744073709551615")
        );

        call(ctx, "writeUInt64", &[buf.into(), num(0.0), text("9007199254740992")]).unwrap();
        assert_eq!(
            call(ctx, "readUInt64", &[buf.into(), num(0.0)]).unwrap(),
            num(9_007_199_254_740_992.0)
        );
        call(ctx, "writeUInt64", &[buf.into(), num(0.0), text("9007199254740993")]).unwrap();
        assert_eq!(
            call(ctx, "readUInt64", &[buf.into(), num(0.0)]).unwrap(),
            text("9007199254740993")
        );
    });
}

#[test]
fn byte_order_variants() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.alloc(8);
        call(ctx, "writeInt64BE", &[buf.into(), num(0.0), num(1.0)]).unwrap();
        assert_eq!(unsafe { buf.as_bytes() }, &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(call(ctx, "readInt64BE", &[buf.into()]).unwrap(), num(1.0));

        call(ctx, "writeUInt64LE", &[buf.into(), num(0.0), num(2.0)]).unwrap();
        assert_eq!(unsafe { buf.as_bytes() }, &[2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(call(ctx, "readUInt64LE", &[buf.into()]).unwrap(), num(2.0));
    });
}

#[test]
fn pointer_slot_round_trip() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let target = ctx.buffer_from(b"payload");
        let slot = ctx.alloc(POINTER_SIZE);
        call(ctx, "writePointer", &[slot.into(), num(0.0), target.into()]).unwrap();
        assert_eq!(slot.attached_count(), 1);

        let view = call(ctx, "readPointer", &[slot.into(), num(0.0), num(7.0)]).unwrap();
        assert_eq!(address_of(ctx, view.clone()), address_of(ctx, target.into()));
        assert_eq!(unsafe { view.as_buffer().unwrap().as_bytes() }, b"payload");

        call(ctx, "writePointer", &[slot.into(), num(0.0), Value::Null]).unwrap();
        let is_null = call(ctx, "containsNullPointer", &[slot.into()]).unwrap();
        assert_eq!(is_null, Value::Bool(true));

        let err = call(ctx, "writePointer", &[slot.into(), num(0.0), num(5.0)]).unwrap_err();
        assert!(err.is_type_error());
    });
}

#[test]
fn write_pointer_out_of_bounds_leaves_memory() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let target = ctx.alloc(1);
        let dst = ctx.buffer_from(&[0x5a; POINTER_SIZE + 2]);
        for offset in [3.0, -1.0, 1e12] {
            let err = call(ctx, "writePointer", &[dst.into(), num(offset), target.into()])
                .unwrap_err();
            assert!(!err.is_type_error());
            assert!(err.to_string().contains("offset + pointer size"));
        }
        assert!(unsafe { dst.as_bytes() }.iter().all(|b| *b == 0x5a));
        assert_eq!(dst.attached_count(), 0);
    });
}

#[test]
fn external_pointer_mode() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let target = ctx.buffer_from(b"abc");
        let slot = ctx.alloc(POINTER_SIZE);
        call(ctx, "writePointer", &[slot.into(), num(0.0), target.into()]).unwrap();

        let holder = call(
            ctx,
            "readPointer",
            &[slot.into(), num(0.0), num(0.0), Value::Bool(true)],
        )
        .unwrap();
        let holder_buf = holder.as_buffer().unwrap();
        assert_eq!(holder_buf.len(), POINTER_SIZE);

        let stored = call(ctx, "address", &[holder.clone(), num(0.0), Value::Bool(true)]).unwrap();
        assert_eq!(stored, num(target.address() as f64));

        let copy = ctx.alloc(POINTER_SIZE);
        call(
            ctx,
            "writePointer",
            &[copy.into(), num(0.0), holder, Value::Bool(true)],
        )
        .unwrap();
        assert_eq!(
            call(ctx, "hexAddress", &[copy.into(), num(0.0), Value::Bool(true)]).unwrap(),
            text(&format!("{:x}", target.address()))
        );
        // external mode copies an address, it does not keep the holder alive
        assert_eq!(copy.attached_count(), 0);
    });
}

#[test]
fn reinterpret_views() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.buffer_from(b"0123456789");
        let view = call(ctx, "reinterpret", &[buf.into(), num(5.0), num(2.0)]).unwrap();
        assert_eq!(address_of(ctx, view.clone()), address_of(ctx, buf.into()) + 2.0);
        let view = view.as_buffer().unwrap();
        assert_eq!(view.len(), 5);
        assert_eq!(unsafe { view.as_bytes() }, b"23456");

        let data = ctx.buffer_from(&[0x41, 0x42, 0, 0, 0x43]);
        let scanned = call(ctx, "reinterpretUntilZeros", &[data.into(), num(2.0)])
            .unwrap()
            .as_buffer()
            .unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned.address(), data.address());

        let null = ctx.null_view();
        let err = call(ctx, "reinterpret", &[null.into(), num(4.0)]).unwrap_err();
        assert!(err.to_string().contains("Cannot reinterpret from NULL pointer"));
    });
}

#[test]
fn c_strings() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.buffer_from(b"hello\0world\0");
        assert_eq!(call(ctx, "readCString", &[buf.into()]).unwrap(), text("hello"));
        assert_eq!(
            call(ctx, "readCString", &[buf.into(), num(6.0)]).unwrap(),
            text("world")
        );
    });
}

#[test]
fn c_string_write_and_alloc() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.alloc(20);
        call(ctx, "writeCString", &[buf.into(), num(0.0), text("hello world")]).unwrap();
        assert_eq!(&unsafe { buf.as_bytes() }[..12], b"hello world\0");

        let short = ctx.alloc(4);
        let err = call(ctx, "writeCString", &[short.into(), num(0.0), text("four")]).unwrap_err();
        assert!(!err.is_type_error());
        assert!(unsafe { short.as_bytes() }.iter().all(|b| *b == 0));

        let alloc = call(ctx, "allocCString", &[text("hello world")]).unwrap();
        assert_eq!(call(ctx, "readCString", &[alloc]).unwrap(), text("hello world"));

        let null = ctx.null_view();
        let alloc = call(ctx, "allocCString", &[null.into()]).unwrap();
        assert_eq!(call(ctx, "isNull", &[alloc]).unwrap(), Value::Bool(true));
    });
}

#[test]
fn read_from_pointer_reads_at_target_offset() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let src = ctx.alloc(8);
        call(ctx, "writeInt64LE", &[src.into(), num(0.0), num((5u64 << 32) as f64)]).unwrap();
        let slot = ctx.alloc(POINTER_SIZE);
        call(ctx, "writePointer", &[slot.into(), num(0.0), src.into()]).unwrap();

        let view = call(ctx, "readFromPointer", &[slot.into(), num(4.0), num(4.0)])
            .unwrap()
            .as_buffer()
            .unwrap();
        assert_eq!(unsafe { view.as_bytes() }, &[5, 0, 0, 0]);

        let empty = ctx.alloc(POINTER_SIZE);
        let err = call(ctx, "readFromPointer", &[empty.into(), num(0.0), num(1.0)]).unwrap_err();
        assert!(err.to_string().contains("Cannot read from NULL pointer"));
    });
}

#[test]
fn compare_pointer_slots() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let a = ctx.buffer_from(b"hello");
        let b = ctx.buffer_from(b"world");
        let first = ctx.alloc(2 * POINTER_SIZE);
        let second = ctx.alloc(POINTER_SIZE);
        let next = num(POINTER_SIZE as f64);
        call(ctx, "writePointer", &[first.into(), num(0.0), a.into()]).unwrap();
        call(ctx, "writePointer", &[first.into(), next.clone(), a.into()]).unwrap();
        call(ctx, "writePointer", &[second.into(), num(0.0), b.into()]).unwrap();

        let same = call(ctx, "comparePointer", &[first.into(), first.into(), num(0.0), next])
            .unwrap();
        assert_eq!(same, num(0.0));

        let differ = call(ctx, "comparePointer", &[first.into(), second.into()]).unwrap();
        assert_ne!(differ, num(0.0));
        let reversed = call(ctx, "comparePointer", &[second.into(), first.into()]).unwrap();
        match (differ, reversed) {
            (Value::Number(x), Value::Number(y)) => assert_eq!(x, -y),
            other => panic!("comparePointer returned {other:?}"),
        }
    });
}

#[test]
fn ref_keeps_target_alive() {
    let mut rt = Runtime::new();
    let holder = rt.mutate(|ctx| {
        let target = ctx.buffer_from(b"referenced");
        let holder = call(ctx, "ref", &[target.into()]).unwrap();
        ctx.root(holder)
    });

    rt.collect();

    rt.mutate(|ctx| {
        let holder = ctx.fetch(&holder);
        assert_eq!(holder.as_buffer().map(|b| b.len()), Some(POINTER_SIZE));
        let view = call(ctx, "readPointer", &[holder, num(0.0), num(10.0)])
            .unwrap()
            .as_buffer()
            .unwrap();
        assert_eq!(unsafe { view.as_bytes() }, b"referenced");
    });
}

#[test]
fn copy_memory_and_add_offset() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let src = ctx.buffer_from(b"abc");
        let dst = ctx.buffer_from(b"xyz");
        let src_slot = ctx.alloc(POINTER_SIZE);
        let dst_slot = ctx.alloc(POINTER_SIZE);
        call(ctx, "writePointer", &[src_slot.into(), num(0.0), src.into()]).unwrap();
        call(ctx, "writePointer", &[dst_slot.into(), num(0.0), dst.into()]).unwrap();

        call(ctx, "copyMemory", &[dst_slot.into(), src_slot.into(), num(2.0)]).unwrap();
        assert_eq!(unsafe { dst.as_bytes() }, b"abz");

        call(ctx, "addOffset", &[dst_slot.into(), num(2.0)]).unwrap();
        call(ctx, "copyMemory", &[dst_slot.into(), src_slot.into(), num(1.0)]).unwrap();
        assert_eq!(unsafe { dst.as_bytes() }, b"aba");
        assert!(ctx.reported().is_empty());
    });
}

#[test]
fn fail_soft_reports_and_continues() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let src = ctx.buffer_from(b"abc");
        let dst = ctx.buffer_from(b"xyz");

        let r = call(ctx, "copyMemory", &[dst.into(), src.into()]).unwrap();
        assert_eq!(r, Value::Undefined);
        assert_eq!(unsafe { dst.as_bytes() }, b"xyz");

        call(ctx, "copyMemory", &[num(1.0), src.into(), num(1.0)]).unwrap();
        call(ctx, "addOffset", &[dst.into()]).unwrap();
        let short = ctx.alloc(1);
        call(ctx, "addOffset", &[short.into(), num(1.0)]).unwrap();

        let reported = ctx.take_reported();
        let messages: Vec<_> = reported.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages.len(), 4, "{messages:?}");
        assert!(messages[0].contains("expect arguments length greater than 2"));
        assert!(messages[1].contains("expect 1st argument Array buffer view"));
        assert!(messages[2].contains("expect arguments length greater than 1"));
        assert!(messages[3].contains("cannot hold a pointer"));
        assert!(ctx.reported().is_empty());
    });
}

#[test]
fn embedded_object_identity() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let buf = ctx.alloc(POINTER_SIZE * 2);
        let obj = ctx.object();
        call(ctx, "writeObject", &[buf.into(), num(8.0), obj.into()]).unwrap();
        assert_eq!(
            call(ctx, "readObject", &[buf.into(), num(8.0)]).unwrap(),
            Value::Object(obj)
        );
        assert_eq!(
            call(ctx, "readObject", &[buf.into(), num(0.0)]).unwrap(),
            Value::Null
        );
    });
}

#[test]
fn weak_reference_cleared_by_collection() {
    let mut rt = Runtime::new();
    let cell = rt.mutate(|ctx| {
        let buf = ctx.alloc(POINTER_SIZE);
        let obj = ctx.object();
        call(ctx, "writeObject", &[buf.into(), num(0.0), obj.into()]).unwrap();
        ctx.root(buf)
    });
    assert_eq!(rt.live_handles(), 1);

    rt.collect();

    assert_eq!(rt.live_handles(), 0);
    rt.mutate(|ctx| {
        let buf = ctx.fetch(&cell);
        assert_eq!(call(ctx, "readObject", &[buf, num(0.0)]).unwrap(), Value::Null);
    });
}

#[test]
fn persistent_reference_survives_collection() {
    let mut rt = Runtime::new();
    let cell = rt.mutate(|ctx| {
        let buf = ctx.alloc(POINTER_SIZE);
        let obj = ctx.object();
        obj.set(ctx.gc, "tag", num(7.0));
        call(
            ctx,
            "writeObject",
            &[buf.into(), num(0.0), obj.into(), Value::Bool(true)],
        )
        .unwrap();
        ctx.root(buf)
    });

    rt.collect();
    rt.collect();

    assert_eq!(rt.live_handles(), 1);
    rt.mutate(|ctx| {
        let buf = ctx.fetch(&cell);
        let obj = call(ctx, "readObject", &[buf, num(0.0)])
            .unwrap()
            .as_object()
            .unwrap();
        assert_eq!(obj.get("tag"), Some(num(7.0)));
    });
}

#[test]
fn rewriting_a_cell_reuses_its_handle() {
    let mut rt = Runtime::new();
    let cell = rt.mutate(|ctx| {
        let buf = ctx.alloc(POINTER_SIZE);
        for persistent in [false, true, true, false, true] {
            let obj = ctx.object();
            call(
                ctx,
                "writeObject",
                &[buf.into(), num(0.0), obj.into(), Value::Bool(persistent)],
            )
            .unwrap();
        }
        ctx.root(buf)
    });
    assert_eq!(rt.live_handles(), 1);

    // the last write was persistent, so the entry survives
    rt.collect();
    assert_eq!(rt.live_handles(), 1);
    rt.mutate(|ctx| {
        let buf = ctx.fetch(&cell);
        assert!(call(ctx, "readObject", &[buf, num(0.0)])
            .unwrap()
            .as_object()
            .is_some());
    });
}

#[test]
fn pointee_kept_alive_through_slot() {
    let mut rt = Runtime::new();
    let slot = rt.mutate(|ctx| {
        let target = ctx.buffer_from(b"still here");
        let slot = ctx.alloc(POINTER_SIZE);
        call(ctx, "writePointer", &[slot.into(), num(0.0), target.into()]).unwrap();
        ctx.root(slot)
    });

    rt.collect();

    rt.mutate(|ctx| {
        let slot = ctx.fetch(&slot);
        let view = call(ctx, "readPointer", &[slot, num(0.0), num(10.0)])
            .unwrap()
            .as_buffer()
            .unwrap();
        assert_eq!(unsafe { view.as_bytes() }, b"still here");
    });
}

#[test]
fn oversized_view_is_rejected() {
    let rt = Runtime::with_options(memref::RuntimeOptions {
        max_length: 16,
        ..Default::default()
    });
    rt.mutate(|ctx| {
        let buf = ctx.alloc(4);
        let err = call(ctx, "reinterpret", &[buf.into(), num(17.0)]).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum buffer length 16"));
        assert!(call(ctx, "reinterpret", &[buf.into(), num(16.0)]).is_ok());
    });
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn native_symbol_view() {
    let rt = Runtime::new();
    rt.mutate(|ctx| {
        let view = ctx.symbol_view("libc.so.6", "strlen").unwrap();
        assert_eq!(view.len(), 0);
        assert_ne!(view.address(), 0);

        let err = ctx.symbol_view("libc.so.6", "no_such_symbol_here").unwrap_err();
        assert!(err.to_string().contains("no_such_symbol_here"));
    });
}
