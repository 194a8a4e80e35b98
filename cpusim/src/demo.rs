//! Small canned circuits for the command line driver and the tests.

use super::*;
use serde_json::json;

use crate::comps::port::DEF_ID as BOUNDARY;

pub const NAMES: &[&str] = &["mux", "counter", "bus", "bridge", "hier"];

/// The built-in components plus `demo/inc`, an incrementer that only exists as a schematic.
pub fn library() -> CompLibrary {
    let mut library = CompLibrary::builtin();
    library.add_schematic("demo/inc", inc_schematic());
    library
}

pub fn schematic(name: &str) -> Option<Schematic> {
    match name {
        "mux" => Some(mux(0)),
        "counter" => Some(counter()),
        "bus" => Some(bus()),
        "bridge" => Some(bridge()),
        "hier" => Some(hier()),
        _ => None,
    }
}

/// `out` shows `a` (5) while `sel` is 0 and `b` (9) otherwise.
pub fn mux(sel: Word) -> Schematic {
    Schematic::new()
        .comp("a", "core/io/input", json!({ "width": 8, "value": 5 }))
        .comp("b", "core/io/input", json!({ "width": 8, "value": 9 }))
        .comp("sel", "core/io/input", json!({ "value": sel }))
        .comp("mux", "core/flow/mux2", json!({ "width": 8 }))
        .comp("out", "core/io/probe", json!({ "width": 8 }))
        .wire("wa", &["a.out", "mux.a"])
        .wire("wb", &["b.out", "mux.b"])
        .wire("wsel", &["sel.out", "mux.sel"])
        .wire("wout", &["mux.out", "out.in"])
}

/// An 8-bit register incremented on every clock. Setting `stop` halts the simulation.
pub fn counter() -> Schematic {
    Schematic::new()
        .comp("count", "core/reg/reg", json!({ "width": 8 }))
        .comp("one", "core/io/const", json!({ "width": 8, "value": 1 }))
        .comp("inc", "core/math/adder", json!({ "width": 8 }))
        .comp("out", "core/io/probe", json!({ "width": 8 }))
        .comp("stop", "core/io/input", json!({}))
        .comp("halt", "core/ctrl/halt", json!({ "reason": "Stop switch set" }))
        .wire("q", &["count.q", "inc.a", "out.in"])
        .wire("w1", &["one.out", "inc.b"])
        .wire("next", &["inc.out", "count.d"])
        .wire("wstop", &["stop.out", "halt.in"])
}

/// Two tri-state buffers and a RAM sharing one 8-bit bus.
pub fn bus() -> Schematic {
    Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 5 }))
        .comp("y", "core/io/input", json!({ "width": 8, "value": 9 }))
        .comp("en_x", "core/io/input", json!({ "value": 1 }))
        .comp("en_y", "core/io/input", json!({ "value": 0 }))
        .comp("tx", "core/flow/tribuf", json!({ "width": 8 }))
        .comp("ty", "core/flow/tribuf", json!({ "width": 8 }))
        .comp("addr", "core/io/input", json!({ "width": 4 }))
        .comp("we", "core/io/input", json!({}))
        .comp("oe", "core/io/input", json!({}))
        .comp("ram", "core/mem/ram", json!({ "width": 8, "addrWidth": 4 }))
        .comp("probe", "core/io/probe", json!({ "width": 8 }))
        .wire("wx", &["x.out", "tx.in"])
        .wire("wy", &["y.out", "ty.in"])
        .wire("wen_x", &["en_x.out", "tx.en"])
        .wire("wen_y", &["en_y.out", "ty.en"])
        .wire("waddr", &["addr.out", "ram.addr"])
        .wire("wwe", &["we.out", "ram.we"])
        .wire("woe", &["oe.out", "ram.oe"])
        .wire("bus", &["tx.out", "ty.out", "ram.data", "probe.in"])
}

/// Two buses joined by a bridge. `x` drives bus A, `y` drives bus B.
pub fn bridge() -> Schematic {
    Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 5 }))
        .comp("y", "core/io/input", json!({ "width": 8, "value": 9 }))
        .comp("en_x", "core/io/input", json!({ "value": 1 }))
        .comp("en_y", "core/io/input", json!({ "value": 0 }))
        .comp("tx", "core/flow/tribuf", json!({ "width": 8 }))
        .comp("ty", "core/flow/tribuf", json!({ "width": 8 }))
        .comp("en", "core/io/input", json!({ "value": 1 }))
        .comp("dir", "core/io/input", json!({ "value": 0 }))
        .comp("bridge", "core/bus/bridge", json!({ "width": 8 }))
        .comp("pa", "core/io/probe", json!({ "width": 8 }))
        .comp("pb", "core/io/probe", json!({ "width": 8 }))
        .wire("wx", &["x.out", "tx.in"])
        .wire("wy", &["y.out", "ty.in"])
        .wire("wen_x", &["en_x.out", "tx.en"])
        .wire("wen_y", &["en_y.out", "ty.en"])
        .wire("wen", &["en.out", "bridge.en"])
        .wire("wdir", &["dir.out", "bridge.dir"])
        .wire("bus_a", &["tx.out", "bridge.a", "pa.in"])
        .wire("bus_b", &["ty.out", "bridge.b", "pb.in"])
}

/// `x` through the `demo/inc` sub-schematic.
pub fn hier() -> Schematic {
    Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 41 }))
        .comp("inc", "demo/inc", json!({}))
        .comp("out", "core/io/probe", json!({ "width": 8 }))
        .wire("wx", &["x.out", "inc.i"])
        .wire("wout", &["inc.o", "out.in"])
}

/// The same circuit as [`hier`] with the incrementer placed inline.
pub fn hier_flat() -> Schematic {
    Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 41 }))
        .comp("one", "core/io/const", json!({ "width": 8, "value": 1 }))
        .comp("add", "core/math/adder", json!({ "width": 8 }))
        .comp("out", "core/io/probe", json!({ "width": 8 }))
        .wire("wx", &["x.out", "add.a"])
        .wire("w1", &["one.out", "add.b"])
        .wire("wout", &["add.out", "out.in"])
}

fn inc_schematic() -> Schematic {
    Schematic::new()
        .comp("i", BOUNDARY, json!({ "dir": "in", "width": 8 }))
        .comp("o", BOUNDARY, json!({ "dir": "out", "width": 8 }))
        .comp("one", "core/io/const", json!({ "width": 8, "value": 1 }))
        .comp("add", "core/math/adder", json!({ "width": 8 }))
        .wire("wi", &["i.a", "add.a"])
        .wire("w1", &["one.out", "add.b"])
        .wire("wo", &["add.out", "o.a"])
}
