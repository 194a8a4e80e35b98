use cpusim::comps::basic::{Input, Probe};
use cpusim::comps::ram::Ram;
use cpusim::comps::reg::Reg;
use cpusim::demo;
use cpusim::Diagnostic;
use cpusim::Schematic;
use cpusim::Sim;
use serde_json::json;

fn set(sim: &mut Sim, input: &str, value: u64) {
    sim.instance_mut::<Input>(input).unwrap().set(value);
}

#[test]
fn test_counter() {
    let mut sim = Sim::new(&demo::library(), &demo::counter());
    for expected in 1..=5 {
        sim.step();
        assert_eq!(sim.peek("q").unwrap(), expected);
        assert_eq!(sim.instance::<Probe>("out").unwrap().value(), expected);
    }

    set(&mut sim, "stop", 1);
    sim.settle();
    assert!(sim.halted());
    assert_eq!(sim.halt_reason(), Some("Stop switch set"));

    sim.step();
    assert_eq!(sim.peek("q").unwrap(), 5);
    assert_eq!(sim.clock_ticks(), 5);
}

#[test]
fn test_counter_wraps() {
    let mut sim = Sim::new(&demo::library(), &demo::counter());
    for _ in 0..256 {
        sim.step();
    }
    assert_eq!(sim.peek("q").unwrap(), 0);
}

#[test]
fn test_settle_is_idempotent() {
    for name in demo::NAMES {
        let mut sim = Sim::new(&demo::library(), &demo::schematic(name).unwrap());
        let before: Vec<_> = (0..sim.system().nets.len()).map(|net| sim.net_state(net)).collect();
        sim.settle();
        let after: Vec<_> = (0..sim.system().nets.len()).map(|net| sim.net_state(net)).collect();
        assert_eq!(before, after, "{name}");
    }
}

#[test]
fn test_tristate_bus() {
    let mut sim = Sim::new(&demo::library(), &demo::bus());
    let bus = sim.net_idx("bus").unwrap();
    assert_eq!(sim.peek("bus").unwrap(), 5);
    assert_eq!(sim.net_state(bus).unwrap().enabled_count, 1);
    assert!(sim.instance::<Probe>("probe").unwrap().resolved());

    set(&mut sim, "en_x", 0);
    set(&mut sim, "en_y", 1);
    sim.settle();
    assert_eq!(sim.peek("bus").unwrap(), 9);
}

#[test]
fn test_tristate_conflict_keeps_value() {
    let mut sim = Sim::new(&demo::library(), &demo::bus());
    set(&mut sim, "en_y", 1);
    sim.settle();

    let bus = sim.net_idx("bus").unwrap();
    assert_eq!(sim.net_state(bus).unwrap().enabled_count, 2);
    assert!(sim.system().nets[bus].is_conflicted());
    assert_eq!(sim.peek("bus").unwrap(), 5);
    assert!(!sim.instance::<Probe>("probe").unwrap().resolved());
}

#[test]
fn test_floating_bus_keeps_value() {
    let mut sim = Sim::new(&demo::library(), &demo::bus());
    set(&mut sim, "en_x", 0);
    sim.settle();

    let bus = sim.net_idx("bus").unwrap();
    assert_eq!(sim.net_state(bus).unwrap().enabled_count, 0);
    assert!(sim.system().nets[bus].is_floating());
    assert_eq!(sim.peek("bus").unwrap(), 5);
    let probe = sim.instance::<Probe>("probe").unwrap();
    assert_eq!(probe.value(), 5);
    assert!(!probe.resolved());
}

#[test]
fn test_ram_reset() {
    let mut sim = Sim::new(&demo::library(), &demo::bus());
    set(&mut sim, "addr", 3);
    set(&mut sim, "we", 1);
    sim.settle();
    sim.latch();
    assert_eq!(sim.instance::<Ram>("ram").unwrap().read(3), Some(5));

    // read it back with nothing else on the bus
    set(&mut sim, "we", 0);
    set(&mut sim, "oe", 1);
    set(&mut sim, "en_x", 0);
    set(&mut sim, "x", 0);
    sim.settle();
    assert_eq!(sim.peek("bus").unwrap(), 5);

    sim.reset(false);
    assert_eq!(sim.instance::<Ram>("ram").unwrap().read(3), Some(5));
    assert_eq!(sim.peek("bus").unwrap(), 5);

    sim.reset(true);
    assert_eq!(sim.instance::<Ram>("ram").unwrap().read(3), Some(0));
    assert_eq!(sim.peek("bus").unwrap(), 0);
}

#[test]
fn test_bridge() {
    let mut sim = Sim::new(&demo::library(), &demo::bridge());
    assert_eq!(sim.peek("bus_a").unwrap(), 5);
    assert_eq!(sim.peek("bus_b").unwrap(), 5);
    assert_eq!(sim.instance::<Probe>("pb").unwrap().value(), 5);
    assert_eq!(sim.executed_blocks().len(), sim.schedule().blocks.len());

    set(&mut sim, "dir", 1);
    set(&mut sim, "en_x", 0);
    set(&mut sim, "en_y", 1);
    sim.settle();
    assert_eq!(sim.peek("bus_b").unwrap(), 9);
    assert_eq!(sim.peek("bus_a").unwrap(), 9);
    assert_eq!(sim.instance::<Probe>("pa").unwrap().value(), 9);
    assert!(sim.instance::<Probe>("pa").unwrap().resolved());

    // disabled: bus A floats and keeps its value
    set(&mut sim, "en", 0);
    set(&mut sim, "y", 7);
    sim.settle();
    assert_eq!(sim.peek("bus_b").unwrap(), 7);
    assert_eq!(sim.peek("bus_a").unwrap(), 9);
    assert!(!sim.instance::<Probe>("pa").unwrap().resolved());
}

#[test]
fn test_hierarchy_matches_flat() {
    let library = demo::library();
    let hier = Sim::new(&library, &demo::hier());
    let flat = Sim::new(&library, &demo::hier_flat());

    assert_eq!(hier.peek("wout").unwrap(), 42);
    assert_eq!(flat.peek("wout").unwrap(), 42);
    assert_eq!(hier.peek("inc|wo").unwrap(), 42);
    assert!(hier.comp_idx("inc|add").is_ok());
    assert!(hier.diagnostics().next().is_none());
}

#[test]
fn test_rebuild_carries_state() {
    let library = demo::library();
    let mut sim = Sim::new(&library, &demo::counter());
    for _ in 0..3 {
        sim.step();
    }

    let edited = demo::counter().comp("extra", "core/io/probe", json!({ "width": 8 })).wire("wextra", &["count.q", "extra.in"]);
    sim.rebuild(&library, &edited);
    assert_eq!(sim.instance::<Reg>("count").unwrap().value(), 3);
    assert_eq!(sim.peek("q").unwrap(), 3);
    assert_eq!(sim.instance::<Probe>("extra").unwrap().value(), 3);

    sim.step();
    assert_eq!(sim.peek("q").unwrap(), 4);
}

#[test]
fn test_diagnostics_do_not_abort() {
    let schematic = Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 3 }))
        .comp("narrow", "core/io/probe", json!({ "width": 4 }))
        .comp("wide", "core/io/probe", json!({ "width": 8 }))
        .comp("mystery", "vendor/unknown", json!({}))
        .wire("w", &["x.out", "narrow.in", "wide.in"])
        .wire("dangling", &["ghost.out", "wide.in2"]);
    let sim = Sim::new(&demo::library(), &schematic);

    let diagnostics: Vec<&Diagnostic> = sim.diagnostics().collect();
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::WidthMismatch(net, 8, 4) if net == "w")));
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::UnknownComponent(_wire, comp) if comp == "ghost")));
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::UnknownPort(_path, port) if port == "in2")));
    assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::UnknownComponentDef(_path, def_id) if def_id == "vendor/unknown")));

    assert_eq!(sim.peek("w").unwrap(), 3);
    assert_eq!(sim.instance::<Probe>("wide").unwrap().value(), 3);
    assert_eq!(sim.instance::<Probe>("narrow").unwrap().value(), 0);
}

#[test]
fn test_multiple_drivers() {
    let schematic = Schematic::new()
        .comp("x", "core/io/input", json!({ "value": 1 }))
        .comp("y", "core/io/input", json!({ "value": 1 }))
        .wire("w", &["x.out", "y.out"]);
    let sim = Sim::new(&demo::library(), &schematic);
    assert!(sim.diagnostics().any(|d| *d == Diagnostic::MultipleDrivers("w".to_string(), 2)));
    assert_eq!(sim.peek("w").unwrap(), 0);
}

/// A tri-state buffer behind boundary ports, driving out through a tri-state pin.
fn bus_driver() -> Schematic {
    Schematic::new()
        .comp("in", "core/comp/port", json!({ "dir": "in", "width": 8, "data": true }))
        .comp("en", "core/comp/port", json!({ "dir": "in", "width": 1, "ctrl": true }))
        .comp("out", "core/comp/port", json!({ "dir": "out", "width": 8, "tristate": true, "data": true }))
        .comp("buf", "core/flow/tribuf", json!({ "width": 8 }))
        .wire("wi", &["in.a", "buf.in"])
        .wire("wen", &["en.a", "buf.en"])
        .wire("wo", &["buf.out", "out.a"])
}

#[test]
fn test_hierarchical_bus_drivers() {
    let mut library = demo::library();
    library.add_schematic("demo/drv", bus_driver());
    let schematic = Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 5 }))
        .comp("y", "core/io/input", json!({ "width": 8, "value": 9 }))
        .comp("en_x", "core/io/input", json!({ "value": 1 }))
        .comp("en_y", "core/io/input", json!({ "value": 0 }))
        .comp("dx", "demo/drv", json!({}))
        .comp("dy", "demo/drv", json!({}))
        .comp("probe", "core/io/probe", json!({ "width": 8 }))
        .wire("wx", &["x.out", "dx.in"])
        .wire("wy", &["y.out", "dy.in"])
        .wire("wen_x", &["en_x.out", "dx.en"])
        .wire("wen_y", &["en_y.out", "dy.en"])
        .wire("bus", &["dx.out", "dy.out", "probe.in"]);
    let mut sim = Sim::new(&library, &schematic);
    let bus = sim.net_idx("bus").unwrap();

    assert!(sim.diagnostics().next().is_none());
    assert!(sim.net_state(bus).unwrap().tristate);
    assert_eq!(sim.net_state(bus).unwrap().enabled_count, 1);
    assert_eq!(sim.peek("bus").unwrap(), 5);

    set(&mut sim, "en_x", 0);
    set(&mut sim, "en_y", 1);
    sim.settle();
    assert_eq!(sim.peek("bus").unwrap(), 9);
    assert_eq!(sim.net_state(bus).unwrap().enabled_count, 1);

    set(&mut sim, "en_y", 0);
    sim.settle();
    assert_eq!(sim.net_state(bus).unwrap().enabled_count, 0);
    assert_eq!(sim.peek("bus").unwrap(), 9);
    assert!(!sim.instance::<Probe>("probe").unwrap().resolved());

    set(&mut sim, "en_x", 1);
    set(&mut sim, "en_y", 1);
    sim.settle();
    assert_eq!(sim.net_state(bus).unwrap().enabled_count, 2);
}

#[test]
fn test_latch_settle_latch_with_constant_inputs() {
    let schematic = Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 7 }))
        .comp("r", "core/reg/reg", json!({ "width": 8 }))
        .comp("out", "core/io/probe", json!({ "width": 8 }))
        .wire("wd", &["x.out", "r.d"])
        .wire("wq", &["r.q", "out.in"]);
    let mut sim = Sim::new(&demo::library(), &schematic);
    assert_eq!(sim.instance::<Reg>("r").unwrap().value(), 0);

    sim.latch();
    assert_eq!(sim.instance::<Reg>("r").unwrap().value(), 7);
    sim.settle();
    let settled: Vec<_> = (0..sim.system().nets.len()).map(|net| sim.net_state(net)).collect();

    sim.latch();
    assert_eq!(sim.instance::<Reg>("r").unwrap().value(), 7);
    sim.settle();
    let again: Vec<_> = (0..sim.system().nets.len()).map(|net| sim.net_state(net)).collect();
    assert_eq!(settled, again);
    assert_eq!(sim.peek("wq").unwrap(), 7);
}

#[test]
fn test_blocks_fire_after_their_predecessors() {
    for name in demo::NAMES {
        let sim = Sim::new(&demo::library(), &demo::schematic(name).unwrap());
        let schedule = sim.schedule();
        let mut fired_at = vec![usize::MAX; schedule.blocks.len()];
        for (order, &block_idx) in sim.executed_blocks().iter().enumerate() {
            fired_at[block_idx] = order;
        }

        assert!(fired_at.iter().all(|&order| order != usize::MAX), "{name}");
        for (block_idx, block) in schedule.blocks.iter().enumerate() {
            for &target in &block.decr_block_targets {
                assert!(fired_at[block_idx] < fired_at[target], "{name}: block {block_idx} -> {target}");
            }
        }
    }
}
