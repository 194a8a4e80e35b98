use crate::comps::basic::{Input, Probe};
use crate::comps::reg::Reg;
use crate::demo;
use crate::sim::Sim;
use crate::*;
use serde_json::json;

#[test]
fn test_mux() {
    let mut sim = Sim::new(&demo::library(), &demo::mux(0));
    assert_eq!(sim.peek("wout").unwrap(), 5);
    assert_eq!(sim.instance::<Probe>("out").unwrap().value(), 5);

    sim.instance_mut::<Input>("sel").unwrap().set(1);
    sim.settle();
    assert_eq!(sim.peek("wout").unwrap(), 9);
    assert_eq!(sim.peek_port("mux.out").unwrap(), 9);
    assert_eq!(sim.executed_blocks().len(), sim.schedule().blocks.len());
}

#[test]
fn test_usage() {
    let mut sim = Sim::new(&demo::library(), &demo::mux(0)).with_usage_tracking(true);
    let a = sim.comp_idx("a").unwrap();
    let b = sim.comp_idx("b").unwrap();
    let mux = sim.comp_idx("mux").unwrap();

    assert!(sim.port_state(a, "out").unwrap().used);
    assert!(!sim.port_state(b, "out").unwrap().used);
    assert!(sim.port_state(mux, "sel").unwrap().used);
    assert!(!sim.port_state(mux, "b").unwrap().used);

    sim.instance_mut::<Input>("sel").unwrap().set(1);
    sim.settle();
    assert!(!sim.port_state(a, "out").unwrap().used);
    assert!(sim.port_state(b, "out").unwrap().used);
}

#[test]
fn test_phase_without_outputs_uses_its_inputs() {
    let sim = Sim::new(&demo::library(), &demo::mux(0)).with_usage_tracking(true);
    let out = sim.comp_idx("out").unwrap();
    let mux = sim.comp_idx("mux").unwrap();

    assert!(sim.port_state(out, "in").unwrap().used);
    assert!(sim.port_state(mux, "out").unwrap().used);
}

#[test]
fn test_usage_is_idempotent() {
    let mut sim = Sim::new(&demo::library(), &demo::bus()).with_usage_tracking(true);
    let before: Vec<Vec<PortState>> = port_states(&sim);
    let values: Vec<Option<NetState>> = (0..sim.system().nets.len()).map(|net| sim.net_state(net)).collect();

    sim.backprop_usage();
    sim.backprop_usage();
    assert_eq!(port_states(&sim), before);
    let after: Vec<Option<NetState>> = (0..sim.system().nets.len()).map(|net| sim.net_state(net)).collect();
    assert_eq!(after, values);
}

fn port_states(sim: &Sim) -> Vec<Vec<PortState>> {
    sim.system()
        .comps
        .iter()
        .enumerate()
        .map(|(comp_idx, comp)| {
            comp.port_ids
                .iter()
                .filter_map(|port_id| sim.port_state(comp_idx, port_id))
                .collect()
        })
        .collect()
}

#[test]
fn test_latch_commits_settled_values_once() {
    let mut sim = Sim::new(&demo::library(), &demo::counter());
    assert_eq!(sim.peek("q").unwrap(), 0);
    assert_eq!(sim.peek("next").unwrap(), 1);

    // a second latch without a settle in between sees the same inputs
    sim.latch();
    sim.latch();
    assert_eq!(sim.instance::<Reg>("count").unwrap().value(), 1);
    sim.settle();
    assert_eq!(sim.peek("q").unwrap(), 1);
    assert_eq!(sim.clock_ticks(), 2);
}

#[test]
fn test_reset() {
    let mut sim = Sim::new(&demo::library(), &demo::counter());
    for _ in 0..3 {
        sim.step();
    }
    assert_eq!(sim.peek("q").unwrap(), 3);

    sim.instance_mut::<Input>("stop").unwrap().set(1);
    sim.settle();
    assert!(sim.halted());

    sim.instance_mut::<Input>("stop").unwrap().set(0);
    sim.reset(false);
    assert!(!sim.halted());
    assert_eq!(sim.halt_reason(), None);
    assert_eq!(sim.peek("q").unwrap(), 0);
    assert_eq!(sim.peek("next").unwrap(), 1);
}

#[test]
fn test_lookup_errors() {
    let sim = Sim::new(&demo::library(), &demo::mux(0));
    assert!(sim.peek("nope").is_err());
    assert!(sim.peek_port("mux").is_err());
    assert!(sim.peek_port("mux.nope").is_err());
    assert!(sim.instance::<Reg>("mux").is_err());
}

/// `o = i + 2`, natively. Its schematic adds 1.
#[derive(Debug)]
struct NativeIncDef;

#[derive(Debug)]
struct NativeInc;

impl CompDef for NativeIncDef {
    fn def_id(&self) -> &str {
        "test/inc"
    }

    fn ports(&self, _args: &CompArgs) -> Vec<PortDecl> {
        vec![PortDecl::new("i", PortType::IN, 8), PortDecl::new("o", PortType::OUT, 8)]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let i = builder.port("i")?;
        let o = builder.port("o")?;
        builder.add_phase(&[i], &[o])?;
        Ok(Box::new(NativeInc))
    }
}

impl CompInstance for NativeInc {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        ports[1].value = (ports[0].value + 2) & 0xff;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[test]
fn test_native_outputs_win() {
    let sub = Schematic::new()
        .comp("i", comps::port::DEF_ID, json!({ "dir": "in", "width": 8 }))
        .comp("o", comps::port::DEF_ID, json!({ "dir": "out", "width": 8 }))
        .comp("one", "core/io/const", json!({ "width": 8, "value": 1 }))
        .comp("add", "core/math/adder", json!({ "width": 8 }))
        .wire("wi", &["i.a", "add.a"])
        .wire("w1", &["one.out", "add.b"])
        .wire("wo", &["add.out", "o.a"]);
    let mut library = demo::library();
    library.add_with_schematic(NativeIncDef, sub);

    let top = Schematic::new()
        .comp("x", "core/io/input", json!({ "width": 8, "value": 40 }))
        .comp("inc", "test/inc", json!({}))
        .wire("wx", &["x.out", "inc.i"])
        .wire("wout", &["inc.o"]);
    let sim = Sim::new(&library, &top);

    assert!(sim.diagnostics().next().is_none());
    assert_eq!(sim.peek("wout").unwrap(), 42);
    // the sub-schematic still runs on the same input
    assert_eq!(sim.peek("inc|wo").unwrap(), 41);
    assert_eq!(sim.peek("inc|wi").unwrap(), 40);
}
