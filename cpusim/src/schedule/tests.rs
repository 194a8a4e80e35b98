use crate::demo;
use crate::flatten;
use crate::schedule::{compile, Counter, Schedule, StepKind, Trigger};
use crate::{Diagnostic, ExeSystem, Schematic};
use serde_json::json;

fn compiled(schematic: &Schematic) -> (ExeSystem, Schedule) {
    let system = flatten(&demo::library(), schematic, None);
    let schedule = compile(&system);
    (system, schedule)
}

/// (block, step) position of a step.
fn position(schedule: &Schedule, kind: StepKind) -> (usize, usize) {
    for (block_idx, block) in schedule.blocks.iter().enumerate() {
        if let Some(step_idx) = block.steps.iter().position(|step| step.kind == kind) {
            return (block_idx, step_idx);
        }
    }
    panic!("{kind:?} was not scheduled")
}

#[test]
fn test_every_non_latch_phase_and_net_is_scheduled_once() {
    for name in demo::NAMES {
        let (system, schedule) = compiled(&demo::schematic(name).unwrap());
        let phase_count: usize = system
            .comps
            .iter()
            .map(|comp| comp.phases.iter().filter(|phase| !phase.is_latch).count())
            .sum();
        assert_eq!(schedule.step_count(), phase_count + system.nets.len(), "{name}");
        for block in &schedule.blocks {
            assert!(matches!(block.counters[0], Counter::Plain(_)), "{name}");
        }
    }
}

#[test]
fn test_plain_order() {
    let (system, schedule) = compiled(&demo::mux(0));
    let mux = system.comp_idx("mux").unwrap();
    let out = system.comp_idx("out").unwrap();
    let a = system.comp_idx("a").unwrap();
    let wa = system.net_idx("wa").unwrap();
    let wout = system.net_idx("wout").unwrap();

    assert!(position(&schedule, StepKind::Phase(a, 0)) < position(&schedule, StepKind::Net(wa)));
    assert!(position(&schedule, StepKind::Net(wa)) < position(&schedule, StepKind::Phase(mux, 0)));
    assert!(position(&schedule, StepKind::Phase(mux, 0)) < position(&schedule, StepKind::Net(wout)));
    assert!(position(&schedule, StepKind::Net(wout)) < position(&schedule, StepKind::Phase(out, 0)));
    assert!(schedule.diagnostics.is_empty());
}

#[test]
fn test_latch_phases_are_not_settle_steps() {
    let (system, schedule) = compiled(&demo::counter());
    let count = system.comp_idx("count").unwrap();

    assert_eq!(schedule.latch_steps, vec![(count, 1)]);
    assert!(schedule.block_of(StepKind::Phase(count, 0)).is_some());
    assert!(schedule.block_of(StepKind::Phase(count, 1)).is_none());
}

#[test]
fn test_bridge_is_dynamic() {
    let (system, schedule) = compiled(&demo::bridge());
    let bridge = system.comp_idx("bridge").unwrap();
    let bus_a = system.net_idx("bus_a").unwrap();
    let bus_b = system.net_idx("bus_b").unwrap();

    // the copy phase waits on either bus
    let copy_block = &schedule.blocks[schedule.block_of(StepKind::Phase(bridge, 1)).unwrap()];
    assert_eq!(copy_block.steps[0].kind, StepKind::Phase(bridge, 1));
    assert_eq!(copy_block.counters[1], Counter::OneOf(2));

    // each bus waits on whichever of its drivers is driving
    for bus in [bus_a, bus_b] {
        let block_idx = schedule.block_of(StepKind::Net(bus)).unwrap();
        assert_eq!(schedule.blocks[block_idx].counters[1], Counter::OneOf(2));
        assert_eq!(schedule.blocks[block_idx].resolved_initial()[1], 1);
    }

    let copy_step = &copy_block.steps[0];
    let driven: Vec<usize> = copy_step
        .decr_targets
        .iter()
        .filter(|target| matches!(target.trigger, Trigger::PortDriving(_)))
        .map(|target| target.block)
        .collect();
    assert!(driven.contains(&schedule.block_of(StepKind::Net(bus_a)).unwrap()));
    assert!(driven.contains(&schedule.block_of(StepKind::Net(bus_b)).unwrap()));
}

#[test]
fn test_combinational_loop() {
    let schematic = Schematic::new()
        .comp("c1", "core/io/const", json!({ "width": 8, "value": 1 }))
        .comp("c2", "core/io/const", json!({ "width": 8, "value": 2 }))
        .comp("add1", "core/math/adder", json!({ "width": 8 }))
        .comp("add2", "core/math/adder", json!({ "width": 8 }))
        .wire("w1", &["c1.out", "add1.b"])
        .wire("w2", &["c2.out", "add2.b"])
        .wire("n1", &["add1.out", "add2.a"])
        .wire("n2", &["add2.out", "add1.a"]);
    let (system, schedule) = compiled(&schematic);

    let expected = vec!["add1#0".to_string(), "add2#0".to_string(), "n1".to_string(), "n2".to_string()];
    assert_eq!(schedule.diagnostics, vec![Diagnostic::CombinationalLoop(expected)]);
    assert_eq!(schedule.step_count(), 4 + system.nets.len());
}

#[test]
fn test_block_counters_match_targets() {
    let (_system, schedule) = compiled(&demo::bus());
    let mut incoming = vec![0; schedule.blocks.len()];
    for block in &schedule.blocks {
        for &target in &block.decr_block_targets {
            incoming[target] += 1;
        }
    }
    for (block, count) in schedule.blocks.iter().zip(incoming) {
        assert_eq!(block.counters[0], Counter::Plain(count));
    }
}

#[test]
fn test_decr_targets_name_one_of_counters() {
    for name in demo::NAMES {
        let (_system, schedule) = compiled(&demo::schematic(name).unwrap());
        for block in &schedule.blocks {
            for target in block.steps.iter().flat_map(|step| step.decr_targets.iter()) {
                let counter = schedule.blocks[target.block].counters[target.counter];
                assert!(matches!(counter, Counter::OneOf(_)), "{name}: {target:?}");
            }
        }
    }
}
