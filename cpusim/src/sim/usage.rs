use super::*;

/// Mark which ports causally contributed to the last settle.
///
/// Walks the executed blocks backwards. Only `data_used` flags change.
pub fn backprop_usage(system: &mut ExeSystem, schedule: &Schedule, executed: &[BlockIdx]) {
    for comp in &mut system.comps {
        for port in &mut comp.ports {
            port.data_used = false;
        }
    }

    // committed state always depends on its inputs
    for &(comp_idx, phase_idx) in &schedule.latch_steps {
        let ExeComp { ports, phases, .. } = &mut system.comps[comp_idx];
        for &port in &phases[phase_idx].read_ports {
            ports[port].data_used = true;
        }
    }

    for &block_idx in executed.iter().rev() {
        for step in schedule.blocks[block_idx].steps.iter().rev() {
            match step.kind {
                StepKind::Phase(comp_idx, phase_idx) => backprop_phase(&mut system.comps[comp_idx], phase_idx),
                StepKind::Net(net_idx) => backprop_net(&system.nets[net_idx], &mut system.comps),
            }
        }
    }
}

fn backprop_phase(comp: &mut ExeComp, phase_idx: PhaseIdx) {
    let ExeComp { ports, phases, .. } = comp;
    let phase = &phases[phase_idx];
    let outputs_used = phase.write_ports.is_empty() || phase.write_ports.iter().any(|&port| ports[port].data_used);

    for &port in phase.read_ports.iter().chain(&phase.any_of) {
        let port = &mut ports[port];
        let ignored = !port.port_type.is_tristate() && !port.io_enabled;
        if port.port_type.is_ctrl() || (outputs_used && !ignored) {
            port.data_used = true;
        }
    }
}

fn backprop_net(net: &ExeNet, comps: &mut [ExeComp]) {
    let used = net.dests.iter().any(|dest| comps[dest.comp].ports[dest.port].data_used);
    if !used {
        return;
    }
    for src in &net.srcs {
        let port = &mut comps[src.comp].ports[src.port];
        if !net.tristate || port.drives() {
            port.data_used = true;
        }
    }
}
