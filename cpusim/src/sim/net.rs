use super::*;

/// Settle one net from its drivers and fan the value out to its receivers.
pub fn resolve_net(net: &mut ExeNet, comps: &mut [ExeComp]) {
    if net.tristate {
        resolve_tristate(net, comps);
    } else {
        resolve_single(net, comps);
    }
}

fn resolve_single(net: &mut ExeNet, comps: &mut [ExeComp]) {
    net.value = match net.srcs.as_slice() {
        [src] => comps[src.comp].ports[src.port].value & mask(net.width),
        _ => 0,
    };
    net.enabled_count = net.srcs.len();
    fan_out(net, comps);
}

fn resolve_tristate(net: &mut ExeNet, comps: &mut [ExeComp]) {
    let enabled: Vec<ExePortRef> = net
        .srcs
        .iter()
        .copied()
        .filter(|src| comps[src.comp].ports[src.port].drives())
        .collect();
    net.enabled_count = enabled.len();

    match enabled.as_slice() {
        [src] => {
            net.value = comps[src.comp].ports[src.port].value & mask(net.width);
            fan_out(net, comps);
        },
        _ => {
            // floating or conflicting: keep the last settled value
            for dest in &net.dests {
                comps[dest.comp].ports[dest.port].resolved = false;
            }
        },
    }
}

fn fan_out(net: &ExeNet, comps: &mut [ExeComp]) {
    for dest in &net.dests {
        let port = &mut comps[dest.comp].ports[dest.port];
        port.value = net.value;
        port.resolved = true;
    }
}
