use super::*;
use log::*;

#[cfg(test)]
mod tests;
mod net;
mod usage;

pub use net::resolve_net;
pub use usage::backprop_usage;

use anyhow::anyhow;
use std::collections::VecDeque;
use std::time::Duration;
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct BlockState {
    remaining: Vec<usize>,
    executed: bool,
}

/// Read-only copy of one port's runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortState {
    pub value: Word,
    pub io_enabled: bool,
    pub io_dir: IoDir,
    pub used: bool,
    pub resolved: bool,
}

/// Read-only copy of one net's runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetState {
    pub value: Word,
    pub width: Width,
    pub tristate: bool,
    pub enabled_count: usize,
}

#[derive(Debug)]
pub struct Sim {
    system: ExeSystem,
    schedule: Schedule,
    block_state: Vec<BlockState>,
    executed: Vec<BlockIdx>,
    run_args: RunArgs,
    track_usage: bool,
    clock_freq_cap: Option<f64>,
    clock_ticks: u64,
    start_time: SystemTime,
}

impl Sim {
    pub fn new(library: &CompLibrary, schematic: &Schematic) -> Sim {
        Sim::from_system(flatten(library, schematic, None))
    }

    pub fn from_system(system: ExeSystem) -> Sim {
        let schedule = compile(&system);
        let mut sim = Sim {
            block_state: make_block_state(&schedule),
            system,
            schedule,
            executed: vec![],
            run_args: RunArgs::default(),
            track_usage: false,
            clock_freq_cap: None,
            clock_ticks: 0,
            start_time: SystemTime::now(),
        };
        sim.settle();
        sim
    }

    /// Run the usage backpropagation after every settle.
    pub fn with_usage_tracking(mut self, enabled: bool) -> Self {
        self.track_usage = enabled;
        if enabled {
            self.backprop_usage();
        }
        self
    }

    pub fn cap_clock_freq(mut self, freq: f64) -> Self {
        self.clock_freq_cap = Some(freq);
        self
    }

    pub fn system(&self) -> &ExeSystem {
        &self.system
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn lookup(&self) -> &Lookup {
        &self.system.lookup
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.system.diagnostics.iter().chain(self.schedule.diagnostics.iter())
    }

    /// Blocks in the order they fired during the last settle.
    pub fn executed_blocks(&self) -> &[BlockIdx] {
        &self.executed
    }

    /// Propagate values until no block is left to fire.
    pub fn settle(&mut self) {
        let Sim { system, schedule, block_state, executed, run_args, .. } = self;

        for (state, block) in block_state.iter_mut().zip(&schedule.blocks) {
            state.remaining.clear();
            state.remaining.extend(block.counters.iter().map(|counter| counter.initial()));
            state.executed = false;
        }
        for comp in &mut system.comps {
            for port in &mut comp.ports {
                port.io_enabled = !port.port_type.is_tristate();
            }
        }
        executed.clear();

        let mut queue: VecDeque<BlockIdx> = block_state
            .iter()
            .enumerate()
            .filter(|(_block_idx, state)| state.remaining.iter().all(|&count| count == 0))
            .map(|(block_idx, _state)| block_idx)
            .collect();

        loop {
            while let Some(block_idx) = queue.pop_front() {
                if block_state[block_idx].executed {
                    continue;
                }
                block_state[block_idx].executed = true;
                executed.push(block_idx);
                trace!("Running block {block_idx}");

                let block = &schedule.blocks[block_idx];
                for step in &block.steps {
                    match step.kind {
                        StepKind::Phase(comp_idx, phase_idx) => system.comps[comp_idx].run_phase(phase_idx, run_args),
                        StepKind::Net(net_idx) => resolve_net(&mut system.nets[net_idx], &mut system.comps),
                    }

                    for target in &step.decr_targets {
                        let fires = match (target.trigger, step.kind) {
                            (Trigger::PortDriving(port), StepKind::Phase(comp_idx, _phase_idx)) => {
                                system.comps[comp_idx].ports[port].drives()
                            },
                            _ => true,
                        };
                        if fires {
                            decrement(block_state, &mut queue, target.block, target.counter);
                        }
                    }
                }

                for &target in &block.decr_block_targets {
                    decrement(block_state, &mut queue, target, 0);
                }
            }

            // Blocks still waiting on a runtime one-of dependency fire with what they have.
            let flush = block_state
                .iter()
                .position(|state| !state.executed && state.remaining[0] == 0);
            match flush {
                Some(block_idx) => {
                    trace!("Flushing block {block_idx}");
                    queue.push_back(block_idx);
                },
                None => break,
            }
        }

        if executed.len() < schedule.blocks.len() {
            warn!("Settle ran {} of {} blocks", executed.len(), schedule.blocks.len());
        }

        if self.track_usage {
            self.backprop_usage();
        }
    }

    /// Commit stateful updates from the settled values.
    pub fn latch(&mut self) {
        self.clock_ticks += 1;

        if let Some(clock_freq_cap) = self.clock_freq_cap {
            let mut clock_freq = self.clocks_per_second();
            while clock_freq.is_finite() && clock_freq > clock_freq_cap {
                clock_freq = self.clocks_per_second();
            }
        }

        let Sim { system, schedule, run_args, .. } = self;
        for &(comp_idx, phase_idx) in &schedule.latch_steps {
            system.comps[comp_idx].run_phase(phase_idx, run_args);
        }
    }

    /// One clock edge: latch then settle. Nothing happens once halted.
    pub fn step(&mut self) {
        if !self.halted() {
            self.latch();
        }
        if !self.halted() {
            self.settle();
        }
    }

    /// Clear halt state and runtime values, reset every component, then settle.
    /// A hard reset also clears persistent stores such as RAM.
    pub fn reset(&mut self, hard: bool) {
        info!("Resetting ({})", if hard { "hard" } else { "soft" });
        self.run_args.clear();
        for comp in &mut self.system.comps {
            comp.instance.reset(hard);
            for port in &mut comp.ports {
                port.value = 0;
                port.resolved = true;
            }
        }
        for net in &mut self.system.nets {
            net.value = 0;
            net.enabled_count = 0;
        }
        self.settle();
    }

    /// Reflatten after an edit, carrying component state over from the current system.
    pub fn rebuild(&mut self, library: &CompLibrary, schematic: &Schematic) {
        let system = flatten(library, schematic, Some(&self.system));
        self.schedule = compile(&system);
        self.system = system;
        self.block_state = make_block_state(&self.schedule);
        self.settle();
    }

    pub fn backprop_usage(&mut self) {
        backprop_usage(&mut self.system, &self.schedule, &self.executed);
    }

    pub fn halted(&self) -> bool {
        self.run_args.halt
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.run_args.halt_reason.as_deref()
    }

    pub fn clock_ticks(&self) -> u64 {
        self.clock_ticks
    }

    pub fn clocks_per_second(&self) -> f64 {
        let end_time = SystemTime::now();
        let duration: Duration = end_time.duration_since(self.start_time).unwrap_or_default();
        1_000_000.0 * self.clock_ticks as f64 / duration.as_micros() as f64
    }

    pub fn comp_idx(&self, path: &str) -> anyhow::Result<CompIdx> {
        self.system.comp_idx(path).ok_or_else(|| anyhow!("No component at {path}"))
    }

    pub fn net_idx(&self, path: &str) -> anyhow::Result<NetIdx> {
        self.system.net_idx(path).ok_or_else(|| anyhow!("No net at {path}"))
    }

    pub fn port_state(&self, comp_idx: CompIdx, port_id: &str) -> Option<PortState> {
        let comp = self.system.comps.get(comp_idx)?;
        let port = &comp.ports[comp.port_idx(port_id)?];
        Some(PortState {
            value: port.value,
            io_enabled: port.io_enabled,
            io_dir: port.io_dir,
            used: port.data_used,
            resolved: port.resolved,
        })
    }

    pub fn net_state(&self, net_idx: NetIdx) -> Option<NetState> {
        let net = self.system.nets.get(net_idx)?;
        Some(NetState {
            value: net.value,
            width: net.width,
            tristate: net.tristate,
            enabled_count: net.enabled_count,
        })
    }

    /// The settled value of the net at `path`.
    pub fn peek<P: Into<Path>>(&self, path: P) -> anyhow::Result<Word> {
        let path = path.into();
        Ok(self.system.nets[self.net_idx(&path)?].value)
    }

    /// The value of a port, addressed as `comp_path.port_id`.
    pub fn peek_port(&self, port_path: &str) -> anyhow::Result<Word> {
        let (comp_path, port_id) = port_path
            .rsplit_once('.')
            .ok_or_else(|| anyhow!("Expected comp.port, found {port_path}"))?;
        let comp_idx = self.comp_idx(comp_path)?;
        let state = self
            .port_state(comp_idx, port_id)
            .ok_or_else(|| anyhow!("Component {comp_path} has no port {port_id}"))?;
        Ok(state.value)
    }

    pub fn instance<T: 'static>(&self, path: &str) -> anyhow::Result<&T> {
        let comp_idx = self.comp_idx(path)?;
        self.system.comps[comp_idx]
            .instance
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| anyhow!("Component {path} is not a {}", std::any::type_name::<T>()))
    }

    pub fn instance_mut<T: 'static>(&mut self, path: &str) -> anyhow::Result<&mut T> {
        let comp_idx = self.comp_idx(path)?;
        self.system.comps[comp_idx]
            .instance
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| anyhow!("Component {path} is not a {}", std::any::type_name::<T>()))
    }
}

fn make_block_state(schedule: &Schedule) -> Vec<BlockState> {
    schedule
        .blocks
        .iter()
        .map(|block| BlockState {
            remaining: block.resolved_initial(),
            executed: false,
        })
        .collect()
}

fn decrement(block_state: &mut [BlockState], queue: &mut VecDeque<BlockIdx>, block_idx: BlockIdx, counter: usize) {
    let state = &mut block_state[block_idx];
    state.remaining[counter] = state.remaining[counter].saturating_sub(1);
    if !state.executed && state.remaining.iter().all(|&count| count == 0) {
        queue.push_back(block_idx);
    }
}
