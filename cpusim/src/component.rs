use super::*;
use std::any::Any;

/// Instance configuration of a placed component.
pub type CompArgs = serde_json::Value;

/// A statically declared port of a component definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDecl {
    pub id: PortId,
    pub port_type: PortType,
    pub width: Width,
}

impl PortDecl {
    pub fn new(id: &str, port_type: PortType, width: Width) -> PortDecl {
        PortDecl {
            id: id.to_string(),
            port_type,
            width,
        }
    }
}

/// State shared by every phase function during a step.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub halt: bool,
    pub halt_reason: Option<String>,
}

impl RunArgs {
    pub fn request_halt<S: Into<String>>(&mut self, reason: S) {
        self.halt = true;
        self.halt_reason = Some(reason.into());
    }

    pub fn clear(&mut self) {
        self.halt = false;
        self.halt_reason = None;
    }
}

/// Runtime state of one port of one component.
#[derive(Debug, Clone)]
pub struct ExePort {
    pub port_type: PortType,
    pub width: Width,
    pub value: Word,
    /// For tri-state outputs: whether the pin is driving.
    /// For plain inputs: false means the phase ignored it (eg an unselected mux input).
    pub io_enabled: bool,
    pub io_dir: IoDir,
    pub data_used: bool,
    /// False when the net this port reads from floated or conflicted in the last settle.
    pub resolved: bool,
    pub net_idx: Option<NetIdx>,
}

impl ExePort {
    pub fn new(port_type: PortType, width: Width) -> ExePort {
        ExePort {
            port_type,
            width,
            value: 0,
            io_enabled: true,
            io_dir: IoDir::None,
            data_used: true,
            resolved: true,
            net_idx: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.net_idx.is_some()
    }

    /// Whether this pin is actively putting its value on its net.
    pub fn drives(&self) -> bool {
        if !self.port_type.is_output() || !self.io_enabled {
            false
        } else if self.port_type.is_bidirectional() {
            self.io_dir == IoDir::Out
        } else {
            true
        }
    }

    /// Drive a tri-state pin (or release it with `None`).
    pub fn drive(&mut self, value: Option<Word>) {
        match value {
            Some(value) => {
                self.value = value;
                self.io_enabled = true;
                if self.port_type.is_bidirectional() {
                    self.io_dir = IoDir::Out;
                }
            },
            None => {
                self.io_enabled = false;
                if self.port_type.is_bidirectional() {
                    self.io_dir = IoDir::In;
                }
            },
        }
    }
}

/// One ordered computation step of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExePhase {
    pub read_ports: Vec<PortIdx>,
    pub write_ports: Vec<PortIdx>,
    /// The phase may run once any one of these ports' nets has resolved.
    pub any_of: Vec<PortIdx>,
    pub is_latch: bool,
}

/// The opaque behavior and stateful data of a built component.
///
/// `run_phase` receives the index of the phase being run (in the order the
/// phases were added to the [`CompBuilder`]) and the component's ports.
#[allow(unused_variables)]
pub trait CompInstance: std::fmt::Debug + Send {
    fn run_phase(&mut self, phase: PhaseIdx, ports: &mut [ExePort], args: &mut RunArgs);

    /// Soft reset clears volatile state. Hard reset also clears persistent stores.
    fn reset(&mut self, hard: bool) {}

    /// Carry stateful data over from the same component in a previous build.
    fn copy_stateful_from(&mut self, prev: &dyn CompInstance) {}

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An entry in the declared-component registry.
pub trait CompDef: Send + Sync {
    fn def_id(&self) -> &str;

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl>;

    /// Declare phases on the builder and return the instance that runs them.
    /// Definitions without native behavior keep the default, which builds an
    /// inert component marked invalid.
    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        build_default(builder)
    }
}

/// Builds the port table and phase list of one component instance.
#[derive(Debug)]
pub struct CompBuilder {
    def_id: String,
    args: CompArgs,
    port_ids: Vec<PortId>,
    ports: Vec<ExePort>,
    phases: Vec<ExePhase>,
    seen_latch: bool,
    valid: bool,
}

impl CompBuilder {
    pub fn new(def_id: &str, args: CompArgs, decls: &[PortDecl]) -> CompBuilder {
        CompBuilder {
            def_id: def_id.to_string(),
            args,
            port_ids: decls.iter().map(|decl| decl.id.clone()).collect(),
            ports: decls.iter().map(|decl| ExePort::new(decl.port_type, decl.width)).collect(),
            phases: vec![],
            seen_latch: false,
            valid: true,
        }
    }

    pub fn args(&self) -> &CompArgs {
        &self.args
    }

    pub fn port(&self, id: &str) -> Result<PortIdx, BuildError> {
        self.port_ids
            .iter()
            .position(|port_id| port_id == id)
            .ok_or_else(|| BuildError::NoSuchPort(self.def_id.clone(), id.to_string(), self.port_ids.clone()))
    }

    pub fn ports_where<F: Fn(PortType) -> bool>(&self, pred: F) -> Vec<PortIdx> {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_idx, port)| pred(port.port_type))
            .map(|(idx, _port)| idx)
            .collect()
    }

    /// Add a port that is not part of the definition's declared ports,
    /// eg the outward-facing pin of a boundary port.
    pub fn external_port(&mut self, id: &str, port_type: PortType, width: Width) -> PortIdx {
        self.port_ids.push(id.to_string());
        self.ports.push(ExePort::new(port_type, width));
        self.ports.len() - 1
    }

    pub fn add_phase(&mut self, reads: &[PortIdx], writes: &[PortIdx]) -> Result<&mut Self, BuildError> {
        self.push_phase(reads, writes, &[], false)
    }

    pub fn add_phase_any_of(&mut self, reads: &[PortIdx], writes: &[PortIdx], any_of: &[PortIdx]) -> Result<&mut Self, BuildError> {
        self.push_phase(reads, writes, any_of, false)
    }

    pub fn add_latch_phase(&mut self, reads: &[PortIdx], writes: &[PortIdx]) -> Result<&mut Self, BuildError> {
        self.push_phase(reads, writes, &[], true)
    }

    fn push_phase(&mut self, reads: &[PortIdx], writes: &[PortIdx], any_of: &[PortIdx], is_latch: bool) -> Result<&mut Self, BuildError> {
        if self.seen_latch && !is_latch {
            return Err(BuildError::PhaseAfterLatch(self.def_id.clone()));
        }
        self.seen_latch |= is_latch;
        self.phases.push(ExePhase {
            read_ports: reads.to_vec(),
            write_ports: writes.to_vec(),
            any_of: any_of.to_vec(),
            is_latch,
        });
        Ok(self)
    }

    pub fn set_invalid(&mut self) {
        self.valid = false;
    }

    pub(crate) fn finish(self) -> (Vec<PortId>, Vec<ExePort>, Vec<ExePhase>, bool) {
        (self.port_ids, self.ports, self.phases, self.valid)
    }
}

/// A component with no native behavior.
#[derive(Debug, Default)]
pub struct Inert;

impl CompInstance for Inert {
    fn run_phase(&mut self, _phase: PhaseIdx, _ports: &mut [ExePort], _args: &mut RunArgs) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn build_default(builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
    builder.set_invalid();
    let reads = builder.ports_where(|port_type| port_type.is_input());
    let writes = builder.ports_where(|port_type| port_type.is_output());
    builder.add_phase(&reads, &writes)?;
    Ok(Box::new(Inert))
}

/// A built component bound into a flattened system.
#[derive(Debug)]
pub struct ExeComp {
    pub local_id: CompId,
    pub scope: ScopeId,
    pub def_id: String,
    pub port_ids: Vec<PortId>,
    pub ports: Vec<ExePort>,
    pub phases: Vec<ExePhase>,
    pub instance: Box<dyn CompInstance>,
    /// False when the definition has no native phase functions.
    pub valid: bool,
}

impl ExeComp {
    pub fn port_idx(&self, id: &str) -> Option<PortIdx> {
        self.port_ids.iter().position(|port_id| port_id == id)
    }

    pub fn run_phase(&mut self, phase: PhaseIdx, args: &mut RunArgs) {
        self.instance.run_phase(phase, &mut self.ports, args);
    }

    pub fn has_latch(&self) -> bool {
        self.phases.iter().any(|phase| phase.is_latch)
    }
}

/// Typed accessors for [`CompArgs`].
pub trait ArgsExt {
    fn u64_or(&self, key: &str, default: u64) -> u64;
    fn width_or(&self, key: &str, default: Width) -> Width;
    fn bool_or(&self, key: &str, default: bool) -> bool;
    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str;
}

impl ArgsExt for CompArgs {
    fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.get(key).and_then(|value| value.as_u64()).unwrap_or(default)
    }

    fn width_or(&self, key: &str, default: Width) -> Width {
        self.get(key)
            .and_then(|value| value.as_u64())
            .and_then(|value| Width::try_from(value).ok())
            .unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|value| value.as_bool()).unwrap_or(default)
    }

    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).and_then(|value| value.as_str()).unwrap_or(default)
    }
}
