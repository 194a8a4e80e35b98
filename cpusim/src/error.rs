use super::*;

/// A structural problem found while flattening a schematic or compiling a schedule.
///
/// None of these abort the build. The offending element is skipped or defaulted
/// and the diagnostic is kept on the [`ExeSystem`](crate::flatten::ExeSystem)
/// or [`Schedule`](crate::schedule::Schedule) for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnknownComponentDef(Path, String),
    UnknownComponent(String, String),
    UnknownPort(Path, PortId),
    WidthMismatch(String, Width, Width),
    MultipleDrivers(String, usize),
    Build(Path, BuildError),
    CombinationalLoop(Vec<String>),
}

/// A violation of the component builder contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    PhaseAfterLatch(String),
    NoSuchPort(String, PortId, Vec<PortId>),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Diagnostic::UnknownComponentDef(path, def_id) => write!(f, "Unknown component definition {def_id} for {path}"),
            Diagnostic::UnknownComponent(wire_id, comp_id) => write!(f, "Wire {wire_id} references unknown component {comp_id}"),
            Diagnostic::UnknownPort(path, port_id) => write!(f, "Component {path} has no port {port_id}"),
            Diagnostic::WidthMismatch(net, expected, actual) => write!(f, "Net {net} has width {expected} but a port of width {actual} is bound to it"),
            Diagnostic::MultipleDrivers(net, count) => write!(f, "Net {net} is not tri-state but has {count} drivers"),
            Diagnostic::Build(path, error) => write!(f, "Failed to build {path}: {error}"),
            Diagnostic::CombinationalLoop(nodes) => write!(f, "Combinational loop through {}", nodes.join(" -> ")),
        }
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BuildError::PhaseAfterLatch(def_id) => write!(f, "Cannot add phase after latch phase ({def_id})"),
            BuildError::NoSuchPort(def_id, port_id, valid) => {
                write!(f, "Port {port_id} not found on {def_id}. Valid ports are [{}]", valid.join(", "))
            },
        }
    }
}

impl std::error::Error for Diagnostic {}
impl std::error::Error for BuildError {}
