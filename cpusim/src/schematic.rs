use super::*;

/// A reference to one port of a placed component, as seen by a wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortRef {
    pub comp_id: CompId,
    pub port_id: PortId,
}

impl PortRef {
    pub fn new(comp_id: &str, port_id: &str) -> PortRef {
        PortRef {
            comp_id: comp_id.to_string(),
            port_id: port_id.to_string(),
        }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.comp_id, self.port_id)
    }
}

/// A connected group of wire segments and the ports it touches.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub id: String,
    pub endpoints: Vec<PortRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchematicComp {
    pub id: CompId,
    pub def_id: String,
    pub args: CompArgs,
}

/// The editor's view of a circuit: placed components and the wires between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schematic {
    pub comps: Vec<SchematicComp>,
    pub wires: Vec<Wire>,
}

impl Schematic {
    pub fn new() -> Schematic {
        Schematic::default()
    }

    pub fn comp(mut self, id: &str, def_id: &str, args: CompArgs) -> Schematic {
        self.comps.push(SchematicComp {
            id: id.to_string(),
            def_id: def_id.to_string(),
            args,
        });
        self
    }

    /// Add a wire. Endpoints are written `comp.port`.
    pub fn wire(mut self, id: &str, endpoints: &[&str]) -> Schematic {
        let endpoints = endpoints
            .iter()
            .map(|endpoint| match endpoint.split_once('.') {
                Some((comp_id, port_id)) => PortRef::new(comp_id, port_id),
                None => PortRef::new(endpoint, ""),
            })
            .collect();
        self.wires.push(Wire {
            id: id.to_string(),
            endpoints,
        });
        self
    }

    pub fn find_comp(&self, id: &str) -> Option<&SchematicComp> {
        self.comps.iter().find(|comp| comp.id == id)
    }
}
