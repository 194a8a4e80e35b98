use super::*;

pub const DEF_ID: &str = "core/comp/port";
/// The pin facing into the sub-schematic.
pub const INNER_PIN: &str = "a";
/// The pin bound to the enclosing component's nets by the flattener.
pub const EXTERNAL_PIN: &str = "_b";

/// One externally visible pin of a sub-schematic.
///
/// Args: `portId` (defaults to the component id), `dir` (`"in"` or `"out"`),
/// `width`, the capability flags `tristate`, `data`, `addr` and `ctrl`, and
/// `value`, which an input boundary port emits while its external pin is
/// unbound, eg when the sub-schematic is simulated on its own.
///
/// A tri-state boundary port passes the driving state across as well as the
/// value: it releases its far pin whenever its near net floated or conflicted.
#[derive(Debug)]
pub struct BoundaryPortDef;

#[derive(Debug)]
pub struct BoundaryPort {
    inbound: bool,
    tristate: bool,
    value: Word,
    inner: PortIdx,
    external: PortIdx,
}

/// The port a boundary port exposes on its enclosing component.
pub fn outer_decl(args: &CompArgs, comp_id: &str) -> PortDecl {
    let mut port_type = match args.str_or("dir", "in") {
        "out" => PortType::OUT,
        _ => PortType::IN,
    };
    let flags = [
        ("tristate", PortType::TRISTATE),
        ("data", PortType::DATA),
        ("addr", PortType::ADDR),
        ("ctrl", PortType::CTRL),
    ];
    for (key, flag) in flags {
        if args.bool_or(key, false) {
            port_type = port_type | flag;
        }
    }
    PortDecl::new(args.str_or("portId", comp_id), port_type, width(args))
}

impl CompDef for BoundaryPortDef {
    fn def_id(&self) -> &str {
        DEF_ID
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        let outer = outer_decl(args, "");
        vec![PortDecl::new(INNER_PIN, outer.port_type.flipped(), outer.width)]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let outer = outer_decl(builder.args(), "");
        let inbound = outer.port_type.is_input();
        let value = builder.args().u64_or("value", 0) & mask(outer.width);
        let inner = builder.port(INNER_PIN)?;
        let external = builder.external_port(EXTERNAL_PIN, outer.port_type, outer.width);
        if inbound {
            builder.add_phase(&[external], &[inner])?;
        } else {
            builder.add_phase(&[inner], &[external])?;
        }
        Ok(Box::new(BoundaryPort {
            inbound,
            tristate: outer.port_type.is_tristate(),
            value,
            inner,
            external,
        }))
    }
}

impl CompInstance for BoundaryPort {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        let (from, to) = if self.inbound { (self.external, self.inner) } else { (self.inner, self.external) };
        let source = &ports[from];
        let value = match (self.inbound, source.is_bound()) {
            (true, false) => Some(self.value),
            (false, false) => None,
            _ => source.resolved.then_some(source.value),
        };

        if self.tristate {
            ports[to].drive(value);
        } else if let Some(value) = value {
            ports[to].value = value;
        }
    }

    impl_any!();
}
