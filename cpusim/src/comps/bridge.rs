use super::*;

/// Connects two shared buses. While `en` is high, copies `a` onto `b` when `dir` is
/// low and `b` onto `a` when `dir` is high.
///
/// The copy phase may run as soon as either bus has resolved, since which side
/// drives is only known once `dir` has settled.
#[derive(Debug)]
pub struct BridgeDef;

#[derive(Debug)]
pub struct Bridge {
    en: PortIdx,
    dir: PortIdx,
    a: PortIdx,
    b: PortIdx,
    enabled: bool,
    a_to_b: bool,
}

impl CompDef for BridgeDef {
    fn def_id(&self) -> &str {
        "core/bus/bridge"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        let width = width(args);
        vec![
            PortDecl::new("en", PortType::IN | PortType::CTRL, 1),
            PortDecl::new("dir", PortType::IN | PortType::CTRL, 1),
            PortDecl::new("a", PortType::IN_OUT_TRI | PortType::DATA, width),
            PortDecl::new("b", PortType::IN_OUT_TRI | PortType::DATA, width),
        ]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let bridge = Bridge {
            en: builder.port("en")?,
            dir: builder.port("dir")?,
            a: builder.port("a")?,
            b: builder.port("b")?,
            enabled: false,
            a_to_b: true,
        };
        builder.add_phase(&[bridge.en, bridge.dir], &[])?;
        builder.add_phase_any_of(&[], &[bridge.a, bridge.b], &[bridge.a, bridge.b])?;
        Ok(Box::new(bridge))
    }
}

impl CompInstance for Bridge {
    fn run_phase(&mut self, phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        match phase {
            0 => {
                self.enabled = ports[self.en].value != 0;
                self.a_to_b = ports[self.dir].value == 0;
                let (from, to) = if self.a_to_b { (self.a, self.b) } else { (self.b, self.a) };
                ports[from].io_dir = IoDir::In;
                ports[to].io_dir = if self.enabled { IoDir::Out } else { IoDir::In };
            },
            _ => {
                let (from, to) = if self.a_to_b { (self.a, self.b) } else { (self.b, self.a) };
                ports[from].drive(None);
                if self.enabled && ports[from].resolved {
                    let value = ports[from].value;
                    ports[to].drive(Some(value));
                } else {
                    ports[to].drive(None);
                }
            },
        }
    }

    impl_any!();
}
