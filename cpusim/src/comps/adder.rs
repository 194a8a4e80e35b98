use super::*;

/// `out = a + b (+ cin)`, with an optional carry out.
#[derive(Debug)]
pub struct AdderDef;

#[derive(Debug)]
pub struct Adder {
    a: PortIdx,
    b: PortIdx,
    cin: Option<PortIdx>,
    out: PortIdx,
    cout: Option<PortIdx>,
    width: Width,
}

impl CompDef for AdderDef {
    fn def_id(&self) -> &str {
        "core/math/adder"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        let width = width(args);
        let mut ports = vec![
            PortDecl::new("a", PortType::IN | PortType::DATA, width),
            PortDecl::new("b", PortType::IN | PortType::DATA, width),
            PortDecl::new("out", PortType::OUT | PortType::DATA, width),
        ];
        if args.bool_or("carryIn", false) {
            ports.push(PortDecl::new("cin", PortType::IN, 1));
        }
        if args.bool_or("carryOut", false) {
            ports.push(PortDecl::new("cout", PortType::OUT, 1));
        }
        ports
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let args = builder.args();
        let adder = Adder {
            a: builder.port("a")?,
            b: builder.port("b")?,
            cin: args.bool_or("carryIn", false).then(|| builder.port("cin")).transpose()?,
            out: builder.port("out")?,
            cout: args.bool_or("carryOut", false).then(|| builder.port("cout")).transpose()?,
            width: width(args),
        };

        let mut reads = vec![adder.a, adder.b];
        reads.extend(adder.cin);
        let mut writes = vec![adder.out];
        writes.extend(adder.cout);
        builder.add_phase(&reads, &writes)?;
        Ok(Box::new(adder))
    }
}

impl CompInstance for Adder {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        let carry_in = self.cin.map(|cin| ports[cin].value & 1).unwrap_or(0);
        let sum = ports[self.a].value as u128 + ports[self.b].value as u128 + carry_in as u128;
        ports[self.out].value = sum as Word & mask(self.width);
        if let Some(cout) = self.cout {
            ports[cout].value = ((sum >> self.width) & 1) as Word;
        }
    }

    impl_any!();
}
