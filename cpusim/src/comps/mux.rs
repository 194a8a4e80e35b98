use super::*;

/// Two-input multiplexer. The input that is not selected is marked ignored,
/// so the usage backpropagation does not trace through it.
#[derive(Debug)]
pub struct Mux2Def;

#[derive(Debug)]
pub struct Mux2 {
    a: PortIdx,
    b: PortIdx,
    sel: PortIdx,
    out: PortIdx,
}

impl CompDef for Mux2Def {
    fn def_id(&self) -> &str {
        "core/flow/mux2"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        let width = width(args);
        vec![
            PortDecl::new("a", PortType::IN | PortType::DATA, width),
            PortDecl::new("b", PortType::IN | PortType::DATA, width),
            PortDecl::new("sel", PortType::IN | PortType::CTRL, 1),
            PortDecl::new("out", PortType::OUT | PortType::DATA, width),
        ]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let mux = Mux2 {
            a: builder.port("a")?,
            b: builder.port("b")?,
            sel: builder.port("sel")?,
            out: builder.port("out")?,
        };
        builder.add_phase(&[mux.a, mux.b, mux.sel], &[mux.out])?;
        Ok(Box::new(mux))
    }
}

impl CompInstance for Mux2 {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        let (selected, ignored) = if ports[self.sel].value == 0 {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        };
        ports[ignored].io_enabled = false;
        ports[self.out].value = ports[selected].value;
    }

    impl_any!();
}
