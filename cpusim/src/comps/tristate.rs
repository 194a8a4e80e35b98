use super::*;

/// Puts `in` on a shared bus while `en` is high.
#[derive(Debug)]
pub struct TriBufDef;

#[derive(Debug)]
pub struct TriBuf {
    en: PortIdx,
    input: PortIdx,
    out: PortIdx,
}

impl CompDef for TriBufDef {
    fn def_id(&self) -> &str {
        "core/flow/tribuf"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        let width = width(args);
        vec![
            PortDecl::new("en", PortType::IN | PortType::CTRL, 1),
            PortDecl::new("in", PortType::IN | PortType::DATA, width),
            PortDecl::new("out", PortType::OUT_TRI | PortType::DATA, width),
        ]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let buf = TriBuf {
            en: builder.port("en")?,
            input: builder.port("in")?,
            out: builder.port("out")?,
        };
        builder.add_phase(&[buf.en, buf.input], &[buf.out])?;
        Ok(Box::new(buf))
    }
}

impl CompInstance for TriBuf {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        let value = (ports[self.en].value != 0).then_some(ports[self.input].value);
        ports[self.out].drive(value);
    }

    impl_any!();
}
