use super::*;

/// Raises the halt flag while `in` is high.
#[derive(Debug)]
pub struct HaltDef;

#[derive(Debug)]
pub struct Halt {
    reason: String,
}

impl CompDef for HaltDef {
    fn def_id(&self) -> &str {
        "core/ctrl/halt"
    }

    fn ports(&self, _args: &CompArgs) -> Vec<PortDecl> {
        vec![PortDecl::new("in", PortType::IN | PortType::CTRL, 1)]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let input = builder.port("in")?;
        builder.add_phase(&[input], &[])?;
        let reason = builder.args().str_or("reason", "Halt requested").to_string();
        Ok(Box::new(Halt { reason }))
    }
}

impl CompInstance for Halt {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], args: &mut RunArgs) {
        if ports[0].value != 0 && !args.halt {
            args.request_halt(self.reason.clone());
        }
    }

    impl_any!();
}
