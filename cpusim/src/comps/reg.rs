use super::*;

/// An edge-triggered register. `q` shows the stored value; the latch phase loads `d`
/// when `en` is high, or on every clock when `en` is left unconnected.
#[derive(Debug)]
pub struct RegDef;

#[derive(Debug)]
pub struct Reg {
    value: Word,
    d: PortIdx,
    en: PortIdx,
    q: PortIdx,
}

impl Reg {
    pub fn value(&self) -> Word {
        self.value
    }
}

impl CompDef for RegDef {
    fn def_id(&self) -> &str {
        "core/reg/reg"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        let width = width(args);
        vec![
            PortDecl::new("d", PortType::IN | PortType::DATA, width),
            PortDecl::new("en", PortType::IN | PortType::CTRL, 1),
            PortDecl::new("q", PortType::OUT | PortType::DATA, width),
        ]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let reg = Reg {
            value: 0,
            d: builder.port("d")?,
            en: builder.port("en")?,
            q: builder.port("q")?,
        };
        builder.add_phase(&[], &[reg.q])?;
        builder.add_latch_phase(&[reg.d, reg.en], &[])?;
        Ok(Box::new(reg))
    }
}

impl CompInstance for Reg {
    fn run_phase(&mut self, phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        match phase {
            0 => ports[self.q].value = self.value,
            _ => {
                let en = &ports[self.en];
                if !en.is_bound() || en.value != 0 {
                    self.value = ports[self.d].value;
                }
            },
        }
    }

    fn reset(&mut self, _hard: bool) {
        self.value = 0;
    }

    fn copy_stateful_from(&mut self, prev: &dyn CompInstance) {
        if let Some(prev) = prev.as_any().downcast_ref::<Reg>() {
            self.value = prev.value;
        }
    }

    impl_any!();
}
