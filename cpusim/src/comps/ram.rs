use super::*;

/// Word-addressed memory on a bidirectional data bus.
///
/// While `oe` is high and `we` is low the contents at `addr` are driven onto `data`.
/// While `we` is high the value on `data` is written on the next clock.
/// A soft reset keeps the contents; a hard reset clears them.
#[derive(Debug)]
pub struct RamDef;

#[derive(Debug)]
pub struct Ram {
    mem: Vec<Word>,
    mask: Word,
    addr: PortIdx,
    data: PortIdx,
    we: PortIdx,
    oe: PortIdx,
}

impl Ram {
    pub fn read(&self, addr: usize) -> Option<Word> {
        self.mem.get(addr).copied()
    }

    pub fn write(&mut self, addr: usize, value: Word) {
        if let Some(word) = self.mem.get_mut(addr) {
            *word = value & self.mask;
        }
    }

    pub fn size(&self) -> usize {
        self.mem.len()
    }

    fn cell(&self, ports: &[ExePort]) -> usize {
        ports[self.addr].value as usize % self.mem.len()
    }
}

impl CompDef for RamDef {
    fn def_id(&self) -> &str {
        "core/mem/ram"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        vec![
            PortDecl::new("addr", PortType::IN | PortType::ADDR, args.width_or("addrWidth", 4)),
            PortDecl::new("data", PortType::IN_OUT_TRI | PortType::DATA, width(args)),
            PortDecl::new("we", PortType::IN | PortType::CTRL, 1),
            PortDecl::new("oe", PortType::IN | PortType::CTRL, 1),
        ]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let addr_width = builder.args().width_or("addrWidth", 4).min(20);
        let ram = Ram {
            mem: vec![0; 1 << addr_width],
            mask: mask(width(builder.args())),
            addr: builder.port("addr")?,
            data: builder.port("data")?,
            we: builder.port("we")?,
            oe: builder.port("oe")?,
        };
        builder.add_phase(&[ram.addr, ram.we, ram.oe], &[ram.data])?;
        builder.add_latch_phase(&[ram.addr, ram.data, ram.we], &[])?;
        Ok(Box::new(ram))
    }
}

impl CompInstance for Ram {
    fn run_phase(&mut self, phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        let cell = self.cell(ports);
        let reading = ports[self.oe].value != 0 && ports[self.we].value == 0;
        match phase {
            0 => ports[self.data].drive(reading.then_some(self.mem[cell])),
            _ => {
                if ports[self.we].value != 0 {
                    self.mem[cell] = ports[self.data].value & self.mask;
                }
            },
        }
    }

    fn reset(&mut self, hard: bool) {
        if hard {
            self.mem.fill(0);
        }
    }

    fn copy_stateful_from(&mut self, prev: &dyn CompInstance) {
        if let Some(prev) = prev.as_any().downcast_ref::<Ram>() {
            for (cell, value) in self.mem.iter_mut().zip(&prev.mem) {
                *cell = *value & self.mask;
            }
        }
    }

    impl_any!();
}
