use super::*;

/// Drives a fixed `value`.
#[derive(Debug)]
pub struct ConstDef;

#[derive(Debug)]
pub struct Const {
    value: Word,
}

impl CompDef for ConstDef {
    fn def_id(&self) -> &str {
        "core/io/const"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        vec![PortDecl::new("out", PortType::OUT, width(args))]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let out = builder.port("out")?;
        builder.add_phase(&[], &[out])?;
        let value = builder.args().u64_or("value", 0) & mask(width(builder.args()));
        Ok(Box::new(Const { value }))
    }
}

impl CompInstance for Const {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        ports[0].value = self.value;
    }

    impl_any!();
}

/// A value set from outside the simulation, eg by a user clicking a switch.
#[derive(Debug)]
pub struct InputDef;

#[derive(Debug)]
pub struct Input {
    value: Word,
    mask: Word,
}

impl Input {
    pub fn set(&mut self, value: Word) {
        self.value = value & self.mask;
    }

    pub fn get(&self) -> Word {
        self.value
    }
}

impl CompDef for InputDef {
    fn def_id(&self) -> &str {
        "core/io/input"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        vec![PortDecl::new("out", PortType::OUT, width(args))]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let out = builder.port("out")?;
        builder.add_phase(&[], &[out])?;
        let mask = mask(width(builder.args()));
        let value = builder.args().u64_or("value", 0) & mask;
        Ok(Box::new(Input { value, mask }))
    }
}

impl CompInstance for Input {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        ports[0].value = self.value;
    }

    fn copy_stateful_from(&mut self, prev: &dyn CompInstance) {
        if let Some(prev) = prev.as_any().downcast_ref::<Input>() {
            self.set(prev.value);
        }
    }

    impl_any!();
}

/// Records the value it sees.
#[derive(Debug)]
pub struct ProbeDef;

#[derive(Debug, Default)]
pub struct Probe {
    value: Word,
    resolved: bool,
}

impl Probe {
    pub fn value(&self) -> Word {
        self.value
    }

    /// False when the probed net floated or conflicted.
    pub fn resolved(&self) -> bool {
        self.resolved
    }
}

impl CompDef for ProbeDef {
    fn def_id(&self) -> &str {
        "core/io/probe"
    }

    fn ports(&self, args: &CompArgs) -> Vec<PortDecl> {
        vec![PortDecl::new("in", PortType::IN, width(args))]
    }

    fn build(&self, builder: &mut CompBuilder) -> Result<Box<dyn CompInstance>, BuildError> {
        let input = builder.port("in")?;
        builder.add_phase(&[input], &[])?;
        Ok(Box::new(Probe::default()))
    }
}

impl CompInstance for Probe {
    fn run_phase(&mut self, _phase: PhaseIdx, ports: &mut [ExePort], _args: &mut RunArgs) {
        self.value = ports[0].value;
        self.resolved = ports[0].resolved;
    }

    impl_any!();
}
