use super::*;
use std::any::Any;

/// The downcasting boilerplate every [`CompInstance`] needs.
macro_rules! impl_any {
    () => {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}
use impl_any;

pub mod basic;
pub mod mux;
pub mod adder;
pub mod tristate;
pub mod reg;
pub mod ram;
pub mod bridge;
pub mod halt;
pub mod port;

pub fn register(library: &mut CompLibrary) {
    library
        .add(basic::ConstDef)
        .add(basic::InputDef)
        .add(basic::ProbeDef)
        .add(mux::Mux2Def)
        .add(adder::AdderDef)
        .add(tristate::TriBufDef)
        .add(reg::RegDef)
        .add(ram::RamDef)
        .add(bridge::BridgeDef)
        .add(halt::HaltDef)
        .add(port::BoundaryPortDef);
}

fn width(args: &CompArgs) -> Width {
    args.width_or("width", 1)
}
