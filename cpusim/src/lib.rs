use log::*;

mod common;
mod path;
mod error;
pub mod component;
pub mod schematic;
pub mod library;
pub mod flatten;
pub mod schedule;
pub mod sim;
pub mod comps;
pub mod demo;

pub use common::*;
pub use path::*;
pub use error::*;
pub use component::*;
pub use schematic::*;
pub use library::*;
pub use flatten::{flatten, ExeNet, ExePortRef, ExeSystem, Lookup, Scope};
pub use schedule::{compile, Block, Counter, DecrTarget, Schedule, Step, StepKind, Trigger};
pub use sim::{NetState, PortState, Sim};
