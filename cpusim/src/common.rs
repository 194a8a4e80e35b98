pub type Word = u64;
pub type Width = u32;

pub type CompIdx = usize;
pub type NetIdx = usize;
pub type PortIdx = usize;
pub type PhaseIdx = usize;
pub type BlockIdx = usize;
pub type ScopeId = usize;

pub type CompId = String;
pub type PortId = String;

/// Capability flags of a port.
///
/// A port may combine `IN | OUT | TRISTATE` to model a bidirectional pin.
/// `DATA`, `ADDR` and `CTRL` only classify the signal; `CTRL` ports are always
/// considered used by the usage backpropagation.
#[derive(Clone, Copy, Eq, PartialEq, Default, Hash)]
pub struct PortType(u8);

impl PortType {
    pub const NONE: PortType = PortType(0);
    pub const IN: PortType = PortType(1 << 0);
    pub const OUT: PortType = PortType(1 << 1);
    pub const TRISTATE: PortType = PortType(1 << 2);
    pub const DATA: PortType = PortType(1 << 3);
    pub const ADDR: PortType = PortType(1 << 4);
    pub const CTRL: PortType = PortType(1 << 5);

    pub const OUT_TRI: PortType = PortType(Self::OUT.0 | Self::TRISTATE.0);
    pub const IN_OUT_TRI: PortType = PortType(Self::IN.0 | Self::OUT.0 | Self::TRISTATE.0);

    pub fn contains(self, other: PortType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_input(self) -> bool {
        self.contains(PortType::IN)
    }

    pub fn is_output(self) -> bool {
        self.contains(PortType::OUT)
    }

    pub fn is_tristate(self) -> bool {
        self.contains(PortType::TRISTATE)
    }

    pub fn is_ctrl(self) -> bool {
        self.contains(PortType::CTRL)
    }

    pub fn is_bidirectional(self) -> bool {
        self.contains(PortType::IN | PortType::OUT)
    }

    /// The same port seen from the other side of a hierarchy boundary:
    /// `IN` becomes `OUT` and vice versa, the other flags are kept.
    pub fn flipped(self) -> PortType {
        let mut flipped = PortType(self.0 & !(PortType::IN.0 | PortType::OUT.0));
        if self.is_input() {
            flipped = flipped | PortType::OUT;
        }
        if self.is_output() {
            flipped = flipped | PortType::IN;
        }
        flipped
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for PortType {
    type Output = PortType;

    fn bitor(self, rhs: PortType) -> PortType {
        PortType(self.0 | rhs.0)
    }
}

impl std::fmt::Debug for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = [
            (PortType::IN, "In"),
            (PortType::OUT, "Out"),
            (PortType::TRISTATE, "Tri"),
            (PortType::DATA, "Data"),
            (PortType::ADDR, "Addr"),
            (PortType::CTRL, "Ctrl"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _name)| self.contains(*flag))
            .map(|(_flag, name)| *name)
            .collect();
        write!(f, "PortType({})", set.join("|"))
    }
}

/// Which way a bidirectional pin is currently facing.
/// Only meaningful on ports that are both `IN` and `OUT`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum IoDir {
    #[default]
    None,
    In,
    Out,
}

impl std::fmt::Display for IoDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoDir::None => write!(f, "-"),
            IoDir::In => write!(f, "<"),
            IoDir::Out => write!(f, ">"),
        }
    }
}

pub fn mask(width: Width) -> Word {
    if width >= 64 {
        Word::MAX
    } else {
        (1 << width) - 1
    }
}

#[test]
fn port_type_flags() {
    let bidir = PortType::IN_OUT_TRI;
    assert!(bidir.is_bidirectional());
    assert!(bidir.is_tristate());
    assert!(!PortType::OUT_TRI.is_bidirectional());
    assert_eq!((PortType::IN | PortType::CTRL).flipped(), PortType::OUT | PortType::CTRL);
    assert_eq!(bidir.flipped(), bidir);
    assert_eq!(mask(4), 0b1111);
    assert_eq!(mask(64), Word::MAX);
}
