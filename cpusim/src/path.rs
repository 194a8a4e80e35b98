use std::sync::Arc;

pub const SEPARATOR: char = '|';

/// The display form of a hierarchical id, eg `cpu|alu|adder`.
///
/// Runtime structures never store these; they keep a scope chain instead
/// (see [`crate::flatten::Scope`]). A `Path` is produced for lookups,
/// diagnostics and display.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash)]
pub struct Path(Arc<String>);

impl Path {
    pub fn parent(&self) -> Option<Path> {
        self.0.rfind(SEPARATOR).map(|idx| self.0[..idx].into())
    }

    pub fn name(&self) -> &str {
        match self.0.rfind(SEPARATOR) {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    pub fn join(&self, name: &str) -> Path {
        format!("{}{SEPARATOR}{}", self, name).into()
    }

    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count()
    }
}

impl std::ops::Deref for Path {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", &self.0)
    }
}

impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Path(\"{}\")", &self.0)
    }
}

impl From<String> for Path {
    fn from(path: String) -> Path {
        Path(Arc::new(path))
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Path {
        Path(Arc::new(path.to_string()))
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Path {
        path.clone()
    }
}

#[test]
fn path_parts() {
    let path: Path = "cpu|alu".into();
    assert_eq!(path.join("add").to_string(), "cpu|alu|add");
    assert_eq!(path.parent(), Some("cpu".into()));
    assert_eq!(path.name(), "alu");
    assert_eq!(path.depth(), 1);
    let root: Path = "cpu".into();
    assert_eq!(root.parent(), None);
    assert_eq!(root.name(), "cpu");
}
