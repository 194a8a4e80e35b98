use super::*;
use log::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered component definition and, optionally, the schematic it expands to.
#[derive(Clone)]
pub struct LibEntry {
    pub def: Arc<dyn CompDef>,
    pub sub_schematic: Option<Arc<Schematic>>,
}

impl std::fmt::Debug for LibEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibEntry")
            .field("def_id", &self.def.def_id())
            .field("sub_schematic", &self.sub_schematic.is_some())
            .finish()
    }
}

/// The declared-component registry consulted by the flattener.
#[derive(Debug, Clone, Default)]
pub struct CompLibrary {
    entries: BTreeMap<String, LibEntry>,
}

impl CompLibrary {
    pub fn new() -> CompLibrary {
        CompLibrary::default()
    }

    /// A library holding the built-in components in [`crate::comps`].
    pub fn builtin() -> CompLibrary {
        let mut library = CompLibrary::new();
        comps::register(&mut library);
        library
    }

    pub fn add<D: CompDef + 'static>(&mut self, def: D) -> &mut Self {
        self.insert(Arc::new(def), None)
    }

    /// Register a definition that has both native phase functions and an internal schematic.
    /// The native outputs win whenever the definition builds as valid.
    pub fn add_with_schematic<D: CompDef + 'static>(&mut self, def: D, schematic: Schematic) -> &mut Self {
        self.insert(Arc::new(def), Some(Arc::new(schematic)))
    }

    /// Register a definition that only exists as a schematic.
    /// Its ports are the boundary ports placed inside it.
    pub fn add_schematic(&mut self, def_id: &str, schematic: Schematic) -> &mut Self {
        let ports = schematic
            .comps
            .iter()
            .filter(|comp| comp.def_id == comps::port::DEF_ID)
            .map(|comp| comps::port::outer_decl(&comp.args, &comp.id))
            .collect();
        let def = SchematicDef {
            def_id: def_id.to_string(),
            ports,
        };
        self.insert(Arc::new(def), Some(Arc::new(schematic)))
    }

    fn insert(&mut self, def: Arc<dyn CompDef>, sub_schematic: Option<Arc<Schematic>>) -> &mut Self {
        let def_id = def.def_id().to_string();
        if self.entries.contains_key(&def_id) {
            warn!("Replacing component definition {def_id}");
        }
        self.entries.insert(def_id, LibEntry { def, sub_schematic });
        self
    }

    pub fn get(&self, def_id: &str) -> Option<&LibEntry> {
        self.entries.get(def_id)
    }

    pub fn def_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|def_id| def_id.as_str())
    }
}

#[derive(Debug)]
struct SchematicDef {
    def_id: String,
    ports: Vec<PortDecl>,
}

impl CompDef for SchematicDef {
    fn def_id(&self) -> &str {
        &self.def_id
    }

    fn ports(&self, _args: &CompArgs) -> Vec<PortDecl> {
        self.ports.clone()
    }
}
