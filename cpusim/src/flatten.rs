use super::*;
use log::*;
use std::collections::BTreeMap;

use crate::comps::port as boundary;

pub const ROOT_SCOPE: ScopeId = 0;

/// One level of hierarchy. Every component and net records the scope it was placed in.
#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Local id of the component this scope expands. Empty for the root.
    pub name: CompId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExePortRef {
    pub comp: CompIdx,
    pub port: PortIdx,
}

#[derive(Debug, Clone)]
pub struct ExeNet {
    pub scope: ScopeId,
    pub wire_ids: Vec<String>,
    pub width: Width,
    pub tristate: bool,
    pub srcs: Vec<ExePortRef>,
    pub dests: Vec<ExePortRef>,
    pub value: Word,
    /// Drivers found enabled by the last resolution.
    pub enabled_count: usize,
}

impl ExeNet {
    fn new(scope: ScopeId, wire_ids: Vec<String>) -> ExeNet {
        ExeNet {
            scope,
            wire_ids,
            width: 0,
            tristate: false,
            srcs: vec![],
            dests: vec![],
            value: 0,
            enabled_count: 0,
        }
    }

    pub fn is_floating(&self) -> bool {
        self.tristate && self.enabled_count == 0
    }

    pub fn is_conflicted(&self) -> bool {
        self.tristate && self.enabled_count > 1
    }
}

/// Hierarchical ids to runtime indices.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub comp_idx_by_path: BTreeMap<Path, CompIdx>,
    pub net_idx_by_path: BTreeMap<Path, NetIdx>,
}

/// The flat table of runtime components and nets.
#[derive(Debug, Default)]
pub struct ExeSystem {
    pub comps: Vec<ExeComp>,
    pub nets: Vec<ExeNet>,
    pub scopes: Vec<Scope>,
    pub lookup: Lookup,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExeSystem {
    /// The path of a scope, or `None` for the root.
    pub fn scope_path(&self, scope: ScopeId) -> Option<Path> {
        let Scope { parent, name } = &self.scopes[scope];
        let parent = (*parent)?;
        match self.scope_path(parent) {
            Some(path) => Some(path.join(name)),
            None => Some(name.as_str().into()),
        }
    }

    pub fn local_path(&self, scope: ScopeId, local_id: &str) -> Path {
        match self.scope_path(scope) {
            Some(path) => path.join(local_id),
            None => local_id.into(),
        }
    }

    pub fn comp_path(&self, comp_idx: CompIdx) -> Path {
        let comp = &self.comps[comp_idx];
        self.local_path(comp.scope, &comp.local_id)
    }

    pub fn net_path(&self, net_idx: NetIdx) -> Path {
        let net = &self.nets[net_idx];
        match net.wire_ids.first() {
            Some(wire_id) => self.local_path(net.scope, wire_id),
            None => format!("net{net_idx}").into(),
        }
    }

    pub fn port_path(&self, port_ref: ExePortRef) -> Path {
        let comp = &self.comps[port_ref.comp];
        self.comp_path(port_ref.comp).join(&comp.port_ids[port_ref.port])
    }

    pub fn port(&self, port_ref: ExePortRef) -> &ExePort {
        &self.comps[port_ref.comp].ports[port_ref.port]
    }

    pub fn port_mut(&mut self, port_ref: ExePortRef) -> &mut ExePort {
        &mut self.comps[port_ref.comp].ports[port_ref.port]
    }

    pub fn comp_idx(&self, path: &str) -> Option<CompIdx> {
        self.lookup.comp_idx_by_path.get(&Path::from(path)).copied()
    }

    pub fn net_idx(&self, path: &str) -> Option<NetIdx> {
        self.lookup.net_idx_by_path.get(&Path::from(path)).copied()
    }
}

/// Flatten `schematic` into an [`ExeSystem`].
///
/// Components with a sub-schematic are expanded into their own scope before the
/// outer component is built. When `prev` is given, components at the same path
/// with the same definition carry their stateful data over.
pub fn flatten(library: &CompLibrary, schematic: &Schematic, prev: Option<&ExeSystem>) -> ExeSystem {
    let mut flattener = Flattener {
        library,
        prev,
        system: ExeSystem::default(),
    };
    flattener.system.scopes.push(Scope {
        parent: None,
        name: CompId::new(),
    });
    flattener.flatten_schematic(schematic, ROOT_SCOPE);
    flattener.finish()
}

/// A placed component's boundary ports, keyed by the outer port id.
type Boundary = BTreeMap<PortId, CompIdx>;

struct Placed {
    comp: CompIdx,
    boundary: Boundary,
}

struct Flattener<'a> {
    library: &'a CompLibrary,
    prev: Option<&'a ExeSystem>,
    system: ExeSystem,
}

impl<'a> Flattener<'a> {
    fn flatten_schematic(&mut self, schematic: &Schematic, scope: ScopeId) -> BTreeMap<CompId, Placed> {
        let library = self.library;
        let mut placed = BTreeMap::new();

        for comp in &schematic.comps {
            let path = self.system.local_path(scope, &comp.id);
            let Some(entry) = library.get(&comp.def_id) else {
                self.diagnose(Diagnostic::UnknownComponentDef(path, comp.def_id.clone()));
                continue;
            };

            let boundary = match &entry.sub_schematic {
                Some(sub_schematic) => {
                    let child = self.system.scopes.len();
                    self.system.scopes.push(Scope {
                        parent: Some(scope),
                        name: comp.id.clone(),
                    });
                    let inner = self.flatten_schematic(sub_schematic, child);
                    sub_schematic
                        .comps
                        .iter()
                        .filter(|inner_comp| inner_comp.def_id == boundary::DEF_ID)
                        .filter_map(|inner_comp| {
                            let decl = boundary::outer_decl(&inner_comp.args, &inner_comp.id);
                            inner.get(&inner_comp.id).map(|inner_placed| (decl.id, inner_placed.comp))
                        })
                        .collect()
                },
                None => Boundary::new(),
            };

            if let Some(comp_idx) = self.build_comp(entry, comp, scope, path) {
                placed.insert(comp.id.clone(), Placed { comp: comp_idx, boundary });
            }
        }

        self.bind_wires(schematic, scope, &placed);
        placed
    }

    fn build_comp(&mut self, entry: &LibEntry, comp: &SchematicComp, scope: ScopeId, path: Path) -> Option<CompIdx> {
        let decls = entry.def.ports(&comp.args);
        let mut builder = CompBuilder::new(&comp.def_id, comp.args.clone(), &decls);
        let mut instance = match entry.def.build(&mut builder) {
            Ok(instance) => instance,
            Err(error) => {
                self.diagnose(Diagnostic::Build(path, error));
                return None;
            },
        };
        let (port_ids, ports, phases, valid) = builder.finish();

        let prev_comp = self.prev.and_then(|prev| {
            prev.lookup.comp_idx_by_path.get(&path).map(|&comp_idx| &prev.comps[comp_idx])
        });
        if let Some(prev_comp) = prev_comp {
            if prev_comp.def_id == comp.def_id {
                debug!("Carrying state over for {path}");
                instance.copy_stateful_from(prev_comp.instance.as_ref());
            }
        }

        let comp_idx = self.system.comps.len();
        self.system.comps.push(ExeComp {
            local_id: comp.id.clone(),
            scope,
            def_id: comp.def_id.clone(),
            port_ids,
            ports,
            phases,
            instance,
            valid,
        });
        self.system.lookup.comp_idx_by_path.insert(path, comp_idx);
        Some(comp_idx)
    }

    fn bind_wires(&mut self, schematic: &Schematic, scope: ScopeId, placed: &BTreeMap<CompId, Placed>) {
        for group in merge_wires(&schematic.wires) {
            let net_idx = self.system.nets.len();
            let wire_ids: Vec<String> = group.iter().map(|&wire| schematic.wires[wire].id.clone()).collect();
            for wire_id in &wire_ids {
                let path = self.system.local_path(scope, wire_id);
                self.system.lookup.net_idx_by_path.insert(path, net_idx);
            }
            self.system.nets.push(ExeNet::new(scope, wire_ids));

            let mut seen: Vec<&PortRef> = vec![];
            for &wire in &group {
                for endpoint in &schematic.wires[wire].endpoints {
                    if seen.contains(&endpoint) {
                        continue;
                    }
                    seen.push(endpoint);

                    let Some(placed_comp) = placed.get(&endpoint.comp_id) else {
                        let wire_id = self.system.local_path(scope, &schematic.wires[wire].id);
                        self.diagnose(Diagnostic::UnknownComponent(wire_id.to_string(), endpoint.comp_id.clone()));
                        continue;
                    };
                    let Some(port) = self.system.comps[placed_comp.comp].port_idx(&endpoint.port_id) else {
                        let comp_path = self.system.comp_path(placed_comp.comp);
                        self.diagnose(Diagnostic::UnknownPort(comp_path, endpoint.port_id.clone()));
                        continue;
                    };
                    self.bind_endpoint(net_idx, placed_comp, port, &endpoint.port_id);
                }
            }
        }
    }

    fn bind_endpoint(&mut self, net_idx: NetIdx, placed: &Placed, port: PortIdx, port_id: &str) {
        /*
            A port of a component that expands to a sub-schematic is also bound to the
            external pin of the matching boundary port inside it.
            Inbound values reach both. Outbound values come from exactly one of them:
            the native output when the component built as valid, the boundary port otherwise.
        */
        let outer = ExePortRef { comp: placed.comp, port };
        let inner = placed.boundary.get(port_id).and_then(|&inner_comp| {
            self.system.comps[inner_comp]
                .port_idx(boundary::EXTERNAL_PIN)
                .map(|port| ExePortRef { comp: inner_comp, port })
        });

        match inner {
            None => self.bind(net_idx, outer, true),
            Some(inner) => {
                let native = self.system.comps[placed.comp].valid;
                self.bind(net_idx, outer, native);
                self.bind(net_idx, inner, !native);
            },
        }
    }

    fn bind(&mut self, net_idx: NetIdx, port_ref: ExePortRef, as_src: bool) {
        let port = self.system.port(port_ref);
        let is_src = as_src && port.port_type.is_output();
        let is_dest = port.port_type.is_input();
        if !is_src && !is_dest {
            return;
        }

        let (width, tristate) = (port.width, port.port_type.is_tristate());
        let net_width = self.system.nets[net_idx].width;
        if net_width != 0 && net_width != width {
            let net_path = self.system.net_path(net_idx);
            self.diagnose(Diagnostic::WidthMismatch(net_path.to_string(), net_width, width));
            return;
        }

        let net = &mut self.system.nets[net_idx];
        net.width = width;
        net.tristate |= tristate;
        if is_src {
            net.srcs.push(port_ref);
        }
        if is_dest {
            net.dests.push(port_ref);
        }
        self.system.port_mut(port_ref).net_idx = Some(net_idx);
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.system.diagnostics.push(diagnostic);
    }

    fn finish(mut self) -> ExeSystem {
        for net_idx in 0..self.system.nets.len() {
            let net = &self.system.nets[net_idx];
            if !net.tristate && net.srcs.len() > 1 {
                let count = net.srcs.len();
                let net_path = self.system.net_path(net_idx);
                self.diagnose(Diagnostic::MultipleDrivers(net_path.to_string(), count));
            }
        }
        info!(
            "Flattened {} components into {} nets across {} scopes ({} diagnostics)",
            self.system.comps.len(),
            self.system.nets.len(),
            self.system.scopes.len(),
            self.system.diagnostics.len(),
        );
        self.system
    }
}

/// Group wires that touch a common port. Each group becomes one net.
/// Groups are ordered by their first wire.
fn merge_wires(wires: &[Wire]) -> Vec<Vec<usize>> {
    fn find(parent: &mut [usize], mut wire: usize) -> usize {
        while parent[wire] != wire {
            parent[wire] = parent[parent[wire]];
            wire = parent[wire];
        }
        wire
    }

    let mut parent: Vec<usize> = (0..wires.len()).collect();
    let mut owner: BTreeMap<&PortRef, usize> = BTreeMap::new();

    for (wire, Wire { endpoints, .. }) in wires.iter().enumerate() {
        for endpoint in endpoints {
            match owner.get(endpoint) {
                Some(&other) => {
                    let (a, b) = (find(&mut parent, wire), find(&mut parent, other));
                    parent[a.max(b)] = a.min(b);
                },
                None => {
                    owner.insert(endpoint, wire);
                },
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for wire in 0..wires.len() {
        let root = find(&mut parent, wire);
        groups.entry(root).or_default().push(wire);
    }
    groups.into_values().collect()
}

#[test]
fn wires_sharing_a_port_merge() {
    let schematic = Schematic::new()
        .wire("w0", &["a.out", "b.in"])
        .wire("w1", &["c.out", "d.in"])
        .wire("w2", &["b.in", "e.in"]);
    assert_eq!(merge_wires(&schematic.wires), vec![vec![0, 2], vec![1]]);
}
