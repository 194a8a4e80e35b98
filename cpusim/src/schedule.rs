use super::*;
use log::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};

#[cfg(test)]
mod tests;

/// One unit of work inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepKind {
    Phase(CompIdx, PhaseIdx),
    Net(NetIdx),
}

/// When a [`DecrTarget`] fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// As soon as the step has run.
    Fired,
    /// Once the step has run, if this port of the step's component is driving.
    PortDriving(PortIdx),
}

/// A counter of another block decremented at runtime by a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecrTarget {
    pub block: BlockIdx,
    pub counter: usize,
    pub trigger: Trigger,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,
    pub decr_targets: Vec<DecrTarget>,
}

/// An outstanding dependency of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Number of predecessor blocks that must finish first.
    Plain(usize),
    /// Any one of this many candidate steps satisfies the dependency.
    OneOf(usize),
}

impl Counter {
    pub fn initial(&self) -> usize {
        match self {
            Counter::Plain(count) => *count,
            Counter::OneOf(_candidates) => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub steps: Vec<Step>,
    /// Index 0 is always the plain predecessor count.
    pub counters: Vec<Counter>,
    /// Blocks whose plain counter drops when this block finishes.
    pub decr_block_targets: Vec<BlockIdx>,
}

impl Block {
    pub fn resolved_initial(&self) -> Vec<usize> {
        self.counters.iter().map(|counter| counter.initial()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub blocks: Vec<Block>,
    pub latch_steps: Vec<(CompIdx, PhaseIdx)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Schedule {
    pub fn step_count(&self) -> usize {
        self.blocks.iter().map(|block| block.steps.len()).sum()
    }

    /// The block a step was placed in.
    pub fn block_of(&self, kind: StepKind) -> Option<BlockIdx> {
        self.blocks
            .iter()
            .position(|block| block.steps.iter().any(|step| step.kind == kind))
    }
}

pub fn step_name(system: &ExeSystem, kind: StepKind) -> String {
    match kind {
        StepKind::Phase(comp, phase) => format!("{}#{phase}", system.comp_path(comp)),
        StepKind::Net(net) => system.net_path(net).to_string(),
    }
}

type NodeIdx = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Plain,
    /// The target needs any one of its `OneOf` sources to have run.
    OneOf,
    /// The source drives the target net through this port, only known at runtime.
    Drive(PortIdx),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    to: NodeIdx,
    kind: EdgeKind,
}

#[derive(Debug)]
struct Node {
    kind: StepKind,
    edges: Vec<Edge>,
    plain_preds: Vec<NodeIdx>,
    dyn_in: usize,
    one_of_in: usize,
    cross_group: bool,
}

impl Node {
    fn new(kind: StepKind) -> Node {
        Node {
            kind,
            edges: vec![],
            plain_preds: vec![],
            dyn_in: 0,
            one_of_in: 0,
            cross_group: false,
        }
    }

    fn is_dynamic(&self) -> bool {
        self.dyn_in > 0
    }
}

/// The dependency graph between phase steps and net steps, as a dense arena.
struct StepGraph {
    nodes: Vec<Node>,
    phase_nodes: BTreeMap<(CompIdx, PhaseIdx), NodeIdx>,
    net_nodes: Vec<NodeIdx>,
}

impl StepGraph {
    fn add_edge(&mut self, from: NodeIdx, to: NodeIdx, kind: EdgeKind) {
        let edge = Edge { to, kind };
        if self.nodes[from].edges.contains(&edge) {
            return;
        }
        self.nodes[from].edges.push(edge);
        let target = &mut self.nodes[to];
        match kind {
            EdgeKind::Plain => target.plain_preds.push(from),
            EdgeKind::OneOf => {
                target.dyn_in += 1;
                target.one_of_in += 1;
            },
            EdgeKind::Drive(_port) => target.dyn_in += 1,
        }
    }

    fn to_petgraph<F: Fn(EdgeKind) -> bool>(&self, keep: F) -> DiGraph<NodeIdx, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), 0);
        for node in 0..self.nodes.len() {
            graph.add_node(node);
        }
        for (from, node) in self.nodes.iter().enumerate() {
            for edge in &node.edges {
                if keep(edge.kind) {
                    graph.add_edge(NodeIndex::new(from), NodeIndex::new(edge.to), ());
                }
            }
        }
        graph
    }
}

/// A phase write onto a net, before deciding how it is ordered.
struct WriteEdge {
    phase_node: NodeIdx,
    net: NetIdx,
    port: PortIdx,
}

/// Compile the flattened system into blocks and latch steps.
pub fn compile(system: &ExeSystem) -> Schedule {
    let mut schedule = Schedule::default();
    let graph = build_graph(system);
    let placement = place_nodes(system, &graph, &mut schedule.diagnostics);
    schedule.blocks = make_blocks(&graph, &placement);
    schedule.latch_steps = make_latch_steps(system, &schedule.blocks);

    info!(
        "Compiled schedule: {} blocks, {} steps, {} latch steps",
        schedule.blocks.len(),
        schedule.step_count(),
        schedule.latch_steps.len(),
    );
    for (block_idx, block) in schedule.blocks.iter().enumerate() {
        let steps: Vec<String> = block.steps.iter().map(|step| step_name(system, step.kind)).collect();
        debug!("  block {block_idx} {:?}: {}", block.resolved_initial(), steps.join(", "));
    }
    schedule
}

fn build_graph(system: &ExeSystem) -> StepGraph {
    let mut graph = StepGraph {
        nodes: vec![],
        phase_nodes: BTreeMap::new(),
        net_nodes: vec![],
    };

    for (comp_idx, comp) in system.comps.iter().enumerate() {
        for (phase_idx, phase) in comp.phases.iter().enumerate() {
            if !phase.is_latch {
                graph.phase_nodes.insert((comp_idx, phase_idx), graph.nodes.len());
                graph.nodes.push(Node::new(StepKind::Phase(comp_idx, phase_idx)));
            }
        }
    }
    for net_idx in 0..system.nets.len() {
        graph.net_nodes.push(graph.nodes.len());
        graph.nodes.push(Node::new(StepKind::Net(net_idx)));
    }

    // phases of one component run in order
    for (comp_idx, comp) in system.comps.iter().enumerate() {
        let nodes: Vec<NodeIdx> = (0..comp.phases.len())
            .filter_map(|phase_idx| graph.phase_nodes.get(&(comp_idx, phase_idx)).copied())
            .collect();
        for pair in nodes.windows(2) {
            graph.add_edge(pair[0], pair[1], EdgeKind::Plain);
        }
    }

    let mut writes = vec![];
    for (&(comp_idx, phase_idx), &phase_node) in &graph.phase_nodes.clone() {
        let comp = &system.comps[comp_idx];
        let phase = &comp.phases[phase_idx];

        for &port in &phase.write_ports {
            if let Some(net) = bound_net(system, comp_idx, port, |exe_net| &exe_net.srcs) {
                writes.push(WriteEdge { phase_node, net, port });
            }
        }

        let mut reads: Vec<PortIdx> = phase.read_ports.clone();
        reads.extend(phase.any_of.iter().filter(|port| !phase.read_ports.contains(*port)));
        for port in reads {
            let Some(net) = bound_net(system, comp_idx, port, |exe_net| &exe_net.dests) else {
                continue;
            };
            let net_node = graph.net_nodes[net];
            if phase.any_of.contains(&port) {
                graph.add_edge(net_node, phase_node, EdgeKind::OneOf);
            } else if drives_from(system, comp_idx, phase_idx, net) {
                graph.nodes[phase_node].cross_group = true;
            } else {
                graph.add_edge(net_node, phase_node, EdgeKind::Plain);
            }
        }
    }

    /*
        A tri-state driver that (transitively) waits on the net it drives can't be a
        plain predecessor of that net. Such drivers are deferred: the net waits for
        any one of its drivers to actually drive it, decided at runtime.
    */
    let mut full = graph.to_petgraph(|_kind| true);
    for write in &writes {
        full.add_edge(NodeIndex::new(write.phase_node), NodeIndex::new(graph.net_nodes[write.net]), ());
    }
    let deferred: Vec<bool> = writes
        .iter()
        .map(|write| {
            let net_node = NodeIndex::new(graph.net_nodes[write.net]);
            system.nets[write.net].tristate && has_path_connecting(&full, net_node, NodeIndex::new(write.phase_node), None)
        })
        .collect();
    let dynamic_nets: BTreeSet<NetIdx> = writes
        .iter()
        .zip(&deferred)
        .filter(|(_write, &deferred)| deferred)
        .map(|(write, _deferred)| write.net)
        .collect();

    for (write, &deferred) in writes.iter().zip(&deferred) {
        let net_node = graph.net_nodes[write.net];
        if !deferred {
            graph.add_edge(write.phase_node, net_node, EdgeKind::Plain);
        }
        if dynamic_nets.contains(&write.net) {
            graph.add_edge(write.phase_node, net_node, EdgeKind::Drive(write.port));
        }
    }

    graph
}

/// The net a port is bound to, if the port is registered on the given side of it.
fn bound_net<F>(system: &ExeSystem, comp: CompIdx, port: PortIdx, side: F) -> Option<NetIdx>
where
    F: Fn(&ExeNet) -> &Vec<ExePortRef>,
{
    let net = system.comps[comp].ports.get(port)?.net_idx?;
    let port_ref = ExePortRef { comp, port };
    side(&system.nets[net]).contains(&port_ref).then_some(net)
}

/// Whether the component drives `net` from `phase_idx` or a later non-latch phase.
fn drives_from(system: &ExeSystem, comp_idx: CompIdx, phase_idx: PhaseIdx, net: NetIdx) -> bool {
    system.comps[comp_idx].phases[phase_idx..]
        .iter()
        .filter(|phase| !phase.is_latch)
        .flat_map(|phase| phase.write_ports.iter())
        .any(|&port| bound_net(system, comp_idx, port, |exe_net| &exe_net.srcs) == Some(net))
}

struct Placement {
    order: Vec<NodeIdx>,
    position: Vec<usize>,
    block_of: Vec<BlockIdx>,
    block_count: usize,
}

/// Kahn-style placement of every node, grouping nodes into blocks as they are placed.
fn place_nodes(system: &ExeSystem, graph: &StepGraph, diagnostics: &mut Vec<Diagnostic>) -> Placement {
    let node_count = graph.nodes.len();
    let mut remaining: Vec<usize> = graph.nodes.iter().map(|node| node.plain_preds.len()).collect();
    let mut one_of_met = vec![false; node_count];
    let mut queued = vec![false; node_count];
    let mut placed = vec![false; node_count];

    let mut ready: VecDeque<NodeIdx> = VecDeque::new();
    let mut deferred: VecDeque<NodeIdx> = VecDeque::new();

    let mut placement = Placement {
        order: vec![],
        position: vec![usize::MAX; node_count],
        block_of: vec![usize::MAX; node_count],
        block_count: 0,
    };

    // dynamic blocks each node transitively waits on
    let mut dyn_sets: Vec<BTreeSet<NodeIdx>> = vec![BTreeSet::new(); node_count];
    let mut block_dyn: Option<BTreeSet<NodeIdx>> = None;

    let is_ready = |node: NodeIdx, remaining: &[usize], one_of_met: &[bool]| {
        remaining[node] == 0 && (graph.nodes[node].one_of_in == 0 || one_of_met[node])
    };

    for node in 0..node_count {
        if is_ready(node, &remaining, &one_of_met) {
            queued[node] = true;
            if graph.nodes[node].cross_group {
                deferred.push_back(node);
            } else {
                ready.push_back(node);
            }
        }
    }

    let plain_graph = graph.to_petgraph(|kind| kind == EdgeKind::Plain);
    let sccs = tarjan_scc(&plain_graph);
    let mut scc_of = vec![0; node_count];
    for (scc_idx, scc) in sccs.iter().enumerate() {
        for node in scc {
            scc_of[node.index()] = scc_idx;
        }
    }

    while placement.order.len() < node_count {
        let node = match ready.pop_front().or_else(|| deferred.pop_front()) {
            Some(node) if placed[node] => continue,
            Some(node) => node,
            None => {
                let unplaced = (0..node_count).filter(|&node| !placed[node]);
                let waiting_one_of = unplaced.clone().find(|&node| remaining[node] == 0);
                match waiting_one_of {
                    Some(node) => node,
                    None => {
                        let node = unplaced
                            .min_by_key(|&node| (sccs[scc_of[node]].len() == 1, remaining[node], node))
                            .unwrap_or(0);
                        let mut cycle: Vec<String> = sccs[scc_of[node]]
                            .iter()
                            .filter(|member| !placed[member.index()])
                            .map(|member| step_name(system, graph.nodes[member.index()].kind))
                            .collect();
                        cycle.sort();
                        let diagnostic = Diagnostic::CombinationalLoop(cycle);
                        warn!("{diagnostic}");
                        diagnostics.push(diagnostic);
                        node
                    },
                }
            },
        };

        // assign to a block
        let mut dyn_set = BTreeSet::new();
        for &pred in &graph.nodes[node].plain_preds {
            if placed[pred] {
                dyn_set.extend(dyn_sets[pred].iter().copied());
            }
        }
        if graph.nodes[node].is_dynamic() {
            dyn_set.insert(node);
        }
        let starts_block = graph.nodes[node].is_dynamic()
            || graph.nodes[node].cross_group
            || block_dyn.as_ref() != Some(&dyn_set);
        if starts_block {
            placement.block_count += 1;
            block_dyn = Some(dyn_set.clone());
        }
        dyn_sets[node] = dyn_set;
        placement.block_of[node] = placement.block_count - 1;
        placement.position[node] = placement.order.len();
        placement.order.push(node);
        placed[node] = true;
        queued[node] = true;

        for edge in &graph.nodes[node].edges {
            match edge.kind {
                EdgeKind::Plain => remaining[edge.to] = remaining[edge.to].saturating_sub(1),
                EdgeKind::OneOf => one_of_met[edge.to] = true,
                EdgeKind::Drive(_port) => (),
            }
            if !placed[edge.to] && !queued[edge.to] && is_ready(edge.to, &remaining, &one_of_met) {
                queued[edge.to] = true;
                if graph.nodes[edge.to].cross_group {
                    deferred.push_back(edge.to);
                } else {
                    ready.push_back(edge.to);
                }
            }
        }
    }

    placement
}

fn make_blocks(graph: &StepGraph, placement: &Placement) -> Vec<Block> {
    let mut blocks: Vec<Block> = (0..placement.block_count)
        .map(|_block_idx| Block {
            steps: vec![],
            counters: vec![],
            decr_block_targets: vec![],
        })
        .collect();

    let mut pred_blocks: Vec<BTreeSet<BlockIdx>> = vec![BTreeSet::new(); placement.block_count];
    for &node in &placement.order {
        let block_idx = placement.block_of[node];
        for &pred in &graph.nodes[node].plain_preds {
            let pred_block = placement.block_of[pred];
            // back edges from a broken loop are not waited on
            if pred_block != block_idx && placement.position[pred] < placement.position[node] {
                pred_blocks[block_idx].insert(pred_block);
            }
        }
    }
    for (block_idx, preds) in pred_blocks.iter().enumerate() {
        blocks[block_idx].counters.push(Counter::Plain(preds.len()));
        for &pred_block in preds {
            blocks[pred_block].decr_block_targets.push(block_idx);
        }
    }

    // where each dynamic node's one-of counter lives in its block
    let mut one_of_counter: Vec<Option<usize>> = vec![None; graph.nodes.len()];
    for &node in &placement.order {
        let node_ref = &graph.nodes[node];
        if node_ref.is_dynamic() {
            let counters = &mut blocks[placement.block_of[node]].counters;
            one_of_counter[node] = Some(counters.len());
            counters.push(Counter::OneOf(node_ref.dyn_in));
        }
    }

    for &node in &placement.order {
        let block_idx = placement.block_of[node];
        let decr_targets = graph.nodes[node]
            .edges
            .iter()
            .filter_map(|edge| {
                let trigger = match edge.kind {
                    EdgeKind::Plain => return None,
                    EdgeKind::OneOf => Trigger::Fired,
                    EdgeKind::Drive(port) => Trigger::PortDriving(port),
                };
                let target_block = placement.block_of[edge.to];
                let counter = one_of_counter[edge.to]?;
                (target_block != block_idx).then_some(DecrTarget {
                    block: target_block,
                    counter,
                    trigger,
                })
            })
            .collect();

        blocks[block_idx].steps.push(Step {
            kind: graph.nodes[node].kind,
            decr_targets,
        });
    }

    blocks
}

/// Every latch phase, ordered by where its component first ran in the settle.
/// Components that only have latch phases go last.
fn make_latch_steps(system: &ExeSystem, blocks: &[Block]) -> Vec<(CompIdx, PhaseIdx)> {
    let mut comp_order: Vec<CompIdx> = vec![];
    for block in blocks {
        for step in &block.steps {
            if let StepKind::Phase(comp_idx, _phase_idx) = step.kind {
                if !comp_order.contains(&comp_idx) {
                    comp_order.push(comp_idx);
                }
            }
        }
    }
    for comp_idx in 0..system.comps.len() {
        if !comp_order.contains(&comp_idx) {
            comp_order.push(comp_idx);
        }
    }

    comp_order
        .into_iter()
        .flat_map(|comp_idx| {
            system.comps[comp_idx]
                .phases
                .iter()
                .enumerate()
                .filter(|(_phase_idx, phase)| phase.is_latch)
                .map(move |(phase_idx, _phase)| (comp_idx, phase_idx))
        })
        .collect()
}
