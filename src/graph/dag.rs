//! dag.rs
//! Builds the "is read by" graph over a calculator snapshot and derives
//! evaluation orders from it.

use crate::error::{EngineError, EngineResult};
use crate::store::Variable;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};

/// Positions (declaration indices) of the variables an output reads.
pub type Deps = SmallVec<[usize; 4]>;

/// Edge `a -> b` means "b's equation reads a's raw value".
///
/// Nodes are declaration positions. The graph is rebuilt per operation since
/// directions can change at runtime; it is never stored on the calculator.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<usize, ()>,
    ids: Vec<String>,
    is_output: Vec<bool>,
    outputs: Vec<usize>,
    dependencies: Vec<Deps>,
}

impl DependencyGraph {
    /// Outputs with a `reads_from` set get exactly those edges; the others
    /// conservatively read every current input.
    pub fn build(vars: &[Variable]) -> EngineResult<Self> {
        let count = vars.len();
        let mut graph = DiGraph::with_capacity(count, count * 2);
        for pos in 0..count {
            graph.add_node(pos);
        }

        let inputs: Deps = (0..count).filter(|&p| !vars[p].is_output()).collect();
        let mut dependencies = vec![Deps::new(); count];
        let mut outputs = Vec::new();

        for (pos, var) in vars.iter().enumerate() {
            let Some(formula) = var.formula() else { continue };
            outputs.push(pos);

            let mut deps: Deps = match &formula.reads_from {
                // Unknown ids are rejected when the calculator is constructed.
                Some(ids) => ids.iter().filter_map(|id| vars.iter().position(|v| v.id() == id)).collect(),
                None => inputs.clone(),
            };
            deps.sort_unstable();

            for &dep in &deps {
                graph.add_edge(NodeIndex::new(dep), NodeIndex::new(pos), ());
            }
            dependencies[pos] = deps;
        }

        let dag = Self {
            graph,
            ids: vars.iter().map(|v| v.id().to_string()).collect(),
            is_output: vars.iter().map(Variable::is_output).collect(),
            outputs,
            dependencies,
        };

        if let Some(cycle) = dag.find_cycle() {
            return Err(EngineError::CyclicDependency { cycle });
        }
        Ok(dag)
    }

    pub fn node_count(&self) -> usize { self.ids.len() }

    pub fn outputs(&self) -> &[usize] { &self.outputs }

    /// What `pos` reads. Empty for inputs.
    pub fn dependencies(&self, pos: usize) -> &[usize] {
        self.dependencies.get(pos).map(|d| d.as_slice()).unwrap_or(&[])
    }

    /// Outputs reading `pos`, in declaration order.
    pub fn dependents(&self, pos: usize) -> Vec<usize> {
        if pos >= self.node_count() {
            return Vec::new();
        }
        let mut children: Vec<usize> = self.graph
            .neighbors_directed(NodeIndex::new(pos), EdgeDirection::Outgoing)
            .map(|n| n.index())
            .collect();
        children.sort_unstable();
        children
    }

    /// Returns the outputs in evaluation order using Kahn's Algorithm.
    ///
    /// Inputs are already settled, so an output's in-degree only counts the
    /// outputs it reads. Ready outputs are taken in declaration order.
    pub fn evaluation_order(&self) -> EngineResult<Vec<usize>> {
        let mut in_degree = vec![0usize; self.node_count()];
        for &out in &self.outputs {
            in_degree[out] = self.dependencies[out].iter().filter(|&&d| self.is_output[d]).count();
        }

        let mut queue: VecDeque<usize> = self.outputs.iter().copied().filter(|&o| in_degree[o] == 0).collect();
        let mut order = Vec::with_capacity(self.outputs.len());

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for child in self.dependents(node) {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if order.len() != self.outputs.len() {
            let stuck = self.outputs.iter().filter(|o| !order.contains(o)).map(|&o| self.ids[o].clone()).collect();
            return Err(EngineError::CyclicDependency { cycle: stuck });
        }
        Ok(order)
    }

    /// Every output transitively reading one of `start`.
    pub fn downstream_from(&self, start: &[usize]) -> HashSet<usize> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<usize> = start.iter().copied().collect();

        while let Some(node) = queue.pop_front() {
            if visited.insert(node) {
                queue.extend(self.dependents(node));
            }
        }
        visited.retain(|&p| self.is_output[p]);
        visited
    }

    /// Names the first cycle found, as a closed path of ids (`b -> c -> b`).
    fn find_cycle(&self) -> Option<Vec<String>> {
        for scc in tarjan_scc(&self.graph) {
            let Some(&start) = scc.iter().min_by_key(|n| n.index()) else { continue };
            if scc.len() > 1 || self.graph.contains_edge(start, start) {
                let path = self.trace_cycle(start, &scc);
                return Some(path.into_iter().map(|n| self.ids[n.index()].clone()).collect());
            }
        }
        None
    }

    /// Shortest path from `start` back to itself, staying inside `members`.
    fn trace_cycle(&self, start: NodeIndex, members: &[NodeIndex]) -> Vec<NodeIndex> {
        if self.graph.contains_edge(start, start) {
            return vec![start, start];
        }
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.dependents(node.index()).into_iter().map(NodeIndex::new) {
                if !members.contains(&next) {
                    continue;
                }
                if next == start {
                    let mut path = vec![node];
                    let mut cur = node;
                    while let Some(&prev) = parent.get(&cur) {
                        cur = prev;
                        path.push(cur);
                    }
                    path.reverse();
                    path.push(start);
                    return path;
                }
                if let std::collections::hash_map::Entry::Vacant(slot) = parent.entry(next) {
                    slot.insert(node);
                    queue.push_back(next);
                }
            }
        }
        let mut fallback = members.to_vec();
        fallback.push(start);
        fallback
    }
}
