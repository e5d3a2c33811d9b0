//! Topological ordering and cycle detection (`spec.md` §4.1.4).

use std::collections::{BTreeMap, BTreeSet};

use portsmith_core::error::{Error, ErrorCode};
use portsmith_core::{AHashMap, PackageSpec, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Topologically sort `specs` given `edges` (spec -> its dependencies),
/// breaking ties by [`PackageSpec`]'s lexicographic `Ord` so re-runs over
/// the same input always produce the same order.
///
/// Returns [`Error::DependencyCycle`] naming the full cycle when the graph
/// isn't a DAG.
pub fn topological_order(
    specs: &[PackageSpec],
    edges: &AHashMap<PackageSpec, Vec<PackageSpec>>,
) -> Result<Vec<PackageSpec>> {
    let mut graph: DiGraph<PackageSpec, ()> = DiGraph::new();
    let mut indices: BTreeMap<PackageSpec, NodeIndex> = BTreeMap::new();

    for spec in specs {
        indices.entry(spec.clone()).or_insert_with(|| graph.add_node(spec.clone()));
    }
    for (spec, deps) in edges {
        let from = *indices.entry(spec.clone()).or_insert_with(|| graph.add_node(spec.clone()));
        for dep in deps {
            let to = *indices.entry(dep.clone()).or_insert_with(|| graph.add_node(dep.clone()));
            // Edge points dependency -> dependent, so a dependency's
            // in-degree-zero status means "ready to install first".
            graph.add_edge(to, from, ());
        }
    }

    let mut in_degree: AHashMap<NodeIndex, usize> = AHashMap::default();
    for &idx in indices.values() {
        in_degree.insert(idx, graph.edges_directed(idx, Direction::Incoming).count());
    }

    let mut ready: BTreeSet<PackageSpec> = indices
        .iter()
        .filter(|(_, idx)| in_degree[idx] == 0)
        .map(|(spec, _)| spec.clone())
        .collect();

    let mut order = Vec::with_capacity(indices.len());
    let mut remaining = indices.len();

    while let Some(spec) = ready.iter().next().cloned() {
        ready.remove(&spec);
        order.push(spec.clone());
        remaining -= 1;

        let idx = indices[&spec];
        for edge in graph.edges_directed(idx, Direction::Outgoing) {
            let neighbor = edge.target();
            let degree = in_degree.get_mut(&neighbor).expect("node indexed");
            *degree -= 1;
            if *degree == 0 {
                let neighbor_spec = graph[neighbor].clone();
                ready.insert(neighbor_spec);
            }
        }
    }

    if remaining > 0 {
        let cycle = find_cycle(&graph, &indices);
        return Err(Error::DependencyCycle {
            code: ErrorCode::DependencyCycle,
            cycle: cycle.iter().map(PackageSpec::canonical_name).collect(),
        });
    }

    Ok(order)
}

/// Find one cycle in `graph` via DFS, for error reporting only — the main
/// sort already detected that one exists via leftover in-degree.
fn find_cycle(graph: &DiGraph<PackageSpec, ()>, indices: &BTreeMap<PackageSpec, NodeIndex>) -> Vec<PackageSpec> {
    let mut visiting = vec![false; graph.node_count()];
    let mut visited = vec![false; graph.node_count()];
    let mut stack = Vec::new();

    for &start in indices.values() {
        if visited[start.index()] {
            continue;
        }
        if let Some(cycle) = dfs(graph, start, &mut visiting, &mut visited, &mut stack) {
            return cycle;
        }
    }
    Vec::new()
}

fn dfs(
    graph: &DiGraph<PackageSpec, ()>,
    node: NodeIndex,
    visiting: &mut [bool],
    visited: &mut [bool],
    stack: &mut Vec<NodeIndex>,
) -> Option<Vec<PackageSpec>> {
    visiting[node.index()] = true;
    stack.push(node);

    for edge in graph.edges_directed(node, Direction::Outgoing) {
        let next = edge.target();
        if visiting[next.index()] {
            let start = stack.iter().position(|&n| n == next).unwrap_or(0);
            let mut cycle: Vec<PackageSpec> = stack[start..].iter().map(|&n| graph[n].clone()).collect();
            cycle.push(graph[next].clone());
            return Some(cycle);
        }
        if !visited[next.index()] {
            if let Some(c) = dfs(graph, next, visiting, visited, stack) {
                return Some(c);
            }
        }
    }

    stack.pop();
    visiting[node.index()] = false;
    visited[node.index()] = true;
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsmith_core::Triplet;

    fn spec(name: &str) -> PackageSpec {
        PackageSpec::new(name, Triplet::new("x64-linux"))
    }

    #[test]
    fn dependencies_come_before_dependents() {
        let a = spec("a");
        let b = spec("b");
        let edges = AHashMap::from_iter([(a.clone(), vec![b.clone()])]);
        let order = topological_order(&[a.clone(), b.clone()], &edges).unwrap();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn ties_break_lexicographically() {
        let a = spec("a");
        let b = spec("b");
        let c = spec("c");
        // a and b both depend on nothing; c depends on both. Order among
        // independents (a, b) must be lex.
        let edges = AHashMap::from_iter([(c.clone(), vec![a.clone(), b.clone()])]);
        let order = topological_order(&[a.clone(), b.clone(), c.clone()], &edges).unwrap();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn cycle_is_reported() {
        let a = spec("a");
        let b = spec("b");
        let edges = AHashMap::from_iter([(a.clone(), vec![b.clone()]), (b.clone(), vec![a.clone()])]);
        let err = topological_order(&[a, b], &edges).unwrap_err();
        assert_eq!(err.code(), portsmith_core::ErrorCode::DependencyCycle);
    }
}
