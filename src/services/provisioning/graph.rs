// src/services/provisioning/graph.rs

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Debug;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError<K: Debug> {
    #[error("dependency cycle among {0:?}")]
    Cycle(Vec<K>),

    #[error("{node:?} depends on unknown {dependency:?}")]
    UnknownDependency { node: K, dependency: K },
}

/// Kahn's algorithm over `(node, dependencies)` pairs.
///
/// Nodes that become ready at the same time keep their input order, so a catalog declared
/// in a sensible order is built in that order.
pub fn topological_order<K>(nodes: &[(K, Vec<K>)]) -> Result<Vec<K>, GraphError<K>>
where
    K: Ord + Clone + Debug,
{
    let position: BTreeMap<&K, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, (k, _))| (k, i))
        .collect();

    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, (node, deps)) in nodes.iter().enumerate() {
        for dep in deps {
            let Some(&j) = position.get(dep) else {
                return Err(GraphError::UnknownDependency {
                    node: node.clone(),
                    dependency: dep.clone(),
                });
            };
            in_degree[i] += 1;
            dependents[j].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(i) = queue.pop_front() {
        order.push(nodes[i].0.clone());
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                queue.push_back(d);
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck = (0..nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| nodes[i].0.clone())
            .collect();
        return Err(GraphError::Cycle(stuck));
    }
    Ok(order)
}
