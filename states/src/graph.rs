use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::{Debug, Formatter};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError<N>
where
    N: Debug,
{
    #[error("Cycle detected in dependency graph: {0:?}")]
    CycleDetected(DepRoute<N>),
    #[error("Duplicate edge detected in dependency graph: {0:?}")]
    DuplicateEdge(DepRoute<N>),
}

/// A path through the graph, kept only for diagnostics.
pub struct DepRoute<N> {
    route: Vec<N>,
}

impl<N> DepRoute<N> {
    pub fn nodes(&self) -> &[N] {
        &self.route
    }
}

impl<N> Debug for DepRoute<N>
where
    N: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for node in &self.route {
            if !first {
                write!(f, " -> ")?;
            }
            write!(f, "{node:?}")?;
            first = false;
        }
        Ok(())
    }
}

/// Directed dependency graph between state/compute nodes.
///
/// Edges point from a dependency to the compute that reads it, so
/// [`Graph::reachable`] answers "which computes are downstream of this dirty
/// node". Duplicate edges are remembered at insert time and reported by
/// [`Graph::topology_sort`], mirroring how registration bugs should surface:
/// late, loudly, and with the offending route attached.
#[derive(Debug, Default)]
pub struct Graph<N>
where
    N: Debug + Copy + Ord,
{
    edges: BTreeMap<N, BTreeSet<N>>,
    duplicates: Vec<(N, N)>,
}

impl<N> Graph<N>
where
    N: Debug + Copy + Ord,
{
    pub fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }

    pub fn route_to(&mut self, from: N, to: N) {
        if !self.edges.entry(from).or_default().insert(to) {
            self.duplicates.push((from, to));
        }
        // Make sure sinks participate in the sort.
        self.edges.entry(to).or_default();
    }

    /// Every node reachable from `start`, excluding `start` itself unless it
    /// sits on a cycle.
    pub fn reachable(&self, start: N) -> BTreeSet<N> {
        let mut collected = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            if let Some(nexts) = self.edges.get(&current) {
                for &next in nexts {
                    if collected.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        collected
    }

    /// Kahn's algorithm; returns the evaluation order or the first defect.
    pub fn topology_sort(&self) -> Result<Vec<N>, TopologyError<N>> {
        if let Some(&(from, to)) = self.duplicates.first() {
            return Err(TopologyError::DuplicateEdge(DepRoute {
                route: vec![from, to],
            }));
        }

        let mut in_degree: BTreeMap<N, usize> = self.edges.keys().map(|&n| (n, 0)).collect();
        for targets in self.edges.values() {
            for &to in targets {
                *in_degree.entry(to).or_insert(0) += 1;
            }
        }

        let mut ready: VecDeque<N> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());

        while let Some(node) = ready.pop_front() {
            order.push(node);
            if let Some(nexts) = self.edges.get(&node) {
                for next in nexts {
                    let Some(deg) = in_degree.get_mut(next) else {
                        continue;
                    };
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push_back(*next);
                    }
                }
            }
        }

        if order.len() == in_degree.len() {
            return Ok(order);
        }

        // Leftover nodes all sit on or behind a cycle; walk one out for the
        // error message.
        let stuck: BTreeSet<N> = in_degree
            .keys()
            .filter(|n| !order.contains(n))
            .copied()
            .collect();
        Err(TopologyError::CycleDetected(DepRoute {
            route: self.trace_cycle(&stuck),
        }))
    }

    fn trace_cycle(&self, stuck: &BTreeSet<N>) -> Vec<N> {
        let Some(&start) = stuck.first() else {
            return Vec::new();
        };
        let mut path = vec![start];
        let mut seen = BTreeSet::from([start]);
        let mut current = start;
        loop {
            let Some(next) = self
                .edges
                .get(&current)
                .and_then(|nexts| nexts.iter().find(|n| stuck.contains(n)))
            else {
                return path;
            };
            if !seen.insert(*next) {
                path.push(*next);
                return path;
            }
            path.push(*next);
            current = *next;
        }
    }
}
