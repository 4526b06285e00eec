use std::{
    collections::{BTreeMap, HashMap, HashSet},
    convert::Infallible,
};

use crate::{
    descriptor::{DescriptorSource, ServiceDescriptor},
    errors::ServiceError,
};

/// Graph of one service and everything it transitively depends on
///
/// Rebuilt for every resolution. Nodes live in an arena, edges are arena indices
/// kept in declaration order so the resolution order is reproducible.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<DependencyGraphEntry>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
struct DependencyGraphEntry {
    descriptor: ServiceDescriptor,
    dependencies: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

const ROOT: usize = 0;

impl DependencyGraph {
    /// Discovers the full dependency set of `root`
    ///
    /// Fails on the first name without a descriptor, before anything is built.
    pub fn build(
        root: ServiceDescriptor,
        source: &dyn DescriptorSource,
    ) -> Result<Self, ServiceError> {
        Self::discover(root, source, Err)
    }

    /// Like [`DependencyGraph::build`] but keeps going past missing descriptors
    ///
    /// Returns the partial graph together with one error per missing descriptor.
    pub fn inspect(
        root: ServiceDescriptor,
        source: &dyn DescriptorSource,
    ) -> (Self, Vec<ServiceError>) {
        let mut errors = Vec::new();
        let discovered = Self::discover(root, source, |error| {
            errors.push(error);
            Ok::<(), Infallible>(())
        });
        let graph = match discovered {
            Ok(graph) => graph,
            Err(never) => match never {},
        };
        (graph, errors)
    }

    fn single(root: ServiceDescriptor) -> Self {
        let mut index = HashMap::new();
        index.insert(root.service_name.clone(), ROOT);
        DependencyGraph {
            nodes: vec![DependencyGraphEntry {
                descriptor: root,
                dependencies: Vec::new(),
            }],
            index,
        }
    }

    /// Walks the dependencies of `root`, handing each missing descriptor to `on_missing`
    ///
    /// Discovery stops with the first error `on_missing` returns.
    fn discover<E>(
        root: ServiceDescriptor,
        source: &dyn DescriptorSource,
        mut on_missing: impl FnMut(ServiceError) -> Result<(), E>,
    ) -> Result<Self, E> {
        let mut graph = Self::single(root);
        let mut missing = HashSet::new();

        // (node, position of the next dependency to look at)
        let mut stack = vec![(ROOT, 0_usize)];
        while let Some((node, position)) = stack.last().copied() {
            let Some(name) = graph.nodes[node].descriptor.dependencies.get(position).cloned()
            else {
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            if let Some(&known) = graph.index.get(&name) {
                graph.add_edge(node, known);
                continue;
            }
            if missing.contains(&name) {
                continue;
            }

            match source.get_descriptor(&name) {
                Some(descriptor) => {
                    let added = graph.nodes.len();
                    graph.nodes.push(DependencyGraphEntry {
                        descriptor,
                        dependencies: Vec::new(),
                    });
                    graph.index.insert(name, added);
                    graph.add_edge(node, added);
                    stack.push((added, 0));
                }
                None => {
                    on_missing(ServiceError::DescriptorNotFound {
                        service: name.clone(),
                        required_by: Some(graph.nodes[node].descriptor.service_name.clone()),
                    })?;
                    missing.insert(name);
                }
            }
        }

        tracing::debug!(
            root = %graph.root().service_name,
            services = graph.nodes.len(),
            "Built dependency graph"
        );

        Ok(graph)
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        let dependencies = &mut self.nodes[from].dependencies;
        if !dependencies.contains(&to) {
            dependencies.push(to);
        }
    }

    pub fn root(&self) -> &ServiceDescriptor {
        &self.nodes[ROOT].descriptor
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, service_name: &str) -> bool {
        self.index.contains_key(service_name)
    }

    /// Direct dependencies of a service, in declaration order
    pub fn dependencies_of(&self, service_name: &str) -> Option<Vec<&str>> {
        let node = self.index.get(service_name)?;
        Some(
            self.nodes[*node]
                .dependencies
                .iter()
                .map(|dependency| self.name(*dependency))
                .collect(),
        )
    }

    /// Service name to direct dependencies
    pub fn adjacency(&self) -> BTreeMap<&str, Vec<&str>> {
        self.nodes
            .iter()
            .map(|entry| {
                let dependencies = entry
                    .dependencies
                    .iter()
                    .map(|dependency| self.name(*dependency))
                    .collect();
                (entry.descriptor.service_name.as_str(), dependencies)
            })
            .collect()
    }

    fn name(&self, node: usize) -> &str {
        &self.nodes[node].descriptor.service_name
    }

    /// Orders every dependency before its dependents, the root excluded
    ///
    /// Fails with [`ServiceError::CircularDependency`] naming the first node
    /// found again while it is still being visited.
    pub fn resolution_order(&self) -> Result<Vec<&ServiceDescriptor>, ServiceError> {
        let mut state = vec![VisitState::Unvisited; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        for start in 0..self.nodes.len() {
            if state[start] != VisitState::Unvisited {
                continue;
            }

            state[start] = VisitState::InProgress;
            let mut stack = vec![(start, 0_usize)];
            while let Some((node, position)) = stack.last().copied() {
                let Some(dependency) = self.nodes[node].dependencies.get(position).copied() else {
                    state[node] = VisitState::Done;
                    order.push(node);
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                match state[dependency] {
                    VisitState::InProgress => return Err(self.cycle_error(dependency, &stack)),
                    VisitState::Done => {}
                    VisitState::Unvisited => {
                        state[dependency] = VisitState::InProgress;
                        stack.push((dependency, 0));
                    }
                }
            }
        }

        Ok(order
            .into_iter()
            .filter(|node| *node != ROOT)
            .map(|node| &self.nodes[node].descriptor)
            .collect())
    }

    fn cycle_error(&self, revisited: usize, stack: &[(usize, usize)]) -> ServiceError {
        let from = stack
            .iter()
            .position(|(node, _)| *node == revisited)
            .unwrap_or(0);

        let mut chain: Vec<String> = stack[from..]
            .iter()
            .map(|(node, _)| self.name(*node).to_string())
            .collect();
        chain.push(self.name(revisited).to_string());

        ServiceError::CircularDependency {
            service: self.name(revisited).to_string(),
            chain,
        }
    }
}
