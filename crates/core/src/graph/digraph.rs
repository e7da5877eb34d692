use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// Directed graph over hashable vertices.
///
/// Adjacency is unordered; every algorithm that can reach output sorts
/// vertices and neighbors first, so results are independent of hash
/// iteration order.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    pub adj_map: HashMap<T, HashSet<T>>,
}

impl<T> DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    pub fn add_edge(&mut self, source: T, target: T) {
        self.adj_map
            .entry(source)
            .or_default()
            .insert(target.clone());
        self.adj_map.entry(target).or_default();
    }

    pub fn add_vertex(&mut self, source: T) {
        self.adj_map.entry(source).or_default();
    }

    pub fn has_edge(&self, source: &T, target: &T) -> bool {
        self.adj_map
            .get(source)
            .is_some_and(|neighbors| neighbors.contains(target))
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.adj_map.len()
    }
}

impl<T> DiGraph<T>
where
    T: Hash + Eq + Clone + Debug + Ord,
{
    /// All vertices in ascending order.
    #[must_use]
    pub fn vertices(&self) -> Vec<T> {
        let mut vertices: Vec<T> = self.adj_map.keys().cloned().collect();
        vertices.sort_unstable();
        vertices
    }

    /// Neighbors of `source` in ascending order.
    #[must_use]
    pub fn neighbors(&self, source: &T) -> Vec<T> {
        let mut neighbors: Vec<T> = self
            .adj_map
            .get(source)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        neighbors.sort_unstable();
        neighbors
    }

    /// Strongly connected components via Tarjan's algorithm.
    ///
    /// Vertices are visited in ascending order, so the decomposition is
    /// deterministic. Each component is returned sorted ascending, and the
    /// component list is ordered by smallest member.
    #[must_use]
    pub fn sccs(&self) -> Vec<Vec<T>> {
        let mut state = SccState {
            index: HashMap::new(),
            low: HashMap::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        };
        for vertex in self.vertices() {
            if !state.index.contains_key(&vertex) {
                self.scc_visit(&vertex, &mut state);
            }
        }
        for component in &mut state.components {
            component.sort_unstable();
        }
        state
            .components
            .sort_by(|a, b| a.first().cmp(&b.first()));
        state.components
    }

    fn scc_visit(&self, vertex: &T, state: &mut SccState<T>) {
        state.index.insert(vertex.clone(), state.next_index);
        state.low.insert(vertex.clone(), state.next_index);
        state.next_index += 1;
        state.stack.push(vertex.clone());
        state.on_stack.insert(vertex.clone());

        for neighbor in self.neighbors(vertex) {
            if !state.index.contains_key(&neighbor) {
                self.scc_visit(&neighbor, state);
                let low = state.low[&neighbor].min(state.low[vertex]);
                state.low.insert(vertex.clone(), low);
            } else if state.on_stack.contains(&neighbor) {
                let low = state.index[&neighbor].min(state.low[vertex]);
                state.low.insert(vertex.clone(), low);
            }
        }

        if state.low[vertex] == state.index[vertex] {
            let mut component = Vec::new();
            while let Some(member) = state.stack.pop() {
                state.on_stack.remove(&member);
                let done = member == *vertex;
                component.push(member);
                if done {
                    break;
                }
            }
            state.components.push(component);
        }
    }
}

struct SccState<T> {
    index: HashMap<T, usize>,
    low: HashMap<T, usize>,
    on_stack: HashSet<T>,
    stack: Vec<T>,
    next_index: usize,
    components: Vec<Vec<T>>,
}
