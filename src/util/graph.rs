//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

/// Basic graph data structure
/// - source: http://smallcultfollowing.com/babysteps/blog/2015/04/06/modeling-graphs-in-rust-using-vector-indices/
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

pub type NodeIndex = usize;

#[derive(Debug, PartialEq)]
struct NodeData<V> {
    node: V,
    first_outgoing_edge: Option<EdgeIndex>,
    first_incoming_edge: Option<EdgeIndex>,
}

type EdgeIndex = usize;

#[derive(Debug, PartialEq)]
struct EdgeData<E> {
    edge: E,
    source: NodeIndex,
    target: NodeIndex,
    next_outgoing_edge: Option<EdgeIndex>,
    next_incoming_edge: Option<EdgeIndex>,
}

#[derive(Debug, PartialEq)]
pub struct Graph<V, E> {
    vertices: Vec<NodeData<V>>,
    edges: Vec<EdgeData<E>>,
}

impl<V, E> Graph<V, E> {
    /// Creates an empty `Graph` struct.
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            vertices: Vec::new(),
        }
    }

    /// Creates an empty `Graph` struct with reserved capacities for `nodes` and `edges`.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
        }
    }

    /// Adds a new node to the graph.
    ///
    /// Returns the `NodeIndex` to remember the node.
    pub fn add_node(&mut self, node: V) -> NodeIndex {
        let index = self.vertices.len();
        self.vertices.push(NodeData {
            node: node,
            first_outgoing_edge: None,
            first_incoming_edge: None,
        });
        index
    }

    /// Checks if a given `source` node is in the graph.
    pub fn has_node(&self, source: NodeIndex) -> bool {
        source < self.node_count()
    }

    /// Checks if a given `source` node is connected to the given `target` node.
    pub fn has_edge(&self, source: NodeIndex, target: NodeIndex) -> bool {
        let mut successors = self.successors(source);
        successors.find(|f| f == &target).is_some()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Accesses the node data label behind the `node` index.
    pub fn get_node(&self, node: NodeIndex) -> Option<&V> {
        Some(&self.vertices.get(node)?.node)
    }

    /// Adds a new edge to the graph from `source` to `target`.
    ///
    /// Duplicate edges and self-loops are rejected and reported through the
    /// returned status.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, cost: E) -> EdgeStatus {
        if self.has_node(source) == false {
            return EdgeStatus::MissingSource;
        }
        if self.has_node(target) == false {
            return EdgeStatus::MissingTarget;
        }
        // do not allow self-loops
        if source == target {
            return EdgeStatus::SelfLoop;
        }
        // do not allow duplicate edges
        if self.has_edge(source, target) == true {
            return EdgeStatus::AlreadyExists;
        }

        let edge_index = self.edges.len();
        let next_outgoing_edge = self.vertices[source].first_outgoing_edge;
        let next_incoming_edge = self.vertices[target].first_incoming_edge;
        self.edges.push(EdgeData {
            source: source,
            edge: cost,
            target: target,
            next_outgoing_edge: next_outgoing_edge,
            next_incoming_edge: next_incoming_edge,
        });
        self.vertices[source].first_outgoing_edge = Some(edge_index);
        self.vertices[target].first_incoming_edge = Some(edge_index);
        EdgeStatus::Success
    }

    /// Returns the number of successors to the `source` node.
    pub fn out_degree(&self, source: NodeIndex) -> usize {
        self.successors(source).count()
    }

    /// Returns the number of predecessors to the `source` node.
    pub fn in_degree(&self, target: NodeIndex) -> usize {
        self.predecessors(target).count()
    }

    /// Creates an iterator over the incoming nodes to the `target` source.
    pub fn predecessors(&self, target: NodeIndex) -> Predecessors<V, E> {
        let first_incoming_edge = self.vertices[target].first_incoming_edge;
        Predecessors {
            graph: self,
            current_edge_index: first_incoming_edge,
        }
    }

    /// Creates an iterator over the outgoing nodes from the `source` node.
    pub fn successors(&self, source: NodeIndex) -> Successors<V, E> {
        let first_outgoing_edge = self.vertices[source].first_outgoing_edge;
        Successors {
            graph: self,
            current_edge_index: first_outgoing_edge,
        }
    }

    pub fn iter(&self) -> IterGraph<V, E> {
        IterGraph {
            graph: self,
            current_node_index: 0,
        }
    }

    /// Performs topological sort to give in-order nodes to perform given tasks
    /// based upon dependencies.
    ///
    /// When several nodes are ready at once, the node with the lowest `priority`
    /// goes first, so equal graphs always produce equal orders. If a cycle blocks
    /// progress, the nodes that could not be ordered are returned as the error.
    pub fn topological_sort<K, F>(&self, priority: F) -> Result<Vec<NodeIndex>, Vec<NodeIndex>>
    where
        K: Ord,
        F: Fn(NodeIndex) -> K,
    {
        let mut order = Vec::<NodeIndex>::with_capacity(self.node_count());
        // count the remaining dependencies for every node
        let mut remaining: Vec<usize> = (0..self.node_count())
            .map(|i| self.in_degree(i))
            .collect();
        let mut ready = BinaryHeap::new();
        for (i, deps) in remaining.iter().enumerate() {
            if *deps == 0 {
                ready.push(Reverse((priority(i), i)));
            }
        }
        // continue processing tasks able to be completed
        while let Some(Reverse((_, current))) = ready.pop() {
            order.push(current);
            for next in self.successors(current) {
                remaining[next] -= 1;
                if remaining[next] == 0 {
                    ready.push(Reverse((priority(next), next)));
                }
            }
        }
        match order.len() == self.node_count() {
            true => Ok(order),
            false => {
                let placed: HashSet<NodeIndex> = order.into_iter().collect();
                Err((0..self.node_count())
                    .filter(|i| placed.contains(i) == false)
                    .collect())
            }
        }
    }

    /// Finds the shortest cycle that only travels through the nodes in `within`.
    ///
    /// The cycle is returned in edge order beginning at its lowest-index member.
    /// Returns `None` if the subset is acyclic.
    pub fn shortest_cycle(&self, within: &[NodeIndex]) -> Option<Vec<NodeIndex>> {
        let allowed: HashSet<NodeIndex> = within.iter().copied().collect();
        let mut starts: Vec<NodeIndex> = allowed.iter().copied().collect();
        starts.sort();

        let mut best: Option<Vec<NodeIndex>> = None;
        for start in starts {
            // breadth-first search for the quickest way back to `start`
            let mut parent = HashMap::<NodeIndex, NodeIndex>::new();
            let mut queue = VecDeque::from([start]);
            let mut closing: Option<NodeIndex> = None;
            while let Some(node) = queue.pop_front() {
                let mut nexts: Vec<NodeIndex> = self
                    .successors(node)
                    .filter(|n| allowed.contains(n))
                    .collect();
                nexts.sort();
                if nexts.contains(&start) == true {
                    closing = Some(node);
                    break;
                }
                for n in nexts {
                    if n != start && parent.contains_key(&n) == false {
                        parent.insert(n, node);
                        queue.push_back(n);
                    }
                }
            }
            if let Some(mut node) = closing {
                let mut cycle = vec![node];
                while node != start {
                    node = parent[&node];
                    cycle.push(node);
                }
                cycle.reverse();
                let shorter = match &best {
                    Some(b) => cycle.len() < b.len(),
                    None => true,
                };
                if shorter == true {
                    best = Some(cycle);
                }
            }
        }
        best
    }
}

#[derive(Debug, PartialEq)]
pub enum EdgeStatus {
    MissingSource,
    MissingTarget,
    SelfLoop,
    AlreadyExists,
    Success,
}

impl EdgeStatus {
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Success => true,
            _ => false,
        }
    }
}

pub struct IterGraph<'graph, V, E> {
    graph: &'graph Graph<V, E>,
    current_node_index: NodeIndex,
}

impl<'graph, V, E> Iterator for IterGraph<'graph, V, E> {
    type Item = &'graph V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_node_index >= self.graph.vertices.len() {
            None
        } else {
            let n = Some(&self.graph.vertices[self.current_node_index].node);
            self.current_node_index += 1;
            n
        }
    }
}

pub struct Predecessors<'graph, V, E> {
    graph: &'graph Graph<V, E>,
    current_edge_index: Option<EdgeIndex>,
}

impl<'graph, V, E> Iterator for Predecessors<'graph, V, E> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current_edge_index {
            None => None,
            Some(edge_num) => {
                let edge = &self.graph.edges[edge_num];
                self.current_edge_index = edge.next_incoming_edge;
                Some(edge.source)
            }
        }
    }
}

pub struct Successors<'graph, V, E> {
    graph: &'graph Graph<V, E>,
    current_edge_index: Option<EdgeIndex>,
}

impl<'graph, V, E> Iterator for Successors<'graph, V, E> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current_edge_index {
            None => None,
            Some(edge_num) => {
                let edge = &self.graph.edges[edge_num];
                self.current_edge_index = edge.next_outgoing_edge;
                Some(edge.target)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Creates basic graph illustrated in this blog post:
    /// - source: http://smallcultfollowing.com/babysteps/blog/2015/04/06/modeling-graphs-in-rust-using-vector-indices/
    fn basic_graph() -> Graph<(), ()> {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        let n2 = g.add_node(());
        let n3 = g.add_node(());
        g.add_edge(n0, n1, ());
        g.add_edge(n1, n2, ());
        g.add_edge(n0, n3, ());
        g.add_edge(n3, n2, ());
        g
    }

    /// Creates an example binary tree with height = 2. Edges are directed up indicating
    /// the child is a dependency to the parent.
    ///
    ///         n0
    ///        /  \
    ///     n1     n4
    ///    /  \   /  \
    /// n2   n3 n5   n6
    fn binary_tree() -> Graph<(), ()> {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        let n2 = g.add_node(());
        let n3 = g.add_node(());
        let n4 = g.add_node(());
        let n5 = g.add_node(());
        let n6 = g.add_node(());
        // level 1
        g.add_edge(n1, n0, ()); // n1 -> n0
        g.add_edge(n4, n0, ()); // n4 -> n0
        // level 2 - L
        g.add_edge(n2, n1, ()); // n2 -> n1
        g.add_edge(n3, n1, ()); // n3 -> n1
        // level 2 - R
        g.add_edge(n5, n4, ()); // n5 -> n4
        g.add_edge(n6, n4, ()); // n6 -> n4
        g
    }

    #[test]
    fn topological_sort() {
        let mut g = basic_graph();
        assert_eq!(g.topological_sort(|i| i), Ok(vec![0, 1, 3, 2]));

        let n0 = g.add_node(());
        g.add_edge(n0, 0, ());
        assert_eq!(g.topological_sort(|i| i), Ok(vec![4, 0, 1, 3, 2]));

        let g = binary_tree();
        assert_eq!(g.topological_sort(|i| i), Ok(vec![2, 3, 1, 5, 6, 4, 0]));
    }

    #[test]
    fn topological_sort_uses_priority() {
        let g = binary_tree();
        // prefer higher indices when there is a choice
        assert_eq!(
            g.topological_sort(|i| Reverse(i)),
            Ok(vec![6, 5, 4, 3, 2, 1, 0])
        );
    }

    #[test]
    fn topological_sort_reports_residual() {
        let mut g = basic_graph();
        g.add_edge(2, 1, ());
        // n1 -> n2 -> n1 blocks n1 and n2
        assert_eq!(g.topological_sort(|i| i), Err(vec![1, 2]));
    }

    #[test]
    fn shortest_cycle() {
        let mut g = basic_graph();
        assert_eq!(g.shortest_cycle(&[0, 1, 2, 3]), None);
        // long cycle: 0 -> 3 -> 2 -> 0, short cycle: 1 -> 2 -> 1
        g.add_edge(2, 0, ());
        g.add_edge(2, 1, ());
        assert_eq!(g.shortest_cycle(&[0, 1, 2, 3]), Some(vec![1, 2]));
        // restricting the search removes the short cycle
        assert_eq!(g.shortest_cycle(&[0, 2, 3]), Some(vec![0, 3, 2]));
    }

    #[test]
    fn add_node_and_has_node() {
        let mut g: Graph<(), ()> = Graph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.has_node(0), false);
        g.add_node(());
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.has_node(0), true);
        assert_eq!(g.has_node(1), false);
    }

    #[test]
    fn add_edge() {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.add_edge(n0, n1, ()).is_ok(), true);
        assert_eq!(g.add_edge(n1, n0, ()).is_ok(), true);
        assert_eq!(g.edge_count(), 2);
        // do not allow duplicate edges
        assert_eq!(g.add_edge(n1, n0, ()), EdgeStatus::AlreadyExists);
        // do not allow self-loops
        assert_eq!(g.add_edge(n0, n0, ()), EdgeStatus::SelfLoop);
        assert_eq!(g.add_edge(n0, 9, ()), EdgeStatus::MissingTarget);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn degrees() {
        let g = basic_graph();
        assert_eq!(g.out_degree(0), 2);
        assert_eq!(g.out_degree(2), 0);
        assert_eq!(g.in_degree(0), 0);
        assert_eq!(g.in_degree(2), 2);
    }

    #[test]
    fn successors_and_predecessors() {
        let g = basic_graph();
        assert_eq!(g.successors(0).collect::<Vec<NodeIndex>>(), vec![3, 1]);
        assert_eq!(g.successors(2).collect::<Vec<NodeIndex>>(), Vec::<usize>::new());
        assert_eq!(g.predecessors(2).collect::<Vec<usize>>(), vec![3, 1]);
        assert_eq!(g.predecessors(3).collect::<Vec<usize>>(), vec![0]);
    }

    #[test]
    fn get_node() {
        let mut g = Graph::<&str, usize>::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        g.add_edge(a, b, 3);
        assert_eq!(g.get_node(a).unwrap(), &"a");
        assert_eq!(g.get_node(100), None);
        assert_eq!(g.iter().collect::<Vec<&&str>>(), vec![&"a", &"b"]);
    }
}
