use std::fmt::Display;

use log::{debug, trace};

use super::{FrequencyTable, Symbol};
use crate::priority_queue::{PriorityQueue, QueueError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Leaf { symbol: Symbol },
    Inner { left: usize, right: usize },
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Node {
    pub(crate) frequency: u64,
    pub(crate) kind: NodeKind,
}

/// Huffman tree stored as an arena; children are referenced by index.
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root_index: usize,
    leaf_count: usize,
}

#[derive(Debug)]
pub enum TreeBuildError {
    NoSymbols,
    Queue(QueueError),
}

impl Display for TreeBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSymbols => write!(f, "No symbol has a nonzero frequency"),
            Self::Queue(error) => write!(f, "Priority queue failure: {}", error),
        }
    }
}

impl std::error::Error for TreeBuildError {}

impl From<QueueError> for TreeBuildError {
    fn from(value: QueueError) -> Self {
        Self::Queue(value)
    }
}

impl HuffmanTree {
    /// Greedily merges the two least frequent nodes until one root remains.
    pub fn new(frequencies: &FrequencyTable) -> Result<HuffmanTree, TreeBuildError> {
        let mut nodes: Vec<Node> = frequencies
            .present()
            .map(|sf| Node {
                frequency: sf.frequency,
                kind: NodeKind::Leaf { symbol: sf.symbol },
            })
            .collect();
        if nodes.is_empty() {
            return Err(TreeBuildError::NoSymbols);
        }
        let leaf_count = nodes.len();
        debug!("Building Huffman tree from {} distinct symbols", leaf_count);

        let indices: Vec<usize> = (0..leaf_count).collect();
        let priorities: Vec<u64> = nodes.iter().map(|node| node.frequency).collect();
        let (mut queue, _) = PriorityQueue::build(indices, priorities)?;
        nodes.try_reserve_exact(leaf_count - 1).map_err(QueueError::from)?;

        while queue.len() > 1 {
            let (left, left_frequency) = Self::take(&mut queue)?;
            let (right, right_frequency) = Self::take(&mut queue)?;
            let frequency = left_frequency + right_frequency;
            let index = nodes.len();
            nodes.push(Node {
                frequency,
                kind: NodeKind::Inner { left, right },
            });
            trace!(
                "Merged nodes {} (f:{}) and {} (f:{}) into {} (f:{})",
                left,
                left_frequency,
                right,
                right_frequency,
                index,
                frequency
            );
            queue.insert(index, frequency)?;
        }
        let (root_index, root_frequency) = Self::take(&mut queue)?;
        debug!(
            "Huffman tree complete: {} nodes, root frequency {}",
            nodes.len(),
            root_frequency
        );
        Ok(HuffmanTree {
            nodes,
            root_index,
            leaf_count,
        })
    }

    fn take(queue: &mut PriorityQueue<usize, u64>) -> Result<(usize, u64), TreeBuildError> {
        queue.extract_min().ok_or(TreeBuildError::NoSymbols)
    }

    pub(crate) fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub(crate) fn root_index(&self) -> usize {
        self.root_index
    }

    pub fn root_frequency(&self) -> u64 {
        self.nodes[self.root_index].frequency
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of every leaf below the root, found without recursion.
    pub fn leaf_depths(&self) -> Vec<(Symbol, usize)> {
        let mut depths = Vec::with_capacity(self.leaf_count);
        let mut stack = vec![(self.root_index, 0)];
        while let Some((index, depth)) = stack.pop() {
            match self.nodes[index].kind {
                NodeKind::Leaf { symbol } => depths.push((symbol, depth)),
                NodeKind::Inner { left, right } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }
        depths
    }

    /// Sum of frequency times depth over all leaves.
    pub fn weighted_path_length(&self) -> u64 {
        let mut total = 0;
        let mut stack = vec![(self.root_index, 0u64)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index];
            match node.kind {
                NodeKind::Leaf { .. } => total += node.frequency * depth,
                NodeKind::Inner { left, right } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }
        total
    }
}
