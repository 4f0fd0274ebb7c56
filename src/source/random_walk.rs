//! Random walk extractor over a lazily generated expander-like graph.

use super::{EntropySource, PseudoRandomExtractor, SourceError};
use crate::bits::BitVector;
use std::collections::HashMap;

/// Arena of visited nodes, indexed by content digest.
#[derive(Default)]
struct WalkGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

struct Node {
    value: BitVector,
    neighbours: Vec<usize>,
}

impl WalkGraph {
    /// Returns the node holding `value`, creating it on first sight.
    fn intern(&mut self, value: BitVector) -> usize {
        let key = value.digest();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            value,
            neighbours: Vec::new(),
        });
        self.index.insert(key, id);
        id
    }
}

/// Extracts bits by walking a random `degree`-regular graph.
///
/// The weak input seeds the generator that builds the graph and picks the
/// start node; the strong input chooses an edge at every step. Nodes are
/// only generated when the walk reaches them.
pub struct RandomWalkExtractor<W, S> {
    weak: W,
    strong: S,
    degree: usize,
}

impl<W: EntropySource, S: EntropySource> RandomWalkExtractor<W, S> {
    /// Creates an extractor with degree 8.
    pub fn new(weak: W, strong: S) -> Self {
        Self {
            weak,
            strong,
            degree: 8,
        }
    }

    /// Creates an extractor with a custom degree, which must be a power of
    /// two of at least 2.
    pub fn with_degree(weak: W, strong: S, degree: usize) -> Result<Self, SourceError> {
        if degree < 2 || !degree.is_power_of_two() {
            return Err(SourceError::InvalidParameter(format!(
                "random walk degree {} is not a power of two >= 2",
                degree
            )));
        }
        Ok(Self {
            weak,
            strong,
            degree,
        })
    }

    fn steps(n: usize) -> usize {
        if n < 2 {
            return 0;
        }
        2 * n.ilog2() as usize
    }
}

impl<W: EntropySource, S: EntropySource> EntropySource for RandomWalkExtractor<W, S> {
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
        let mut graph = WalkGraph::default();
        let mut builder = PseudoRandomExtractor::new(self.weak.get_bits(64)?.low_u64());
        let choice_bits = self.degree.ilog2() as usize;
        let steps = Self::steps(n);

        let mut current = graph.intern(self.weak.get_bits(n)?);
        for _ in 0..steps {
            if graph.nodes[current].neighbours.is_empty() {
                let mut neighbours = Vec::with_capacity(self.degree);
                for _ in 0..self.degree {
                    neighbours.push(graph.intern(builder.get_bits(n)?));
                }
                graph.nodes[current].neighbours = neighbours;
            }

            let edge = self.strong.get_bits(choice_bits)?.low_u64() as usize;
            current = graph.nodes[current].neighbours[edge];
        }

        tracing::trace!(n, steps, nodes = graph.nodes.len(), "random walk finished");
        Ok(graph.nodes[current].value.clone())
    }
}
