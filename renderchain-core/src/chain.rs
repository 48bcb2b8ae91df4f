//! # Optimized Chain
//!
//! Frozen result of [`FilterGraph::optimize`]: only the nodes reachable
//! from the output, stored inputs-first, so rendering is a single forward
//! walk that touches every node exactly once.

use serde::Serialize;

use crate::filters::{Filter, FilterKind};
use crate::graph::{ChainError, FilterGraph, NodeId};
use crate::host::RenderContext;
use crate::status;
use crate::texture::{Texture, TextureFormat, TextureSize};

/// One node of an optimized chain, for inspection and logging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub node: NodeId,
    pub kind: FilterKind,
    pub inputs: Vec<NodeId>,
    pub size: TextureSize,
    pub format: TextureFormat,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct OptimizedChain {
    graph: FilterGraph,
    output: NodeId,
    output_size: TextureSize,
    output_format: TextureFormat,
    tags: Vec<String>,
}

impl OptimizedChain {
    pub(crate) fn new(graph: FilterGraph, output: NodeId, tags: Vec<String>) -> Result<Self, ChainError> {
        Ok(Self {
            output_size: graph.output_size(output)?,
            output_format: graph.output_format(output)?,
            graph,
            output,
            tags,
        })
    }

    /// Read-only view of the nodes; clone it to optimize again
    pub fn graph(&self) -> &FilterGraph {
        &self.graph
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn output_size(&self) -> TextureSize {
        self.output_size
    }

    pub fn output_format(&self) -> TextureFormat {
        self.output_format
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Status strings recorded by tagged nodes, upstream first
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn status(&self) -> String {
        status::join_status(&self.tags)
    }

    pub fn plan(&self) -> Vec<PlanStep> {
        self.graph
            .nodes()
            .map(|(node, filter)| PlanStep {
                node,
                kind: filter.kind(),
                inputs: filter.inputs(),
                // Every node of a frozen chain resolves; fall back to the
                // chain output rather than failing an inspection call.
                size: self.graph.output_size(node).unwrap_or(self.output_size),
                format: self.graph.output_format(node).unwrap_or(self.output_format),
                detail: filter.detail(),
            })
            .collect()
    }

    /// Render one frame and return the output texture
    pub fn render(&self, ctx: &mut dyn RenderContext) -> Result<Texture, ChainError> {
        let mut rendered: Vec<Option<Texture>> = vec![None; self.graph.len()];

        for (node, filter) in self.graph.nodes() {
            let texture = match filter {
                Filter::Source(source) => ctx.source(source),
                _ => {
                    let inputs: Vec<Texture> = filter
                        .inputs()
                        .iter()
                        .filter_map(|input| rendered.get(input.index()).cloned().flatten())
                        .collect();
                    let target = ctx.allocate(
                        self.graph.output_size(node)?,
                        self.graph.output_format(node)?,
                    );
                    tracing::trace!("Rendering {} {} into {:?}", filter.kind(), node, target.id);
                    filter.render(ctx, &target, &inputs);
                    Texture::Planar(target)
                }
            };
            rendered[node.index()] = Some(texture);
        }

        rendered
            .get_mut(self.output.index())
            .and_then(Option::take)
            .ok_or(ChainError::UnknownNode(self.output))
    }
}
