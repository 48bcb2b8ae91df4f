//! Shorthands for the filter combinations render scripts build most often.

use std::sync::Arc;

use crate::filters::{Filter, ResizeOptions, TransformedFilter};
use crate::graph::{ChainError, FilterGraph, NodeId};
use crate::texture::TextureSize;

impl FilterGraph {
    /// RGB conversion with the renderer defaults
    pub fn convert_to_rgb(&mut self, input: NodeId) -> Result<NodeId, ChainError> {
        self.rgb(input, None, None, None)
    }

    /// YUV conversion with the renderer defaults
    pub fn convert_to_yuv(&mut self, input: NodeId) -> Result<NodeId, ChainError> {
        self.yuv(input, None, None)
    }

    /// Wrap a resizeable node so that it renders `mapping(node)` while
    /// `set_size`/`make_tagged` still reach the original node.
    ///
    /// The mapping runs once, during optimization, and must not change the
    /// node's size.
    pub fn transform<F>(&mut self, resizeable: NodeId, mapping: F) -> Result<NodeId, ChainError>
    where
        F: Fn(&mut FilterGraph, NodeId) -> Result<NodeId, ChainError> + Send + Sync + 'static,
    {
        if !self.is_resizeable(resizeable) {
            let kind = self.node(resizeable)?.kind();
            return Err(ChainError::NotResizeable(resizeable, kind));
        }
        Ok(self.push(Filter::Transformed(TransformedFilter {
            inner: resizeable,
            mapping: Arc::new(mapping),
        })))
    }

    pub fn apply<F>(&mut self, input: NodeId, map: F) -> Result<NodeId, ChainError>
    where
        F: FnOnce(&mut FilterGraph, NodeId) -> Result<NodeId, ChainError>,
    {
        map(self, input)
    }

    /// Tagged resize to the node's current size, so a later `set_size`
    /// shows up in the status line
    pub fn add_tagged_resizer(&mut self, input: NodeId) -> Result<NodeId, ChainError> {
        let size = self.output_size(input)?;
        self.set_size(input, size, true)
    }

    /// Resize `input` in place when it is resizeable, otherwise wrap it in a
    /// new resize filter first. Returns the node that carries the size.
    pub fn set_size(
        &mut self,
        input: NodeId,
        size: TextureSize,
        tagged: bool,
    ) -> Result<NodeId, ChainError> {
        let node = if self.is_resizeable(input) {
            input
        } else {
            self.resize(input, ResizeOptions::default())?
        };

        let resizeable = self.resizeable_mut(node)?;
        if tagged {
            resizeable.make_tagged();
        }
        resizeable.set_size(size);
        Ok(node)
    }
}
