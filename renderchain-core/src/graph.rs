//! # Filter Graph
//!
//! Arena owning every node of one render chain while it is being built.
//!
//! Nodes are addressed by [`NodeId`] and may be shared: several downstream
//! filters can read the same upstream node. A node's inputs always exist
//! before the node itself, so the arena can never contain a cycle.
//!
//! The graph is the build phase of a chain. Target sizes, tags and
//! convolvers may be changed here; [`FilterGraph::optimize`] consumes the
//! graph and returns an immutable [`OptimizedChain`](crate::chain::OptimizedChain).

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::colorimetry::YuvColorimetric;
use crate::config::RendererDefaults;
use crate::filters::{
    self, Filter, FilterKind, ResizeFilter, ResizeOptions, Resizeable, RgbFilter, ShaderFilter,
    SourceFilter, SourcePlane, YuvFilter,
};
use crate::program_cache::{ProgramCache, ProgramError};
use crate::texture::{TextureFormat, TextureSize};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Node {0} ({1}) cannot be resized")]
    NotResizeable(NodeId, FilterKind),
    #[error("Transformation is not allowed to change the size ({expected} → {actual})")]
    TransformChangedSize {
        expected: TextureSize,
        actual: TextureSize,
    },
    #[error("Program {path:?} takes {expected} input(s), got {actual}")]
    InputCountMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
    #[error("Shader filter needs at least one input")]
    NoInputs,
    #[error(transparent)]
    Program(#[from] ProgramError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct FilterGraph {
    nodes: Vec<Filter>,
    defaults: RendererDefaults,
    programs: Arc<ProgramCache>,
}

impl FilterGraph {
    pub fn new(defaults: RendererDefaults, programs: Arc<ProgramCache>) -> Self {
        Self {
            nodes: Vec::new(),
            defaults,
            programs,
        }
    }

    pub fn defaults(&self) -> &RendererDefaults {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Filter, ChainError> {
        self.nodes.get(id.0).ok_or(ChainError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Filter)> {
        self.nodes.iter().enumerate().map(|(i, f)| (NodeId(i), f))
    }

    pub(crate) fn push(&mut self, filter: Filter) -> NodeId {
        self.nodes.push(filter);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn replace(&mut self, id: NodeId, filter: Filter) -> Result<(), ChainError> {
        let slot = self.nodes.get_mut(id.0).ok_or(ChainError::UnknownNode(id))?;
        *slot = filter;
        Ok(())
    }

    /// Same defaults and program cache, different nodes
    pub(crate) fn with_nodes(&self, nodes: Vec<Filter>) -> Self {
        Self {
            nodes,
            defaults: self.defaults.clone(),
            programs: Arc::clone(&self.programs),
        }
    }

    fn check(&self, id: NodeId) -> Result<NodeId, ChainError> {
        self.node(id).map(|_| id)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn source(&mut self, source: SourceFilter) -> NodeId {
        self.push(Filter::Source(source))
    }

    /// Convert to RGB; unset attributes take the renderer defaults
    pub fn rgb(
        &mut self,
        input: NodeId,
        colorimetric: Option<YuvColorimetric>,
        limited_range: Option<bool>,
        limit_chroma: Option<bool>,
    ) -> Result<NodeId, ChainError> {
        let input = self.check(input)?;
        let rgb = RgbFilter {
            input,
            colorimetric: colorimetric.unwrap_or(self.defaults.colorimetric),
            output_limited_range: limited_range.unwrap_or(self.defaults.output_limited_range),
            output_limit_chroma: limit_chroma.unwrap_or(self.defaults.limit_chroma),
        };
        Ok(self.push(Filter::Rgb(rgb)))
    }

    /// Convert to YUV; unset attributes take the renderer defaults
    pub fn yuv(
        &mut self,
        input: NodeId,
        colorimetric: Option<YuvColorimetric>,
        limited_range: Option<bool>,
    ) -> Result<NodeId, ChainError> {
        let input = self.check(input)?;
        let yuv = YuvFilter {
            input,
            colorimetric: colorimetric.unwrap_or(self.defaults.colorimetric),
            output_limited_range: limited_range.unwrap_or(self.defaults.output_limited_range),
        };
        Ok(self.push(Filter::Yuv(yuv)))
    }

    pub fn resize(&mut self, input: NodeId, options: ResizeOptions) -> Result<NodeId, ChainError> {
        let output_size = match options.output_size {
            Some(size) => size,
            None => self.output_size(input)?,
        };
        let resize = ResizeFilter::new(
            self.check(input)?,
            output_size,
            options,
            self.defaults.luma_upscaler,
            self.defaults.luma_downscaler,
        );
        Ok(self.push(Filter::Resize(resize)))
    }

    /// Composite node running the program at `program_file` over `inputs`
    pub fn shader(&mut self, program_file: &str, inputs: &[NodeId]) -> Result<NodeId, ChainError> {
        for &input in inputs {
            self.check(input)?;
        }
        if inputs.is_empty() {
            return Err(ChainError::NoInputs);
        }

        let program = self.programs.get_or_compile(program_file)?;
        if program.input_count != inputs.len() {
            return Err(ChainError::InputCountMismatch {
                path: program.path.clone(),
                expected: program.input_count,
                actual: inputs.len(),
            });
        }

        Ok(self.push(Filter::Shader(ShaderFilter {
            program,
            inputs: inputs.to_vec(),
        })))
    }

    /// U and V planes of `frame` merged into one chroma texture
    pub fn chroma_source(&mut self, frame: SourceFilter) -> Result<NodeId, ChainError> {
        let u = self.source(frame.view(SourcePlane::U));
        let v = self.source(frame.view(SourcePlane::V));
        self.shader(filters::MERGE_CHROMA_FROM_SOURCE, &[u, v])
    }

    pub fn merge_y_uv(&mut self, y: NodeId, uv: NodeId) -> Result<NodeId, ChainError> {
        self.shader(filters::MERGE_Y_UV, &[y, uv])
    }

    pub fn merge_y_u_v(&mut self, y: NodeId, u: NodeId, v: NodeId) -> Result<NodeId, ChainError> {
        self.shader(filters::MERGE_Y_U_V, &[y, u, v])
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn output_size(&self, id: NodeId) -> Result<TextureSize, ChainError> {
        let mut current = id;
        loop {
            current = match self.node(current)? {
                Filter::Source(source) => return Ok(source.output_size()),
                Filter::Resize(resize) => return Ok(resize.output_size()),
                Filter::Rgb(rgb) => rgb.input,
                Filter::Yuv(yuv) => yuv.input,
                Filter::Shader(shader) => shader.inputs[0],
                Filter::Transformed(transformed) => transformed.inner,
            };
        }
    }

    pub fn output_format(&self, id: NodeId) -> Result<TextureFormat, ChainError> {
        let mut current = id;
        loop {
            current = match self.node(current)? {
                Filter::Source(source) => return Ok(source.format),
                Filter::Rgb(rgb) => rgb.input,
                Filter::Yuv(yuv) => yuv.input,
                Filter::Resize(resize) => resize.input(),
                Filter::Shader(shader) => shader.inputs[0],
                Filter::Transformed(transformed) => transformed.inner,
            };
        }
    }

    pub fn is_resizeable(&self, id: NodeId) -> bool {
        self.resize_target(id).is_ok()
    }

    // ========================================================================
    // Build-phase mutation
    // ========================================================================

    pub fn resizeable_mut(&mut self, id: NodeId) -> Result<&mut dyn Resizeable, ChainError> {
        let resize: &mut dyn Resizeable = self.resize_filter_mut(id)?;
        Ok(resize)
    }

    pub fn force_offset_correction(&mut self, id: NodeId) -> Result<(), ChainError> {
        self.resize_filter_mut(id)?.force_offset_correction();
        Ok(())
    }

    /// Resize node that ends up answering `set_size` for `id`
    fn resize_target(&self, id: NodeId) -> Result<NodeId, ChainError> {
        let mut current = id;
        loop {
            match self.node(current)? {
                Filter::Resize(_) => return Ok(current),
                Filter::Transformed(transformed) => current = transformed.inner,
                other => return Err(ChainError::NotResizeable(id, other.kind())),
            }
        }
    }

    fn resize_filter_mut(&mut self, id: NodeId) -> Result<&mut ResizeFilter, ChainError> {
        let target = self.resize_target(id)?;
        match self.nodes.get_mut(target.0) {
            Some(Filter::Resize(resize)) => Ok(resize),
            Some(other) => Err(ChainError::NotResizeable(id, other.kind())),
            None => Err(ChainError::UnknownNode(target)),
        }
    }
}
