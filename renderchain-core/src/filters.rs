//! # Filters
//!
//! The closed set of node kinds a render chain is built from.
//!
//! ```text
//! Source ─► Yuv ─► Resize ─┐
//!    │                     ├─► Shader (merge) ─► Rgb ─► Resize (tagged)
//!    └──► Source U/V ──────┘
//! ```
//!
//! Filters only store their own attributes and the ids of their inputs.
//! Sizes and formats that depend on upstream nodes are answered by
//! [`FilterGraph`](crate::graph::FilterGraph), which owns every node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::colorimetry::YuvColorimetric;
use crate::graph::{ChainError, FilterGraph, NodeId};
use crate::host::{RenderContext, ScaleRequest};
use crate::program_cache::CompiledProgram;
use crate::scaler::Scaler;
use crate::status;
use crate::texture::{self, Offset, Texture, Texture2D, TextureChannels, TextureFormat, TextureSize};

// ============================================================================
// Built-in composite programs
// ============================================================================

/// Merges the source U and V planes into one chroma texture
pub const MERGE_CHROMA_FROM_SOURCE: &str = "MergeChromaYZFromSource.hlsl";
/// Merges a luma texture with an interleaved chroma texture
pub const MERGE_Y_UV: &str = "MergeY_UV.hlsl";
/// Merges separate luma, U and V textures
pub const MERGE_Y_U_V: &str = "MergeY_U_V.hlsl";

/// Declared input count of a built-in program
pub fn builtin_input_count(file_name: &str) -> Option<usize> {
    match file_name {
        MERGE_CHROMA_FROM_SOURCE | MERGE_Y_UV => Some(2),
        MERGE_Y_U_V => Some(3),
        _ => None,
    }
}

// ============================================================================
// Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Source,
    Rgb,
    Yuv,
    Resize,
    Shader,
    Transformed,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::Source => "source",
            FilterKind::Rgb => "rgb",
            FilterKind::Yuv => "yuv",
            FilterKind::Resize => "resize",
            FilterKind::Shader => "shader",
            FilterKind::Transformed => "transformed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Source
// ============================================================================

/// View of the decoded frame a source node exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourcePlane {
    /// Frame as converted by the host
    Rgb,
    /// All three YUV planes at frame size
    Yuv,
    Y,
    U,
    V,
}

/// The decoded frame, before any filter is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFilter {
    pub size: TextureSize,
    /// Size of the U and V planes
    pub chroma_size: TextureSize,
    pub format: TextureFormat,
    pub plane: SourcePlane,
}

impl SourceFilter {
    pub fn new(size: TextureSize, chroma_size: TextureSize, format: TextureFormat) -> Self {
        Self {
            size,
            chroma_size,
            format,
            plane: SourcePlane::Rgb,
        }
    }

    /// Same frame, viewed as YUV without a runtime conversion
    pub fn yuv(&self) -> Self {
        self.view(SourcePlane::Yuv)
    }

    pub fn view(&self, plane: SourcePlane) -> Self {
        Self { plane, ..*self }
    }

    pub fn output_size(&self) -> TextureSize {
        match self.plane {
            SourcePlane::U | SourcePlane::V => self.chroma_size,
            SourcePlane::Rgb | SourcePlane::Yuv | SourcePlane::Y => self.size,
        }
    }
}

// ============================================================================
// Color conversion
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbFilter {
    pub input: NodeId,
    pub colorimetric: YuvColorimetric,
    pub output_limited_range: bool,
    pub output_limit_chroma: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YuvFilter {
    pub input: NodeId,
    pub colorimetric: YuvColorimetric,
    pub output_limited_range: bool,
}

impl RgbFilter {
    /// True when `yuv` is the exact inverse of this conversion
    pub fn cancels(&self, yuv: &YuvFilter) -> bool {
        self.colorimetric == yuv.colorimetric && self.output_limited_range == yuv.output_limited_range
    }
}

impl YuvFilter {
    pub fn cancels(&self, rgb: &RgbFilter) -> bool {
        rgb.cancels(self)
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Capability to retarget a node's output size after construction
pub trait Resizeable {
    fn make_tagged(&mut self);
    fn set_size(&mut self, size: TextureSize);
}

/// Optional attributes of a new resize filter; unset ones take the input's
/// size and the graph's default scalers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeOptions {
    pub output_size: Option<TextureSize>,
    pub channels: TextureChannels,
    pub offset: Offset,
    pub upscaler: Option<Scaler>,
    pub downscaler: Option<Scaler>,
    pub convolver: Option<Scaler>,
}

impl ResizeOptions {
    pub fn to(size: TextureSize) -> Self {
        Self {
            output_size: Some(size),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeFilter {
    pub(crate) input: NodeId,
    output_size: TextureSize,
    channels: TextureChannels,
    offset: Offset,
    upscaler: Scaler,
    downscaler: Scaler,
    convolver: Option<Scaler>,
    tagged: bool,
}

impl ResizeFilter {
    pub(crate) fn new(
        input: NodeId,
        output_size: TextureSize,
        options: ResizeOptions,
        upscaler: Scaler,
        downscaler: Scaler,
    ) -> Self {
        Self {
            input,
            output_size,
            channels: options.channels,
            offset: options.offset,
            upscaler: options.upscaler.unwrap_or(upscaler),
            downscaler: options.downscaler.unwrap_or(downscaler),
            convolver: options.convolver,
            tagged: false,
        }
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn output_size(&self) -> TextureSize {
        self.output_size
    }

    pub fn channels(&self) -> TextureChannels {
        self.channels
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn upscaler(&self) -> Scaler {
        self.upscaler
    }

    pub fn downscaler(&self) -> Scaler {
        self.downscaler
    }

    pub fn convolver(&self) -> Option<Scaler> {
        self.convolver
    }

    pub fn is_tagged(&self) -> bool {
        self.tagged
    }

    /// A fractional offset is only honoured by a convolution pass, so make
    /// sure one runs (reusing the upscaler when none was chosen).
    pub fn force_offset_correction(&mut self) {
        if !self.offset.is_zero() {
            self.convolver = self.convolver.or(Some(self.upscaler));
        }
    }

    pub fn status(&self, input_size: TextureSize) -> String {
        status::scale_description(
            input_size,
            self.output_size,
            self.upscaler,
            self.downscaler,
            self.convolver,
        )
    }

    fn request(&self) -> ScaleRequest {
        ScaleRequest {
            channels: self.channels,
            offset: self.offset,
            upscaler: self.upscaler,
            downscaler: self.downscaler,
            convolver: self.convolver,
        }
    }
}

impl Resizeable for ResizeFilter {
    fn make_tagged(&mut self) {
        self.tagged = true;
    }

    fn set_size(&mut self, size: TextureSize) {
        self.output_size = size;
    }
}

// ============================================================================
// Composite shaders
// ============================================================================

#[derive(Debug, Clone)]
pub struct ShaderFilter {
    pub program: Arc<CompiledProgram>,
    pub inputs: Vec<NodeId>,
}

// ============================================================================
// Transformed resizeable
// ============================================================================

/// Mapping applied to a wrapped resizeable node at optimization time
pub type Mapping = Arc<dyn Fn(&mut FilterGraph, NodeId) -> Result<NodeId, ChainError> + Send + Sync>;

/// Forwards resizing to `inner` but renders `mapping(inner)`
#[derive(Clone)]
pub struct TransformedFilter {
    pub inner: NodeId,
    pub mapping: Mapping,
}

impl fmt::Debug for TransformedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformedFilter")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Filter
// ============================================================================

#[derive(Debug, Clone)]
pub enum Filter {
    Source(SourceFilter),
    Rgb(RgbFilter),
    Yuv(YuvFilter),
    Resize(ResizeFilter),
    Shader(ShaderFilter),
    Transformed(TransformedFilter),
}

impl Filter {
    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Source(_) => FilterKind::Source,
            Filter::Rgb(_) => FilterKind::Rgb,
            Filter::Yuv(_) => FilterKind::Yuv,
            Filter::Resize(_) => FilterKind::Resize,
            Filter::Shader(_) => FilterKind::Shader,
            Filter::Transformed(_) => FilterKind::Transformed,
        }
    }

    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            Filter::Source(_) => Vec::new(),
            Filter::Rgb(rgb) => vec![rgb.input],
            Filter::Yuv(yuv) => vec![yuv.input],
            Filter::Resize(resize) => vec![resize.input],
            Filter::Shader(shader) => shader.inputs.clone(),
            Filter::Transformed(transformed) => vec![transformed.inner],
        }
    }

    /// Copy of this filter reading from `inputs` instead (same order and arity)
    pub(crate) fn with_inputs(&self, inputs: &[NodeId]) -> Filter {
        let mut filter = self.clone();
        match &mut filter {
            Filter::Source(_) => {}
            Filter::Rgb(rgb) => rgb.input = inputs[0],
            Filter::Yuv(yuv) => yuv.input = inputs[0],
            Filter::Resize(resize) => resize.input = inputs[0],
            Filter::Shader(shader) => shader.inputs = inputs.to_vec(),
            Filter::Transformed(transformed) => transformed.inner = inputs[0],
        }
        filter
    }

    /// One-line summary of the node's own attributes
    pub fn detail(&self) -> String {
        match self {
            Filter::Source(source) => format!("{:?} plane", source.plane),
            Filter::Rgb(rgb) => format!(
                "{} {}{}",
                rgb.colorimetric,
                range_label(rgb.output_limited_range),
                if rgb.output_limit_chroma { " limit-chroma" } else { "" }
            ),
            Filter::Yuv(yuv) => format!(
                "{} {}",
                yuv.colorimetric,
                range_label(yuv.output_limited_range)
            ),
            Filter::Resize(resize) => {
                let mut detail = format!(
                    "{} channels, up {}, down {}",
                    resize.channels, resize.upscaler, resize.downscaler
                );
                if let Some(convolver) = resize.convolver {
                    detail.push_str(&format!(", convolver {convolver}"));
                }
                if !resize.offset.is_zero() {
                    detail.push_str(&format!(", offset ({}, {})", resize.offset.x, resize.offset.y));
                }
                detail
            }
            Filter::Shader(shader) => shader.program.file_name(),
            Filter::Transformed(_) => "pending transformation".to_string(),
        }
    }

    /// Render this node into `target` from its rendered inputs.
    ///
    /// Single-input filters do nothing unless exactly one 2-D texture is
    /// among `inputs`.
    pub fn render(&self, ctx: &mut dyn RenderContext, target: &Texture2D, inputs: &[Texture]) {
        match self {
            // Sources come straight from the host; transforms never survive optimization.
            Filter::Source(_) | Filter::Transformed(_) => {}
            Filter::Rgb(rgb) => {
                let Some(input) = single_input(self.kind(), inputs) else {
                    return;
                };
                ctx.convert_to_rgb(
                    target,
                    input,
                    rgb.colorimetric,
                    rgb.output_limited_range,
                    rgb.output_limit_chroma,
                );
            }
            Filter::Yuv(yuv) => {
                let Some(input) = single_input(self.kind(), inputs) else {
                    return;
                };
                ctx.convert_to_yuv(target, input, yuv.colorimetric, yuv.output_limited_range);
            }
            Filter::Resize(resize) => {
                let Some(input) = single_input(self.kind(), inputs) else {
                    return;
                };
                ctx.scale(target, input, &resize.request());
            }
            Filter::Shader(shader) => ctx.run_program(target, &shader.program, inputs),
        }
    }
}

// TODO: once hosts never hand volume textures to 2-D filters, turn this skip into an error.
fn single_input(kind: FilterKind, inputs: &[Texture]) -> Option<&Texture2D> {
    let input = texture::single_planar(inputs);
    if input.is_none() {
        tracing::debug!(
            "Skipping {} render: expected one 2-D input, got {} input(s)",
            kind,
            inputs.len()
        );
    }
    input
}

fn range_label(limited: bool) -> &'static str {
    if limited {
        "limited"
    } else {
        "full"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{DryRunContext, HostOperation};
    use crate::texture::{Texture3D, TextureId};

    fn resize(offset: Offset, convolver: Option<Scaler>) -> ResizeFilter {
        ResizeFilter::new(
            NodeId::from_index(0),
            TextureSize::new(1280, 720),
            ResizeOptions {
                offset,
                convolver,
                ..ResizeOptions::default()
            },
            Scaler::Lanczos { taps: 3, anti_ringing: true },
            Scaler::Bilinear,
        )
    }

    #[test]
    fn offset_correction_assigns_upscaler() {
        let mut filter = resize(Offset::new(0.5, 0.0), None);
        filter.force_offset_correction();
        assert_eq!(filter.convolver(), Some(filter.upscaler()));
    }

    #[test]
    fn offset_correction_keeps_explicit_convolver() {
        let mut filter = resize(Offset::new(0.25, 0.25), Some(Scaler::Bilinear));
        filter.force_offset_correction();
        assert_eq!(filter.convolver(), Some(Scaler::Bilinear));
    }

    #[test]
    fn zero_offset_leaves_convolver_unset() {
        let mut filter = resize(Offset::ZERO, None);
        filter.force_offset_correction();
        assert_eq!(filter.convolver(), None);
    }

    #[test]
    fn resizeable_updates_size_and_tag() {
        let mut filter = resize(Offset::ZERO, None);
        filter.set_size(TextureSize::new(640, 360));
        filter.make_tagged();
        assert_eq!(filter.output_size(), TextureSize::new(640, 360));
        assert!(filter.is_tagged());
    }

    #[test]
    fn source_views_report_plane_sizes() {
        let frame = SourceFilter::new(
            TextureSize::new(1920, 1080),
            TextureSize::new(960, 540),
            TextureFormat::Unorm8,
        );
        assert_eq!(frame.plane, SourcePlane::Rgb);
        assert_eq!(frame.yuv().output_size(), TextureSize::new(1920, 1080));
        assert_eq!(frame.view(SourcePlane::U).output_size(), TextureSize::new(960, 540));
    }

    #[test]
    fn single_input_filter_skips_volume_input() {
        let mut ctx = DryRunContext::new();
        let target = ctx.allocate(TextureSize::new(4, 4), TextureFormat::Unorm8);
        let volume = Texture::Volume(Texture3D {
            id: TextureId(99),
            width: 4,
            height: 4,
            depth: 4,
            format: TextureFormat::Float16,
        });
        let filter = Filter::Yuv(YuvFilter {
            input: NodeId::from_index(0),
            colorimetric: YuvColorimetric::Bt709,
            output_limited_range: false,
        });

        filter.render(&mut ctx, &target, &[volume]);

        assert!(ctx
            .operations()
            .iter()
            .all(|op| matches!(op, HostOperation::Allocate { .. })));
    }

    #[test]
    fn with_inputs_rewires_shader_inputs() {
        let program = Arc::new(CompiledProgram {
            id: crate::program_cache::ProgramId(0),
            path: MERGE_Y_UV.into(),
            input_count: 2,
        });
        let filter = Filter::Shader(ShaderFilter {
            program,
            inputs: vec![NodeId::from_index(0), NodeId::from_index(1)],
        });
        let rewired = filter.with_inputs(&[NodeId::from_index(4), NodeId::from_index(5)]);
        assert_eq!(rewired.inputs(), vec![NodeId::from_index(4), NodeId::from_index(5)]);
        assert_eq!(rewired.detail(), MERGE_Y_UV);
    }
}
