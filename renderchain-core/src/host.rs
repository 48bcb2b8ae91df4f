//! # Host Interface
//!
//! Texture primitives a render chain needs from the player it runs in. The
//! chain never touches GPU resources itself: every node asks the host to
//! allocate its target and to run one primitive into it.

use serde::Serialize;
use std::collections::HashSet;

use crate::colorimetry::YuvColorimetric;
use crate::filters::{SourceFilter, SourcePlane};
use crate::program_cache::CompiledProgram;
use crate::scaler::Scaler;
use crate::texture::{
    Offset, Texture, Texture2D, Texture3D, TextureChannels, TextureFormat, TextureId, TextureSize,
};

/// Everything a resize hands to the host's scaling primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRequest {
    pub channels: TextureChannels,
    pub offset: Offset,
    pub upscaler: Scaler,
    pub downscaler: Scaler,
    pub convolver: Option<Scaler>,
}

pub trait RenderContext {
    /// Texture holding the requested view of the current frame
    fn source(&mut self, source: &SourceFilter) -> Texture;

    fn allocate(&mut self, size: TextureSize, format: TextureFormat) -> Texture2D;

    fn convert_to_rgb(
        &mut self,
        target: &Texture2D,
        input: &Texture2D,
        colorimetric: YuvColorimetric,
        limited_range: bool,
        limit_chroma: bool,
    );

    fn convert_to_yuv(
        &mut self,
        target: &Texture2D,
        input: &Texture2D,
        colorimetric: YuvColorimetric,
        limited_range: bool,
    );

    fn scale(&mut self, target: &Texture2D, input: &Texture2D, request: &ScaleRequest);

    fn run_program(&mut self, target: &Texture2D, program: &CompiledProgram, inputs: &[Texture]);
}

// ============================================================================
// Dry-run host
// ============================================================================

/// One primitive call recorded by [`DryRunContext`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOperation {
    Source {
        plane: SourcePlane,
        texture: TextureId,
    },
    Allocate {
        texture: TextureId,
        size: TextureSize,
        format: TextureFormat,
    },
    ConvertToRgb {
        target: TextureId,
        input: TextureId,
        colorimetric: YuvColorimetric,
        limited_range: bool,
        limit_chroma: bool,
    },
    ConvertToYuv {
        target: TextureId,
        input: TextureId,
        colorimetric: YuvColorimetric,
        limited_range: bool,
    },
    Scale {
        target: TextureId,
        input: TextureId,
        channels: TextureChannels,
        offset: Offset,
        upscaler: Scaler,
        downscaler: Scaler,
        convolver: Option<Scaler>,
    },
    RunProgram {
        target: TextureId,
        program: String,
        inputs: Vec<TextureId>,
    },
}

/// Host that records calls instead of touching a GPU
#[derive(Debug, Default)]
pub struct DryRunContext {
    next_texture: u64,
    operations: Vec<HostOperation>,
    volume_planes: HashSet<SourcePlane>,
}

impl DryRunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand back a 3-D texture whenever `plane` is requested
    pub fn with_volume_source(mut self, plane: SourcePlane) -> Self {
        self.volume_planes.insert(plane);
        self
    }

    pub fn operations(&self) -> &[HostOperation] {
        &self.operations
    }

    pub fn take_operations(&mut self) -> Vec<HostOperation> {
        std::mem::take(&mut self.operations)
    }

    fn next_id(&mut self) -> TextureId {
        self.next_texture += 1;
        TextureId(self.next_texture)
    }
}

impl RenderContext for DryRunContext {
    fn source(&mut self, source: &SourceFilter) -> Texture {
        let id = self.next_id();
        self.operations.push(HostOperation::Source {
            plane: source.plane,
            texture: id,
        });

        let size = source.output_size();
        if self.volume_planes.contains(&source.plane) {
            Texture::Volume(Texture3D {
                id,
                width: size.width,
                height: size.height,
                depth: 1,
                format: source.format,
            })
        } else {
            Texture::Planar(Texture2D {
                id,
                size,
                format: source.format,
            })
        }
    }

    fn allocate(&mut self, size: TextureSize, format: TextureFormat) -> Texture2D {
        let id = self.next_id();
        self.operations.push(HostOperation::Allocate {
            texture: id,
            size,
            format,
        });
        Texture2D { id, size, format }
    }

    fn convert_to_rgb(
        &mut self,
        target: &Texture2D,
        input: &Texture2D,
        colorimetric: YuvColorimetric,
        limited_range: bool,
        limit_chroma: bool,
    ) {
        self.operations.push(HostOperation::ConvertToRgb {
            target: target.id,
            input: input.id,
            colorimetric,
            limited_range,
            limit_chroma,
        });
    }

    fn convert_to_yuv(
        &mut self,
        target: &Texture2D,
        input: &Texture2D,
        colorimetric: YuvColorimetric,
        limited_range: bool,
    ) {
        self.operations.push(HostOperation::ConvertToYuv {
            target: target.id,
            input: input.id,
            colorimetric,
            limited_range,
        });
    }

    fn scale(&mut self, target: &Texture2D, input: &Texture2D, request: &ScaleRequest) {
        self.operations.push(HostOperation::Scale {
            target: target.id,
            input: input.id,
            channels: request.channels,
            offset: request.offset,
            upscaler: request.upscaler,
            downscaler: request.downscaler,
            convolver: request.convolver,
        });
    }

    fn run_program(&mut self, target: &Texture2D, program: &CompiledProgram, inputs: &[Texture]) {
        self.operations.push(HostOperation::RunProgram {
            target: target.id,
            program: program.file_name(),
            inputs: inputs.iter().map(Texture::id).collect(),
        });
    }
}
