//! # Renderchain Core
//!
//! Lazy GPU filter graphs for video rendering. A render script declares a
//! graph of conversions, resizes and composite shaders; the graph is
//! optimized once (redundant conversions and no-op resizes disappear) and
//! the frozen chain is then rendered every frame against the host player.

// ============================================================================
// Texture model
// ============================================================================
pub mod texture;
pub mod colorimetry;
pub mod scaler;

// ============================================================================
// Filter graph
// ============================================================================
pub mod filters;
pub mod graph;
pub mod conversion;
pub mod optimize;
pub mod chain;
pub mod status;

// ============================================================================
// Host integration
// ============================================================================
pub mod host;
pub mod program_cache;
pub mod config;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{OptimizedChain, PlanStep};
pub use colorimetry::YuvColorimetric;
pub use config::{ChainConfig, ConfigError, RendererDefaults};
pub use filters::{Filter, FilterKind, ResizeOptions, Resizeable, SourceFilter, SourcePlane};
pub use graph::{ChainError, FilterGraph, NodeId};
pub use host::{DryRunContext, HostOperation, RenderContext, ScaleRequest};
pub use program_cache::{CompiledProgram, DryRunCompiler, ProgramCache, ProgramCompiler, ProgramError};
pub use scaler::Scaler;
pub use texture::{Offset, Texture, TextureChannels, TextureFormat, TextureSize};

// ============================================================================
// Version
// ============================================================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
