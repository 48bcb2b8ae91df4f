//! Fixtures shared by the unit tests.

use std::sync::Arc;

use crate::config::RendererDefaults;
use crate::filters::SourceFilter;
use crate::graph::FilterGraph;
use crate::program_cache::{DryRunCompiler, ProgramCache};
use crate::texture::{TextureFormat, TextureSize};

/// Empty graph with default settings and a dry-run program cache
pub(crate) fn graph() -> FilterGraph {
    let cache = ProgramCache::new("/shaders", Arc::new(DryRunCompiler::new()));
    FilterGraph::new(RendererDefaults::default(), Arc::new(cache))
}

/// 8-bit 4:2:0 frame, RGB view
pub(crate) fn frame(width: u32, height: u32) -> SourceFilter {
    let size = TextureSize::new(width, height);
    SourceFilter::new(size, size.half(), TextureFormat::Unorm8)
}
