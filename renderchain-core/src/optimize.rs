//! # Optimizer
//!
//! Rewrites a built graph into the smallest equivalent chain before it is
//! rendered. Each node is visited once, after its inputs, so a rewrite rule
//! always sees the final form of the node it matches on.
//!
//! | Node                          | Upstream                        | Becomes              |
//! |-------------------------------|---------------------------------|----------------------|
//! | `Rgb`                         | `Yuv`, same colorimetric/range  | the `Yuv`'s input    |
//! | `Yuv`                         | `Rgb`, same colorimetric/range  | the `Rgb`'s input    |
//! | `Yuv`                         | RGB view of a source            | YUV view of source   |
//! | `Resize` without convolver    | already at the target size      | its input            |
//! | `Transformed`                 | -                               | its mapped result    |
//!
//! Rules only fire on exact attribute equality, and running the optimizer
//! on its own output changes nothing.

use std::collections::{HashMap, HashSet};

use crate::chain::OptimizedChain;
use crate::filters::{Filter, ResizeFilter, RgbFilter, SourceFilter, SourcePlane, TransformedFilter, YuvFilter};
use crate::graph::{ChainError, FilterGraph, NodeId};

impl FilterGraph {
    /// Optimize the chain ending at `output` and freeze it.
    ///
    /// Fails when a transformation changes the size of the node it wraps.
    pub fn optimize(self, output: NodeId) -> Result<OptimizedChain, ChainError> {
        let mut optimizer = Optimizer {
            graph: self,
            done: HashMap::new(),
            yuv_views: HashMap::new(),
            tags: Vec::new(),
        };
        let root = optimizer.optimize(output)?;
        tracing::debug!(
            "Optimized chain: {} node(s) built, root {} -> {}",
            optimizer.graph.len(),
            output,
            root
        );
        optimizer.freeze(root)
    }
}

struct Optimizer {
    graph: FilterGraph,
    /// Node → replacement, for every node already visited
    done: HashMap<NodeId, NodeId>,
    /// RGB source → its YUV view, so aliased sources share one view
    yuv_views: HashMap<NodeId, NodeId>,
    tags: Vec<String>,
}

impl Optimizer {
    fn optimize(&mut self, id: NodeId) -> Result<NodeId, ChainError> {
        if let Some(&result) = self.done.get(&id) {
            return Ok(result);
        }

        let result = match self.graph.node(id)?.clone() {
            Filter::Source(_) => id,
            Filter::Rgb(mut rgb) => {
                rgb.input = self.optimize(rgb.input)?;
                self.graph.replace(id, Filter::Rgb(rgb))?;
                self.rewrite_rgb(id, &rgb)?
            }
            Filter::Yuv(mut yuv) => {
                yuv.input = self.optimize(yuv.input)?;
                self.graph.replace(id, Filter::Yuv(yuv))?;
                self.rewrite_yuv(id, &yuv)?
            }
            Filter::Resize(mut resize) => {
                resize.input = self.optimize(resize.input)?;
                self.graph.replace(id, Filter::Resize(resize))?;
                self.rewrite_resize(id, &resize)?
            }
            Filter::Shader(mut shader) => {
                shader.inputs = shader
                    .inputs
                    .iter()
                    .map(|&input| self.optimize(input))
                    .collect::<Result<_, _>>()?;
                self.graph.replace(id, Filter::Shader(shader))?;
                id
            }
            Filter::Transformed(transformed) => self.expand(&transformed)?,
        };

        self.done.insert(id, result);
        Ok(result)
    }

    fn rewrite_rgb(&self, id: NodeId, rgb: &RgbFilter) -> Result<NodeId, ChainError> {
        match self.graph.node(rgb.input)? {
            Filter::Yuv(yuv) if rgb.cancels(yuv) => {
                tracing::debug!("Cancelled RGB {} against YUV {}", id, rgb.input);
                Ok(yuv.input)
            }
            _ => Ok(id),
        }
    }

    fn rewrite_yuv(&mut self, id: NodeId, yuv: &YuvFilter) -> Result<NodeId, ChainError> {
        match self.graph.node(yuv.input)?.clone() {
            Filter::Rgb(rgb) if yuv.cancels(&rgb) => {
                tracing::debug!("Cancelled YUV {} against RGB {}", id, yuv.input);
                Ok(rgb.input)
            }
            Filter::Source(source) if source.plane == SourcePlane::Rgb => {
                tracing::debug!("YUV {} reads the source YUV view directly", id);
                Ok(self.yuv_view(yuv.input, source))
            }
            _ => Ok(id),
        }
    }

    fn yuv_view(&mut self, source_id: NodeId, source: SourceFilter) -> NodeId {
        if let Some(&view) = self.yuv_views.get(&source_id) {
            return view;
        }
        let view = self.graph.push(Filter::Source(source.yuv()));
        self.done.insert(view, view);
        self.yuv_views.insert(source_id, view);
        view
    }

    fn rewrite_resize(&mut self, id: NodeId, resize: &ResizeFilter) -> Result<NodeId, ChainError> {
        let input_size = self.graph.output_size(resize.input())?;
        if input_size == resize.output_size() && resize.convolver().is_none() {
            tracing::debug!("Eliminated identity resize {} ({})", id, input_size);
            return Ok(resize.input());
        }

        if resize.is_tagged() {
            self.tags.push(resize.status(input_size));
        }
        Ok(id)
    }

    /// Replace a transformed node by its mapping, evaluated exactly once
    fn expand(&mut self, transformed: &TransformedFilter) -> Result<NodeId, ChainError> {
        let expected = self.graph.output_size(transformed.inner)?;
        let mapped = (transformed.mapping)(&mut self.graph, transformed.inner)?;
        let actual = self.graph.output_size(mapped)?;
        if actual != expected {
            return Err(ChainError::TransformChangedSize { expected, actual });
        }
        self.optimize(mapped)
    }

    /// Keep only nodes reachable from `root`, inputs before their readers
    fn freeze(self, root: NodeId) -> Result<OptimizedChain, ChainError> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.visit(root, &mut visited, &mut order)?;

        let remap: HashMap<NodeId, NodeId> = order
            .iter()
            .enumerate()
            .map(|(index, &old)| (old, NodeId::from_index(index)))
            .collect();
        let lookup = |id: &NodeId| remap.get(id).copied().ok_or(ChainError::UnknownNode(*id));

        let nodes = order
            .iter()
            .map(|&old| {
                let filter = self.graph.node(old)?;
                let inputs = filter
                    .inputs()
                    .iter()
                    .map(lookup)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(filter.with_inputs(&inputs))
            })
            .collect::<Result<Vec<_>, ChainError>>()?;

        let output = lookup(&root)?;
        OptimizedChain::new(self.graph.with_nodes(nodes), output, self.tags)
    }

    fn visit(
        &self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), ChainError> {
        if !visited.insert(id) {
            return Ok(());
        }
        for input in self.graph.node(id)?.inputs() {
            self.visit(input, visited, order)?;
        }
        order.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorimetry::YuvColorimetric;
    use crate::filters::{FilterKind, ResizeOptions};
    use crate::scaler::Scaler;
    use crate::testing::{frame, graph};
    use crate::texture::{Offset, TextureChannels, TextureSize};

    fn kinds(chain: &OptimizedChain) -> Vec<FilterKind> {
        chain.plan().iter().map(|step| step.kind).collect()
    }

    #[test]
    fn rgb_of_yuv_cancels_on_exact_match() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720));
        let resized = graph.resize(src, ResizeOptions::to(TextureSize::new(640, 360))).unwrap();
        let yuv = graph.yuv(resized, Some(YuvColorimetric::Bt709), Some(false)).unwrap();
        let rgb = graph.rgb(yuv, Some(YuvColorimetric::Bt709), Some(false), Some(true)).unwrap();

        let chain = graph.optimize(rgb).unwrap();
        assert_eq!(kinds(&chain), vec![FilterKind::Source, FilterKind::Resize]);
    }

    #[test]
    fn yuv_of_rgb_cancels_on_exact_match() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720).yuv());
        let rgb = graph.rgb(src, Some(YuvColorimetric::Bt601), Some(true), None).unwrap();
        let yuv = graph.yuv(rgb, Some(YuvColorimetric::Bt601), Some(true)).unwrap();

        let chain = graph.optimize(yuv).unwrap();
        assert_eq!(kinds(&chain), vec![FilterKind::Source]);
    }

    #[test]
    fn mismatched_colorimetric_keeps_both_conversions() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720).yuv());
        let rgb = graph.rgb(src, Some(YuvColorimetric::Bt601), Some(false), None).unwrap();
        let yuv = graph.yuv(rgb, Some(YuvColorimetric::Bt709), Some(false)).unwrap();

        let chain = graph.optimize(yuv).unwrap();
        assert_eq!(
            kinds(&chain),
            vec![FilterKind::Source, FilterKind::Rgb, FilterKind::Yuv]
        );
    }

    #[test]
    fn mismatched_range_keeps_both_conversions() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720).yuv());
        let yuv = graph.yuv(src, Some(YuvColorimetric::Bt709), Some(true)).unwrap();
        let rgb = graph.rgb(yuv, Some(YuvColorimetric::Bt709), Some(false), None).unwrap();

        let chain = graph.optimize(rgb).unwrap();
        assert_eq!(
            kinds(&chain),
            vec![FilterKind::Source, FilterKind::Yuv, FilterKind::Rgb]
        );
    }

    #[test]
    fn limit_chroma_does_not_block_cancellation() {
        let mut graph = graph();
        let src = graph.source(frame(320, 240).yuv());
        let rgb = graph.rgb(src, None, None, Some(false)).unwrap();
        let yuv = graph.yuv(rgb, None, None).unwrap();
        let back = graph.rgb(yuv, None, None, Some(true)).unwrap();

        let chain = graph.optimize(back).unwrap();
        assert_eq!(kinds(&chain), vec![FilterKind::Source, FilterKind::Rgb]);
    }

    #[test]
    fn yuv_of_source_reads_yuv_view() {
        let mut graph = graph();
        let src = graph.source(frame(1920, 1080));
        let yuv = graph.yuv(src, Some(YuvColorimetric::Bt709), Some(false)).unwrap();

        let chain = graph.optimize(yuv).unwrap();
        let plan = chain.plan();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, FilterKind::Source);
        assert_eq!(plan[0].detail, "Yuv plane");
        assert_eq!(chain.output_size(), TextureSize::new(1920, 1080));
    }

    #[test]
    fn rgb_of_yuv_of_source_keeps_rgb_over_yuv_view() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720));
        let yuv = graph.yuv(src, Some(YuvColorimetric::Bt709), Some(false)).unwrap();
        let rgb = graph.rgb(yuv, Some(YuvColorimetric::Bt709), Some(false), None).unwrap();

        // The YUV node becomes the source's YUV view before the RGB rule runs.
        let chain = graph.optimize(rgb).unwrap();
        let plan = chain.plan();
        assert_eq!(kinds(&chain), vec![FilterKind::Source, FilterKind::Rgb]);
        assert_eq!(plan[0].detail, "Yuv plane");
        assert_eq!(plan[1].inputs, vec![plan[0].node]);
    }

    #[test]
    fn aliased_source_shares_one_yuv_view() {
        let mut graph = graph();
        let src = graph.source(frame(1920, 1080));
        let a = graph.yuv(src, None, None).unwrap();
        let b = graph.yuv(src, Some(YuvColorimetric::Bt601), None).unwrap();
        let merged = graph.merge_y_uv(a, b).unwrap();

        let chain = graph.optimize(merged).unwrap();
        let plan = chain.plan();
        assert_eq!(kinds(&chain), vec![FilterKind::Source, FilterKind::Shader]);
        assert_eq!(plan[1].inputs, vec![plan[0].node, plan[0].node]);
    }

    #[test]
    fn identity_resize_is_eliminated_for_any_size() {
        for (w, h) in [(1, 1), (640, 480), (1920, 1080), (3840, 2160), (7, 4099)] {
            let mut graph = graph();
            let src = graph.source(frame(w, h));
            let resize = graph.resize(src, ResizeOptions::to(TextureSize::new(w, h))).unwrap();

            let chain = graph.optimize(resize).unwrap();
            assert_eq!(kinds(&chain), vec![FilterKind::Source], "{w}x{h}");
        }
    }

    #[test]
    fn same_size_resize_with_convolver_survives() {
        let mut graph = graph();
        let src = graph.source(frame(640, 480));
        let resize = graph
            .resize(
                src,
                ResizeOptions {
                    convolver: Some(Scaler::Bilinear),
                    ..ResizeOptions::default()
                },
            )
            .unwrap();

        let chain = graph.optimize(resize).unwrap();
        assert_eq!(kinds(&chain), vec![FilterKind::Source, FilterKind::Resize]);
    }

    #[test]
    fn offset_correction_keeps_same_size_resize() {
        let mut graph = graph();
        let src = graph.source(frame(640, 480));
        let resize = graph
            .resize(
                src,
                ResizeOptions {
                    channels: TextureChannels::CHROMA,
                    offset: Offset::new(0.25, 0.0),
                    ..ResizeOptions::default()
                },
            )
            .unwrap();
        graph.force_offset_correction(resize).unwrap();

        let chain = graph.optimize(resize).unwrap();
        assert_eq!(kinds(&chain), vec![FilterKind::Source, FilterKind::Resize]);
    }

    #[test]
    fn stacked_resizes_collapse_to_one() {
        let mut graph = graph();
        let src = graph.source(frame(1920, 1080));
        let target = TextureSize::new(1280, 720);
        let inner = graph.resize(src, ResizeOptions::to(target)).unwrap();
        let outer = graph.resize(inner, ResizeOptions::to(target)).unwrap();

        let chain = graph.optimize(outer).unwrap();
        assert_eq!(kinds(&chain), vec![FilterKind::Source, FilterKind::Resize]);
        assert_eq!(chain.output_size(), target);
    }

    #[test]
    fn tagged_resize_records_status() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720));
        let resize = graph.resize(src, ResizeOptions::to(TextureSize::new(1920, 1080))).unwrap();
        graph.resizeable_mut(resize).unwrap().make_tagged();

        let chain = graph.optimize(resize).unwrap();
        assert_eq!(chain.tags(), ["Lanczos3 AR↑".to_string()]);
    }

    #[test]
    fn eliminated_tagged_resize_records_nothing() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720));
        let resize = graph.resize(src, ResizeOptions::default()).unwrap();
        graph.resizeable_mut(resize).unwrap().make_tagged();

        let chain = graph.optimize(resize).unwrap();
        assert!(chain.tags().is_empty());
        assert_eq!(chain.status(), "");
    }

    #[test]
    fn shared_nodes_stay_shared() {
        let mut graph = graph();
        let src = graph.source(frame(1920, 1080).yuv());
        let luma = graph
            .resize(
                src,
                ResizeOptions {
                    output_size: Some(TextureSize::new(1280, 720)),
                    channels: TextureChannels::LUMA,
                    ..ResizeOptions::default()
                },
            )
            .unwrap();
        let u = graph.rgb(luma, None, None, None).unwrap();
        let v = graph.rgb(luma, None, None, None).unwrap();
        let merged = graph.merge_y_u_v(luma, u, v).unwrap();

        let chain = graph.optimize(merged).unwrap();
        assert_eq!(
            kinds(&chain),
            vec![
                FilterKind::Source,
                FilterKind::Resize,
                FilterKind::Rgb,
                FilterKind::Rgb,
                FilterKind::Shader
            ]
        );
    }

    #[test]
    fn optimizing_twice_changes_nothing() {
        let mut graph = graph();
        let source = frame(1920, 1080);
        let src = graph.source(source);
        let yuv = graph.yuv(src, None, None).unwrap();
        let luma = graph.resize(yuv, ResizeOptions::to(TextureSize::new(1920, 1080))).unwrap();
        let chroma = graph.chroma_source(source).unwrap();
        let chroma = graph.resize(chroma, ResizeOptions::to(TextureSize::new(1920, 1080))).unwrap();
        let merged = graph.merge_y_uv(luma, chroma).unwrap();
        let rgb = graph.rgb(merged, None, None, None).unwrap();
        let yuv_again = graph.yuv(rgb, None, None).unwrap();
        let rgb_again = graph.rgb(yuv_again, None, None, None).unwrap();
        let out = graph.set_size(rgb_again, TextureSize::new(2560, 1440), true).unwrap();

        let once = graph.optimize(out).unwrap();
        let twice = once.graph().clone().optimize(once.output()).unwrap();

        assert_eq!(once.plan(), twice.plan());
        assert_eq!(once.tags(), twice.tags());
        assert_eq!(twice.len(), once.len());
    }

    #[test]
    fn size_preserving_transform_is_applied() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720));
        let resize = graph.resize(src, ResizeOptions::to(TextureSize::new(1920, 1080))).unwrap();
        let transformed = graph
            .transform(resize, |graph, node| graph.convert_to_yuv(node))
            .unwrap();

        let chain = graph.optimize(transformed).unwrap();
        assert_eq!(
            kinds(&chain),
            vec![FilterKind::Source, FilterKind::Resize, FilterKind::Yuv]
        );
        assert_eq!(chain.output_size(), TextureSize::new(1920, 1080));
    }

    #[test]
    fn size_changing_transform_fails() {
        let mut graph = graph();
        let src = graph.source(frame(1280, 720));
        let resize = graph.resize(src, ResizeOptions::to(TextureSize::new(1920, 1080))).unwrap();
        let transformed = graph
            .transform(resize, |graph, node| {
                graph.resize(node, ResizeOptions::to(TextureSize::new(100, 100)))
            })
            .unwrap();

        let err = graph.optimize(transformed).unwrap_err();
        assert!(matches!(
            err,
            ChainError::TransformChangedSize { expected, actual }
                if expected == TextureSize::new(1920, 1080) && actual == TextureSize::new(100, 100)
        ));
    }

    #[test]
    fn transform_mapping_runs_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut graph = graph();
        let src = graph.source(frame(640, 480));
        let resize = graph.resize(src, ResizeOptions::to(TextureSize::new(1280, 960))).unwrap();
        let transformed = graph
            .transform(resize, move |graph, node| {
                counter.fetch_add(1, Ordering::SeqCst);
                graph.convert_to_rgb(node)
            })
            .unwrap();
        let a = graph.yuv(transformed, None, Some(true)).unwrap();
        let b = graph.yuv(transformed, None, Some(false)).unwrap();
        let merged = graph.merge_y_uv(a, b).unwrap();

        graph.optimize(merged).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
