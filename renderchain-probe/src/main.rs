//! # Renderchain Probe
//!
//! Headless dry run of the standard playback chain: builds it for a given
//! source and display size, optimizes it, renders a few frames against a
//! host that only records calls, and prints what would run on the GPU.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use renderchain_core::{
    ChainConfig, DryRunCompiler, DryRunContext, FilterGraph, HostOperation, NodeId,
    OptimizedChain, PlanStep, ProgramCache, ResizeOptions, SourceFilter, SourcePlane,
    TextureChannels, TextureFormat, TextureSize,
};

// ============================================================================
// Options
// ============================================================================

#[derive(Debug)]
struct ProbeOptions {
    source: TextureSize,
    chroma: Option<TextureSize>,
    target: TextureSize,
    config: Option<PathBuf>,
    frames: u64,
    json: bool,
}

fn print_usage() {
    eprintln!(
        "Usage: renderchain-probe --source WxH --target WxH [--chroma WxH] \
         [--config PATH] [--frames N] [--json]"
    );
}

fn parse_size(flag: &str, value: Option<&String>) -> Result<TextureSize> {
    let value = value.ok_or_else(|| anyhow::anyhow!("Missing value for {}", flag))?;
    TextureSize::parse(value)
        .ok_or_else(|| anyhow::anyhow!("Invalid size for {}: {:?} (expected WxH)", flag, value))
}

fn parse_args(args: &[String]) -> Result<ProbeOptions> {
    let mut source: Option<TextureSize> = None;
    let mut chroma: Option<TextureSize> = None;
    let mut target: Option<TextureSize> = None;
    let mut config: Option<PathBuf> = None;
    let mut frames: u64 = 1;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--source" | "-s" => {
                source = Some(parse_size("--source", args.get(i + 1))?);
                i += 2;
            }
            "--chroma" => {
                chroma = Some(parse_size("--chroma", args.get(i + 1))?);
                i += 2;
            }
            "--target" | "-t" => {
                target = Some(parse_size("--target", args.get(i + 1))?);
                i += 2;
            }
            "--config" | "-c" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --config"))?;
                config = Some(PathBuf::from(value));
                i += 2;
            }
            "--frames" | "-n" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --frames"))?;
                frames = value
                    .parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("Invalid frame count {}: {}", value, e))?;
                i += 2;
            }
            "--json" => {
                json = true;
                i += 1;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                tracing::warn!("Ignoring unknown argument {:?}", other);
                i += 1;
            }
        }
    }

    let source = source.ok_or_else(|| {
        print_usage();
        anyhow::anyhow!("Missing required --source")
    })?;

    Ok(ProbeOptions {
        source,
        chroma,
        target: target.unwrap_or(source),
        config,
        frames,
        json,
    })
}

// ============================================================================
// Chain
// ============================================================================

/// Source planes → chroma upscale → merge → RGB → tagged display resize
fn build_playback_chain(
    graph: &mut FilterGraph,
    frame: SourceFilter,
    target: TextureSize,
) -> Result<NodeId> {
    let luma = graph.source(frame.view(SourcePlane::Y));
    let chroma = graph.chroma_source(frame)?;
    let chroma = graph.resize(
        chroma,
        ResizeOptions {
            output_size: Some(frame.size),
            channels: TextureChannels::CHROMA,
            ..ResizeOptions::default()
        },
    )?;
    let yuv = graph.merge_y_uv(luma, chroma)?;
    let rgb = graph.convert_to_rgb(yuv)?;
    Ok(graph.set_size(rgb, target, true)?)
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    source: TextureSize,
    output_size: TextureSize,
    output_format: TextureFormat,
    status: String,
    plan: Vec<PlanStep>,
    frames: u64,
    operations_per_frame: usize,
    operations: Vec<HostOperation>,
}

fn run(options: &ProbeOptions) -> Result<ProbeReport> {
    let config_path = options.config.clone().unwrap_or_else(ChainConfig::default_path);
    let config = ChainConfig::load(&config_path)?;
    tracing::info!("Using config {:?}", config_path);

    let programs = Arc::new(ProgramCache::new(
        config.shader_dir.clone(),
        Arc::new(DryRunCompiler::new()),
    ));
    let mut graph = FilterGraph::new(config.defaults.clone(), programs);

    let frame = SourceFilter::new(
        options.source,
        options.chroma.unwrap_or_else(|| options.source.half()),
        TextureFormat::Unorm8,
    );
    let output = build_playback_chain(&mut graph, frame, options.target)?;
    let built = graph.len();

    let chain: OptimizedChain = graph.optimize(output)?;
    tracing::info!("Optimized {} node(s) down to {}", built, chain.len());

    let mut ctx = DryRunContext::new();
    let mut operations = Vec::new();
    for frame_num in 0..options.frames {
        chain.render(&mut ctx)?;
        let frame_ops = ctx.take_operations();
        tracing::debug!("Frame {}: {} host operation(s)", frame_num, frame_ops.len());
        operations = frame_ops;
    }

    Ok(ProbeReport {
        source: options.source,
        output_size: chain.output_size(),
        output_format: chain.output_format(),
        status: chain.status(),
        plan: chain.plan(),
        frames: options.frames,
        operations_per_frame: operations.len(),
        operations,
    })
}

fn print_report(report: &ProbeReport) {
    println!("Source: {} -> Output: {} ({:?})", report.source, report.output_size, report.output_format);
    if !report.status.is_empty() {
        println!("Status: {}", report.status);
    }
    println!("Plan:");
    for step in &report.plan {
        let inputs: Vec<String> = step.inputs.iter().map(|i| i.to_string()).collect();
        println!(
            "  {:>4} {:<8} {:>10} [{}] {}",
            step.node.to_string(),
            step.kind.to_string(),
            step.size.to_string(),
            inputs.join(", "),
            step.detail
        );
    }
    println!(
        "Rendered {} frame(s), {} host operation(s) per frame",
        report.frames, report.operations_per_frame
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("renderchain=info")
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args)?;
    tracing::info!(
        "Renderchain probe v{}: source={}, target={}",
        renderchain_core::VERSION,
        options.source,
        options.target
    );

    let report = run(&options)?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
