//! ogf
//!
//! Command-line interface for inspecting and re-encoding X-Ray OGF models.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use xray_ogf_parsers::ogf::MotionTarget;
use xray_ogf_parsers::{
    encode, DecodeOptions, HumanReadable, OgfModel, OgfParser, Parser as ParserTrait, VertexSource,
};
use xray_ogf_vfs::{FsConfig, NativeFileSystem};

/// Inspect, dump and re-encode X-Ray engine OGF models
#[derive(Parser)]
#[command(name = "ogf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// File-system configuration (JSON or fsgame.ltx)
    #[arg(long, global = true)]
    fs: Option<PathBuf>,

    /// Treat unhandled chunks as errors
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of a model
    Info(ModelArgs),

    /// Print the whole decoded model tree
    Dump(ModelArgs),

    /// Decode, re-encode and compare with the source bytes
    Roundtrip(RoundtripArgs),

    /// Show progressive LOD data
    Lod(ModelArgs),

    /// List skeletal motions
    Motions(ModelArgs),
}

#[derive(Args)]
struct ModelArgs {
    /// Model path (plain or `$alias$`-prefixed)
    path: String,

    /// Do not load child models referenced by path
    #[arg(long)]
    no_children: bool,
}

#[derive(Args)]
struct RoundtripArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Write the re-encoded model here
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_thread_ids(verbosity >= 3)
        .with_file(verbosity >= 3)
        .with_line_number(verbosity >= 3)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let vfs = match &cli.fs {
        Some(config_path) => {
            let config = FsConfig::load(config_path)
                .with_context(|| format!("Failed to load file-system configuration {}", config_path.display()))?;
            NativeFileSystem::from_config(".", &config).context("Failed to resolve aliases")?
        }
        None => NativeFileSystem::new("."),
    };
    debug!(aliases = vfs.alias_count(), "File system ready");

    let ctx = App {
        vfs: &vfs,
        strict: cli.strict,
        format: cli.format,
    };

    match cli.command {
        Commands::Info(args) => cmd_info(&ctx, &args),
        Commands::Dump(args) => cmd_dump(&ctx, &args),
        Commands::Roundtrip(args) => cmd_roundtrip(&ctx, &args),
        Commands::Lod(args) => cmd_lod(&ctx, &args),
        Commands::Motions(args) => cmd_motions(&ctx, &args),
    }
}

/// Shared command state
struct App<'a> {
    vfs: &'a NativeFileSystem,
    strict: bool,
    format: OutputFormat,
}

impl App<'_> {
    fn parser(&self, args: &ModelArgs) -> OgfParser<'_> {
        OgfParser::new()
            .with_options(DecodeOptions {
                strict_chunks: self.strict,
                load_external_children: !args.no_children,
                ..Default::default()
            })
            .with_file_system(self.vfs)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.vfs
            .read(path)
            .with_context(|| format!("Failed to read {path}"))
    }

    fn load(&self, args: &ModelArgs) -> Result<(Vec<u8>, OgfModel)> {
        info!("Decoding model: {}", args.path);
        let parser = self.parser(args);
        let located = self.vfs.locate(&args.path).ok();

        // Plain files go through the parser's own file access (memory-mapped when large).
        let model = match located.filter(|p| p.is_file() && !args.path.starts_with('$')) {
            Some(native) if parser.can_parse(&native) => parser
                .parse_file(&native)
                .map(|mut m| {
                    m.path = Some(args.path.clone());
                    m
                })
                .with_context(|| format!("Failed to decode {}", args.path))?,
            _ => {
                let data = self.read(&args.path)?;
                parser
                    .decode(&data, Some(&args.path))
                    .with_context(|| format!("Failed to decode {}", args.path))?
            }
        };
        let data = self.read(&args.path)?;
        Ok((data, model))
    }

    fn print(&self, model: &impl HumanReadable, text: impl FnOnce() -> String) {
        match self.format {
            OutputFormat::Text => println!("{}", text()),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&model.to_json()).unwrap_or_default())
            }
            OutputFormat::Yaml => println!("{}", model.to_yaml()),
        }
    }
}

fn cmd_info(ctx: &App<'_>, args: &ModelArgs) -> Result<()> {
    let (data, model) = ctx.load(args)?;

    let mut models = 0usize;
    let mut vertices = 0usize;
    let mut triangles = 0usize;
    model.walk(&mut |m, _| {
        models += 1;
        vertices += m.control_point_count();
        triangles += m.triangle_count();
    });

    match ctx.format {
        OutputFormat::Text => {
            println!("Model: {}", args.path);
            println!("  Size:        {}", format_size(data.len() as u64));
            println!("  Type:        {} (v{})", model.model_type, model.version);
            println!("  Models:      {models}");
            println!("  Vertices:    {vertices}");
            println!("  Triangles:   {triangles}");
            println!(
                "  Bounds:      [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]",
                model.bbox.min.x, model.bbox.min.y, model.bbox.min.z,
                model.bbox.max.x, model.bbox.max.y, model.bbox.max.z
            );
            if let Some(VertexSource::External(ext)) = &model.vertices {
                println!("  Vertex pool: {} (offset {}, {} vertices)", ext.pool, ext.offset, ext.count);
            }
            if let Some(skeleton) = &model.skeleton {
                println!("  Bones:       {}", skeleton.bone_count());
                println!("  Partitions:  {}", skeleton.partitions.len());
                println!("  Motions:     {}", model.motions.len());
            }
            if !model.unhandled_chunks.is_empty() {
                println!("  Unhandled:   {:X?}", model.unhandled_chunks);
            }
        }
        _ => {
            let summary = serde_json::json!({
                "path": args.path,
                "size": data.len(),
                "model_type": model.model_type.name(),
                "version": model.version,
                "models": models,
                "vertices": vertices,
                "triangles": triangles,
                "bones": model.skeleton.as_ref().map_or(0, |s| s.bone_count()),
                "motions": model.motions.len(),
                "unhandled_chunks": model.unhandled_chunks,
            });
            if ctx.format == OutputFormat::Yaml {
                print!("{}", serde_yaml::to_string(&summary)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
    }
    Ok(())
}

fn cmd_dump(ctx: &App<'_>, args: &ModelArgs) -> Result<()> {
    let (_, model) = ctx.load(args)?;
    ctx.print(&model, || model.to_readable_string());
    Ok(())
}

fn cmd_roundtrip(ctx: &App<'_>, args: &RoundtripArgs) -> Result<()> {
    let (data, model) = ctx.load(&args.model)?;
    let encoded = encode(&model).context("Failed to encode model")?;

    // Re-decoding the output checks it independently of byte identity.
    OgfParser::new()
        .decode(&encoded, None)
        .context("Re-encoded model does not decode")?;

    let identical = encoded == data;
    if let Some(output) = &args.output {
        fs::write(output, &encoded).with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote {}", output.display());
    }

    let report = serde_json::json!({
        "path": args.model.path,
        "source_size": data.len(),
        "encoded_size": encoded.len(),
        "identical": identical,
        "first_difference": first_difference(&data, &encoded),
    });
    match ctx.format {
        OutputFormat::Text => {
            println!(
                "{}: {} -> {} ({})",
                args.model.path,
                format_size(data.len() as u64),
                format_size(encoded.len() as u64),
                if identical { "identical" } else { "differs" }
            );
            if let Some(offset) = first_difference(&data, &encoded) {
                println!("  first difference at offset {offset}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
    }
    Ok(())
}

fn cmd_lod(ctx: &App<'_>, args: &ModelArgs) -> Result<()> {
    let (_, model) = ctx.load(args)?;

    let mut rows = Vec::new();
    model.walk(&mut |m, depth| {
        if let Some(lod) = &m.lod {
            rows.push(serde_json::json!({
                "depth": depth,
                "vertices": m.control_point_count(),
                "triangles": m.triangle_count(),
                "min_vertices": lod.min_vertices,
                "min_triangles": lod.base_triangle_count(),
                "vertex_splits": lod.vsplits.len(),
                "fix_faces": lod.fix_faces.len(),
            }));
        }
    });
    if rows.is_empty() && model.lods.is_empty() {
        bail!("{} has no progressive LOD data", args.path);
    }

    let report = serde_json::json!({ "lod_chain": model.lods.len(), "fixed": rows });
    match ctx.format {
        OutputFormat::Text => {
            if !model.lods.is_empty() {
                println!("LOD chain: {} levels", model.lods.len());
                for (i, lod) in model.lods.iter().enumerate() {
                    println!("  [{i}] {} vertices, {} triangles", lod.control_point_count(), lod.triangle_count());
                }
            }
            for row in &rows {
                println!(
                    "Fixed LOD (depth {}): {} -> {} vertices, {} -> {} triangles, {} splits",
                    row["depth"],
                    row["vertices"],
                    row["min_vertices"],
                    row["triangles"],
                    row["min_triangles"],
                    row["vertex_splits"]
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
    }
    Ok(())
}

fn cmd_motions(ctx: &App<'_>, args: &ModelArgs) -> Result<()> {
    let (_, model) = ctx.load(args)?;
    let Some(skeleton) = &model.skeleton else {
        bail!("{} is not an animated model", args.path);
    };

    match ctx.format {
        OutputFormat::Text => {
            println!("{} motions ({:?})", model.motions.len(), model.motion_source);
            for (slot, motion) in model.motions.iter().enumerate() {
                let target = match motion.target {
                    MotionTarget::Bone(id) => format!(
                        "bone {}",
                        skeleton.bones.get(usize::from(id)).map_or("?", |b| b.name.as_str())
                    ),
                    MotionTarget::Partition(id) => format!(
                        "part {}",
                        skeleton.partition(usize::from(id)).map_or("?", |p| p.name.as_str())
                    ),
                    MotionTarget::AllPartitions => "all parts".to_string(),
                };
                println!(
                    "  [{slot:3}] {:<32} {:<20} {:4} frames  speed {:.2}{}{}",
                    motion.name,
                    target,
                    motion.frame_count(),
                    motion.speed,
                    if motion.flags.is_fx() { "  fx" } else { "" },
                    if motion.flags.stop_at_end() { "  stop@end" } else { "" },
                );
            }
        }
        _ => {
            let motions = serde_json::to_value(&model.motions)?;
            if ctx.format == OutputFormat::Yaml {
                print!("{}", serde_yaml::to_string(&motions)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&motions)?);
            }
        }
    }
    Ok(())
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
