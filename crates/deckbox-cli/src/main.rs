//! deckbox: build printable card boxes from the model catalog.
//!
//! Usage:
//!     deckbox --list
//!     deckbox --model commander_100 --out-dir out
//!     deckbox --all --ascii-stl
//!     deckbox --model uno_36 --dump-plan

mod picker;
mod summary;

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use deckbox_engine::{build, build_many, derive, plan, CancelToken, Registry};
use deckbox_export::{export, BuildOptions, ExportFormat, DEFAULT_MESH_TOLERANCE};
use deckbox_kernel::TruckKernel;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Parametric trading-card box generator.
#[derive(Parser, Debug)]
#[command(name = "deckbox", version, long_about = None)]
struct Cli {
    /// Model slug to build
    #[arg(short, long, conflicts_with_all = ["all", "list"])]
    model: Option<String>,

    /// List catalog models and exit
    #[arg(long)]
    list: bool,

    /// Catalog JSON file replacing the built-in one
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Directory for exported files
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Skip STL meshes
    #[arg(long)]
    no_export: bool,

    /// Skip the STEP assembly
    #[arg(long)]
    no_viewer_output: bool,

    /// Write ASCII STL instead of binary
    #[arg(long)]
    ascii_stl: bool,

    /// Print the construction plan as JSON instead of building
    #[arg(long)]
    dump_plan: bool,

    /// Build every catalog model
    #[arg(long, conflicts_with = "list")]
    all: bool,

    /// Chordal mesh tolerance in millimetres
    #[arg(long, default_value_t = DEFAULT_MESH_TOLERANCE)]
    tolerance: f64,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn options(&self) -> BuildOptions {
        let mut formats = Vec::new();
        if !self.no_viewer_output {
            formats.push(ExportFormat::Step);
        }
        if !self.no_export {
            formats.push(if self.ascii_stl {
                ExportFormat::StlAscii
            } else {
                ExportFormat::StlBinary
            });
        }
        BuildOptions {
            formats,
            out_dir: self.out_dir.clone(),
            mesh_tolerance: self.tolerance,
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_registry(path: Option<&PathBuf>) -> Result<Registry> {
    match path {
        None => Ok(Registry::builtin()),
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            Registry::from_json(&json).with_context(|| format!("loading catalog {}", path.display()))
        }
    }
}

fn choose_model(cli: &Cli, registry: &Registry) -> Result<String> {
    if let Some(slug) = &cli.model {
        return Ok(slug.clone());
    }
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        bail!("no model given and stdin is not a terminal; pass --model <slug> or --all");
    }
    picker::pick(registry.entries(), stdin.lock(), io::stdout())
}

fn dump_plan(registry: &Registry, slug: &str) -> Result<()> {
    let params = registry.resolve(slug)?;
    let dims = derive(&params)?;
    let plan = plan(&params, &dims)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn build_one(registry: &Registry, slug: &str, options: &BuildOptions) -> Result<()> {
    let mut kernel = TruckKernel::new();
    let built = build(registry, slug, &mut kernel, &CancelToken::new())?;
    let files = if options.formats.is_empty() {
        Vec::new()
    } else {
        export(&mut kernel, &built, options)?
    };
    print!("{}", summary::render(&built, &files));
    Ok(())
}

fn build_all(registry: &Registry, options: &BuildOptions) -> Result<()> {
    let slugs = registry.slugs();
    let results = build_many(registry, &slugs, TruckKernel::new, &CancelToken::new());
    let mut failed = 0usize;
    for result in results {
        let outcome = result.map_err(anyhow::Error::from).and_then(|mut kb| {
            let files = if options.formats.is_empty() {
                Vec::new()
            } else {
                export(&mut kb.kernel, &kb.built, options)?
            };
            Ok(summary::render(&kb.built, &files))
        });
        match outcome {
            Ok(report) => print!("{report}"),
            Err(e) => {
                error!("{e:#}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} models failed", slugs.len());
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let registry = load_registry(cli.catalog.as_ref())?;

    if cli.list {
        for entry in registry.entries() {
            let params = registry.resolve(&entry.slug)?;
            println!(
                "{:<28} {:<40} {} cards, {}",
                entry.slug, entry.label, params.card_count, params.version
            );
        }
        return Ok(());
    }

    let options = cli.options();
    if cli.all {
        if cli.dump_plan {
            for slug in registry.slugs() {
                dump_plan(&registry, slug)?;
            }
            return Ok(());
        }
        return build_all(&registry, &options);
    }

    let slug = choose_model(cli, &registry)?;
    info!(slug = %slug, catalog = registry.catalog_version(), "selected model");
    if cli.dump_plan {
        return dump_plan(&registry, &slug);
    }
    build_one(&registry, &slug, &options)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn format_flags() {
        let cli = Cli::parse_from(["deckbox", "--model", "uno_36"]);
        assert_eq!(
            cli.options().formats,
            vec![ExportFormat::Step, ExportFormat::StlBinary]
        );

        let cli = Cli::parse_from(["deckbox", "--all", "--ascii-stl", "--no-viewer-output"]);
        assert_eq!(cli.options().formats, vec![ExportFormat::StlAscii]);

        let cli = Cli::parse_from(["deckbox", "--all", "--no-export", "--no-viewer-output"]);
        assert!(cli.options().formats.is_empty());
    }

    #[test]
    fn model_conflicts_with_all() {
        assert!(Cli::try_parse_from(["deckbox", "--model", "x", "--all"]).is_err());
    }

    #[test]
    fn missing_catalog_file_is_reported() {
        let err = load_registry(Some(&PathBuf::from("/nonexistent/catalog.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("reading catalog"));
    }
}
