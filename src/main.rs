use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use nix_visualize::Config;
use nix_visualize::export::write_layout_json;
use nix_visualize::layout::{LayoutParams, add_positions};
use nix_visualize::nix::collect_graph;
use nix_visualize::render::write_frame_png;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Full path to a package in the Nix store. This package will be diagrammed
    #[arg(required = true, num_args = 1..)]
    packages: Vec<String>,

    /// ini file with layout and style configuration
    #[arg(short = 'c', long)]
    configfile: Option<PathBuf>,

    /// Section from the ini file to read
    #[arg(short = 's', long)]
    configsection: Option<String>,

    /// Output filename, will be a png
    #[arg(short, long, default_value = "frame.png")]
    output: PathBuf,

    #[arg(long, overrides_with = "no_verbose")]
    verbose: bool,

    #[arg(long = "no-verbose", overrides_with = "verbose")]
    no_verbose: bool,

    /// Seed for the random initial positions and colour scatter
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds to wait for each nix-store query
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Also write the computed node positions as JSON
    #[arg(long)]
    layout_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose && !args.no_verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::load(args.configfile.as_deref(), args.configsection.as_deref())?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let timeout = Duration::from_secs(args.timeout);
    let mut graph = collect_graph(&args.packages, timeout)?;
    debug!("{graph}");

    let params = LayoutParams::from_config(&config);
    add_positions(&mut graph, &params, &mut rng);

    write_frame_png(&graph, &config, &args.output, &mut rng)?;
    if let Some(path) = &args.layout_json {
        write_layout_json(&graph, path)?;
    }

    info!("Done");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("NIX_VISUALIZE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "nix_visualize=debug"
        } else {
            "nix_visualize=info"
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}
