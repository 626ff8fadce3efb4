use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use silkpatch::{GeneratedFile, SiteConfig, init_logging, on_files};

/// List the build documentation files a site build should publish, as JSON.
#[derive(Debug, Parser)]
#[command(name = "docmirror", version)]
struct Cli {
    /// Site config file; its directory is the root the build dir is resolved against
    #[arg(short, long, value_name = "FILE", default_value = "mkdocs.yml")]
    config: PathBuf,

    /// Build output directory, relative to the config file
    #[arg(long, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// Destination prefix inside the site
    #[arg(long, value_name = "PREFIX")]
    dest_prefix: Option<String>,

    /// Name of the per-board documentation directory
    #[arg(long, value_name = "NAME")]
    doc_dir: Option<String>,

    /// Emit progress logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<(), String> {
    let mut site = SiteConfig::load(&cli.config).map_err(|err| err.to_string())?;
    if let Some(build_dir) = cli.build_dir {
        site.mirror.build_dir = build_dir;
    }
    if let Some(prefix) = cli.dest_prefix {
        site.mirror.dest_prefix = prefix;
    }
    if let Some(doc_dir) = cli.doc_dir {
        site.mirror.doc_dir_name = doc_dir;
    }

    let files: Vec<GeneratedFile> = on_files(Vec::new(), &site).map_err(|err| err.to_string())?;
    let manifest = serde_json::to_string_pretty(&files)
        .map_err(|err| format!("failed to serialize manifest: {err}"))?;
    println!("{manifest}");
    Ok(())
}
