use std::{path::PathBuf, process::ExitCode};

use clap::{CommandFactory, Parser, error::ErrorKind};
use silkpatch::{
    MatchPolicy, PatchOptions, Thresholds, init_logging,
    material::{DEFAULT_MIN_ALPHA, DEFAULT_WHITE_THRESH},
    run,
};

/// Force KiCad silkscreen-like BLEND materials to OPAQUE (fixes WebGL angle artifacts).
#[derive(Debug, Parser)]
#[command(name = "silkfix", version)]
struct Cli {
    /// Input .glb (or .gltf) file
    in_glb: PathBuf,

    /// Output file (omit when using --inplace)
    out_glb: Option<PathBuf>,

    /// Modify the input file in-place (writes via temp file + atomic replace)
    #[arg(long)]
    inplace: bool,

    /// RGB threshold for 'near-white'
    #[arg(long, value_name = "FLOAT", default_value_t = DEFAULT_WHITE_THRESH)]
    white_thresh: f64,

    /// Minimum alpha to treat as silkscreen ink
    #[arg(long, value_name = "FLOAT", default_value_t = DEFAULT_MIN_ALPHA)]
    min_alpha: f64,

    /// Material-name hint (case-insensitive, repeatable). Name match OR heuristic match selects.
    /// Example: --name-hint silk --name-hint screen
    #[arg(long = "name-hint", value_name = "HINT")]
    name_hints: Vec<String>,

    /// Require both a name-hint match and the heuristic instead of either one
    #[arg(long)]
    require_both: bool,

    /// Print what would change, but do not write output
    #[arg(long)]
    dry_run: bool,

    /// Emit progress logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn options(self) -> PatchOptions {
        PatchOptions {
            input: self.in_glb,
            output: self.out_glb,
            in_place: self.inplace,
            thresholds: Thresholds {
                white: self.white_thresh,
                min_alpha: self.min_alpha,
            },
            hints: self.name_hints,
            policy: if self.require_both {
                MatchPolicy::Both
            } else {
                MatchPolicy::Either
            },
            dry_run: self.dry_run,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli.options()) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) if err.is_usage() => Cli::command().error(ErrorKind::ArgumentConflict, err).exit(),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
