// Runs local copy propagation and dead-code elimination over a packet program.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use log::info;

use packet_optimization::front_end::ast::Program;
use packet_optimization::middle_end::optimization::local_copy_prop::{LocalCopyProp, Options};

// Command-line arguments
#[derive(Parser)]
#[command(version, about)]
struct Args {
    input_file: PathBuf,
    // prints to stdout when absent.
    output_file: Option<PathBuf>,
    /// JSON file with pass options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Keep tables and actions that are never applied.
    #[arg(long)]
    keep_unused: bool,
    /// Allow list expressions to replace assignment right-hand sides.
    #[arg(long)]
    propagate_compound: bool,
    /// Repeat the pass until the program stops changing.
    #[arg(long)]
    fixpoint: bool,
}

fn options(args: &Args) -> anyhow::Result<Options> {
    let mut options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Options::default(),
    };
    if args.keep_unused {
        options.eliminate_unused = false;
    }
    if args.propagate_compound {
        options.propagate_compound = true;
    }
    Ok(options)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = std::fs::read_to_string(&args.input_file)
        .with_context(|| format!("reading {}", args.input_file.display()))?;
    let program = source
        .parse::<Program>()
        .map_err(|e| anyhow!("syntax error: {e}"))?
        .validate()
        .map_err(|e| anyhow!("invalid program:\n{e}"))?;

    let pass = LocalCopyProp::new(options(&args)?);
    info!("running with {:?}", pass.options());
    let optimized = if args.fixpoint {
        pass.run_to_fixpoint(program)?
    } else {
        pass.run(program)?
    };

    let output = optimized.0.to_string();
    match &args.output_file {
        Some(path) => {
            std::fs::write(path, output).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{output}"),
    }
    Ok(())
}
