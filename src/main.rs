//! Command-line front end: `unblock <input.c> [options]`

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use unblock::compiler::report::{error_reports, warning_reports};
use unblock::{compile, Catalog, Options};

#[derive(Parser, Debug)]
#[command(name = "unblock")]
#[command(about = "Rewrite a blocking C handler into a resumable state machine")]
struct Args {
    /// C source file to transform
    input: PathBuf,

    /// Function to transform; by default the only one that calls a blocking primitive
    #[arg(long)]
    function: Option<String>,

    /// Name of the persistent record type
    #[arg(long = "type")]
    type_name: Option<String>,

    /// Include guard for the generated header
    #[arg(long)]
    guard: Option<String>,

    /// Parameter the record pointer arrives through
    #[arg(long = "state-param", default_value = "plugin_state")]
    state_param: String,

    /// Status returned while waiting
    #[arg(long = "waiting-status", default_value = "PLUGIN_WAITING")]
    waiting_status: String,

    /// Status returned for an unknown resume point
    #[arg(long = "failure-status", default_value = "PLUGIN_ERROR")]
    failure_status: String,

    /// TOML file describing the blocking primitives, replacing the built-in set
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Rewritten source, `<input>.async.c` by default
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Generated header, `<type>.h` next to the output by default
    #[arg(long)]
    header: Option<PathBuf>,

    /// Emit `//#line` comments after generated code
    #[arg(long = "line-markers")]
    line_markers: bool,

    /// Print the state graph to stdout
    #[arg(long = "dump-states")]
    dump_states: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            error!("Failed to read {}: {}", args.input.display(), err);
            process::exit(1);
        }
    };

    let catalog = match &args.catalog {
        Some(path) => match Catalog::load(path) {
            Ok(catalog) => catalog,
            Err(err) => {
                error!("Invalid catalog {}: {}", path.display(), err);
                process::exit(1);
            }
        },
        None => Catalog::builtin(),
    };

    let options = Options {
        function: args.function.clone(),
        type_name: args.type_name.clone(),
        guard: args.guard.clone(),
        state_param: args.state_param.clone(),
        waiting_status: args.waiting_status.clone(),
        failure_status: args.failure_status.clone(),
        line_markers: args.line_markers,
    };

    let input_name = args.input.display().to_string();
    let compilation = match compile(&source, &catalog, &options) {
        Ok(compilation) => compilation,
        Err(err) => {
            for report in error_reports(&input_name, &source, &err) {
                eprintln!("{:?}", report);
            }
            error!("{}", err);
            process::exit(1);
        }
    };

    let warnings = warning_reports(&input_name, &source, &compilation.diagnostics);
    if !warnings.is_empty() {
        warn!("{} warning(s)", warnings.len());
        for report in warnings {
            eprintln!("{:?}", report);
        }
    }

    if args.dump_states {
        print!("{}", compilation.graph);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("async.c"));
    let header = args.header.clone().unwrap_or_else(|| {
        output
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(format!("{}.h", compilation.record.type_name))
    });

    for (path, content) in [(&output, &compilation.source), (&header, &compilation.header)] {
        if let Err(err) = fs::write(path, content) {
            error!("Failed to write {}: {}", path.display(), err);
            process::exit(1);
        }
    }

    info!(
        "Rewrote {} into {} state(s): {}, {}",
        compilation.function,
        compilation.graph.len(),
        output.display(),
        header.display()
    );
}
