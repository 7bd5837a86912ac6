use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use partlib_params::{RawValue, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

mod load;

pub use load::{load_parameter_set, read_declaration};

const LOG_ENV: &str = "PARTLIB_LOG";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "partlib")]
#[command(about = "Resolve parametrized part declarations into catalog entries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate declarations and print a summary
    Check(FilesArgs),

    /// Print the sorted choices of Table Index parameters
    Choices(ChoicesArgs),

    /// Print the common combinations of free parameter values
    Combinations(LimitArgs),

    /// Resolve every parameter for one set of free values
    Collect(CollectArgs),

    /// Resolve every parameter for every common combination
    Expand(LimitArgs),
}

#[derive(Args)]
struct FilesArgs {
    /// Declaration files (.json or .toml), merged left to right
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct ChoicesArgs {
    #[command(flatten)]
    input: FilesArgs,

    /// Only print the choices of this parameter
    #[arg(long)]
    param: Option<String>,
}

#[derive(Args)]
struct LimitArgs {
    #[command(flatten)]
    input: FilesArgs,

    /// Stop after this many combinations
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct CollectArgs {
    #[command(flatten)]
    input: FilesArgs,

    /// Value of a free parameter, as NAME=VALUE (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Start from the default values of all free parameters
    #[arg(long)]
    defaults: bool,
}

#[derive(Serialize)]
struct CheckSummary<'a> {
    parameters: Vec<&'a str>,
    free: &'a [String],
    types: BTreeMap<&'a str, &'static str>,
    choices: &'a BTreeMap<String, Vec<String>>,
    defaults: &'a BTreeMap<String, Value>,
    combinations: Option<usize>,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, "warn"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Check(args) => run_check(&args, cli.pretty),
        Commands::Choices(args) => run_choices(&args, cli.pretty),
        Commands::Combinations(args) => run_combinations(&args, cli.pretty),
        Commands::Collect(args) => run_collect(&args, cli.pretty),
        Commands::Expand(args) => run_expand(&args, cli.pretty),
    }
}

fn run_check(args: &FilesArgs, pretty: bool) -> Result<()> {
    let params = load_parameter_set(&args.files)?;
    let summary = CheckSummary {
        parameters: params.parameters().iter().map(String::as_str).collect(),
        free: params.free(),
        types: params
            .types()
            .iter()
            .map(|(name, ty)| (name.as_str(), ty.as_str()))
            .collect(),
        choices: params.all_choices(),
        defaults: params.defaults(),
        combinations: params.combination_count(),
    };
    print_json(&summary, pretty)
}

fn run_choices(args: &ChoicesArgs, pretty: bool) -> Result<()> {
    let params = load_parameter_set(&args.input.files)?;
    match &args.param {
        Some(name) => {
            let choices = params
                .choices(name)
                .ok_or_else(|| anyhow!("Parameter {name} is not a free Table Index"))?;
            print_json(choices, pretty)
        }
        None => print_json(params.all_choices(), pretty),
    }
}

fn run_combinations(args: &LimitArgs, pretty: bool) -> Result<()> {
    let params = load_parameter_set(&args.input.files)?;
    let combinations = params
        .try_combinations()?
        .take(args.limit.unwrap_or(usize::MAX));

    if pretty {
        let all: Vec<_> = combinations.collect();
        return print_json(&all, true);
    }
    for combination in combinations {
        print_json(&combination, false)?;
    }
    Ok(())
}

fn run_collect(args: &CollectArgs, pretty: bool) -> Result<()> {
    let params = load_parameter_set(&args.input.files)?;

    let mut free = if args.defaults {
        params.defaults().clone()
    } else {
        BTreeMap::new()
    };
    for assignment in &args.set {
        let (name, raw) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected NAME=VALUE, got '{assignment}'"))?;
        let value = params
            .parse_free_value(name, &RawValue::String(raw.to_string()))
            .with_context(|| format!("Invalid value for {name}"))?;
        free.insert(name.to_string(), value);
    }

    let values = params.collect(&free)?;
    print_json(&values, pretty)
}

fn run_expand(args: &LimitArgs, pretty: bool) -> Result<()> {
    let params = load_parameter_set(&args.input.files)?;
    let limit = args.limit.unwrap_or(usize::MAX);

    let mut count = 0usize;
    for combination in params.try_combinations()?.take(limit) {
        let values = params
            .collect_combination(&combination)
            .with_context(|| format!("Cannot resolve combination {combination:?}"))?;
        print_json(&values, pretty)?;
        count += 1;
    }
    log::info!("Expanded {count} catalog entries");
    Ok(())
}
