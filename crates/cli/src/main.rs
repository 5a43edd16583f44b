use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use flatvar_core::{FlatVar, Resolver, TypeDescriptor, Value};
use flatvar_flatten::{document, flatten_with_report, render_markdown, FlattenOptions, FlattenReport};
use flatvar_host::{apply_vars, MemoryHost};
use flatvar_schema::{decode, SchemaRegistry};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "flatvarctl", version, about = "Flatten event payloads into host variables")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Nesting ceiling for the walk
    #[arg(long = "max-depth", global = true, env = "FLATVAR_MAX_DEPTH")]
    max_depth: Option<usize>,

    /// Extra field name to ignore (repeatable, case-insensitive)
    #[arg(long = "ignore", global = true, action = ArgAction::Append)]
    ignore: Vec<String>,

    /// Do not document the element shape of empty lists
    #[arg(long = "no-document-empty", global = true, action = ArgAction::SetTrue)]
    no_document_empty: bool,

    /// Only walk fields marked public
    #[arg(long = "public-only", global = true, action = ArgAction::SetTrue)]
    public_only: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Args, Debug)]
struct EventArgs {
    /// Schema file (.json, .yaml or .yml)
    #[arg(long = "schema")]
    schema: PathBuf,
    /// Declared type of the event
    #[arg(long = "type")]
    type_name: String,
    /// Event payload as JSON; `-` reads stdin
    #[arg(long = "event")]
    event: PathBuf,
    /// Key prefix for every variable
    #[arg(long = "prefix", default_value = "")]
    prefix: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the flattened variables of an event
    Flatten(EventArgs),
    /// Flatten an event and apply it to an in-memory host
    Apply(EventArgs),
    /// Print the variables a type can produce as a markdown table
    Docs {
        #[arg(long = "schema")]
        schema: PathBuf,
        #[arg(long = "type")]
        type_name: String,
        #[arg(long = "prefix", default_value = "")]
        prefix: String,
    },
    /// List the types a schema declares
    Types {
        #[arg(long = "schema")]
        schema: PathBuf,
    },
}

fn init_tracing() {
    let env = std::env::var("FLATVAR_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn options(cli: &Cli) -> FlattenOptions {
    let mut opts = FlattenOptions::from_env();
    if let Some(depth) = cli.max_depth { opts.max_depth = depth; }
    opts.ignore(cli.ignore.iter().cloned());
    if cli.no_document_empty { opts.document_empty = false; }
    if cli.public_only { opts.public_only = true; }
    opts
}

fn load_schema(path: &Path) -> Result<SchemaRegistry> {
    SchemaRegistry::load(path).with_context(|| format!("loading schema {}", path.display()))
}

fn root_type(reg: &SchemaRegistry, name: &str) -> Result<TypeDescriptor> {
    reg.resolve(name).ok_or_else(|| anyhow!("type '{}' is not declared in the schema", name))
}

fn read_event(path: &Path) -> Result<serde_json::Value> {
    let mut text = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin().read_to_string(&mut text).context("reading event from stdin")?;
    } else {
        text = std::fs::read_to_string(path).with_context(|| format!("reading event {}", path.display()))?;
    }
    serde_json::from_str(&text).with_context(|| format!("parsing event {}", path.display()))
}

fn flatten_event(args: &EventArgs, opts: &FlattenOptions) -> Result<FlattenReport> {
    let reg = load_schema(&args.schema)?;
    let root = root_type(&reg, &args.type_name)?;
    let json = read_event(&args.event)?;
    let value: Value = decode(&json, &root, &reg);
    let report = flatten_with_report(&root, &value, &args.prefix, opts, &reg);
    info!(vars = report.vars.len(), faults = report.faults.len(), "flattened event");
    if !report.faults.is_empty() {
        warn!(faults = report.faults.len(), "some fields were skipped");
        eprintln!("{} field(s) skipped; see log for details", report.faults.len());
    }
    Ok(report)
}

fn print_vars(vars: &[FlatVar]) {
    let width = vars.iter().map(|v| v.key.len()).max().unwrap_or(0);
    for v in vars {
        let value = v.value.as_ref().map(|x| x.to_string()).unwrap_or_else(|| "null".to_string());
        let marker = if v.top_level { "*" } else { " " };
        println!("{} {:width$}  {:9}  {}", marker, v.key, v.kind.as_str(), value, width = width);
    }
}

fn print_host(host: &MemoryHost) {
    for (k, v) in &host.text { println!("text       {} = {:?}", k, v); }
    for (k, v) in &host.integer { println!("integer    {} = {}", k, v); }
    for (k, v) in &host.number { println!("number     {} = {}", k, v); }
    for (k, v) in &host.boolean { println!("boolean    {} = {}", k, v); }
    for (k, v) in &host.date_time { println!("date_time  {} = {}", k, v.to_rfc3339()); }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let opts = options(&cli);

    match &cli.command {
        Commands::Flatten(args) => {
            let report = flatten_event(args, &opts)?;
            match cli.output {
                Output::Human => print_vars(&report.vars),
                Output::Json => println!("{}", serde_json::to_string_pretty(&report.vars)?),
            }
        }
        Commands::Apply(args) => {
            let report = flatten_event(args, &opts)?;
            let mut host = MemoryHost::new();
            let applied = apply_vars(&mut host, &report.vars);
            if applied.failed > 0 { eprintln!("{} variable(s) rejected by the host", applied.failed); }
            match cli.output {
                Output::Human => print_host(&host),
                Output::Json => println!("{}", serde_json::to_string_pretty(&host)?),
            }
        }
        Commands::Docs { schema, type_name, prefix } => {
            let reg = load_schema(schema)?;
            let root = root_type(&reg, type_name)?;
            let docs = document(&root, prefix, &opts, &reg);
            match cli.output {
                Output::Human => print!("{}", render_markdown(type_name, &docs)),
                Output::Json => println!("{}", serde_json::to_string_pretty(&docs)?),
            }
        }
        Commands::Types { schema } => {
            let reg = load_schema(schema)?;
            match cli.output {
                Output::Human => {
                    for name in reg.names() {
                        let kind = match reg.get(name) {
                            Some(TypeDescriptor::Enumeration(_)) => "enum",
                            _ => "record",
                        };
                        println!("{} • {}", name, kind);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&reg.names().collect::<Vec<_>>())?),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "flatvarctl",
            "--max-depth",
            "5",
            "--ignore",
            "Secret",
            "--ignore",
            "raw",
            "--no-document-empty",
            "types",
            "--schema",
            "s.json",
        ]);
        let opts = options(&cli);
        assert_eq!(opts.max_depth, 5);
        assert!(!opts.document_empty);
        assert!(opts.ignored_keys.iter().any(|k| k == "Secret"));
        assert_eq!(opts.ignored_keys.iter().filter(|k| k.eq_ignore_ascii_case("raw")).count(), 1);
    }

    #[test]
    fn event_args_parse() {
        let cli = Cli::parse_from(["flatvarctl", "-o", "json", "flatten", "--schema", "s.yaml", "--type", "Jumped", "--event", "-"]);
        assert_eq!(cli.output, Output::Json);
        match cli.command {
            Commands::Flatten(a) => {
                assert_eq!(a.type_name, "Jumped");
                assert_eq!(a.prefix, "");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
