use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sitepack_driver::config::{parse_copy_arg, BuildOptions, ConfigFile, StaticCopy};
use sitepack_driver::{run_build, BuildError};
use sitepack_emit::OutputFormat;
use sitepack_resolve::{discover, ModuleResolver, ResolveError};
use sitepack_strip::{strip_types, TranspileError};

#[derive(Parser)]
#[command(
    name = "sitepack",
    version = "0.1.0",
    about = "Static-site asset pipeline",
    long_about = "Resolves a typed-dialect module graph, collects import.meta\nasset references, strips types, and emits a deployable bundle."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a bundle from an entry module
    Build {
        /// Entry module (may also come from the config file)
        entry: Option<PathBuf>,

        /// Bundle output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Module format of the bundle
        #[arg(long)]
        format: Option<FormatArg>,

        /// Copy a file into the output directory (SRC:DEST, repeatable)
        #[arg(long = "copy", value_name = "SRC:DEST")]
        copy: Vec<String>,

        /// Config file path (default: ./sitepack.config.json if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Resolve an entry module and print its graph (debug)
    Graph {
        /// Entry module
        entry: PathBuf,
    },

    /// Strip types from a single file and print the result (debug)
    Strip {
        /// Input file
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    /// ES module output
    Esm,
    /// CommonJS output
    Cjs,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Esm => OutputFormat::Esm,
            FormatArg::Cjs => OutputFormat::Cjs,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            entry,
            output,
            format,
            copy,
            config,
            verbose,
        } => build_command(entry, output, format, copy, config, verbose),
        Commands::Graph { entry } => graph_command(entry),
        Commands::Strip { input } => strip_command(input),
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_command(
    entry: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<FormatArg>,
    copy: Vec<String>,
    config: Option<PathBuf>,
    verbose: bool,
) -> ExitCode {
    init_logging(verbose);

    let file = match &config {
        Some(path) => match ConfigFile::load(path) {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => match ConfigFile::load_default(Path::new(".")) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let mut copies: Vec<StaticCopy> = Vec::new();
    for arg in &copy {
        match parse_copy_arg(arg) {
            Ok(c) => copies.push(c),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let options =
        match BuildOptions::merge(entry, output, format.map(Into::into), copies, file) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };

    if verbose {
        println!("Building: {}", options.entry.display());
        println!("Output: {} ({})", options.output_file.display(), options.format);
    }

    match run_build(&options) {
        Ok(report) => {
            if verbose {
                println!("\nBundled {} modules:", report.modules.len());
                for (i, module) in report.modules.iter().enumerate() {
                    println!("    {}. {}", i + 1, module.display());
                }
            }
            println!(
                "Bundle written to: {} ({} bytes, {} modules, {} files copied)",
                report.bundle_path.display(),
                report.bundle_bytes,
                report.modules.len(),
                report.copied,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_build_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn graph_command(entry: PathBuf) -> ExitCode {
    init_logging(false);

    let resolver = match entry.parent() {
        Some(dir) => ModuleResolver::new(dir),
        None => ModuleResolver::new(Path::new(".")),
    };

    let graph = match discover(&entry, &resolver) {
        Ok(g) => g,
        Err(e) => {
            report_resolve_error(&e);
            return ExitCode::FAILURE;
        }
    };

    println!("Modules for {}:\n", entry.display());
    println!("{}", "=".repeat(80));

    for (i, path) in graph.emit_order().iter().enumerate() {
        let deps = graph.get(path).map(|n| n.dependencies().count()).unwrap_or(0);
        println!("{:4} | {} ({} deps)", i + 1, path.display(), deps);
    }

    println!("{}", "=".repeat(80));
    println!("\nTotal modules: {}", graph.len());

    ExitCode::SUCCESS
}

fn strip_command(input: PathBuf) -> ExitCode {
    init_logging(false);

    let source = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match strip_types(&source, &input) {
        Ok(stripped) => {
            print!("{}", stripped);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_transpile_error(&e);
            ExitCode::FAILURE
        }
    }
}

// Error reporting

fn report_build_error(error: &BuildError) {
    match error {
        BuildError::Resolve(e) => report_resolve_error(e),
        BuildError::Transpile(e) => report_transpile_error(e),
        BuildError::Emit(e) => eprintln!("Error: {}", e),
        BuildError::Config(e) => eprintln!("Error: {}", e),
    }
}

fn report_resolve_error(error: &ResolveError) {
    match error {
        ResolveError::UnresolvedModule {
            specifier,
            from,
            span,
            detail,
        } => {
            let filename = from.to_string_lossy().to_string();
            match fs::read_to_string(from) {
                Ok(source) => report_error(
                    "E0100",
                    "Unresolved module",
                    &format!("cannot resolve '{}': {}", specifier, detail),
                    span.start,
                    span.end,
                    &filename,
                    &source,
                ),
                Err(_) => eprintln!("Error: {}", error),
            }
        }
        ResolveError::Read { .. } => eprintln!("Error: {}", error),
    }
}

fn report_transpile_error(error: &TranspileError) {
    let filename = error.path.to_string_lossy().to_string();
    match fs::read_to_string(&error.path) {
        Ok(source) => report_error(
            "E0200",
            "Syntax error",
            &error.message,
            error.span.start,
            error.span.end,
            &filename,
            &source,
        ),
        Err(_) => eprintln!("Error: {}", error),
    }
}

fn report_error(
    code: &str,
    title: &str,
    message: &str,
    start: usize,
    end: usize,
    filename: &str,
    source: &str,
) {
    let span = (filename, start..end);
    let _ = Report::build(ReportKind::Error, span.clone())
        .with_code(code)
        .with_message(title)
        .with_label(
            Label::new(span)
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .print((filename, Source::from(source)));
}
