//! FACET command-line frontend.
//!
//! A thin convenience layer over the library entry points: it reads files
//! (or stdin), forwards to `canonize`/`lint`/`format_source`, renders
//! diagnostics with caret snippets, and maps outcomes to exit codes.
//! Exit codes: 0 success, 1 diagnostics printed, 2 internal or I/O error.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use facet::diagnostics::Diagnostic;
use facet::{emit, CanonizeOptions, ResolveMode};

#[derive(Parser)]
#[command(name = "facet", version, about = "FACET markup compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Canonicalize a document to JSON with default options.
    ToJson {
        /// Input file, or '-' for stdin.
        input: String,
        /// Emit compact JSON instead of pretty-printed.
        #[arg(long)]
        compact: bool,
    },
    /// Canonicalize and report success or diagnostics, without output.
    Validate {
        input: String,
    },
    /// Normalize a document's encoding and line endings.
    Fmt {
        input: String,
    },
    /// Lex, parse, and structurally check a document.
    Lint {
        input: String,
        /// Output format: text or json.
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Canonicalize with explicit resolution options.
    Canon {
        input: String,
        /// Resolve mode: host or all.
        #[arg(long, default_value = "all")]
        resolve: String,
        /// Host variable as key=value; the value parses as JSON when it can.
        #[arg(long = "var")]
        vars: Vec<String>,
        /// Directory imports may resolve under; repeatable.
        #[arg(long = "import-root")]
        import_roots: Vec<PathBuf>,
        /// Fail on mapping/list shape conflicts during merge.
        #[arg(long)]
        strict_merge: bool,
        /// Emit compact JSON instead of pretty-printed.
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("facet: {}", error);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Command::ToJson { input, compact } => {
            let source = read_input(&input)?;
            let options = CanonizeOptions {
                import_roots: default_import_roots(&input),
                ..CanonizeOptions::default()
            };
            canonize_and_print(&source, &options, compact)
        }
        Command::Validate { input } => {
            let source = read_input(&input)?;
            let options = CanonizeOptions {
                import_roots: default_import_roots(&input),
                ..CanonizeOptions::default()
            };
            match facet::canonize(&source, &options) {
                Ok(_) => Ok(ExitCode::SUCCESS),
                Err(diagnostics) => {
                    print_diagnostics(&diagnostics, &source)?;
                    Ok(ExitCode::from(1))
                }
            }
        }
        Command::Fmt { input } => {
            let source = read_input(&input)?;
            match facet::format_source(&source) {
                Ok(text) => {
                    print!("{}", text);
                    std::io::stdout().flush()?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(diagnostics) => {
                    print_diagnostics(&diagnostics, &source)?;
                    Ok(ExitCode::from(1))
                }
            }
        }
        Command::Lint { input, format } => {
            let source = read_input(&input)?;
            let diagnostics = facet::lint(&source);
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&diagnostics)?);
            } else if !diagnostics.is_empty() {
                print_diagnostics(&diagnostics, &source)?;
            }
            Ok(if diagnostics.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Command::Canon {
            input,
            resolve,
            vars,
            import_roots,
            strict_merge,
            compact,
        } => {
            let source = read_input(&input)?;
            let resolve_mode: ResolveMode = resolve.parse()?;
            let mut host_vars = serde_json::Map::new();
            for binding in &vars {
                let (key, value) = parse_var(binding)?;
                host_vars.insert(key, value);
            }
            let import_roots = if import_roots.is_empty() {
                default_import_roots(&input)
            } else {
                import_roots
            };
            let options = CanonizeOptions {
                resolve_mode,
                host_vars,
                import_roots,
                strict_merge,
            };
            canonize_and_print(&source, &options, compact)
        }
    }
}

fn canonize_and_print(
    source: &[u8],
    options: &CanonizeOptions,
    compact: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match facet::canonize(source, options) {
        Ok(value) => {
            let text = if compact {
                emit::to_string(&value)
            } else {
                emit::to_string_pretty(&value)
            };
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Err(diagnostics) => {
            print_diagnostics(&diagnostics, source)?;
            Ok(ExitCode::from(1))
        }
    }
}

fn read_input(input: &str) -> Result<Vec<u8>, std::io::Error> {
    if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(input)
    }
}

/// Imports resolve under the input file's directory unless overridden.
fn default_import_roots(input: &str) -> Vec<PathBuf> {
    if input == "-" {
        return vec![PathBuf::from(".")];
    }
    match PathBuf::from(input).parent() {
        Some(parent) if parent.as_os_str().is_empty() => vec![PathBuf::from(".")],
        Some(parent) => vec![parent.to_path_buf()],
        None => vec![PathBuf::from(".")],
    }
}

/// Parse a `--var key=value` binding; the value is JSON when it parses,
/// otherwise a plain string.
fn parse_var(binding: &str) -> Result<(String, serde_json::Value), String> {
    let Some((key, raw)) = binding.split_once('=') else {
        return Err(format!("--var '{}' is not of the form key=value", binding));
    };
    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn print_diagnostics(
    diagnostics: &[Diagnostic],
    source: &[u8],
) -> Result<(), std::io::Error> {
    let choice = if atty::is(atty::Stream::Stderr) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stderr = StandardStream::stderr(choice);
    let source_text = String::from_utf8_lossy(source);
    let width = terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| w as usize)
        .unwrap_or(100);

    for diagnostic in diagnostics {
        stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(stderr, "{}", diagnostic.code)?;
        stderr.reset()?;
        if diagnostic.line > 0 {
            writeln!(
                stderr,
                ": {} (line {}, column {})",
                diagnostic.message, diagnostic.line, diagnostic.column
            )?;
        } else {
            writeln!(stderr, ": {}", diagnostic.message)?;
        }
        if let Some(snippet) = diagnostic.render_snippet(&source_text) {
            for line in snippet.lines() {
                let shown: String = line.chars().take(width).collect();
                writeln!(stderr, "  {}", shown)?;
            }
        }
        if let Some(hint) = &diagnostic.hint {
            writeln!(stderr, "  hint: {}", hint)?;
        }
    }
    Ok(())
}
