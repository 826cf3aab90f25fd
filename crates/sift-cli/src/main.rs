//! Sift CLI - Command line tools for the search query language

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sift_parser::{parse, parse_condition_fragment, ParseError, ParsedQuery};
use sift_query::{CursorDetails, SearchQuery};

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Search query language tools", long_about = None)]
struct Cli {
    /// Log filter, e.g. `debug` or `sift_parser=trace`
    #[arg(long, global = true, env = "SIFT_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical form of a query
    Fmt {
        /// Query text
        query: String,
        /// Treat the input as a bare condition
        #[arg(short, long)]
        fragment: bool,
    },
    /// Print the JSON wire form of a query
    Json {
        /// Query text
        query: String,
        /// Treat the input as a bare condition
        #[arg(short, long)]
        fragment: bool,
        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Read a JSON query and print it as query text
    FromJson {
        /// Input file, or `-` for stdin
        file: PathBuf,
        /// The input is a bare condition tree
        #[arg(short, long)]
        fragment: bool,
    },
    /// Show the phrase under a cursor offset
    Cursor {
        /// Query text
        query: String,
        /// Byte offset of the cursor
        #[arg(short, long)]
        offset: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate files holding one query per non-empty line
    Check {
        /// Input file(s)
        files: Vec<PathBuf>,
    },
    /// Interactive REPL
    Repl,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Fmt { query, fragment } => cmd_fmt(&query, fragment),
        Commands::Json {
            query,
            fragment,
            pretty,
        } => cmd_json(&query, fragment, pretty),
        Commands::FromJson { file, fragment } => cmd_from_json(&file, fragment),
        Commands::Cursor {
            query,
            offset,
            json,
        } => cmd_cursor(&query, offset, json),
        Commands::Check { files } => cmd_check(&files),
        Commands::Repl => cmd_repl(),
    }
}

/// `--log-level` / `SIFT_LOG` first, then `RUST_LOG`, then `warn`
fn init_logging(level: Option<&str>) {
    let filter = level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_input(source: &str, fragment: bool) -> ParsedQuery {
    if fragment {
        parse_condition_fragment(source)
    } else {
        parse(source)
    }
}

fn parse_or_exit(source: &str, fragment: bool) -> SearchQuery {
    let parsed = parse_input(source, fragment);
    if parsed.has_errors() {
        report_parse_errors("<query>", source, &parsed.errors);
        process::exit(1);
    }
    SearchQuery::from_clauses(parsed.clauses)
}

fn render(query: &SearchQuery, fragment: bool) -> String {
    if fragment {
        query.to_condition_string()
    } else {
        query.to_query_string()
    }
}

fn print_json(value: &impl Serialize, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_fmt(source: &str, fragment: bool) {
    let query = parse_or_exit(source, fragment);
    println!("{}", render(&query, fragment));
}

fn cmd_json(source: &str, fragment: bool, pretty: bool) {
    let query = parse_or_exit(source, fragment);
    print_json(&query.to_json(fragment), pretty);
}

fn read_input(file: &Path) -> io::Result<String> {
    if file.as_os_str() == "-" {
        io::read_to_string(io::stdin())
    } else {
        fs::read_to_string(file)
    }
}

fn cmd_from_json(file: &Path, fragment: bool) {
    let text = match read_input(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", file.display(), e);
            process::exit(1);
        }
    };

    let value: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Invalid JSON: {}", e);
            process::exit(1);
        }
    };

    let decoded = if fragment {
        SearchQuery::from_json_fragment(&value)
    } else {
        SearchQuery::from_json(&value)
    };
    match decoded {
        Ok(query) => println!("{}", render(&query, fragment)),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_cursor(source: &str, offset: usize, json: bool) {
    // Cursor lookups work on broken queries too
    let parsed = parse(source);
    debug!(errors = parsed.errors.len(), "parsed query for cursor lookup");

    match CursorDetails::from_parser(&parsed, offset) {
        Some(details) if json => print_json(&details, true),
        Some(details) => print_cursor(&details),
        None => {
            eprintln!("Nothing at offset {}", offset);
            process::exit(1);
        }
    }
}

fn print_cursor(details: &CursorDetails) {
    println!("phrase: {}", details.phrase);
    println!("type:   {}", details.inferred_type.as_str());
    println!("clause: {}", details.top_clause_type.json_key());
    println!("span:   {}..{}", details.span.start, details.span.end);
}

fn cmd_check(files: &[PathBuf]) {
    let mut all_ok = true;

    for file in files {
        let source = match fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {}", file.display(), e);
                all_ok = false;
                continue;
            }
        };

        let mut queries = 0;
        let mut failures = 0;
        for (number, line) in source.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            queries += 1;
            let parsed = parse(line);
            if parsed.has_errors() {
                failures += 1;
                let name = format!("{}:{}", file.display(), number + 1);
                report_parse_errors(&name, line, &parsed.errors);
            }
        }

        if failures == 0 {
            println!("✓ {} - {} queries", file.display(), queries);
        } else {
            eprintln!(
                "✗ {} - {} of {} queries have errors",
                file.display(),
                failures,
                queries
            );
            all_ok = false;
        }
    }

    if !all_ok {
        process::exit(1);
    }
}

fn cmd_repl() {
    use rustyline::DefaultEditor;

    println!("Sift REPL v0.1.0");
    println!("Type a query to see its canonical form, :help for help, :quit to exit");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to start REPL: {}", e);
            process::exit(1);
        }
    };
    let mut last_query = String::new();

    loop {
        let readline = rl.readline("sift> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                let trimmed = line.trim();

                if trimmed.starts_with(':') {
                    match trimmed {
                        ":quit" | ":q" => break,
                        ":help" | ":h" => {
                            println!("Commands:");
                            println!("  <query>       - Parse a query and show its canonical form");
                            println!("  :json         - Show the last query as JSON");
                            println!("  :cursor <n>   - Show the phrase at offset n of the last query");
                            println!("  :quit         - Exit REPL");
                        }
                        ":json" => {
                            if last_query.is_empty() {
                                println!("No query yet. Type one first.");
                            } else {
                                match SearchQuery::parse(&last_query) {
                                    Ok(query) => print_json(&query.to_json(false), true),
                                    Err(e) => eprintln!("Error: {}", e),
                                }
                            }
                        }
                        cmd if cmd.starts_with(":cursor") => {
                            let arg = cmd[":cursor".len()..].trim();
                            match arg.parse::<usize>() {
                                Ok(offset) => {
                                    let parsed = parse(&last_query);
                                    match CursorDetails::from_parser(&parsed, offset) {
                                        Some(details) => print_cursor(&details),
                                        None => println!("Nothing at offset {}", offset),
                                    }
                                }
                                Err(_) => println!("Usage: :cursor <offset>"),
                            }
                        }
                        _ => {
                            println!("Unknown command. Type :help for help.");
                        }
                    }
                } else if !trimmed.is_empty() {
                    last_query = trimmed.to_string();
                    let parsed = parse(&last_query);
                    if parsed.has_errors() {
                        report_parse_errors("<repl>", &last_query, &parsed.errors);
                    } else {
                        println!("{}", parsed.clauses.to_query_string());
                    }
                }
            }
            Err(_) => break,
        }
    }

    info!("repl closed");
    println!("Goodbye!");
}

fn report_parse_errors(name: &str, source: &str, errors: &[ParseError]) {
    for error in errors {
        report_parse_error(name, source, error);
    }
}

fn report_parse_error(name: &str, source: &str, error: &ParseError) {
    let span = error.span();
    let id = name.to_string();
    let result = Report::build(ReportKind::Error, id.clone(), span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((id.clone(), span.start..span.end))
                .with_message(error.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((id, Source::from(source)));

    if result.is_err() {
        eprintln!("{}: {} at offset {}", name, error, error.offset());
    }
}
