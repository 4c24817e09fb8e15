//! strata CLI — index a project and query symbols, call graphs, and
//! references from the command line.
//!
//! Every command indexes (or reuses) the project at `--root`, then runs one
//! query against the engine. See `strata --help` for the full surface.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_args;

use cli_args::{Cli, Commands};
use strata_core::cancel::CancelToken;
use strata_core::types::{IndexError, SymbolKind};
use strata_engine::{watcher, IndexEngine};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("strata: error: {err}");
            1
        }
    });
}

fn run(cli: Cli) -> Result<(), IndexError> {
    let root = cli
        .root
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let root = root.canonicalize().unwrap_or(root);

    let engine = Arc::new(IndexEngine::new());
    let cancel = CancelToken::new();
    engine.ensure_indexed(&root, &cancel)?;

    match cli.command {
        Commands::Index => emit(cli.json, &engine.stats(), |stats| print_stats(stats)),
        Commands::Languages => {
            let languages = engine.registry().languages();
            if cli.json {
                let value: Vec<_> = languages
                    .iter()
                    .map(|(lang, exts)| serde_json::json!({"language": lang, "extensions": exts}))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            } else {
                for (lang, exts) in languages {
                    println!("{:<12} .{}", lang, exts.join(" ."));
                }
            }
            Ok(())
        }
        Commands::Search { query } => {
            emit(cli.json, &engine.search_symbols(&query), print_symbols)
        }
        Commands::Def { name, kind } => {
            let kind = parse_kind(kind.as_deref())?;
            match engine.find_definition(&name, kind) {
                Some(symbol) => emit(cli.json, &vec![symbol], print_symbols),
                None => {
                    println!("not found");
                    Ok(())
                }
            }
        }
        Commands::File { path } => emit(cli.json, &engine.symbols_in_file(&path), print_symbols),
        Commands::Kind { kind } => {
            let kind = parse_kind(Some(&kind))?
                .ok_or_else(|| IndexError::Invariant("kind required".into()))?;
            emit(cli.json, &engine.symbols_by_kind(kind), print_symbols)
        }
        Commands::Stats => emit(cli.json, &engine.stats(), |stats| print_stats(stats)),
        Commands::Callers { id } => emit(cli.json, &engine.graph().callers(&id), print_lines),
        Commands::Callees { id } => emit(cli.json, &engine.graph().callees(&id), print_lines),
        Commands::Chain { from, to, depth } => {
            let chains = engine.graph().call_chain(&from, &to, depth);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&chains).unwrap_or_default());
            } else if chains.is_empty() {
                println!("no path");
            } else {
                for chain in chains {
                    println!("{}", chain.join(" -> "));
                }
            }
            Ok(())
        }
        Commands::Impact { id, depth } => {
            let reached = engine.graph().impact(&id, depth);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reached).unwrap_or_default());
            } else {
                for node in reached {
                    println!("{:>3}  {}", node.depth, node.id);
                }
            }
            Ok(())
        }
        Commands::Deps { file, to, depth } => {
            if let Some(to) = to {
                match engine.graph().dependency_path(&file, &to, depth) {
                    Some(path) => println!("{}", path.join(" -> ")),
                    None => println!("no path"),
                }
            } else {
                let deps = engine.graph().file_dependencies(&file);
                emit(cli.json, &deps, print_lines)?;
            }
            Ok(())
        }
        Commands::Cycles => {
            let cycles = engine.graph().cyclic_dependencies();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&cycles).unwrap_or_default());
            } else if cycles.is_empty() {
                println!("no cycles");
            } else {
                for cycle in cycles {
                    println!("{}", cycle.files.join(" -> "));
                }
            }
            Ok(())
        }
        Commands::Mermaid { graph, max_nodes } => {
            let out = match graph.as_str() {
                "deps" => engine.graph().export_dependency_graph_mermaid(max_nodes),
                _ => engine.graph().export_call_graph_mermaid(max_nodes),
            };
            print!("{out}");
            Ok(())
        }
        Commands::Refs { name, kind, usages } => {
            let refs = if usages {
                engine.find_usages(&name, &cancel)?
            } else {
                let kind = parse_kind(kind.as_deref())?;
                engine.find_references(&name, kind, &cancel)?
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&refs).unwrap_or_default());
            } else {
                for r in refs {
                    let marker = if r.is_definition { " [def]" } else { "" };
                    println!("{}:{}:{}: {}{}", r.file_path, r.line, r.column, r.line_text, marker);
                }
            }
            Ok(())
        }
        Commands::Body { file, name } => {
            let full = root.join(&file);
            let source = std::fs::read_to_string(&full)
                .map_err(|e| IndexError::Walk(format!("{}: {e}", full.display())))?;
            let analyzer = engine
                .registry()
                .for_path(&full)
                .ok_or_else(|| IndexError::Invariant(format!("no analyzer for {file}")))?;
            match analyzer.function_body(&source, &name) {
                Some(body) => println!("{body}"),
                None => println!("not found"),
            }
            Ok(())
        }
        Commands::Watch => {
            let guard = watcher::start_watching(&root, Arc::clone(&engine))
                .map_err(|e| IndexError::Walk(e.to_string()))?;
            println!("watching {} (ctrl-c to stop)", root.display());
            loop {
                std::thread::sleep(std::time::Duration::from_secs(3600));
                // Guard lives for the whole loop.
                let _ = &guard;
            }
        }
    }
}

fn parse_kind(kind: Option<&str>) -> Result<Option<SymbolKind>, IndexError> {
    match kind {
        None => Ok(None),
        Some(s) => SymbolKind::parse(s)
            .map(Some)
            .ok_or_else(|| IndexError::Invariant(format!("unknown kind: {s}"))),
    }
}

fn emit<T: serde::Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce(&T),
) -> Result<(), IndexError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    } else {
        text(value);
    }
    Ok(())
}

fn print_symbols(symbols: &Vec<strata_core::types::Symbol>) {
    if symbols.is_empty() {
        println!("no symbols");
        return;
    }
    for s in symbols {
        let parent = s
            .parent
            .as_deref()
            .map(|p| format!(" (in {p})"))
            .unwrap_or_default();
        println!(
            "{:<10} {:<28} {}:{}-{}{}",
            s.kind, s.name, s.file_path, s.line_start, s.line_end, parent
        );
    }
}

fn print_lines(lines: &Vec<String>) {
    if lines.is_empty() {
        println!("none");
        return;
    }
    for line in lines {
        println!("{line}");
    }
}

fn print_stats(stats: &strata_core::types::IndexStats) {
    println!("symbols: {}", stats.total_symbols);
    println!("unique names: {}", stats.unique_names);
    println!("files: {}", stats.files);
    for (kind, count) in &stats.kinds {
        println!("  {kind:<12} {count}");
    }
}
