//! CLI command implementations.
//!
//! Each command returns its output as a string; `main` is the only place
//! that prints or exits. All fallible work funnels through [`Result`], so
//! the error-to-exit-code translation happens exactly once.

use crate::cli::output::{
    DiffReport, ModifiedFile, StatusReport, SymbolHit, format_cache_stats, format_diffs,
    format_history, format_outcomes, format_sources, format_status, format_symbols,
};
use crate::cli::parser::{CacheCommands, Cli, Commands, SourceCommands};
use crate::config::{ConfigFile, SourceConfig};
use crate::core::Source;
use crate::discovery::{self, DiscoveryOptions};
use crate::embedding::create_embedder;
use crate::error::{Error, Result};
use crate::format::OutputFormat;
use crate::index::{CancelToken, IndexProgress, Indexer, diff_files};
use crate::io;
use crate::project::Project;
use crate::select::{SelectMode, SelectOptions, select};
use crate::storage::{ChunkFilter, IndexStats, Store};
use crate::symbols;
use crate::token::Tokenizer;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Executes the parsed CLI command against the current working directory.
///
/// # Errors
///
/// Returns the command's error; `main` maps it to an exit code.
pub fn execute(cli: &Cli) -> Result<String> {
    let cwd = std::env::current_dir().map_err(|e| Error::Io {
        path: ".".to_string(),
        reason: e.to_string(),
    })?;

    match &cli.command {
        Commands::Init { force } => cmd_init(&cwd, *force, cli.json),
        Commands::Source(source_cmd) => match source_cmd {
            SourceCommands::Add {
                path,
                name,
                include,
                exclude,
            } => cmd_source_add(&cwd, path, name.as_deref(), include, exclude, cli.json),
            SourceCommands::List => cmd_source_list(&cwd, cli.json),
            SourceCommands::Remove { name } => cmd_source_remove(&cwd, name, cli.json),
        },
        Commands::Index { source } => cmd_index(&cwd, source.as_deref(), cli),
        Commands::Select {
            query,
            budget,
            format,
            mode,
            sources,
            explain,
            include_imports,
            no_cache,
        } => cmd_select(
            &cwd,
            query,
            *budget,
            format.as_deref(),
            mode,
            sources,
            *explain,
            *include_imports,
            *no_cache,
            cli.json,
        ),
        Commands::Symbol {
            name,
            exact,
            limit,
            sources,
        } => cmd_symbol(&cwd, name, *exact, *limit, sources, cli.json),
        Commands::Diff { source } => cmd_diff(&cwd, source.as_deref(), cli.json),
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Clear => cmd_cache_clear(&cwd),
            CacheCommands::Stats => cmd_cache_stats(&cwd, cli.json),
        },
        Commands::History { run, clear, limit } => {
            cmd_history(&cwd, *run, *clear, *limit, cli.json)
        }
        Commands::Export {
            path,
            no_embeddings,
        } => cmd_export(&cwd, path.as_deref(), *no_embeddings),
        Commands::Status => cmd_status(&cwd, cli.json),
    }
}

fn cmd_init(cwd: &Path, force: bool, json: bool) -> Result<String> {
    let project = Project::init(cwd, force)?;
    if json {
        #[derive(Serialize)]
        struct InitReport {
            initialized: bool,
            path: String,
        }
        return Ok(serde_json::to_string_pretty(&InitReport {
            initialized: true,
            path: project.dir().display().to_string(),
        })?);
    }
    Ok(format!("Initialized {}\n", project.dir().display()))
}

fn cmd_source_add(
    cwd: &Path,
    path: &Path,
    name: Option<&str>,
    include: &[String],
    exclude: &[String],
    json: bool,
) -> Result<String> {
    let project = Project::open(cwd)?;
    let mut config = project.load_config()?;

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    let root = joined.canonicalize().map_err(|_| Error::PathNotFound {
        path: joined.display().to_string(),
        suggestion: discovery::sibling_suggestion(&joined),
    })?;
    if !root.is_dir() {
        return Err(Error::PathNotFound {
            path: root.display().to_string(),
            suggestion: None,
        });
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidUsage {
                message: "cannot derive a source name from the path; pass --name".to_string(),
            })?,
    };
    if config.source(&name).is_some() {
        return Err(Error::SourceExists { name });
    }

    let source_config = SourceConfig {
        name: name.clone(),
        path: root,
        include: include.to_vec(),
        exclude: exclude.to_vec(),
    };
    let mut store = project.open_store()?;
    store.upsert_source(&source_config.to_source())?;
    config.sources.push(source_config);
    project.save_config(&config)?;

    if json {
        #[derive(Serialize)]
        struct AddReport {
            added: String,
        }
        return Ok(serde_json::to_string_pretty(&AddReport { added: name })?);
    }
    Ok(format!("Added source '{name}'\n"))
}

fn cmd_source_list(cwd: &Path, json: bool) -> Result<String> {
    let project = Project::open(cwd)?;
    let config = project.load_config()?;
    Ok(format_sources(&config.sources, json))
}

fn cmd_source_remove(cwd: &Path, name: &str, json: bool) -> Result<String> {
    let project = Project::open(cwd)?;
    let mut config = project.load_config()?;
    if config.source(name).is_none() {
        return Err(Error::SourceNotFound {
            name: name.to_string(),
        });
    }
    config.sources.retain(|s| s.name != name);
    let mut store = project.open_store()?;
    store.remove_source(name)?;
    project.save_config(&config)?;

    if json {
        #[derive(Serialize)]
        struct RemoveReport {
            removed: String,
        }
        return Ok(serde_json::to_string_pretty(&RemoveReport {
            removed: name.to_string(),
        })?);
    }
    Ok(format!("Removed source '{name}'\n"))
}

fn cmd_index(cwd: &Path, source_filter: Option<&str>, cli: &Cli) -> Result<String> {
    let project = Project::open(cwd)?;
    let config = project.load_config()?;
    let sources = select_sources(&config, source_filter)?;

    let mut store = project.open_store()?;
    let embedder = create_embedder()?;
    let tokenizer = Tokenizer::new();
    let options = config.settings.index_options();

    let show_progress = !cli.quiet && !cli.json && !cli.plain;
    let bar = if show_progress {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{msg:>8} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut indexer = Indexer::new(&mut store, embedder.as_ref(), &tokenizer, options);
    let outcomes = indexer.index_all(&sources, &CancelToken::new(), |p: &IndexProgress| {
        bar.set_message(p.stage.as_str());
        if p.files_total > 0 {
            bar.set_length(p.files_total as u64);
            bar.set_position(p.files_done as u64);
        }
    })?;
    bar.finish_and_clear();

    Ok(format_outcomes(&outcomes, cli.json))
}

#[allow(clippy::too_many_arguments)]
fn cmd_select(
    cwd: &Path,
    query: &str,
    budget: Option<usize>,
    format: Option<&str>,
    mode: &str,
    sources: &[String],
    explain: bool,
    include_imports: bool,
    no_cache: bool,
    json: bool,
) -> Result<String> {
    let project = Project::open(cwd)?;
    let config = project.load_config()?;
    validate_source_names(&config, sources)?;

    let format = match format {
        Some(name) => OutputFormat::parse(name)?,
        None if json => OutputFormat::Json,
        None => OutputFormat::parse(&config.settings.default_format)?,
    };
    let options = SelectOptions {
        budget: budget.unwrap_or(config.settings.default_budget),
        mode: SelectMode::parse(mode)?,
        format,
        sources: sources.to_vec(),
        explain,
        include_imports,
        use_cache: !no_cache,
        candidate_limit: config.settings.candidate_limit,
    };

    let mut store = project.open_store()?;
    let embedder = create_embedder()?;
    let tokenizer = Tokenizer::new();
    let output = select(&mut store, embedder.as_ref(), &tokenizer, query, &options)?;
    Ok(output.rendered)
}

fn cmd_symbol(
    cwd: &Path,
    name: &str,
    exact: bool,
    limit: usize,
    sources: &[String],
    json: bool,
) -> Result<String> {
    let project = Project::open(cwd)?;
    let config = project.load_config()?;
    validate_source_names(&config, sources)?;

    let store = project.open_store()?;
    let mut chunks = store.list_chunks(&ChunkFilter::default())?;
    if !sources.is_empty() {
        chunks.retain(|c| sources.contains(&c.source_id));
    }
    if chunks.is_empty() {
        return Err(Error::IndexEmpty);
    }

    // Overlapping chunks re-declare the same symbol; dedupe by identity.
    let mut seen: BTreeSet<(String, usize, String)> = BTreeSet::new();
    let mut pool: Vec<(symbols::Symbol, String)> = Vec::new();
    for chunk in &chunks {
        for symbol in symbols::extract(&chunk.content, &chunk.file_path, chunk.start_line) {
            let key = (chunk.file_path.clone(), symbol.start_line, symbol.name.clone());
            if seen.insert(key) {
                pool.push((symbol, chunk.file_path.clone()));
            }
        }
    }

    let matched = symbols::search(
        pool.iter().map(|(symbol, _)| symbol.clone()).collect(),
        name,
        exact,
    );
    let mut hits: Vec<SymbolHit> = Vec::new();
    for symbol in matched.into_iter().take(limit) {
        // Recover the file by consuming the matching pool entry; names
        // are not unique across files.
        if let Some(pos) = pool.iter().position(|(s, _)| {
            s.name == symbol.name && s.start_line == symbol.start_line
        }) {
            let (_, file) = pool.remove(pos);
            hits.push(SymbolHit { file, symbol });
        }
    }

    if hits.is_empty() && exact {
        return Err(Error::NoResults {
            message: format!("no symbol named {name:?}"),
        });
    }
    Ok(format_symbols(&hits, json))
}

fn cmd_diff(cwd: &Path, source_filter: Option<&str>, json: bool) -> Result<String> {
    let project = Project::open(cwd)?;
    let config = project.load_config()?;
    let sources = select_sources(&config, source_filter)?;
    let store = project.open_store()?;
    let discovery_options = DiscoveryOptions {
        max_file_size: config.settings.max_file_size,
    };

    let mut reports = Vec::new();
    for source in &sources {
        let report = discovery::discover(source, &discovery_options)?;
        let current: BTreeMap<String, String> = report
            .files
            .iter()
            .map(|f| (f.relative_path.clone(), f.content_hash.clone()))
            .collect();
        let prior = store.file_hashes(&source.id)?;
        let diff = diff_files(&current, &prior);

        let modified = diff
            .modified
            .iter()
            .map(|path| {
                let prior_chunks = store
                    .list_chunks(&ChunkFilter {
                        source_id: Some(source.id.clone()),
                        file_path: Some(path.clone()),
                    })
                    .map(|chunks| chunks.len())
                    .unwrap_or(0);
                ModifiedFile {
                    path: path.clone(),
                    prior_chunks,
                }
            })
            .collect();

        reports.push(DiffReport {
            source: source.id.clone(),
            added: diff.added,
            modified,
            removed: diff.removed,
            unchanged: diff.unchanged.len(),
        });
    }
    Ok(format_diffs(&reports, json))
}

fn cmd_cache_clear(cwd: &Path) -> Result<String> {
    let project = Project::open(cwd)?;
    let mut store = project.open_store()?;
    store.cache_clear()?;
    Ok("Cache cleared.\n".to_string())
}

fn cmd_cache_stats(cwd: &Path, json: bool) -> Result<String> {
    let project = Project::open(cwd)?;
    let store = project.open_store()?;
    Ok(format_cache_stats(&store.cache_stats()?, json))
}

fn cmd_history(
    cwd: &Path,
    run: Option<i64>,
    clear: bool,
    limit: usize,
    json: bool,
) -> Result<String> {
    let project = Project::open(cwd)?;
    let mut store = project.open_store()?;

    if clear {
        store.clear_history()?;
        return Ok("History cleared.\n".to_string());
    }

    if let Some(id) = run {
        let entry = store
            .get_history_entry(id)?
            .ok_or_else(|| Error::InvalidUsage {
                message: format!("no history entry with id {id}"),
            })?;
        let config = project.load_config()?;
        let options = SelectOptions {
            budget: entry.record.budget,
            mode: SelectMode::parse(&entry.record.mode)?,
            format: OutputFormat::parse(&entry.record.format)?,
            sources: entry.record.sources.clone(),
            explain: false,
            include_imports: false,
            use_cache: true,
            candidate_limit: config.settings.candidate_limit,
        };
        let embedder = create_embedder()?;
        let tokenizer = Tokenizer::new();
        let output = select(
            &mut store,
            embedder.as_ref(),
            &tokenizer,
            &entry.record.query,
            &options,
        )?;
        return Ok(output.rendered);
    }

    Ok(format_history(&store.get_history(limit)?, json))
}

fn cmd_export(cwd: &Path, path: Option<&Path>, no_embeddings: bool) -> Result<String> {
    let project = Project::open(cwd)?;
    let store = project.open_store()?;

    #[derive(Serialize)]
    struct ExportDump {
        generation: i64,
        sources: Vec<Source>,
        files: BTreeMap<String, BTreeMap<String, String>>,
        chunks: Vec<crate::core::Chunk>,
    }

    let sources = store.list_sources()?;
    let mut files = BTreeMap::new();
    for source in &sources {
        files.insert(source.id.clone(), store.file_hashes(&source.id)?);
    }
    let mut chunks = store.list_chunks(&ChunkFilter::default())?;
    if no_embeddings {
        for chunk in &mut chunks {
            chunk.embedding = None;
        }
    }

    let dump = ExportDump {
        generation: store.generation()?,
        sources,
        files,
        chunks,
    };
    let rendered = serde_json::to_string_pretty(&dump)?;

    match path {
        Some(path) => {
            let target: PathBuf = if path.is_absolute() {
                path.to_path_buf()
            } else {
                cwd.join(path)
            };
            io::write_string(&target, &rendered)?;
            Ok(format!("Exported index to {}\n", target.display()))
        }
        None => Ok(rendered),
    }
}

fn cmd_status(cwd: &Path, json: bool) -> Result<String> {
    if !Project::exists(cwd) {
        let report = StatusReport {
            initialized: false,
            sources: 0,
            generation: 0,
            stats: IndexStats::default(),
        };
        return Ok(format_status(&report, json));
    }

    let project = Project::open(cwd)?;
    let config = project.load_config()?;
    let store = project.open_store()?;
    let report = StatusReport {
        initialized: true,
        sources: config.sources.len(),
        generation: store.generation()?,
        stats: store.index_stats()?,
    };
    Ok(format_status(&report, json))
}

/// Resolves the source set for index/diff: one named source or all.
fn select_sources(config: &ConfigFile, filter: Option<&str>) -> Result<Vec<Source>> {
    let sources: Vec<Source> = match filter {
        Some(name) => {
            let source = config.source(name).ok_or_else(|| Error::SourceNotFound {
                name: name.to_string(),
            })?;
            vec![source.to_source()]
        }
        None => config.sources.iter().map(SourceConfig::to_source).collect(),
    };
    if sources.is_empty() {
        return Err(Error::NoSources);
    }
    Ok(sources)
}

/// Rejects `-s` names that are not registered.
fn validate_source_names(config: &ConfigFile, names: &[String]) -> Result<()> {
    for name in names {
        if config.source(name).is_none() {
            return Err(Error::SourceNotFound { name: name.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(args.iter().copied())
    }

    /// Runs a command with the working directory swapped into the helper
    /// via explicit paths (commands only use `cwd` through arguments).
    fn run_in(dir: &Path, args: &[&str]) -> Result<String> {
        let cli = parse(args);
        // execute() reads the process cwd; route through the internals
        // instead to stay test-parallel-safe.
        match &cli.command {
            Commands::Init { force } => cmd_init(dir, *force, cli.json),
            Commands::Source(SourceCommands::Add {
                path,
                name,
                include,
                exclude,
            }) => cmd_source_add(dir, path, name.as_deref(), include, exclude, cli.json),
            Commands::Source(SourceCommands::List) => cmd_source_list(dir, cli.json),
            Commands::Source(SourceCommands::Remove { name }) => {
                cmd_source_remove(dir, name, cli.json)
            }
            Commands::Index { source } => cmd_index(dir, source.as_deref(), &cli),
            Commands::Select {
                query,
                budget,
                format,
                mode,
                sources,
                explain,
                include_imports,
                no_cache,
            } => cmd_select(
                dir,
                query,
                *budget,
                format.as_deref(),
                mode,
                sources,
                *explain,
                *include_imports,
                *no_cache,
                cli.json,
            ),
            Commands::Symbol {
                name,
                exact,
                limit,
                sources,
            } => cmd_symbol(dir, name, *exact, *limit, sources, cli.json),
            Commands::Diff { source } => cmd_diff(dir, source.as_deref(), cli.json),
            Commands::Cache(CacheCommands::Clear) => cmd_cache_clear(dir),
            Commands::Cache(CacheCommands::Stats) => cmd_cache_stats(dir, cli.json),
            Commands::History { run, clear, limit } => {
                cmd_history(dir, *run, *clear, *limit, cli.json)
            }
            Commands::Export {
                path,
                no_embeddings,
            } => cmd_export(dir, path.as_deref(), *no_embeddings),
            Commands::Status => cmd_status(dir, cli.json),
        }
    }

    fn project_with_source(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        for (path, content) in files {
            let full = src.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        run_in(dir.path(), &["contextkit", "init"]).unwrap();
        run_in(dir.path(), &["contextkit", "source", "add", "src", "--name", "app"]).unwrap();
        dir
    }

    #[test]
    fn test_init_and_reinit() {
        let dir = TempDir::new().unwrap();
        let out = run_in(dir.path(), &["contextkit", "init"]).unwrap();
        assert!(out.contains("Initialized"));
        let err = run_in(dir.path(), &["contextkit", "init"]).unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized { .. }));
        run_in(dir.path(), &["contextkit", "init", "--force"]).unwrap();
    }

    #[test]
    fn test_uninitialized_commands_fail() {
        let dir = TempDir::new().unwrap();
        let err = run_in(dir.path(), &["contextkit", "source", "list"]).unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_source_add_list_remove() {
        let dir = project_with_source(&[("a.ts", "export function a() {}\n")]);
        let out = run_in(dir.path(), &["contextkit", "source", "list"]).unwrap();
        assert!(out.contains("app"));

        let err = run_in(
            dir.path(),
            &["contextkit", "source", "add", "src", "--name", "app"],
        )
        .unwrap_err();
        assert!(matches!(err, Error::SourceExists { .. }));

        run_in(dir.path(), &["contextkit", "source", "remove", "app"]).unwrap();
        let out = run_in(dir.path(), &["contextkit", "source", "list"]).unwrap();
        assert!(out.contains("No sources"));
    }

    #[test]
    fn test_source_add_missing_path() {
        let dir = TempDir::new().unwrap();
        run_in(dir.path(), &["contextkit", "init"]).unwrap();
        let err =
            run_in(dir.path(), &["contextkit", "source", "add", "missing"]).unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[test]
    fn test_index_without_sources() {
        let dir = TempDir::new().unwrap();
        run_in(dir.path(), &["contextkit", "init"]).unwrap();
        let err = run_in(dir.path(), &["contextkit", "index"]).unwrap_err();
        assert!(matches!(err, Error::NoSources));
    }

    #[test]
    fn test_index_select_roundtrip() {
        let dir = project_with_source(&[
            ("a.ts", "export function add(a, b) { return a + b; }\n"),
            ("b.ts", "import { add } from './a';\nexport const two = add(1, 1);\n"),
        ]);
        let out = run_in(dir.path(), &["contextkit", "--quiet", "index"]).unwrap();
        assert!(out.contains("app:"));

        let rendered = run_in(
            dir.path(),
            &["contextkit", "select", "add function", "-b", "200", "-f", "json"],
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["query"], "add function");
        assert!(value["stats"]["total_tokens"].as_u64().unwrap() <= 200);
        assert_eq!(value["stats"]["files_included"], 2);
        assert_eq!(value["chunks"][0]["file"], "a.ts");
    }

    #[test]
    fn test_select_before_index_is_index_empty() {
        let dir = project_with_source(&[("a.ts", "export function a() {}\n")]);
        let err = run_in(dir.path(), &["contextkit", "select", "anything"]).unwrap_err();
        assert!(matches!(err, Error::IndexEmpty));
    }

    #[test]
    fn test_select_unknown_source_rejected() {
        let dir = project_with_source(&[("a.ts", "export function a() {}\n")]);
        run_in(dir.path(), &["contextkit", "--quiet", "index"]).unwrap();
        let err = run_in(
            dir.path(),
            &["contextkit", "select", "q", "-s", "nope"],
        )
        .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }

    #[test]
    fn test_symbol_search() {
        let dir = project_with_source(&[(
            "auth.ts",
            "export function login() { return true; }\nexport function logout() { return false; }\n",
        )]);
        run_in(dir.path(), &["contextkit", "--quiet", "index"]).unwrap();

        let out = run_in(dir.path(), &["contextkit", "symbol", "login"]).unwrap();
        assert!(out.contains("auth.ts:1"));
        assert!(out.contains("login"));

        let err = run_in(
            dir.path(),
            &["contextkit", "symbol", "nonexistent", "--exact"],
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoResults { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_diff_reports_modification() {
        let dir = project_with_source(&[("a.ts", "export function a() {}\n")]);
        run_in(dir.path(), &["contextkit", "--quiet", "index"]).unwrap();

        let out = run_in(dir.path(), &["contextkit", "diff"]).unwrap();
        assert!(out.contains("up to date"));

        fs::write(
            dir.path().join("src/a.ts"),
            "export function changed() {}\n",
        )
        .unwrap();
        let out = run_in(dir.path(), &["contextkit", "diff"]).unwrap();
        assert!(out.contains("modified  a.ts"));
        assert!(!out.contains("added"));
        assert!(!out.contains("removed"));
    }

    #[test]
    fn test_cache_commands() {
        let dir = project_with_source(&[("a.ts", "export function a() {}\n")]);
        run_in(dir.path(), &["contextkit", "--quiet", "index"]).unwrap();
        run_in(dir.path(), &["contextkit", "select", "function a"]).unwrap();
        run_in(dir.path(), &["contextkit", "select", "function a"]).unwrap();

        let out = run_in(dir.path(), &["contextkit", "cache", "stats"]).unwrap();
        assert!(out.contains("1 entries"));
        assert!(out.contains("1 total hits"));

        let out = run_in(dir.path(), &["contextkit", "cache", "clear"]).unwrap();
        assert!(out.contains("cleared"));
    }

    #[test]
    fn test_history_list_and_rerun() {
        let dir = project_with_source(&[("a.ts", "export function add() { return 1; }\n")]);
        run_in(dir.path(), &["contextkit", "--quiet", "index"]).unwrap();
        let first = run_in(dir.path(), &["contextkit", "select", "add"]).unwrap();

        let out = run_in(dir.path(), &["contextkit", "history"]).unwrap();
        assert!(out.contains("add"));

        let rerun = run_in(dir.path(), &["contextkit", "history", "--run", "1"]).unwrap();
        assert_eq!(rerun, first, "re-run reproduces the original output");

        run_in(dir.path(), &["contextkit", "history", "--clear"]).unwrap();
        let out = run_in(dir.path(), &["contextkit", "history"]).unwrap();
        assert!(out.contains("No queries"));
    }

    #[test]
    fn test_export() {
        let dir = project_with_source(&[("a.ts", "export function a() {}\n")]);
        run_in(dir.path(), &["contextkit", "--quiet", "index"]).unwrap();

        let dump = run_in(dir.path(), &["contextkit", "export", "--no-embeddings"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&dump).unwrap();
        assert_eq!(value["sources"][0]["id"], "app");
        assert!(value["chunks"][0].get("embedding").is_none());

        let out = run_in(dir.path(), &["contextkit", "export", "dump.json"]).unwrap();
        assert!(out.contains("Exported"));
        assert!(dir.path().join("dump.json").is_file());
    }

    #[test]
    fn test_status() {
        let dir = TempDir::new().unwrap();
        let out = run_in(dir.path(), &["contextkit", "status"]).unwrap();
        assert!(out.contains("Initialized:  no"));

        run_in(dir.path(), &["contextkit", "init"]).unwrap();
        let out = run_in(dir.path(), &["contextkit", "status"]).unwrap();
        assert!(out.contains("Initialized:  yes"));

        let json = run_in(dir.path(), &["contextkit", "--json", "status"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["initialized"], true);
    }
}
