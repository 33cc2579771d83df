//! CLI route: single route table and run context.

use crate::cli::output::CommandStatus;
use crate::cli::parse::Commands;
use crate::cli::presentation::{format_fsck_summary_text, format_stats_text, RepoStats};
use crate::config::{ConfigLoader, ProvgraphConfig, StorageBackend};
use crate::error::ApiError;
use crate::fsck::{Fsck, FsckResponse};
use crate::store::{GraphDump, GraphStore, MemoryGraphStore, SledGraphStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace, configuration and the opened store.
pub struct RunContext {
    config: ProvgraphConfig,
    workspace_root: PathBuf,
    store: Box<dyn GraphStore>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let store = open_store(&config, &workspace_root)?;
        Ok(Self {
            config,
            workspace_root,
            store,
        })
    }

    /// Build a context around an already opened store.
    pub fn with_store(workspace_root: PathBuf, store: Box<dyn GraphStore>) -> Self {
        Self {
            config: ProvgraphConfig::default(),
            workspace_root,
            store,
        }
    }

    pub fn config(&self) -> &ProvgraphConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    /// Execute a CLI command, writing its results to `out`.
    pub fn execute(&self, command: &Commands, out: &mut dyn Write) -> Result<CommandStatus, ApiError> {
        match command {
            Commands::Fsck { fix, format, dump } => {
                let json = parse_format(format)?;
                match dump {
                    Some(path) => {
                        let offline = MemoryGraphStore::new();
                        read_dump(path)?.restore(&offline)?;
                        run_fsck(&offline, *fix, json, out)
                    }
                    None => run_fsck(self.store(), *fix, json, out),
                }
            }
            Commands::Load { file } => {
                let dump = read_dump(file)?;
                dump.restore(self.store().as_writer())?;
                self.store().as_writer().flush()?;
                info!(
                    repos = dump.repos.len(),
                    branches = dump.branches.len(),
                    commits = dump.commits.len(),
                    "graph dump loaded"
                );
                write_line(
                    out,
                    &format!(
                        "loaded {} repos, {} branches, {} commits",
                        dump.repos.len(),
                        dump.branches.len(),
                        dump.commits.len()
                    ),
                )?;
                Ok(CommandStatus::Success)
            }
            Commands::Dump => {
                let dump = GraphDump::collect(self.store().as_reader())?;
                let text = serde_json::to_string_pretty(&dump)
                    .map_err(|e| ApiError::DumpError(e.to_string()))?;
                write_line(out, &text)?;
                Ok(CommandStatus::Success)
            }
            Commands::Stats { format } => {
                let json = parse_format(format)?;
                let stats = collect_stats(self.store())?;
                let text = if json {
                    serde_json::to_string_pretty(&stats)
                        .map_err(|e| ApiError::DumpError(e.to_string()))?
                } else {
                    format_stats_text(&stats)
                };
                write_line(out, &text)?;
                Ok(CommandStatus::Success)
            }
        }
    }
}

fn open_store(config: &ProvgraphConfig, workspace_root: &Path) -> Result<Box<dyn GraphStore>, ApiError> {
    match config.storage.backend {
        StorageBackend::Sled => {
            let path = config.storage.resolve_path(workspace_root);
            std::fs::create_dir_all(&path)
                .map_err(|e| ApiError::StorageError(crate::error::StorageError::IoError(e)))?;
            info!(path = %path.display(), "opening sled graph store");
            Ok(Box::new(SledGraphStore::new(&path)?))
        }
        StorageBackend::Memory => {
            warn!("using in-memory graph store; records are discarded on exit");
            Ok(Box::new(MemoryGraphStore::new()))
        }
    }
}

fn parse_format(format: &str) -> Result<bool, ApiError> {
    match format {
        "text" => Ok(false),
        "json" => Ok(true),
        other => Err(ApiError::ConfigError(format!(
            "Invalid output format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}

fn read_dump(path: &Path) -> Result<GraphDump, ApiError> {
    let bytes = std::fs::read(path).map_err(|e| {
        ApiError::DumpError(format!("Failed to read dump {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ApiError::DumpError(format!("Failed to parse dump {}: {}", path.display(), e))
    })
}

fn write_line(out: &mut dyn Write, text: &str) -> Result<(), ApiError> {
    writeln!(out, "{}", text).map_err(|e| ApiError::StorageError(e.into()))
}

/// Run fsck, streaming one line per violation and per applied fix.
///
/// A failed write to `out` stops the scan through the sink.
fn run_fsck(
    store: &dyn GraphStore,
    fix: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<CommandStatus, ApiError> {
    let emit = |out: &mut dyn Write, response: &FsckResponse| -> std::io::Result<()> {
        if json {
            let line = serde_json::to_string(response).map_err(std::io::Error::other)?;
            writeln!(out, "{}", line)
        } else {
            let text = response
                .error
                .as_deref()
                .map(|e| e.trim_end().to_string())
                .or_else(|| response.fix.as_ref().map(|f| format!("fix: {}", f)))
                .unwrap_or_default();
            writeln!(out, "{}", text)
        }
    };

    let summary = Fsck::new(store)
        .check_consistency(fix, |violation| emit(out, &FsckResponse::error(&violation)))?;

    if let Some(repair) = &summary.repair {
        store.as_writer().flush()?;
        for response in FsckResponse::fixes(repair) {
            emit(out, &response).map_err(|e| ApiError::StorageError(e.into()))?;
        }
    }
    if !json {
        write_line(out, &format_fsck_summary_text(&summary))?;
    }

    if summary.is_clean() {
        Ok(CommandStatus::Success)
    } else {
        Ok(CommandStatus::ViolationsFound)
    }
}

fn collect_stats(store: &dyn GraphStore) -> Result<Vec<RepoStats>, ApiError> {
    let dump = GraphDump::collect(store.as_reader())?;
    let stats = dump
        .repos
        .iter()
        .map(|info| {
            let repo = &info.repo;
            let branches: Vec<_> = dump.branches.iter().filter(|b| &b.branch.repo == repo).collect();
            RepoStats {
                repo: repo.to_string(),
                branches: branches.len(),
                commits: dump.commits.iter().filter(|c| &c.commit.repo == repo).count(),
                branches_without_head: branches.iter().filter(|b| b.head.is_none()).count(),
            }
        })
        .collect();
    Ok(stats)
}
