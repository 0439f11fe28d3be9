use std::path::Path;
use std::sync::Arc;

use alk_sdk::{
    AssetPath, Decoration, EditGuard, Eligibility, FileStatus, FsAccess, IconResolver,
    InMemoryRepository, LockSession, ProjectPathMapper, RepositorySnapshot,
    SessionConfig,
};
use anyhow::Context;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut ws = Workspace::open(&cli)?;
    match cli.command {
        Command::Status => cmd_status(&ws, &cli.format),
        Command::CanLock(args) => {
            let asset = AssetPath::new(args.asset);
            let verdict = ws.session.can_request_lock(&asset);
            print_eligibility("lock", &asset, &verdict);
            Ok(())
        }
        Command::CanRelease(args) => {
            let asset = AssetPath::new(args.asset);
            let verdict = ws.session.can_release_lock(&asset);
            print_eligibility("release", &asset, &verdict);
            Ok(())
        }
        Command::Lock(args) => {
            let asset = AssetPath::new(args.asset);
            ws.session.request_lock(&asset)?;
            ws.finish_op(&cli.snapshot, args.dry_run, "Locked", &asset)
        }
        Command::Release(args) => {
            let asset = AssetPath::new(args.asset);
            ws.session.release_lock(&asset)?;
            ws.finish_op(&cli.snapshot, args.dry_run, "Released", &asset)
        }
        Command::CheckSave(args) => cmd_check_save(args),
    }
}

/// A session attached to the repository described by the snapshot file.
struct Workspace {
    runtime: Runtime,
    repository: Arc<InMemoryRepository>,
    session: LockSession,
}

impl Workspace {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SessionConfig::default(),
        };
        let snapshot = if cli.snapshot.exists() {
            RepositorySnapshot::load(&cli.snapshot)
                .with_context(|| format!("loading snapshot {}", cli.snapshot.display()))?
        } else {
            debug!(path = %cli.snapshot.display(), "no snapshot file, starting empty");
            RepositorySnapshot::default()
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let repository = Arc::new(InMemoryRepository::from_snapshot(snapshot));
        let mapper = Arc::new(ProjectPathMapper::new(config.project_prefix.clone()));
        let mut session =
            LockSession::new(repository.clone(), mapper, config, runtime.handle().clone())?;
        session.attach();
        session.pump();
        Ok(Self { runtime, repository, session })
    }

    /// Wait for the spawned lock operations, report them, and persist the
    /// resulting repository state.
    fn finish_op(
        &mut self,
        snapshot_path: &Path,
        dry_run: bool,
        verb: &str,
        asset: &AssetPath,
    ) -> anyhow::Result<()> {
        let timeout = self.session.config().gate.busy_timeout();
        let mut report = self.runtime.block_on(self.session.settle(timeout));
        // The lock notification can trail the last completion.
        report.merge(self.session.pump());

        if self.session.pending() > 0 {
            anyhow::bail!("lock operation on {asset} did not finish within {timeout:?}");
        }

        let failures: Vec<_> = report.failures().collect();
        for failure in &failures {
            if let Err(e) = &failure.result {
                println!("{} {} {}: {}", "✗".red().bold(), failure.op, failure.path, e);
            }
        }
        for done in report.completions.iter().filter(|c| c.is_success()) {
            println!("{} {} {}", "✓".green().bold(), verb, done.path.to_string().yellow());
        }

        if dry_run {
            println!("  {}", "(dry run, snapshot not written)".dimmed());
        } else {
            self.repository
                .to_snapshot()
                .save(snapshot_path)
                .with_context(|| format!("writing snapshot {}", snapshot_path.display()))?;
        }

        if !failures.is_empty() {
            anyhow::bail!("{} lock operation(s) failed", failures.len());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusRow {
    guid: String,
    path: String,
    status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    locked_by: Option<String>,
}

impl From<&Decoration> for StatusRow {
    fn from(d: &Decoration) -> Self {
        Self {
            guid: d.guid.to_hex(),
            path: d.asset_path.to_string(),
            status: d.status,
            locked_by: d.lock.as_ref().map(|l| {
                l.owner.as_ref().map_or_else(|| "unknown".to_string(), |o| o.to_string())
            }),
        }
    }
}

/// Terminal badges for decorated assets.
struct Badges;

impl IconResolver for Badges {
    type Icon = ColoredString;

    fn icon_for(&self, status: FileStatus, locked: bool) -> Option<ColoredString> {
        let badge = match status {
            FileStatus::Modified => "M".yellow(),
            FileStatus::Added => "A".green(),
            FileStatus::Deleted => "D".red(),
            FileStatus::Renamed => "R".cyan(),
            FileStatus::Copied => "C".cyan(),
            FileStatus::Unmerged => "U".red().bold(),
            FileStatus::None if locked => " ".normal(),
            FileStatus::None | FileStatus::Untracked | FileStatus::Ignored => return None,
        };
        Some(badge)
    }
}

fn cmd_status(ws: &Workspace, format: &OutputFormat) -> anyhow::Result<()> {
    let decorations = ws.session.decorations();
    if let OutputFormat::Json = format {
        let rows: Vec<StatusRow> = decorations.iter().map(StatusRow::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if decorations.is_empty() {
        println!("No decorated assets.");
        return Ok(());
    }
    for d in &decorations {
        let badge = ws
            .session
            .icon_for(&d.guid, &Badges)
            .unwrap_or_else(|| "?".dimmed());
        let lock = match &d.lock {
            Some(lock) => match &lock.owner {
                Some(owner) => format!("  locked by {}", owner.to_string().magenta()),
                None => format!("  {}", "locked".magenta()),
            },
            None => String::new(),
        };
        println!("{} {}  {}{}", badge, d.asset_path, d.guid.to_hex()[..8].dimmed(), lock);
    }
    Ok(())
}

fn print_eligibility(action: &str, asset: &AssetPath, verdict: &Eligibility) {
    match verdict {
        Eligibility::Allowed => {
            println!("{} {} may {}", "✓".green().bold(), asset.to_string().yellow(), action);
        }
        Eligibility::Denied(reason) => {
            println!(
                "{} {} may not {}: {}",
                "✗".red().bold(),
                asset.to_string().yellow(),
                action,
                reason
            );
        }
    }
}

fn cmd_check_save(args: CheckSaveArgs) -> anyhow::Result<()> {
    let guard = EditGuard::new(FsAccess::new(&args.root));
    let assets: Vec<AssetPath> = args.paths.into_iter().map(AssetPath::new).collect();
    let filter = guard.filter_saveable(&assets);
    for asset in &filter.allowed {
        println!("  {} {}", "ok:".green(), asset);
    }
    for asset in &filter.rejected {
        println!("  {} {}", "read-only:".red(), asset);
    }
    if !filter.rejected.is_empty() {
        anyhow::bail!("{} file(s) cannot be saved", filter.rejected.len());
    }
    Ok(())
}
