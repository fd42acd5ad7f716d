//! `watchlog` — command-line driver for the watchlog tracker.
//!
//! # Usage
//!
//! ```
//! watchlog add "Frieren" --status watching --tags fantasy,drama
//! watchlog list --status watching --sort title --direction asc
//! watchlog status <id> completed
//! watchlog check-update --download
//! watchlog --config ~/.config/watchlog/config.toml list
//! ```

use std::{collections::HashMap, io::Write as _, path::PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use watchlog_core::{
  anime::{Anime, NewAnime, WatchStatus},
  listing::{ListItem, group_by_series},
  query::{AnimeQuery, Scope, SortDirection, SortField},
  store::{AnimeRepo, EventRepo, SeriesRepo, TextRepo, VersionRepo},
  version::LaunchKind,
};
use watchlog_store_sqlite::SqliteStore;
use watchlog_update::{
  PackageDownloader, PackageInstaller, UpdateFlow, Urgency, VersionClient,
  VersionDescriptor, verify_package,
};

/// Version identity of this build; compared against the remote descriptor.
const APP_VERSION_CODE: i64 = 10000;
const APP_VERSION_NAME: &str = "1.0.0";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "watchlog", about = "Personal anime tracker")]
struct Args {
  /// Path to a TOML config file (db, update_url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Path of the SQLite database (default: watchlog.db3).
  #[arg(long, env = "WATCHLOG_DB")]
  db: Option<PathBuf>,

  /// Base URL of the version-check service.
  #[arg(long, env = "WATCHLOG_UPDATE_URL")]
  update_url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Add an anime to the tracker.
  Add {
    title:       String,
    /// plan | watching | completed | dropped (default: plan).
    #[arg(long)]
    status:      Option<WatchStatus>,
    #[arg(long)]
    description: Option<String>,
    /// Comma-separated tag list.
    #[arg(long, value_delimiter = ',')]
    tags:        Vec<String>,
    /// Attach to an existing series.
    #[arg(long)]
    series:      Option<Uuid>,
  },

  /// List tracked anime.
  List {
    /// Restrict to one status bucket.
    #[arg(long)]
    status:    Option<WatchStatus>,
    /// Case-insensitive title substring.
    #[arg(long)]
    keyword:   Option<String>,
    /// created | title (default: created).
    #[arg(long, default_value = "created")]
    sort:      String,
    /// asc | desc (default: desc).
    #[arg(long, default_value = "desc")]
    direction: String,
    #[arg(long)]
    limit:     Option<u32>,
    #[arg(long)]
    offset:    Option<u32>,
    /// Collapse anime sharing a series into one group row.
    #[arg(long)]
    folded:    bool,
  },

  /// Change the watch status (appends a timeline event).
  Status { id: Uuid, status: WatchStatus },

  /// Record the last watched episode.
  Episode { id: Uuid, episode: i64 },

  /// Show the status-change timeline of an anime.
  Timeline { id: Uuid },

  /// Move an anime to the trash (soft delete).
  Delete { id: Uuid },

  /// Bring an anime back from the trash.
  Restore { id: Uuid },

  /// Free-text notes attached to an anime.
  #[command(subcommand)]
  Note(NoteCommand),

  /// Series management.
  #[command(subcommand)]
  Series(SeriesCommand),

  /// Query the version-check service and optionally run the
  /// download/verify pipeline.
  CheckUpdate {
    /// Release channel to check against.
    #[arg(long, default_value = "stable")]
    channel:          String,
    /// Download and verify the package when an update is available.
    #[arg(long)]
    download:         bool,
    /// Where to write the downloaded package (default: update.apk).
    #[arg(long)]
    out:              Option<PathBuf>,
    /// Persist whether optional updates are surfaced at all.
    #[arg(long, value_name = "BOOL")]
    optional_prompts: Option<bool>,
  },

  /// Verify a downloaded package against an expected size and checksum.
  VerifyPackage {
    path:   PathBuf,
    #[arg(long)]
    size:   u64,
    #[arg(long)]
    sha256: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
  /// Attach a note to an anime.
  Add { anime_id: Uuid, content: String },
  /// Overwrite a note's content. The note keeps only the edit time.
  Edit { id: Uuid, content: String },
  /// List notes, newest first.
  List {
    /// Restrict to one anime.
    #[arg(long)]
    anime: Option<Uuid>,
  },
  Delete { id: Uuid },
  Restore { id: Uuid },
}

#[derive(Subcommand, Debug)]
enum SeriesCommand {
  Add { name: String },
  /// All active series, sorted by name.
  List,
  Rename { id: Uuid, name: String },
  Delete { id: Uuid },
  Restore { id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  db:         String,
  #[serde(default)]
  update_url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let db_path = args
    .db
    .or_else(|| (!file_cfg.db.is_empty()).then(|| PathBuf::from(&file_cfg.db)))
    .unwrap_or_else(|| PathBuf::from("watchlog.db3"));
  let update_url = args.update_url.or_else(|| {
    (!file_cfg.update_url.is_empty()).then(|| file_cfg.update_url.clone())
  });

  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("opening store {}", db_path.display()))?;

  // Roll the launch singleton on every run.
  let launch = store
    .init_on_launch(APP_VERSION_CODE, APP_VERSION_NAME, Utc::now())
    .await
    .context("recording launch")?;
  if let LaunchKind::Upgraded { from } = launch {
    println!("updated: {from} -> {APP_VERSION_CODE} ({APP_VERSION_NAME})");
  }

  match args.command {
    Command::Add { title, status, description, tags, series } => {
      let input = NewAnime {
        title,
        description,
        status: status.unwrap_or(WatchStatus::Plan),
        tags,
        series_id: series,
        created_at: None,
      };
      let anime = store.create_anime(input).await.context("adding anime")?;
      println!("added {} [{}]", anime.id, anime.title);
    },

    Command::List {
      status,
      keyword,
      sort,
      direction,
      limit,
      offset,
      folded,
    } => {
      let query = AnimeQuery {
        scope: if status.is_some() { Scope::ByStatus } else { Scope::All },
        status,
        sort_field: parse_sort(&sort)?,
        sort_direction: parse_direction(&direction)?,
        keyword,
      };
      let anime = store
        .list_anime(&query, limit, offset)
        .await
        .context("listing anime")?;

      let names: HashMap<Uuid, String> = store
        .list_series_by_name(SortDirection::Asc)
        .await
        .context("loading series names")?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

      for item in group_by_series(anime, folded, &names) {
        match item {
          ListItem::Anime(a) => print_anime(&a),
          ListItem::SeriesGroup { series_id, name, count, .. } => {
            println!("{series_id}  {name}  ({count} anime)");
          },
        }
      }
    },

    Command::Status { id, status } => {
      if store.change_status(id, status, None).await.context("changing status")? {
        println!("{id} -> {status}");
      } else {
        bail!("no active anime with id {id}");
      }
    },

    Command::Episode { id, episode } => {
      if store.change_episode(id, episode).await.context("setting episode")? {
        println!("{id} episode {episode}");
      } else {
        bail!("no active anime with id {id}");
      }
    },

    Command::Timeline { id } => {
      for event in store.timeline_asc(id).await.context("loading timeline")? {
        println!("{}  {}", event.changed_at.to_rfc3339(), event.status);
      }
    },

    Command::Delete { id } => {
      store.soft_delete_anime(id, None).await.context("deleting anime")?;
      println!("{id} moved to trash");
    },

    Command::Restore { id } => {
      store.restore_anime(id).await.context("restoring anime")?;
      println!("{id} restored");
    },

    Command::Note(cmd) => run_note(&store, cmd).await?,
    Command::Series(cmd) => run_series(&store, cmd).await?,

    Command::CheckUpdate { channel, download, out, optional_prompts } => {
      let url = update_url
        .context("no update URL configured (--update-url or config file)")?;
      run_check_update(&store, &url, &channel, download, out, optional_prompts)
        .await?;
    },

    Command::VerifyPackage { path, size, sha256 } => {
      match verify_package(&path, size, sha256.as_deref()) {
        Ok(()) => println!("package ok"),
        Err(err) => bail!("verification failed: {err}"),
      }
    },
  }

  Ok(())
}

// ─── Notes / series ───────────────────────────────────────────────────────────

async fn run_note(store: &SqliteStore, cmd: NoteCommand) -> Result<()> {
  match cmd {
    NoteCommand::Add { anime_id, content } => {
      let entry = store
        .add_text(anime_id, &content, None)
        .await
        .context("adding note")?;
      println!("note {} added", entry.id);
    },
    NoteCommand::Edit { id, content } => {
      if store.edit_text(id, &content, None).await.context("editing note")? {
        println!("note {id} updated");
      } else {
        bail!("no note with id {id}");
      }
    },
    NoteCommand::List { anime } => {
      let entries = match anime {
        Some(anime_id) => {
          store.texts_for_anime(anime_id, SortDirection::Desc).await
        },
        None => store.all_texts(SortDirection::Desc).await,
      }
      .context("listing notes")?;
      for entry in entries {
        let marker = if entry.edited { " (edited)" } else { "" };
        println!(
          "{}  {}{}  {}",
          entry.id,
          entry.time_at.to_rfc3339(),
          marker,
          entry.content
        );
      }
    },
    NoteCommand::Delete { id } => {
      store.soft_delete_text(id, None).await.context("deleting note")?;
      println!("note {id} moved to trash");
    },
    NoteCommand::Restore { id } => {
      store.restore_text(id).await.context("restoring note")?;
      println!("note {id} restored");
    },
  }
  Ok(())
}

async fn run_series(store: &SqliteStore, cmd: SeriesCommand) -> Result<()> {
  match cmd {
    SeriesCommand::Add { name } => {
      let series = store.create_series(&name).await.context("adding series")?;
      println!("series {} [{}]", series.id, series.name);
    },
    SeriesCommand::List => {
      for series in store
        .list_series_by_name(SortDirection::Asc)
        .await
        .context("listing series")?
      {
        println!("{}  {}", series.id, series.name);
      }
    },
    SeriesCommand::Rename { id, name } => {
      if store.rename_series(id, &name).await.context("renaming series")? {
        println!("series {id} renamed to {name}");
      } else {
        bail!("no series with id {id}");
      }
    },
    SeriesCommand::Delete { id } => {
      store.soft_delete_series(id, None).await.context("deleting series")?;
      println!("series {id} moved to trash");
    },
    SeriesCommand::Restore { id } => {
      store.restore_series(id).await.context("restoring series")?;
      println!("series {id} restored");
    },
  }
  Ok(())
}

// ─── Update check ─────────────────────────────────────────────────────────────

/// Allocates download ids; the actual fetch happens in
/// [`run_check_update`], which then reports completion back to the flow.
struct QueueDownloader {
  next_id: u64,
}

impl PackageDownloader for QueueDownloader {
  fn enqueue(
    &mut self,
    _descriptor: &VersionDescriptor,
  ) -> Result<u64, String> {
    self.next_id += 1;
    Ok(self.next_id)
  }
}

/// There is no OS installer to hand off to from the command line; the
/// flow stops at `Verified` and the user installs the package themselves.
struct ManualInstaller;

impl PackageInstaller for ManualInstaller {
  fn can_install(&self) -> bool { false }

  fn request_permission(&mut self) {}

  fn launch(&mut self, _package: &std::path::Path) -> Result<(), String> {
    Err("manual installation only".into())
  }
}

async fn run_check_update(
  store: &SqliteStore,
  url: &str,
  channel: &str,
  download: bool,
  out: Option<PathBuf>,
  optional_prompts: Option<bool>,
) -> Result<()> {
  if let Some(show) = optional_prompts {
    store
      .set_show_optional_update(show)
      .await
      .context("persisting optional-update preference")?;
  }
  let optional_enabled = store
    .app_version()
    .await
    .context("reading version row")?
    .map(|v| v.show_optional_update)
    .unwrap_or(true);

  let mut flow =
    UpdateFlow::new(QueueDownloader { next_id: 0 }, ManualInstaller);
  flow.check_started()?;

  let client = VersionClient::new(url)?;
  let descriptor =
    match client.check("cli", channel, APP_VERSION_CODE).await {
      Ok(d) => d,
      Err(err) => {
        flow.check_failed(err.to_string())?;
        println!("version check failed ({err}); no update this session");
        return Ok(());
      },
    };

  let urgency =
    flow.check_succeeded(descriptor.clone(), APP_VERSION_CODE, optional_enabled)?;
  match urgency {
    Urgency::UpToDate => {
      println!("up to date ({APP_VERSION_NAME})");
      return Ok(());
    },
    Urgency::Optional if !optional_enabled => {
      println!(
        "update {} available, but optional prompts are disabled",
        descriptor.latest_version_name
      );
      return Ok(());
    },
    Urgency::Optional => {
      println!("update available: {}", descriptor.latest_version_name);
    },
    Urgency::Forced => {
      let message = descriptor
        .force_update_message
        .as_deref()
        .unwrap_or("this version is no longer supported");
      println!(
        "REQUIRED update: {} — {message}",
        descriptor.latest_version_name
      );
    },
  }
  if let Some(notes) = descriptor.release_notes.as_deref() {
    println!("{notes}");
  }

  if !download {
    return Ok(());
  }

  let out = out.unwrap_or_else(|| PathBuf::from("update.apk"));
  flow.start_download()?;
  match fetch_package(&descriptor.download_url, &out).await {
    Ok(()) => flow.download_completed(out.clone())?,
    Err(err) => {
      flow.download_failed(err.to_string())?;
      bail!("download failed: {err}");
    },
  }

  match flow.verify() {
    Ok(()) => println!("downloaded and verified: {}", out.display()),
    Err(err) => bail!("downloaded package failed verification: {err}"),
  }
  Ok(())
}

/// Fetch the package body to `out`, chunk by chunk — packages are large
/// and never held in memory whole. No timeout: package downloads are
/// expected to be long, unlike the bounded version check.
async fn fetch_package(url: &str, out: &std::path::Path) -> Result<()> {
  let mut resp = reqwest::get(url).await.context("requesting package")?;
  if !resp.status().is_success() {
    bail!("package endpoint returned {}", resp.status());
  }
  let mut file = std::fs::File::create(out)
    .with_context(|| format!("creating {}", out.display()))?;
  while let Some(chunk) =
    resp.chunk().await.context("reading package body")?
  {
    file
      .write_all(&chunk)
      .with_context(|| format!("writing {}", out.display()))?;
  }
  Ok(())
}

// ─── Output helpers ───────────────────────────────────────────────────────────

fn print_anime(a: &Anime) {
  let tags = if a.tags.is_empty() {
    String::new()
  } else {
    format!("  [{}]", a.tags.join(", "))
  };
  println!(
    "{}  {:9}  ep {:3}  {}{}",
    a.id, a.status, a.episode, a.title, tags
  );
}

fn parse_sort(s: &str) -> Result<SortField> {
  match s {
    "created" => Ok(SortField::CreatedAt),
    "title" => Ok(SortField::Title),
    other => bail!("unknown sort field `{other}` (expected created|title)"),
  }
}

fn parse_direction(s: &str) -> Result<SortDirection> {
  match s {
    "asc" => Ok(SortDirection::Asc),
    "desc" => Ok(SortDirection::Desc),
    other => bail!("unknown direction `{other}` (expected asc|desc)"),
  }
}
