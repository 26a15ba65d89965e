use asana_sync::asana::AsanaClient;
use asana_sync::cache::{CacheStore, Snapshot};
use asana_sync::config::{self, Config};
use asana_sync::daemon::Daemon;
use asana_sync::logging;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "asana-sync")]
#[command(about = "Keep a local cache of Asana project tasks")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/asana-sync/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Override the cache directory
  #[arg(long, global = true)]
  cache_dir: Option<PathBuf>,

  /// Also write logs to a daily rolling file in this directory
  #[arg(long, global = true)]
  log_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the sync daemon until interrupted
  Sync {
    /// Comma-separated project ids (default: `projects` from the config file)
    #[arg(short, long)]
    projects: Option<String>,

    /// Seconds between sync passes
    #[arg(short, long)]
    interval: Option<u64>,

    /// Asana API token (or set ASANA_SYNC_TOKEN / ASANA_TOKEN)
    #[arg(long)]
    token: Option<String>,
  },
  /// Inspect or clear cached snapshots
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Print the cached tasks of a project
  Show {
    project: String,
    /// Print the raw snapshot as JSON
    #[arg(long)]
    json: bool,
  },
  /// Delete the cached snapshot of a project
  Clear { project: String },
  /// List cached projects
  List,
  /// Print the total size of the cache directory
  Size,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.log_dir.as_deref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  // Override cache dir if specified on command line
  let config = if let Some(cache_dir) = args.cache_dir {
    Config {
      cache_dir: Some(cache_dir),
      ..config
    }
  } else {
    config
  };

  let store = config.cache_store()?;

  match args.command {
    Command::Sync {
      projects,
      interval,
      token,
    } => run_sync(&config, store, projects, interval, token).await,
    Command::Cache { action } => run_cache(&store, action),
  }
}

async fn run_sync(
  config: &Config,
  store: CacheStore,
  projects: Option<String>,
  interval: Option<u64>,
  token: Option<String>,
) -> Result<()> {
  let project_ids = match projects {
    Some(raw) => config::parse_project_list(&raw),
    None => config.projects.clone(),
  };
  if project_ids.is_empty() {
    return Err(eyre!(
      "No projects to sync. Pass --projects or list them under `projects` in the config file."
    ));
  }

  let interval = match interval {
    Some(0) => return Err(eyre!("--interval must be greater than zero")),
    Some(secs) => Duration::from_secs(secs),
    None => config.sync.interval(),
  };

  let token = Config::get_api_token(token.as_deref())?;
  let client = AsanaClient::with_base_url(token, config.asana.base_url.clone());
  let daemon = Daemon::new(client, store, project_ids).with_interval(interval);

  // Handle Ctrl+C gracefully
  let stop = daemon.stop_handle();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("Received interrupt signal");
      stop.stop();
    }
  });

  daemon.start().await;
  Ok(())
}

fn run_cache(store: &CacheStore, action: CacheAction) -> Result<()> {
  match action {
    CacheAction::Show { project, json } => {
      let snapshot = store.read_snapshot(&project)?;
      if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
      } else {
        print_snapshot(&snapshot);
      }
    }
    CacheAction::Clear { project } => match store.clear(&project) {
      Ok(()) => println!("Cleared cache for project {}", project),
      Err(e) if e.is_not_found() => println!("No cache for project {}", project),
      Err(e) => return Err(e.into()),
    },
    CacheAction::List => {
      let snapshots = store.list()?;
      if snapshots.is_empty() {
        println!("No cached projects in {}", store.dir().display());
      }
      for meta in snapshots {
        println!(
          "{:<24} {:>6} tasks  synced {}",
          meta.project_id,
          meta.task_count,
          meta.synced_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
      }
    }
    CacheAction::Size => {
      println!("{} bytes in {}", store.total_size()?, store.dir().display());
    }
  }
  Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
  let meta = &snapshot.metadata;
  println!(
    "Project {}: {} tasks, synced {} ({} min ago)",
    meta.project_id,
    meta.task_count,
    meta.synced_at.format("%Y-%m-%d %H:%M:%S UTC"),
    meta.age().num_minutes()
  );

  for task in &snapshot.tasks {
    let mark = if task.completed { "x" } else { " " };
    let mut line = format!("[{}] {} ({})", mark, task.name, task.gid);
    if let Some(due) = task.due_date() {
      line.push_str(&format!("  due {}", due));
    }
    if let Some(assignee) = &task.assignee {
      line.push_str(&format!("  @{}", assignee.name));
    }
    if let Some(priority) = &task.priority {
      line.push_str(&format!("  !{}", priority));
    }
    if !task.tags.is_empty() {
      let tags: Vec<_> = task.tags.iter().map(|t| format!("#{}", t.name)).collect();
      line.push_str(&format!("  {}", tags.join(" ")));
    }
    println!("{}", line);
  }
}
