use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tandem_agents::{build_agent, run_episode_with, EpisodeSummary};
use tandem_core::{AgentKind, TandemConfig};
use tandem_env::SocialGridWorld;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod telemetry;

use telemetry::{spawn_writer, Record, Sink};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "tandem.toml", env = "TANDEM_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train an agent for every seed
    Run {
        /// Agent variant: monolithic, fixed or arousal
        #[arg(short, long)]
        agent: Option<AgentKind>,

        /// Episodes per seed
        #[arg(short, long)]
        episodes: Option<u64>,

        /// Seeds to run; repeat for several
        #[arg(short, long = "seed")]
        seeds: Vec<u64>,

        /// Write JSON-lines telemetry here
        #[arg(short, long)]
        telemetry: Option<PathBuf>,
    },
    /// Print the grid at the start of an episode
    Render {
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Per-seed outcome handed back from the blocking task.
struct SeedRun {
    seed: u64,
    summaries: Vec<EpisodeSummary>,
}

/// Train one agent on one world. Runs on a blocking thread and shares
/// nothing with other seeds.
fn run_seed(config: TandemConfig, seed: u64, run_id: Uuid, sink: Sink) -> anyhow::Result<SeedRun> {
    let kind = config.training.agent;
    let mut world = SocialGridWorld::new(config.environment.clone(), seed)?;
    let mut agent = build_agent(kind, &config, seed)?;

    sink.push(&Record::Run {
        run_id,
        seed,
        agent: kind,
        started_at: chrono::Utc::now().to_rfc3339(),
        config: config.clone(),
    })?;

    let mut summaries = Vec::with_capacity(config.training.episodes as usize);
    for _ in 0..config.training.episodes {
        let episode = world.episodes_completed();
        let mut send_error = None;
        let summary = run_episode_with(&mut world, agent.as_mut(), |t, report| {
            if !sink.is_enabled() || send_error.is_some() {
                return;
            }
            let record = Record::Step {
                run_id,
                seed,
                episode,
                transition: t.clone(),
                report: *report,
            };
            if let Err(e) = sink.push(&record) {
                send_error = Some(e);
            }
        })?;
        if let Some(e) = send_error {
            return Err(e);
        }
        sink.push(&Record::Episode {
            run_id,
            seed,
            summary: summary.clone(),
        })?;

        tracing::debug!(seed, episode, reward = summary.total_reward, "Episode summary");
        summaries.push(summary);
    }

    Ok(SeedRun { seed, summaries })
}

fn report(run: &SeedRun) {
    let n = run.summaries.len();
    if n == 0 {
        return;
    }
    let window = n.min(50);
    let tail = &run.summaries[n - window..];
    let mean = tail.iter().map(|s| s.total_reward).sum::<f64>() / window as f64;
    let goals = tail.iter().filter(|s| s.reached_goal).count();
    info!(
        seed = run.seed,
        episodes = n,
        mean_return = mean,
        goal_rate = goals as f64 / window as f64,
        "Seed finished (last {} episodes)",
        window
    );
}

async fn run(
    mut config: TandemConfig,
    agent: Option<AgentKind>,
    episodes: Option<u64>,
    seeds: Vec<u64>,
    telemetry: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(kind) = agent {
        config.training.agent = kind;
    }
    if let Some(n) = episodes {
        config.training.episodes = n;
    }
    if !seeds.is_empty() {
        config.training.seeds = seeds;
    }
    config.validate()?;

    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        agent = config.training.agent.label(),
        episodes = config.training.episodes,
        seeds = ?config.training.seeds,
        "Starting run"
    );

    let (sink, writer) = match &telemetry {
        Some(path) => {
            let (sink, writer) = spawn_writer(path)?;
            (sink, Some(writer))
        }
        None => (Sink::disabled(), None),
    };

    let handles: Vec<_> = config
        .training
        .seeds
        .iter()
        .map(|&seed| {
            let config = config.clone();
            let sink = sink.clone();
            tokio::task::spawn_blocking(move || run_seed(config, seed, run_id, sink))
        })
        .collect();
    // Seeds hold the remaining senders; the writer stops when they finish.
    drop(sink);

    let mut runs = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await? {
            Ok(run) => {
                report(&run);
                runs.push(run);
            }
            Err(e) => error!("Seed failed: {:#}", e),
        }
    }

    if let (Some(writer), Some(path)) = (writer, &telemetry) {
        let lines = writer.await??;
        info!("Wrote {} telemetry lines to {}", lines, path.display());
    }

    let total = config.training.seeds.len();
    if runs.len() < total {
        anyhow::bail!("{} of {} seeds failed", total - runs.len(), total);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = TandemConfig::load_or_default(&args.config)?;

    match args.command {
        Command::Run {
            agent,
            episodes,
            seeds,
            telemetry,
        } => run(config, agent, episodes, seeds, telemetry).await,
        Command::Render { seed } => {
            let mut world = SocialGridWorld::new(config.environment, seed)?;
            world.reset(None);
            println!("{}", tandem_env::render(&world));
            Ok(())
        }
    }
}
