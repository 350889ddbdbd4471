//! JSON-lines telemetry: one header per seed, one line per step, one
//! summary per episode.
//!
//! Seeds push records through a bounded channel to a single writer task, so
//! memory stays flat however long the run is. Lines from different seeds
//! interleave; each carries its `seed`.

use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tandem_agents::{EpisodeSummary, StepReport};
use tandem_core::{AgentKind, TandemConfig, Transition};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Run {
        run_id: Uuid,
        seed: u64,
        agent: AgentKind,
        started_at: String,
        config: TandemConfig,
    },
    Step {
        run_id: Uuid,
        seed: u64,
        episode: u64,
        transition: Transition,
        report: StepReport,
    },
    Episode {
        run_id: Uuid,
        seed: u64,
        #[serde(flatten)]
        summary: EpisodeSummary,
    },
}

/// Sending half of the telemetry stream. Cheap to clone, one per seed.
///
/// `push` blocks when the writer falls behind; call it from blocking
/// threads only.
#[derive(Debug, Clone)]
pub struct Sink {
    tx: Option<mpsc::Sender<String>>,
}

impl Sink {
    /// A sink that drops every record.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn push(&self, record: &Record) -> anyhow::Result<()> {
        if let Some(tx) = &self.tx {
            let line = serde_json::to_string(record)?;
            tx.blocking_send(line)
                .map_err(|_| anyhow::anyhow!("telemetry writer stopped"))?;
        }
        Ok(())
    }
}

/// Open `path` and start the writer task. The task finishes, returning the
/// number of lines written, once every clone of the returned sink is dropped.
pub fn spawn_writer(path: &Path) -> anyhow::Result<(Sink, JoinHandle<anyhow::Result<usize>>)> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create telemetry file: {}", path.display()))?;
    let (tx, mut rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let handle = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
        let mut out = BufWriter::new(file);
        let mut lines = 0;
        while let Some(line) = rx.blocking_recv() {
            writeln!(out, "{line}")?;
            lines += 1;
        }
        out.flush()?;
        Ok(lines)
    });

    Ok((Sink { tx: Some(tx) }, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_agents::{build_agent, run_episode_with};
    use tandem_env::SocialGridWorld;

    #[test]
    fn test_disabled_sink_accepts_records() {
        let sink = Sink::disabled();
        assert!(!sink.is_enabled());
        let record = Record::Run {
            run_id: Uuid::new_v4(),
            seed: 0,
            agent: AgentKind::Arousal,
            started_at: String::new(),
            config: TandemConfig::default(),
        };
        sink.push(&record).unwrap();
    }

    #[tokio::test]
    async fn test_records_stream_as_tagged_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        let (sink, writer) = spawn_writer(&path).unwrap();
        let run_id = Uuid::new_v4();

        let steps = tokio::task::spawn_blocking(move || {
            let cfg = TandemConfig::default();
            let mut world = SocialGridWorld::new(cfg.environment.clone(), 0).unwrap();
            let mut agent = build_agent(AgentKind::Arousal, &cfg, 0).unwrap();
            let summary = run_episode_with(&mut world, agent.as_mut(), |t, r| {
                let record = Record::Step {
                    run_id,
                    seed: 0,
                    episode: 0,
                    transition: t.clone(),
                    report: *r,
                };
                sink.push(&record).unwrap();
            })
            .unwrap();
            let record = Record::Episode {
                run_id,
                seed: 0,
                summary: summary.clone(),
            };
            sink.push(&record).unwrap();
            summary.steps
        })
        .await
        .unwrap();

        let written = writer.await.unwrap().unwrap();
        assert_eq!(written, steps as usize + 1);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), written);
        assert_eq!(lines[0]["type"], "step");
        assert!(lines[0]["report"]["arousal"]["weights"]["state"].is_number());
        let last = lines.last().unwrap();
        assert_eq!(last["type"], "episode");
        assert_eq!(last["steps"], steps);
        assert_eq!(last["agent"], "arousal");
    }
}
