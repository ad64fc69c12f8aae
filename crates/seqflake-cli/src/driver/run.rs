use std::{
    collections::HashSet,
    io::{self, Write},
    thread::scope,
    time::{Duration, Instant},
};

use anyhow::Context;
use seqflake::{CachedClock, NodeIdentity, SequenceGenerator, SequenceId};
use tracing::info;

use crate::driver::config::RunConfig;

/// Outcome of one driver run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub identity: NodeIdentity,
    pub total: usize,
    pub unique: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn ids_per_sec(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.total as f64 / secs) as u64
        } else {
            0
        }
    }
}

/// Shares one generator between `config.threads` threads and collects every
/// ID they produce.
pub fn run(config: &RunConfig) -> anyhow::Result<RunReport> {
    let clock = CachedClock::with_period(config.clock_period)?;
    let identity = config.identity.unwrap_or_else(NodeIdentity::from_system);
    let generator = SequenceGenerator::with_identity(identity, clock);
    info!(
        group_id = identity.group_id(),
        node_id = identity.node_id(),
        epoch = generator.epoch(),
        "generator ready"
    );

    let start = Instant::now();
    let batches = scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|_| {
                s.spawn(|| {
                    (0..config.ids_per_thread)
                        .map(|_| generator.try_next_id())
                        .collect::<Result<Vec<SequenceId>, _>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(batch) => batch.context("id generation failed"),
                Err(_) => Err(anyhow::anyhow!("generator thread panicked")),
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;
    let elapsed = start.elapsed();

    if config.print {
        let mut out = io::stdout().lock();
        for id in batches.iter().flatten() {
            writeln!(out, "{id}")?;
        }
    }

    let unique = batches.iter().flatten().collect::<HashSet<_>>().len();

    Ok(RunReport {
        identity,
        total: config.total_ids,
        unique,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_is_unique() {
        let config = RunConfig {
            identity: Some(NodeIdentity::new(2, 9).unwrap()),
            threads: 8,
            ids_per_thread: 500,
            total_ids: 4_000,
            clock_period: Duration::from_millis(1),
            print: false,
        };

        let report = run(&config).unwrap();
        assert_eq!(report.total, 4_000);
        assert_eq!(report.unique, 4_000);
        assert_eq!(report.identity, NodeIdentity::new(2, 9).unwrap());
    }

    #[test]
    fn derives_identity_when_absent() {
        let config = RunConfig {
            identity: None,
            threads: 2,
            ids_per_thread: 10,
            total_ids: 20,
            clock_period: Duration::from_millis(2),
            print: false,
        };

        let report = run(&config).unwrap();
        assert_eq!(report.unique, 20);
        assert!(report.identity.group_id() <= NodeIdentity::MAX_GROUP_ID);
    }
}
