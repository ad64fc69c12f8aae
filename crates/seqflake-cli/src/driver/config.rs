use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use seqflake::NodeIdentity;

/// Runtime configuration for the `seqflake` driver.
///
/// All values are parsed from CLI arguments or environment variables. The
/// defaults reproduce the classic smoke test: 100 threads sharing one
/// generator, 100 IDs each.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "seqflake",
    version,
    about = "Generate Snowflake-style IDs from many threads and check them for duplicates"
)]
pub struct CliArgs {
    /// Deployment group ("datacenter") id, 0..=31.
    ///
    /// Must be given together with `--node-id`. When both are omitted the
    /// identity is derived from this host's network interfaces and process id.
    ///
    /// Environment variable: `GROUP_ID`
    #[arg(long, env = "GROUP_ID")]
    pub group_id: Option<u64>,

    /// Node id within the group, 0..=31.
    ///
    /// Environment variable: `NODE_ID`
    #[arg(long, env = "NODE_ID")]
    pub node_id: Option<u64>,

    /// Number of threads sharing the generator.
    ///
    /// Environment variable: `NUM_THREADS`
    #[arg(long, env = "NUM_THREADS", default_value_t = 100)]
    pub threads: usize,

    /// Number of IDs each thread generates.
    ///
    /// Environment variable: `IDS_PER_THREAD`
    #[arg(long, env = "IDS_PER_THREAD", default_value_t = 100)]
    pub ids_per_thread: usize,

    /// How often the cached clock refreshes, in milliseconds.
    ///
    /// Environment variable: `CLOCK_PERIOD_MS`
    #[arg(long, env = "CLOCK_PERIOD_MS", default_value_t = 1)]
    pub clock_period_ms: u64,

    /// Print every generated ID to stdout.
    #[arg(short, long, default_value_t = false)]
    pub print: bool,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// `None` means derive from local metadata.
    pub identity: Option<NodeIdentity>,
    pub threads: usize,
    pub ids_per_thread: usize,
    pub total_ids: usize,
    pub clock_period: Duration,
    pub print: bool,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let identity = match (args.group_id, args.node_id) {
            (Some(group_id), Some(node_id)) => Some(NodeIdentity::new(group_id, node_id)?),
            (None, None) => None,
            _ => bail!("GROUP_ID and NODE_ID must be set together"),
        };

        if args.threads == 0 {
            bail!("NUM_THREADS must be greater than 0");
        }

        if args.clock_period_ms == 0 {
            bail!("CLOCK_PERIOD_MS must be greater than 0");
        }

        let total_ids = args
            .threads
            .checked_mul(args.ids_per_thread)
            .ok_or_else(|| anyhow::anyhow!("Overflow in total id computation"))?;

        Ok(Self {
            identity,
            threads: args.threads,
            ids_per_thread: args.ids_per_thread,
            total_ids,
            clock_period: Duration::from_millis(args.clock_period_ms),
            print: args.print,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<RunConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("seqflake").chain(args.iter().copied()))?;
        RunConfig::try_from(args)
    }

    #[test]
    fn defaults_derive_identity() {
        let config = parse(&[]).unwrap();
        assert!(config.identity.is_none());
        assert_eq!(config.threads, 100);
        assert_eq!(config.ids_per_thread, 100);
        assert_eq!(config.total_ids, 10_000);
        assert_eq!(config.clock_period, Duration::from_millis(1));
        assert!(!config.print);
    }

    #[test]
    fn explicit_identity() {
        let config = parse(&["--group-id", "3", "--node-id", "7", "--print"]).unwrap();
        assert_eq!(config.identity, Some(NodeIdentity::new(3, 7).unwrap()));
        assert!(config.print);
    }

    #[test]
    fn half_an_identity_is_rejected() {
        assert!(parse(&["--group-id", "3"]).is_err());
        assert!(parse(&["--node-id", "3"]).is_err());
    }

    #[test]
    fn out_of_range_identity_is_rejected() {
        let err = parse(&["--group-id", "32", "--node-id", "0"]).unwrap_err();
        assert!(err.to_string().contains("invalid node identity"));
    }

    #[test]
    fn zero_threads_or_period_is_rejected() {
        assert!(parse(&["--threads", "0"]).is_err());
        assert!(parse(&["--clock-period-ms", "0"]).is_err());
    }
}
