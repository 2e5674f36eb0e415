//! Configuration passed into [`crate::program::JournalProgram`] at construction.

use std::time::Duration;

use journal_interface::Cluster;
use solana_address::Address;
use solana_commitment_config::CommitmentConfig;

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long and how often to poll for a transaction's confirmation, and at what commitment a
/// transaction counts as confirmed.
#[derive(Clone, Copy, Debug)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub commitment: CommitmentConfig,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        ConfirmationPolicy {
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

impl ConfirmationPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Which program on which cluster the client talks to.
///
/// The signer is passed separately to [`crate::program::JournalProgram::new`], since it's a
/// collaborator rather than plain data.
#[derive(Clone, Debug)]
pub struct JournalConfig {
    pub cluster: Cluster,
    pub program_id: Address,
    pub rpc_url: String,
    pub confirmation: ConfirmationPolicy,
    /// Print submissions, confirmations and cache invalidations to stdout.
    pub debug_logs: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig::for_cluster(Cluster::default())
    }
}

impl JournalConfig {
    /// The program id and RPC endpoint from the static cluster table.
    pub fn for_cluster(cluster: Cluster) -> Self {
        JournalConfig {
            cluster,
            program_id: cluster.program_id(),
            rpc_url: cluster.default_rpc_url().to_string(),
            confirmation: ConfirmationPolicy::default(),
            debug_logs: false,
        }
    }

    pub fn with_program_id(mut self, program_id: Address) -> Self {
        self.program_id = program_id;
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_debug_logs(mut self, debug_logs: bool) -> Self {
        self.debug_logs = debug_logs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_defaults_come_from_the_static_table() {
        let config = JournalConfig::for_cluster(Cluster::Devnet);
        assert_eq!(config.program_id, journal_interface::program::DEVNET_ID);
        assert_eq!(config.rpc_url, "https://api.devnet.solana.com");

        let overridden = config
            .with_rpc_url("http://127.0.0.1:8899")
            .with_program_id(journal_interface::program::ID);
        assert_eq!(overridden.cluster, Cluster::Devnet);
        assert_eq!(overridden.program_id, journal_interface::program::ID);
        assert_eq!(overridden.rpc_url, "http://127.0.0.1:8899");
    }
}
