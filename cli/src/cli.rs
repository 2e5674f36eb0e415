use std::{
    path::PathBuf,
    time::Duration,
};

use clap::{
    command,
    Parser,
    Subcommand,
};
use journal_client::config::{
    ConfirmationPolicy,
    JournalConfig,
};
use journal_interface::Cluster;
use solana_address::Address;

#[derive(Parser)]
#[command(name = "journal")]
pub struct CliArgs {
    /// The cluster to talk to: `mainnet-beta`, `devnet`, `testnet` or `localnet`.
    #[arg(short = 'c', long, default_value_t = Cluster::Localnet)]
    pub cluster: Cluster,

    /// Overrides the cluster's default RPC endpoint.
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Overrides the cluster's journal program id.
    #[arg(long)]
    pub program_id: Option<Address>,

    /// Path to a JSON keypair file. Defaults to the `JOURNAL_KEYPAIR` environment variable.
    #[arg(short = 'k', long)]
    pub keypair: Option<PathBuf>,

    /// How long to wait for a transaction to confirm.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Don't log submissions, confirmations and cache activity.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Checks whether the journal program is deployed on the cluster.
    Program,
    /// Lists every journal entry.
    List,
    /// Shows one journal entry.
    Show {
        title: String,
        /// The entry's owner. Defaults to the signer.
        #[arg(short = 'o', long)]
        owner: Option<Address>,
    },
    /// Creates a journal entry owned by the signer.
    Create { title: String, message: String },
    /// Replaces the message of one of the signer's journal entries.
    Update { title: String, message: String },
    /// Deletes one of the signer's journal entries.
    Delete { title: String },
}

impl Command {
    /// Whether the command submits a transaction and therefore needs a real signer.
    pub fn needs_signer(&self) -> bool {
        matches!(
            self,
            Command::Create { .. } | Command::Update { .. } | Command::Delete { .. }
        )
    }
}

impl CliArgs {
    pub fn journal_config(&self) -> JournalConfig {
        let mut config = JournalConfig::for_cluster(self.cluster)
            .with_confirmation(
                ConfirmationPolicy::default().with_timeout(Duration::from_secs(self.timeout_secs)),
            )
            .with_debug_logs(!self.quiet);
        if let Some(url) = &self.url {
            config = config.with_rpc_url(url.as_str());
        }
        if let Some(program_id) = self.program_id {
            config = config.with_program_id(program_id);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_the_cluster_table() {
        let program_id = Address::new_unique();
        let args = CliArgs::parse_from([
            "journal",
            "--cluster",
            "devnet",
            "--url",
            "http://127.0.0.1:8899",
            "--program-id",
            &program_id.to_string(),
            "--timeout-secs",
            "5",
            "--quiet",
            "create",
            "Trip",
            "Paris was great",
        ]);

        let config = args.journal_config();
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.program_id, program_id);
        assert_eq!(config.confirmation.timeout, Duration::from_secs(5));
        assert!(!config.debug_logs);
        assert!(args.command.needs_signer());
    }

    #[test]
    fn defaults_to_localnet() {
        let args = CliArgs::parse_from(["journal", "list"]);
        let config = args.journal_config();
        assert_eq!(config.cluster, Cluster::Localnet);
        assert_eq!(config.program_id, Cluster::Localnet.program_id());
        assert!(config.debug_logs);
        assert!(!args.command.needs_signer());
    }
}
