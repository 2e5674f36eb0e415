//! Static cluster table for the `journal` program.

use solana_address::Address;
use strum_macros::{
    Display,
    EnumIter,
    EnumString,
};

/// The program id the `journal` program is deployed at on mainnet and on local validators.
pub const ID: Address = solana_sdk::pubkey!("JournaMASi45ub7Qe4ZE36UT5G6cU4ud8Fhhe4deS4F");

/// The program id used on the public pre-production clusters.
pub const DEVNET_ID: Address = solana_sdk::pubkey!("5PtW9j1Quyebse2VCbjH7FUNkcXnhvNceZMs7ye1h5sw");

/// A named deployment environment of the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Cluster {
    #[strum(to_string = "mainnet-beta", serialize = "mainnet")]
    MainnetBeta,
    #[strum(serialize = "devnet")]
    Devnet,
    #[strum(serialize = "testnet")]
    Testnet,
    #[default]
    #[strum(to_string = "localnet", serialize = "localhost")]
    Localnet,
}

impl Cluster {
    /// Returns the address the `journal` program is deployed at on this cluster.
    pub const fn program_id(&self) -> Address {
        match self {
            Cluster::Devnet | Cluster::Testnet => DEVNET_ID,
            Cluster::MainnetBeta | Cluster::Localnet => ID,
        }
    }

    /// The public RPC endpoint for the cluster.
    pub const fn default_rpc_url(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Localnet => "http://localhost:8899",
        }
    }
}
