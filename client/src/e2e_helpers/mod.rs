use std::time::Duration;

use journal_interface::Cluster;
use solana_address::Address;

use crate::{
    config::{
        ConfirmationPolicy,
        JournalConfig,
    },
    program::JournalProgram,
};

mod in_memory;

pub use in_memory::{
    CallCounts,
    InMemoryLedger,
    InMemorySubmitter,
    ENTRY_LAMPORTS,
};

/// Convenience harness for end-to-end tests and examples.
///
/// Upon instantiation it:
/// - Deploys the journal program on a fresh [`InMemoryLedger`].
/// - Creates one [`JournalProgram`] per user, each signing as that user and sharing the ledger.
/// - Shortens the confirmation policy so that timeouts don't slow tests down.
pub struct E2e {
    pub ledger: InMemoryLedger,
    pub users: Vec<User>,
}

/// A user of an [`E2e`] harness and the program façade that signs as them.
pub struct User {
    pub address: Address,
    pub submitter: InMemorySubmitter,
    pub program: JournalProgram<InMemoryLedger, InMemorySubmitter>,
}

impl E2e {
    pub fn new_users(count: usize) -> Self {
        Self::with_ledger(InMemoryLedger::new(Cluster::Localnet.program_id()), count)
    }

    pub fn with_ledger(ledger: InMemoryLedger, count: usize) -> Self {
        let users = (0..count)
            .map(|_| {
                let address = Address::new_unique();
                let submitter = ledger.submitter(address);
                let program =
                    JournalProgram::new(e2e_config(), ledger.clone(), submitter.clone());
                User {
                    address,
                    submitter,
                    program,
                }
            })
            .collect();

        Self { ledger, users }
    }

    pub fn user(&self, index: usize) -> &User {
        &self.users[index]
    }
}

/// A localnet config whose confirmation waits give up after a second.
pub fn e2e_config() -> JournalConfig {
    JournalConfig::for_cluster(Cluster::Localnet).with_confirmation(
        ConfirmationPolicy::default()
            .with_timeout(Duration::from_secs(1))
            .with_poll_interval(Duration::from_millis(10)),
    )
}
