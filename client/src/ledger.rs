//! The read side of the ledger: account lookups, program account scans, and signature statuses.
//!
//! [`Ledger`] is the seam between the client and the network. [`RpcLedger`] implements it over
//! the nonblocking RPC client; tests use [`crate::e2e_helpers::InMemoryLedger`].

use std::rc::Rc;

use solana_account::Account;
use solana_address::Address;
use solana_client::{
    client_error::ClientError,
    nonblocking::rpc_client::RpcClient,
    rpc_config::{
        RpcAccountInfoConfig,
        RpcProgramAccountsConfig,
    },
    rpc_filter::{
        Memcmp,
        RpcFilterType,
    },
};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_transaction_error::TransactionError;

use crate::error::{
    JournalError,
    JournalResult,
};

/// The outcome of a transaction once it reached the requested commitment.
pub type TransactionOutcome = Result<(), TransactionError>;

#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// Fetches the account at `address`, or `None` if there isn't one.
    async fn get_account(&self, address: &Address) -> JournalResult<Option<Account>>;

    /// Fetches every account owned by `program_id` whose data starts with `discriminator`.
    async fn get_program_accounts(
        &self,
        program_id: &Address,
        discriminator: &[u8],
    ) -> JournalResult<Vec<(Address, Account)>>;

    /// Returns the outcome of the transaction if it has reached the ledger's configured
    /// commitment, or `None` if it hasn't (yet).
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> JournalResult<Option<TransactionOutcome>>;
}

/// A summary of the account at a program's own address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramAccountInfo {
    pub lamports: u64,
    pub owner: Address,
    pub executable: bool,
    pub data_len: usize,
}

impl From<&Account> for ProgramAccountInfo {
    fn from(account: &Account) -> Self {
        Self {
            lamports: account.lamports,
            owner: account.owner,
            executable: account.executable,
            data_len: account.data.len(),
        }
    }
}

pub(crate) fn network_error(error: ClientError) -> JournalError {
    JournalError::NetworkUnavailable(error.to_string())
}

/// [`Ledger`] over a nonblocking [`RpcClient`].
#[derive(Clone)]
pub struct RpcLedger {
    pub client: Rc<RpcClient>,
    pub commitment: CommitmentConfig,
}

impl Default for RpcLedger {
    fn default() -> Self {
        RpcLedger::new_from_url("http://localhost:8899", CommitmentConfig::confirmed())
    }
}

impl RpcLedger {
    pub fn new(client: Rc<RpcClient>, commitment: CommitmentConfig) -> Self {
        Self { client, commitment }
    }

    pub fn new_from_url(url: &str, commitment: CommitmentConfig) -> Self {
        RpcLedger {
            client: Rc::new(RpcClient::new_with_commitment(url.into(), commitment)),
            commitment,
        }
    }
}

impl Ledger for RpcLedger {
    async fn get_account(&self, address: &Address) -> JournalResult<Option<Account>> {
        Ok(self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(network_error)?
            .value)
    }

    async fn get_program_accounts(
        &self,
        program_id: &Address,
        discriminator: &[u8],
    ) -> JournalResult<Vec<(Address, Account)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
                0,
                discriminator.to_vec(),
            ))]),
            account_config: RpcAccountInfoConfig {
                commitment: Some(self.commitment),
                encoding: Some(solana_client::rpc_config::UiAccountEncoding::Base64),
                data_slice: None,
                min_context_slot: None,
            },
            with_context: Some(false),
            sort_results: Some(true),
        };

        self.client
            .get_program_ui_accounts_with_config(program_id, config)
            .await
            .map_err(network_error)?
            .into_iter()
            .map(|(address, ui_account)| {
                ui_account
                    .decode::<Account>()
                    .map(|account| (address, account))
                    .ok_or_else(|| JournalError::DecodeError {
                        address,
                        reason: "RPC returned account data in an unexpected encoding".into(),
                    })
            })
            .collect()
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> JournalResult<Option<TransactionOutcome>> {
        let statuses = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(network_error)?
            .value;

        Ok(statuses
            .into_iter()
            .next()
            .flatten()
            .filter(|status| status.satisfies_commitment(self.commitment))
            .map(|status| status.status))
    }
}
