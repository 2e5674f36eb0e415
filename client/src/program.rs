//! The entry point for user interfaces: a collection view over every journal entry of the
//! program, and single-entry views for reading, updating, and deleting one entry.
//!
//! Callers never derive addresses or decode accounts themselves. Every read goes through the
//! [`QueryCache`], and every confirmed mutation invalidates the queries it affected before the
//! call returns.

use std::rc::Rc;

use solana_address::Address;
use tokio::sync::broadcast;

use crate::{
    cache::{
        CacheNotification,
        QueryCache,
        QueryData,
        QueryKey,
    },
    config::JournalConfig,
    error::{
        JournalError,
        JournalResult,
    },
    ledger::{
        Ledger,
        ProgramAccountInfo,
    },
    pda::journal_entry_address,
    submitter::TransactionSubmitter,
    transactions::{
        cancellation,
        CancelHandle,
        JournalMutation,
        MutationExecutor,
        MutationReceipt,
    },
    views::{
        AccountListing,
        JournalAccount,
        JournalEntry,
        LedgerReader,
    },
};

pub struct JournalProgram<L, S> {
    config: JournalConfig,
    reader: LedgerReader<L>,
    executor: MutationExecutor<L, S>,
    cache: QueryCache,
}

impl<L: Ledger + 'static, S: TransactionSubmitter> JournalProgram<L, S> {
    pub fn new(config: JournalConfig, ledger: L, submitter: S) -> Self {
        let ledger = Rc::new(ledger);
        let reader = LedgerReader::new(ledger.clone(), config.program_id, config.debug_logs);
        let executor = MutationExecutor::new(
            ledger,
            Rc::new(submitter),
            config.program_id,
            config.confirmation,
            config.debug_logs,
        );
        let cache = QueryCache::new(config.cluster, config.program_id, config.debug_logs);

        Self {
            config,
            reader,
            executor,
            cache,
        }
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    pub fn program_id(&self) -> &Address {
        &self.config.program_id
    }

    /// The identity the program's mutations are signed with.
    pub fn identity(&self) -> Address {
        self.executor.identity()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn executor(&self) -> &MutationExecutor<L, S> {
        &self.executor
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheNotification> {
        self.cache.subscribe()
    }

    /// Whether any account exists at the program's address on the configured cluster.
    ///
    /// Lets a UI tell "the program isn't deployed here" apart from "the program has no entries".
    pub async fn get_program_account(&self) -> JournalResult<Option<ProgramAccountInfo>> {
        let reader = self.reader.clone();
        let data = self
            .cache
            .read(&self.cache.program_account_key(), move || async move {
                reader.program_account().await.map(QueryData::ProgramAccount)
            })
            .await?;

        match data {
            QueryData::ProgramAccount(info) => Ok(info),
            other => Err(unexpected_data(&self.cache.program_account_key(), other)),
        }
    }

    /// Every journal entry of the program, plus any accounts that couldn't be decoded.
    pub async fn account_listing(&self) -> JournalResult<AccountListing> {
        let reader = self.reader.clone();
        let key = self.cache.accounts_key();
        let data = self
            .cache
            .read(&key, move || async move {
                reader.list_all().await.map(QueryData::Accounts)
            })
            .await?;

        match data {
            QueryData::Accounts(listing) => Ok(listing),
            other => Err(unexpected_data(&key, other)),
        }
    }

    /// Every journal entry of the program.
    pub async fn accounts(&self) -> JournalResult<Vec<JournalAccount>> {
        self.account_listing().await.map(|listing| listing.entries)
    }

    /// Marks the collection stale and reads it again.
    pub async fn refresh(&self) -> JournalResult<Vec<JournalAccount>> {
        self.cache.invalidate(&self.cache.accounts_key(), None);
        self.accounts().await
    }

    /// Creates an entry owned by the signer. Returns once the ledger has confirmed it.
    pub async fn create_entry(&self, title: &str, message: &str) -> JournalResult<MutationReceipt> {
        let receipt = self
            .executor
            .execute(JournalMutation::create(title, message), self.identity(), None)
            .await?;
        self.cache.on_confirmed(&receipt);
        Ok(receipt)
    }

    /// Opens a view on the entry at `address`.
    pub fn account(&self, address: Address) -> JournalAccountView<'_, L, S> {
        let (cancel, _) = cancellation();
        let key = self.cache.account_key(address);
        self.cache.retain(&key);
        JournalAccountView {
            program: self,
            address,
            key,
            cancel,
        }
    }

    /// Opens a view on the entry `owner` created with `title`.
    pub fn account_for(
        &self,
        owner: &Address,
        title: &str,
    ) -> JournalResult<JournalAccountView<'_, L, S>> {
        let address = journal_entry_address(owner, title, self.program_id())?;
        Ok(self.account(address))
    }

    async fn read_entry(&self, key: &QueryKey, address: Address) -> JournalResult<JournalEntry> {
        let reader = self.reader.clone();
        let data = self
            .cache
            .read(key, move || async move {
                match reader.read_one(&address).await {
                    Ok(entry) => Ok(QueryData::Account(Some(entry))),
                    Err(JournalError::NotFound { .. }) => Ok(QueryData::Account(None)),
                    Err(e) => Err(e),
                }
            })
            .await?;

        match data {
            QueryData::Account(Some(entry)) => Ok(entry),
            QueryData::Account(None) => Err(JournalError::NotFound { address }),
            other => Err(unexpected_data(key, other)),
        }
    }
}

fn unexpected_data(key: &QueryKey, data: QueryData) -> JournalError {
    JournalError::InvalidInput(format!("cache entry {key} holds {data:?}"))
}

/// A view on a single journal entry.
///
/// Dropping the view cancels any confirmation wait started through it, and discards its cache
/// entry unless another view of the same address is still open.
pub struct JournalAccountView<'a, L: Ledger + 'static, S: TransactionSubmitter> {
    program: &'a JournalProgram<L, S>,
    address: Address,
    key: QueryKey,
    cancel: CancelHandle,
}

impl<'a, L: Ledger + 'static, S: TransactionSubmitter> JournalAccountView<'a, L, S> {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn query_key(&self) -> &QueryKey {
        &self.key
    }

    /// A handle that abandons the view's pending confirmation waits when cancelled.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// The entry at the view's address.
    ///
    /// # Errors
    /// [`JournalError::NotFound`] if there isn't one.
    pub async fn account_query(&self) -> JournalResult<JournalEntry> {
        self.program.read_entry(&self.key, self.address).await
    }

    /// Marks the entry stale and reads it again.
    pub async fn refresh(&self) -> JournalResult<JournalEntry> {
        self.program.cache.invalidate(&self.key, None);
        self.account_query().await
    }

    /// Replaces the entry's message. The owner and title stay as they are.
    pub async fn update_entry(&self, message: &str) -> JournalResult<MutationReceipt> {
        let entry = self.account_query().await?;
        self.mutate(JournalMutation::update(entry.title, message), entry.owner)
            .await
    }

    pub async fn delete_entry(&self) -> JournalResult<MutationReceipt> {
        let entry = self.account_query().await?;
        self.mutate(JournalMutation::delete(entry.title), entry.owner)
            .await
    }

    async fn mutate(
        &self,
        mutation: JournalMutation,
        owner: Address,
    ) -> JournalResult<MutationReceipt> {
        let receipt = self
            .program
            .executor
            .execute(mutation, owner, Some(self.cancel.cancellation()))
            .await?;
        self.program.cache.on_confirmed(&receipt);
        Ok(receipt)
    }
}

impl<L: Ledger + 'static, S: TransactionSubmitter> Drop for JournalAccountView<'_, L, S> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.program.cache.release(&self.key);
    }
}
