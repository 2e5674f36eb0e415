//! Read-only view helpers for decoding journal entry accounts into ergonomic Rust structs, and
//! the reader that fetches them.

use std::rc::Rc;

use colored::Colorize;
use itertools::Itertools;
use journal_interface::state::{
    JournalEntryState,
    JOURNAL_ENTRY_DISCRIMINATOR,
};
use solana_address::Address;

use crate::{
    eprint_kv,
    error::{
        JournalError,
        JournalResult,
    },
    ledger::{
        Ledger,
        ProgramAccountInfo,
    },
    LogColor,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalEntry {
    pub owner: Address,
    pub title: String,
    pub message: String,
}

impl From<JournalEntryState> for JournalEntry {
    fn from(state: JournalEntryState) -> Self {
        Self {
            owner: state.owner(),
            title: state.title,
            message: state.message,
        }
    }
}

/// A journal entry together with the address it lives at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalAccount {
    pub address: Address,
    pub entry: JournalEntry,
}

/// The result of scanning every entry account of a program.
///
/// Accounts that couldn't be decoded don't abort the scan; they're reported in `skipped`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountListing {
    pub entries: Vec<JournalAccount>,
    pub skipped: Vec<JournalError>,
}

/// Attempts to decode a journal entry from raw account fields.
///
/// Validates that:
/// - `account_owner` matches `program_id`, and
/// - `account_data` is a journal entry account; see [`JournalEntryState::unpack`].
///
/// # Errors
/// Returns [`JournalError::DecodeError`] if either check fails.
pub fn try_journal_entry_from_owner_and_data(
    address: &Address,
    account_owner: &Address,
    account_data: &[u8],
    program_id: &Address,
) -> JournalResult<JournalEntry> {
    if account_owner != program_id {
        return Err(JournalError::DecodeError {
            address: *address,
            reason: format!("account is owned by {account_owner}, not the journal program"),
        });
    }

    JournalEntryState::unpack(account_data)
        .map(JournalEntry::from)
        .map_err(|e| JournalError::DecodeError {
            address: *address,
            reason: e.to_string(),
        })
}

/// Fetches and decodes journal entries from the ledger.
///
/// Reads are snapshots of the ledger at call time. Two reads aren't isolated from each other.
pub struct LedgerReader<L> {
    ledger: Rc<L>,
    program_id: Address,
    debug_logs: bool,
}

impl<L> Clone for LedgerReader<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            program_id: self.program_id,
            debug_logs: self.debug_logs,
        }
    }
}

impl<L: Ledger> LedgerReader<L> {
    pub fn new(ledger: Rc<L>, program_id: Address, debug_logs: bool) -> Self {
        Self {
            ledger,
            program_id,
            debug_logs,
        }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    /// Lists every journal entry of the program, sorted by title and then owner.
    ///
    /// An empty program yields an empty listing, not an error.
    pub async fn list_all(&self) -> JournalResult<AccountListing> {
        let accounts = self
            .ledger
            .get_program_accounts(&self.program_id, &JOURNAL_ENTRY_DISCRIMINATOR)
            .await?;

        let (entries, skipped): (Vec<_>, Vec<_>) = accounts
            .into_iter()
            .map(|(address, account)| {
                try_journal_entry_from_owner_and_data(
                    &address,
                    &account.owner,
                    &account.data,
                    &self.program_id,
                )
                .map(|entry| JournalAccount { address, entry })
            })
            .partition_result();

        if self.debug_logs {
            for error in skipped.iter() {
                eprint_kv!("Skipped account", error, LogColor::Warning);
            }
        }

        let entries = entries
            .into_iter()
            .sorted_by(|a, b| {
                (&a.entry.title, a.entry.owner.as_ref())
                    .cmp(&(&b.entry.title, b.entry.owner.as_ref()))
            })
            .collect();

        Ok(AccountListing { entries, skipped })
    }

    /// Reads the journal entry at `address`.
    ///
    /// # Errors
    /// [`JournalError::NotFound`] if there's no account at `address`, and
    /// [`JournalError::DecodeError`] if there's an account but it isn't a journal entry.
    pub async fn read_one(&self, address: &Address) -> JournalResult<JournalEntry> {
        let account = self
            .ledger
            .get_account(address)
            .await?
            .ok_or(JournalError::NotFound { address: *address })?;

        try_journal_entry_from_owner_and_data(
            address,
            &account.owner,
            &account.data,
            &self.program_id,
        )
    }

    /// Looks up the account at the program's own address. `None` means the program isn't
    /// deployed on the cluster the ledger points at.
    pub async fn program_account(&self) -> JournalResult<Option<ProgramAccountInfo>> {
        Ok(self
            .ledger
            .get_account(&self.program_id)
            .await?
            .as_ref()
            .map(ProgramAccountInfo::from))
    }
}
