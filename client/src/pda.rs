//! Address derivation for journal entries.

use journal_interface::seeds::{
    self,
    MAX_TITLE_LEN,
};
use solana_address::Address;

use crate::error::{
    JournalError,
    JournalResult,
};

/// Checks that `title` can be used as an entry title: non-blank and within the seed limit.
pub fn validate_title(title: &str) -> JournalResult<()> {
    if title.trim().is_empty() {
        return Err(JournalError::InvalidInput("title can't be empty".into()));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(JournalError::InvalidInput(format!(
            "title is {} bytes, the maximum is {MAX_TITLE_LEN}",
            title.len()
        )));
    }
    Ok(())
}

/// Derives the address of the journal entry owned by `owner` with the given `title`, along with
/// its canonical bump.
///
/// Uses the same seed order as the program, so every client computes the same address for the
/// same `(owner, title, program_id)` without coordinating.
pub fn find_journal_entry_address(
    owner: &Address,
    title: &str,
    program_id: &Address,
) -> JournalResult<(Address, u8)> {
    validate_title(title)?;
    Address::try_find_program_address(&seeds::journal_entry(title, owner), program_id).ok_or_else(
        || JournalError::InvalidInput(format!("no valid address for title {title:?}")),
    )
}

/// [`find_journal_entry_address`] without the bump.
pub fn journal_entry_address(
    owner: &Address,
    title: &str,
    program_id: &Address,
) -> JournalResult<Address> {
    find_journal_entry_address(owner, title, program_id).map(|(address, _bump)| address)
}
