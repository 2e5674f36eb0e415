//! Seed layout for journal entry program-derived addresses.
//!
//! The program derives each entry's address from `[title, owner]`, in that order. The ledger's
//! derivation rule appends the program id and the `ProgramDerivedAddress` marker itself, so those
//! don't appear here.

use solana_address::Address;

/// The maximum length in bytes of a single seed accepted by the address derivation rule.
pub const MAX_SEED_LEN: usize = 32;

/// Titles are used verbatim as a seed, so they share the seed limit.
pub const MAX_TITLE_LEN: usize = MAX_SEED_LEN;

/// The maximum message length in bytes the program allocates space for.
pub const MAX_MESSAGE_LEN: usize = 1000;

static_assertions::const_assert!(MAX_TITLE_LEN <= MAX_SEED_LEN);

/// Returns the seeds of the journal entry owned by `owner` with the given `title`.
///
/// The caller is responsible for checking that `title` fits in [`MAX_TITLE_LEN`] bytes.
#[inline(always)]
pub fn journal_entry<'a>(title: &'a str, owner: &'a Address) -> [&'a [u8]; 2] {
    [title.as_bytes(), owner.as_ref()]
}
