//! Account layout of a journal entry as written by the program.
//!
//! The program stores entries as Anchor accounts:
//!
//! | Offset | Field           | Encoding                          |
//! |--------|-----------------|-----------------------------------|
//! | 0      | discriminator   | 8 bytes                           |
//! | 8      | owner           | 32 bytes                          |
//! | 40     | title           | u32 LE length + UTF-8 bytes       |
//! | ..     | message         | u32 LE length + UTF-8 bytes       |
//!
//! Accounts are allocated with a fixed amount of space, so there may be trailing bytes after the
//! message. They are ignored when decoding.

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use solana_address::Address;

/// `sha256("account:JournalEntryState")[..8]`
pub const JOURNAL_ENTRY_DISCRIMINATOR: [u8; 8] = [113, 86, 110, 124, 140, 14, 58, 66];

pub const DISCRIMINATOR_LEN: usize = JOURNAL_ENTRY_DISCRIMINATOR.len();

/// The smallest possible account: discriminator, owner, and two empty strings.
pub const MIN_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + 32 + 4 + 4;

/// The account space the program allocates for every entry.
pub const ACCOUNT_SPACE: usize = MIN_ACCOUNT_LEN
    + crate::seeds::MAX_TITLE_LEN
    + crate::seeds::MAX_MESSAGE_LEN;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct JournalEntryState {
    pub owner: [u8; 32],
    pub title: String,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateDecodeError {
    /// The account data is shorter than the smallest valid entry.
    InsufficientByteLength,
    /// The first eight bytes aren't [`JOURNAL_ENTRY_DISCRIMINATOR`].
    InvalidAccountDiscriminant,
    /// The body isn't a valid borsh encoding of [`JournalEntryState`].
    InvalidAccountData,
}

impl From<StateDecodeError> for &'static str {
    fn from(value: StateDecodeError) -> Self {
        match value {
            StateDecodeError::InsufficientByteLength => "Not enough bytes for a journal entry",
            StateDecodeError::InvalidAccountDiscriminant => "Invalid account discriminant",
            StateDecodeError::InvalidAccountData => "Account data is not a valid journal entry",
        }
    }
}

impl core::fmt::Display for StateDecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str((*self).into())
    }
}

impl std::error::Error for StateDecodeError {}

impl JournalEntryState {
    pub fn new(owner: &Address, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            owner: owner.to_bytes(),
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn owner(&self) -> Address {
        Address::new_from_array(self.owner)
    }

    /// Decodes a journal entry from raw account data, discriminator included.
    pub fn unpack(data: &[u8]) -> Result<Self, StateDecodeError> {
        if data.len() < MIN_ACCOUNT_LEN {
            return Err(StateDecodeError::InsufficientByteLength);
        }
        let (discriminator, mut body) = data.split_at(DISCRIMINATOR_LEN);
        if discriminator != JOURNAL_ENTRY_DISCRIMINATOR {
            return Err(StateDecodeError::InvalidAccountDiscriminant);
        }

        // `deserialize` rather than `try_from_slice`, since the latter rejects trailing bytes.
        Self::deserialize(&mut body).map_err(|_| StateDecodeError::InvalidAccountData)
    }

    /// Encodes the entry as the program lays it out, zero-padded to `space` bytes if the encoded
    /// entry is shorter than that.
    pub fn pack(&self, space: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(space.max(MIN_ACCOUNT_LEN));
        data.extend_from_slice(&JOURNAL_ENTRY_DISCRIMINATOR);
        data.extend_from_slice(&self.owner);
        crate::instructions::pack_string(&mut data, &self.title);
        crate::instructions::pack_string(&mut data, &self.message);
        if data.len() < space {
            data.resize(space, 0);
        }
        data
    }
}
