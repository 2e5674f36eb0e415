//! Instruction layout for the program's three entry points, plus builders for the client side
//! and unpacking for anything that needs to read instruction data back (test ledgers, parsers).
//!
//! Instruction data is an 8 byte Anchor discriminator (`sha256("global:<name>")[..8]`) followed by
//! the borsh encoded arguments. Every instruction takes the same accounts:
//!
//! 0. `[WRITE]` The journal entry account.
//! 1. `[WRITE, SIGNER]` The entry owner, who also pays for (and is refunded) the account rent.
//! 2. `[READ]` The system program.

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use solana_address::Address;
use solana_instruction::{
    AccountMeta,
    Instruction,
};
use strum_macros::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, strum_macros::EnumIter)]
pub enum JournalInstructionTag {
    #[strum(to_string = "create_journal_entry")]
    CreateJournalEntry,
    #[strum(to_string = "update_journal_entry")]
    UpdateJournalEntry,
    #[strum(to_string = "delete_journal_entry")]
    DeleteJournalEntry,
}

#[rustfmt::skip]
impl JournalInstructionTag {
    pub const fn discriminator(&self) -> [u8; 8] {
        match self {
            JournalInstructionTag::CreateJournalEntry => [48, 65, 201, 186, 25, 41, 127, 0],
            JournalInstructionTag::UpdateJournalEntry => [113, 164, 49, 62, 43, 83, 194, 172],
            JournalInstructionTag::DeleteJournalEntry => [156, 50, 93, 5, 157, 97, 188, 114],
        }
    }
}

impl TryFrom<&[u8]> for JournalInstructionTag {
    type Error = InstructionDecodeError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let discriminator = data.get(..8).ok_or(InstructionDecodeError::InvalidInstructionTag)?;
        [
            JournalInstructionTag::CreateJournalEntry,
            JournalInstructionTag::UpdateJournalEntry,
            JournalInstructionTag::DeleteJournalEntry,
        ]
        .into_iter()
        .find(|tag| tag.discriminator() == discriminator)
        .ok_or(InstructionDecodeError::InvalidInstructionTag)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum InstructionDecodeError {
    InvalidInstructionTag,
    InvalidInstructionData,
}

/// Arguments of `create_journal_entry` and `update_journal_entry`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct EntryInstructionData {
    pub title: String,
    pub message: String,
}

/// Arguments of `delete_journal_entry`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeleteInstructionData {
    pub title: String,
}

/// Writes a borsh string: u32 little-endian byte length followed by the UTF-8 bytes.
pub fn pack_string(dst: &mut Vec<u8>, value: &str) {
    dst.extend_from_slice(&(value.len() as u32).to_le_bytes());
    dst.extend_from_slice(value.as_bytes());
}

impl EntryInstructionData {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn pack(&self, tag: JournalInstructionTag) -> Vec<u8> {
        let mut data = Vec::with_capacity(8 + 8 + self.title.len() + self.message.len());
        data.extend_from_slice(&tag.discriminator());
        pack_string(&mut data, &self.title);
        pack_string(&mut data, &self.message);
        data
    }
}

impl DeleteInstructionData {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(8 + 4 + self.title.len());
        data.extend_from_slice(&JournalInstructionTag::DeleteJournalEntry.discriminator());
        pack_string(&mut data, &self.title);
        data
    }
}

/// A decoded journal instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalInstruction {
    CreateJournalEntry(EntryInstructionData),
    UpdateJournalEntry(EntryInstructionData),
    DeleteJournalEntry(DeleteInstructionData),
}

impl JournalInstruction {
    pub fn unpack(data: &[u8]) -> Result<Self, InstructionDecodeError> {
        let tag = JournalInstructionTag::try_from(data)?;
        let mut args = &data[8..];
        let invalid = |_| InstructionDecodeError::InvalidInstructionData;
        Ok(match tag {
            JournalInstructionTag::CreateJournalEntry => JournalInstruction::CreateJournalEntry(
                EntryInstructionData::deserialize(&mut args).map_err(invalid)?,
            ),
            JournalInstructionTag::UpdateJournalEntry => JournalInstruction::UpdateJournalEntry(
                EntryInstructionData::deserialize(&mut args).map_err(invalid)?,
            ),
            JournalInstructionTag::DeleteJournalEntry => JournalInstruction::DeleteJournalEntry(
                DeleteInstructionData::deserialize(&mut args).map_err(invalid)?,
            ),
        })
    }

    pub fn title(&self) -> &str {
        match self {
            JournalInstruction::CreateJournalEntry(data)
            | JournalInstruction::UpdateJournalEntry(data) => &data.title,
            JournalInstruction::DeleteJournalEntry(data) => &data.title,
        }
    }
}

fn entry_accounts(entry: Address, owner: Address) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(entry, false),
        AccountMeta::new(owner, true),
        AccountMeta::new_readonly(solana_system_interface::program::ID, false),
    ]
}

/// Builds a `create_journal_entry` instruction. `entry` must be the address derived from
/// `(data.title, owner)`.
pub fn create_journal_entry(
    program_id: Address,
    entry: Address,
    owner: Address,
    data: &EntryInstructionData,
) -> Instruction {
    Instruction {
        program_id,
        accounts: entry_accounts(entry, owner),
        data: data.pack(JournalInstructionTag::CreateJournalEntry),
    }
}

pub fn update_journal_entry(
    program_id: Address,
    entry: Address,
    owner: Address,
    data: &EntryInstructionData,
) -> Instruction {
    Instruction {
        program_id,
        accounts: entry_accounts(entry, owner),
        data: data.pack(JournalInstructionTag::UpdateJournalEntry),
    }
}

pub fn delete_journal_entry(
    program_id: Address,
    entry: Address,
    owner: Address,
    data: &DeleteInstructionData,
) -> Instruction {
    Instruction {
        program_id,
        accounts: entry_accounts(entry, owner),
        data: data.pack(),
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn discriminators_are_distinct() {
        let tags = JournalInstructionTag::iter().collect::<Vec<_>>();
        for (i, a) in tags.iter().enumerate() {
            for b in tags.iter().skip(i + 1) {
                assert_ne!(a.discriminator(), b.discriminator());
            }
        }
    }

    #[test]
    fn packed_args_match_borsh() {
        let data = EntryInstructionData::new("Trip", "Paris was great");
        let packed = data.pack(JournalInstructionTag::UpdateJournalEntry);
        assert_eq!(
            &packed[..8],
            &JournalInstructionTag::UpdateJournalEntry.discriminator()
        );
        assert_eq!(&packed[8..], borsh::to_vec(&data).unwrap().as_slice());

        let delete = DeleteInstructionData::new("Trip");
        assert_eq!(&delete.pack()[8..], borsh::to_vec(&delete).unwrap().as_slice());
    }

    #[test]
    fn instruction_accounts_and_unpack() {
        let program_id = Address::new_from_array([1; 32]);
        let entry = Address::new_from_array([2; 32]);
        let owner = Address::new_from_array([3; 32]);
        let ix = delete_journal_entry(program_id, entry, owner, &DeleteInstructionData::new("T"));

        assert_eq!(ix.program_id, program_id);
        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable && ix.accounts[1].is_signer);
        assert_eq!(ix.accounts[2].pubkey, solana_system_interface::program::ID);

        let unpacked = JournalInstruction::unpack(&ix.data).unwrap();
        assert_eq!(
            unpacked,
            JournalInstruction::DeleteJournalEntry(DeleteInstructionData::new("T"))
        );
        assert_eq!(unpacked.title(), "T");
    }

    #[test]
    fn unpack_rejects_unknown_tags() {
        assert_eq!(
            JournalInstruction::unpack(&[0; 4]),
            Err(InstructionDecodeError::InvalidInstructionTag)
        );
        assert_eq!(
            JournalInstruction::unpack(&[0; 16]),
            Err(InstructionDecodeError::InvalidInstructionTag)
        );
        let mut short = JournalInstructionTag::CreateJournalEntry.discriminator().to_vec();
        short.extend_from_slice(&10u32.to_le_bytes());
        assert_eq!(
            JournalInstruction::unpack(&short),
            Err(InstructionDecodeError::InvalidInstructionData)
        );
    }
}
