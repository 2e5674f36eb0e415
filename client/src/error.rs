//! The typed error every fallible client operation returns.

use journal_interface::error::JournalProgramError;
use solana_address::Address;
use solana_sdk::signature::Signature;
use solana_transaction_error::TransactionError;

/// Errors surfaced by the reader, the mutation executor, and the cache.
///
/// `Clone` so that a single coalesced fetch can hand the same result to every waiting caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalError {
    /// No journal entry lives at the address.
    NotFound { address: Address },
    /// A create targeted an address that already holds an entry.
    AlreadyExists { address: Address },
    /// The signer isn't the owner of the entry at the address.
    Unauthorized { address: Address },
    /// The signer declined to sign.
    UserRejected,
    /// The signer couldn't produce a signature, e.g. a keypair that doesn't match its address.
    SigningFailed(String),
    /// The RPC endpoint couldn't be reached or returned a transport error.
    NetworkUnavailable(String),
    /// The transaction was broadcast but wasn't confirmed in time. It may still land.
    ConfirmationTimeout { signature: Signature },
    /// The wait for confirmation was abandoned. The transaction may still land.
    ConfirmationCancelled { signature: Signature },
    /// The mutation was cancelled before anything was broadcast.
    MutationCancelled { address: Address },
    /// The account at the address isn't a journal entry owned by the program.
    DecodeError { address: Address, reason: String },
    /// Another mutation of the same entry is still in flight from this client.
    MutationInFlight { address: Address },
    /// The arguments can't be turned into a valid instruction.
    InvalidInput(String),
    /// The transaction failed for a reason that doesn't map to any of the above.
    ProgramFailure(TransactionError),
}

impl JournalError {
    /// Whether the operation may still take effect on the ledger despite the error.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            JournalError::ConfirmationTimeout { .. } | JournalError::ConfirmationCancelled { .. }
        )
    }

    /// The signature of the broadcast transaction, for errors raised after broadcasting.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            JournalError::ConfirmationTimeout { signature }
            | JournalError::ConfirmationCancelled { signature } => Some(signature),
            _ => None,
        }
    }
}

impl core::fmt::Display for JournalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            JournalError::NotFound { address } => write!(f, "No journal entry at {address}"),
            JournalError::AlreadyExists { address } => {
                write!(f, "A journal entry already exists at {address}")
            }
            JournalError::Unauthorized { address } => {
                write!(f, "Signer doesn't own the journal entry at {address}")
            }
            JournalError::UserRejected => f.write_str("The transaction was rejected by the signer"),
            JournalError::SigningFailed(reason) => write!(f, "Couldn't sign: {reason}"),
            JournalError::NetworkUnavailable(reason) => write!(f, "Network unavailable: {reason}"),
            JournalError::ConfirmationTimeout { signature } => write!(
                f,
                "Transaction {signature} wasn't confirmed in time and may still land"
            ),
            JournalError::ConfirmationCancelled { signature } => write!(
                f,
                "Stopped waiting for transaction {signature}, which may still land"
            ),
            JournalError::MutationCancelled { address } => {
                write!(f, "Mutation of {address} was cancelled before it was sent")
            }
            JournalError::DecodeError { address, reason } => {
                write!(f, "Couldn't decode account {address}: {reason}")
            }
            JournalError::MutationInFlight { address } => {
                write!(f, "A mutation of {address} is already in flight")
            }
            JournalError::InvalidInput(reason) => write!(f, "Invalid input: {reason}"),
            JournalError::ProgramFailure(error) => match program_error_code(error) {
                Some(code) => write!(f, "Transaction failed: {code}"),
                None => write!(f, "Transaction failed: {error}"),
            },
        }
    }
}

impl std::error::Error for JournalError {}

/// Extracts the journal program's custom error code from a failed transaction, if there is one.
pub fn program_error_code(error: &TransactionError) -> Option<JournalProgramError> {
    match error {
        TransactionError::InstructionError(
            _,
            solana_instruction_error::InstructionError::Custom(code),
        ) => JournalProgramError::from_code(*code),
        _ => None,
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
