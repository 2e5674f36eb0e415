//! An in-memory ledger that runs the journal program's account rules, for tests and examples
//! that shouldn't need a validator.
//!
//! The emulation follows what the deployed program does for each instruction:
//!
//! - `create_journal_entry`: the entry address must be derived from `(title, signer)`, and the
//!   account must not exist yet (system `AccountAlreadyInUse` otherwise).
//! - `update_journal_entry` / `delete_journal_entry`: the account must exist (Anchor
//!   `AccountNotInitialized` otherwise) and be derived from `(title, signer)` (Anchor
//!   `ConstraintSeeds` otherwise), which is how the program ties an entry to its owner.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
    time::Duration,
};

use journal_interface::{
    error::JournalProgramError,
    instructions::JournalInstruction,
    state::{
        JournalEntryState,
        ACCOUNT_SPACE,
    },
};
use solana_account::Account;
use solana_address::Address;
use solana_instruction_error::InstructionError;
use solana_sdk::{
    message::Instruction,
    signature::Signature,
};
use solana_transaction_error::TransactionError;

use crate::{
    error::JournalResult,
    ledger::{
        Ledger,
        TransactionOutcome,
    },
    pda::journal_entry_address,
    submitter::{
        SubmitError,
        TransactionSubmitter,
    },
};

/// Rent the emulated program charges for an entry account.
pub const ENTRY_LAMPORTS: u64 = 8_000_000;

const BPF_LOADER_UPGRADEABLE: Address =
    solana_sdk::pubkey!("BPFLoaderUpgradeab1e11111111111111111111111");

/// How many times each [`Ledger`] method has been called.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_account: usize,
    pub get_program_accounts: usize,
    pub get_signature_status: usize,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Address, Account>,
    statuses: HashMap<Signature, TransactionOutcome>,
    /// Transactions that were accepted but haven't been processed yet.
    pending: Vec<(Signature, Address, Vec<Instruction>)>,
    next_signature: u64,
    calls: CallCounts,
    read_delay: Option<Duration>,
    withhold_confirmations: bool,
    offline: bool,
}

/// A cheaply cloneable handle to shared in-memory ledger state.
#[derive(Clone)]
pub struct InMemoryLedger {
    program_id: Address,
    state: Rc<RefCell<LedgerState>>,
}

impl InMemoryLedger {
    /// A ledger with the journal program deployed at `program_id`.
    pub fn new(program_id: Address) -> Self {
        let ledger = Self::without_program(program_id);
        ledger.set_account(
            program_id,
            Account {
                lamports: 1_141_440,
                data: vec![0; 36],
                owner: BPF_LOADER_UPGRADEABLE,
                executable: true,
                rent_epoch: 0,
            },
        );
        ledger
    }

    /// A ledger on which the journal program was never deployed.
    pub fn without_program(program_id: Address) -> Self {
        Self {
            program_id,
            state: Default::default(),
        }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    /// A submitter that signs as `identity` and sends its transactions to this ledger.
    pub fn submitter(&self, identity: Address) -> InMemorySubmitter {
        InMemorySubmitter {
            ledger: self.clone(),
            identity,
            reject: Default::default(),
        }
    }

    pub fn set_account(&self, address: Address, account: Account) {
        self.state.borrow_mut().accounts.insert(address, account);
    }

    pub fn account(&self, address: &Address) -> Option<Account> {
        self.state.borrow().accounts.get(address).cloned()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.borrow().calls
    }

    /// Makes every read sleep first, so that concurrent reads overlap.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.state.borrow_mut().read_delay = delay;
    }

    /// While set, transactions are accepted but neither processed nor confirmed until
    /// [`InMemoryLedger::land_pending`] is called.
    pub fn set_withhold_confirmations(&self, withhold: bool) {
        self.state.borrow_mut().withhold_confirmations = withhold;
    }

    /// While set, every read and submission fails as if the endpoint were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Processes and confirms every withheld transaction, in submission order.
    pub fn land_pending(&self) {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        for (signature, signer, instructions) in pending {
            self.process_transaction(signature, signer, &instructions);
        }
    }

    fn next_signature(&self) -> Signature {
        let mut state = self.state.borrow_mut();
        state.next_signature += 1;
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&state.next_signature.to_le_bytes());
        Signature::from(bytes)
    }

    async fn begin_read(&self, count: impl FnOnce(&mut CallCounts)) -> JournalResult<()> {
        let delay = {
            let mut state = self.state.borrow_mut();
            count(&mut state.calls);
            if state.offline {
                return Err(crate::error::JournalError::NetworkUnavailable(
                    "in-memory ledger is offline".into(),
                ));
            }
            state.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn submit(
        &self,
        signer: Address,
        instructions: &[Instruction],
    ) -> Result<Signature, SubmitError> {
        if self.state.borrow().offline {
            return Err(SubmitError::NetworkUnavailable(
                "in-memory ledger is offline".into(),
            ));
        }

        let signature = self.next_signature();
        if self.state.borrow().withhold_confirmations {
            self.state
                .borrow_mut()
                .pending
                .push((signature, signer, instructions.to_vec()));
        } else {
            self.process_transaction(signature, signer, instructions);
        }
        Ok(signature)
    }

    /// Runs the instructions atomically: either all of them apply or none do.
    fn process_transaction(
        &self,
        signature: Signature,
        signer: Address,
        instructions: &[Instruction],
    ) {
        let mut accounts = self.state.borrow().accounts.clone();
        let outcome = instructions
            .iter()
            .enumerate()
            .try_for_each(|(index, instruction)| {
                self.process_instruction(&mut accounts, signer, instruction)
                    .map_err(|e| TransactionError::InstructionError(index as u8, e))
            });

        let mut state = self.state.borrow_mut();
        if outcome.is_ok() {
            state.accounts = accounts;
        }
        state.statuses.insert(signature, outcome);
    }

    fn process_instruction(
        &self,
        accounts: &mut HashMap<Address, Account>,
        signer: Address,
        instruction: &Instruction,
    ) -> Result<(), InstructionError> {
        if instruction.program_id != self.program_id {
            return Err(InstructionError::IncorrectProgramId);
        }
        let [entry, owner, ..] = instruction.accounts.as_slice() else {
            return Err(InstructionError::MissingAccount);
        };
        if !owner.is_signer || owner.pubkey != signer {
            return Err(InstructionError::MissingRequiredSignature);
        }

        let custom = |error: JournalProgramError| InstructionError::Custom(error.code());
        let ix = JournalInstruction::unpack(&instruction.data)
            .map_err(|_| InstructionError::InvalidInstructionData)?;
        let expected = journal_entry_address(&signer, ix.title(), &self.program_id)
            .map_err(|_| InstructionError::InvalidSeeds)?;

        if let JournalInstruction::CreateJournalEntry(data) = ix {
            if entry.pubkey != expected {
                return Err(custom(JournalProgramError::ConstraintSeeds));
            }
            if accounts.contains_key(&entry.pubkey) {
                return Err(custom(JournalProgramError::AccountAlreadyInUse));
            }
            let state = JournalEntryState::new(&signer, data.title, data.message);
            accounts.insert(
                entry.pubkey,
                Account {
                    lamports: ENTRY_LAMPORTS,
                    data: state.pack(ACCOUNT_SPACE),
                    owner: self.program_id,
                    executable: false,
                    rent_epoch: 0,
                },
            );
            return Ok(());
        }

        // Anchor deserializes the account before it checks the seeds constraint.
        let Some(account) = accounts.get_mut(&entry.pubkey) else {
            return Err(custom(JournalProgramError::AccountNotInitialized));
        };
        if account.owner != self.program_id {
            return Err(custom(JournalProgramError::AccountDiscriminatorMismatch));
        }
        let mut state = JournalEntryState::unpack(&account.data)
            .map_err(|_| custom(JournalProgramError::AccountDidNotDeserialize))?;
        if entry.pubkey != expected {
            return Err(custom(JournalProgramError::ConstraintSeeds));
        }

        if let JournalInstruction::UpdateJournalEntry(data) = ix {
            state.message = data.message;
            account.data = state.pack(ACCOUNT_SPACE);
        } else {
            accounts.remove(&entry.pubkey);
        }
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    async fn get_account(&self, address: &Address) -> JournalResult<Option<Account>> {
        self.begin_read(|calls| calls.get_account += 1).await?;
        Ok(self.account(address))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Address,
        discriminator: &[u8],
    ) -> JournalResult<Vec<(Address, Account)>> {
        self.begin_read(|calls| calls.get_program_accounts += 1)
            .await?;
        Ok(self
            .state
            .borrow()
            .accounts
            .iter()
            .filter(|(_, account)| {
                &account.owner == program_id && account.data.starts_with(discriminator)
            })
            .map(|(address, account)| (*address, account.clone()))
            .collect())
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> JournalResult<Option<TransactionOutcome>> {
        self.begin_read(|calls| calls.get_signature_status += 1)
            .await?;
        Ok(self.state.borrow().statuses.get(signature).cloned())
    }
}

/// A [`TransactionSubmitter`] for an [`InMemoryLedger`].
#[derive(Clone)]
pub struct InMemorySubmitter {
    ledger: InMemoryLedger,
    identity: Address,
    reject: Rc<RefCell<bool>>,
}

impl InMemorySubmitter {
    /// While set, the submitter behaves like a user declining every signature request.
    pub fn set_reject(&self, reject: bool) {
        *self.reject.borrow_mut() = reject;
    }
}

impl TransactionSubmitter for InMemorySubmitter {
    fn identity(&self) -> Address {
        self.identity
    }

    async fn sign_and_send(&self, instructions: &[Instruction]) -> Result<Signature, SubmitError> {
        if *self.reject.borrow() {
            return Err(SubmitError::UserRejected);
        }
        // Yield like a real wallet round trip would, so that callers racing each other interleave.
        tokio::task::yield_now().await;
        self.ledger.submit(self.identity, instructions)
    }
}
