//! Builds, submits, and confirms journal mutations.
//!
//! Every mutation goes through three strictly sequential phases:
//!
//! 1. Build an unsigned instruction from the derived entry address and the arguments.
//! 2. Hand it to the [`TransactionSubmitter`], which signs and broadcasts it.
//! 3. Poll the [`Ledger`] until the transaction is confirmed, the timeout elapses, or the wait is
//!    cancelled.
//!
//! Nothing here retries a submission. A timed out or cancelled wait reports the signature so the
//! caller can decide whether to look it up later or resubmit.

use std::{
    cell::RefCell,
    collections::HashSet,
    future::pending,
    rc::Rc,
};

use chrono::{
    DateTime,
    Utc,
};
use colored::Colorize;
use journal_interface::{
    error::JournalProgramError,
    instructions::{
        create_journal_entry,
        delete_journal_entry,
        update_journal_entry,
        DeleteInstructionData,
        EntryInstructionData,
    },
    seeds::MAX_MESSAGE_LEN,
};
use solana_address::Address;
use solana_instruction_error::InstructionError;
use solana_sdk::{
    message::Instruction,
    signature::Signature,
};
use solana_transaction_error::TransactionError;
use strum_macros::Display;
use tokio::{
    sync::watch,
    time::{
        sleep,
        timeout,
    },
};

use crate::{
    config::ConfirmationPolicy,
    error::{
        program_error_code,
        JournalError,
        JournalResult,
    },
    eprint_kv,
    ledger::Ledger,
    logs::fmt_tag,
    pda::{
        journal_entry_address,
        validate_title,
    },
    print_kv,
    submitter::{
        SubmitError,
        TransactionSubmitter,
    },
    LogColor,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// A state-changing request against one journal entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalMutation {
    Create { title: String, message: String },
    Update { title: String, message: String },
    Delete { title: String },
}

impl JournalMutation {
    pub fn create(title: impl Into<String>, message: impl Into<String>) -> Self {
        JournalMutation::Create {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn update(title: impl Into<String>, message: impl Into<String>) -> Self {
        JournalMutation::Update {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn delete(title: impl Into<String>) -> Self {
        JournalMutation::Delete {
            title: title.into(),
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            JournalMutation::Create { .. } => MutationKind::Create,
            JournalMutation::Update { .. } => MutationKind::Update,
            JournalMutation::Delete { .. } => MutationKind::Delete,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            JournalMutation::Create { title, .. }
            | JournalMutation::Update { title, .. }
            | JournalMutation::Delete { title } => title,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            JournalMutation::Create { message, .. } | JournalMutation::Update { message, .. } => {
                Some(message)
            }
            JournalMutation::Delete { .. } => None,
        }
    }

    /// Checks the arguments against the limits the program enforces.
    pub fn validate(&self) -> JournalResult<()> {
        validate_title(self.title())?;
        if let Some(message) = self.message() {
            if message.trim().is_empty() {
                return Err(JournalError::InvalidInput("message can't be empty".into()));
            }
            if message.len() > MAX_MESSAGE_LEN {
                return Err(JournalError::InvalidInput(format!(
                    "message is {} bytes, the maximum is {MAX_MESSAGE_LEN}",
                    message.len()
                )));
            }
        }
        Ok(())
    }

    /// Builds the unsigned program instruction for this mutation.
    pub fn instruction(&self, program_id: Address, entry: Address, signer: Address) -> Instruction {
        match self {
            JournalMutation::Create { title, message } => create_journal_entry(
                program_id,
                entry,
                signer,
                &EntryInstructionData::new(title.as_str(), message.as_str()),
            ),
            JournalMutation::Update { title, message } => update_journal_entry(
                program_id,
                entry,
                signer,
                &EntryInstructionData::new(title.as_str(), message.as_str()),
            ),
            JournalMutation::Delete { title } => delete_journal_entry(
                program_id,
                entry,
                signer,
                &DeleteInstructionData::new(title.as_str()),
            ),
        }
    }
}

/// A mutation that has been started but not yet confirmed or failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMutation {
    pub kind: MutationKind,
    pub title: String,
    pub message: Option<String>,
    pub owner: Address,
    pub started_at: DateTime<Utc>,
}

impl PendingMutation {
    pub fn new(mutation: &JournalMutation, owner: Address) -> Self {
        Self {
            kind: mutation.kind(),
            title: mutation.title().to_string(),
            message: mutation.message().map(str::to_string),
            owner,
            started_at: Utc::now(),
        }
    }
}

/// Proof that a mutation was confirmed by the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationReceipt {
    pub kind: MutationKind,
    pub address: Address,
    pub owner: Address,
    pub title: String,
    pub signature: Signature,
    pub started_at: DateTime<Utc>,
    pub confirmed_at: DateTime<Utc>,
}

/// Creates a linked [`CancelHandle`] and [`Cancellation`].
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Rc::new(tx) }, Cancellation { rx })
}

/// The cancelling side. Dropping every clone of the handle cancels too, so a view that owns the
/// handle cancels its waits when it's torn down.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Rc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A new [`Cancellation`] tied to this handle.
    pub fn cancellation(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }
}

/// The waiting side, passed into [`MutationExecutor::execute`].
#[derive(Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle cancels or is dropped.
    pub async fn cancelled(mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Removes the address from the in-flight set when the mutation finishes, fails, or its future
/// is dropped.
struct InFlightGuard {
    in_flight: Rc<RefCell<HashSet<Address>>>,
    address: Address,
}

impl InFlightGuard {
    fn acquire(in_flight: &Rc<RefCell<HashSet<Address>>>, address: Address) -> JournalResult<Self> {
        if !in_flight.borrow_mut().insert(address) {
            return Err(JournalError::MutationInFlight { address });
        }
        Ok(Self {
            in_flight: in_flight.clone(),
            address,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.borrow_mut().remove(&self.address);
    }
}

/// Maps a failed transaction to the error the caller should see for this kind of mutation.
pub fn mutation_error(
    kind: MutationKind,
    address: Address,
    error: TransactionError,
) -> JournalError {
    use JournalProgramError::*;

    if let TransactionError::InstructionError(_, InstructionError::MissingRequiredSignature) = error
    {
        return JournalError::Unauthorized { address };
    }

    match (kind, program_error_code(&error)) {
        (MutationKind::Create, Some(AccountAlreadyInUse)) => {
            JournalError::AlreadyExists { address }
        }
        (_, Some(AccountNotInitialized | AccountDiscriminatorNotFound)) => {
            JournalError::NotFound { address }
        }
        (_, Some(ConstraintHasOne | ConstraintSigner | ConstraintSeeds)) => {
            JournalError::Unauthorized { address }
        }
        _ => JournalError::ProgramFailure(error),
    }
}

fn submit_error(kind: MutationKind, address: Address, error: SubmitError) -> JournalError {
    match error {
        SubmitError::UserRejected => JournalError::UserRejected,
        SubmitError::Signing(reason) => JournalError::SigningFailed(reason),
        SubmitError::NetworkUnavailable(reason) => JournalError::NetworkUnavailable(reason),
        SubmitError::Transaction(error) => mutation_error(kind, address, error),
    }
}

/// Submits journal mutations one at a time per call and waits for their confirmation.
pub struct MutationExecutor<L, S> {
    ledger: Rc<L>,
    submitter: Rc<S>,
    program_id: Address,
    policy: ConfirmationPolicy,
    in_flight: Rc<RefCell<HashSet<Address>>>,
    debug_logs: bool,
}

impl<L: Ledger, S: TransactionSubmitter> MutationExecutor<L, S> {
    pub fn new(
        ledger: Rc<L>,
        submitter: Rc<S>,
        program_id: Address,
        policy: ConfirmationPolicy,
        debug_logs: bool,
    ) -> Self {
        Self {
            ledger,
            submitter,
            program_id,
            policy,
            in_flight: Default::default(),
            debug_logs,
        }
    }

    /// The identity mutations are signed with.
    pub fn identity(&self) -> Address {
        self.submitter.identity()
    }

    /// Whether a mutation of the entry at `address` is currently in flight.
    pub fn is_in_flight(&self, address: &Address) -> bool {
        self.in_flight.borrow().contains(address)
    }

    /// Executes `mutation` against the entry owned by `owner`, signed by the submitter's identity.
    ///
    /// Returns only once the ledger has confirmed the transaction. If `cancel` has already fired,
    /// nothing is sent and the call fails with [`JournalError::MutationCancelled`]. If it fires
    /// during the wait, the wait is abandoned with [`JournalError::ConfirmationCancelled`]; the
    /// broadcast transaction isn't (and can't be) retracted.
    pub async fn execute(
        &self,
        mutation: JournalMutation,
        owner: Address,
        cancel: Option<Cancellation>,
    ) -> JournalResult<MutationReceipt> {
        mutation.validate()?;
        let kind = mutation.kind();
        let address = journal_entry_address(&owner, mutation.title(), &self.program_id)?;
        let _guard = InFlightGuard::acquire(&self.in_flight, address)?;
        if cancel.as_ref().is_some_and(Cancellation::is_cancelled) {
            return Err(JournalError::MutationCancelled { address });
        }
        let pending = PendingMutation::new(&mutation, owner);

        let instruction = mutation.instruction(self.program_id, address, self.identity());
        let signature = self
            .submitter
            .sign_and_send(&[instruction])
            .await
            .map_err(|e| {
                let error = submit_error(kind, address, e);
                self.log_failure(&pending, &error);
                error
            })?;

        if self.debug_logs {
            print_kv!(
                format!("{} {kind} submitted", fmt_tag("journal", LogColor::Info)),
                signature
            );
        }

        let outcome = self.await_confirmation(signature, cancel).await;
        let result = match outcome {
            Ok(Ok(())) => Ok(MutationReceipt {
                kind,
                address,
                owner,
                title: pending.title.clone(),
                signature,
                started_at: pending.started_at,
                confirmed_at: Utc::now(),
            }),
            Ok(Err(transaction_error)) => Err(mutation_error(kind, address, transaction_error)),
            Err(error) => Err(error),
        };

        match &result {
            Ok(receipt) if self.debug_logs => {
                print_kv!(
                    format!("{} {kind} confirmed", fmt_tag("journal", LogColor::Success)),
                    receipt.address
                );
            }
            Err(error) => self.log_failure(&pending, error),
            _ => (),
        }

        result
    }

    /// Polls the signature status until the transaction reaches the configured commitment.
    ///
    /// Status lookups are reads, so a transient RPC failure just means polling again; only the
    /// overall timeout ends the wait.
    async fn await_confirmation(
        &self,
        signature: Signature,
        cancel: Option<Cancellation>,
    ) -> JournalResult<Result<(), TransactionError>> {
        let poll = async {
            loop {
                match self.ledger.get_signature_status(&signature).await {
                    Ok(Some(outcome)) => return outcome,
                    Ok(None) => (),
                    Err(error) if self.debug_logs => {
                        eprint_kv!("Status lookup failed", error, LogColor::Warning);
                    }
                    Err(_) => (),
                }
                sleep(self.policy.poll_interval).await;
            }
        };

        let cancelled = async {
            match cancel {
                Some(cancel) => cancel.cancelled().await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            outcome = timeout(self.policy.timeout, poll) => {
                return outcome.map_err(|_| JournalError::ConfirmationTimeout { signature });
            }
            _ = cancelled => (),
        }

        // A confirmation that raced the cancellation still counts.
        match self.ledger.get_signature_status(&signature).await {
            Ok(Some(outcome)) => Ok(outcome),
            _ => Err(JournalError::ConfirmationCancelled { signature }),
        }
    }

    fn log_failure(&self, pending: &PendingMutation, error: &JournalError) {
        if self.debug_logs {
            eprint_kv!(
                format!(
                    "{} {} {:?} failed",
                    fmt_tag("journal", LogColor::Error),
                    pending.kind,
                    pending.title
                ),
                error,
                LogColor::Error
            );
        }
    }
}
