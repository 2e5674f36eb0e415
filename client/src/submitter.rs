//! The write side of the ledger: signing and broadcasting transactions.
//!
//! The client never holds key material itself. It hands unsigned instructions to a
//! [`TransactionSubmitter`], which signs them (possibly by asking a wallet or a user) and
//! broadcasts the result. Confirmation is the caller's job; see
//! [`crate::transactions::MutationExecutor`].

use std::rc::Rc;

use solana_address::Address;
use solana_client::{
    client_error::ClientError,
    nonblocking::rpc_client::RpcClient,
};
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    message::{
        Instruction,
        Message,
    },
    signature::{
        Signature,
        Signer,
    },
    signer::SignerError,
    transaction::Transaction,
};
use solana_transaction_error::TransactionError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The signer declined to sign.
    UserRejected,
    /// The signer couldn't sign for another reason.
    Signing(String),
    /// The transaction couldn't be broadcast.
    NetworkUnavailable(String),
    /// The transaction was rejected before broadcast, e.g. by preflight simulation.
    Transaction(TransactionError),
}

impl From<SignerError> for SubmitError {
    fn from(error: SignerError) -> Self {
        match error {
            SignerError::UserCancel(_) => SubmitError::UserRejected,
            other => SubmitError::Signing(other.to_string()),
        }
    }
}

impl From<ClientError> for SubmitError {
    fn from(error: ClientError) -> Self {
        match error.get_transaction_error() {
            Some(transaction_error) => SubmitError::Transaction(transaction_error),
            None => SubmitError::NetworkUnavailable(error.to_string()),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait TransactionSubmitter {
    /// The identity that signs (and pays for) submitted transactions.
    fn identity(&self) -> Address;

    /// Signs a transaction containing `instructions` and broadcasts it without waiting for
    /// confirmation.
    async fn sign_and_send(&self, instructions: &[Instruction]) -> Result<Signature, SubmitError>;
}

/// A [`TransactionSubmitter`] that signs with any local [`Signer`] and broadcasts over RPC.
pub struct SignerSubmitter<S: Signer> {
    pub signer: S,
    pub client: Rc<RpcClient>,
    /// Prepends compute budget instructions with this unit limit when set.
    pub compute_budget: Option<u32>,
}

impl<S: Signer> SignerSubmitter<S> {
    pub fn new(signer: S, client: Rc<RpcClient>) -> Self {
        Self {
            signer,
            client,
            compute_budget: None,
        }
    }

    pub fn with_compute_budget(mut self, compute_budget: u32) -> Self {
        self.compute_budget = Some(compute_budget);
        self
    }
}

impl<S: Signer> TransactionSubmitter for SignerSubmitter<S> {
    fn identity(&self) -> Address {
        self.signer.pubkey()
    }

    async fn sign_and_send(&self, instructions: &[Instruction]) -> Result<Signature, SubmitError> {
        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| SubmitError::NetworkUnavailable(e.to_string()))?;

        let final_instructions: Vec<Instruction> = self
            .compute_budget
            .map_or(vec![], |budget| {
                vec![
                    ComputeBudgetInstruction::set_compute_unit_limit(budget),
                    ComputeBudgetInstruction::set_compute_unit_price(1),
                ]
            })
            .into_iter()
            .chain(instructions.iter().cloned())
            .collect();

        let message = Message::new(&final_instructions, Some(&self.signer.pubkey()));
        let mut tx = Transaction::new_unsigned(message);
        tx.try_sign(&[&self.signer], blockhash)?;

        Ok(self.client.send_transaction(&tx).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_user_cancellation_counts_as_rejection() {
        assert_eq!(
            SubmitError::from(SignerError::UserCancel("declined".into())),
            SubmitError::UserRejected
        );
        assert!(matches!(
            SubmitError::from(SignerError::KeypairPubkeyMismatch),
            SubmitError::Signing(_)
        ));
        assert!(matches!(
            SubmitError::from(SignerError::NotEnoughSigners),
            SubmitError::Signing(_)
        ));
    }
}
