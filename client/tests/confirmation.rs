use journal_client::{
    cache::CacheStatus,
    e2e_helpers::E2e,
    error::JournalError,
    transactions::{
        JournalMutation,
        MutationKind,
    },
};
use solana_address::Address;

#[tokio::test]
async fn timed_out_mutations_report_their_signature() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let user = e2e.user(0);
    e2e.ledger.set_withhold_confirmations(true);

    let error = user
        .program
        .create_entry("Trip", "Paris")
        .await
        .expect_err("confirmation is withheld");
    assert!(matches!(error, JournalError::ConfirmationTimeout { .. }));
    assert!(error.is_ambiguous());
    let signature = *error.signature().unwrap();

    // The caller can't tell whether it landed yet. Once it does, the status shows it.
    assert!(user.program.accounts().await?.is_empty());
    e2e.ledger.land_pending();
    assert_eq!(
        journal_client::ledger::Ledger::get_signature_status(&e2e.ledger, &signature).await?,
        Some(Ok(()))
    );
    assert_eq!(user.program.refresh().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn cancelling_a_view_abandons_the_wait() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let user = e2e.user(0);
    let receipt = user.program.create_entry("Trip", "Paris was great").await?;
    e2e.ledger.set_withhold_confirmations(true);

    let view = user.program.account(receipt.address);
    let handle = view.cancel_handle();
    let (result, ()) = futures::join!(view.update_entry("Paris was amazing"), async {
        tokio::task::yield_now().await;
        handle.cancel();
    });

    let error = result.expect_err("the wait was cancelled");
    assert!(matches!(error, JournalError::ConfirmationCancelled { .. }));
    assert!(!user.program.executor().is_in_flight(&receipt.address));

    // Cancelling only stops the wait. The transaction still lands.
    e2e.ledger.land_pending();
    drop(view);
    let entry = user.program.account(receipt.address).account_query().await?;
    assert_eq!(entry.message, "Paris was amazing");

    Ok(())
}

#[tokio::test]
async fn confirmations_win_over_a_simultaneous_cancel() -> anyhow::Result<()> {
    for _ in 0..20 {
        let e2e = E2e::new_users(1);
        let program = &e2e.user(0).program;
        let created = program.create_entry("Trip", "Paris was great").await?;
        program.accounts().await?;

        let view = program.account(created.address);
        view.account_query().await?;
        let handle = view.cancel_handle();

        // The cancel lands while the update is being signed, and the ledger confirms at once,
        // so both are ready by the first confirmation check.
        let ((), result) = futures::join!(
            async {
                tokio::task::yield_now().await;
                handle.cancel();
            },
            view.update_entry("Paris was amazing"),
        );

        let receipt = result?;
        assert_eq!(receipt.kind, MutationKind::Update);
        let cache = program.cache();
        assert_eq!(
            cache.peek(&cache.accounts_key()).unwrap().status,
            CacheStatus::Stale
        );
        assert_eq!(
            cache.peek(view.query_key()).unwrap().status,
            CacheStatus::Stale
        );
        assert_eq!(program.accounts().await?[0].entry.message, "Paris was amazing");
    }

    Ok(())
}

#[tokio::test]
async fn cancelled_views_send_nothing() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let user = e2e.user(0);
    let receipt = user.program.create_entry("Trip", "Paris was great").await?;
    e2e.ledger.set_withhold_confirmations(true);

    let view = user.program.account(receipt.address);
    view.cancel_handle().cancel();
    assert_eq!(
        view.update_entry("Paris was amazing").await,
        Err(JournalError::MutationCancelled {
            address: receipt.address
        })
    );
    assert_eq!(
        view.delete_entry().await,
        Err(JournalError::MutationCancelled {
            address: receipt.address
        })
    );

    e2e.ledger.land_pending();
    drop(view);
    let entry = user.program.account(receipt.address).account_query().await?;
    assert_eq!(entry.message, "Paris was great");

    Ok(())
}

#[tokio::test]
async fn dropping_a_view_cancels_its_waits() {
    let e2e = E2e::new_users(1);
    let view = e2e.user(0).program.account(Address::new_unique());
    let cancellation = view.cancel_handle().cancellation();

    drop(view);
    tokio::time::timeout(std::time::Duration::from_secs(1), cancellation.cancelled())
        .await
        .expect("drop cancels");
}

#[tokio::test]
async fn one_mutation_per_entry_at_a_time() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let user = e2e.user(0);
    let receipt = user.program.create_entry("Trip", "Paris").await?;
    let executor = user.program.executor();

    let (first, second) = tokio::join!(
        executor.execute(JournalMutation::update("Trip", "Rome"), user.address, None),
        executor.execute(JournalMutation::update("Trip", "Lisbon"), user.address, None),
    );

    assert_eq!(first?.address, receipt.address);
    assert_eq!(
        second,
        Err(JournalError::MutationInFlight {
            address: receipt.address
        })
    );
    assert!(!executor.is_in_flight(&receipt.address));

    Ok(())
}
