use std::time::Duration;

use journal_client::{
    cache::{
        CacheNotification,
        CacheStatus,
        JournalEvent,
    },
    e2e_helpers::E2e,
    error::JournalError,
};
use journal_interface::state::JOURNAL_ENTRY_DISCRIMINATOR;
use solana_account::Account;
use solana_address::Address;

#[tokio::test]
async fn confirmed_mutations_show_up_on_the_next_read() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;

    assert!(program.accounts().await?.is_empty());
    let key = program.cache().accounts_key();
    assert_eq!(program.cache().peek(&key).unwrap().status, CacheStatus::Fresh);

    let receipt = program.create_entry("Trip", "Paris was great").await?;
    assert_eq!(program.cache().peek(&key).unwrap().status, CacheStatus::Stale);
    assert_eq!(program.accounts().await?.len(), 1);

    program
        .account(receipt.address)
        .update_entry("Paris was amazing")
        .await?;
    assert_eq!(program.accounts().await?[0].entry.message, "Paris was amazing");

    program.account(receipt.address).delete_entry().await?;
    assert!(program.accounts().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn mutations_notify_subscribers_with_their_cause() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let user = e2e.user(0);
    let mut notifications = user.program.subscribe();

    let receipt = user.program.create_entry("Trip", "Paris was great").await?;
    let cause = Some(JournalEvent::Created {
        address: receipt.address,
        owner: user.address,
        title: "Trip".into(),
    });

    assert_eq!(
        notifications.try_recv()?,
        CacheNotification::Invalidated {
            key: user.program.cache().accounts_key(),
            cause: cause.clone(),
        }
    );
    assert_eq!(
        notifications.try_recv()?,
        CacheNotification::Invalidated {
            key: user.program.cache().account_key(receipt.address),
            cause,
        }
    );

    Ok(())
}

#[tokio::test]
async fn failed_mutations_leave_the_cache_alone() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;

    program.create_entry("Trip", "Paris was great").await?;
    let before = program.accounts().await?;
    let key = program.cache().accounts_key();
    let mut notifications = program.subscribe();

    assert!(matches!(
        program.create_entry("Trip", "Rome").await,
        Err(JournalError::AlreadyExists { .. })
    ));

    assert_eq!(program.cache().peek(&key).unwrap().status, CacheStatus::Fresh);
    assert!(notifications.try_recv().is_err());
    let fetches = e2e.ledger.calls().get_program_accounts;
    assert_eq!(program.accounts().await?, before);
    assert_eq!(e2e.ledger.calls().get_program_accounts, fetches);

    Ok(())
}

#[tokio::test]
async fn concurrent_reads_share_one_fetch() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;
    e2e.ledger.set_read_delay(Some(Duration::from_millis(20)));

    let (a, b, c) = tokio::join!(program.accounts(), program.accounts(), program.accounts());
    assert_eq!(a?, b?);
    assert!(c?.is_empty());
    assert_eq!(e2e.ledger.calls().get_program_accounts, 1);

    Ok(())
}

#[tokio::test]
async fn other_users_changes_appear_after_refresh() -> anyhow::Result<()> {
    let e2e = E2e::new_users(2);
    let (writer, reader) = (e2e.user(0), e2e.user(1));

    assert!(reader.program.accounts().await?.is_empty());
    writer.program.create_entry("Trip", "Paris").await?;

    // The reader's cache knows nothing about the writer's mutation until it refreshes.
    assert!(reader.program.accounts().await?.is_empty());
    assert_eq!(reader.program.refresh().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn undecodable_accounts_are_skipped_not_fatal() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;
    program.create_entry("Trip", "Paris").await?;

    let corrupt = Address::new_unique();
    let mut data = JOURNAL_ENTRY_DISCRIMINATOR.to_vec();
    data.extend_from_slice(&[1, 2, 3]);
    e2e.ledger.set_account(
        corrupt,
        Account {
            lamports: 1,
            data,
            owner: *program.program_id(),
            executable: false,
            rent_epoch: 0,
        },
    );

    let listing = program.account_listing().await?;
    assert_eq!(listing.entries.len(), 1);
    assert_eq!(listing.entries[0].entry.title, "Trip");
    assert!(matches!(
        listing.skipped.as_slice(),
        [JournalError::DecodeError { address, .. }] if *address == corrupt
    ));

    Ok(())
}

#[tokio::test]
async fn listings_are_sorted_by_title() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;
    for title in ["Zurich", "Athens", "Madrid"] {
        program.create_entry(title, "visited").await?;
    }

    let titles: Vec<_> = program
        .accounts()
        .await?
        .into_iter()
        .map(|account| account.entry.title)
        .collect();
    assert_eq!(titles, ["Athens", "Madrid", "Zurich"]);

    Ok(())
}

#[tokio::test]
async fn dropping_a_view_discards_its_entry() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;
    let receipt = program.create_entry("Trip", "Paris").await?;

    let view = program.account(receipt.address);
    view.account_query().await?;
    let key = view.query_key().clone();
    assert_eq!(program.cache().peek(&key).unwrap().status, CacheStatus::Fresh);

    let mut notifications = program.subscribe();
    drop(view);
    assert!(program.cache().peek(&key).is_none());
    assert_eq!(
        notifications.try_recv()?,
        CacheNotification::Discarded { key }
    );

    Ok(())
}

#[tokio::test]
async fn entries_stay_cached_while_another_view_is_open() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;
    let receipt = program.create_entry("Trip", "Paris").await?;

    let first = program.account(receipt.address);
    let second = program.account(receipt.address);
    first.account_query().await?;
    let key = first.query_key().clone();

    drop(first);
    assert_eq!(program.cache().peek(&key).unwrap().status, CacheStatus::Fresh);
    let fetches = e2e.ledger.calls().get_account;
    assert_eq!(second.account_query().await?.message, "Paris");
    assert_eq!(e2e.ledger.calls().get_account, fetches);

    drop(second);
    assert!(program.cache().peek(&key).is_none());

    Ok(())
}

#[tokio::test]
async fn program_probe_tells_undeployed_from_empty() -> anyhow::Result<()> {
    let deployed = E2e::new_users(1);
    let program = &deployed.user(0).program;
    let info = program.get_program_account().await?.expect("program is deployed");
    assert!(info.executable);
    assert!(program.accounts().await?.is_empty());

    let ledger = journal_client::e2e_helpers::InMemoryLedger::without_program(
        *program.program_id(),
    );
    let undeployed = E2e::with_ledger(ledger, 1);
    let program = &undeployed.user(0).program;
    assert_eq!(program.get_program_account().await?, None);
    assert!(program.accounts().await?.is_empty());

    Ok(())
}
