use journal_client::{
    e2e_helpers::E2e,
    error::JournalError,
    pda::journal_entry_address,
    transactions::MutationKind,
    views::JournalEntry,
};
use journal_interface::state::JournalEntryState;

#[tokio::test]
async fn create_update_delete_trip() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let owner = e2e.user(0);
    let program = &owner.program;

    let created = program.create_entry("Trip", "Paris was great").await?;
    assert_eq!(created.kind, MutationKind::Create);
    assert_eq!(created.owner, owner.address);
    assert_eq!(
        created.address,
        journal_entry_address(&owner.address, "Trip", program.program_id())?
    );

    let accounts = program.accounts().await?;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].address, created.address);
    assert_eq!(
        accounts[0].entry,
        JournalEntry {
            owner: owner.address,
            title: "Trip".into(),
            message: "Paris was great".into(),
        }
    );

    let view = program.account(created.address);
    let updated = view.update_entry("Paris was amazing").await?;
    assert_eq!(updated.kind, MutationKind::Update);
    assert_eq!(updated.address, created.address);

    let entry = view.account_query().await?;
    assert_eq!(entry.owner, owner.address);
    assert_eq!(entry.title, "Trip");
    assert_eq!(entry.message, "Paris was amazing");

    view.delete_entry().await?;
    assert!(program.accounts().await?.is_empty());
    assert_eq!(
        view.account_query().await,
        Err(JournalError::NotFound {
            address: created.address
        })
    );
    assert!(e2e.ledger.account(&created.address).is_none());

    Ok(())
}

#[tokio::test]
async fn duplicate_create_is_rejected_and_changes_nothing() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;

    let receipt = program.create_entry("Trip", "Paris was great").await?;
    let before = e2e.ledger.account(&receipt.address);

    let second = program.create_entry("Trip", "Rome was better").await;
    assert_eq!(
        second,
        Err(JournalError::AlreadyExists {
            address: receipt.address
        })
    );
    assert_eq!(e2e.ledger.account(&receipt.address), before);
    assert_eq!(
        program.account(receipt.address).account_query().await?.message,
        "Paris was great"
    );

    Ok(())
}

#[tokio::test]
async fn same_title_different_owners_are_separate_entries() -> anyhow::Result<()> {
    let e2e = E2e::new_users(2);

    let first = e2e.user(0).program.create_entry("Trip", "Paris").await?;
    let second = e2e.user(1).program.create_entry("Trip", "Lisbon").await?;
    assert_ne!(first.address, second.address);

    let accounts = e2e.user(0).program.refresh().await?;
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|account| account.entry.title == "Trip"));

    Ok(())
}

#[tokio::test]
async fn only_the_owner_can_update_or_delete() -> anyhow::Result<()> {
    let e2e = E2e::new_users(2);
    let (owner, intruder) = (e2e.user(0), e2e.user(1));

    let receipt = owner.program.create_entry("Trip", "Paris was great").await?;
    let before = e2e.ledger.account(&receipt.address);

    let view = intruder.program.account(receipt.address);
    assert_eq!(
        view.update_entry("Paris was awful").await,
        Err(JournalError::Unauthorized {
            address: receipt.address
        })
    );
    assert_eq!(
        view.delete_entry().await,
        Err(JournalError::Unauthorized {
            address: receipt.address
        })
    );

    assert_eq!(e2e.ledger.account(&receipt.address), before);
    let state = JournalEntryState::unpack(&e2e.ledger.account(&receipt.address).unwrap().data)?;
    assert_eq!(state.message, "Paris was great");

    Ok(())
}

#[tokio::test]
async fn reading_a_missing_entry_is_not_found() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let user = e2e.user(0);

    let view = user.program.account_for(&user.address, "Nowhere")?;
    assert_eq!(
        view.account_query().await,
        Err(JournalError::NotFound {
            address: *view.address()
        })
    );
    assert_eq!(
        view.delete_entry().await,
        Err(JournalError::NotFound {
            address: *view.address()
        })
    );

    Ok(())
}

#[tokio::test]
async fn invalid_input_never_reaches_the_ledger() {
    let e2e = E2e::new_users(1);
    let program = &e2e.user(0).program;

    let long_title = "t".repeat(33);
    assert!(matches!(
        program.create_entry(&long_title, "message").await,
        Err(JournalError::InvalidInput(_))
    ));
    assert!(matches!(
        program.create_entry("", "message").await,
        Err(JournalError::InvalidInput(_))
    ));
    assert!(matches!(
        program.create_entry("Trip", &"m".repeat(1001)).await,
        Err(JournalError::InvalidInput(_))
    ));
    assert_eq!(e2e.ledger.calls().get_signature_status, 0);
}

#[tokio::test]
async fn rejected_signatures_and_outages_surface_as_errors() -> anyhow::Result<()> {
    let e2e = E2e::new_users(1);
    let user = e2e.user(0);

    user.submitter.set_reject(true);
    assert_eq!(
        user.program.create_entry("Trip", "Paris").await,
        Err(JournalError::UserRejected)
    );
    user.submitter.set_reject(false);

    e2e.ledger.set_offline(true);
    assert!(matches!(
        user.program.create_entry("Trip", "Paris").await,
        Err(JournalError::NetworkUnavailable(_))
    ));
    assert!(matches!(
        user.program.accounts().await,
        Err(JournalError::NetworkUnavailable(_))
    ));
    e2e.ledger.set_offline(false);

    assert!(user.program.accounts().await?.is_empty());
    Ok(())
}
