//! A command line front end for journal entries: lists, shows, creates, updates and deletes
//! entries of the journal program on a cluster.

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use journal_client::{
    eprint_kv,
    ledger::RpcLedger,
    print_kv,
    program::JournalProgram,
    submitter::SignerSubmitter,
    transactions::MutationReceipt,
    views::JournalAccount,
    LogColor,
};
use solana_keypair::Keypair;

use crate::cli::{
    CliArgs,
    Command,
};

pub mod cli;
pub mod load_env;

type Program = JournalProgram<RpcLedger, SignerSubmitter<Keypair>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = args.journal_config();

    let keypair = match load_env::signer_keypair(args.keypair.as_deref())? {
        Some(keypair) => keypair,
        // Reads never sign, so any identity will do.
        None if !args.command.needs_signer() => Keypair::new(),
        None => anyhow::bail!(
            "This command needs a signer: pass --keypair or set {}",
            load_env::KEYPAIR_ENV_VAR
        ),
    };

    let ledger = RpcLedger::new_from_url(&config.rpc_url, config.confirmation.commitment);
    let submitter = SignerSubmitter::new(keypair, ledger.client.clone());
    let program = JournalProgram::new(config, ledger, submitter);

    if let Err(e) = run(&program, args.command).await {
        eprint_kv!("Error", format!("{e:#}"), LogColor::Error);
        if let Some(signature) = e
            .downcast_ref::<journal_client::error::JournalError>()
            .and_then(|e| e.signature())
        {
            eprint_kv!("Look up signature", signature, LogColor::Warning);
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(program: &Program, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Program => {
            let config = program.config();
            print_kv!("Cluster", config.cluster);
            print_kv!("RPC URL", config.rpc_url);
            print_kv!("Program id", config.program_id);
            match program
                .get_program_account()
                .await
                .context("Couldn't look up the program account")?
            {
                Some(info) => {
                    print_kv!("Deployed", "yes", LogColor::Success);
                    print_kv!("Executable", info.executable);
                    print_kv!("Owner", info.owner);
                    print_kv!("Lamports", info.lamports);
                }
                None => print_kv!("Deployed", "no", LogColor::Warning),
            }
        }
        Command::List => {
            let listing = program
                .account_listing()
                .await
                .context("Couldn't list journal entries")?;
            if listing.entries.is_empty() {
                println!("{}", "No journal entries.".dimmed());
            }
            for account in listing.entries.iter() {
                print_account(account);
            }
            if !listing.skipped.is_empty() {
                eprint_kv!(
                    "Undecodable accounts",
                    listing.skipped.len(),
                    LogColor::Warning
                );
            }
        }
        Command::Show { title, owner } => {
            let owner = owner.unwrap_or_else(|| program.identity());
            let view = program.account_for(&owner, &title)?;
            let entry = view.account_query().await?;
            print_account(&JournalAccount {
                address: *view.address(),
                entry,
            });
        }
        Command::Create { title, message } => {
            print_receipt(&program.create_entry(&title, &message).await?);
        }
        Command::Update { title, message } => {
            let view = program.account_for(&program.identity(), &title)?;
            print_receipt(&view.update_entry(&message).await?);
        }
        Command::Delete { title } => {
            let view = program.account_for(&program.identity(), &title)?;
            print_receipt(&view.delete_entry().await?);
        }
    }

    Ok(())
}

fn print_account(account: &JournalAccount) {
    println!("{}", account.entry.title.bold());
    print_kv!("  Address", account.address, LogColor::FadedGray);
    print_kv!("  Owner", account.entry.owner, LogColor::FadedGray);
    print_kv!("  Message", account.entry.message, LogColor::Info);
}

fn print_receipt(receipt: &MutationReceipt) {
    print_kv!(
        format!("{} {}", receipt.kind, receipt.title.bold()),
        "confirmed",
        LogColor::Success
    );
    print_kv!("  Address", receipt.address, LogColor::FadedGray);
    print_kv!("  Signature", receipt.signature, LogColor::FadedGray);
    print_kv!(
        "  Took",
        format!(
            "{}ms",
            (receipt.confirmed_at - receipt.started_at).num_milliseconds()
        ),
        LogColor::FadedGray
    );
}
