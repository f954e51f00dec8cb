use anyhow::Context;

use bankcore_banking::{Bank, BankConfig};
use bankcore_core::{Identity, Uid};

/// Walks one customer through the bank on an in-memory store and prints the results.
fn main() -> anyhow::Result<()> {
    bankcore_observability::init();

    let config = BankConfig::from_env();
    tracing::info!(agency = %config.agency, card_prefix = config.card_prefix.as_str(), "starting bankcore demo");
    let bank = Bank::in_memory(&config);

    let ada = Identity::new(Uid::new("demo-ada")?)
        .with_display_name("Ada Lovelace")
        .with_email("Ada@Example.com");
    let caller = Some(&ada);

    let account = bank.create_account(caller, None)?.account;
    bank.perform_transaction(caller, account.account_number.as_str(), 150_000, "DEPOSIT", Some("salary"))?;
    bank.perform_transaction(caller, account.account_number.as_str(), 4_990, "WITHDRAWAL", Some("groceries"))?;

    let card = bank
        .create_card(caller, "CREDIT", Some("Travel"), None)
        .context("issuing demo card")?;

    let statement = bank.statement(caller, None, None, None)?;
    let details = bank.account_details(caller)?;
    let cards = bank.list_cards(caller)?;
    let check = bank.health_check(caller)?;

    println!("{}", serde_json::to_string_pretty(&details)?);
    println!("{}", serde_json::to_string_pretty(&statement)?);
    println!("{}", serde_json::to_string_pretty(&cards)?);
    tracing::info!(card = %card.masked_number, health_check = %check, "demo finished");

    Ok(())
}
