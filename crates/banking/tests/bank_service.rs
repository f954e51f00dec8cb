use std::sync::Arc;

use chrono::{Datelike, Utc};

use bankcore_banking::{Bank, BankConfig, CardType, TransactionType};
use bankcore_core::{BankError, Identity, Uid};
use bankcore_store::{InMemoryDocumentStore, StoreConfig};

fn bank() -> Bank<Arc<InMemoryDocumentStore>> {
    Bank::in_memory(&BankConfig::default())
}

fn person(uid: &str, name: &str) -> Identity {
    Identity::new(Uid::new(uid).unwrap())
        .with_display_name(name)
        .with_email(format!("{uid}@example.com"))
}

#[test]
fn every_operation_requires_an_identity() {
    let bank = bank();

    assert_eq!(bank.create_account(None, Some("Ada")).unwrap_err(), BankError::Unauthenticated);
    assert_eq!(bank.account_details(None).unwrap_err(), BankError::Unauthenticated);
    assert_eq!(
        bank.perform_transaction(None, "000001-9", 100, "DEPOSIT", None).unwrap_err(),
        BankError::Unauthenticated
    );
    assert_eq!(bank.statement(None, None, None, None).unwrap_err(), BankError::Unauthenticated);
    assert_eq!(bank.yearly_transactions(None, None, None).unwrap_err(), BankError::Unauthenticated);
    assert_eq!(bank.create_card(None, "DEBIT", None, None).unwrap_err(), BankError::Unauthenticated);
    assert_eq!(bank.list_cards(None).unwrap_err(), BankError::Unauthenticated);
    assert_eq!(bank.delete_card(None, "x").unwrap_err(), BankError::Unauthenticated);
    assert_eq!(bank.card_transactions(None, "x", None).unwrap_err(), BankError::Unauthenticated);
    assert_eq!(bank.health_check(None).unwrap_err(), BankError::Unauthenticated);
}

#[test]
fn account_lifecycle() {
    let bank = bank();
    let ada = person("ada", "Ada Lovelace");

    let created = bank.create_account(Some(&ada), None).unwrap();
    assert!(created.created);
    assert_eq!(created.account.account_number.as_str(), "000001-9");
    assert_eq!(created.account.owner_name, "Ada Lovelace");

    let again = bank.create_account(Some(&ada), Some("Someone Else")).unwrap();
    assert!(!again.created);
    assert_eq!(again.account, created.account);

    assert_eq!(bank.account_details(Some(&ada)).unwrap(), created.account);
    assert!(matches!(
        bank.account_details(Some(&person("bob", "Bob"))),
        Err(BankError::NotFound(_))
    ));
}

#[test]
fn transactions_and_statement() {
    let bank = bank();
    let ada = person("ada", "Ada");
    let number = bank.create_account(Some(&ada), None).unwrap().account.account_number;

    for amount in [1_000u64, 2_000, 3_000] {
        bank.perform_transaction(Some(&ada), number.as_str(), amount, "deposit", None)
            .unwrap();
    }
    let receipt = bank
        .perform_transaction(Some(&ada), number.as_str(), 500, "WITHDRAWAL", Some("rent"))
        .unwrap();
    assert_eq!(receipt.new_balance_in_cents, 5_500);

    let page = bank.statement(Some(&ada), Some(number.as_str()), Some(1), Some(3)).unwrap();
    assert_eq!(page.items.len(), 3);
    assert!(page.has_more);
    assert_eq!(page.items[0].id, receipt.transaction_id);
    assert_eq!(page.items[0].kind, TransactionType::Withdrawal);

    let defaults = bank.statement(Some(&ada), None, None, None).unwrap();
    assert_eq!((defaults.page, defaults.page_size), (1, 10));
    assert_eq!(defaults.items.len(), 4);
    assert!(!defaults.has_more);

    let yearly = bank.yearly_transactions(Some(&ada), None, None).unwrap();
    assert_eq!(yearly.year, Utc::now().year());
    assert_eq!(yearly.months.len(), 12);
    let this_month = Utc::now().month0() as usize;
    assert_eq!(yearly.months[this_month].entries.len(), 4);
}

#[test]
fn caller_input_is_validated() {
    let bank = bank();
    let ada = person("ada", "Ada");
    let number = bank.create_account(Some(&ada), None).unwrap().account.account_number;

    let invalid = |result: Result<_, BankError>| matches!(result, Err(BankError::InvalidArgument(_)));

    assert!(invalid(bank.perform_transaction(Some(&ada), "123", 100, "DEPOSIT", None).map(|_| ())));
    assert!(invalid(bank.perform_transaction(Some(&ada), number.as_str(), 100, "TRANSFER", None).map(|_| ())));
    assert!(invalid(bank.perform_transaction(Some(&ada), number.as_str(), 0, "DEPOSIT", None).map(|_| ())));
    assert!(invalid(bank.statement(Some(&ada), None, Some(0), None).map(|_| ())));
    assert!(invalid(bank.statement(Some(&ada), None, None, Some(51)).map(|_| ())));
    assert!(invalid(bank.yearly_transactions(Some(&ada), Some(1899), None).map(|_| ())));
    assert!(invalid(bank.create_card(Some(&ada), "PLATINUM", None, None).map(|_| ())));
    assert!(invalid(bank.delete_card(Some(&ada), "not-a-card-id").map(|_| ())));
    assert!(invalid(bank.card_transactions(Some(&ada), "not-a-card-id", None).map(|_| ())));
}

#[test]
fn callers_cannot_touch_other_accounts() {
    let bank = bank();
    let ada = person("ada", "Ada");
    let bob = person("bob", "Bob");
    let ada_number = bank.create_account(Some(&ada), None).unwrap().account.account_number;
    bank.create_account(Some(&bob), None).unwrap();
    bank.perform_transaction(Some(&ada), ada_number.as_str(), 100, "DEPOSIT", None)
        .unwrap();

    let denied = |result: Result<(), BankError>| matches!(result, Err(BankError::PermissionDenied(_)));
    assert!(denied(bank.perform_transaction(Some(&bob), ada_number.as_str(), 100, "WITHDRAWAL", None).map(|_| ())));
    assert!(denied(bank.statement(Some(&bob), Some(ada_number.as_str()), None, None).map(|_| ())));
    assert!(denied(bank.yearly_transactions(Some(&bob), None, Some(ada_number.as_str())).map(|_| ())));

    let card = bank.create_card(Some(&ada), "DEBIT", None, None).unwrap();
    let card_id = card.id.to_string();
    assert!(denied(bank.delete_card(Some(&bob), &card_id).map(|_| ())));
    assert!(denied(bank.card_transactions(Some(&bob), &card_id, None).map(|_| ())));

    assert_eq!(bank.account_details(Some(&ada)).unwrap().balance_in_cents, 100);
}

#[test]
fn statement_without_account_is_not_found() {
    let bank = bank();
    let ghost = person("ghost", "Ghost");
    assert!(matches!(
        bank.statement(Some(&ghost), None, None, None),
        Err(BankError::NotFound(_))
    ));
    assert!(matches!(
        bank.yearly_transactions(Some(&ghost), Some(2024), None),
        Err(BankError::NotFound(_))
    ));
}

#[test]
fn card_lifecycle() {
    let bank = bank();
    let ada = person("ada", "Ada");

    let credit = bank.create_card(Some(&ada), "credit", Some("Travel"), None).unwrap();
    let virtual_card = bank.create_card(Some(&ada), "VIRTUAL", None, Some("Nimbus")).unwrap();
    assert_eq!(credit.card_type, CardType::Credit);
    assert_eq!(credit.card_number.as_str(), "6375120000000001");
    assert_eq!(virtual_card.card_number.as_str(), "6375120000000002");
    assert_eq!(virtual_card.brand, "Nimbus");

    // The first card opened the account.
    let account = bank.account_details(Some(&ada)).unwrap();
    assert_eq!(credit.account_number, account.account_number);

    let listed: Vec<_> = bank.list_cards(Some(&ada)).unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(listed, vec![virtual_card.id, credit.id]);

    assert!(bank.card_transactions(Some(&ada), &credit.id.to_string(), None).unwrap().is_empty());

    assert_eq!(bank.delete_card(Some(&ada), &credit.id.to_string()).unwrap(), 0);
    let listed: Vec<_> = bank.list_cards(Some(&ada)).unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(listed, vec![virtual_card.id]);
    assert!(matches!(
        bank.delete_card(Some(&ada), &credit.id.to_string()),
        Err(BankError::NotFound(_))
    ));
}

#[test]
fn configured_card_policy_is_applied() {
    let config = BankConfig::from_lookup(|key| match key {
        "BANKCORE_CARD_PREFIX" => Some("400000".to_string()),
        "BANKCORE_CREDIT_LIMIT_CENTS" => Some("90000".to_string()),
        "BANKCORE_INVOICE_DUE_DAY" => Some("5".to_string()),
        _ => None,
    });
    let bank = Bank::in_memory(&config);
    let ada = person("ada", "Ada");

    let card = bank.create_card(Some(&ada), "CREDIT", None, None).unwrap();
    assert_eq!(card.card_number.as_str(), "4000000000000001");
    assert_eq!(card.credit_limit_in_cents, Some(90_000));
    assert_eq!(card.available_limit_in_cents, Some(90_000));
    assert_eq!(card.invoice_due_date.as_deref(), Some("5"));
}

#[test]
fn health_check_writes_a_fresh_record() {
    let bank = bank();
    let ada = person("ada", "Ada");

    let first = bank.health_check(Some(&ada)).unwrap();
    let second = bank.health_check(Some(&ada)).unwrap();
    assert_ne!(first, second);
}

#[test]
fn concurrent_first_requests_share_one_account() {
    let config = BankConfig {
        store: StoreConfig {
            max_transaction_attempts: 1_000,
        },
        ..BankConfig::default()
    };
    let bank = Bank::in_memory(&config);
    let ada = person("ada", "Ada");

    let numbers: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let (bank, ada) = (&bank, &ada);
                scope.spawn(move || {
                    if i % 2 == 0 {
                        bank.create_account(Some(ada), None).unwrap().account.account_number.to_string()
                    } else {
                        bank.create_card(Some(ada), "DEBIT", None, None).unwrap().account_number.to_string()
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(numbers.iter().all(|n| n == "000001-9"));
    assert_eq!(bank.list_cards(Some(&ada)).unwrap().len(), 4);
    assert_eq!(
        bank.counters().current(bankcore_banking::counter::ACCOUNT_NUMBER_SEQUENCE).unwrap(),
        1
    );
}
