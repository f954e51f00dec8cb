//! One bank account per authenticated user, created on demand.

use bankcore_core::{AccountId, BankError, BankResult, Uid};
use bankcore_store::{
    DocumentStore, DocumentStoreExt, Query, RetryPolicy, SortOrder, StoreError, Tx, run_atomic,
};

use crate::counter::{ACCOUNT_NUMBER_SEQUENCE, allocate_in};
use crate::identifier::AccountNumber;
use crate::input::required_text;
use crate::records::{self, Account};

pub const DEFAULT_AGENCY: &str = "0001";

/// Input to [`AccountProvisioner::ensure_account`].
#[derive(Debug, Clone, Copy)]
pub struct EnsureAccount<'a> {
    pub uid: &'a Uid,
    pub owner_name: Option<&'a str>,
    pub owner_email: Option<&'a str>,
    pub allow_create: bool,
}

/// Validated owner fields of a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OwnerDetails {
    pub name: String,
    /// Lowercased.
    pub email: String,
}

impl OwnerDetails {
    pub(crate) fn parse(name: Option<&str>, email: Option<&str>) -> BankResult<Self> {
        Ok(Self {
            name: required_text("ownerName", name)?,
            email: required_text("ownerEmail", email)?.to_lowercase(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub account: Account,
    /// `false` when the caller already had an account.
    pub created: bool,
}

pub(crate) fn by_uid(uid: &Uid) -> Query {
    Query::of::<Account>()
        .where_eq("uid", uid.as_str())
        .order_by("createdAt", SortOrder::Ascending)
}

pub(crate) fn by_number(number: &AccountNumber) -> Query {
    Query::of::<Account>().where_eq("accountNumber", number.as_str())
}

pub(crate) fn account_for_uid<S>(store: &S, uid: &Uid) -> Result<Option<Account>, StoreError>
where
    S: DocumentStore + ?Sized,
{
    Ok(store.find::<Account>(&by_uid(uid).limit(1))?.into_iter().next())
}

#[derive(Debug, Clone)]
pub struct AccountProvisioner<S> {
    store: S,
    retry: RetryPolicy,
    agency: String,
}

impl<S: DocumentStore> AccountProvisioner<S> {
    pub fn new(store: S, retry: RetryPolicy, agency: impl Into<String>) -> Self {
        Self {
            store,
            retry,
            agency: agency.into(),
        }
    }

    /// Return the caller's account, creating it when allowed.
    ///
    /// The existence check, the number allocation and the insert commit as one unit,
    /// so concurrent first calls for the same uid yield a single account.
    pub fn ensure_account(&self, request: EnsureAccount<'_>) -> BankResult<Provisioned> {
        if let Some(account) = self.find_by_uid(request.uid)? {
            return Ok(Provisioned {
                account,
                created: false,
            });
        }

        if !request.allow_create {
            return Err(BankError::not_found(
                "no bank account exists for the authenticated user",
            ));
        }

        let owner = OwnerDetails::parse(request.owner_name, request.owner_email)?;
        let provisioned = run_atomic(&self.store, self.retry, |tx| {
            self.ensure_in(tx, request.uid, &Ok(owner.clone()))
        })?;

        if provisioned.created {
            tracing::info!(
                uid = %request.uid,
                account_number = %provisioned.account.account_number,
                "bank account created"
            );
        }

        Ok(provisioned)
    }

    /// Existence check and, when absent, account creation inside an open unit of
    /// work. `owner` is only consulted when an account has to be created.
    pub(crate) fn ensure_in(
        &self,
        tx: &mut Tx<'_>,
        uid: &Uid,
        owner: &BankResult<OwnerDetails>,
    ) -> BankResult<Provisioned> {
        if let Some(account) = tx.find_one::<Account>(by_uid(uid))? {
            return Ok(Provisioned {
                account,
                created: false,
            });
        }
        let owner = owner.clone()?;

        let serial = allocate_in(tx, ACCOUNT_NUMBER_SEQUENCE)?;
        let now = records::now();
        let account = Account {
            id: AccountId::new(),
            uid: uid.clone(),
            account_number: AccountNumber::from_serial(serial)?,
            agency: self.agency.clone(),
            balance_in_cents: 0,
            owner_name: owner.name,
            owner_email: owner.email,
            created_at: now,
            updated_at: now,
        };
        tx.put(&account)?;

        Ok(Provisioned {
            account,
            created: true,
        })
    }

    pub fn find_by_uid(&self, uid: &Uid) -> BankResult<Option<Account>> {
        Ok(account_for_uid(&self.store, uid)?)
    }

    pub fn find_by_number(&self, number: &AccountNumber) -> BankResult<Option<Account>> {
        Ok(self
            .store
            .find::<Account>(&by_number(number).limit(1))?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{store, uid};

    fn request<'a>(uid: &'a Uid, allow_create: bool) -> EnsureAccount<'a> {
        EnsureAccount {
            uid,
            owner_name: Some("  Ada Lovelace "),
            owner_email: Some(" Ada@Example.COM "),
            allow_create,
        }
    }

    #[test]
    fn first_call_creates_with_normalized_owner() {
        let provisioner = AccountProvisioner::new(store(), RetryPolicy::default(), DEFAULT_AGENCY);
        let ada = uid("ada");

        let provisioned = provisioner.ensure_account(request(&ada, true)).unwrap();

        assert!(provisioned.created);
        let account = provisioned.account;
        assert_eq!(account.account_number.as_str(), "000001-9");
        assert_eq!(account.agency, "0001");
        assert_eq!(account.balance_in_cents, 0);
        assert_eq!(account.owner_name, "Ada Lovelace");
        assert_eq!(account.owner_email, "ada@example.com");
        assert_eq!(account.created_at, account.updated_at);
    }

    #[test]
    fn second_call_returns_existing_account() {
        let provisioner = AccountProvisioner::new(store(), RetryPolicy::default(), DEFAULT_AGENCY);
        let ada = uid("ada");

        let first = provisioner.ensure_account(request(&ada, true)).unwrap();
        let second = provisioner.ensure_account(request(&ada, true)).unwrap();

        assert!(!second.created);
        assert_eq!(second.account, first.account);
        assert_eq!(
            provisioner.find_by_number(&first.account.account_number).unwrap(),
            Some(first.account)
        );
    }

    #[test]
    fn lookup_only_does_not_create() {
        let provisioner = AccountProvisioner::new(store(), RetryPolicy::default(), DEFAULT_AGENCY);
        let ada = uid("ada");

        let err = provisioner.ensure_account(request(&ada, false)).unwrap_err();
        assert!(matches!(err, BankError::NotFound(_)));
        assert_eq!(provisioner.find_by_uid(&ada).unwrap(), None);
    }

    #[test]
    fn missing_owner_details_are_rejected_without_allocating() {
        let store = store();
        let provisioner = AccountProvisioner::new(store.clone(), RetryPolicy::default(), DEFAULT_AGENCY);
        let ada = uid("ada");

        for (name, email) in [(None, Some("a@b.c")), (Some("Ada"), None), (Some(" "), Some("a@b.c"))] {
            let err = provisioner
                .ensure_account(EnsureAccount {
                    uid: &ada,
                    owner_name: name,
                    owner_email: email,
                    allow_create: true,
                })
                .unwrap_err();
            assert!(matches!(err, BankError::InvalidArgument(_)));
        }

        let counters = crate::counter::CounterAllocator::new(store, RetryPolicy::default());
        assert_eq!(counters.current(ACCOUNT_NUMBER_SEQUENCE).unwrap(), 0);
    }

    #[test]
    fn distinct_users_get_consecutive_numbers() {
        let provisioner = AccountProvisioner::new(store(), RetryPolicy::default(), DEFAULT_AGENCY);
        let (ada, bob) = (uid("ada"), uid("bob"));

        let a = provisioner.ensure_account(request(&ada, true)).unwrap().account;
        let b = provisioner.ensure_account(request(&bob, true)).unwrap().account;

        assert_eq!(a.account_number.as_str(), "000001-9");
        assert_eq!(b.account_number.as_str(), "000002-7");
    }

    #[test]
    fn concurrent_first_calls_create_one_account() {
        let store = store();
        let threads = 12;
        let provisioner = AccountProvisioner::new(store.clone(), RetryPolicy::new(threads), DEFAULT_AGENCY);
        let ada = uid("ada");

        let outcomes: Vec<Provisioned> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| scope.spawn(|| provisioner.ensure_account(request(&ada, true)).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|p| p.created).count(), 1);
        let number = &outcomes[0].account.account_number;
        assert!(outcomes.iter().all(|p| &p.account.account_number == number));

        let all = store.find::<Account>(&by_uid(&ada)).unwrap();
        assert_eq!(all.len(), 1);
    }
}
