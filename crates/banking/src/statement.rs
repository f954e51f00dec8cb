//! Read-side views over the ledger: paged statements and calendar-year groupings.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use bankcore_core::{BankError, BankResult, Uid};
use bankcore_store::{DocumentStore, DocumentStoreExt, Query, SortOrder};

use crate::account::account_for_uid;
use crate::identifier::AccountNumber;
use crate::records::LedgerEntry;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementPage {
    pub items: Vec<LedgerEntry>,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyEntries {
    /// 1 = January.
    pub month: u32,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyStatement {
    pub year: i32,
    pub account_number: AccountNumber,
    /// Always twelve buckets, January first.
    pub months: Vec<MonthlyEntries>,
}

pub fn validate_page(page: u32, page_size: u32) -> BankResult<()> {
    if page < 1 {
        return Err(BankError::invalid_argument("page must be at least 1"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(BankError::invalid_argument(format!(
            "pageSize must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok(())
}

pub fn validate_year(year: i32) -> BankResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(BankError::invalid_argument(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }
    Ok(())
}

fn start_of_year(year: i32) -> BankResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| BankError::invalid_argument(format!("year {year} is not representable")))
}

#[derive(Debug, Clone)]
pub struct StatementPaginator<S> {
    store: S,
}

impl<S: DocumentStore> StatementPaginator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Entries of one account, newest first.
    pub fn page(&self, account_number: &AccountNumber, page: u32, page_size: u32) -> BankResult<StatementPage> {
        validate_page(page, page_size)?;

        let size = page_size as usize;
        let offset = (page as usize - 1)
            .checked_mul(size)
            .ok_or_else(|| BankError::invalid_argument("page is out of range"))?;

        // One extra row tells us whether another page exists.
        let query = Query::of::<LedgerEntry>()
            .where_eq("accountNumber", account_number.as_str())
            .order_by("timestamp", SortOrder::Descending)
            .offset(offset)
            .limit(size + 1);

        let mut items = self.store.find::<LedgerEntry>(&query)?;
        let has_more = items.len() > size;
        items.truncate(size);

        tracing::debug!(
            account_number = %account_number,
            page,
            page_size,
            returned = items.len(),
            has_more,
            "statement page read"
        );

        Ok(StatementPage {
            items,
            page,
            page_size,
            has_more,
        })
    }

    /// Calendar-year view of the caller's own account.
    pub fn yearly(&self, uid: &Uid, year: i32) -> BankResult<YearlyStatement> {
        validate_year(year)?;
        let account = account_for_uid(&self.store, uid)?
            .ok_or_else(|| BankError::not_found("no bank account exists for the authenticated user"))?;
        self.yearly_for(&account.account_number, year)
    }

    /// Entries of `[year-01-01, (year+1)-01-01)` UTC bucketed by month, each bucket
    /// oldest first.
    pub fn yearly_for(&self, account_number: &AccountNumber, year: i32) -> BankResult<YearlyStatement> {
        validate_year(year)?;
        let from = start_of_year(year)?;
        let until = start_of_year(year + 1)?;

        let query = Query::of::<LedgerEntry>()
            .where_eq("accountNumber", account_number.as_str())
            .where_gte("timestamp", from.timestamp_micros())
            .where_lt("timestamp", until.timestamp_micros())
            .order_by("timestamp", SortOrder::Ascending);

        let mut months: Vec<MonthlyEntries> = (1..=12)
            .map(|month| MonthlyEntries {
                month,
                entries: Vec::new(),
            })
            .collect();

        for entry in self.store.find::<LedgerEntry>(&query)? {
            let index = entry.timestamp.month0() as usize;
            months[index].entries.push(entry);
        }

        Ok(YearlyStatement {
            year,
            account_number: account_number.clone(),
            months,
        })
    }
}
