//! Row mappers. Text columns holding decimals, timestamps and status enums
//! are parsed here so that malformed rows surface as conversion errors.

use std::error::Error;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use rust_decimal::Decimal;

use numora_types::models::{
    Offer, Profile, RechargeRequest, Referral, SellerSubmission, Transaction,
};

fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| conversion(idx, e))
}

fn decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    parsed(row, idx)
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

pub(crate) const PROFILE_COLUMNS: &str = "user_id, full_name, balance, referral_code, created_at";

pub(crate) fn profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: row.get(0)?,
        full_name: row.get(1)?,
        balance: decimal(row, 2)?,
        referral_code: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, user_id, type, amount, status, description, created_at";

pub(crate) fn transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: parsed(row, 2)?,
        amount: decimal(row, 3)?,
        status: parsed(row, 4)?,
        description: row.get(5)?,
        created_at: timestamp(row, 6)?,
    })
}

pub(crate) const SELLER_COLUMNS: &str =
    "id, user_id, phone_number, status, code, code_status, balance_added, created_at";

pub(crate) fn seller_submission(row: &Row<'_>) -> rusqlite::Result<SellerSubmission> {
    Ok(SellerSubmission {
        id: row.get(0)?,
        user_id: row.get(1)?,
        phone_number: row.get(2)?,
        status: parsed(row, 3)?,
        code: row.get(4)?,
        code_status: parsed(row, 5)?,
        balance_added: decimal(row, 6)?,
        created_at: timestamp(row, 7)?,
    })
}

pub(crate) const RECHARGE_COLUMNS: &str = "id, user_id, phone_number, amount, status, created_at";

pub(crate) fn recharge_request(row: &Row<'_>) -> rusqlite::Result<RechargeRequest> {
    Ok(RechargeRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        phone_number: row.get(2)?,
        amount: decimal(row, 3)?,
        status: parsed(row, 4)?,
        created_at: timestamp(row, 5)?,
    })
}

pub(crate) const OFFER_COLUMNS: &str =
    "id, title, description, image_url, priority, is_active, created_at";

pub(crate) fn offer(row: &Row<'_>) -> rusqlite::Result<Offer> {
    Ok(Offer {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        priority: row.get(4)?,
        is_active: row.get(5)?,
        created_at: timestamp(row, 6)?,
    })
}

/// Expects `referred_name` joined in as the fourth column.
pub(crate) fn referral(row: &Row<'_>) -> rusqlite::Result<Referral> {
    Ok(Referral {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        referred_id: row.get(2)?,
        referred_name: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}
