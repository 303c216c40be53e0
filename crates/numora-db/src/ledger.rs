//! Ledger Store and Transaction Log.
//!
//! A balance never moves without exactly one audit entry: `post` applies the
//! signed delta and appends the log row on the same transaction handle, and
//! callers only reach it from inside `Database::with_tx`.

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::{debug, info};

use numora_types::api::CreditUserRequest;
use numora_types::models::{Transaction, TransactionKind, TransactionStatus};
use numora_types::{LedgerError, Result};

use crate::rows::{self, TRANSACTION_COLUMNS};
use crate::{Database, new_id, non_empty, now, ts};

pub const ADMIN_CREDIT_DESCRIPTION: &str = "administrative balance credit";

/// Recent-activity window shown in the user detail view.
pub const RECENT_TRANSACTIONS: u32 = 10;

/// Add `delta` (may be negative) to the user's balance and return the new
/// balance. Negative results are allowed.
pub(crate) fn apply_delta(conn: &Connection, user_id: &str, delta: Decimal) -> Result<Decimal> {
    let current: Option<String> = conn
        .query_row(
            "SELECT balance FROM profiles WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;

    let current = current.ok_or_else(|| LedgerError::not_found("user", user_id))?;
    let current = Decimal::from_str(&current).map_err(|e| {
        LedgerError::Storage(format!("corrupt balance for user {}: {}", user_id, e))
    })?;

    let next = current
        .checked_add(delta)
        .ok_or_else(|| LedgerError::validation("balance overflow"))?;

    conn.execute(
        "UPDATE profiles SET balance = ?1 WHERE user_id = ?2",
        (next.to_string(), user_id),
    )?;

    Ok(next)
}

/// Write-once audit entry.
pub(crate) fn append(
    conn: &Connection,
    user_id: &str,
    kind: TransactionKind,
    amount: Decimal,
    status: TransactionStatus,
    description: Option<&str>,
) -> Result<Transaction> {
    let tx = Transaction {
        id: new_id(),
        user_id: user_id.to_string(),
        kind,
        amount,
        status,
        description: description.map(str::to_string),
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO transactions (id, user_id, type, amount, status, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tx.id,
            tx.user_id,
            tx.kind.as_str(),
            tx.amount.to_string(),
            tx.status.as_str(),
            tx.description,
            ts(&tx.created_at),
        ],
    )?;

    Ok(tx)
}

/// Move money and log it. `amount` is the positive magnitude; the direction
/// comes from `kind`.
pub(crate) fn post(
    conn: &Connection,
    user_id: &str,
    kind: TransactionKind,
    amount: Decimal,
    description: Option<&str>,
) -> Result<(Decimal, Transaction)> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("ledger amounts must be positive"));
    }

    let balance = apply_delta(conn, user_id, kind.signed(amount))?;
    let entry = append(conn, user_id, kind, amount, TransactionStatus::Completed, description)?;

    debug!(
        "Posted {} {} for user {} (balance now {})",
        kind, amount, user_id, balance
    );
    Ok((balance, entry))
}

impl Database {
    /// Administrative override: always a credit, whatever the sign entered.
    pub fn credit_user(&self, user_id: &str, req: &CreditUserRequest) -> Result<Transaction> {
        let amount = req.amount.magnitude("amount")?;
        let description = non_empty(req.description.as_deref())
            .unwrap_or_else(|| ADMIN_CREDIT_DESCRIPTION.to_string());

        let (balance, entry) = self.with_tx(|tx| {
            post(tx, user_id, TransactionKind::Credit, amount, Some(description.as_str()))
        })?;

        info!("Credited {} to user {} (balance now {})", amount, user_id, balance);
        Ok(entry)
    }

    /// Generic posting for flows outside the admin commands (e.g. referral bonuses).
    pub fn post_entry(
        &self,
        user_id: &str,
        kind: TransactionKind,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Transaction> {
        self.with_tx(|tx| post(tx, user_id, kind, amount, description))
            .map(|(_, entry)| entry)
    }

    pub fn balance(&self, user_id: &str) -> Result<Decimal> {
        self.get_profile(user_id).map(|p| p.balance)
    }

    /// Most recent entries for a user, newest first.
    pub fn recent_transactions(&self, user_id: &str, limit: u32) -> Result<Vec<Transaction>> {
        self.with_conn(|conn| query_recent_transactions(conn, user_id, limit))
    }
}

pub(crate) fn query_recent_transactions(
    conn: &Connection,
    user_id: &str,
    limit: u32,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions
         WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2",
        TRANSACTION_COLUMNS
    ))?;

    let rows = stmt
        .query_map(rusqlite::params![user_id, limit], rows::transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
