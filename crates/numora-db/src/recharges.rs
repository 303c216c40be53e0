use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use numora_types::amount::AmountInput;
use numora_types::models::{RechargeRequest, RechargeStatus, TransactionKind};
use numora_types::{LedgerError, Result};

use crate::ledger;
use crate::rows::{self, RECHARGE_COLUMNS};
use crate::users::query_profile;
use crate::{Database, new_id, now, required, ts};

impl Database {
    /// Intake from the user-facing flow.
    pub fn create_recharge_request(
        &self,
        user_id: &str,
        phone_number: &str,
        amount: &AmountInput,
    ) -> Result<RechargeRequest> {
        let phone_number = required(phone_number, "phone_number")?;
        let amount = amount.positive("amount")?;

        self.with_tx(|tx| {
            if query_profile(tx, user_id)?.is_none() {
                return Err(LedgerError::not_found("user", user_id));
            }

            let request = RechargeRequest {
                id: new_id(),
                user_id: user_id.to_string(),
                phone_number,
                amount,
                status: RechargeStatus::Pending,
                created_at: now(),
            };
            tx.execute(
                "INSERT INTO recharge_requests (id, user_id, phone_number, amount, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    request.id,
                    request.user_id,
                    request.phone_number,
                    request.amount.to_string(),
                    request.status.as_str(),
                    ts(&request.created_at),
                ],
            )?;
            Ok(request)
        })
    }

    pub fn get_recharge_request(&self, id: &str) -> Result<RechargeRequest> {
        self.with_conn(|conn| load(conn, id))
    }

    /// Newest first.
    pub fn list_recharge_requests(&self) -> Result<Vec<RechargeRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM recharge_requests ORDER BY created_at DESC, rowid DESC",
                RECHARGE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], rows::recharge_request)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fulfil a recharge: the requested amount is *debited* from the user's
    /// balance as the cost of the top-up, and logged as `recharge_debit`.
    pub fn complete_recharge(&self, id: &str) -> Result<RechargeRequest> {
        let (request, balance) = self.with_tx(|tx| {
            let mut request = load(tx, id)?;
            request.complete()?;
            save_status(tx, &request)?;

            let (balance, _) = ledger::post(
                tx,
                &request.user_id,
                TransactionKind::RechargeDebit,
                request.amount,
                None,
            )?;
            Ok((request, balance))
        })?;

        info!(
            "Recharge {} completed, debited {} from user {} (balance now {})",
            request.id, request.amount, request.user_id, balance
        );
        Ok(request)
    }

    pub fn reject_recharge(&self, id: &str) -> Result<RechargeRequest> {
        self.with_tx(|tx| {
            let mut request = load(tx, id)?;
            request.reject()?;
            save_status(tx, &request)?;
            Ok(request)
        })
    }
}

fn load(conn: &Connection, id: &str) -> Result<RechargeRequest> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM recharge_requests WHERE id = ?1",
        RECHARGE_COLUMNS
    ))?;

    stmt.query_row([id], rows::recharge_request)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("recharge request", id))
}

fn save_status(conn: &Connection, r: &RechargeRequest) -> Result<()> {
    conn.execute(
        "UPDATE recharge_requests SET status = ?1 WHERE id = ?2",
        (r.status.as_str(), &r.id),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn setup(balance: i64, amount: &str) -> (Database, RechargeRequest) {
        let db = Database::open_in_memory().unwrap();
        db.create_profile("alice", "Alice", "ALICE1").unwrap();
        db.post_entry("alice", TransactionKind::Credit, Decimal::from(balance), None)
            .unwrap();
        let r = db
            .create_recharge_request("alice", "0700123456", &AmountInput::new(amount))
            .unwrap();
        (db, r)
    }

    #[test]
    fn test_complete_debits_and_logs() {
        let (db, r) = setup(100, "30");
        assert_eq!(r.status, RechargeStatus::Pending);

        let done = db.complete_recharge(&r.id).unwrap();
        assert_eq!(done.status, RechargeStatus::Completed);
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(70));

        let log = db.recent_transactions("alice", 10).unwrap();
        assert_eq!(log[0].kind, TransactionKind::RechargeDebit);
        assert_eq!(log[0].amount, Decimal::from(30));
        assert_eq!(log[0].signed_amount(), Decimal::from(-30));
    }

    #[test]
    fn test_terminal_states_refuse_further_transitions() {
        let (db, r) = setup(100, "30");
        db.complete_recharge(&r.id).unwrap();
        assert!(matches!(
            db.complete_recharge(&r.id),
            Err(LedgerError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            db.reject_recharge(&r.id),
            Err(LedgerError::InvalidStateTransition(_))
        ));
        // Only the one debit happened
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(70));

        let second = db
            .create_recharge_request("alice", "0700123456", &AmountInput::new("10"))
            .unwrap();
        let rejected = db.reject_recharge(&second.id).unwrap();
        assert_eq!(rejected.status, RechargeStatus::Rejected);
        assert!(matches!(
            db.complete_recharge(&second.id),
            Err(LedgerError::InvalidStateTransition(_))
        ));
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(70));
    }

    #[test]
    fn test_debit_may_go_negative() {
        let (db, r) = setup(10, "25.5");
        db.complete_recharge(&r.id).unwrap();
        assert_eq!(db.balance("alice").unwrap(), Decimal::new(-155, 1));
    }

    #[test]
    fn test_intake_validation_and_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        db.create_profile("alice", "Alice", "ALICE1").unwrap();

        for raw in ["", "0", "-3", "x"] {
            assert!(matches!(
                db.create_recharge_request("alice", "0700", &AmountInput::new(raw)),
                Err(LedgerError::Validation(_))
            ));
        }
        assert!(matches!(
            db.create_recharge_request("ghost", "0700", &AmountInput::new("5")),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            db.complete_recharge("missing"),
            Err(LedgerError::NotFound(_))
        ));
        assert!(db.list_recharge_requests().unwrap().is_empty());
    }
}
