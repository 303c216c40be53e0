//! Seller number approval and code verification.
//!
//! Transition rules live on `SellerSubmission`; this module loads the row,
//! applies the rule, and writes the result back inside one transaction.

use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;

use numora_types::api::{ApproveCodeRequest, EditPhoneRequest};
use numora_types::models::{CodeStatus, SellerStatus, SellerSubmission, TransactionKind};
use numora_types::{LedgerError, Result};

use crate::ledger;
use crate::rows::{self, SELLER_COLUMNS};
use crate::users::query_profile;
use crate::{Database, new_id, now, required, ts};

pub const CODE_VERIFIED_DESCRIPTION: &str = "seller code verified";

impl Database {
    /// Intake from the seller-facing flow.
    pub fn create_seller_submission(
        &self,
        user_id: &str,
        phone_number: &str,
    ) -> Result<SellerSubmission> {
        let phone_number = required(phone_number, "phone_number")?;

        self.with_tx(|tx| {
            if query_profile(tx, user_id)?.is_none() {
                return Err(LedgerError::not_found("user", user_id));
            }

            let submission = SellerSubmission {
                id: new_id(),
                user_id: user_id.to_string(),
                phone_number,
                status: SellerStatus::Pending,
                code: None,
                code_status: CodeStatus::Pending,
                balance_added: Decimal::ZERO,
                created_at: now(),
            };
            tx.execute(
                "INSERT INTO seller_numbers
                    (id, user_id, phone_number, status, code, code_status, balance_added, created_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, '0', ?6)",
                rusqlite::params![
                    submission.id,
                    submission.user_id,
                    submission.phone_number,
                    submission.status.as_str(),
                    submission.code_status.as_str(),
                    ts(&submission.created_at),
                ],
            )?;
            Ok(submission)
        })
    }

    pub fn get_seller_submission(&self, id: &str) -> Result<SellerSubmission> {
        self.with_conn(|conn| load(conn, id))
    }

    /// Newest first.
    pub fn list_seller_submissions(&self) -> Result<Vec<SellerSubmission>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM seller_numbers ORDER BY created_at DESC, rowid DESC",
                SELLER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], rows::seller_submission)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn approve_seller_submission(&self, id: &str) -> Result<SellerSubmission> {
        self.transition_seller(id, SellerSubmission::approve)
    }

    pub fn reject_seller_submission(&self, id: &str) -> Result<SellerSubmission> {
        self.transition_seller(id, SellerSubmission::reject)
    }

    pub fn grant_code_entry(&self, id: &str) -> Result<SellerSubmission> {
        self.transition_seller(id, SellerSubmission::grant_code_entry)
    }

    /// Seller-side: the seller enters the code once entry was granted.
    pub fn submit_code(&self, id: &str, code: &str) -> Result<SellerSubmission> {
        self.transition_seller(id, |s| s.submit_code(code))
    }

    /// Verify the submitted code and credit the seller. The credit amount is
    /// validated before anything is touched; the status change, the balance
    /// update and the log entry commit together or not at all.
    pub fn approve_code(&self, id: &str, req: &ApproveCodeRequest) -> Result<SellerSubmission> {
        let credit = req.credit_amount.positive("credit_amount")?;

        let (submission, balance) = self.with_tx(|tx| {
            let mut submission = load(tx, id)?;
            submission.approve_code(credit)?;
            save(tx, &submission)?;

            let (balance, _) = ledger::post(
                tx,
                &submission.user_id,
                TransactionKind::Credit,
                credit,
                Some(CODE_VERIFIED_DESCRIPTION),
            )?;
            Ok((submission, balance))
        })?;

        info!(
            "Seller number {} code approved, credited {} to user {} (balance now {})",
            submission.id, credit, submission.user_id, balance
        );
        Ok(submission)
    }

    /// Plain field update, allowed in any status.
    pub fn edit_phone_number(&self, id: &str, req: &EditPhoneRequest) -> Result<SellerSubmission> {
        let phone_number = required(&req.phone_number, "phone_number")?;
        self.transition_seller(id, |s| {
            s.phone_number = phone_number;
            Ok(())
        })
    }

    /// Permanent removal. Credits already posted for this number stay in the log.
    pub fn delete_seller_submission(&self, id: &str) -> Result<()> {
        let removed = self.with_tx(|tx| {
            Ok(tx.execute("DELETE FROM seller_numbers WHERE id = ?1", [id])?)
        })?;
        if removed == 0 {
            return Err(LedgerError::not_found("seller number", id));
        }
        Ok(())
    }

    fn transition_seller<F>(&self, id: &str, f: F) -> Result<SellerSubmission>
    where
        F: FnOnce(&mut SellerSubmission) -> Result<()>,
    {
        self.with_tx(|tx| {
            let mut submission = load(tx, id)?;
            f(&mut submission)?;
            save(tx, &submission)?;
            Ok(submission)
        })
    }
}

fn load(conn: &Connection, id: &str) -> Result<SellerSubmission> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM seller_numbers WHERE id = ?1",
        SELLER_COLUMNS
    ))?;

    stmt.query_row([id], rows::seller_submission)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("seller number", id))
}

fn save(conn: &Connection, s: &SellerSubmission) -> Result<()> {
    conn.execute(
        "UPDATE seller_numbers
         SET phone_number = ?1, status = ?2, code = ?3, code_status = ?4, balance_added = ?5
         WHERE id = ?6",
        rusqlite::params![
            s.phone_number,
            s.status.as_str(),
            s.code,
            s.code_status.as_str(),
            s.balance_added.to_string(),
            s.id,
        ],
    )?;
    Ok(())
}

pub(crate) fn query_seller_submissions_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<SellerSubmission>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM seller_numbers WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        SELLER_COLUMNS
    ))?;

    let rows = stmt
        .query_map([user_id], rows::seller_submission)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use numora_types::amount::AmountInput;
    use numora_types::models::TransactionStatus;

    use super::*;

    fn setup() -> (Database, SellerSubmission) {
        let db = Database::open_in_memory().unwrap();
        db.create_profile("alice", "Alice", "ALICE1").unwrap();
        db.post_entry("alice", TransactionKind::Credit, Decimal::from(100), None)
            .unwrap();
        let s = db.create_seller_submission("alice", "0700123456").unwrap();
        (db, s)
    }

    /// Walk a submission to status=approved, code_status=pending, code="1234".
    fn with_code(db: &Database, id: &str) {
        db.approve_seller_submission(id).unwrap();
        db.grant_code_entry(id).unwrap();
        db.submit_code(id, "1234").unwrap();
    }

    fn credit(raw: Option<&str>) -> ApproveCodeRequest {
        ApproveCodeRequest {
            credit_amount: raw.map(AmountInput::new).unwrap_or_default(),
        }
    }

    #[test]
    fn test_new_submission_defaults() {
        let (db, s) = setup();
        assert_eq!(s.status, SellerStatus::Pending);
        assert_eq!(s.code_status, CodeStatus::Pending);
        assert!(s.code.is_none());
        assert_eq!(db.get_seller_submission(&s.id).unwrap(), s);
        assert!(matches!(
            db.create_seller_submission("ghost", "0700"),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_reject_is_terminal() {
        let (db, s) = setup();
        let rejected = db.reject_seller_submission(&s.id).unwrap();
        assert_eq!(rejected.status, SellerStatus::Rejected);

        assert!(matches!(
            db.approve_seller_submission(&s.id),
            Err(LedgerError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            db.grant_code_entry(&s.id),
            Err(LedgerError::InvalidStateTransition(_))
        ));
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(100));
    }

    #[test]
    fn test_approve_code_credits_and_logs() {
        let (db, s) = setup();
        with_code(&db, &s.id);

        let approved = db.approve_code(&s.id, &credit(Some("200"))).unwrap();
        assert_eq!(approved.code_status, CodeStatus::Approved);
        assert_eq!(approved.balance_added, Decimal::from(200));
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(300));

        let log = db.recent_transactions("alice", 10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind, TransactionKind::Credit);
        assert_eq!(log[0].amount, Decimal::from(200));
        assert_eq!(log[0].status, TransactionStatus::Completed);
        assert_eq!(log[0].description.as_deref(), Some(CODE_VERIFIED_DESCRIPTION));

        // Approved is terminal: a second approval must not credit again
        assert!(matches!(
            db.approve_code(&s.id, &credit(Some("200"))),
            Err(LedgerError::InvalidStateTransition(_))
        ));
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(300));
    }

    #[test]
    fn test_approve_code_validation_leaves_everything_unchanged() {
        let (db, s) = setup();
        with_code(&db, &s.id);

        for raw in [None, Some(""), Some("0"), Some("abc"), Some("-10")] {
            let err = db.approve_code(&s.id, &credit(raw)).unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)), "{:?}", raw);
        }

        let unchanged = db.get_seller_submission(&s.id).unwrap();
        assert_eq!(unchanged.code_status, CodeStatus::Pending);
        assert_eq!(unchanged.balance_added, Decimal::ZERO);
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(100));
        assert_eq!(db.recent_transactions("alice", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_approve_code_requires_submitted_code() {
        let (db, s) = setup();
        db.approve_seller_submission(&s.id).unwrap();

        // code_status=pending but no code: nothing to verify
        assert!(matches!(
            db.approve_code(&s.id, &credit(Some("50"))),
            Err(LedgerError::InvalidStateTransition(_))
        ));

        db.grant_code_entry(&s.id).unwrap();
        // can_enter but the seller has not entered anything yet
        assert!(matches!(
            db.approve_code(&s.id, &credit(Some("50"))),
            Err(LedgerError::InvalidStateTransition(_))
        ));
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(100));
    }

    #[test]
    fn test_ledger_failure_rolls_back_code_approval() {
        let (db, s) = setup();
        with_code(&db, &s.id);

        // Break the ledger leg: the profile's balance is unreadable
        db.with_conn(|c| {
            c.execute("UPDATE profiles SET balance = 'corrupt' WHERE user_id = 'alice'", [])?;
            Ok(())
        })
        .unwrap();

        let err = db.approve_code(&s.id, &credit(Some("200"))).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));

        let unchanged = db.get_seller_submission(&s.id).unwrap();
        assert_eq!(unchanged.code_status, CodeStatus::Pending);
        assert_eq!(unchanged.balance_added, Decimal::ZERO);
    }

    #[test]
    fn test_edit_phone_and_delete() {
        let (db, s) = setup();
        db.reject_seller_submission(&s.id).unwrap();

        let edited = db
            .edit_phone_number(&s.id, &EditPhoneRequest { phone_number: " 0799999999 ".into() })
            .unwrap();
        assert_eq!(edited.phone_number, "0799999999");
        assert_eq!(edited.status, SellerStatus::Rejected);

        assert!(matches!(
            db.edit_phone_number(&s.id, &EditPhoneRequest { phone_number: "".into() }),
            Err(LedgerError::Validation(_))
        ));

        db.delete_seller_submission(&s.id).unwrap();
        assert!(matches!(
            db.get_seller_submission(&s.id),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            db.delete_seller_submission(&s.id),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_keeps_posted_credits() {
        let (db, s) = setup();
        with_code(&db, &s.id);
        db.approve_code(&s.id, &credit(Some("25"))).unwrap();

        db.delete_seller_submission(&s.id).unwrap();
        assert_eq!(db.balance("alice").unwrap(), Decimal::from(125));
        assert_eq!(db.recent_transactions("alice", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_list_newest_first() {
        let (db, first) = setup();
        let second = db.create_seller_submission("alice", "0700000002").unwrap();
        let listed = db.list_seller_submissions().unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
