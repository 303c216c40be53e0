use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use numora_types::models::{PanelStats, Profile, Referral, Role, UserDetail};
use numora_types::{LedgerError, Result};

use crate::ledger::{RECENT_TRANSACTIONS, query_recent_transactions};
use crate::rows::{self, PROFILE_COLUMNS};
use crate::sellers::query_seller_submissions_for_user;
use crate::{Database, new_id, now, required, ts};

impl Database {
    // -- Profiles --

    /// Intake from the sign-up flow. Balance starts at zero.
    pub fn create_profile(
        &self,
        user_id: &str,
        full_name: &str,
        referral_code: &str,
    ) -> Result<Profile> {
        let user_id = required(user_id, "user_id")?;
        let full_name = required(full_name, "full_name")?;
        let referral_code = required(referral_code, "referral_code")?;

        self.with_tx(|tx| {
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM profiles WHERE user_id = ?1 OR referral_code = ?2)",
                [&user_id, &referral_code],
                |row| row.get(0),
            )?;
            if taken {
                return Err(LedgerError::validation("user id or referral code already in use"));
            }

            let profile = Profile {
                user_id,
                full_name,
                balance: rust_decimal::Decimal::ZERO,
                referral_code,
                created_at: now(),
            };
            tx.execute(
                "INSERT INTO profiles (user_id, full_name, balance, referral_code, created_at)
                 VALUES (?1, ?2, '0', ?3, ?4)",
                (
                    &profile.user_id,
                    &profile.full_name,
                    &profile.referral_code,
                    ts(&profile.created_at),
                ),
            )?;
            Ok(profile)
        })
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.with_conn(|conn| query_profile(conn, user_id))?
            .ok_or_else(|| LedgerError::not_found("user", user_id))
    }

    /// Newest first, optionally filtered on name or referral code.
    ///
    /// Matching is case-insensitive over all of Unicode, so the filter runs
    /// here rather than in SQLite, whose `lower()` only folds ASCII.
    pub fn list_profiles(&self, search: Option<&str>) -> Result<Vec<Profile>> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let profiles = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM profiles ORDER BY created_at DESC, rowid DESC",
                PROFILE_COLUMNS
            ))?;

            let rows = stmt
                .query_map([], rows::profile)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        Ok(match needle {
            Some(needle) => profiles
                .into_iter()
                .filter(|p| {
                    p.full_name.to_lowercase().contains(&needle)
                        || p.referral_code.to_lowercase().contains(&needle)
                })
                .collect(),
            None => profiles,
        })
    }

    // -- Roles --

    pub fn grant_role(&self, user_id: &str, role: Role) -> Result<()> {
        let user_id = required(user_id, "user_id")?;
        self.with_tx(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
                (&user_id, role.as_str()),
            )?;
            Ok(())
        })
    }

    pub fn is_admin(&self, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = ?1 AND role = ?2)",
                (user_id, Role::Admin.as_str()),
                |row| row.get(0),
            )?)
        })
    }

    // -- Referrals --

    pub fn record_referral(&self, referrer_id: &str, referred_id: &str) -> Result<Referral> {
        if referrer_id == referred_id {
            return Err(LedgerError::validation("a user cannot refer themselves"));
        }

        self.with_tx(|tx| {
            if query_profile(tx, referrer_id)?.is_none() {
                return Err(LedgerError::not_found("user", referrer_id));
            }
            let referred = query_profile(tx, referred_id)?
                .ok_or_else(|| LedgerError::not_found("user", referred_id))?;

            let already: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM referrals WHERE referred_id = ?1)",
                [referred_id],
                |row| row.get(0),
            )?;
            if already {
                return Err(LedgerError::validation("user was already referred"));
            }

            let referral = Referral {
                id: new_id(),
                referrer_id: referrer_id.to_string(),
                referred_id: referred_id.to_string(),
                referred_name: Some(referred.full_name),
                created_at: now(),
            };
            tx.execute(
                "INSERT INTO referrals (id, referrer_id, referred_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (
                    &referral.id,
                    &referral.referrer_id,
                    &referral.referred_id,
                    ts(&referral.created_at),
                ),
            )?;
            Ok(referral)
        })
    }

    // -- Read-side bundles --

    /// Everything the operator sees when opening a user: their seller numbers,
    /// the last few ledger entries, and who they referred.
    pub fn user_detail(&self, user_id: &str) -> Result<UserDetail> {
        self.with_conn(|conn| {
            let profile = query_profile(conn, user_id)?
                .ok_or_else(|| LedgerError::not_found("user", user_id))?;

            Ok(UserDetail {
                seller_numbers: query_seller_submissions_for_user(conn, user_id)?,
                transactions: query_recent_transactions(conn, user_id, RECENT_TRANSACTIONS)?,
                referrals: query_referrals_by(conn, user_id)?,
                profile,
            })
        })
    }

    pub fn stats(&self) -> Result<PanelStats> {
        self.with_conn(|conn| {
            let (users, seller_numbers, pending_recharges): (i64, i64, i64) = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM profiles),
                    (SELECT COUNT(*) FROM seller_numbers),
                    (SELECT COUNT(*) FROM recharge_requests WHERE status = 'pending')",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            Ok(PanelStats {
                users: users as u64,
                seller_numbers: seller_numbers as u64,
                pending_recharges: pending_recharges as u64,
            })
        })
    }

    // -- Removal --

    /// Remove a user and everything that references them, in one transaction.
    /// Historical ledger entries go with the user.
    pub fn delete_user(&self, user_id: &str) -> Result<()> {
        self.with_tx(|tx| {
            if query_profile(tx, user_id)?.is_none() {
                return Err(LedgerError::not_found("user", user_id));
            }

            let sellers = tx.execute("DELETE FROM seller_numbers WHERE user_id = ?1", [user_id])?;
            let recharges =
                tx.execute("DELETE FROM recharge_requests WHERE user_id = ?1", [user_id])?;
            let entries = tx.execute("DELETE FROM transactions WHERE user_id = ?1", [user_id])?;
            tx.execute("DELETE FROM user_roles WHERE user_id = ?1", [user_id])?;
            tx.execute(
                "DELETE FROM referrals WHERE referrer_id = ?1 OR referred_id = ?1",
                [user_id],
            )?;
            tx.execute("DELETE FROM profiles WHERE user_id = ?1", [user_id])?;

            info!(
                "Deleted user {} ({} seller numbers, {} recharge requests, {} transactions)",
                user_id, sellers, recharges, entries
            );
            Ok(())
        })
    }
}

pub(crate) fn query_profile(conn: &Connection, user_id: &str) -> Result<Option<Profile>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM profiles WHERE user_id = ?1",
        PROFILE_COLUMNS
    ))?;

    Ok(stmt.query_row([user_id], rows::profile).optional()?)
}

fn query_referrals_by(conn: &Connection, referrer_id: &str) -> Result<Vec<Referral>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.referrer_id, r.referred_id, p.full_name, r.created_at
         FROM referrals r
         LEFT JOIN profiles p ON p.user_id = r.referred_id
         WHERE r.referrer_id = ?1
         ORDER BY r.created_at DESC",
    )?;

    let rows = stmt
        .query_map([referrer_id], rows::referral)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
