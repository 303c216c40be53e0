use rusqlite::Connection;
use tracing::info;

use numora_types::Result;

pub const CURRENT_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE profiles (
                user_id         TEXT PRIMARY KEY,
                full_name       TEXT NOT NULL,
                balance         TEXT NOT NULL DEFAULT '0',
                referral_code   TEXT NOT NULL UNIQUE,
                created_at      TEXT NOT NULL
            );

            -- No FK: operators may hold roles without a marketplace profile
            CREATE TABLE user_roles (
                user_id     TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('admin', 'user')),
                PRIMARY KEY (user_id, role)
            );

            CREATE TABLE referrals (
                id              TEXT PRIMARY KEY,
                referrer_id     TEXT NOT NULL REFERENCES profiles(user_id),
                referred_id     TEXT NOT NULL UNIQUE REFERENCES profiles(user_id),
                created_at      TEXT NOT NULL
            );

            CREATE TABLE seller_numbers (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES profiles(user_id),
                phone_number    TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'approved', 'rejected')),
                code            TEXT,
                code_status     TEXT NOT NULL DEFAULT 'pending'
                                CHECK (code_status IN ('pending', 'can_enter', 'approved')),
                balance_added   TEXT NOT NULL DEFAULT '0',
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_seller_numbers_user ON seller_numbers(user_id, created_at);

            CREATE TABLE recharge_requests (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES profiles(user_id),
                phone_number    TEXT NOT NULL,
                amount          TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'completed', 'rejected')),
                created_at      TEXT NOT NULL
            );

            CREATE TABLE transactions (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES profiles(user_id),
                type            TEXT NOT NULL CHECK (type IN ('credit', 'recharge_debit', 'bonus')),
                amount          TEXT NOT NULL,
                status          TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed')),
                description     TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_transactions_user ON transactions(user_id, created_at);

            CREATE TABLE offers (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                description     TEXT,
                image_url       TEXT,
                priority        INTEGER NOT NULL DEFAULT 0,
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", CURRENT_VERSION);
    Ok(())
}
