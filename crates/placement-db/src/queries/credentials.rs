//! One-time password-reset codes, at most one live row per email.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::students;
use crate::{Database, format_timestamp};

/// Store a code for `email`, replacing any previous one.
pub fn save(conn: &Connection, email: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO password_resets (email, otp_code, expires_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (email) DO UPDATE SET otp_code = excluded.otp_code, expires_at = excluded.expires_at",
        params![email, code, format_timestamp(expires_at)],
    )?;
    Ok(())
}

/// True when `code` matches the stored one and has not yet expired by the database clock.
pub fn is_valid(conn: &Connection, email: &str, code: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM password_resets
             WHERE email = ?1 AND otp_code = ?2 AND expires_at > datetime('now')",
            params![email, code],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Verify the code, set the new hash and consume the code, all in one
/// transaction. Returns false (and changes nothing) if the code is wrong,
/// expired, or the account is gone.
pub fn reset_password(conn: &mut Connection, email: &str, code: &str, password_hash: &str) -> Result<bool> {
    let tx = conn.transaction()?;
    if !is_valid(&tx, email, code)? {
        return Ok(false);
    }
    if !students::set_password(&tx, email, password_hash)? {
        return Ok(false);
    }
    tx.execute("DELETE FROM password_resets WHERE email = ?1", [email])?;
    tx.commit()?;
    Ok(true)
}

/// Delete every code whose expiry is behind the database clock.
pub fn purge_expired(conn: &Connection) -> Result<usize> {
    let purged = conn.execute(
        "DELETE FROM password_resets WHERE expires_at < datetime('now')",
        [],
    )?;
    Ok(purged)
}

impl Database {
    pub fn save_reset_code(&self, email: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| save(conn, email, code, expires_at))
    }

    pub fn purge_expired_reset_codes(&self) -> Result<usize> {
        self.with_conn(purge_expired)
    }
}
