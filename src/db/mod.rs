//! Database module - SQLite storage for the login credential

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::warn;

use crate::api::CredentialProvider;
use crate::api::auth::{AuthResponse, Role, User};

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening database {path}"))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        // Single row: one logged-in user per database file
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS credentials (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                access_token TEXT NOT NULL,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Store the credential from a successful login, replacing any previous one
    pub fn save_login(&self, auth: &AuthResponse) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO credentials (id, access_token, user_id, name, email, role, saved_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                auth.access_token,
                auth.user.id,
                auth.user.name,
                auth.user.email,
                auth.user.role.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn token(&self) -> Result<Option<String>> {
        let token = self
            .conn
            .query_row("SELECT access_token FROM credentials WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        Ok(token)
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT user_id, name, email, role FROM credentials WHERE id = 1",
                [],
                |row| {
                    let role: String = row.get(3)?;
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        role: Role::parse(&role),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Forget the stored credential (logout, or after the API rejected it)
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM credentials", [])?;
        Ok(())
    }
}

impl CredentialProvider for Database {
    fn bearer_token(&self) -> Option<String> {
        match self.token() {
            Ok(token) => token,
            Err(err) => {
                warn!("Could not read stored credential: {:#}", err);
                None
            }
        }
    }
}
