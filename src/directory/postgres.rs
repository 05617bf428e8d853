use super::{Credential, DirectoryError, NewCredential, UserDirectory};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, instrument, Instrument};
use uuid::Uuid;

/// Directory backed by the `users` table (see `sql/schema.sql`).
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn credential_from_row(row: &PgRow) -> Result<Credential, sqlx::Error> {
    Ok(Credential {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        active: row.try_get("active")?,
    })
}

#[async_trait]
impl UserDirectory for PgDirectory {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, DirectoryError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(
            "SELECT id, email, name, password_hash, active FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .instrument(span)
        .await?;

        Ok(row.as_ref().map(credential_from_row).transpose()?)
    }

    #[instrument(skip(self, new), fields(email = %new.email))]
    async fn create(&self, new: NewCredential) -> Result<Credential, DirectoryError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "INSERT");
        let row = sqlx::query(
            "INSERT INTO users (id, email, name, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, name, password_hash, active",
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .instrument(span)
        .await?;

        Ok(credential_from_row(&row)?)
    }
}
