use crate::adapters::database::records::TypingIndicatorRecord;
use crate::domain::typing::TypingIndicator;
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct TypingRepository {}

impl TypingRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Inserts or refreshes the indicator. `started_at` is kept while the
    /// previous window is still open and restarts once it has lapsed.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::Database` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn upsert(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<TypingIndicator> {
        let result = sqlx::query_as::<_, TypingIndicatorRecord>(
            r#"
            INSERT INTO typing_indicators (conversation_id, user_id, started_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (conversation_id, user_id) DO UPDATE
            SET started_at = CASE
                    WHEN typing_indicators.expires_at <= EXCLUDED.started_at THEN EXCLUDED.started_at
                    ELSE typing_indicators.started_at
                END,
                expires_at = EXCLUDED.expires_at
            RETURNING conversation_id, user_id, started_at, expires_at
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(AppError::NotFound),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TypingIndicator>> {
        let record = sqlx::query_as::<_, TypingIndicatorRecord>(
            r#"
            SELECT conversation_id, user_id, started_at, expires_at
            FROM typing_indicators
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_conversation(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
    ) -> Result<Vec<TypingIndicator>> {
        let records = sqlx::query_as::<_, TypingIndicatorRecord>(
            r#"
            SELECT conversation_id, user_id, started_at, expires_at
            FROM typing_indicators
            WHERE conversation_id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn delete_expired(&self, conn: &mut PgConnection, now: OffsetDateTime) -> Result<u64> {
        let result = sqlx::query("DELETE FROM typing_indicators WHERE expires_at <= $1").bind(now).execute(conn).await?;
        Ok(result.rows_affected())
    }
}
