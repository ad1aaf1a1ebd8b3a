use crate::adapters::database::records::BlockedUserRecord;
use crate::domain::block::BlockedUser;
use crate::error::Result;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct BlockRepository {}

impl BlockRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Records the block or returns the existing row with its original timestamp.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn insert(
        &self,
        conn: &mut PgConnection,
        blocker: Uuid,
        blocked: Uuid,
        now: OffsetDateTime,
    ) -> Result<BlockedUser> {
        let record = sqlx::query_as::<_, BlockedUserRecord>(
            r#"
            INSERT INTO blocked_users_dm (blocker_id, blocked_id, blocked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (blocker_id, blocked_id) DO UPDATE SET blocker_id = EXCLUDED.blocker_id
            RETURNING blocker_id, blocked_id, blocked_at
            "#,
        )
        .bind(blocker)
        .bind(blocked)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(record.into())
    }

    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn delete(&self, conn: &mut PgConnection, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blocked_users_dm WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker)
            .bind(blocked)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn exists(&self, conn: &mut PgConnection, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM blocked_users_dm WHERE blocker_id = $1 AND blocked_id = $2)",
        )
        .bind(blocker)
        .bind(blocked)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_blocker(&self, conn: &mut PgConnection, blocker: Uuid) -> Result<Vec<BlockedUser>> {
        let records = sqlx::query_as::<_, BlockedUserRecord>(
            r#"
            SELECT blocker_id, blocked_id, blocked_at
            FROM blocked_users_dm
            WHERE blocker_id = $1
            ORDER BY blocked_at DESC
            "#,
        )
        .bind(blocker)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
