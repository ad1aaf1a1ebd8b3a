use crate::adapters::database::records::ReadReceiptRecord;
use crate::domain::receipt::ReadReceipt;
use crate::error::Result;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct ReceiptRepository {}

impl ReceiptRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Records that `reader` has read the message. A repeated receipt is absorbed.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn insert(
        &self,
        conn: &mut PgConnection,
        message_id: Uuid,
        reader_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO read_receipts (message_id, reader_id, read_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id, reader_id) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(reader_id)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, message_ids), fields(count = message_ids.len()))]
    pub(crate) async fn insert_many(
        &self,
        conn: &mut PgConnection,
        message_ids: &[Uuid],
        reader_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<()> {
        if message_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO read_receipts (message_id, reader_id, read_at)
            SELECT id, $2, $3 FROM UNNEST($1::uuid[]) AS t(id)
            ON CONFLICT (message_id, reader_id) DO NOTHING
            "#,
        )
        .bind(message_ids)
        .bind(reader_id)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_message(&self, conn: &mut PgConnection, message_id: Uuid) -> Result<Vec<ReadReceipt>> {
        let records = sqlx::query_as::<_, ReadReceiptRecord>(
            "SELECT message_id, reader_id, read_at FROM read_receipts WHERE message_id = $1 ORDER BY read_at ASC",
        )
        .bind(message_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
