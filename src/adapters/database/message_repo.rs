use crate::adapters::database::records::MessageRecord;
use crate::domain::message::{Message, NewMessage, TimelineCursor};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

const COLUMNS: &str =
    "id, seq, conversation_id, sender_id, content, is_read, read_at, is_edited, edited_at, is_deleted, created_at";

#[derive(Clone, Debug, Default)]
pub struct MessageRepository {}

impl MessageRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Records a new message in the database.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, message), fields(message_id = %message.id))]
    pub(crate) async fn insert(&self, conn: &mut PgConnection, message: &NewMessage) -> Result<Message> {
        let result = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
                // Foreign key violation: conversation_id does not exist
                Err(AppError::NotFound)
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!("SELECT {COLUMNS} FROM messages WHERE id = $1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(record.map(Into::into))
    }

    /// Fetches the message and holds its row lock until the surrounding transaction ends.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_for_update(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Message>> {
        let record =
            sqlx::query_as::<_, MessageRecord>(&format!("SELECT {COLUMNS} FROM messages WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(record.map(Into::into))
    }

    /// Writes back every mutable field of a message read under `find_for_update`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn, message), fields(message_id = %message.id))]
    pub(crate) async fn save_state(&self, conn: &mut PgConnection, message: &Message) -> Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            UPDATE messages
            SET content = $2, is_read = $3, read_at = $4, is_edited = $5, edited_at = $6, is_deleted = $7
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(&message.content)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(message.is_edited)
        .bind(message.edited_at)
        .bind(message.is_deleted)
        .fetch_one(conn)
        .await?;

        Ok(record.into())
    }

    /// Fetches a newest-first page of a conversation, strictly older than `before`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn page(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        before: Option<TimelineCursor>,
        limit: i64,
    ) -> Result<Vec<Message>> {
        let records = match before {
            Some(cursor) => {
                sqlx::query_as::<_, MessageRecord>(&format!(
                    r#"
                    SELECT {COLUMNS}
                    FROM messages
                    WHERE conversation_id = $1
                      AND (created_at, seq) < ($2, $3)
                    ORDER BY created_at DESC, seq DESC
                    LIMIT $4
                    "#
                ))
                .bind(conversation_id)
                .bind(cursor.created_at)
                .bind(cursor.seq)
                .bind(limit)
                .fetch_all(conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, MessageRecord>(&format!(
                    r#"
                    SELECT {COLUMNS}
                    FROM messages
                    WHERE conversation_id = $1
                    ORDER BY created_at DESC, seq DESC
                    LIMIT $2
                    "#
                ))
                .bind(conversation_id)
                .bind(limit)
                .fetch_all(conn)
                .await?
            }
        };

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn latest(&self, conn: &mut PgConnection, conversation_id: Uuid) -> Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY created_at DESC, seq DESC LIMIT 1"
        ))
        .bind(conversation_id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Counts unread, non-deleted messages in the conversation sent by `sender`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn count_unread(&self, conn: &mut PgConnection, conversation_id: Uuid, sender: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE conversation_id = $1 AND sender_id = $2 AND is_read = FALSE AND is_deleted = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(sender)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Flips every unread, non-deleted message from `sender` to read and
    /// returns the ids that transitioned.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn mark_all_read(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        sender: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = $3
            WHERE conversation_id = $1 AND sender_id = $2 AND is_read = FALSE AND is_deleted = FALSE
            RETURNING id
            "#,
        )
        .bind(conversation_id)
        .bind(sender)
        .bind(now)
        .fetch_all(conn)
        .await?;

        Ok(ids)
    }
}
