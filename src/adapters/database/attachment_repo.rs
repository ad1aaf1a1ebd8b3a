use crate::adapters::database::records::AttachmentRecord;
use crate::domain::attachment::{MessageAttachment, ValidatedAttachment};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct AttachmentRepository {}

impl AttachmentRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Records attachment metadata against a message.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, attachment), fields(file_name = %attachment.file_name))]
    pub(crate) async fn insert(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        message_id: Uuid,
        attachment: &ValidatedAttachment,
        now: OffsetDateTime,
    ) -> Result<MessageAttachment> {
        let file_size = i64::try_from(attachment.file_size)
            .map_err(|_| AppError::AttachmentRejected("file size out of range".into()))?;

        let result = sqlx::query_as::<_, AttachmentRecord>(
            r#"
            INSERT INTO message_attachments (id, message_id, file_type, file_size, file_name, mime_type, thumbnail_ref, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, message_id, file_type, file_size, file_name, mime_type, thumbnail_ref, created_at
            "#,
        )
        .bind(id)
        .bind(message_id)
        .bind(attachment.file_type.as_str())
        .bind(file_size)
        .bind(&attachment.file_name)
        .bind(attachment.mime_type.as_deref())
        .bind(attachment.thumbnail_ref.as_deref())
        .bind(now)
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
    pub(crate) async fn list_for_message(
        &self,
        conn: &mut PgConnection,
        message_id: Uuid,
    ) -> Result<Vec<MessageAttachment>> {
        let records = sqlx::query_as::<_, AttachmentRecord>(
            r#"
            SELECT id, message_id, file_type, file_size, file_name, mime_type, thumbnail_ref, created_at
            FROM message_attachments
            WHERE message_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(message_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
