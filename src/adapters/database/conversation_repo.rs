use crate::adapters::database::records::ConversationRecord;
use crate::domain::conversation::{Conversation, ParticipantPair, Slot, StateChange};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

const COLUMNS: &str = "id, participant_1, participant_2, archived_by_p1, archived_by_p2, muted_by_p1, muted_by_p2, \
                       p1_blocked_p2, p2_blocked_p1, created_at, updated_at";

#[derive(Clone, Debug, Default)]
pub struct ConversationRepository {}

impl ConversationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Inserts the conversation for a canonical pair or returns the existing row.
    ///
    /// Concurrent first contacts converge on the unique `(participant_1, participant_2)`
    /// constraint; the loser's no-op update returns the winner's row.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn get_or_create(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        pair: ParticipantPair,
        now: OffsetDateTime,
    ) -> Result<Conversation> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            INSERT INTO conversations (id, participant_1, participant_2, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (participant_1, participant_2) DO UPDATE SET participant_1 = EXCLUDED.participant_1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(pair.first())
        .bind(pair.second())
        .bind(now)
        .fetch_one(conn)
        .await?;

        record.try_into()
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!("SELECT {COLUMNS} FROM conversations WHERE id = $1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;

        record.map(TryInto::try_into).transpose()
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_pair(
        &self,
        conn: &mut PgConnection,
        pair: ParticipantPair,
    ) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            "SELECT {COLUMNS} FROM conversations WHERE participant_1 = $1 AND participant_2 = $2"
        ))
        .bind(pair.first())
        .bind(pair.second())
        .fetch_optional(conn)
        .await?;

        record.map(TryInto::try_into).transpose()
    }

    /// Sets exactly one column, so concurrent changes to other flags are never overwritten.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn update_state(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        slot: Slot,
        change: StateChange,
        now: OffsetDateTime,
    ) -> Result<Conversation> {
        let (column, value) = match (slot, change) {
            (Slot::First, StateChange::Archived(v)) => ("archived_by_p1", v),
            (Slot::Second, StateChange::Archived(v)) => ("archived_by_p2", v),
            (Slot::First, StateChange::Muted(v)) => ("muted_by_p1", v),
            (Slot::Second, StateChange::Muted(v)) => ("muted_by_p2", v),
            (Slot::First, StateChange::BlockedOther(v)) => ("p1_blocked_p2", v),
            (Slot::Second, StateChange::BlockedOther(v)) => ("p2_blocked_p1", v),
        };

        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            "UPDATE conversations SET {column} = $2, updated_at = GREATEST(updated_at, $3) WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(value)
        .bind(now)
        .fetch_optional(conn)
        .await?;

        record.ok_or(AppError::NotFound)?.try_into()
    }

    /// Bumps the activity timestamp after a new message.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn touch(&self, conn: &mut PgConnection, id: Uuid, now: OffsetDateTime) -> Result<()> {
        sqlx::query("UPDATE conversations SET updated_at = GREATEST(updated_at, $2) WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn list_for_user(
        &self,
        conn: &mut PgConnection,
        user: Uuid,
        archived: bool,
        limit: i64,
    ) -> Result<Vec<Conversation>> {
        let records = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM conversations
            WHERE (participant_1 = $1 AND archived_by_p1 = $2)
               OR (participant_2 = $1 AND archived_by_p2 = $2)
            ORDER BY updated_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(user)
        .bind(archived)
        .bind(limit)
        .fetch_all(conn)
        .await?;

        records.into_iter().map(TryInto::try_into).collect()
    }
}
