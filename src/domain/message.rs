use crate::error::{AppError, Result};
use time::OffsetDateTime;
use uuid::Uuid;

/// Rendered in place of the content of a soft-deleted message.
pub const DELETED_PLACEHOLDER: &str = "[deleted]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    /// Insertion sequence, breaks `created_at` ties in timelines.
    pub seq: i64,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub read_at: Option<OffsetDateTime>,
    pub is_edited: bool,
    pub edited_at: Option<OffsetDateTime>,
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
}

/// Result of a read: the stored message and whether this call flipped it to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub message: Message,
    pub transitioned: bool,
}

/// Keyset position in a conversation timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimelineCursor {
    pub created_at: OffsetDateTime,
    pub seq: i64,
}

/// Checks message content against the length bound.
///
/// # Errors
/// Returns `AppError::BadRequest` if the content is blank.
/// Returns `AppError::ContentTooLong` if it has more than `max_chars` characters.
pub fn validate_content(content: &str, max_chars: usize) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Message content cannot be empty".into()));
    }
    if content.chars().count() > max_chars {
        return Err(AppError::ContentTooLong { max: max_chars });
    }
    Ok(())
}

impl Message {
    #[must_use]
    pub fn from_new(new: NewMessage, seq: i64) -> Self {
        Self {
            id: new.id,
            seq,
            conversation_id: new.conversation_id,
            sender_id: new.sender_id,
            content: new.content,
            is_read: false,
            read_at: None,
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            created_at: new.created_at,
        }
    }

    /// Content as it may be shown to users. Stored content is kept for audit.
    #[must_use]
    pub fn display_content(&self) -> &str {
        if self.is_deleted { DELETED_PLACEHOLDER } else { &self.content }
    }

    #[must_use]
    pub const fn cursor(&self) -> TimelineCursor {
        TimelineCursor { created_at: self.created_at, seq: self.seq }
    }

    /// Returns `true` if this call performed the unread -> read transition.
    pub fn mark_read(&mut self, now: OffsetDateTime) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(now);
        true
    }

    /// Content is only checked once the editor may touch the message at all.
    ///
    /// # Errors
    /// Returns `AppError::Unauthorized` if `editor` did not send the message.
    /// Returns `AppError::AlreadyDeleted` if the message is soft-deleted.
    /// Returns `AppError::ContentTooLong` or `AppError::BadRequest` for invalid content.
    pub fn edit(&mut self, editor: Uuid, content: String, max_chars: usize, now: OffsetDateTime) -> Result<()> {
        if editor != self.sender_id {
            return Err(AppError::Unauthorized);
        }
        if self.is_deleted {
            return Err(AppError::AlreadyDeleted);
        }
        validate_content(&content, max_chars)?;
        self.content = content;
        self.is_edited = true;
        self.edited_at = Some(now);
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::Unauthorized` if `actor` did not send the message.
    pub fn soft_delete(&mut self, actor: Uuid) -> Result<()> {
        if actor != self.sender_id {
            return Err(AppError::Unauthorized);
        }
        self.is_deleted = true;
        Ok(())
    }

    /// Only the sender may attach files, and only while the message is live.
    ///
    /// # Errors
    /// Returns `AppError::Unauthorized` if `actor` did not send the message.
    /// Returns `AppError::AlreadyDeleted` if the message is soft-deleted.
    pub fn ensure_attachable(&self, actor: Uuid) -> Result<()> {
        if actor != self.sender_id {
            return Err(AppError::Unauthorized);
        }
        if self.is_deleted {
            return Err(AppError::AlreadyDeleted);
        }
        Ok(())
    }

    /// Whether this message counts towards the recipient's unread total.
    #[must_use]
    pub const fn is_unread(&self) -> bool {
        !self.is_read && !self.is_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn message(sender: Uuid) -> Message {
        Message::from_new(
            NewMessage {
                id: Uuid::new_v4(),
                conversation_id: Uuid::new_v4(),
                sender_id: sender,
                content: "Original".into(),
                created_at: OffsetDateTime::now_utc(),
            },
            1,
        )
    }

    #[test]
    fn test_content_bounds() {
        assert!(validate_content("hi", 5000).is_ok());
        assert!(validate_content(&"é".repeat(5000), 5000).is_ok());
        assert!(matches!(validate_content(&"a".repeat(5001), 5000), Err(AppError::ContentTooLong { max: 5000 })));
        assert!(matches!(validate_content("   ", 5000), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_read_at_is_set_once() {
        let mut msg = message(Uuid::new_v4());
        let first = OffsetDateTime::now_utc();

        assert!(msg.mark_read(first));
        assert!(!msg.mark_read(first + Duration::seconds(10)));
        assert_eq!(msg.read_at, Some(first));
    }

    #[test]
    fn test_edit_by_sender_sets_edited_flag() {
        let sender = Uuid::new_v4();
        let mut msg = message(sender);
        let now = OffsetDateTime::now_utc();

        msg.edit(sender, "Edited".into(), 5000, now).unwrap();
        assert_eq!(msg.content, "Edited");
        assert!(msg.is_edited);
        assert_eq!(msg.edited_at, Some(now));
    }

    #[test]
    fn test_edit_by_other_user_is_unauthorized() {
        let mut msg = message(Uuid::new_v4());
        let res = msg.edit(Uuid::new_v4(), "Hijacked".into(), 5000, OffsetDateTime::now_utc());
        assert!(matches!(res, Err(AppError::Unauthorized)));
        assert_eq!(msg.content, "Original");
        assert!(!msg.is_edited);
    }

    #[test]
    fn test_deleted_message_shows_placeholder_and_rejects_edits() {
        let sender = Uuid::new_v4();
        let mut msg = message(sender);
        assert_eq!(msg.display_content(), "Original");

        msg.soft_delete(sender).unwrap();
        assert_eq!(msg.display_content(), DELETED_PLACEHOLDER);
        assert_eq!(msg.content, "Original");

        let res = msg.edit(sender, "Too late".into(), 5000, OffsetDateTime::now_utc());
        assert!(matches!(res, Err(AppError::AlreadyDeleted)));
        assert_eq!(msg.content, "Original");
    }

    #[test]
    fn test_edit_checks_permission_before_content() {
        let sender = Uuid::new_v4();
        let mut msg = message(sender);
        let now = OffsetDateTime::now_utc();

        let res = msg.edit(Uuid::new_v4(), "x".repeat(6000), 5000, now);
        assert!(matches!(res, Err(AppError::Unauthorized)));

        assert!(matches!(msg.edit(sender, "   ".into(), 5000, now), Err(AppError::BadRequest(_))));
        assert!(!msg.is_edited);

        msg.soft_delete(sender).unwrap();
        assert!(matches!(msg.edit(sender, "   ".into(), 5000, now), Err(AppError::AlreadyDeleted)));
        assert!(matches!(msg.edit(sender, "x".repeat(6000), 5000, now), Err(AppError::AlreadyDeleted)));
    }

    #[test]
    fn test_soft_delete_by_other_user_is_unauthorized() {
        let mut msg = message(Uuid::new_v4());
        assert!(matches!(msg.soft_delete(Uuid::new_v4()), Err(AppError::Unauthorized)));
        assert!(!msg.is_deleted);
    }

    #[test]
    fn test_edited_flag_survives_read_and_delete() {
        let sender = Uuid::new_v4();
        let mut msg = message(sender);
        let now = OffsetDateTime::now_utc();

        msg.edit(sender, "v2".into(), 5000, now).unwrap();
        msg.mark_read(now);
        msg.soft_delete(sender).unwrap();

        assert!(msg.is_edited && msg.is_read && msg.is_deleted);
        assert!(!msg.is_unread());
    }
}
