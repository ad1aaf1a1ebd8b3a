use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// MIME types accepted when a type can be resolved from the file name.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "video/mp4",
    "video/quicktime",
    "audio/mpeg",
    "audio/wav",
    "audio/x-wav",
];

const MAX_FILE_NAME_CHARS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Document,
    Video,
    Audio,
    Other,
}

impl FileCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "document" => Some(Self::Document),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    fn from_mime(mime: &mime_guess::Mime) -> Self {
        match mime.type_().as_str() {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "text" => Self::Document,
            "application" if mime.subtype() == "pdf" || mime.subtype() == "msword" => Self::Document,
            "application" if mime.subtype().as_str().starts_with("vnd.") => Self::Document,
            _ => Self::Other,
        }
    }
}

/// Declared metadata for a file the client wants to attach. No bytes.
#[derive(Debug, Clone)]
pub struct AttachmentCandidate {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: Option<FileCategory>,
    pub thumbnail_ref: Option<String>,
}

/// Metadata that passed the policy and may be handed to file storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAttachment {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: FileCategory,
    pub mime_type: Option<String>,
    pub thumbnail_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttachment {
    pub id: Uuid,
    pub message_id: Uuid,
    pub file_type: FileCategory,
    pub file_size: u64,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub max_size_bytes: u64,
    /// When false, files whose MIME type cannot be resolved are accepted.
    pub reject_unknown_types: bool,
}

impl AttachmentPolicy {
    /// Checks declared size and name-derived MIME type.
    ///
    /// # Errors
    /// Returns `AppError::AttachmentRejected` describing the violated rule.
    pub fn validate(&self, candidate: AttachmentCandidate) -> Result<ValidatedAttachment> {
        let name = candidate.file_name.trim();
        if name.is_empty() {
            return Err(AppError::AttachmentRejected("file name is required".into()));
        }
        if name.chars().count() > MAX_FILE_NAME_CHARS {
            return Err(AppError::AttachmentRejected(format!(
                "file name exceeds {MAX_FILE_NAME_CHARS} characters"
            )));
        }
        if candidate.file_size > self.max_size_bytes {
            return Err(AppError::AttachmentRejected(format!(
                "file size {} exceeds maximum of {} bytes",
                candidate.file_size, self.max_size_bytes
            )));
        }

        let mime = mime_guess::from_path(name).first();
        let file_type = match &mime {
            Some(mime) => {
                if !ALLOWED_MIME_TYPES.contains(&mime.essence_str()) {
                    return Err(AppError::AttachmentRejected(format!(
                        "file type {} is not allowed",
                        mime.essence_str()
                    )));
                }
                let resolved = FileCategory::from_mime(mime);
                match candidate.file_type {
                    Some(declared) if declared != resolved => {
                        return Err(AppError::AttachmentRejected(format!(
                            "declared type {} does not match {} ({})",
                            declared.as_str(),
                            resolved.as_str(),
                            mime.essence_str()
                        )));
                    }
                    _ => resolved,
                }
            }
            None if self.reject_unknown_types => {
                return Err(AppError::AttachmentRejected("file type could not be determined".into()));
            }
            None => candidate.file_type.unwrap_or(FileCategory::Other),
        };

        Ok(ValidatedAttachment {
            file_name: name.to_string(),
            file_size: candidate.file_size,
            file_type,
            mime_type: mime.map(|m| m.essence_str().to_string()),
            thumbnail_ref: candidate.thumbnail_ref,
        })
    }
}
