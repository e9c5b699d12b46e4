//! Repository traits and request types for folio.
//!
//! The request structs are the typed boundary of the service: handlers
//! deserialize them directly from JSON, so field-level `serde` attributes
//! define the wire contract (camelCase names, absent-vs-null handling).

use crate::error::Result;
use crate::models::{Category, Note, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Deserialize a field that distinguishes "absent" from "explicit null".
///
/// `None` means the key was missing; `Some(None)` means the key was present
/// with a JSON null; `Some(Some(v))` carries a value. Pair with
/// `#[serde(default)]` so missing keys fall back to `None`.
fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// Identity record merged into the users table on every login.
///
/// Merge rules: a field absent from the record leaves the stored value
/// untouched; a field present but null clears it. `open_id` is the stable
/// key and is always required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUser {
    pub open_id: String,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub login_method: Option<Option<String>>,
    /// Explicit sign-in time; stamped with the current time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_signed_in: Option<DateTime<Utc>>,
}

impl UpsertUser {
    /// Identity record carrying only the stable key.
    pub fn new(open_id: impl Into<String>) -> Self {
        Self {
            open_id: open_id.into(),
            ..Default::default()
        }
    }

    /// True when at least one profile field is present in the record.
    pub fn has_profile_fields(&self) -> bool {
        self.name.is_some()
            || self.email.is_some()
            || self.login_method.is_some()
            || self.last_signed_in.is_some()
    }
}

/// Request to create a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Request to create a note. `content` must be present (an empty string is
/// a valid note body); `category_id` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNote {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

/// Partial-field note update.
///
/// Absent fields are left untouched. `category_id` distinguishes absent
/// (untouched) from explicit null (clears the reference). Every update,
/// including an empty one, bumps the note's update timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNote {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<Uuid>>,
}

impl UpdateNote {
    /// True when the update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.category_id.is_none()
    }
}

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

/// User persistence, keyed by the external open id.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user or merge the record onto the existing row keyed by
    /// `open_id`, returning the resulting row.
    ///
    /// When the record carries no profile fields, the merge still refreshes
    /// `last_signed_in` so a bare re-login is visible.
    async fn upsert(&self, record: UpsertUser) -> Result<User>;

    /// Fetch a user by external open id.
    async fn get_by_open_id(&self, open_id: &str) -> Result<Option<User>>;

    /// Fetch a user by primary key.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Category persistence. Every operation is scoped by the owning user id;
/// operations on rows the user does not own match nothing and are not errors.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// List the user's categories.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Category>>;

    /// Create a category for the user, returning its id.
    async fn create(&self, user_id: Uuid, request: CreateCategory) -> Result<Uuid>;

    /// Delete the user's category. Returns the number of rows removed
    /// (zero when the id does not exist or belongs to another user).
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64>;
}

/// Note persistence. Scoping rules match [`CategoryRepository`]: the
/// `(id, user_id)` pair must match, and a miss is indistinguishable from
/// a row owned by someone else.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List the user's notes, most recently updated first, optionally
    /// filtered to one category.
    async fn list_for_user(&self, user_id: Uuid, category_id: Option<Uuid>) -> Result<Vec<Note>>;

    /// Fetch one note by `(id, user_id)`. `Ok(None)` covers both "does not
    /// exist" and "belongs to another user".
    async fn get_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<Note>>;

    /// Create a note for the user, returning its id.
    async fn create(&self, user_id: Uuid, request: CreateNote) -> Result<Uuid>;

    /// Apply a partial update to the user's note, bumping `updated_at`.
    /// Returns the number of rows touched (zero on a scoping miss).
    async fn update(&self, id: Uuid, user_id: Uuid, request: UpdateNote) -> Result<u64>;

    /// Delete the user's note. Returns the number of rows removed.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<u64>;
}

/// Cookie-session persistence. Raw tokens never touch the database; rows
/// store a SHA-256 hash.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Mint a session for the user, returning the raw token (shown exactly
    /// once) and the stored row.
    async fn create(&self, user_id: Uuid, ttl: Duration) -> Result<(String, Session)>;

    /// Resolve a raw token to its user. `Ok(None)` for unknown, revoked,
    /// or expired tokens.
    async fn validate(&self, token: &str) -> Result<Option<User>>;

    /// Revoke the session behind a raw token. Returns false when the token
    /// matched no live session.
    async fn revoke(&self, token: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_user_absent_vs_null() {
        let absent: UpsertUser = serde_json::from_str(r#"{"openId":"u1"}"#).unwrap();
        assert_eq!(absent.name, None);
        assert!(!absent.has_profile_fields());

        let null: UpsertUser = serde_json::from_str(r#"{"openId":"u1","name":null}"#).unwrap();
        assert_eq!(null.name, Some(None));
        assert!(null.has_profile_fields());

        let value: UpsertUser =
            serde_json::from_str(r#"{"openId":"u1","name":"Ada"}"#).unwrap();
        assert_eq!(value.name, Some(Some("Ada".to_string())));
    }

    #[test]
    fn test_upsert_user_skips_absent_fields_on_serialize() {
        let record = UpsertUser::new("u1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["openId"], "u1");
        assert!(json.get("name").is_none());
        assert!(json.get("lastSignedIn").is_none());
    }

    #[test]
    fn test_update_note_category_tri_state() {
        let untouched: UpdateNote = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(untouched.category_id, None);
        assert!(!untouched.is_empty());

        let cleared: UpdateNote = serde_json::from_str(r#"{"categoryId":null}"#).unwrap();
        assert_eq!(cleared.category_id, Some(None));
        assert!(!cleared.is_empty());

        let id = Uuid::now_v7();
        let set: UpdateNote =
            serde_json::from_str(&format!(r#"{{"categoryId":"{}"}}"#, id)).unwrap();
        assert_eq!(set.category_id, Some(Some(id)));
    }

    #[test]
    fn test_update_note_empty() {
        let empty: UpdateNote = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_create_note_requires_content_key() {
        assert!(serde_json::from_str::<CreateNote>(r#"{"title":"Groceries"}"#).is_err());

        let req: CreateNote =
            serde_json::from_str(r#"{"title":"Groceries","content":""}"#).unwrap();
        assert_eq!(req.title, "Groceries");
        assert_eq!(req.content, "");
        assert_eq!(req.category_id, None);
    }

    #[test]
    fn test_create_category_camel_case() {
        let req: CreateCategory =
            serde_json::from_str(r##"{"name":"Work","color":"#ff0000"}"##).unwrap();
        assert_eq!(req.name, "Work");
        assert_eq!(req.color.as_deref(), Some("#ff0000"));
    }
}
