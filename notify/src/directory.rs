//! Firestore document access for contact resolution and the user
//! inspection diagnostic.
//!
//! Reads go through the `firestore` crate with Application Default
//! Credentials; the relay only ever reads, writes stay with the mobile app.

use anyhow::Result;
use firestore::*;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const USERS_COLLECTION: &str = "users";
pub const ISSUES_COLLECTION: &str = "issues";

/// User profile document. The mobile app has written the phone field under
/// two different names over time, so both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phonenumber: Option<String>,
    #[serde(default, rename = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(default, rename = "fullName")]
    pub full_name: Option<String>,
}

impl UserProfile {
    /// Raw phone number, preferring the legacy lowercase field.
    pub fn phone(&self) -> Option<&str> {
        self.phonenumber
            .as_deref()
            .filter(|p| !p.is_empty())
            .or_else(|| self.phone_number.as_deref().filter(|p| !p.is_empty()))
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Citizen")
    }
}

/// Issue document, reduced to the one field the relay falls back on when a
/// user profile is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueDoc {
    #[serde(default)]
    pub user_email: Option<String>,
}

/// Firestore-backed directory of users and issues.
pub struct UserDirectory {
    db: FirestoreDb,
}

impl UserDirectory {
    pub async fn new(project_id: &str) -> Result<Self> {
        info!("Connecting to Firestore project: {}", project_id);
        let db = FirestoreDb::new(project_id).await?;
        Ok(Self { db })
    }

    /// Fetch `users/{user_id}`, `None` when the document does not exist.
    pub async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let profile = self
            .db
            .fluent()
            .select()
            .by_id_in(USERS_COLLECTION)
            .obj::<UserProfile>()
            .one(user_id)
            .await?;
        Ok(profile)
    }

    /// Fetch `users/{user_id}` as a raw document, returning the typed
    /// profile together with the field names actually stored on it. The
    /// inspection diagnostic uses this to show fields the typed profile
    /// does not model.
    pub async fn fetch_user_with_fields(
        &self,
        user_id: &str,
    ) -> Result<Option<(UserProfile, Vec<String>)>> {
        let doc = self
            .db
            .fluent()
            .select()
            .by_id_in(USERS_COLLECTION)
            .one(user_id)
            .await?;
        match doc {
            Some(doc) => {
                let keys = sorted_field_keys(&doc.fields);
                let profile = FirestoreDb::deserialize_doc_to::<UserProfile>(&doc)?;
                Ok(Some((profile, keys)))
            }
            None => Ok(None),
        }
    }

    /// Some issues carry the submitter's email; last-resort contact source.
    pub async fn issue_contact_email(&self, complaint_id: &str) -> Result<Option<String>> {
        let issue = self
            .db
            .fluent()
            .select()
            .by_id_in(ISSUES_COLLECTION)
            .obj::<IssueDoc>()
            .one(complaint_id)
            .await?;
        Ok(issue.and_then(|i| i.user_email.filter(|e| !e.is_empty())))
    }

    /// List up to `limit` user document ids, for the inspection diagnostic.
    pub async fn sample_user_ids(&self, limit: u32) -> Result<Vec<String>> {
        let docs = self
            .db
            .fluent()
            .select()
            .from(USERS_COLLECTION)
            .limit(limit)
            .query()
            .await?;

        Ok(docs.iter().map(|doc| document_id(&doc.name)).collect())
    }

    /// Find user document ids whose `fullName` matches exactly.
    pub async fn find_users_by_name(&self, full_name: &str, limit: u32) -> Result<Vec<String>> {
        let docs = self
            .db
            .fluent()
            .select()
            .from(USERS_COLLECTION)
            .filter(|f| f.field("fullName").eq(full_name))
            .limit(limit)
            .query()
            .await?;

        Ok(docs.iter().map(|doc| document_id(&doc.name)).collect())
    }
}

/// Field names of a raw document, sorted for stable output.
fn sorted_field_keys<V>(fields: &std::collections::HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = fields.keys().cloned().collect();
    keys.sort();
    keys
}

/// Last path segment of a fully-qualified Firestore document name.
pub fn document_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

/// Normalize a profile phone number for Twilio. Bare 10-digit numbers get
/// the default country code prefixed; anything already in E.164 form (or
/// otherwise unrecognized) passes through untouched.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed.starts_with('+')
        && trimmed.len() == 10
        && trimmed.chars().all(|c| c.is_ascii_digit())
    {
        return Some(format!("{default_country_code}{trimmed}"));
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_prefers_legacy_field() {
        let profile = UserProfile {
            phonenumber: Some("9876543210".to_string()),
            phone_number: Some("1112223333".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.phone(), Some("9876543210"));
    }

    #[test]
    fn phone_falls_back_when_legacy_empty() {
        let profile = UserProfile {
            phonenumber: Some(String::new()),
            phone_number: Some("9876543210".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.phone(), Some("9876543210"));
    }

    #[test]
    fn display_name_defaults_to_citizen() {
        assert_eq!(UserProfile::default().display_name(), "Citizen");
        let named = UserProfile {
            full_name: Some("KAVIN".to_string()),
            ..Default::default()
        };
        assert_eq!(named.display_name(), "KAVIN");
    }

    #[test]
    fn blank_email_is_treated_as_missing() {
        let profile = UserProfile {
            email: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.email(), None);
    }

    #[test]
    fn normalize_adds_country_code_to_bare_ten_digits() {
        assert_eq!(
            normalize_phone("9876543210", "+91"),
            Some("+919876543210".to_string())
        );
    }

    #[test]
    fn normalize_keeps_e164_and_odd_lengths() {
        assert_eq!(
            normalize_phone("+14155551234", "+91"),
            Some("+14155551234".to_string())
        );
        assert_eq!(
            normalize_phone("12345", "+91"),
            Some("12345".to_string())
        );
        assert_eq!(normalize_phone("  ", "+91"), None);
    }

    #[test]
    fn field_keys_come_back_sorted() {
        let mut fields = std::collections::HashMap::new();
        fields.insert("phonenumber".to_string(), ());
        fields.insert("email".to_string(), ());
        fields.insert("fullName".to_string(), ());
        fields.insert("createdAt".to_string(), ());
        assert_eq!(
            sorted_field_keys(&fields),
            vec!["createdAt", "email", "fullName", "phonenumber"]
        );
    }

    #[test]
    fn document_id_strips_resource_prefix() {
        assert_eq!(
            document_id(
                "projects/civicissue-aae6d/databases/(default)/documents/users/bGXdBCQH2SQ1yZk0QJD4mZb8oiL2"
            ),
            "bGXdBCQH2SQ1yZk0QJD4mZb8oiL2"
        );
    }
}
