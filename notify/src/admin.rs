//! Admin REST clients for destructive maintenance and Auth lookups.
//!
//! The wipe commands talk to the Firestore and Identity Toolkit REST APIs
//! directly with a Google OAuth2 bearer token. The token comes from
//! `GOOGLE_OAUTH_ACCESS_TOKEN` (e.g. `gcloud auth print-access-token`) or,
//! when running on GCP, from the instance metadata service.

use anyhow::Result;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use tracing::{debug, info, warn};

/// Firestore commit accepts at most 500 writes per call.
const DELETE_BATCH_SIZE: usize = 500;
/// Identity Toolkit batchGet page size.
const AUTH_PAGE_SIZE: u32 = 1000;

/// Firebase Auth account record, reduced to the fields the tooling reports.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    #[serde(rename = "localId")]
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

impl AuthUser {
    /// Email when present, then display name, then uid; used for
    /// operator-facing logs.
    pub fn label(&self) -> &str {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .or_else(|| self.display_name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or(&self.local_id)
    }
}

/// REST client for the Firestore and Firebase Auth admin surfaces.
pub struct FirebaseAdmin {
    http_client: HttpClient,
    firestore_base: String,
    auth_base: String,
}

impl FirebaseAdmin {
    pub fn new(project_id: &str) -> Self {
        let firestore_base = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            project_id
        );
        let auth_base = format!(
            "https://identitytoolkit.googleapis.com/v1/projects/{}",
            project_id
        );
        Self {
            http_client: HttpClient::new(),
            firestore_base,
            auth_base,
        }
    }

    /// Get a Google Cloud access token from the environment or, failing
    /// that, the metadata service (Cloud Run / GCE).
    async fn access_token(&self) -> Result<String> {
        if let Ok(token) = env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            if !token.is_empty() {
                debug!("Using access token from GOOGLE_OAUTH_ACCESS_TOKEN");
                return Ok(token);
            }
        }

        let metadata_url =
            "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

        let response = self
            .http_client
            .get(metadata_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Failed to get access token from metadata service; set GOOGLE_OAUTH_ACCESS_TOKEN for local use"
            ));
        }

        let token_response: Value = response.json().await?;
        let access_token = token_response
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid token response"))?;

        Ok(access_token.to_string())
    }

    /// List every collection id in the database, following pagination.
    pub async fn list_collection_ids(&self) -> Result<Vec<String>> {
        let token = self.access_token().await?;
        let url = format!("{}:listCollectionIds", self.firestore_base);

        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut body = json!({ "pageSize": 100 });
            if let Some(ref t) = page_token {
                body["pageToken"] = json!(t);
            }

            let response = self
                .http_client
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(anyhow::anyhow!(
                    "listCollectionIds failed: {} {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ));
            }

            let page: Value = response.json().await?;
            if let Some(batch) = page.get("collectionIds").and_then(|v| v.as_array()) {
                ids.extend(batch.iter().filter_map(|v| v.as_str().map(String::from)));
            }

            page_token = page
                .get("nextPageToken")
                .and_then(|v| v.as_str())
                .map(String::from);
            if page_token.is_none() {
                break;
            }
        }

        Ok(ids)
    }

    /// Delete every document in a collection, committing deletes in batches
    /// of up to 500 writes. `progress` is invoked with the running count
    /// after each batch. Returns the number of documents deleted.
    pub async fn delete_collection(
        &self,
        collection_id: &str,
        mut progress: impl FnMut(u64),
    ) -> Result<u64> {
        let token = self.access_token().await?;
        let list_url = format!("{}/{}", self.firestore_base, collection_id);
        let commit_url = format!("{}:commit", self.firestore_base);

        let mut deleted = 0u64;
        // Deleting invalidates page cursors, so re-fetch the first page
        // until the collection is drained.
        loop {
            let response = self
                .http_client
                .get(&list_url)
                .bearer_auth(&token)
                .query(&[
                    ("pageSize", DELETE_BATCH_SIZE.to_string()),
                    ("mask.fieldPaths", "__name__".to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(anyhow::anyhow!(
                    "listing documents in \"{}\" failed: {} {}",
                    collection_id,
                    response.status(),
                    response.text().await.unwrap_or_default()
                ));
            }

            let page: Value = response.json().await?;
            let names: Vec<String> = page
                .get("documents")
                .and_then(|v| v.as_array())
                .map(|docs| {
                    docs.iter()
                        .filter_map(|d| d.get("name").and_then(|n| n.as_str()))
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            if names.is_empty() {
                break;
            }

            let writes: Vec<Value> = names.iter().map(|name| json!({ "delete": name })).collect();
            let commit = self
                .http_client
                .post(&commit_url)
                .bearer_auth(&token)
                .json(&json!({ "writes": writes }))
                .send()
                .await?;

            if !commit.status().is_success() {
                return Err(anyhow::anyhow!(
                    "batch delete in \"{}\" failed: {} {}",
                    collection_id,
                    commit.status(),
                    commit.text().await.unwrap_or_default()
                ));
            }

            deleted += names.len() as u64;
            progress(deleted);
        }

        info!(
            "Deleted {} documents from collection \"{}\"",
            deleted, collection_id
        );
        Ok(deleted)
    }

    /// Fetch one page of Auth accounts. Returns the page and the token for
    /// the next one, `None` when exhausted.
    pub async fn list_users_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<(Vec<AuthUser>, Option<String>)> {
        let token = self.access_token().await?;
        let url = format!("{}/accounts:batchGet", self.auth_base);

        let mut query = vec![("maxResults", AUTH_PAGE_SIZE.to_string())];
        if let Some(t) = page_token {
            query.push(("nextPageToken", t.to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "listing auth users failed: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let page: Value = response.json().await?;
        let users: Vec<AuthUser> = page
            .get("users")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        let next = page
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(String::from);

        Ok((users, next))
    }

    /// Delete a batch of Auth accounts by uid.
    pub async fn delete_users(&self, local_ids: &[String]) -> Result<()> {
        let token = self.access_token().await?;
        let url = format!("{}/accounts:batchDelete", self.auth_base);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({ "localIds": local_ids, "force": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "deleting auth users failed: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        // Partial failures come back in-band rather than as an HTTP error.
        let body: Value = response.json().await?;
        if let Some(errors) = body.get("errors").and_then(|v| v.as_array()) {
            for err in errors {
                warn!("auth batch delete error: {}", err);
            }
        }

        Ok(())
    }

    /// Look up one Auth account by uid; `None` when the account is unknown.
    pub async fn lookup_user(&self, uid: &str) -> Result<Option<AuthUser>> {
        let token = self.access_token().await?;
        let url = format!("{}/accounts:lookup", self.auth_base);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({ "localId": [uid] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "auth lookup failed: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body: Value = response.json().await?;
        let mut users: Vec<AuthUser> = body
            .get("users")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(users.pop())
    }
}

/// True when an admin API error looks like a missing Identity Toolkit
/// API enablement; the wipe command prints a remediation hint for these.
pub fn is_permission_error(err: &anyhow::Error) -> bool {
    let text = err.to_string();
    text.contains("PERMISSION_DENIED") || text.contains("403")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_user_label_prefers_email() {
        let user: AuthUser = serde_json::from_value(json!({
            "localId": "bGXdBCQH2SQ1yZk0QJD4mZb8oiL2",
            "email": "kavin@example.com"
        }))
        .unwrap();
        assert_eq!(user.label(), "kavin@example.com");
    }

    #[test]
    fn auth_user_label_falls_back_to_display_name() {
        let user: AuthUser = serde_json::from_value(json!({
            "localId": "uid-1",
            "displayName": "Kavin R"
        }))
        .unwrap();
        assert_eq!(user.label(), "Kavin R");
        let with_email: AuthUser = serde_json::from_value(json!({
            "localId": "uid-1",
            "email": "kavin@example.com",
            "displayName": "Kavin R"
        }))
        .unwrap();
        assert_eq!(with_email.label(), "kavin@example.com");
    }

    #[test]
    fn auth_user_label_falls_back_to_uid() {
        let user: AuthUser = serde_json::from_value(json!({
            "localId": "bGXdBCQH2SQ1yZk0QJD4mZb8oiL2"
        }))
        .unwrap();
        assert_eq!(user.label(), "bGXdBCQH2SQ1yZk0QJD4mZb8oiL2");
        let empty: AuthUser = serde_json::from_value(json!({
            "localId": "uid-1",
            "email": ""
        }))
        .unwrap();
        assert_eq!(empty.label(), "uid-1");
    }

    #[test]
    fn permission_errors_are_recognized() {
        let err = anyhow::anyhow!("listing auth users failed: 403 Forbidden PERMISSION_DENIED");
        assert!(is_permission_error(&err));
        let other = anyhow::anyhow!("connection refused");
        assert!(!is_permission_error(&other));
    }
}
