use std::path::{Path, PathBuf};

use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::config::Settings;
use crate::errors::BulkError;
use crate::models::{ExportFormat, User};

const PAGE_SIZE: u64 = 100;

// Extract the leaf name from a Content-Disposition header.
static FILENAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename="?([^";]+)"?"#).unwrap());

/// Pagination envelope of `/api/v1/users`.
#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    users: Vec<User>,
}

/// Body of `/admin/bulk/delete`. All fields optional so an unexpected
/// shape still deserializes and can be triaged instead of failing parse.
#[derive(Debug, Deserialize)]
struct BulkDeleteResponse {
    success: Option<bool>,
    deleted_count: Option<u64>,
    error: Option<String>,
}

/// HTTP client for the admin backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    download_dir: PathBuf,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &settings.api_token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            base_url: settings.server_url.trim_end_matches('/').to_string(),
            download_dir: settings.resolved_download_dir(),
        })
    }

    /// Fetches the whole roster, following the server's pagination until
    /// `total` rows have been collected.
    pub async fn fetch_users(&self) -> Result<Vec<User>, BulkError> {
        let mut users: Vec<User> = Vec::new();
        let mut page = 1u64;
        loop {
            let url = format!(
                "{}/api/v1/users?page={}&limit={}",
                self.base_url, page, PAGE_SIZE
            );
            let resp = self.http.get(&url).send().await?;
            let body: UsersPage = resp.json().await?;
            if !body.success {
                return Err(BulkError::Rejected(
                    "the server refused to list users".to_string(),
                ));
            }
            let fetched = body.users.len();
            users.extend(body.users);
            if fetched == 0 || users.len() as u64 >= body.total {
                break;
            }
            page += 1;
        }
        Ok(users)
    }

    /// The export endpoint URL. Ids appear comma-joined in the order they
    /// were selected.
    pub fn export_url(&self, format: ExportFormat, ids: &[u64]) -> String {
        format!(
            "{}/admin/bulk/export?format={}&ids={}",
            self.base_url,
            format.as_str(),
            join_ids(ids)
        )
    }

    /// The terminal stand-in for navigating the browser to the export URL:
    /// fetch the response and save it under the download directory, named
    /// by the server's Content-Disposition when present.
    pub async fn download_export(
        &self,
        format: ExportFormat,
        ids: &[u64],
    ) -> Result<PathBuf, BulkError> {
        let url = self.export_url(format, ids);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BulkError::Transport(format!("server returned {status}")));
        }

        let filename = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| {
                format!(
                    "users-{}.{}",
                    chrono::Local::now().format("%Y%m%d-%H%M%S"),
                    format.extension()
                )
            });

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(filename);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(path)
    }

    /// Deletes the given users in one request. Like the web client, only
    /// the JSON body decides the outcome; a body that is not the expected
    /// shape is a rejection carrying the server's error text when present.
    pub async fn bulk_delete(&self, ids: &[u64]) -> Result<u64, BulkError> {
        let url = format!("{}/admin/bulk/delete", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "ids": ids }))
            .send()
            .await?;
        let body: BulkDeleteResponse = resp.json().await?;
        match (body.success, body.deleted_count) {
            (Some(true), Some(count)) => Ok(count),
            _ => Err(BulkError::Rejected(body.error.unwrap_or_else(|| {
                "the server returned an unexpected response".to_string()
            }))),
        }
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn filename_from_disposition(value: &str) -> Option<String> {
    let name = FILENAME_REGEX.captures(value)?.get(1)?.as_str();
    // Server-supplied names may carry path separators; keep the leaf only.
    Path::new(name)
        .file_name()
        .map(|leaf| leaf.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings(base: &str, download_dir: Option<String>) -> Settings {
        Settings {
            server_url: base.to_string(),
            api_token: None,
            download_dir,
            log_dir: None,
        }
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&settings(base, None)).unwrap()
    }

    #[test]
    fn export_url_carries_format_and_insertion_order() {
        let api = client("http://example.test/");
        let url = api.export_url(ExportFormat::Csv, &[3, 7]);
        assert_eq!(url, "http://example.test/admin/bulk/export?format=csv&ids=3,7");
        let url = api.export_url(ExportFormat::Excel, &[7, 3]);
        assert!(url.contains("format=excel"));
        assert!(url.contains("ids=7,3"));
    }

    #[test]
    fn filename_extraction_handles_quotes_and_paths() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="users.csv""#),
            Some("users.csv".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=export.xlsx"),
            Some("export.xlsx".to_string())
        );
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="../../etc/passwd""#),
            Some("passwd".to_string())
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[tokio::test]
    async fn fetch_users_follows_pagination() {
        let mut server = mockito::Server::new_async().await;
        let page1 = server
            .mock("GET", "/api/v1/users")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("limit".into(), "100".into()),
            ]))
            .with_body(
                r#"{"success": true, "total": 3, "page": 1, "limit": 100, "users": [
                    {"id": 1, "first_name": "Awa", "last_name": "Diallo", "email": "awa@example.com"},
                    {"id": 2, "first_name": "Bintou", "last_name": "Keita", "email": "bintou@example.com"}
                ]}"#,
            )
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/api/v1/users")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_body(
                r#"{"success": true, "total": 3, "page": 2, "limit": 100, "users": [
                    {"id": 3, "first_name": "Coumba", "last_name": "Ndiaye", "email": "coumba@example.com"}
                ]}"#,
            )
            .create_async()
            .await;

        let api = client(&server.url());
        let users = api.fetch_users().await.unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[2].id, 3);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn bulk_delete_success_returns_count() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/admin/bulk/delete")
            .match_body(Matcher::PartialJson(serde_json::json!({ "ids": [1, 2, 5] })))
            .with_body(r#"{"success": true, "deleted_count": 3}"#)
            .create_async()
            .await;

        let api = client(&server.url());
        let deleted = api.bulk_delete(&[1, 2, 5]).await.unwrap();
        assert_eq!(deleted, 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bulk_delete_rejection_passes_server_message_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/admin/bulk/delete")
            .with_status(409)
            .with_body(r#"{"success": false, "error": "locked"}"#)
            .create_async()
            .await;

        let api = client(&server.url());
        let err = api.bulk_delete(&[1]).await.unwrap_err();
        match err {
            BulkError::Rejected(message) => assert_eq!(message, "locked"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bulk_delete_unexpected_shape_is_a_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/admin/bulk/delete")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let api = client(&server.url());
        let err = api.bulk_delete(&[1]).await.unwrap_err();
        assert!(matches!(err, BulkError::Rejected(_)));
    }

    #[tokio::test]
    async fn bulk_delete_non_json_body_is_a_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/admin/bulk/delete")
            .with_status(500)
            .with_body("<html>Internal Server Error</html>")
            .create_async()
            .await;

        let api = client(&server.url());
        let err = api.bulk_delete(&[1]).await.unwrap_err();
        assert!(matches!(err, BulkError::Transport(_)));
    }

    #[tokio::test]
    async fn download_export_saves_under_server_filename() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/admin/bulk/export")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "csv".into()),
                Matcher::UrlEncoded("ids".into(), "3,7".into()),
            ]))
            .with_header("content-disposition", r#"attachment; filename="users.csv""#)
            .with_body("id,email\n3,a@example.com\n7,b@example.com\n")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let api = ApiClient::new(&settings(
            &server.url(),
            Some(dir.path().display().to_string()),
        ))
        .unwrap();

        let path = api.download_export(ExportFormat::Csv, &[3, 7]).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "users.csv");
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("id,email"));
    }

    #[tokio::test]
    async fn download_export_error_status_is_a_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/admin/bulk/export")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let api = client(&server.url());
        let err = api.download_export(ExportFormat::Pdf, &[1]).await.unwrap_err();
        assert!(matches!(err, BulkError::Transport(_)));
    }
}
