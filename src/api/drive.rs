//! Implements the `Store` trait against the Google Drive v3 REST API.

use crate::api::{Store, TokenProvider, CSV_MIME, SPREADSHEET_MIME};
use crate::error::{Error, ErrorType, IntoResult, Res};
use crate::model::RemoteFile;
use crate::{utils, Result};
use anyhow::Context;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, trace};
use url::Url;

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3/";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";
const PAGE_SIZE: &str = "1000";

/// One page of a `files.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// A `Store` that holds expense spreadsheets as Google Sheets in a Drive folder.
pub(super) struct DriveStore {
    client: Client,
    tokens: TokenProvider,
    api: Url,
    upload_api: Url,
}

impl DriveStore {
    pub(super) fn new(client: Client, tokens: TokenProvider) -> Res<Self> {
        Ok(Self {
            client,
            tokens,
            api: Url::parse(DRIVE_API).context("Bad Drive API URL")?,
            upload_api: Url::parse(DRIVE_UPLOAD_API).context("Bad Drive upload URL")?,
        })
    }

    /// Attaches a bearer token, sends the request and rejects non-success statuses.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let token = self
            .tokens
            .token()
            .await
            .context("Unable to authenticate with Google")
            .pub_result(ErrorType::Store)?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Unable to {what}"))
            .pub_result(ErrorType::Store)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::msg(
            ErrorType::Store,
            format!("Unable to {what}: Google Drive responded with {status}: {body}"),
        ))
    }

    /// Runs a `files.list` query, following page tokens until every match has been returned.
    async fn query(&self, q: &str) -> Result<Vec<RemoteFile>> {
        let url = files_url(&self.api, None).pub_result(ErrorType::Store)?;
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![("q", q), ("fields", LIST_FIELDS), ("pageSize", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }
            let request = self.client.get(url.clone()).query(&params);
            let page: FileList = self
                .send(request, "list files")
                .await?
                .json()
                .await
                .context("Unable to parse the file list")
                .pub_result(ErrorType::Store)?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        trace!("Query {q} matched {} files", files.len());
        Ok(files)
    }

    async fn create(&self, name: &str, content: Vec<u8>, folder: &str) -> Result<String> {
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": SPREADSHEET_MIME,
            "parents": [folder],
        });
        let boundary = format!("expense-sync-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, &content);
        let mut url = files_url(&self.upload_api, None).pub_result(ErrorType::Store)?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id");
        let request = self
            .client
            .post(url)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        let created: CreatedFile = self
            .send(request, &format!("create '{name}'"))
            .await?
            .json()
            .await
            .context("Unable to parse the created file")
            .pub_result(ErrorType::Store)?;
        debug!("Created '{name}' with id {}", created.id);
        Ok(created.id)
    }

    async fn replace(&self, id: &str, name: &str, content: Vec<u8>) -> Result<String> {
        let mut url = files_url(&self.upload_api, Some(id)).pub_result(ErrorType::Store)?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("fields", "id");
        let request = self
            .client
            .patch(url)
            .header(CONTENT_TYPE, CSV_MIME)
            .body(content);
        let updated: CreatedFile = self
            .send(request, &format!("update '{name}'"))
            .await?
            .json()
            .await
            .context("Unable to parse the updated file")
            .pub_result(ErrorType::Store)?;
        debug!("Replaced the content of '{name}' ({})", updated.id);
        Ok(updated.id)
    }
}

#[async_trait::async_trait]
impl Store for DriveStore {
    async fn list(&self, folder: &str) -> Result<Vec<RemoteFile>> {
        self.query(&format!("'{}' in parents and trashed = false", escape(folder)))
            .await
    }

    async fn download(&self, name: &str, folder: &str) -> Result<Vec<u8>> {
        let q = format!(
            "'{}' in parents and mimeType='{SPREADSHEET_MIME}' and name='{}' and trashed = false",
            escape(folder),
            escape(name)
        );
        let file = self.query(&q).await?.into_iter().next().ok_or_else(|| {
            Error::msg(
                ErrorType::NotFound,
                format!("No files found with the name '{name}' in the specified folder"),
            )
        })?;

        let mut url = files_url(&self.api, Some(&format!("{}/export", file.id)))
            .pub_result(ErrorType::Store)?;
        url.query_pairs_mut().append_pair("mimeType", CSV_MIME);
        let bytes = self
            .send(self.client.get(url), &format!("export '{name}'"))
            .await?
            .bytes()
            .await
            .with_context(|| format!("Unable to read the content of '{name}'"))
            .pub_result(ErrorType::Store)?;
        Ok(bytes.to_vec())
    }

    async fn upload(
        &self,
        name: &str,
        local_path: &Path,
        folder: &str,
        existing_id: Option<&str>,
    ) -> Result<String> {
        let content = utils::read_bytes(local_path)
            .await
            .pub_result(ErrorType::Store)?;
        match existing_id {
            Some(id) => self.replace(id, name, content).await,
            None => self.create(name, content, folder).await,
        }
    }
}

/// Escapes a value for use inside a single-quoted Drive query string.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Builds a `multipart/related` body holding JSON metadata followed by CSV media.
fn multipart_related(boundary: &str, metadata: &serde_json::Value, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {CSV_MIME}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// `<base>files` or `<base>files/<id>`.
fn files_url(base: &Url, id: Option<&str>) -> Res<Url> {
    let path = match id {
        Some(id) => format!("files/{id}"),
        None => "files".to_string(),
    };
    base.join(&path)
        .with_context(|| format!("Unable to build a Drive URL for '{path}'"))
}
