use std::fmt;

use anyhow::{Context, bail};
use serde_json::Value;

use crate::Document;

/// Client for a Firebase Realtime Database REST endpoint.
pub struct FirebaseClient {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub path: String,
    pub uploaded: usize,
    pub before: usize,
    pub after: usize,
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uploaded {} data points to {}; database now has {} data points, from {}",
            self.uploaded, self.path, self.after, self.before
        )
    }
}

impl FirebaseClient {
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            auth,
        }
    }

    fn node_url(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.node_url(path));
        match &self.auth {
            Some(token) => builder.query(&[("auth", token)]),
            None => builder,
        }
    }

    /// Number of direct children stored under `path`; zero for an empty node.
    pub async fn count(&self, path: &str) -> anyhow::Result<usize> {
        let resp = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .context("failed to reach document store")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("reading {path} failed ({status}): {body}");
        }

        let value: Value = resp.json().await.context("invalid document store response")?;
        Ok(child_count(&value))
    }

    /// Merges `document` into the node at `path`, keeping keys it does not
    /// mention.
    pub async fn update(&self, path: &str, document: &Document) -> anyhow::Result<UploadReport> {
        let before = self.count(path).await?;

        let resp = self
            .request(reqwest::Method::PATCH, path)
            .json(document)
            .send()
            .await
            .context("failed to reach document store")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("upload to {path} failed ({status}): {body}");
        }

        let after = self.count(path).await?;
        let report = UploadReport {
            path: path.to_owned(),
            uploaded: document.len(),
            before,
            after,
        };
        info!("{report}");
        Ok(report)
    }
}

fn child_count(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Object(map) => map.len(),
        Value::Array(items) => items.iter().filter(|v| !v.is_null()).count(),
        _ => 1,
    }
}
