//! Implements the IssueTracker trait for Bugzilla's REST API
use async_trait::async_trait;
use log::*;
use reqwest::{
    Client, StatusCode, Url,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    error::{FindBzsError, Result},
    tracker::{
        traits::IssueTracker,
        types::{Bug, BugQuery, BugSearchResponse},
    },
};

/// Header carrying the Bugzilla API key.
pub const API_KEY_HEADER: &str = "x-bugzilla-api-key";

/// Bugzilla client using reqwest against `<url>/rest/`.
pub struct Bugzilla {
    client: Client,
    base_url: Url,
    has_key: bool,
}

impl Bugzilla {
    /// Create Bugzilla client for `url`, authenticating with `api_key` when
    /// one is available.
    pub fn new(url: &str, api_key: Option<SecretString>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.append(ACCEPT, HeaderValue::from_static("application/json"));

        let has_key = api_key.is_some();

        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key.expose_secret())?;
            value.set_sensitive(true);
            headers.append(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(&format!(
            "{}/rest/",
            url.trim_end_matches('/')
        ))?;

        Ok(Self {
            client,
            base_url,
            has_key,
        })
    }
}

#[async_trait]
impl IssueTracker for Bugzilla {
    fn name(&self) -> String {
        self.base_url.host_str().unwrap_or("bugzilla").to_string()
    }

    async fn logged_in(&self) -> Result<bool> {
        if !self.has_key {
            debug!("no bugzilla API key configured");
            return Ok(false);
        }

        let url = self.base_url.join("whoami")?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("bugzilla login check failed: {body}");
                Err(FindBzsError::Http {
                    url: self.base_url.join("whoami")?.to_string(),
                    status: status.as_u16(),
                })
            }
        }
    }

    async fn search(&self, query: &BugQuery) -> Result<Vec<Bug>> {
        let url = self.base_url.join("bug")?;

        let response = self
            .client
            .get(url.clone())
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("bugzilla search failed: {body}");
            return Err(FindBzsError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let result: BugSearchResponse = serde_json::from_str(&body)?;
        Ok(result.bugs)
    }
}
