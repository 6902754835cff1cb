//! Implements pull request search for Github
use async_trait::async_trait;
use chrono::Utc;
use log::*;
use reqwest::{
    Client, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use secrecy::ExposeSecret;
use std::time::Duration;

use crate::{
    error::{FindBzsError, Result},
    forge::{
        config::RemoteConfig,
        traits::PullRequestSearch,
        types::{RateLimit, RateLimitResponse},
    },
};

/// Header carrying the remaining quota on every API response.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";

/// Github search implementation using reqwest.
pub struct Github {
    client: Client,
    base_url: Url,
}

impl Github {
    /// Create Github client with personal access token authentication.
    /// An empty token sends unauthenticated requests.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let token = config.token.expose_secret();

        let mut headers = HeaderMap::new();

        if !token.is_empty() {
            let mut token_value =
                HeaderValue::from_str(format!("token {}", token).as_str())?;
            token_value.set_sensitive(true);
            headers.append(AUTHORIZATION, token_value);
        }

        headers.append(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.append(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(&config.api_url)?;

        Ok(Self { client, base_url })
    }

    async fn search_quota(&self) -> Result<RateLimitResponse> {
        let url = self.base_url.join("rate_limit")?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("rate limit lookup failed: {body}");
            return Err(FindBzsError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Make sure at least one search request is available, sleeping until
    /// the quota resets when it is exhausted.
    async fn wait_for_quota(&self, quota: RateLimit) -> Result<()> {
        if !quota.needs_refresh() {
            return Ok(());
        }

        debug!("looking up github search rate remaining");
        let search = self.search_quota().await?.resources.search;

        if search.remaining == 0 {
            warn!("exhausted github search API rate");
            let wait = quota_wait(search.reset, Utc::now().timestamp());
            info!(
                "sleeping {} seconds until the search API rate resets",
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;
        }

        Ok(())
    }
}

/// Time to sleep until `reset` (epoch seconds), padded by one second.
pub fn quota_wait(reset: i64, now: i64) -> Duration {
    let remaining = (reset - now).max(0) as u64;
    Duration::from_secs(remaining + 1)
}

fn remaining_from_headers(headers: &HeaderMap) -> RateLimit {
    RateLimit {
        remaining: headers
            .get(RATE_LIMIT_REMAINING_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok()),
    }
}

#[async_trait]
impl PullRequestSearch for Github {
    async fn search_merged(
        &self,
        project: &str,
        sha: &str,
        quota: RateLimit,
    ) -> Result<(String, RateLimit)> {
        self.wait_for_quota(quota).await?;

        let mut url = self.base_url.join("search/issues")?;
        url.set_query(Some(&format!(
            "q=sha:{sha}+type:pr+is:merged+repo:{project}"
        )));

        debug!("querying {url}");

        let response = self.client.get(url.clone()).send().await?;
        let quota = remaining_from_headers(response.headers());
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("search for {sha} failed: {body}");
            return Err(FindBzsError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok((body, quota))
    }
}
