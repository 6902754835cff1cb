use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
/// Body of `GET search/issues`.
pub struct SearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
/// Body of `GET rate_limit`.
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub search: RateLimitResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResource {
    pub remaining: u64,
    /// Epoch seconds at which the quota resets.
    pub reset: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Search quota state threaded through consecutive search calls.
pub struct RateLimit {
    /// Remaining search requests, `None` until the forge has reported it.
    pub remaining: Option<u64>,
}

impl RateLimit {
    pub fn new(remaining: u64) -> Self {
        Self {
            remaining: Some(remaining),
        }
    }

    /// Whether the quota must be looked up before the next search.
    pub fn needs_refresh(&self) -> bool {
        matches!(self.remaining, None | Some(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_or_exhausted_quota_needs_refresh() {
        assert!(RateLimit::default().needs_refresh());
        assert!(RateLimit::new(0).needs_refresh());
        assert!(!RateLimit::new(29).needs_refresh());
    }

    #[test]
    fn parses_rate_limit_payload() {
        let body = r#"{
            "resources": {
                "core": {"limit": 5000, "remaining": 4999, "reset": 1},
                "search": {"limit": 30, "remaining": 0, "reset": 1513879151}
            },
            "rate": {"limit": 5000, "remaining": 4999, "reset": 1}
        }"#;

        let parsed: RateLimitResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.resources.search.remaining, 0);
        assert_eq!(parsed.resources.search.reset, 1513879151);
    }

    #[test]
    fn parses_search_payload_without_items() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
        assert_eq!(parsed.total_count, 0);
        assert!(parsed.items.is_empty());
    }
}
