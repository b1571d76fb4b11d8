use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{CACHE_CONTROL, ETAG, LAST_MODIFIED};
use reqwest::Method;
use tokio::time::Instant;
use url::Url;

use crate::error::CacheError;
use crate::response::Response;

/// Content derived cache key.
///
/// Two requests for the same method, URL and body share an entry no matter how many times the
/// request was rebuilt. The fragment is dropped because it never reaches the server.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    method: Method,
    url: String,
    body: Option<Bytes>,
}

impl CacheKey {
    pub fn new(method: &Method, url: &Url, body: Option<&Bytes>) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);

        Self {
            method: method.clone(),
            url: url.to_string(),
            body: body.filter(|b| !b.is_empty()).cloned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheData {
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub expires_at: Instant,
    pub response: Response,
}

impl CacheData {
    /// Build an entry from the `Cache-Control` header of a response.
    ///
    /// Only `max-age` is honoured. A response without the header, with `no-store`, or without a
    /// parseable `max-age` is not cacheable.
    pub fn from_response(response: &Response) -> Result<Self, CacheError> {
        let header = response
            .header(CACHE_CONTROL.as_str())
            .filter(|h| !h.trim().is_empty())
            .ok_or(CacheError::MissingCacheControl)?;

        let max_age = parse_max_age(header)?;

        Ok(Self {
            last_modified: response.header(LAST_MODIFIED.as_str()).map(str::to_string),
            etag: response.header(ETAG.as_str()).map(str::to_string),
            expires_at: Instant::now() + max_age,
            response: response.clone(),
        })
    }

    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

fn parse_max_age(header: &str) -> Result<Duration, CacheError> {
    let mut max_age = None;

    for directive in header.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        let (name, value) = match directive.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
            None => (directive, None),
        };

        if name.eq_ignore_ascii_case("no-store") {
            return Err(CacheError::NoStore);
        }

        if name.eq_ignore_ascii_case("max-age") {
            max_age = Some(value.unwrap_or_default());
        }
    }

    let value = max_age.ok_or(CacheError::MissingMaxAge)?;
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| CacheError::InvalidMaxAge(value.to_string()))
}

/// In-memory response cache, private to one session.
///
/// Expiry is checked lazily when an entry is read.
#[derive(Debug, Default)]
pub struct Cache {
    data: RwLock<HashMap<CacheKey, CacheData>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheData> {
        {
            let data = self.data.read();
            match data.get(key) {
                None => return None,
                Some(entry) if entry.is_valid() => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        let mut data = self.data.write();
        if data.get(key).is_some_and(|entry| !entry.is_valid()) {
            data.remove(key);
        }
        None
    }

    pub fn set(&self, key: CacheKey, value: CacheData) {
        self.data.write().insert(key, value);
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
