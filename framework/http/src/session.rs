use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use tokio::time::Instant;
use url::Url;
use yisubench_core::prelude::BenchConfig;

use crate::cache::{Cache, CacheData, CacheKey};
use crate::error::SessionError;
use crate::response::Response;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Default)]
struct RequestBody {
    content_type: Option<&'static str>,
    bytes: Option<Bytes>,
}

/// HTTP client for one simulated user.
///
/// Owns a cookie jar, a connection pool and a private [Cache]. Requests are resolved against the
/// host the session is bound to, redirects are followed at most once by hand, and gzip responses
/// are decompressed before they are returned.
#[derive(Debug)]
pub struct Session {
    host: String,
    base: Url,
    client: reqwest::Client,
    cache: Arc<Cache>,
    request_timeout: Duration,
}

impl Session {
    pub fn new(host: &str, config: &BenchConfig) -> Result<Self, SessionError> {
        let base = Url::parse(&format!("http://{host}/"))
            .map_err(|e| {
                log::debug!("Invalid host {host}: {e}");
                SessionError::InvalidUrl(format!("{host}: {e}"))
            })?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(SessionError::Request)?;

        Ok(Self {
            host: host.to_string(),
            base,
            client,
            cache: Arc::new(Cache::new()),
            request_timeout: config.request_timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Send a request with an optional raw body.
    pub async fn send_simple(
        &self,
        method: Method,
        uri: &str,
        body: Option<Bytes>,
    ) -> Result<Response, SessionError> {
        let url = self.resolve(uri)?;
        let body = RequestBody {
            content_type: None,
            bytes: body,
        };
        self.do_request(method, url, body).await
    }

    /// Send an `application/x-www-form-urlencoded` POST.
    pub async fn send_form_post<K, V>(
        &self,
        uri: &str,
        fields: &[(K, V)],
    ) -> Result<Response, SessionError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.resolve(uri)?;
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();
        let body = RequestBody {
            content_type: Some(FORM_CONTENT_TYPE),
            bytes: Some(Bytes::from(encoded)),
        };
        self.do_request(Method::POST, url, body).await
    }

    /// Resolve `uri` against the bound host. A missing scheme becomes `http`.
    pub fn resolve(&self, uri: &str) -> Result<Url, SessionError> {
        let parsed = if uri.contains("://") {
            Url::parse(uri)
        } else if let Some(rest) = uri.strip_prefix("//") {
            Url::parse(&format!("http://{rest}"))
        } else {
            self.base.join(uri)
        };

        parsed.map_err(|e| {
            log::debug!("Cannot resolve {uri}: {e}");
            SessionError::InvalidUrl(format!("{uri}: {e}"))
        })
    }

    async fn do_request(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
    ) -> Result<Response, SessionError> {
        let start = Instant::now();
        let key = CacheKey::new(&method, &url, body.bytes.as_ref());

        let response = match self.cache.get(&key) {
            Some(cached) => {
                log::trace!("Cache hit for {} {}", method, url);
                cached.response
            }
            None => {
                let mut response = self.execute(method.clone(), url, &body).await?;

                if response.status.is_redirection() {
                    if let Some(redirected) = self.follow_redirect(&method, &response, &body).await
                    {
                        response = redirected;
                    }
                }

                if response.status.is_success() {
                    self.populate_cache(key, response.clone());
                }

                response
            }
        };

        if !response.status.is_success() && !response.status.is_redirection() {
            return Err(SessionError::Status(response.status));
        }

        let elapsed = start.elapsed();
        if method == Method::POST && elapsed > self.request_timeout {
            log::debug!(
                "POST {} took {}ms, limit {}ms",
                response.url,
                elapsed.as_millis(),
                self.request_timeout.as_millis()
            );
            return Err(SessionError::SlowPost {
                elapsed,
                limit: self.request_timeout,
            });
        }

        Ok(response)
    }

    /// Follow a single redirect. The redirected response is only adopted when it is a success.
    async fn follow_redirect(
        &self,
        method: &Method,
        response: &Response,
        body: &RequestBody,
    ) -> Option<Response> {
        let location = response.location()?;

        // 303, and 301/302 after a POST, switch to a body-less GET like a browser does.
        let switch_to_get = response.status == StatusCode::SEE_OTHER
            || (*method == Method::POST
                && matches!(
                    response.status,
                    StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
                ));
        let (method, body) = if switch_to_get {
            (Method::GET, RequestBody::default())
        } else {
            (method.clone(), body.clone())
        };

        match self.execute(method, location, &body).await {
            Ok(redirected) if redirected.status.is_success() => Some(redirected),
            Ok(redirected) => {
                log::debug!(
                    "Redirect to {} returned {}, keeping the original response",
                    redirected.url,
                    redirected.status
                );
                None
            }
            Err(e) => {
                log::debug!("Redirect follow failed: {e}");
                None
            }
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: &RequestBody,
    ) -> Result<Response, SessionError> {
        let mut request = self.client.request(method, url);
        if let Some(content_type) = body.content_type {
            request = request.header(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        if let Some(bytes) = &body.bytes {
            request = request.body(bytes.clone());
        }

        let response = request.send().await?;
        Response::read(response).await
    }

    /// Store a successful response off the request path.
    fn populate_cache(&self, key: CacheKey, response: Response) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            match CacheData::from_response(&response) {
                Ok(data) => cache.set(key, data),
                Err(e) => log::trace!("Not caching {}: {e}", response.url),
            }
        });
    }

    /// Drop cached responses. Pooled connections are released when the session is dropped.
    pub fn close(&self) {
        self.cache.clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("target:8080", &BenchConfig::default()).unwrap()
    }

    #[test]
    fn resolves_relative_paths_against_host() {
        let url = session().resolve("/login").unwrap();
        assert_eq!(url.as_str(), "http://target:8080/login");

        let url = session().resolve("search?q=travel").unwrap();
        assert_eq!(url.as_str(), "http://target:8080/search?q=travel");
    }

    #[test]
    fn adds_http_scheme_when_missing() {
        let url = session().resolve("//other:9000/favicon.ico").unwrap();
        assert_eq!(url.as_str(), "http://other:9000/favicon.ico");
    }

    #[test]
    fn keeps_absolute_urls() {
        let url = session().resolve("https://example.com/a?b=c").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?b=c");
    }

    #[test]
    fn rejects_invalid_host() {
        let err = Session::new("bad host", &BenchConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidUrl(_)));
    }
}
