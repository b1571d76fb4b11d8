use anyhow::{bail, Context};
use serde::Serialize;

/// Hook status sent when a benchmark starts.
pub const BENCH_RUNNING: i64 = 2;
/// Hook status sent when a benchmark has finished.
pub const BENCH_DONE: i64 = 0;

#[derive(Debug, Serialize)]
struct BenchHook {
    team_id: i64,
    status: i64,
}

/// Client for the contest portal, which shows teams whether their benchmark is running.
#[derive(Debug, Clone)]
pub struct Portal {
    host: String,
    client: reqwest::Client,
}

impl Portal {
    /// Rejects an empty host and hosts pointing at `localhost`.
    pub fn new(host: &str) -> anyhow::Result<Self> {
        if host.is_empty() || host.contains("localhost") {
            bail!("invalid portal host: {host:?}");
        }

        Ok(Self {
            host: host.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Create a client and make sure the portal answers.
    pub async fn connect(host: &str) -> anyhow::Result<Self> {
        let portal = Self::new(host)?;
        portal.check_reachable().await?;
        Ok(portal)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Any response counts, only a failure to reach the portal is an error.
    pub async fn check_reachable(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(format!("http://{}", self.host))
            .send()
            .await
            .with_context(|| format!("Portal at {} is unreachable", self.host))?;
        log::debug!("Portal responded with {}", response.status());
        Ok(())
    }

    pub async fn bench_started(&self, team_id: i64) -> anyhow::Result<()> {
        self.notify(team_id, BENCH_RUNNING).await
    }

    pub async fn bench_finished(&self, team_id: i64) -> anyhow::Result<()> {
        self.notify(team_id, BENCH_DONE).await
    }

    async fn notify(&self, team_id: i64, status: i64) -> anyhow::Result<()> {
        self.client
            .post(format!("http://{}/api/benches/{team_id}", self.host))
            .json(&BenchHook { team_id, status })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_local_and_empty_hosts() {
        assert!(Portal::new("").is_err());
        assert!(Portal::new("localhost:8080").is_err());
        assert!(Portal::new("portal.localhost").is_err());
        assert_eq!(Portal::new("10.0.0.1:8080").unwrap().host(), "10.0.0.1:8080");
    }

    #[test]
    fn hook_body_shape() {
        let body = serde_json::to_string(&BenchHook {
            team_id: 7,
            status: BENCH_RUNNING,
        })
        .unwrap();
        assert_eq!(body, r#"{"team_id":7,"status":2}"#);
    }
}
