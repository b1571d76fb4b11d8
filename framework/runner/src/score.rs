use std::future::Future;

use tokio::time::error::Elapsed;
use yisubench_http::prelude::{Method, SessionError};

use crate::action::ActionResult;

/// Penalty for a request that timed out.
pub const TIMEOUT_PENALTY: i64 = -20;
/// Penalty for a POST that succeeded but took longer than the request timeout.
pub const SLOW_POST_PENALTY: i64 = -100;
/// Penalty for any other failure.
pub const ERROR_PENALTY: i64 = -10;

/// Points earned by one action, with the error message when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub points: i64,
    pub error: Option<String>,
}

impl Score {
    pub fn zero() -> Self {
        Self {
            points: 0,
            error: None,
        }
    }

    pub fn failed(error: &anyhow::Error) -> Self {
        Self {
            points: ErrorKind::classify(error).penalty(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    SlowPost,
    Other,
}

impl ErrorKind {
    pub fn classify(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if let Some(session_error) = cause.downcast_ref::<SessionError>() {
                if session_error.is_slow_post() {
                    return ErrorKind::SlowPost;
                }
                if session_error.is_timeout() {
                    return ErrorKind::Timeout;
                }
            }

            if cause.is::<Elapsed>() {
                return ErrorKind::Timeout;
            }
        }

        ErrorKind::Other
    }

    pub fn penalty(self) -> i64 {
        match self {
            ErrorKind::Timeout => TIMEOUT_PENALTY,
            ErrorKind::SlowPost => SLOW_POST_PENALTY,
            ErrorKind::Other => ERROR_PENALTY,
        }
    }
}

/// Await `operation` and turn its outcome into a [Score].
///
/// Successful GETs are worth their result, successful POSTs twice their result. A non-positive
/// result earns nothing.
pub async fn calc_score<F>(method: &Method, name: &str, operation: F) -> Score
where
    F: Future<Output = ActionResult>,
{
    match operation.await {
        Ok(points) if points > 0 && *method == Method::GET => Score {
            points,
            error: None,
        },
        Ok(points) if points > 0 && *method == Method::POST => Score {
            points: points * 2,
            error: None,
        },
        Ok(_) => Score::zero(),
        Err(e) => {
            log::debug!("{name} failed: {e:?}");
            Score::failed(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Context;
    use yisubench_core::prelude::BenchScore;
    use yisubench_http::prelude::StatusCode;

    use super::*;

    async fn ok(points: i64) -> ActionResult {
        Ok(points)
    }

    #[tokio::test]
    async fn successful_get_scores_its_result() {
        let score = calc_score(&Method::GET, "PageLoadCheck", ok(5)).await;
        assert_eq!(score, Score { points: 5, error: None });
    }

    #[tokio::test]
    async fn successful_post_scores_double() {
        let score = calc_score(&Method::POST, "TweetCheck", ok(5)).await;
        assert_eq!(score.points, 10);
    }

    #[tokio::test]
    async fn non_positive_result_scores_nothing() {
        assert_eq!(
            calc_score(&Method::GET, "FaviconCheck", ok(0)).await,
            Score::zero()
        );
        assert_eq!(
            calc_score(&Method::POST, "LoginCheck", ok(-3)).await,
            Score::zero()
        );
    }

    #[tokio::test]
    async fn timeout_is_penalised() {
        let score = calc_score(&Method::GET, "MyPageCheck", async {
            tokio::time::timeout(Duration::from_millis(1), std::future::pending::<()>()).await?;
            Ok::<i64, anyhow::Error>(1)
        })
        .await;
        assert_eq!(score.points, TIMEOUT_PENALTY);
        assert!(score.error.is_some());
    }

    #[tokio::test]
    async fn slow_post_is_penalised_through_context() {
        let score = calc_score(&Method::POST, "TweetCheck", async {
            Err::<i64, _>(SessionError::SlowPost {
                elapsed: Duration::from_secs(31),
                limit: Duration::from_secs(30),
            })
            .context("tweet failed")
        })
        .await;
        assert_eq!(score.points, SLOW_POST_PENALTY);
        assert_eq!(score.error.as_deref(), Some("tweet failed"));
    }

    #[tokio::test]
    async fn other_errors_are_penalised() {
        let score = calc_score(&Method::GET, "HashTagCheck", async {
            Err::<i64, _>(anyhow::Error::from(SessionError::Status(
                StatusCode::INTERNAL_SERVER_ERROR,
            )))
        })
        .await;
        assert_eq!(score.points, ERROR_PENALTY);

        let score = calc_score(&Method::GET, "HashTagCheck", async {
            Err::<i64, _>(anyhow::anyhow!("hashtag is not displayed"))
        })
        .await;
        assert_eq!(score.points, ERROR_PENALTY);
        assert_eq!(score.error.as_deref(), Some("hashtag is not displayed"));
    }

    #[tokio::test]
    async fn repeated_slow_posts_collapse_into_one_message() {
        let mut total = BenchScore::new();
        for millis in [30_001, 30_017, 31_250] {
            let score = calc_score(&Method::POST, "TweetCheck", async move {
                Err::<i64, _>(anyhow::Error::from(SessionError::SlowPost {
                    elapsed: Duration::from_millis(millis),
                    limit: Duration::from_secs(30),
                }))
            })
            .await;
            total.add(score.points, score.error);
        }

        assert_eq!(total.points, 3 * SLOW_POST_PENALTY);
        assert_eq!(total.error_message(), "post request timeout\n");
    }
}
