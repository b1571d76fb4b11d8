use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDateTime;
use md5::{Digest, Md5};
use parking_lot::Mutex;
use serde::Deserialize;
use yisubench_http::prelude::{Method, Session};
use yisubench_runner::prelude::{Account, ActionResult};

use crate::markup::Document;
use crate::state::ScenarioState;
use crate::words::{random_int_string, random_pass, random_word};

/// Digest of the published `/js/script.js`.
pub const JS_MD5: &str = "287d922ddd86b00403c00e97e2d79432";
/// Digest of the published `/css/style.css`.
pub const CSS_MD5: &str = "9dca706b1509accdaa68f07155a3c45f";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PAGE_SIZE: usize = 50;
const PAGE_LOAD_PENALTY: i64 = 10;

const GUEST_GREETING: &str = "こんにちは ゲストさん";
const SELF_PAGE_HEADING: &str = "あなたのページです";
const FOLLOW_LABEL: &str = "フォロー";
const UNFOLLOW_LABEL: &str = "アンフォロー";
const TWEET_PREFIX: &str = "テストツイート";

/// Expected MD5 digests of the static assets, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDigests {
    pub js: String,
    pub css: String,
}

impl Default for AssetDigests {
    fn default() -> Self {
        Self {
            js: JS_MD5.to_string(),
            css: CSS_MD5.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    result: String,
}

/// Checks against one Isuwitter host, as one user.
///
/// Every check returns the points it earned. A checker owns its session, so cookies and cached
/// responses are shared by the checks of one scenario only.
#[derive(Debug)]
pub struct IsuwitterChecker {
    session: Session,
    account: Account,
    assets: AssetDigests,
    initialize_timeout: Duration,
    state: Mutex<ScenarioState>,
}

impl IsuwitterChecker {
    pub fn new(
        session: Session,
        account: Account,
        assets: AssetDigests,
        initialize_timeout: Duration,
    ) -> Self {
        Self {
            session,
            account,
            assets,
            initialize_timeout,
            state: Mutex::new(ScenarioState::default()),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn state(&self) -> ScenarioState {
        self.state.lock().clone()
    }

    pub async fn initial_check(self: Arc<Self>) -> ActionResult {
        let response = tokio::time::timeout(
            self.initialize_timeout,
            self.session.send_simple(Method::GET, "/initialize", None),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "initialize took longer than {}s",
                self.initialize_timeout.as_secs()
            )
        })??;

        let ok = response
            .json::<InitializeResponse>()
            .is_ok_and(|r| r.result.eq_ignore_ascii_case("ok"));
        if !ok {
            bail!("initialize failed");
        }

        Ok(1)
    }

    pub async fn js_check(self: Arc<Self>) -> ActionResult {
        self.asset_check("/js/script.js", &self.assets.js, "invalid JavaScript file")
            .await
    }

    pub async fn css_check(self: Arc<Self>) -> ActionResult {
        self.asset_check("/css/style.css", &self.assets.css, "invalid CSS file")
            .await
    }

    /// Never fails, a missing favicon only earns nothing.
    pub async fn favicon_check(self: Arc<Self>) -> ActionResult {
        match self.session.send_simple(Method::GET, "/favicon.ico", None).await {
            Ok(_) => Ok(1),
            Err(e) => {
                log::debug!("Favicon request failed: {e}");
                Ok(0)
            }
        }
    }

    /// Load the main pages. Each page earns one point or costs [PAGE_LOAD_PENALTY].
    pub async fn page_load_check(self: Arc<Self>) -> ActionResult {
        let paths = [
            "/".to_string(),
            format!("/{}", self.account.name),
            format!("/search?q={}", escape(random_word())),
            format!("/hashtag/{}", escape(random_word())),
        ];

        let mut points = 0;
        for path in &paths {
            match self.session.send_simple(Method::GET, path, None).await {
                Ok(_) => points += 1,
                Err(e) => {
                    log::debug!("Page load of {path} failed: {e}");
                    points -= PAGE_LOAD_PENALTY;
                }
            }
        }

        Ok(points)
    }

    pub async fn my_page_check(self: Arc<Self>) -> ActionResult {
        let name = &self.account.name;
        let doc = self.get_page(&format!("/{name}")).await?;

        if doc.text("h3") != format!("{name} さんのツイート") {
            bail!("user page title is wrong");
        }
        if doc
            .select(".tweet")
            .iter()
            .any(|tweet| tweet.text_of(".tweet-user-name") != *name)
        {
            bail!("user page contains tweets of another user");
        }

        Ok(1)
    }

    pub async fn login_page_check(self: Arc<Self>) -> ActionResult {
        let doc = self.get_page("/").await?;
        check_guest_page(&doc)?;
        Ok(1)
    }

    /// A wrong password must be refused with an error message.
    pub async fn fake_login_check(self: Arc<Self>) -> ActionResult {
        let password = random_pass();
        let doc = self
            .post_form(
                "/login",
                &[("name", self.account.name.as_str()), ("password", password.as_str())],
            )
            .await?;

        if !doc.exists(".flush") {
            bail!("login error message is missing");
        }

        Ok(1)
    }

    /// Log in, then remember another user from the timeline and the paging cursor.
    pub async fn login_check(self: Arc<Self>) -> ActionResult {
        let name = &self.account.name;
        let doc = self
            .post_form(
                "/login",
                &[("name", name.as_str()), ("password", self.account.password.as_str())],
            )
            .await?;

        if doc.exists(".login") {
            bail!("login form is shown after logging in");
        }
        if !doc.exists(".logout") {
            bail!("logout button is missing after logging in");
        }
        if doc.text(".name") != format!("こんにちは {name}さん") {
            bail!("user name is missing after logging in");
        }
        if !doc.exists(".post") {
            bail!("tweet form is missing after logging in");
        }

        let tweets = doc.select(".tweet");
        let first_user = tweets
            .iter()
            .map(|tweet| tweet.text_of(".tweet-user-name"))
            .find(|user| user != name)
            .context("no other user found on the timeline")?;
        let until = tweets
            .last()
            .and_then(|tweet| tweet.attr("data-time"))
            .context("data-time attribute is missing")?;

        let mut state = self.state.lock();
        state.first_user = Some(first_user);
        state.until = Some(until.to_string());

        Ok(1)
    }

    /// Load the next page of the timeline and check it is full and ordered newest first.
    pub async fn paging_check(self: Arc<Self>) -> ActionResult {
        let until = self
            .state
            .lock()
            .until
            .clone()
            .context("until parameter is missing")?;

        let doc = self
            .get_page(&format!("/?append=1&until={}", escape(&until)))
            .await?;

        let tweets = doc.select(".tweet");
        if tweets.len() != PAGE_SIZE {
            log::debug!("Paging returned {} tweets", tweets.len());
            bail!("paging did not return {PAGE_SIZE} tweets");
        }

        let mut newer = NaiveDateTime::parse_from_str(&until, TIME_FORMAT)
            .map_err(|_| anyhow!("until parameter is malformed"))?;
        for tweet in &tweets {
            let time = tweet
                .attr("data-time")
                .context("data-time attribute is missing")?;
            let older = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
                .map_err(|_| anyhow!("data-time attribute is malformed"))?;
            if older > newer {
                bail!("tweets are not ordered newest first");
            }
            newer = older;
        }

        let last = tweets
            .last()
            .and_then(|tweet| tweet.attr("data-time"))
            .context("data-time attribute is missing")?;
        self.state.lock().until = Some(last.to_string());

        Ok(1)
    }

    pub async fn self_page_check(self: Arc<Self>) -> ActionResult {
        let doc = self.get_page(&format!("/{}", self.account.name)).await?;
        if doc.text("h4") != SELF_PAGE_HEADING {
            bail!("own page is not marked as such");
        }
        Ok(1)
    }

    pub async fn unfollow_button_check(self: Arc<Self>) -> ActionResult {
        let user = self.first_user()?;
        let doc = self.get_page(&format!("/{user}")).await?;
        if doc.text("#user-unfollow-button") != UNFOLLOW_LABEL {
            bail!("unfollow button is missing");
        }
        Ok(1)
    }

    pub async fn unfollow_check(self: Arc<Self>) -> ActionResult {
        let user = self.first_user()?;
        self.post_form("/unfollow", &[("user", user.as_str())])
            .await?;
        Ok(1)
    }

    /// Tweets of an unfollowed user must leave the timeline.
    pub async fn remove_from_top_check(self: Arc<Self>) -> ActionResult {
        let user = self.first_user()?;
        let doc = self.get_page("/").await?;
        if has_tweet_by(&doc, &user) {
            bail!("unfollowed user is still on the timeline");
        }
        Ok(1)
    }

    pub async fn follow_button_check(self: Arc<Self>) -> ActionResult {
        let user = self.first_user()?;
        let doc = self.get_page(&format!("/{user}")).await?;
        if doc.text("#user-follow-button") != FOLLOW_LABEL {
            bail!("follow button is missing");
        }
        Ok(1)
    }

    pub async fn follow_check(self: Arc<Self>) -> ActionResult {
        let user = self.first_user()?;
        self.post_form("/follow", &[("user", user.as_str())]).await?;
        Ok(1)
    }

    /// The followed user is back on the timeline, not necessarily at the top.
    pub async fn follower_tweet_check(self: Arc<Self>) -> ActionResult {
        let user = self.first_user()?;
        let doc = self.get_page("/").await?;
        if !has_tweet_by(&doc, &user) {
            bail!("followed user is not on the timeline");
        }
        Ok(1)
    }

    /// Post a tweet with a hashtag and remember both for the following checks.
    pub async fn hash_tag_tweet_check(self: Arc<Self>) -> ActionResult {
        let tweet = format!("{TWEET_PREFIX}{}", random_int_string());
        let hashtag = random_word().to_string();
        let text = format!("{tweet} #{hashtag}");

        {
            let mut state = self.state.lock();
            state.tweet = Some(tweet);
            state.hashtag = Some(hashtag);
        }

        self.post_form("/", &[("text", text.as_str())]).await?;
        Ok(1)
    }

    pub async fn tweet_check(self: Arc<Self>) -> ActionResult {
        let (tweet, hashtag) = self.posted_tweet()?;
        let doc = self.get_page("/").await?;
        if !has_posted_tweet(&doc, &tweet, &hashtag) {
            bail!("posted tweet is not on the timeline");
        }
        Ok(1)
    }

    pub async fn hash_tag_check(self: Arc<Self>) -> ActionResult {
        let (tweet, hashtag) = self.posted_tweet()?;
        let doc = self
            .get_page(&format!("/hashtag/{}", escape(&hashtag)))
            .await?;
        if !has_posted_tweet(&doc, &tweet, &hashtag) {
            bail!("posted tweet is not on the hashtag page");
        }
        Ok(1)
    }

    /// Every search result must contain the query.
    pub async fn tweet_search_check(self: Arc<Self>) -> ActionResult {
        let query = random_word();
        let doc = self
            .get_page(&format!("/search?q={}", escape(query)))
            .await?;
        if doc
            .select(".tweet")
            .iter()
            .any(|tweet| !tweet.text().contains(query))
        {
            bail!("search results contain unrelated tweets");
        }
        Ok(1)
    }

    pub async fn logout_check(self: Arc<Self>) -> ActionResult {
        let response = self.session.send_simple(Method::POST, "/logout", None).await?;
        check_guest_page(&Document::parse(response.text()))?;
        Ok(1)
    }

    async fn asset_check(&self, uri: &str, expected: &str, message: &str) -> ActionResult {
        let response = self.session.send_simple(Method::GET, uri, None).await?;
        if md5_hex(&response.body) != expected {
            bail!("{message}");
        }
        Ok(1)
    }

    async fn get_page(&self, uri: &str) -> anyhow::Result<Document> {
        let response = self.session.send_simple(Method::GET, uri, None).await?;
        Ok(Document::parse(response.text()))
    }

    async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> anyhow::Result<Document> {
        let response = self.session.send_form_post(uri, fields).await?;
        Ok(Document::parse(response.text()))
    }

    fn first_user(&self) -> anyhow::Result<String> {
        self.state
            .lock()
            .first_user
            .clone()
            .context("no user to follow")
    }

    fn posted_tweet(&self) -> anyhow::Result<(String, String)> {
        let state = self.state.lock();
        match (&state.tweet, &state.hashtag) {
            (Some(tweet), Some(hashtag)) => Ok((tweet.clone(), hashtag.clone())),
            _ => bail!("no posted tweet to look for"),
        }
    }
}

fn check_guest_page(doc: &Document) -> anyhow::Result<()> {
    if !doc.exists(".login") {
        bail!("login form is missing while logged out");
    }
    if doc.exists(".logout") {
        bail!("logout button is shown while logged out");
    }
    if doc.text(".name") != GUEST_GREETING {
        bail!("guest greeting is missing while logged out");
    }
    if doc.exists(".post") {
        bail!("tweet form is shown while logged out");
    }
    Ok(())
}

fn has_tweet_by(doc: &Document, user: &str) -> bool {
    doc.select(".tweet")
        .iter()
        .any(|tweet| tweet.text_of(".tweet-user-name") == user)
}

fn has_posted_tweet(doc: &Document, tweet: &str, hashtag: &str) -> bool {
    let hashtag = format!("#{hashtag}");
    doc.select(".tweet")
        .iter()
        .any(|node| node.text().contains(tweet) && node.text_of(".hashtag") == hashtag)
}

fn escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

pub(crate) fn md5_hex(body: &[u8]) -> String {
    format!("{:x}", Md5::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_is_lowercase_hex() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn escape_matches_query_encoding() {
        assert_eq!(escape("2017-10-02 10:00:00"), "2017-10-02+10%3A00%3A00");
        assert_eq!(escape("旅行"), "%E6%97%85%E8%A1%8C");
    }

    #[test]
    fn guest_page_is_recognised() {
        let doc = Document::parse(
            r#"<form class="login"></form><p class="name">こんにちは ゲストさん</p>"#,
        );
        assert!(check_guest_page(&doc).is_ok());

        let doc = Document::parse(
            r#"<form class="logout"></form><p class="name">こんにちは aliceさん</p><form class="post"></form>"#,
        );
        assert!(check_guest_page(&doc).is_err());
    }
}
