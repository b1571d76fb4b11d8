use std::future::Future;
use std::sync::Arc;

use yisubench_core::prelude::BenchConfig;
use yisubench_http::prelude::Session;
use yisubench_runner::prelude::{
    Account, Action, ActionResult, AssetChecks, CheckerFactory, Scenario, ScenarioTemplate,
};

use crate::checker::{AssetDigests, IsuwitterChecker};

/// Builds Isuwitter scenarios, each backed by a fresh [IsuwitterChecker].
#[derive(Debug, Clone)]
pub struct IsuwitterFactory {
    config: BenchConfig,
    assets: AssetDigests,
}

impl IsuwitterFactory {
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            assets: AssetDigests::default(),
        }
    }

    /// Expect different static assets than the published ones.
    pub fn with_assets(mut self, assets: AssetDigests) -> Self {
        self.assets = assets;
        self
    }

    pub fn checker(&self, host: &str, account: &Account) -> anyhow::Result<Arc<IsuwitterChecker>> {
        let session = Session::new(host, &self.config)?;
        Ok(Arc::new(IsuwitterChecker::new(
            session,
            account.clone(),
            self.assets.clone(),
            self.config.initialize_timeout,
        )))
    }
}

impl CheckerFactory for IsuwitterFactory {
    fn new_init_scenario(&self, host: &str, account: &Account) -> anyhow::Result<Scenario> {
        let checker = self.checker(host, account)?;
        Ok(Scenario::initialization(
            Action::get("InitialCheck", bind(&checker, IsuwitterChecker::initial_check)),
            &asset_checks(&checker),
        ))
    }

    fn new_default_scenario(&self, host: &str, account: &Account) -> anyhow::Result<Scenario> {
        let checker = self.checker(host, account)?;
        let c = &checker;

        Ok(ScenarioTemplate::new(asset_checks(c))
            .step(Action::get("PageLoadCheck", bind(c, IsuwitterChecker::page_load_check)))
            .step(Action::get("MyPageCheck", bind(c, IsuwitterChecker::my_page_check)))
            .step(Action::get("LoginPageCheck", bind(c, IsuwitterChecker::login_page_check)))
            .fake_login(Action::post("FakeLoginCheck", bind(c, IsuwitterChecker::fake_login_check)))
            .step(Action::post("LoginCheck", bind(c, IsuwitterChecker::login_check)))
            .paging(Action::get("PagingCheck", bind(c, IsuwitterChecker::paging_check)))
            .step(Action::get("SelfPageCheck", bind(c, IsuwitterChecker::self_page_check)))
            .step(Action::get(
                "UnfollowButtonCheck",
                bind(c, IsuwitterChecker::unfollow_button_check),
            ))
            .step(Action::post("UnfollowCheck", bind(c, IsuwitterChecker::unfollow_check)))
            .step(Action::get(
                "RemoveFromTopCheck",
                bind(c, IsuwitterChecker::remove_from_top_check),
            ))
            .step(Action::get(
                "FollowButtonCheck",
                bind(c, IsuwitterChecker::follow_button_check),
            ))
            .step(Action::post("FollowCheck", bind(c, IsuwitterChecker::follow_check)))
            .step(Action::get(
                "FollowerTweetCheck",
                bind(c, IsuwitterChecker::follower_tweet_check),
            ))
            .step(Action::get(
                "UnfollowButtonCheck",
                bind(c, IsuwitterChecker::unfollow_button_check),
            ))
            .step(Action::post(
                "HashTagTweetCheck",
                bind(c, IsuwitterChecker::hash_tag_tweet_check),
            ))
            .step(Action::get("TweetCheck", bind(c, IsuwitterChecker::tweet_check)))
            .step(Action::get("HashTagCheck", bind(c, IsuwitterChecker::hash_tag_check)))
            .step(Action::get(
                "TweetSearchCheck",
                bind(c, IsuwitterChecker::tweet_search_check),
            ))
            .step(Action::post("LogoutCheck", bind(c, IsuwitterChecker::logout_check)))
            .build())
    }
}

fn asset_checks(checker: &Arc<IsuwitterChecker>) -> AssetChecks {
    AssetChecks {
        favicon: Action::get("FaviconCheck", bind(checker, IsuwitterChecker::favicon_check)),
        js: Action::get("JSCheck", bind(checker, IsuwitterChecker::js_check)),
        css: Action::get("CSSCheck", bind(checker, IsuwitterChecker::css_check)),
    }
}

/// Turn a check into an action operation holding its own handle to the checker.
fn bind<F, Fut>(
    checker: &Arc<IsuwitterChecker>,
    check: F,
) -> impl Fn() -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<IsuwitterChecker>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    let checker = checker.clone();
    move || check(checker.clone())
}
