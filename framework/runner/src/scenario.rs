use std::collections::VecDeque;

use crate::action::Action;

/// Number of times the fake login step is repeated, each time with its asset checks.
pub const FAKE_LOGIN_COUNT: usize = 2;
/// Number of times the paging step is repeated, without asset checks.
pub const PAGING_COUNT: usize = 5;

/// The ordered script of actions one simulated user performs.
///
/// A scenario is consumed front to back exactly once and then dropped.
#[derive(Debug, Default)]
pub struct Scenario {
    actions: VecDeque<Action>,
}

impl Scenario {
    /// The validation scenario run once before the load phase.
    pub fn initialization(initial: Action, assets: &AssetChecks) -> Self {
        Self {
            actions: VecDeque::from([
                initial,
                assets.favicon.clone(),
                assets.js.clone(),
                assets.css.clone(),
            ]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn pop_front(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    /// Names of the remaining actions, in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(Action::name).collect()
    }
}

impl FromIterator<Action> for Scenario {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

/// Static asset checks interleaved around most steps of a load scenario.
#[derive(Debug, Clone)]
pub struct AssetChecks {
    pub favicon: Action,
    pub js: Action,
    pub css: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expansion {
    /// Favicon before, JS and CSS after.
    WithAssets,
    FakeLogin,
    Paging,
}

/// Builder for a load scenario.
///
/// Steps are expanded when the scenario is built:
/// - a regular step is surrounded by the asset checks,
/// - the fake login step and its asset checks are repeated [FAKE_LOGIN_COUNT] times,
/// - the paging step is repeated [PAGING_COUNT] times on its own.
#[derive(Debug, Clone)]
pub struct ScenarioTemplate {
    assets: AssetChecks,
    steps: Vec<(Action, Expansion)>,
}

impl ScenarioTemplate {
    pub fn new(assets: AssetChecks) -> Self {
        Self {
            assets,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, action: Action) -> Self {
        self.steps.push((action, Expansion::WithAssets));
        self
    }

    pub fn fake_login(mut self, action: Action) -> Self {
        self.steps.push((action, Expansion::FakeLogin));
        self
    }

    pub fn paging(mut self, action: Action) -> Self {
        self.steps.push((action, Expansion::Paging));
        self
    }

    pub fn build(&self) -> Scenario {
        let mut actions = VecDeque::new();

        for (action, expansion) in &self.steps {
            match expansion {
                Expansion::WithAssets => self.push_with_assets(&mut actions, action),
                Expansion::FakeLogin => {
                    for _ in 0..FAKE_LOGIN_COUNT {
                        self.push_with_assets(&mut actions, action);
                    }
                }
                Expansion::Paging => {
                    actions.extend(std::iter::repeat(action.clone()).take(PAGING_COUNT));
                }
            }
        }

        Scenario { actions }
    }

    fn push_with_assets(&self, actions: &mut VecDeque<Action>, action: &Action) {
        actions.push_back(self.assets.favicon.clone());
        actions.push_back(action.clone());
        actions.push_back(self.assets.js.clone());
        actions.push_back(self.assets.css.clone());
    }
}
