/// Values threaded between the actions of one scenario run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioState {
    /// `data-time` of the oldest tweet seen on the timeline, unescaped.
    pub until: Option<String>,
    /// First user other than ourselves found on the timeline after logging in.
    pub first_user: Option<String>,
    /// Body of the last posted tweet, without its hashtag.
    pub tweet: Option<String>,
    /// Hashtag of the last posted tweet, without the `#`.
    pub hashtag: Option<String>,
}
