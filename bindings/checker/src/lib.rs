mod checker;
mod factory;
mod markup;
mod state;
mod words;

pub mod prelude {
    pub use crate::checker::{AssetDigests, IsuwitterChecker, CSS_MD5, JS_MD5};
    pub use crate::factory::IsuwitterFactory;
    pub use crate::state::ScenarioState;
}
