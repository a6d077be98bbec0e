mod admin;
mod question;
mod vote;

pub use question::choose_question;

use crate::config::{AppConfig, TargetPolicy};
use crate::error::GameResult;
use crate::store::Store;
use crate::types::*;
use chrono::NaiveDate;

/// Shared application state.
///
/// Holds no game data itself: every operation reads the persisted documents,
/// mutates them under the store's locks and writes them back.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub target_policy: TargetPolicy,
}

impl AppState {
    pub fn new(store: Store, target_policy: TargetPolicy) -> Self {
        Self {
            store,
            target_policy,
        }
    }

    /// File-backed state as described by the config
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Store::files(config.paths.clone()), config.target_policy)
    }

    /// Current local calendar date
    pub fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    /// Names offered in the voter selection
    pub async fn players(&self) -> GameResult<Roster> {
        Ok(self.store.roster().await?)
    }

    /// Day record for a date, if its question was already chosen
    pub async fn day(&self, date: NaiveDate) -> GameResult<Option<DayRecord>> {
        Ok(self.store.ledger().await?.get(&date).cloned())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Store::in_memory(), TargetPolicy::default())
    }
}
