use super::AppState;
use crate::error::GameResult;
use crate::store::{Document, LockKey};
use crate::types::*;

impl AppState {
    /// Wipe the vote ledger and the used-set.
    ///
    /// The question pool and the roster are left alone. Irreversible.
    pub async fn reset_game(&self) -> GameResult<()> {
        let _selection = self.store.lock(LockKey::Selection).await;

        {
            let _votes = self.store.lock(LockKey::Document(Document::Votes)).await;
            self.store.save(Document::Votes, &VoteLedger::default()).await?;
        }
        {
            let _used = self.store.lock(LockKey::Document(Document::Used)).await;
            self.store.save(Document::Used, &UsedSet::new()).await?;
        }

        tracing::warn!("Game reset: vote ledger and used questions cleared");
        Ok(())
    }

    /// Past and present days, newest first
    pub async fn history(&self) -> GameResult<Vec<HistoryEntry>> {
        let ledger = self.store.ledger().await?;

        Ok(ledger
            .0
            .into_iter()
            .rev()
            .map(|(date, record)| HistoryEntry {
                date,
                total_votes: record.total_votes(),
                question: record.question,
                author: record.author,
            })
            .collect())
    }
}
