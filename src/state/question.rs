use super::AppState;
use crate::error::{GameError, GameResult};
use crate::store::{Document, LockKey};
use crate::types::*;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Pick a random (author, question) pair whose question is not in `used`.
///
/// Every remaining pair is equally likely. Returns `None` when the pool is
/// exhausted.
pub fn choose_question<R: Rng + ?Sized>(
    pool: &QuestionPool,
    used: &UsedSet,
    rng: &mut R,
) -> Option<(Author, Question)> {
    let remaining: Vec<(&str, &str)> = pool.pairs().filter(|(_, q)| !used.contains(q)).collect();

    remaining
        .choose(rng)
        .map(|(author, question)| (author.to_string(), question.to_string()))
}

impl AppState {
    /// Resolve the question for `today`, choosing and persisting it on the
    /// first call of the day.
    pub async fn resolve_today(&self, today: NaiveDate) -> GameResult<ResolvedQuestion> {
        let mut rng = StdRng::from_rng(&mut rand::rng());
        self.resolve_today_with_rng(today, &mut rng).await
    }

    /// [`AppState::resolve_today`] with an explicit randomness source
    pub async fn resolve_today_with_rng<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        rng: &mut R,
    ) -> GameResult<ResolvedQuestion> {
        let _selection = self.store.lock(LockKey::Selection).await;

        let ledger = self.store.ledger().await?;
        let mut used = self.store.used().await?;

        // The record is written before the used-set, so the ledger is the
        // source of truth. Anything it holds that the used-set lacks is the
        // trace of an interrupted resolve.
        let missing: Vec<&str> = ledger.questions().filter(|q| !used.contains(q)).collect();
        if !missing.is_empty() {
            tracing::warn!(
                "Used-set is missing {} recorded question(s), repairing",
                missing.len()
            );
            let missing: Vec<String> = missing.into_iter().map(str::to_string).collect();
            used = self
                .store
                .update(Document::Used, |stored: &mut UsedSet| {
                    for question in &missing {
                        stored.insert(question.as_str());
                    }
                    Ok::<_, GameError>(stored.clone())
                })
                .await?;
        }

        if let Some(record) = ledger.get(&today) {
            return Ok(ResolvedQuestion {
                date: today,
                question: record.question.clone(),
                author: record.author.clone(),
                is_new: false,
            });
        }

        let pool = self.store.questions().await?;
        let Some((author, question)) = choose_question(&pool, &used, rng) else {
            tracing::warn!("No unused questions left for {}", today);
            return Err(GameError::ExhaustedPool);
        };

        let record = self
            .store
            .update(Document::Votes, |ledger: &mut VoteLedger| {
                let record = ledger
                    .0
                    .entry(today)
                    .or_insert_with(|| DayRecord::new(question.clone(), Some(author.clone())));
                Ok::<_, GameError>(record.clone())
            })
            .await?;

        self.store
            .update(Document::Used, |used: &mut UsedSet| {
                used.insert(record.question.as_str());
                Ok::<_, GameError>(())
            })
            .await?;

        self.store.prune_day_locks(today).await;

        tracing::info!(
            "Question for {} by {}: {}",
            today,
            record.author.as_deref().unwrap_or("unknown"),
            record.question
        );

        Ok(ResolvedQuestion {
            date: today,
            question: record.question,
            author: record.author,
            is_new: true,
        })
    }
}
