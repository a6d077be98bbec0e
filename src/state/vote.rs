use crate::config::TargetPolicy;
use crate::error::{GameError, GameResult};
use crate::state::AppState;
use crate::store::{Document, LockKey};
use crate::types::*;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Round to one decimal, exact halves going to the even digit (6.25 -> 6.2).
///
/// Formatting rounds on the exact binary value, so only true ties are affected.
fn round_one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

impl DayRecord {
    /// Whether `voter` already appears in the ledger (legacy entries included)
    pub fn has_voted(&self, voter: &str) -> bool {
        self.voters.iter().any(|entry| entry.voter() == voter)
    }

    /// Append a vote. Leaves the record untouched on error.
    pub fn cast_vote(&mut self, voter: &str, target: &str) -> GameResult<()> {
        let voter = voter.trim();
        let target = target.trim();

        if voter.is_empty() {
            return Err(GameError::InvalidVoter("name is empty".to_string()));
        }
        if target.is_empty() {
            return Err(GameError::InvalidTarget("name is empty".to_string()));
        }
        if self.has_voted(voter) {
            return Err(GameError::AlreadyVoted {
                voter: voter.to_string(),
            });
        }

        self.voters.push(VoteEntry::Cast {
            voter: voter.to_string(),
            target: target.to_string(),
        });
        *self.results.entry(target.to_string()).or_insert(0) += 1;
        Ok(())
    }

    pub fn total_votes(&self) -> u32 {
        self.results.values().sum()
    }

    /// Vote count and share per target, shares rounded to one decimal
    pub fn tally(&self) -> BTreeMap<PlayerName, TallyEntry> {
        let total = self.total_votes();

        self.results
            .iter()
            .map(|(target, &count)| {
                let percent = if total == 0 {
                    0.0
                } else {
                    round_one_decimal(count as f64 / total as f64 * 100.0)
                };
                (target.clone(), TallyEntry { count, percent })
            })
            .collect()
    }

    /// Voters grouped by who they voted for, in voting order
    pub fn voters_by_target(&self) -> BTreeMap<PlayerName, Vec<PlayerName>> {
        let mut grouped: BTreeMap<PlayerName, Vec<PlayerName>> = BTreeMap::new();
        for entry in &self.voters {
            if let Some(target) = entry.target() {
                grouped
                    .entry(target.to_string())
                    .or_default()
                    .push(entry.voter().to_string());
            }
        }
        grouped
    }
}

impl AppState {
    /// Check a target against the configured policy
    async fn validate_target(&self, target: &str) -> GameResult<()> {
        let target = target.trim();
        if target.is_empty() || self.target_policy == TargetPolicy::Open {
            // Emptiness is reported by the ledger itself
            return Ok(());
        }

        let roster = self.store.roster().await?;
        if roster.contains(target) {
            return Ok(());
        }
        let pool = self.store.questions().await?;
        if pool.authors().any(|author| author == target) {
            return Ok(());
        }

        Err(GameError::InvalidTarget(format!(
            "{} is not a known player",
            target
        )))
    }

    /// Record `voter`'s vote for `target` on `today` and return the updated record
    pub async fn cast_vote(
        &self,
        today: NaiveDate,
        voter: &str,
        target: &str,
    ) -> GameResult<DayRecord> {
        let _day = self.store.lock(LockKey::Day(today)).await;

        if self.day(today).await?.is_none() {
            tracing::warn!("Vote rejected for {}: no question chosen yet", today);
            return Err(GameError::NoQuestionToday(today));
        }
        self.validate_target(target).await?;

        let result: GameResult<DayRecord> = self
            .store
            .update(Document::Votes, |ledger: &mut VoteLedger| {
                let record = ledger
                    .get_mut(&today)
                    .ok_or(GameError::NoQuestionToday(today))?;
                record.cast_vote(voter, target)?;
                Ok(record.clone())
            })
            .await;

        match &result {
            Ok(record) => tracing::info!(
                "Vote recorded for {}: {} -> {} ({} total)",
                today,
                voter.trim(),
                target.trim(),
                record.total_votes()
            ),
            Err(GameError::AlreadyVoted { voter }) => {
                tracing::info!("Duplicate vote from {} on {}", voter, today)
            }
            Err(e) => tracing::warn!("Vote rejected for {}: {}", today, e),
        }

        result
    }

    /// Whether `voter` already voted on `today`
    pub async fn has_voted(&self, today: NaiveDate, voter: &str) -> GameResult<bool> {
        Ok(self
            .day(today)
            .await?
            .is_some_and(|record| record.has_voted(voter.trim())))
    }

    /// Roster names with no vote on `today`, in roster order
    pub async fn pending_voters(&self, today: NaiveDate) -> GameResult<Vec<PlayerName>> {
        let record = self
            .day(today)
            .await?
            .ok_or(GameError::NoQuestionToday(today))?;
        let roster = self.store.roster().await?;

        Ok(roster
            .iter()
            .filter(|name| !record.has_voted(name))
            .map(str::to_string)
            .collect())
    }

    /// Everything needed to display the results of a day
    pub async fn results(&self, today: NaiveDate) -> GameResult<DaySummary> {
        let record = self
            .day(today)
            .await?
            .ok_or(GameError::NoQuestionToday(today))?;
        let roster = self.store.roster().await?;

        let pending = roster
            .iter()
            .filter(|name| !record.has_voted(name))
            .map(str::to_string)
            .collect();

        Ok(DaySummary {
            date: today,
            total_votes: record.total_votes(),
            tally: record.tally(),
            voters_by_target: record.voters_by_target(),
            question: record.question,
            author: record.author,
            votes: record.voters,
            pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn record_with(votes: &[(&str, &str)]) -> DayRecord {
        let mut record = DayRecord::new("Q1", None);
        for (voter, target) in votes {
            record.cast_vote(voter, target).unwrap();
        }
        record
    }

    #[test]
    fn test_tally_example() {
        let record = record_with(&[("alice", "bob"), ("carol", "bob")]);

        let tally = record.tally();
        assert_eq!(tally.len(), 1);
        assert_eq!(
            tally["bob"],
            TallyEntry {
                count: 2,
                percent: 100.0
            }
        );

        let grouped = record.voters_by_target();
        assert_eq!(
            grouped["bob"],
            vec!["alice".to_string(), "carol".to_string()]
        );
    }

    #[test]
    fn test_tally_empty_has_no_division_by_zero() {
        let record = DayRecord::new("Q1", None);
        assert!(record.tally().is_empty());

        let mut zeroed = DayRecord::new("Q1", None);
        zeroed.results.insert("bob".to_string(), 0);
        assert_eq!(zeroed.tally()["bob"].percent, 0.0);
    }

    #[test]
    fn test_tally_percentages_sum_to_hundred() {
        let record = record_with(&[("a", "x"), ("b", "y"), ("c", "z")]);

        let tally = record.tally();
        let sum: f64 = tally.values().map(|t| t.percent).sum();
        assert!((sum - 100.0).abs() < 0.15, "sum was {}", sum);
        assert_eq!(tally["x"].percent, 33.3);

        let counted: u32 = tally.values().map(|t| t.count).sum();
        assert_eq!(counted, 3);
    }

    #[test]
    fn test_tally_rounds_to_one_decimal() {
        let record = record_with(&[("a", "x"), ("b", "x"), ("c", "y")]);

        let tally = record.tally();
        assert_eq!(tally["x"].percent, 66.7);
        assert_eq!(tally["y"].percent, 33.3);
    }

    #[test]
    fn test_tally_exact_halves_round_to_even() {
        let mut record = DayRecord::new("Q1", None);
        record.results.insert("x".to_string(), 1);
        record.results.insert("y".to_string(), 15);

        let tally = record.tally();
        assert_eq!(tally["x"].percent, 6.2);
        assert_eq!(tally["y"].percent, 93.8);

        record.results.insert("x".to_string(), 3);
        record.results.insert("y".to_string(), 13);
        assert_eq!(record.tally()["x"].percent, 18.8);

        record.results.insert("x".to_string(), 5);
        record.results.insert("y".to_string(), 11);
        assert_eq!(record.tally()["x"].percent, 31.2);
    }

    #[test]
    fn test_duplicate_vote_leaves_record_unchanged() {
        let mut record = record_with(&[("alice", "bob")]);
        let before = record.clone();

        let err = record.cast_vote("alice", "carol").unwrap_err();

        assert!(matches!(err, GameError::AlreadyVoted { ref voter } if voter == "alice"));
        assert_eq!(record, before);
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let mut record = DayRecord::new("Q1", None);

        assert!(matches!(
            record.cast_vote("  ", "bob"),
            Err(GameError::InvalidVoter(_))
        ));
        assert!(matches!(
            record.cast_vote("alice", ""),
            Err(GameError::InvalidTarget(_))
        ));
        assert!(record.voters.is_empty());
        assert!(record.results.is_empty());
    }

    #[test]
    fn test_self_vote_is_allowed() {
        let record = record_with(&[("alice", "alice")]);
        assert_eq!(record.tally()["alice"].count, 1);
    }

    #[test]
    fn test_legacy_voter_cannot_vote_again() {
        let mut record: DayRecord = serde_json::from_str(
            r#"{"question": "Q1", "results": {"bob": 1}, "jugadores": ["alice"]}"#,
        )
        .unwrap();

        assert!(record.has_voted("alice"));
        assert!(matches!(
            record.cast_vote("alice", "bob"),
            Err(GameError::AlreadyVoted { .. })
        ));
        // Legacy entries count toward totals but have no known target
        assert_eq!(record.total_votes(), 1);
        assert!(record.voters_by_target().is_empty());
    }

    #[tokio::test]
    async fn test_cast_vote_persists() {
        let (state, _) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice", "bob"]"#);
        state.resolve_today(date(1)).await.unwrap();

        let record = state.cast_vote(date(1), "alice", "bob").await.unwrap();
        assert_eq!(record.results.get("bob"), Some(&1));

        let stored = state.day(date(1)).await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert!(state.has_voted(date(1), "alice").await.unwrap());
        assert!(!state.has_voted(date(1), "bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_cast_vote_requires_question() {
        let (state, _) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice", "bob"]"#);

        let err = state.cast_vote(date(1), "alice", "bob").await.unwrap_err();
        assert!(matches!(err, GameError::NoQuestionToday(_)));

        // Missing question wins over an unknown target
        let err = state
            .cast_vote(date(1), "alice", "mallory")
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::NoQuestionToday(_)));
    }

    #[tokio::test]
    async fn test_roster_policy_rejects_unknown_target() {
        let (state, memory) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice", "bob"]"#);
        state.resolve_today(date(1)).await.unwrap();
        let before = memory.contents(Document::Votes).await;

        let err = state
            .cast_vote(date(1), "alice", "mallory")
            .await
            .unwrap_err();

        assert!(matches!(err, GameError::InvalidTarget(_)));
        assert_eq!(memory.contents(Document::Votes).await, before);
    }

    #[tokio::test]
    async fn test_roster_policy_accepts_question_authors() {
        let (state, _) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice"]"#);
        state.resolve_today(date(1)).await.unwrap();

        let record = state.cast_vote(date(1), "alice", "A").await.unwrap();
        assert_eq!(record.results.get("A"), Some(&1));
    }

    #[tokio::test]
    async fn test_open_policy_accepts_any_target() {
        let (mut state, _) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice"]"#);
        state.target_policy = TargetPolicy::Open;
        state.resolve_today(date(1)).await.unwrap();

        let record = state.cast_vote(date(1), "alice", "mallory").await.unwrap();
        assert_eq!(record.results.get("mallory"), Some(&1));
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_previous_votes() {
        let (state, memory) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice", "bob"]"#);
        state.resolve_today(date(1)).await.unwrap();
        state.cast_vote(date(1), "alice", "bob").await.unwrap();
        let before = memory.contents(Document::Votes).await;

        memory.set_read_only(true);
        let err = state.cast_vote(date(1), "bob", "alice").await.unwrap_err();

        assert!(matches!(err, GameError::Storage(_)));
        assert_eq!(memory.contents(Document::Votes).await, before);
    }

    #[tokio::test]
    async fn test_concurrent_votes_are_all_recorded() {
        let names: Vec<String> = (0..30).map(|i| format!("player{}", i)).collect();
        let roster = serde_json::to_string(&names).unwrap();
        let (state, _) = seeded_state(r#"{"A": ["Q1"]}"#, &roster);
        state.resolve_today(date(1)).await.unwrap();

        let mut handles = Vec::new();
        for (i, voter) in names.iter().enumerate() {
            let state = state.clone();
            let voter = voter.clone();
            let target = names[(i + 1) % names.len()].clone();
            handles.push(tokio::spawn(async move {
                state.cast_vote(date(1), &voter, &target).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = state.day(date(1)).await.unwrap().unwrap();
        assert_eq!(record.voters.len(), 30);
        assert_eq!(record.total_votes(), 30);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_votes_record_once() {
        let (state, _) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice", "bob"]"#);
        state.resolve_today(date(1)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                state.cast_vote(date(1), "alice", "bob").await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(GameError::AlreadyVoted { .. }) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(state.day(date(1)).await.unwrap().unwrap().total_votes(), 1);
    }

    #[tokio::test]
    async fn test_results_summary() {
        let (state, _) = seeded_state(r#"{"A": ["Q1"]}"#, r#"["alice", "bob", "carol"]"#);
        state.resolve_today(date(1)).await.unwrap();
        state.cast_vote(date(1), "alice", "bob").await.unwrap();
        state.cast_vote(date(1), "carol", "bob").await.unwrap();

        let summary = state.results(date(1)).await.unwrap();

        assert_eq!(summary.question, "Q1");
        assert_eq!(summary.author.as_deref(), Some("A"));
        assert_eq!(summary.total_votes, 2);
        assert_eq!(summary.tally["bob"].percent, 100.0);
        assert_eq!(summary.voters_by_target["bob"], vec!["alice", "carol"]);
        assert_eq!(summary.votes.len(), 2);
        assert_eq!(summary.pending, vec!["bob".to_string()]);
        assert_eq!(
            state.pending_voters(date(1)).await.unwrap(),
            vec!["bob".to_string()]
        );
    }
}
