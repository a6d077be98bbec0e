use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plain string aliases for readability
pub type Question = String;
pub type Author = String;
pub type PlayerName = String;

/// All available questions grouped by author (`questions.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct QuestionPool(pub BTreeMap<Author, Vec<Question>>);

impl QuestionPool {
    /// Every (author, question) pair in pool order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(author, questions)| {
            questions
                .iter()
                .map(move |question| (author.as_str(), question.as_str()))
        })
    }

    pub fn authors(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Questions already shown on some day (`used.json`).
///
/// Persisted as an array in the order questions were used. Insertion is
/// idempotent so the array never holds duplicates written by us.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct UsedSet(Vec<Question>);

impl UsedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, question: &str) -> bool {
        self.0.iter().any(|q| q == question)
    }

    /// Mark a question as used. Returns false if it was already present.
    pub fn insert(&mut self, question: impl Into<Question>) -> bool {
        let question = question.into();
        if self.contains(&question) {
            return false;
        }
        self.0.push(question);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<Question>> FromIterator<S> for UsedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut used = UsedSet::new();
        for question in iter {
            used.insert(question);
        }
        used
    }
}

/// Player names maintained by hand in `players.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Roster(pub Vec<PlayerName>);

impl Roster {
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|p| p == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// One line of a day's ledger.
///
/// Older documents stored only the voter's name; those load as `Legacy` and
/// keep their original shape when written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVoteEntry", into = "RawVoteEntry")]
pub enum VoteEntry {
    Cast { voter: PlayerName, target: PlayerName },
    Legacy { voter: PlayerName },
}

impl VoteEntry {
    pub fn voter(&self) -> &str {
        match self {
            VoteEntry::Cast { voter, .. } | VoteEntry::Legacy { voter } => voter,
        }
    }

    /// Target of the vote, unknown for legacy entries
    pub fn target(&self) -> Option<&str> {
        match self {
            VoteEntry::Cast { target, .. } => Some(target),
            VoteEntry::Legacy { .. } => None,
        }
    }
}

/// On-disk shape of a ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawVoteEntry {
    Structured {
        nombre: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voto: Option<String>,
    },
    Plain(String),
}

impl From<RawVoteEntry> for VoteEntry {
    fn from(raw: RawVoteEntry) -> Self {
        match raw {
            RawVoteEntry::Structured {
                nombre,
                voto: Some(voto),
            } => VoteEntry::Cast {
                voter: nombre,
                target: voto,
            },
            RawVoteEntry::Structured { nombre, voto: None } => VoteEntry::Legacy { voter: nombre },
            RawVoteEntry::Plain(nombre) => VoteEntry::Legacy { voter: nombre },
        }
    }
}

impl From<VoteEntry> for RawVoteEntry {
    fn from(entry: VoteEntry) -> Self {
        match entry {
            VoteEntry::Cast { voter, target } => RawVoteEntry::Structured {
                nombre: voter,
                voto: Some(target),
            },
            VoteEntry::Legacy { voter } => RawVoteEntry::Plain(voter),
        }
    }
}

/// A single day's question and its votes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayRecord {
    #[serde(alias = "pregunta")]
    pub question: Question,
    /// Who contributed the question (absent in older documents)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, alias = "resultados")]
    pub results: BTreeMap<PlayerName, u32>,
    #[serde(default, rename = "jugadores")]
    pub voters: Vec<VoteEntry>,
}

impl DayRecord {
    pub fn new(question: impl Into<Question>, author: Option<Author>) -> Self {
        Self {
            question: question.into(),
            author,
            results: BTreeMap::new(),
            voters: Vec::new(),
        }
    }
}

/// Every day's record keyed by date (`votes.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct VoteLedger(pub BTreeMap<NaiveDate, DayRecord>);

impl VoteLedger {
    pub fn get(&self, date: &NaiveDate) -> Option<&DayRecord> {
        self.0.get(date)
    }

    pub fn get_mut(&mut self, date: &NaiveDate) -> Option<&mut DayRecord> {
        self.0.get_mut(date)
    }

    /// Questions that already have a day of their own
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(|record| record.question.as_str())
    }
}

/// Vote count and share for one target
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TallyEntry {
    pub count: u32,
    pub percent: f64,
}

/// Outcome of resolving a day's question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedQuestion {
    pub date: NaiveDate,
    pub question: Question,
    pub author: Option<Author>,
    /// True when this call created the day's record
    pub is_new: bool,
}

/// Read-only view of a day for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub question: Question,
    pub author: Option<Author>,
    pub total_votes: u32,
    pub tally: BTreeMap<PlayerName, TallyEntry>,
    pub voters_by_target: BTreeMap<PlayerName, Vec<PlayerName>>,
    pub votes: Vec<VoteEntry>,
    /// Roster names that have not voted yet
    pub pending: Vec<PlayerName>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub question: Question,
    pub author: Option<Author>,
    pub total_votes: u32,
}
