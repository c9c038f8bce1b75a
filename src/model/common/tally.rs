use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Aggregated vote counts for a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally<C: Eq + Hash> {
    /// Number of votes counted.
    pub total_votes: u64,
    /// Votes per candidate. Candidates with no votes are absent.
    pub per_candidate: HashMap<C, u64>,
    /// Every candidate sharing the highest count. Empty iff no votes were cast.
    pub winners: HashSet<C>,
}

impl<C> Tally<C>
where
    C: Eq + Hash + Clone,
{
    /// Count the given votes, each identified by the candidate it was cast for.
    pub fn from_votes(votes: impl IntoIterator<Item = C>) -> Self {
        let mut per_candidate = HashMap::new();
        let mut total_votes = 0;
        for candidate in votes {
            *per_candidate.entry(candidate).or_insert(0) += 1;
            total_votes += 1;
        }

        let max_count = per_candidate.values().copied().max().unwrap_or(0);
        let winners = per_candidate
            .iter()
            .filter(|(_, &count)| count == max_count)
            .map(|(candidate, _)| candidate.clone())
            .collect();

        Self {
            total_votes,
            per_candidate,
            winners,
        }
    }

    /// The highest count any candidate received, or zero.
    pub fn max_count(&self) -> u64 {
        self.per_candidate.values().copied().max().unwrap_or(0)
    }

    /// The number of votes the given candidate received.
    pub fn count(&self, candidate: &C) -> u64 {
        self.per_candidate.get(candidate).copied().unwrap_or(0)
    }

    /// Is the given candidate one of the winners?
    pub fn is_winner(&self, candidate: &C) -> bool {
        self.winners.contains(candidate)
    }
}
