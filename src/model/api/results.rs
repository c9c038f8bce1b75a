use std::cmp::Reverse;

use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, id::ApiId},
    common::Tally,
    db::{candidate::Candidate, poll::Poll, vote::Vote},
    mongodb::Id,
};

/// One candidate's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub id: ApiId,
    pub name: String,
    pub image: Option<String>,
    pub votes: u64,
    pub winner: bool,
}

/// The results of a poll, most-voted candidate first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResults {
    pub poll_id: ApiId,
    pub name: String,
    pub total_votes: u64,
    pub candidates: Vec<CandidateResult>,
    /// Every candidate sharing the highest count. Empty if nobody has voted.
    pub winners: Vec<ApiId>,
}

impl PollResults {
    /// Join the tally with the poll's candidates, so that candidates without
    /// votes still appear.
    pub fn new(poll: &Poll, candidates: Vec<Candidate>, tally: &Tally<Id>) -> Self {
        let mut candidates: Vec<CandidateResult> = candidates
            .into_iter()
            .map(|candidate| CandidateResult {
                id: candidate.id.into(),
                votes: tally.count(&candidate.id),
                winner: tally.is_winner(&candidate.id),
                name: candidate.candidate.name,
                image: candidate.candidate.image,
            })
            .collect();
        candidates.sort_by(|a, b| {
            Reverse(a.votes)
                .cmp(&Reverse(b.votes))
                .then_with(|| a.name.cmp(&b.name))
        });
        let winners = candidates
            .iter()
            .filter(|c| c.winner)
            .map(|c| c.id)
            .collect();
        Self {
            poll_id: poll.id.into(),
            name: poll.name.clone(),
            total_votes: tally.total_votes,
            candidates,
            winners,
        }
    }
}

/// A vote as exported for recounting. The voter is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpedVote {
    pub candidate: ApiId,
    #[serde(with = "ts_seconds")]
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for DumpedVote {
    fn from(vote: Vote) -> Self {
        Self {
            candidate: vote.candidate_id.into(),
            cast_at: vote.cast_at,
        }
    }
}

/// Everything needed to recount a poll offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDump {
    pub poll_id: ApiId,
    pub name: String,
    pub candidates: Vec<CandidateDescription>,
    pub votes: Vec<DumpedVote>,
}

impl PollDump {
    /// Recount the dumped votes.
    pub fn tally(&self) -> Tally<ApiId> {
        Tally::from_votes(self.votes.iter().map(|v| v.candidate))
    }

    /// Votes for IDs that are not among the dumped candidates.
    pub fn stray_votes(&self) -> usize {
        self.votes
            .iter()
            .filter(|v| !self.candidates.iter().any(|c| c.id == v.candidate))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::db::{candidate::NewCandidate, poll::NewPoll};

    use super::*;

    fn candidate(poll_id: Id, core: fn(Id) -> NewCandidate) -> Candidate {
        Candidate {
            id: Id::new(),
            candidate: core(poll_id),
        }
    }

    #[test]
    fn results_include_unvoted_and_tied() {
        let poll = Poll {
            id: Id::new(),
            poll: NewPoll::example(),
        };
        let a = candidate(poll.id, NewCandidate::example1);
        let b = candidate(poll.id, NewCandidate::example2);
        let c = candidate(poll.id, NewCandidate::example3);
        let votes = [a.id, b.id, a.id, b.id];
        let tally = Tally::from_votes(votes);

        let results = PollResults::new(&poll, vec![c.clone(), b.clone(), a.clone()], &tally);
        assert_eq!(results.total_votes, 4);
        let names: Vec<_> = results.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Ada Lovelace", "Alan Turing", "Grace Hopper"]);
        assert_eq!(results.candidates[2].votes, 0);
        assert!(!results.candidates[2].winner);
        assert_eq!(results.winners, vec![ApiId::from(a.id), ApiId::from(b.id)]);
    }

    #[test]
    fn no_votes_no_winners() {
        let poll = Poll {
            id: Id::new(),
            poll: NewPoll::example(),
        };
        let a = candidate(poll.id, NewCandidate::example1);
        let results = PollResults::new(&poll, vec![a], &Tally::from_votes(Vec::<Id>::new()));
        assert_eq!(results.total_votes, 0);
        assert!(results.winners.is_empty());
    }

    #[test]
    fn dump_recounts() {
        let a = ApiId::from(Id::new());
        let b = ApiId::from(Id::new());
        let vote = |candidate| DumpedVote {
            candidate,
            cast_at: Utc::now(),
        };
        let dump = PollDump {
            poll_id: Id::new().into(),
            name: "Board".to_string(),
            candidates: vec![CandidateDescription {
                id: a,
                name: "A".to_string(),
                image: None,
            }],
            votes: vec![vote(a), vote(b), vote(a)],
        };
        let tally = dump.tally();
        assert_eq!(tally.total_votes, 3);
        assert_eq!(tally.count(&a), 2);
        assert!(tally.is_winner(&a));
        assert_eq!(dump.stray_votes(), 1);
    }
}
