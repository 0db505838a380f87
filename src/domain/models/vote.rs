//! Voting proposals and the tally rule.
//!
//! The tally denominator is the registered voter list, not the ballots
//! cast: a proposal stays pending until a strict majority of registered
//! voters approves or rejects, or every registered voter has voted (then
//! the proposer tie-break applies). A registered voter that never votes
//! keeps the proposal open indefinitely; this quorum rule is intentional.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One agent's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDecision {
    Approve,
    Reject,
    Abstain,
}

impl VoteDecision {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "abstain" => Some(Self::Abstain),
            _ => None,
        }
    }
}

/// A cast ballot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    pub decision: VoteDecision,
    pub reason: String,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Open,
    Passed,
    Rejected,
}

/// Outcome of a tally pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyOutcome {
    Approved { approvals: usize, total_voters: usize },
    Rejected { approvals: usize, total_voters: usize },
    /// All voted, no strict majority; proposer tie-break decided.
    TieBreak { passed: bool },
    /// Not enough ballots for a verdict; proposal stays open.
    Pending { approvals: usize, rejections: usize, remaining: usize },
}

impl std::fmt::Display for TallyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved { approvals, total_voters } => {
                write!(f, "APPROVED ({approvals}/{total_voters} approved)")
            }
            Self::Rejected { approvals, total_voters } => {
                write!(f, "REJECTED ({approvals}/{total_voters} approved)")
            }
            Self::TieBreak { passed } => {
                if *passed {
                    write!(f, "APPROVED (tie-break)")
                } else {
                    write!(f, "REJECTED (tie-break)")
                }
            }
            Self::Pending { approvals, rejections, remaining } => {
                write!(f, "Pending ({approvals} approve, {rejections} reject, {remaining} remaining)")
            }
        }
    }
}

/// A proposal put to the team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub proposer: String,
    /// Registered voters; the tally denominator.
    pub voters: Vec<String>,
    pub votes: HashMap<String, Ballot>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub result: Option<String>,
}

impl Proposal {
    /// Count ballots and determine the outcome. Pure; the caller applies
    /// the resulting status/result mutation.
    pub fn tally(&self) -> TallyOutcome {
        let approvals = self
            .votes
            .values()
            .filter(|b| b.decision == VoteDecision::Approve)
            .count();
        let rejections = self
            .votes
            .values()
            .filter(|b| b.decision == VoteDecision::Reject)
            .count();
        let total_voters = self.voters.len();
        // Strict majority of registered voters, not ballots cast.
        let threshold = total_voters as f64 / 2.0;

        if approvals as f64 > threshold {
            TallyOutcome::Approved { approvals, total_voters }
        } else if rejections as f64 > threshold {
            TallyOutcome::Rejected { approvals, total_voters }
        } else if self.votes.len() >= total_voters {
            TallyOutcome::TieBreak { passed: approvals >= rejections }
        } else {
            TallyOutcome::Pending {
                approvals,
                rejections,
                remaining: total_voters - self.votes.len(),
            }
        }
    }

    /// Whether every registered voter has cast a ballot.
    pub fn all_voted(&self) -> bool {
        self.votes.len() >= self.voters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(voters: &[&str]) -> Proposal {
        Proposal {
            id: 1,
            title: "Adopt walk-forward validation".into(),
            description: String::new(),
            proposer: "quant_analyst".into(),
            voters: voters.iter().map(ToString::to_string).collect(),
            votes: HashMap::new(),
            status: ProposalStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
            result: None,
        }
    }

    fn ballot(decision: VoteDecision) -> Ballot {
        Ballot { decision, reason: String::new(), voted_at: Utc::now() }
    }

    #[test]
    fn test_majority_approval() {
        let mut p = proposal(&["a", "b", "c"]);
        p.votes.insert("a".into(), ballot(VoteDecision::Approve));
        p.votes.insert("b".into(), ballot(VoteDecision::Approve));
        assert_eq!(
            p.tally(),
            TallyOutcome::Approved { approvals: 2, total_voters: 3 }
        );
    }

    #[test]
    fn test_missing_vote_stays_pending() {
        // 3 registered voters, 1 approve + 1 reject + 1 silent: no verdict.
        let mut p = proposal(&["a", "b", "c"]);
        p.votes.insert("a".into(), ballot(VoteDecision::Approve));
        p.votes.insert("b".into(), ballot(VoteDecision::Reject));
        let outcome = p.tally();
        assert_eq!(
            outcome,
            TallyOutcome::Pending { approvals: 1, rejections: 1, remaining: 1 }
        );
        assert!(outcome.to_string().contains("1 remaining"));
    }

    #[test]
    fn test_tie_break_favors_approval() {
        let mut p = proposal(&["a", "b"]);
        p.votes.insert("a".into(), ballot(VoteDecision::Approve));
        p.votes.insert("b".into(), ballot(VoteDecision::Reject));
        assert_eq!(p.tally(), TallyOutcome::TieBreak { passed: true });
    }

    #[test]
    fn test_all_abstain_tie_breaks() {
        let mut p = proposal(&["a", "b"]);
        p.votes.insert("a".into(), ballot(VoteDecision::Abstain));
        p.votes.insert("b".into(), ballot(VoteDecision::Abstain));
        assert_eq!(p.tally(), TallyOutcome::TieBreak { passed: true });
    }
}
