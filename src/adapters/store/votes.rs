//! Proposal store with vote casting and auto-tally.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Ballot, Proposal, ProposalStatus, TallyOutcome, VoteDecision};

use super::document::JsonDocument;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotesDoc {
    pub proposals: Vec<Proposal>,
    pub next_id: u64,
}

impl Default for VotesDoc {
    fn default() -> Self {
        Self {
            proposals: Vec::new(),
            next_id: 1,
        }
    }
}

/// Agent voting over a shared JSON document.
pub struct VoteStore {
    doc: JsonDocument<VotesDoc>,
}

impl VoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    /// Open a proposal. `voters` defaults to the four non-risk roles
    /// when empty, matching the team's standing quorum.
    pub fn propose(
        &self,
        title: &str,
        description: &str,
        proposer: &str,
        voters: Vec<String>,
    ) -> DomainResult<Proposal> {
        let voters = if voters.is_empty() {
            vec![
                "data_scientist".to_string(),
                "quant_analyst".to_string(),
                "engineer".to_string(),
                "devops".to_string(),
            ]
        } else {
            voters
        };
        let proposal = self.doc.update(|data| {
            let proposal = Proposal {
                id: data.next_id,
                title: title.to_string(),
                description: description.to_string(),
                proposer: proposer.to_string(),
                voters,
                votes: Default::default(),
                status: ProposalStatus::Open,
                created_at: Utc::now(),
                closed_at: None,
                result: None,
            };
            data.proposals.push(proposal.clone());
            data.next_id += 1;
            proposal
        })?;
        info!(proposal_id = proposal.id, title, proposer, "new proposal");
        Ok(proposal)
    }

    /// Cast a vote. Tallies automatically once every registered voter
    /// has voted. Rejections of malformed input come back as messages,
    /// not errors, so they can flow into agent transcripts.
    pub fn vote(
        &self,
        proposal_id: u64,
        agent_name: &str,
        decision: &str,
        reason: &str,
    ) -> DomainResult<String> {
        let decision_label = decision.to_lowercase();
        let Some(decision) = VoteDecision::from_str(decision) else {
            return Ok(format!(
                "Invalid decision: {decision}. Use 'approve', 'reject', or 'abstain'."
            ));
        };

        let recorded = self.doc.update(|data| {
            let Some(proposal) = data
                .proposals
                .iter_mut()
                .find(|p| p.id == proposal_id && p.status == ProposalStatus::Open)
            else {
                return Err(format!(
                    "Proposal #{proposal_id} not found or already closed"
                ));
            };
            if !proposal.voters.iter().any(|v| v == agent_name) {
                return Err(format!("{agent_name} is not a voter for this proposal"));
            }
            proposal.votes.insert(
                agent_name.to_string(),
                Ballot {
                    decision,
                    reason: reason.to_string(),
                    voted_at: Utc::now(),
                },
            );
            Ok(proposal.all_voted())
        })?;

        match recorded {
            Err(msg) => Ok(msg),
            Ok(true) => self.tally(proposal_id),
            Ok(false) => {
                info!(proposal_id, agent = agent_name, "vote recorded");
                Ok(format!("Vote recorded: {agent_name} -> {decision_label}"))
            }
        }
    }

    /// Count ballots and close the proposal if a verdict is reached.
    pub fn tally(&self, proposal_id: u64) -> DomainResult<String> {
        let message = self.doc.update(|data| {
            let Some(proposal) = data.proposals.iter_mut().find(|p| p.id == proposal_id)
            else {
                return format!("Proposal #{proposal_id} not found");
            };

            let outcome = proposal.tally();
            match outcome {
                TallyOutcome::Pending { .. } => {
                    let pending = outcome.to_string();
                    proposal.result = Some(pending.clone());
                    pending
                }
                ref verdict => {
                    let approvals = proposal
                        .votes
                        .values()
                        .filter(|b| b.decision == VoteDecision::Approve)
                        .count();
                    let total = proposal.voters.len();
                    let (status, label) = match verdict {
                        TallyOutcome::Approved { .. } => (ProposalStatus::Passed, "APPROVED".to_string()),
                        TallyOutcome::Rejected { .. } => (ProposalStatus::Rejected, "REJECTED".to_string()),
                        TallyOutcome::TieBreak { passed: true } => {
                            (ProposalStatus::Passed, "APPROVED (tie-break)".to_string())
                        }
                        TallyOutcome::TieBreak { passed: false } => {
                            (ProposalStatus::Rejected, "REJECTED (tie-break)".to_string())
                        }
                        TallyOutcome::Pending { .. } => unreachable!(),
                    };
                    proposal.status = status;
                    proposal.result = Some(label.clone());
                    proposal.closed_at = Some(Utc::now());
                    format!(
                        "Proposal #{proposal_id} '{}': {label} ({approvals}/{total} approved)",
                        proposal.title
                    )
                }
            }
        })?;
        info!(proposal_id, %message, "tally");
        Ok(message)
    }

    pub fn get_proposal(&self, proposal_id: u64) -> DomainResult<Option<Proposal>> {
        Ok(self
            .doc
            .load()?
            .proposals
            .into_iter()
            .find(|p| p.id == proposal_id))
    }

    pub fn get_open_proposals(&self) -> DomainResult<Vec<Proposal>> {
        Ok(self
            .doc
            .load()?
            .proposals
            .into_iter()
            .filter(|p| p.status == ProposalStatus::Open)
            .collect())
    }

    pub fn get_summary(&self) -> DomainResult<String> {
        let proposals = self.doc.load()?.proposals;
        let total = proposals.len();
        let passed = proposals
            .iter()
            .filter(|p| p.status == ProposalStatus::Passed)
            .count();
        let rejected = proposals
            .iter()
            .filter(|p| p.status == ProposalStatus::Rejected)
            .count();
        let open = proposals
            .iter()
            .filter(|p| p.status == ProposalStatus::Open)
            .count();
        Ok(format!(
            "Votes: {total} total | {passed} passed | {rejected} rejected | {open} open"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> VoteStore {
        VoteStore::new(dir.path().join("votes.json"))
    }

    #[test]
    fn test_majority_passes_on_auto_tally() {
        let dir = TempDir::new().unwrap();
        let votes = store(&dir);
        let p = votes
            .propose(
                "Use walk-forward validation",
                "",
                "quant_analyst",
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap();
        votes.vote(p.id, "a", "approve", "").unwrap();
        votes.vote(p.id, "b", "approve", "").unwrap();
        let msg = votes.vote(p.id, "c", "reject", "").unwrap();
        assert!(msg.contains("APPROVED (2/3 approved)"), "{msg}");
        assert_eq!(
            votes.get_proposal(p.id).unwrap().unwrap().status,
            ProposalStatus::Passed
        );
    }

    #[test]
    fn test_pending_message_with_missing_voter() {
        let dir = TempDir::new().unwrap();
        let votes = store(&dir);
        let p = votes
            .propose("Proposal", "", "engineer", vec!["a".into(), "b".into(), "c".into()])
            .unwrap();
        votes.vote(p.id, "a", "approve", "").unwrap();
        votes.vote(p.id, "b", "reject", "").unwrap();
        let msg = votes.tally(p.id).unwrap();
        assert_eq!(msg, "Pending (1 approve, 1 reject, 1 remaining)");
        assert_eq!(
            votes.get_proposal(p.id).unwrap().unwrap().status,
            ProposalStatus::Open
        );
    }

    #[test]
    fn test_non_voter_is_rejected() {
        let dir = TempDir::new().unwrap();
        let votes = store(&dir);
        let p = votes
            .propose("Proposal", "", "engineer", vec!["a".into()])
            .unwrap();
        let msg = votes.vote(p.id, "stranger", "approve", "").unwrap();
        assert_eq!(msg, "stranger is not a voter for this proposal");
    }

    #[test]
    fn test_invalid_decision_message() {
        let dir = TempDir::new().unwrap();
        let votes = store(&dir);
        let p = votes
            .propose("Proposal", "", "engineer", vec!["a".into()])
            .unwrap();
        let msg = votes.vote(p.id, "a", "maybe", "").unwrap();
        assert!(msg.starts_with("Invalid decision: maybe"));
    }

    #[test]
    fn test_vote_on_closed_proposal() {
        let dir = TempDir::new().unwrap();
        let votes = store(&dir);
        let p = votes
            .propose("Proposal", "", "engineer", vec!["a".into()])
            .unwrap();
        votes.vote(p.id, "a", "approve", "").unwrap();
        let msg = votes.vote(p.id, "a", "reject", "").unwrap();
        assert_eq!(msg, format!("Proposal #{} not found or already closed", p.id));
    }

    #[test]
    fn test_default_voter_quorum() {
        let dir = TempDir::new().unwrap();
        let votes = store(&dir);
        let p = votes.propose("Proposal", "", "risk_manager", vec![]).unwrap();
        assert_eq!(p.voters.len(), 4);
        assert!(p.voters.contains(&"engineer".to_string()));
    }
}
