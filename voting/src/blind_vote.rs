//! Blind votes and the consensus-critical encodings around them.
//!
//! Every node must derive the same bytes here: the plaintext of an encrypted
//! ballot list, the commitment digest and the digest of a cycle's blind-vote
//! list all feed into the tally.

use crate::error::VoteCodecError;
use dao_crypto::{digest, sign_message, verify_signature, SecretKey};
use dao_governance::{BallotList, ContentHash, Vote};
use dao_types::{Digest, PrivateKey, PublicKey, Signature, Timestamp, TxId};
use serde::{Deserialize, Serialize};

/// One entry of an encrypted ballot list. `None` abstains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteWithProposalTxId {
    pub proposal_tx_id: TxId,
    pub vote: Option<Vote>,
}

/// Reduce a sorted ballot list to what gets encrypted.
pub fn votes_from_ballots(ballots: &BallotList) -> Vec<VoteWithProposalTxId> {
    ballots
        .iter()
        .filter_map(|b| {
            b.tx_id().map(|proposal_tx_id| VoteWithProposalTxId {
                proposal_tx_id,
                vote: b.vote,
            })
        })
        .collect()
}

pub fn encrypt_votes(votes: &[VoteWithProposalTxId], key: &SecretKey) -> Result<Vec<u8>, VoteCodecError> {
    Ok(key.encrypt(&bincode::serialize(votes)?)?)
}

pub fn decrypt_votes(encrypted: &[u8], key: &SecretKey) -> Result<Vec<VoteWithProposalTxId>, VoteCodecError> {
    Ok(bincode::deserialize(&key.decrypt(encrypted)?)?)
}

/// Digest committed on chain for a set of encrypted votes.
pub fn commitment_digest(encrypted_votes: &[u8]) -> Digest {
    digest(encrypted_votes)
}

/// A committed, still-secret vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindVote {
    /// The blind-vote tx locking `stake` in output 0.
    pub tx_id: TxId,
    pub encrypted_votes: Vec<u8>,
    pub stake: u64,
    pub owner: PublicKey,
    pub created_at: Timestamp,
}

impl BlindVote {
    /// The fields the blind-vote tx binds on chain.
    pub fn key(&self) -> BlindVoteKey {
        BlindVoteKey {
            tx_id: self.tx_id,
            commitment: commitment_digest(&self.encrypted_votes),
            stake: self.stake,
        }
    }
}

/// What every copy of a confirmed blind vote agrees on. `owner` and
/// `created_at` are only covered by the payload signature, so they stay out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlindVoteKey {
    pub tx_id: TxId,
    pub commitment: Digest,
    pub stake: u64,
}

/// Digest over a cycle's blind-vote view, sorted by tx id. Voters attest to
/// it at reveal time; the stake-weighted majority of attestations decides
/// which list the tally uses.
pub fn blind_vote_list_digest(blind_votes: &[&BlindVote]) -> Result<Digest, bincode::Error> {
    let mut keys: Vec<BlindVoteKey> = blind_votes.iter().map(|b| b.key()).collect();
    keys.sort_by_key(|k| k.tx_id);
    keys.dedup_by_key(|k| k.tx_id);
    key_list_digest(&keys)
}

/// Digest over keys already sorted and deduplicated by tx id.
pub(crate) fn key_list_digest(keys: &[BlindVoteKey]) -> Result<Digest, bincode::Error> {
    Ok(digest(&bincode::serialize(keys)?))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindVotePayload {
    pub blind_vote: BlindVote,
    pub signature: Signature,
}

impl BlindVotePayload {
    pub fn sign(blind_vote: BlindVote, private_key: &PrivateKey) -> Result<Self, bincode::Error> {
        let signature = sign_message(&bincode::serialize(&blind_vote)?, private_key);
        Ok(Self {
            blind_vote,
            signature,
        })
    }

    pub fn verify(&self) -> Result<bool, bincode::Error> {
        let bytes = bincode::serialize(&self.blind_vote)?;
        Ok(verify_signature(&bytes, &self.signature, &self.blind_vote.owner))
    }
}

impl ContentHash for BlindVotePayload {
    fn content_hash(&self) -> Result<Digest, bincode::Error> {
        Ok(digest(&bincode::serialize(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_crypto::keypair_from_seed;

    fn vote(n: u8, accepted: Option<bool>) -> VoteWithProposalTxId {
        VoteWithProposalTxId {
            proposal_tx_id: TxId::new([n; 32]),
            vote: accepted.map(|accepted| Vote { accepted }),
        }
    }

    fn blind_vote(n: u8) -> BlindVote {
        BlindVote {
            tx_id: TxId::new([n; 32]),
            encrypted_votes: vec![n; 40],
            stake: 1_000 * u64::from(n),
            owner: keypair_from_seed(&[n; 32]).public,
            created_at: Timestamp::new(1_600_000_000),
        }
    }

    #[test]
    fn encrypted_votes_open_only_with_their_key() {
        let votes = vec![vote(1, Some(true)), vote(2, None), vote(3, Some(false))];
        let key = SecretKey::from_bytes([4; 32]);
        let encrypted = encrypt_votes(&votes, &key).unwrap();
        assert_eq!(decrypt_votes(&encrypted, &key).unwrap(), votes);

        let wrong = SecretKey::from_bytes([5; 32]);
        assert!(decrypt_votes(&encrypted, &wrong).is_err());

        let mut tampered = encrypted.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 1;
        assert!(decrypt_votes(&tampered, &key).is_err());
        assert_ne!(commitment_digest(&tampered), commitment_digest(&encrypted));
    }

    #[test]
    fn list_digest_ignores_order_and_duplicates() {
        let (a, b, c) = (blind_vote(1), blind_vote(2), blind_vote(3));
        let forward = blind_vote_list_digest(&[&a, &b, &c]).unwrap();
        assert_eq!(blind_vote_list_digest(&[&c, &a, &b, &a]).unwrap(), forward);
        assert_ne!(blind_vote_list_digest(&[&a, &b]).unwrap(), forward);
    }

    #[test]
    fn list_digest_covers_only_chain_bound_fields() {
        let (a, b) = (blind_vote(1), blind_vote(2));
        let honest = blind_vote_list_digest(&[&a, &b]).unwrap();

        let mut copy = b.clone();
        copy.owner = keypair_from_seed(&[9; 32]).public;
        copy.created_at = Timestamp::new(1);
        assert_eq!(blind_vote_list_digest(&[&a, &copy]).unwrap(), honest);

        let mut restaked = b.clone();
        restaked.stake += 1;
        assert_ne!(blind_vote_list_digest(&[&a, &restaked]).unwrap(), honest);

        let mut reencrypted = b;
        reencrypted.encrypted_votes.push(0);
        assert_ne!(blind_vote_list_digest(&[&a, &reencrypted]).unwrap(), honest);
    }

    #[test]
    fn payload_signature() {
        let keys = keypair_from_seed(&[1; 32]);
        let mut payload = BlindVotePayload::sign(blind_vote(1), &keys.private).unwrap();
        assert!(payload.verify().unwrap());
        payload.blind_vote.stake += 1;
        assert!(!payload.verify().unwrap());
    }
}
