//! A Tendermint simple merkle tree over sorted key/value pairs
//!
//! Leaves hash as `sha256(0x00 || varint(len k) || k || varint(32) || sha256(v))`, inner
//! nodes as `sha256(0x01 || left || right)`, and a node of `n` leaves splits at the
//! largest power of two below `n`. This is the layout described by
//! [`ics23::tendermint_spec`].

use std::collections::BTreeMap;

use ics23::{
    commitment_proof::Proof, CommitmentProof, ExistenceProof, HashOp, InnerOp, LeafOp, LengthOp,
    NonExistenceProof,
};
use sha2::{Digest, Sha256};

use crate::error::MerkleError;

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

/// An immutable tree built from a snapshot of a key/value store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleMerkleTree {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    leaves: Vec<[u8; 32]>,
}

impl SimpleMerkleTree {
    /// Builds the tree. Keys are ordered bytewise.
    #[must_use]
    pub fn new(entries: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        let entries: Vec<_> = entries.into_iter().collect();
        let leaves = entries.iter().map(|(k, v)| leaf_hash(k, v)).collect();
        Self { entries, leaves }
    }

    /// The root hash; `sha256("")` for an empty tree
    #[must_use]
    pub fn root(&self) -> Vec<u8> {
        if self.leaves.is_empty() {
            return Sha256::digest(b"").to_vec();
        }
        subtree_root(&self.leaves).to_vec()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the tree holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value stored under `key`
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.position(key).ok().map(|i| self.entries[i].1.as_slice())
    }

    /// Proves that `key` is in the tree with its current value.
    ///
    /// # Errors
    /// Returns [`MerkleError::KeyNotFound`] if the key is absent.
    pub fn prove_existence(&self, key: &[u8]) -> Result<CommitmentProof, MerkleError> {
        let index = self
            .position(key)
            .map_err(|_| MerkleError::KeyNotFound(String::from_utf8_lossy(key).into_owned()))?;

        Ok(CommitmentProof {
            proof: Some(Proof::Exist(self.existence_proof(index))),
        })
    }

    /// Proves that `key` is not in the tree by exhibiting its neighbours.
    ///
    /// # Errors
    /// - [`MerkleError::EmptyTree`] if there is nothing to anchor the proof to
    /// - [`MerkleError::KeyExists`] if the key is present
    pub fn prove_non_existence(&self, key: &[u8]) -> Result<CommitmentProof, MerkleError> {
        if self.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        let Err(index) = self.position(key) else {
            return Err(MerkleError::KeyExists(
                String::from_utf8_lossy(key).into_owned(),
            ));
        };

        let left = index.checked_sub(1).map(|i| self.existence_proof(i));
        let right = (index < self.entries.len()).then(|| self.existence_proof(index));

        Ok(CommitmentProof {
            proof: Some(Proof::Nonexist(NonExistenceProof {
                key: key.to_vec(),
                left,
                right,
            })),
        })
    }

    fn position(&self, key: &[u8]) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(k, _)| k.as_slice().cmp(key))
    }

    fn existence_proof(&self, index: usize) -> ExistenceProof {
        let (key, value) = &self.entries[index];
        ExistenceProof {
            key: key.clone(),
            value: value.clone(),
            leaf: Some(leaf_op()),
            path: inner_path(&self.leaves, index),
        }
    }
}

fn leaf_op() -> LeafOp {
    LeafOp {
        hash: HashOp::Sha256.into(),
        prehash_key: HashOp::NoHash.into(),
        prehash_value: HashOp::Sha256.into(),
        length: LengthOp::VarProto.into(),
        prefix: vec![LEAF_PREFIX],
    }
}

fn leaf_hash(key: &[u8], value: &[u8]) -> [u8; 32] {
    let value_hash = Sha256::digest(value);

    let mut preimage = vec![LEAF_PREFIX];
    prost::encoding::encode_varint(key.len() as u64, &mut preimage);
    preimage.extend_from_slice(key);
    prost::encoding::encode_varint(value_hash.len() as u64, &mut preimage);
    preimage.extend_from_slice(&value_hash);

    Sha256::digest(&preimage).into()
}

fn inner_hash(left: &[u8], right: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([INNER_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Largest power of two strictly below `n`, for `n >= 2`
const fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

fn subtree_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    match leaves {
        [leaf] => *leaf,
        _ => {
            let (left, right) = leaves.split_at(split_point(leaves.len()));
            inner_hash(&subtree_root(left), &subtree_root(right))
        }
    }
}

/// Inner ops from the leaf at `index` up to the root of `leaves`
fn inner_path(leaves: &[[u8; 32]], index: usize) -> Vec<InnerOp> {
    if leaves.len() <= 1 {
        return Vec::new();
    }

    let k = split_point(leaves.len());
    let (left, right) = leaves.split_at(k);
    if index < k {
        let mut path = inner_path(left, index);
        path.push(InnerOp {
            hash: HashOp::Sha256.into(),
            prefix: vec![INNER_PREFIX],
            suffix: subtree_root(right).to_vec(),
        });
        path
    } else {
        let mut path = inner_path(right, index - k);
        let mut prefix = vec![INNER_PREFIX];
        prefix.extend_from_slice(&subtree_root(left));
        path.push(InnerOp {
            hash: HashOp::Sha256.into(),
            prefix,
            suffix: Vec::new(),
        });
        path
    }
}

#[cfg(test)]
mod tests {
    use ics23::HostFunctionsManager;
    use rstest::rstest;

    use super::*;

    fn tree_of(n: usize) -> SimpleMerkleTree {
        SimpleMerkleTree::new(
            (0..n)
                .map(|i| {
                    (
                        format!("key{i:03}").into_bytes(),
                        format!("value{i}").into_bytes(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn split_points() {
        assert_eq!(split_point(2), 1);
        assert_eq!(split_point(3), 2);
        assert_eq!(split_point(4), 2);
        assert_eq!(split_point(5), 4);
        assert_eq!(split_point(9), 8);
    }

    #[test]
    fn root_layout() {
        assert_eq!(SimpleMerkleTree::default().root(), Sha256::digest(b"").to_vec());

        let one = tree_of(1);
        assert_eq!(one.root(), leaf_hash(b"key000", b"value0").to_vec());

        let three = tree_of(3);
        let l0 = leaf_hash(b"key000", b"value0");
        let l1 = leaf_hash(b"key001", b"value1");
        let l2 = leaf_hash(b"key002", b"value2");
        assert_eq!(three.root(), inner_hash(&inner_hash(&l0, &l1), &l2).to_vec());
    }

    #[rstest]
    #[case::single(1)]
    #[case::pair(2)]
    #[case::odd(7)]
    #[case::power_of_two(8)]
    #[case::uneven(13)]
    fn existence_proofs_verify(#[case] n: usize) {
        let tree = tree_of(n);
        let root = tree.root();
        let spec = ics23::tendermint_spec();

        for i in 0..n {
            let key = format!("key{i:03}").into_bytes();
            let value = format!("value{i}").into_bytes();
            let proof = tree.prove_existence(&key).unwrap();
            assert!(ics23::verify_membership::<HostFunctionsManager>(
                &proof, &spec, &root, &key, &value
            ));
            assert!(!ics23::verify_membership::<HostFunctionsManager>(
                &proof, &spec, &root, &key, b"other"
            ));
        }
    }

    #[rstest]
    #[case::before_first(b"a".as_slice())]
    #[case::between(b"key003a".as_slice())]
    #[case::after_last(b"zzz".as_slice())]
    fn non_existence_proofs_verify(#[case] key: &[u8]) {
        let tree = tree_of(6);
        let root = tree.root();
        let spec = ics23::tendermint_spec();

        let proof = tree.prove_non_existence(key).unwrap();
        assert!(ics23::verify_non_membership::<HostFunctionsManager>(
            &proof, &spec, &root, key
        ));
    }

    #[test]
    fn proof_errors() {
        let tree = tree_of(4);
        assert_eq!(
            tree.prove_existence(b"missing"),
            Err(MerkleError::KeyNotFound("missing".to_string()))
        );
        assert_eq!(
            tree.prove_non_existence(b"key001"),
            Err(MerkleError::KeyExists("key001".to_string()))
        );
        assert_eq!(
            SimpleMerkleTree::default().prove_non_existence(b"a"),
            Err(MerkleError::EmptyTree)
        );
        assert_eq!(tree.get(b"key002"), Some(b"value2".as_slice()));
    }
}
