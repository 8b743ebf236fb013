//! A committed version of a chain's named stores, proven in two layers: each store is a
//! simple merkle tree, and the app hash is the root of a simple merkle tree over the
//! store roots.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use ibc_eureka_merkle::{ProofSpecs, SimpleMerkleTree};
use prost::Message;
use tendermint_proto::crypto::{ProofOp, ProofOps};

/// Proof op type of a simple merkle tree layer
pub const SIMPLE_PROOF_OP: &str = "ics23:simple";

/// Immutable snapshot of every store at one height
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multistore {
    stores: BTreeMap<Vec<u8>, SimpleMerkleTree>,
    root: SimpleMerkleTree,
}

impl Multistore {
    /// Builds the snapshot of `stores`, keyed by store name
    #[must_use]
    pub fn new(stores: BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<u8>>>) -> Self {
        let stores: BTreeMap<_, _> = stores
            .into_iter()
            .map(|(name, entries)| (name, SimpleMerkleTree::new(entries)))
            .collect();
        let root = SimpleMerkleTree::new(
            stores
                .iter()
                .map(|(name, tree)| (name.clone(), tree.root()))
                .collect(),
        );
        Self { stores, root }
    }

    /// The specs a light client verifies this layout with
    #[must_use]
    pub fn proof_specs() -> ProofSpecs {
        ProofSpecs::simple(2)
    }

    /// The app hash
    #[must_use]
    pub fn app_hash(&self) -> Vec<u8> {
        self.root.root()
    }

    /// The value of `key` in `store`
    #[must_use]
    pub fn get(&self, store: &[u8], key: &[u8]) -> Option<&[u8]> {
        self.stores.get(store)?.get(key)
    }

    /// The value under `[store, key]` (empty if absent) and its proof, leaf layer first.
    ///
    /// # Errors
    /// Returns an error if the path does not have two elements, the store is unknown, or
    /// absence cannot be proven because the store is empty.
    pub fn query(&self, key_path: &[Vec<u8>]) -> Result<(Vec<u8>, ProofOps)> {
        let [store, key] = key_path else {
            bail!("expected a [store, key] path, got {} elements", key_path.len());
        };
        let tree = self
            .stores
            .get(store)
            .with_context(|| format!("unknown store {}", String::from_utf8_lossy(store)))?;

        let value = tree.get(key).map(<[u8]>::to_vec).unwrap_or_default();
        let leaf = if value.is_empty() {
            tree.prove_non_existence(key)?
        } else {
            tree.prove_existence(key)?
        };
        let store_proof = self.root.prove_existence(store)?;

        let ops = [(key, leaf), (store, store_proof)]
            .into_iter()
            .map(|(key, proof)| ProofOp {
                r#type: SIMPLE_PROOF_OP.to_string(),
                key: key.clone(),
                data: proof.encode_to_vec(),
            })
            .collect();
        Ok((value, ProofOps { ops }))
    }
}

#[cfg(test)]
mod tests {
    use ibc_eureka_commitment::{proof::convert_native_proof, MerklePath};
    use ibc_eureka_merkle::{verify_membership, verify_non_membership};

    use super::*;

    fn snapshot() -> Multistore {
        Multistore::new(BTreeMap::from([
            (
                b"ibc".to_vec(),
                BTreeMap::from([
                    (b"commitments/chanA/1".to_vec(), vec![1; 32]),
                    (b"commitments/chanA/3".to_vec(), vec![3; 32]),
                ]),
            ),
            (b"bank".to_vec(), BTreeMap::new()),
        ]))
    }

    #[test]
    fn membership_proof_verifies_against_app_hash() {
        let store = snapshot();
        let path = vec![b"ibc".to_vec(), b"commitments/chanA/1".to_vec()];
        let (value, ops) = store.query(&path).unwrap();
        assert_eq!(value, vec![1; 32]);
        assert_eq!(ops.ops.len(), 2);
        assert!(ops.ops.iter().all(|op| op.r#type == SIMPLE_PROOF_OP));

        let proof = convert_native_proof(&ops).unwrap();
        verify_membership(
            &Multistore::proof_specs(),
            &store.app_hash(),
            &proof,
            &MerklePath::from(path),
            &value,
        )
        .unwrap();
    }

    #[test]
    fn absence_proof_verifies_against_app_hash() {
        let store = snapshot();
        let path = vec![b"ibc".to_vec(), b"commitments/chanA/2".to_vec()];
        let (value, ops) = store.query(&path).unwrap();
        assert!(value.is_empty());

        verify_non_membership(
            &Multistore::proof_specs(),
            &store.app_hash(),
            &convert_native_proof(&ops).unwrap(),
            &MerklePath::from(path),
        )
        .unwrap();
    }

    #[test]
    fn bad_queries() {
        let store = snapshot();
        assert!(store.query(&[b"ibc".to_vec()]).is_err());
        assert!(store.query(&[b"gov".to_vec(), b"x".to_vec()]).is_err());
        // nothing to anchor an absence proof to
        assert!(store.query(&[b"bank".to_vec(), b"x".to_vec()]).is_err());
    }

    #[test]
    fn app_hash_tracks_store_contents() {
        let mut other = snapshot();
        assert_eq!(other.app_hash(), snapshot().app_hash());
        other = Multistore::new(BTreeMap::from([(b"ibc".to_vec(), BTreeMap::new())]));
        assert_ne!(other.app_hash(), snapshot().app_hash());
        assert_eq!(snapshot().get(b"ibc", b"commitments/chanA/3"), Some([3; 32].as_slice()));
    }
}
