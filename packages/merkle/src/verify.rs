//! Multi-layer membership and non-membership verification

use ibc_eureka_commitment::{MerklePath, MerkleProof};
use ics23::{commitment_proof::Proof, CommitmentProof, HostFunctionsManager, NonExistenceProof};

use crate::{error::MerkleError, specs::ProofSpecs};

/// Verifies that `value` is stored at `path` under `root`.
///
/// # Errors
/// Returns [`MerkleError::VerificationFailed`] if the arguments are inconsistent or the
/// proof does not fold up to `root`.
pub fn verify_membership(
    specs: &ProofSpecs,
    root: &[u8],
    proof: &MerkleProof,
    path: &MerklePath,
    value: &[u8],
) -> Result<(), MerkleError> {
    validate_args(specs, root, proof, path)?;
    if value.is_empty() {
        return Err(MerkleError::verification("empty value"));
    }

    verify_chained_membership(specs, root, proof, path, value.to_vec(), 0)
}

/// Verifies that nothing is stored at `path` under `root`.
///
/// The leaf layer must be an absence proof; the layers above prove its sub-root.
///
/// # Errors
/// Returns [`MerkleError::VerificationFailed`] if the arguments are inconsistent or the
/// proof does not fold up to `root`.
pub fn verify_non_membership(
    specs: &ProofSpecs,
    root: &[u8],
    proof: &MerkleProof,
    path: &MerklePath,
) -> Result<(), MerkleError> {
    validate_args(specs, root, proof, path)?;

    let (leaf_proof, spec) = proof.proofs.first().zip(specs.as_slice().first()).ok_or_else(
        || MerkleError::verification("empty proof"),
    )?;
    // keys are stored root first
    let key = path
        .key_path
        .last()
        .ok_or_else(|| MerkleError::verification("empty path"))?;

    let Some(Proof::Nonexist(non_existence)) = &leaf_proof.proof else {
        return Err(MerkleError::verification(
            "leaf layer is not a non-existence proof",
        ));
    };

    let subroot = non_existence_root(non_existence)?;
    if !ics23::verify_non_membership::<HostFunctionsManager>(leaf_proof, spec, &subroot, key) {
        return Err(MerkleError::verification(
            "non-existence proof does not verify against its sub-root",
        ));
    }

    verify_chained_membership(specs, root, proof, path, subroot, 1)
}

fn validate_args(
    specs: &ProofSpecs,
    root: &[u8],
    proof: &MerkleProof,
    path: &MerklePath,
) -> Result<(), MerkleError> {
    if proof.proofs.is_empty() {
        return Err(MerkleError::verification("empty proof"));
    }
    if root.is_empty() {
        return Err(MerkleError::verification("empty root"));
    }
    if specs.len() != proof.proofs.len() {
        return Err(MerkleError::verification(format!(
            "expected {} proofs for the proof specs, got {}",
            specs.len(),
            proof.proofs.len()
        )));
    }
    if path.key_path.len() != proof.proofs.len() {
        return Err(MerkleError::verification(format!(
            "expected {} keys for the proofs, got {}",
            proof.proofs.len(),
            path.key_path.len()
        )));
    }
    Ok(())
}

/// Folds existence proofs from layer `start_index` upwards, each proving the previous
/// layer's sub-root.
fn verify_chained_membership(
    specs: &ProofSpecs,
    root: &[u8],
    proof: &MerkleProof,
    path: &MerklePath,
    mut value: Vec<u8>,
    start_index: usize,
) -> Result<(), MerkleError> {
    for (layer, ((commitment_proof, spec), key)) in proof
        .proofs
        .iter()
        .zip(specs.as_slice())
        .zip(path.key_path.iter().rev())
        .enumerate()
        .skip(start_index)
    {
        let subroot = existence_root(layer, commitment_proof)?;
        if !ics23::verify_membership::<HostFunctionsManager>(
            commitment_proof,
            spec,
            &subroot,
            key,
            &value,
        ) {
            return Err(MerkleError::verification(format!(
                "layer {layer}: existence proof does not verify"
            )));
        }
        value = subroot;
    }

    if value != root {
        return Err(MerkleError::verification(
            "proof does not resolve to the trusted root",
        ));
    }
    Ok(())
}

fn existence_root(layer: usize, proof: &CommitmentProof) -> Result<Vec<u8>, MerkleError> {
    let Some(Proof::Exist(existence)) = &proof.proof else {
        return Err(MerkleError::verification(format!(
            "layer {layer}: not an existence proof"
        )));
    };
    ics23::calculate_existence_root::<HostFunctionsManager>(existence)
        .map_err(|e| MerkleError::verification(format!("layer {layer}: {e}")))
}

fn non_existence_root(proof: &NonExistenceProof) -> Result<Vec<u8>, MerkleError> {
    let neighbour = proof
        .left
        .as_ref()
        .or(proof.right.as_ref())
        .ok_or_else(|| MerkleError::verification("non-existence proof has no neighbours"))?;
    ics23::calculate_existence_root::<HostFunctionsManager>(neighbour)
        .map_err(MerkleError::verification)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rstest::rstest;

    use super::*;
    use crate::tree::SimpleMerkleTree;

    /// A two layer store: an `ibc` sub-store committed inside a multistore
    struct TwoLayerStore {
        ibc: SimpleMerkleTree,
        multistore: SimpleMerkleTree,
    }

    impl TwoLayerStore {
        fn new(entries: &[(&str, &str)]) -> Self {
            let ibc = SimpleMerkleTree::new(
                entries
                    .iter()
                    .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
                    .collect(),
            );
            let multistore = SimpleMerkleTree::new(BTreeMap::from([
                (b"bank".to_vec(), b"bank-root".to_vec()),
                (b"ibc".to_vec(), ibc.root()),
            ]));
            Self { ibc, multistore }
        }

        fn root(&self) -> Vec<u8> {
            self.multistore.root()
        }

        fn prove(&self, key: &str) -> MerkleProof {
            let leaf = self
                .ibc
                .prove_existence(key.as_bytes())
                .or_else(|_| self.ibc.prove_non_existence(key.as_bytes()))
                .unwrap();
            MerkleProof {
                proofs: vec![leaf, self.multistore.prove_existence(b"ibc").unwrap()],
            }
        }
    }

    fn path(key: &str) -> MerklePath {
        MerklePath::new(vec![b"ibc".to_vec(), key.as_bytes().to_vec()])
    }

    fn store() -> TwoLayerStore {
        TwoLayerStore::new(&[
            ("commitments/chanA/1", "c1"),
            ("commitments/chanA/2", "c2"),
            ("nextSequenceSend/chanA", "n"),
        ])
    }

    #[test]
    fn membership() {
        let store = store();
        let specs = ProofSpecs::simple(2);
        let proof = store.prove("commitments/chanA/1");

        verify_membership(&specs, &store.root(), &proof, &path("commitments/chanA/1"), b"c1")
            .unwrap();
    }

    #[test]
    fn non_membership() {
        let store = store();
        let specs = ProofSpecs::simple(2);
        let proof = store.prove("receipts/chanA/1");

        verify_non_membership(&specs, &store.root(), &proof, &path("receipts/chanA/1")).unwrap();
    }

    #[test]
    fn membership_and_non_membership_are_exclusive() {
        let store = store();
        let specs = ProofSpecs::simple(2);
        let root = store.root();

        let present = store.prove("commitments/chanA/2");
        assert!(
            verify_non_membership(&specs, &root, &present, &path("commitments/chanA/2")).is_err()
        );

        let absent = store.prove("commitments/chanA/3");
        assert!(verify_membership(
            &specs,
            &root,
            &absent,
            &path("commitments/chanA/3"),
            b"c3"
        )
        .is_err());
    }

    #[rstest]
    #[case::wrong_value("commitments/chanA/1", b"c2".as_slice())]
    #[case::wrong_key("commitments/chanA/2", b"c1".as_slice())]
    fn membership_rejects_wrong_claims(#[case] key: &str, #[case] value: &[u8]) {
        let store = store();
        let proof = store.prove("commitments/chanA/1");
        assert!(matches!(
            verify_membership(&ProofSpecs::simple(2), &store.root(), &proof, &path(key), value),
            Err(MerkleError::VerificationFailed { .. })
        ));
    }

    #[test]
    fn membership_rejects_other_root() {
        let store = store();
        let other = TwoLayerStore::new(&[("commitments/chanA/1", "c1")]);
        let proof = store.prove("commitments/chanA/1");

        assert!(verify_membership(
            &ProofSpecs::simple(2),
            &other.root(),
            &proof,
            &path("commitments/chanA/1"),
            b"c1"
        )
        .is_err());
    }

    #[test]
    fn argument_validation() {
        let store = store();
        let root = store.root();
        let specs = ProofSpecs::simple(2);
        let proof = store.prove("commitments/chanA/1");
        let key = path("commitments/chanA/1");

        let err = |result: Result<(), MerkleError>| match result {
            Err(MerkleError::VerificationFailed { reason }) => reason,
            other => panic!("expected verification failure, got {other:?}"),
        };

        assert_eq!(
            err(verify_membership(&specs, &root, &MerkleProof::default(), &key, b"c1")),
            "empty proof"
        );
        assert_eq!(
            err(verify_membership(&specs, &[], &proof, &key, b"c1")),
            "empty root"
        );
        assert!(err(verify_membership(&ProofSpecs::simple(1), &root, &proof, &key, b"c1"))
            .contains("proof specs"));
        assert!(err(verify_membership(
            &specs,
            &root,
            &proof,
            &MerklePath::new(vec![b"commitments/chanA/1".to_vec()]),
            b"c1"
        ))
        .contains("keys"));
        assert_eq!(
            err(verify_membership(&specs, &root, &proof, &key, b"")),
            "empty value"
        );
        assert_eq!(
            err(verify_non_membership(&specs, &root, &proof, &key)),
            "leaf layer is not a non-existence proof"
        );
    }

    #[test]
    fn cosmos_specs_reject_simple_tree_leaf_layer() {
        let store = store();
        let proof = store.prove("commitments/chanA/1");
        assert!(verify_membership(
            &ProofSpecs::cosmos(),
            &store.root(),
            &proof,
            &path("commitments/chanA/1"),
            b"c1"
        )
        .is_err());
    }
}
