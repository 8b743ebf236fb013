//! ICS-23 merkle proofs and paths, and conversion from Tendermint ABCI proof operations.

use ics23::CommitmentProof;
use prost::Message;
use tendermint_proto::crypto::{ProofOp, ProofOps};

use crate::error::CodecError;

/// ABCI proof op types that carry an ICS-23 commitment proof
pub const ICS23_PROOF_OP_TYPES: [&str; 3] = ["ics23:iavl", "ics23:simple", "ics23:smt"];

/// An ordered list of ICS-23 proofs, leaf layer first.
///
/// Wire compatible with `ibc.core.commitment.v1.MerkleProof`.
#[derive(Clone, PartialEq, Message)]
pub struct MerkleProof {
    /// One proof per store layer
    #[prost(message, repeated, tag = "1")]
    pub proofs: Vec<CommitmentProof>,
}

/// A key path through nested stores, root layer first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MerklePath {
    /// Keys, e.g. `["ibc", "commitments/chanA/1"]`
    pub key_path: Vec<Vec<u8>>,
}

impl MerklePath {
    /// Creates a path from its keys
    #[must_use]
    pub const fn new(key_path: Vec<Vec<u8>>) -> Self {
        Self { key_path }
    }
}

impl From<Vec<Vec<u8>>> for MerklePath {
    fn from(key_path: Vec<Vec<u8>>) -> Self {
        Self::new(key_path)
    }
}

impl MerkleProof {
    /// Protobuf encoding of the proof
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Decodes a protobuf encoded proof.
    ///
    /// # Errors
    /// Returns [`CodecError::MalformedEncoding`] if the bytes are not a `MerkleProof`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::decode(bytes).map_err(CodecError::malformed)
    }
}

impl TryFrom<&ProofOps> for MerkleProof {
    type Error = CodecError;

    fn try_from(proof_ops: &ProofOps) -> Result<Self, Self::Error> {
        convert_native_proof(proof_ops)
    }
}

/// Maps Tendermint ABCI proof operations onto an ICS-23 merkle proof, preserving order.
///
/// # Errors
/// Returns [`CodecError::ProofConversionError`] if there are no operations, or any
/// operation has an unknown type or does not hold a non-empty ICS-23 proof.
pub fn convert_native_proof(proof_ops: &ProofOps) -> Result<MerkleProof, CodecError> {
    if proof_ops.ops.is_empty() {
        return Err(CodecError::conversion("no proof operations"));
    }

    let proofs = proof_ops
        .ops
        .iter()
        .enumerate()
        .map(|(index, op)| convert_proof_op(index, op))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MerkleProof { proofs })
}

fn convert_proof_op(index: usize, op: &ProofOp) -> Result<CommitmentProof, CodecError> {
    if !ICS23_PROOF_OP_TYPES.contains(&op.r#type.as_str()) {
        return Err(CodecError::conversion(format!(
            "op {index}: unsupported proof type `{}`",
            op.r#type
        )));
    }

    let proof = CommitmentProof::decode(op.data.as_slice())
        .map_err(|e| CodecError::conversion(format!("op {index}: {e}")))?;
    if proof.proof.is_none() {
        return Err(CodecError::conversion(format!("op {index}: empty proof")));
    }

    Ok(proof)
}

#[cfg(test)]
mod tests {
    use ics23::{commitment_proof::Proof, ExistenceProof};
    use rstest::rstest;

    use super::*;

    fn existence_proof(key: &[u8]) -> CommitmentProof {
        CommitmentProof {
            proof: Some(Proof::Exist(ExistenceProof {
                key: key.to_vec(),
                value: b"value".to_vec(),
                leaf: None,
                path: vec![],
            })),
        }
    }

    fn op(r#type: &str, data: Vec<u8>) -> ProofOp {
        ProofOp {
            r#type: r#type.to_string(),
            key: b"key".to_vec(),
            data,
        }
    }

    #[test]
    fn converts_ops_in_order() {
        let leaf = existence_proof(b"commitments/chanA/1");
        let store = existence_proof(b"ibc");
        let proof_ops = ProofOps {
            ops: vec![
                op("ics23:iavl", leaf.encode_to_vec()),
                op("ics23:simple", store.encode_to_vec()),
            ],
        };

        let merkle_proof = convert_native_proof(&proof_ops).unwrap();
        assert_eq!(merkle_proof.proofs, vec![leaf, store]);
        assert_eq!(MerkleProof::try_from(&proof_ops).unwrap(), merkle_proof);
    }

    #[rstest]
    #[case::no_ops(vec![])]
    #[case::unknown_type(vec![op("iavl:v", existence_proof(b"k").encode_to_vec())])]
    #[case::garbage_data(vec![op("ics23:iavl", vec![0xff, 0xff, 0xff])])]
    #[case::empty_proof(vec![op("ics23:smt", CommitmentProof { proof: None }.encode_to_vec())])]
    #[case::second_op_bad(vec![
        op("ics23:iavl", existence_proof(b"k").encode_to_vec()),
        op("ics23:simple", vec![0x0a, 0x05, 0x01]),
    ])]
    fn rejects_unconvertible_ops(#[case] ops: Vec<ProofOp>) {
        assert!(matches!(
            convert_native_proof(&ProofOps { ops }),
            Err(CodecError::ProofConversionError { .. })
        ));
    }

    #[test]
    fn proof_bytes_round_trip() {
        let proof = MerkleProof {
            proofs: vec![existence_proof(b"a"), existence_proof(b"b")],
        };
        let bytes = proof.to_bytes();
        assert_eq!(MerkleProof::from_bytes(&bytes).unwrap(), proof);

        assert!(matches!(
            MerkleProof::from_bytes(&[0x0a, 0xff]),
            Err(CodecError::MalformedEncoding { .. })
        ));
    }
}
