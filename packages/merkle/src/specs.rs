//! Proof specs describing the tree layout of each store layer

use ics23::ProofSpec;
use prost::Message;
use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};

/// The ordered proof specs of a multi-layer store, leaf layer first
#[derive(Debug, Clone, PartialEq)]
pub struct ProofSpecs(Vec<ProofSpec>);

impl ProofSpecs {
    /// The Cosmos SDK layout: an IAVL store inside a Tendermint simple tree multistore
    #[must_use]
    pub fn cosmos() -> Self {
        Self(vec![ics23::iavl_spec(), ics23::tendermint_spec()])
    }

    /// `layers` nested Tendermint simple trees
    #[must_use]
    pub fn simple(layers: usize) -> Self {
        Self(vec![ics23::tendermint_spec(); layers])
    }

    /// Number of layers
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no layers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The specs, leaf layer first
    #[must_use]
    pub fn as_slice(&self) -> &[ProofSpec] {
        &self.0
    }
}

impl Default for ProofSpecs {
    fn default() -> Self {
        Self::cosmos()
    }
}

impl From<Vec<ProofSpec>> for ProofSpecs {
    fn from(specs: Vec<ProofSpec>) -> Self {
        Self(specs)
    }
}

// Each spec travels as its hex encoded protobuf bytes.
impl Serialize for ProofSpecs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for spec in &self.0 {
            seq.serialize_element(&hex::encode(spec.encode_to_vec()))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ProofSpecs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| {
                let bytes = hex::decode(s).map_err(de::Error::custom)?;
                ProofSpec::decode(bytes.as_slice()).map_err(de::Error::custom)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}
