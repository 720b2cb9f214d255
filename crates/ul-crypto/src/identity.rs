use rand::RngCore;
use ul_types::{HashKind, HexKey};

/// Generate a random node identifier of the width `kind` requires.
///
/// Node ids only need to be unique among cooperating stores; they carry no
/// secret and are not used for authentication.
pub fn random_node_id(kind: HashKind) -> HexKey {
    let mut bytes = vec![0u8; kind.byte_len()];
    rand::thread_rng().fill_bytes(&mut bytes);
    HexKey::from_digest(&bytes).expect("node id width is 20 or 32 bytes")
}
