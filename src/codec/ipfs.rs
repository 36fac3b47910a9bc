//! Conversion of on-ledger 32-byte sha2-256 digests to CIDv0 strings.

/// Multihash header for sha2-256 with a 32-byte digest.
const MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

/// CID of the all-zero digest. The ledger stores it for "not yet set".
pub const EMPTY_HASH: &str = "QmNLei78zWmzUdbeRB3CiUfAizWUrbeeZh5K1rhAQKCh51";

pub fn hash_to_cid(hash: &[u8; 32]) -> String {
    let mut multihash = Vec::with_capacity(MULTIHASH_PREFIX.len() + hash.len());
    multihash.extend_from_slice(&MULTIHASH_PREFIX);
    multihash.extend_from_slice(hash);
    bs58::encode(multihash).into_string()
}

/// Like [`hash_to_cid`], but the empty-hash sentinel becomes `None`.
pub fn cid_or_none(hash: &[u8; 32]) -> Option<String> {
    let cid = hash_to_cid(hash);
    if cid == EMPTY_HASH { None } else { Some(cid) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_digest_is_the_sentinel() {
        assert_eq!(hash_to_cid(&[0u8; 32]), EMPTY_HASH);
        assert_eq!(cid_or_none(&[0u8; 32]), None);
    }

    #[test]
    fn non_empty_digest_becomes_cid_v0() {
        let mut digest = [0u8; 32];
        for (i, b) in digest.iter_mut().enumerate() {
            *b = i as u8;
        }
        let cid = cid_or_none(&digest).expect("non-empty digest");
        assert_eq!(cid, "QmNLfbof5rLekrACjeuLk9JmGZD2HDBHCU4z16iYKmx5SE");
        assert!(cid.starts_with("Qm"));
    }
}
