//! EIP-137 name hashing.

use alloy::primitives::{keccak256, Address, B256};

/// Compute the EIP-137 namehash of a dotted name.
///
/// Labels are folded in from the rightmost label; the empty name hashes to
/// the zero node.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// Node of the `<hex-address>.addr.reverse` name used for reverse lookup.
pub fn reverse_node(address: Address) -> B256 {
    namehash(&format!("{address:x}.addr.reverse"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // EIP-137 reference vectors.
    #[test]
    fn empty_name_is_the_zero_node() {
        assert_eq!(namehash(""), B256::ZERO);
    }

    #[test]
    fn eth_tld_vector() {
        assert_eq!(
            namehash("eth").to_string(),
            "0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
    }

    #[test]
    fn foo_eth_vector() {
        assert_eq!(
            namehash("foo.eth").to_string(),
            "0xde9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn reverse_node_uses_unprefixed_lowercase_hex() {
        let addr: Address = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
            .parse()
            .unwrap();
        let expected = namehash("d8da6bf26964af9d7eed9e03e53415d37aa96045.addr.reverse");
        assert_eq!(reverse_node(addr), expected);
    }
}
