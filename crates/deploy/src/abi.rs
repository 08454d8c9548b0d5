//! Minimal ABI helpers for the fixed call surface of this tool.
//!
//! The contract interface is small and frozen (CREATE2 factory, staking
//! registry, Ownable), so calldata is assembled word-by-word rather than
//! through a full ABI layer.

use alloy_core::primitives::{Address, Bytes, U256, keccak256};

/// ABI word width in bytes.
pub const WORD: usize = 32;

/// 4-byte function selector for `signature`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Left-pad an address into a 32-byte ABI word.
pub fn encode_address(addr: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(addr.as_slice());
    word
}

/// Big-endian encode a U256 into a 32-byte ABI word.
pub fn encode_uint(value: U256) -> [u8; WORD] {
    value.to_be_bytes::<WORD>()
}

/// ABI-encode a dynamic `bytes` tail: length word followed by the data,
/// right-padded to a word boundary.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = encode_uint(U256::from(data.len())).to_vec();
    out.extend_from_slice(data);
    let rem = data.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
    out
}

/// Build calldata from a signature and a sequence of static head words.
pub fn build_call(signature: &str, words: &[[u8; WORD]]) -> Bytes {
    let mut data = Vec::with_capacity(4 + words.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for word in words {
        data.extend_from_slice(word);
    }
    Bytes::from(data)
}

/// Decode the last 20 bytes of an ABI word as an address.
pub fn decode_address(word: &[u8]) -> Option<Address> {
    if word.len() < WORD {
        return None;
    }
    Some(Address::from_slice(&word[12..WORD]))
}

/// Decode an ABI word as a U256.
pub fn decode_uint(word: &[u8]) -> Option<U256> {
    if word.len() < WORD {
        return None;
    }
    Some(U256::from_be_slice(&word[..WORD]))
}

/// Decode an ABI word as a bool (any non-zero value is true).
pub fn decode_bool(word: &[u8]) -> Option<bool> {
    decode_uint(word).map(|v| !v.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn selectors_match_known_values() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("owner()"), [0x8d, 0xa5, 0xcb, 0x5b]);
        assert_eq!(
            selector("transferOwnership(address)"),
            [0xf2, 0xfd, 0xe3, 0x8b]
        );
        assert_eq!(selector("addStake(uint32)"), [0x03, 0x96, 0xcb, 0x60]);
    }

    #[test]
    fn address_words_are_left_padded() {
        let addr = Address::from_str("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap();
        let word = encode_address(addr);
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], addr.as_slice());
        assert_eq!(decode_address(&word), Some(addr));
    }

    #[test]
    fn uint_words_round_trip() {
        let value = U256::from(1_000_000_000_000_000_000u128);
        let word = encode_uint(value);
        assert_eq!(decode_uint(&word), Some(value));
        assert_eq!(
            hex::encode(word),
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000"
        );
    }

    #[test]
    fn bool_words_decode_nonzero_as_true() {
        assert_eq!(decode_bool(&encode_uint(U256::ZERO)), Some(false));
        assert_eq!(decode_bool(&encode_uint(U256::from(1u64))), Some(true));
    }

    #[test]
    fn dynamic_bytes_are_length_prefixed_and_padded() {
        let encoded = encode_bytes(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(encoded.len(), 2 * WORD);
        assert_eq!(decode_uint(&encoded[..WORD]), Some(U256::from(4u64)));
        assert_eq!(&encoded[WORD..WORD + 4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(encoded[WORD + 4..].iter().all(|b| *b == 0));

        // Exact multiples of the word size get no padding.
        let aligned = encode_bytes(&[0u8; 64]);
        assert_eq!(aligned.len(), WORD + 64);
    }

    #[test]
    fn build_call_concatenates_selector_and_words() {
        let addr = Address::from_str("0x0000000000000000000000000000000000000001").unwrap();
        let call = build_call("transferOwnership(address)", &[encode_address(addr)]);
        assert_eq!(call.len(), 4 + WORD);
        assert_eq!(&call[..4], &[0xf2, 0xfd, 0xe3, 0x8b]);
    }
}
