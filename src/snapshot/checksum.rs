//! CRC32 (IEEE) checksums for snapshot records

use crc32fast::Hasher;

pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_bit_flip_detected() {
        let mut data = br#"{"document":{"_id":1}}"#.to_vec();
        let checksum = compute_checksum(&data);
        assert!(verify_checksum(&data, checksum));
        data[5] ^= 0x01;
        assert!(!verify_checksum(&data, checksum));
    }
}
