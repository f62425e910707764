use crc::{Crc, CRC_32_ISO_HDLC};

/// CRC-32 over the IEEE polynomial 0xEDB88320 (reflected, init 0xFFFFFFFF,
/// xor-out 0xFFFFFFFF). Used for packet payloads, the metadata header and
/// debug chunk checksums.
const CRC_IEEE: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc32(data: &[u8]) -> u32 {
    CRC_IEEE.checksum(data)
}
