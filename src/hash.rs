/// djb2 hash of a symbol's UTF-8 bytes. Variable nodes store this hash
/// instead of the symbol itself.
pub fn hash_symbol(symbol: char) -> u64 {
    let mut buf = [0u8; 4];
    hash_bytes(symbol.encode_utf8(&mut buf).as_bytes())
}

pub fn hash_bytes(bytes: &[u8]) -> u64 {
    bytes.iter().fold(5381u64, |hash, &byte| {
        // hash * 33 + byte
        (hash << 5).wrapping_add(hash).wrapping_add(byte as u64)
    })
}
