pub fn bytes_to_i64_le(bytes: &[u8]) -> i64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(&bytes[..8]);
    i64::from_le_bytes(buffer)
}

pub fn bytes_to_f64_le(bytes: &[u8]) -> f64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(&bytes[..8]);
    f64::from_le_bytes(buffer)
}

//Compares only the enum variant, not the payload
pub fn enum_eq<T>(a: &T, b: &T) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}
