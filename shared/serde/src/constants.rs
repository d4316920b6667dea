/// Upper bound on the element count of any serialized `Vec`.
/// Guards the reader against allocating for a corrupted length prefix.
pub const MAX_COLLECTION_LENGTH: u64 = 1 << 24;

/// Upper bound on the byte length of any serialized `String`.
pub const MAX_STRING_BYTES: u64 = 1 << 20;
