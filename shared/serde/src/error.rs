use thiserror::Error;

/// Errors that can occur while reading values from a bit stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran past the end of the incoming buffer
    #[error("Unexpected end of buffer at bit {bit_index} (buffer holds {buffer_bits} bits)")]
    UnexpectedEnd { bit_index: usize, buffer_bits: usize },

    /// A decoded discriminant or tag did not map onto any known value
    #[error("Invalid {type_name} value {value} in incoming stream")]
    InvalidValue { type_name: &'static str, value: u64 },

    /// A variable-length integer carried more bits than can be represented
    #[error("Variable-length integer exceeds {max_bits} bits")]
    IntegerOverflow { max_bits: u32 },

    /// A decoded integer does not fit the requested target type
    #[error("Decoded value {value} does not fit into {type_name}")]
    IntegerOutOfRange { type_name: &'static str, value: i128 },

    /// A length prefix is larger than the configured maximum
    #[error("Length prefix {length} exceeds the maximum of {max}")]
    LengthTooLarge { length: u64, max: u64 },

    /// A serialized string was not valid UTF-8
    #[error("Serialized string is not valid UTF-8")]
    InvalidUtf8,
}
