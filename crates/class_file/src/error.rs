use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error("Unexpected end of input at offset {offset}: needed {needed} bytes, {remaining} left")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("Invalid magic identifier: 0x{0:X}")]
    BadMagic(u32),
    #[error("Invalid cp info tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },
    #[error("Invalid modified UTF-8 in constant pool entry {index}")]
    InvalidUtf8 {
        index: u16,
        #[source]
        source: cesu8::Cesu8DecodingError,
    },
    #[error("Invalid constant pool index: {0}")]
    InvalidPoolIndex(u16),
    #[error("Expected {expected} at constant pool index {index}, found {found:?}")]
    WrongConstantKind {
        index: u16,
        expected: &'static str,
        found: constant_pool::CpInfo,
    },
    #[error("Attribute {name} declares {declared} bytes but {consumed} were consumed")]
    AttributeLengthMismatch {
        name: String,
        declared: u32,
        consumed: usize,
    },
}
