pub mod bcj;
pub mod chunk_table;
pub mod cipher;
pub mod error;
pub mod file_header;
pub mod fragment;
pub mod parts;

pub use cipher::CryptTable;
pub use error::{DaaError, Result};
pub use file_header::{
    DescriptorHeader, EncryptionDescriptor, Format2Header, MainHeader, PartHeader, SplitDescriptor,
    DESCRIPTOR_ENCRYPTION, DESCRIPTOR_PART, DESCRIPTOR_SPLIT, MAIN_SIGNATURE, PART_SIGNATURE,
};
pub use fragment::DaaFragment;
pub use parts::{FilenameScheme, Part};
