//! 32-byte content hash newtypes, grounded on `RootHash`/`NodeHash` in the
//! teacher's `crates/api/src/storage/mod.rs` (hex `Debug`, `Copy`, `Hash`).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! hash32_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

hash32_newtype!(ItemHash);
hash32_newtype!(LeafHash);
hash32_newtype!(RootHash);

impl From<ItemHash> for LeafHash {
    fn from(h: ItemHash) -> Self {
        LeafHash(h.0)
    }
}
