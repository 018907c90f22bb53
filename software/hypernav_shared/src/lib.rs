#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::needless_range_loop)]

pub mod acquisition;
pub mod commands;
pub mod frame;

pub use acquisition::{AcquisitionMode, DataKind, Side, SpectrometerPhase};
pub use byte_struct::{ByteStruct, ByteStructLen};
pub use commands::{BoardAddress, CommandKind, CommandPacket, ResponsePacket, ResponseStatus};
pub use frame::FrameHeader;

/// Number of spectrometer channels on the spectrometer board
pub const SIDE_COUNT: usize = 2;

/// Pixels clocked out of the FIFO ahead of the first valid pixel of a row
pub const PIXEL_LEAD_IN: usize = 10;

/// Declare a one-byte wire enum.
///
/// Adds an `Unknown(u8)` variant so that any byte decodes without error,
/// `u8` conversions both ways, and the [`ByteStruct`] encoding used by the
/// packet and frame structs.
#[macro_export]
macro_rules! wire_enum {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident {
            $(
              $( #[$variant_attr:meta] )*
              $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
        $( #[$enum_attr] )*
        pub enum $name {
            $(
              $( #[$variant_attr] )*
              $variant
            ),*,
            /// A byte that names no variant
            Unknown(u8)
        }

        impl $name {
            /// Whether this decoded to a named variant
            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Unknown(_))
            }
        }

        impl ::core::convert::From<u8> for $name {
            fn from(byte: u8) -> Self {
                match byte {
                    $( $value => $name::$variant ),*,
                    other => $name::Unknown(other)
                }
            }
        }

        impl ::core::convert::From<$name> for u8 {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value ),*,
                    $name::Unknown(other) => other
                }
            }
        }

        impl $crate::ByteStructLen for $name {
            const BYTE_LEN: usize = 1;
        }

        impl $crate::ByteStruct for $name {
            fn read_bytes(bytes: &[u8]) -> Self {
                Self::from(bytes[0])
            }

            fn write_bytes(&self, bytes: &mut [u8]) {
                bytes[0] = u8::from(*self);
            }
        }
    };
}
