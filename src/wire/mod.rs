//! Wire Protocol Module
//!
//! Implements the compact binary encoding shared by all payloads that travel
//! between cluster nodes. The same format is used on the RPC socket and when
//! snapshotting diagnostic state onto the log.
//!
//! ## Format Rules
//! - **Integers**: big-endian, fixed width (`u8`, `i32`, `i64`). Booleans are a single byte (0/1).
//! - **Strings**: `i32` byte length followed by UTF-8 bytes. A length of `-1` marks an absent string.
//! - **Enums**: encoded as their variant name. Decoders reject unknown names instead of
//!   defaulting, so a node never misreads a payload from a newer peer.
//! - **Maps / Lists**: `i32` entry count followed by the entries. Map entries may arrive
//!   in any order.
//!
//! ## Submodules
//! - **`codec`**: primitive readers/writers plus the `WireEncode` / `WireDecode` traits.
//! - **`payloads`**: standalone log-protocol payloads (read requests).

pub mod codec;
pub mod payloads;
