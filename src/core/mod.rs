//! Core, platform independent networking code.

pub mod arp_cache;
pub mod arp_queue;
pub mod check;
pub mod interface;
pub mod repr;
pub mod router;
pub mod time;
