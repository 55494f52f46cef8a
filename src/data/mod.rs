//! External market-data integrations.

pub mod dexscreener;
