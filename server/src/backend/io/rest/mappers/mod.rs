//! Conversions between domain results and the shared DTOs.

pub mod account_mapper;
pub mod entry_mapper;
pub mod summary_mapper;
