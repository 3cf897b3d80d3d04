//! Source adapters turning upstream payloads into tidy rows.

pub mod faostat;
pub mod world_bank;

pub use faostat::FaostatAdapter;
pub use world_bank::WorldBankAdapter;
