pub mod interface;
pub mod reconciliation;
