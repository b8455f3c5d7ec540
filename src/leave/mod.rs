pub mod error;
pub mod ledger;
#[cfg(test)]
pub mod memory_store;
pub mod mysql_store;
pub mod notifier;
pub mod policy;
pub mod router;
pub mod store;
pub mod transition;
pub mod validation;
pub mod workflow;
