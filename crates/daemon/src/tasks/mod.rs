pub mod inspector;
pub mod reconcile;
