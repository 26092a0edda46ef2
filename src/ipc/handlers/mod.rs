pub mod core;
pub mod dean_lists;
pub mod reconcile;
pub mod roster;
