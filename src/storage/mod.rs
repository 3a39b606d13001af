pub mod columns;
pub mod partition_store;
pub mod repair;
pub mod unify;

pub use partition_store::{PartitionBy, PartitionStore, PartitionSummary, YearMonth};
pub use repair::{repair_numeric_columns, repair_tree, RepairReport};
