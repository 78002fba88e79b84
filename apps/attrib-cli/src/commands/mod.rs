pub mod checkpoint;
pub mod classify;
pub mod policy;
pub mod serve;
