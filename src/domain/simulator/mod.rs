pub mod config;
pub mod replication;
pub mod simulator;
