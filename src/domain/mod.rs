pub mod generator;
pub mod hospital;
pub mod matching;
pub mod queue;
pub mod request;
pub mod simulator;
pub mod statistics;
pub mod utils;
