pub mod hospital;
pub mod hospital_pool;
