pub mod admission_queue;
