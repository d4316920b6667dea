pub mod atomic;
pub mod id_generator;
pub mod monitor;
pub mod observer_list;
