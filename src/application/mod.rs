pub mod augment;
pub mod bridge;
pub mod invoker;
pub mod registry;
pub mod stdio;
