//! Concrete DNS resolver adapters.

pub mod hickory;

pub use hickory::HickoryResolver;
