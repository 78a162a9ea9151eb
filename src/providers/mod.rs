//! Concrete DNS provider adapters.

pub mod digitalocean;

pub use digitalocean::DigitalOceanProvider;
