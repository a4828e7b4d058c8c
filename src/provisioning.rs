mod client;
mod groups;
mod users;

pub use client::{ProvisioningClient, ProvisioningClientBuilder};
