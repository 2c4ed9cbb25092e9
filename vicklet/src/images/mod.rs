//! Image store coordination: pulling images through the persona service and
//! reading back the metadata the handle transaction needs.

mod config;
mod persona;
mod store;

pub use config::{ImageConfig, ImageRef};
pub use persona::{ContainerCreateSpec, PersonaClient, RegistryCredentials};
pub use store::{ImageStore, PersonaImageStore};
