//! Infrastructure layer: storage and email ports, configuration, and the
//! credentials orchestrator that drives them.

pub mod authorization;
pub mod config;
pub mod email;
pub mod service;
pub mod store;

pub use crate::authorization::AuthorizationHeader;
pub use crate::config::WardenConfig;
pub use crate::email::{EmailSender, EmailTemplate, InMemoryEmailSender, PASSWORD_RESET_EMAIL_TEMPLATE};
pub use crate::service::{
    CreateCredentialsRequest, CredentialsService, LoginResult, UpdateCredentialsRequest,
};
pub use crate::store::{
    CredentialsPage, CredentialsStore, InMemoryCredentialsStore, InMemorySettingsStore,
    SettingsStore,
};
