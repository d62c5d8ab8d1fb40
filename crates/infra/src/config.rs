//! Installation-wide configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

use warden_auth::password::DEFAULT_ITERATIONS;
use warden_auth::{BackendTemplate, CredentialsSettings, PasswordHasher};

#[derive(Debug, Clone, Deserialize)]
pub struct WardenConfig {
    /// Backend URL template, e.g. `https://*.example.io`.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    pub superdog: SuperdogConfig,
    pub password: PasswordConfig,
    /// Credentials policy for tenants that did not save their own.
    #[serde(default)]
    pub credentials: CredentialsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuperdogConfig {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub salt: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_backend_url() -> String {
    "http://*.lvh.me:8443".to_string()
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

impl WardenConfig {
    /// Defaults, then `config/warden.*` if present, then `WARDEN__*`
    /// environment variables (`WARDEN__SUPERDOG__PASSWORD=...`).
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder()
                .add_source(config::File::with_name("config/warden").required(false)),
        )
    }

    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder
            .set_default("backend_url", default_backend_url())?
            .set_default("password.iterations", i64::from(DEFAULT_ITERATIONS))?
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config
            .try_deserialize()
            .context("invalid warden configuration")?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<()> {
        BackendTemplate::parse(&self.backend_url)
            .with_context(|| format!("invalid backend_url [{}]", self.backend_url))?;
        anyhow::ensure!(!self.superdog.password.is_empty(), "superdog.password is empty");
        anyhow::ensure!(!self.password.salt.is_empty(), "password.salt is empty");
        anyhow::ensure!(self.password.iterations > 0, "password.iterations must be positive");
        self.credentials
            .validate()
            .context("invalid default credentials settings")?;
        Ok(())
    }

    pub fn backend_template(&self) -> Result<BackendTemplate> {
        Ok(BackendTemplate::parse(&self.backend_url)?)
    }

    pub fn password_hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.password.salt.clone()).with_iterations(self.password.iterations)
    }
}
