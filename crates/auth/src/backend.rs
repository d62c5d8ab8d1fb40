//! Tenant resolution from request host names.
//!
//! An installation is configured with one backend URL template such as
//! `https://*.example.io` or `http://*.lvh.me:8443`. The `*` segment carries
//! the tenant id; a template without `*` serves a single backend.

use core::str::FromStr;

use warden_core::{AuthError, AuthResult, RESERVED_PLATFORM_ID, TenantId};

/// Host label addressing the platform itself rather than a tenant.
pub const API_LABEL: &str = "api";

/// Outcome of resolving a request host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The platform (root) backend: `api.<suffix>`, `spacedog.<suffix>` or
    /// the exact host of a single-backend template.
    Root,
    Tenant(TenantId),
}

impl Resolved {
    pub fn tenant(&self) -> Option<&TenantId> {
        match self {
            Resolved::Root => None,
            Resolved::Tenant(id) => Some(id),
        }
    }
}

/// Parsed `scheme://[prefix*]suffix[:port]` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTemplate {
    ssl: bool,
    /// `None` for single-backend templates.
    host_prefix: Option<String>,
    host_suffix: String,
    port: u16,
}

impl BackendTemplate {
    pub fn parse(url: &str) -> AuthResult<Self> {
        let invalid = || AuthError::illegal_argument(format!("backend url [{url}] is invalid"));

        let lower = url.trim().to_ascii_lowercase();
        let (ssl, rest) = if let Some(rest) = lower.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = lower.strip_prefix("http://") {
            (false, rest)
        } else {
            return Err(invalid());
        };
        let rest = rest.trim_end_matches('/');

        let (host_prefix, suffix_and_port) = match rest.split_once('*') {
            Some((prefix, suffix)) => (Some(prefix.to_string()), suffix),
            None => (None, rest),
        };
        if suffix_and_port.contains('*') {
            return Err(invalid());
        }

        let (host_suffix, port) = match suffix_and_port.split_once(':') {
            Some((suffix, port)) => (suffix, port.parse::<u16>().map_err(|_| invalid())?),
            None => (suffix_and_port, if ssl { 443 } else { 80 }),
        };
        if host_prefix.is_none() && host_suffix.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            ssl,
            host_prefix,
            host_suffix: host_suffix.to_string(),
            port,
        })
    }

    pub fn scheme(&self) -> &'static str {
        if self.ssl { "https" } else { "http" }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_multi(&self) -> bool {
        self.host_prefix.is_some()
    }

    fn port_suffix(&self) -> String {
        if self.port == 80 || self.port == 443 {
            String::new()
        } else {
            format!(":{}", self.port)
        }
    }

    fn host_for_label(&self, label: &str) -> String {
        match &self.host_prefix {
            Some(prefix) => format!("{prefix}{label}{}{}", self.host_suffix, self.port_suffix()),
            None => format!("{}{}", self.host_suffix, self.port_suffix()),
        }
    }

    /// `host[:port]` at which `tenant` is served.
    pub fn host_for(&self, tenant: &TenantId) -> String {
        self.host_for_label(tenant.as_str())
    }

    /// Base URL of `tenant`.
    pub fn url_for(&self, tenant: &TenantId) -> String {
        format!("{}://{}", self.scheme(), self.host_for(tenant))
    }

    /// Base URL of the platform backend.
    pub fn root_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.host_for_label(API_LABEL))
    }

    /// Resolve the tenant addressed by a request `Host` header value.
    pub fn resolve(&self, request_host: &str) -> AuthResult<Resolved> {
        let host = request_host.trim().to_ascii_lowercase();
        let not_found = || AuthError::not_found("backend", request_host);

        let Some(prefix) = &self.host_prefix else {
            return if host == self.host_for_label("") {
                Ok(Resolved::Root)
            } else {
                Err(not_found())
            };
        };

        let suffix_and_port = format!("{}{}", self.host_suffix, self.port_suffix());
        let label = host
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_suffix(suffix_and_port.as_str()))
            .ok_or_else(not_found)?;

        if label.is_empty() || label.contains('.') {
            return Err(not_found());
        }
        if label == API_LABEL || label == RESERVED_PLATFORM_ID {
            return Ok(Resolved::Root);
        }
        TenantId::parse(label)
            .map(Resolved::Tenant)
            .map_err(|_| not_found())
    }
}

impl FromStr for BackendTemplate {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl core::fmt::Display for BackendTemplate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}://{}", self.scheme(), self.host_for_label("*"))
    }
}
