//! Error taxonomy shared by the identity and authorization core.

use thiserror::Error;

/// Result type used across warden crates.
pub type AuthResult<T> = Result<T, AuthError>;

/// Identity, session and authorization failure.
///
/// Each variant maps to exactly one [`ErrorKind`]. Messages carry enough
/// context to tell the caller what went wrong (never internals such as
/// hashes, tokens or reset codes).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Never distinguishes an unknown username from a wrong password.
    #[error("invalid username or password")]
    InvalidUsernamePassword,

    #[error("credentials [{0}] are disabled")]
    DisabledCredentials(String),

    #[error("invalid access token")]
    InvalidAccessToken,

    #[error("access token has expired")]
    ExpiredAccessToken,

    #[error("credentials [{0}] must challenge their password to perform this operation")]
    UnchallengedPassword(String),

    #[error("credentials [{0}] have insufficient credentials")]
    InsufficientCredentials(String),

    #[error("credentials [{credentials}] have insufficient permissions: {message}")]
    InsufficientPermissions { credentials: String, message: String },

    #[error("credentials [{0}] must change their password")]
    PasswordMustChange(String),

    #[error("[{kind}][{value}] already exists")]
    AlreadyExists { kind: String, value: String },

    #[error("[{kind}][{id}] not found")]
    NotFound { kind: String, id: String },

    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("password does not comply with policy: {0}")]
    NonCompliantPassword(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("version conflict: {0}")]
    VersionConflict(String),

    #[error("password must be reset: {0}")]
    PasswordResetRequired(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn disabled(credentials: impl Into<String>) -> Self {
        Self::DisabledCredentials(credentials.into())
    }

    pub fn unchallenged(credentials: impl Into<String>) -> Self {
        Self::UnchallengedPassword(credentials.into())
    }

    pub fn insufficient_credentials(credentials: impl Into<String>) -> Self {
        Self::InsufficientCredentials(credentials.into())
    }

    pub fn insufficient_permissions(
        credentials: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InsufficientPermissions {
            credentials: credentials.into(),
            message: message.into(),
        }
    }

    pub fn password_must_change(credentials: impl Into<String>) -> Self {
        Self::PasswordMustChange(credentials.into())
    }

    pub fn already_exists(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::VersionConflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidUsernamePassword => ErrorKind::InvalidUsernamePassword,
            AuthError::DisabledCredentials(_) => ErrorKind::DisabledCredentials,
            AuthError::InvalidAccessToken => ErrorKind::InvalidAccessToken,
            AuthError::ExpiredAccessToken => ErrorKind::ExpiredAccessToken,
            AuthError::UnchallengedPassword(_) => ErrorKind::UnchallengedPassword,
            AuthError::InsufficientCredentials(_) => ErrorKind::InsufficientCredentials,
            AuthError::InsufficientPermissions { .. } => ErrorKind::InsufficientPermissions,
            AuthError::PasswordMustChange(_) => ErrorKind::PasswordMustChange,
            AuthError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            AuthError::NotFound { .. } => ErrorKind::NotFound,
            AuthError::IllegalArgument(_) => ErrorKind::IllegalArgument,
            AuthError::NonCompliantPassword(_) => ErrorKind::NonCompliantPassword,
            AuthError::Forbidden(_) => ErrorKind::Forbidden,
            AuthError::VersionConflict(_) => ErrorKind::VersionConflict,
            AuthError::PasswordResetRequired(_) => ErrorKind::PasswordResetRequired,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only store version conflicts are worth retrying; everything else is
    /// terminal for the current request.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Stable classification of an [`AuthError`], suitable for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUsernamePassword,
    DisabledCredentials,
    InvalidAccessToken,
    ExpiredAccessToken,
    UnchallengedPassword,
    InsufficientCredentials,
    InsufficientPermissions,
    PasswordMustChange,
    AlreadyExists,
    NotFound,
    IllegalArgument,
    NonCompliantPassword,
    Forbidden,
    VersionConflict,
    PasswordResetRequired,
    Internal,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::AlreadyExists
            | ErrorKind::IllegalArgument
            | ErrorKind::NonCompliantPassword => 400,
            ErrorKind::InvalidUsernamePassword
            | ErrorKind::DisabledCredentials
            | ErrorKind::InvalidAccessToken
            | ErrorKind::ExpiredAccessToken => 401,
            ErrorKind::UnchallengedPassword
            | ErrorKind::InsufficientCredentials
            | ErrorKind::InsufficientPermissions
            | ErrorKind::PasswordMustChange
            | ErrorKind::Forbidden
            | ErrorKind::PasswordResetRequired => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::VersionConflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// Kebab-case code exposed to API clients.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidUsernamePassword => "invalid-credentials",
            ErrorKind::DisabledCredentials => "disabled-credentials",
            ErrorKind::InvalidAccessToken => "invalid-access-token",
            ErrorKind::ExpiredAccessToken => "expired-access-token",
            ErrorKind::UnchallengedPassword => "unchallenged-password",
            ErrorKind::InsufficientCredentials => "insufficient-credentials",
            ErrorKind::InsufficientPermissions => "insufficient-permissions",
            ErrorKind::PasswordMustChange => "password-must-change",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::NotFound => "not-found",
            ErrorKind::IllegalArgument => "illegal-argument",
            ErrorKind::NonCompliantPassword => "non-compliant-password",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::VersionConflict => "version-conflict",
            ErrorKind::PasswordResetRequired => "password-reset-required",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn is_retryable(self) -> bool {
        self == ErrorKind::VersionConflict
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_are_401() {
        assert_eq!(AuthError::InvalidUsernamePassword.kind().http_status(), 401);
        assert_eq!(AuthError::disabled("[user][bob]").kind().http_status(), 401);
        assert_eq!(AuthError::InvalidAccessToken.kind().http_status(), 401);
        assert_eq!(AuthError::ExpiredAccessToken.kind().http_status(), 401);
    }

    #[test]
    fn authorization_failures_are_403() {
        assert_eq!(AuthError::unchallenged("x").kind().http_status(), 403);
        assert_eq!(AuthError::insufficient_credentials("x").kind().http_status(), 403);
        assert_eq!(AuthError::forbidden("x").kind().http_status(), 403);
        assert_eq!(AuthError::password_must_change("x").kind().http_status(), 403);
    }

    #[test]
    fn only_version_conflicts_are_retryable() {
        assert!(AuthError::conflict("stale").is_retryable());
        assert!(!AuthError::InvalidUsernamePassword.is_retryable());
        assert!(!AuthError::illegal_argument("bad").is_retryable());
        assert_eq!(AuthError::conflict("stale").kind().http_status(), 409);
    }

    #[test]
    fn non_compliant_password_has_dedicated_code() {
        let err = AuthError::NonCompliantPassword("too short".to_string());
        assert_eq!(err.kind().code(), "non-compliant-password");
        assert_eq!(err.kind().http_status(), 400);
    }

    #[test]
    fn messages_do_not_leak_user_existence() {
        assert_eq!(
            AuthError::InvalidUsernamePassword.to_string(),
            "invalid username or password"
        );
    }
}
