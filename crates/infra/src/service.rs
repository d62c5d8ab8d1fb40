//! Credentials orchestration.
//!
//! `CredentialsService` is the only component that touches storage on
//! behalf of the credentials aggregate. Every operation follows the same
//! shape:
//!
//! ```text
//! RequestContext (tenant + authenticated caller)
//!   ↓
//! 1. Authorize the caller against the target credentials
//!   ↓
//! 2. Load the aggregate (tenant-scoped)
//!   ↓
//! 3. Mutate it in memory (pure domain methods)
//!   ↓
//! 4. Save: purge old sessions, stamp `updated_at`, compare-and-set write
//! ```
//!
//! Store errors, version conflicts included, are propagated unchanged so
//! callers can reload and retry.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{error, info, warn};

use warden_auth::password::constant_time_eq;
use warden_auth::{
    usernames, Credentials, CredentialsSettings, CredentialsView, PasswordHasher, RequestContext,
    Role, Session,
};
use warden_core::{
    AggregateRoot, AuthError, AuthResult, Clock, CredentialsId, ExpectedVersion, TenantId,
};

use crate::authorization::AuthorizationHeader;
use crate::config::WardenConfig;
use crate::email::{EmailSender, PASSWORD_RESET_EMAIL_TEMPLATE};
use crate::store::{CredentialsPage, CredentialsStore, SettingsStore};

/// What a successful login hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    /// Seconds until the token expires.
    pub expires_in: u64,
    pub credentials: CredentialsView,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateCredentialsRequest {
    pub username: String,
    /// Without a password, a reset code is issued instead.
    pub password: Option<String>,
    pub email: Option<String>,
    pub roles: BTreeSet<Role>,
    pub group: Option<String>,
}

/// Partial update. Absent fields are left untouched; for the nullable
/// fields an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCredentialsRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "present")]
    pub enable_after: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "present")]
    pub disable_after: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "present")]
    pub group: Option<Option<String>>,
}

impl UpdateCredentialsRequest {
    /// Changes only administrators may request.
    fn is_administrative(&self) -> bool {
        self.enabled.is_some()
            || self.enable_after.is_some()
            || self.disable_after.is_some()
            || self.group.is_some()
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Authentication, sessions and administration of tenant credentials.
///
/// ## Generic Parameters
///
/// - `S`: credentials storage
/// - `T`: per-tenant settings storage
/// - `E`: email delivery
/// - `C`: time source
pub struct CredentialsService<S, T, E, C> {
    store: S,
    settings: T,
    email: E,
    clock: C,
    hasher: PasswordHasher,
    superdog_password: String,
}

impl<S, T, E, C> CredentialsService<S, T, E, C> {
    pub fn new(
        store: S,
        settings: T,
        email: E,
        clock: C,
        hasher: PasswordHasher,
        superdog_password: impl Into<String>,
    ) -> Self {
        Self {
            store,
            settings,
            email,
            clock,
            hasher,
            superdog_password: superdog_password.into(),
        }
    }

    pub fn from_config(config: &WardenConfig, store: S, settings: T, email: E, clock: C) -> Self {
        Self::new(
            store,
            settings,
            email,
            clock,
            config.password_hasher(),
            config.superdog.password.clone(),
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }
}

impl<S, T, E, C> CredentialsService<S, T, E, C>
where
    S: CredentialsStore,
    T: SettingsStore,
    E: EmailSender,
    C: Clock,
{
    // ─────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────

    pub fn settings(&self, tenant: &TenantId) -> AuthResult<CredentialsSettings> {
        self.settings.credentials_settings(tenant)
    }

    /// Replace the tenant's credentials settings. Out of range settings
    /// are `IllegalArgument`.
    pub fn update_settings(&self, ctx: &RequestContext, settings: CredentialsSettings) -> AuthResult<()> {
        ctx.credentials.check_at_least_superadmin()?;
        settings.validate()?;
        self.settings.save_credentials_settings(&ctx.tenant, settings)?;
        info!(tenant = %ctx.tenant, by = %ctx.credentials, "credentials settings updated");
        Ok(())
    }

    pub fn enable_guest_sign_up(&self, ctx: &RequestContext, enable: bool) -> AuthResult<()> {
        ctx.credentials.check_at_least_superadmin()?;
        let mut settings = self.settings(&ctx.tenant)?;
        settings.guest_sign_up_enabled = enable;
        settings.validate()?;
        self.settings.save_credentials_settings(&ctx.tenant, settings)?;
        info!(tenant = %ctx.tenant, enable, "guest sign up updated");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────

    /// Resolve the caller of a request from its `Authorization` header.
    ///
    /// No header means guest. Callers whose password must change are
    /// rejected; see [`Self::authenticate_to_set_password`].
    pub fn authenticate(
        &self,
        tenant: &TenantId,
        authorization: Option<&str>,
    ) -> AuthResult<RequestContext> {
        let ctx = self.authenticate_to_set_password(tenant, authorization)?;
        ctx.credentials.check_password_must_not_change()?;
        Ok(ctx)
    }

    /// Like [`Self::authenticate`], but lets through callers whose password
    /// must change. Only the set password operations should accept them.
    pub fn authenticate_to_set_password(
        &self,
        tenant: &TenantId,
        authorization: Option<&str>,
    ) -> AuthResult<RequestContext> {
        let Some(value) = authorization.filter(|v| !v.trim().is_empty()) else {
            return Ok(RequestContext::guest(tenant.clone()));
        };
        let credentials = match AuthorizationHeader::parse(value)? {
            AuthorizationHeader::Basic { username, password } => {
                self.check_username_password(tenant, &username, &password)?
            }
            AuthorizationHeader::Bearer(token) => self.check_token(tenant, &token)?,
        };
        Ok(RequestContext::new(tenant.clone(), credentials))
    }

    /// Challenge a username and password.
    ///
    /// A failed challenge of a known username counts toward lockout and is
    /// persisted before `InvalidUsernamePassword` is returned.
    pub fn check_username_password(
        &self,
        tenant: &TenantId,
        username: &str,
        password: &str,
    ) -> AuthResult<Credentials> {
        if username == Role::SUPERDOG.as_str() {
            return self.check_superdog(password);
        }

        let Some(mut credentials) = self.store.find_by_username(tenant, username)? else {
            warn!(tenant = %tenant, username, "password challenge for unknown username");
            return Err(AuthError::InvalidUsernamePassword);
        };

        if credentials.challenge_password(&self.hasher, password)? {
            credentials.check_really_enabled(self.clock.now())?;
            return Ok(credentials);
        }

        let settings = self.settings(tenant)?;
        let disabled = credentials.record_invalid_challenge(
            self.clock.now(),
            settings.max_invalid_challenges,
            settings.reset_window()?,
        );
        if settings.max_invalid_challenges > 0 {
            self.save(tenant, &mut credentials, &settings)?;
        }

        warn!(
            tenant = %tenant,
            credentials = %credentials,
            invalid_challenges = credentials.invalid_challenges(),
            "invalid password challenge"
        );
        if disabled {
            warn!(tenant = %tenant, credentials = %credentials, "credentials locked out");
        }
        Err(AuthError::InvalidUsernamePassword)
    }

    fn check_superdog(&self, password: &str) -> AuthResult<Credentials> {
        if constant_time_eq(password.as_bytes(), self.superdog_password.as_bytes()) {
            Ok(Credentials::superdog())
        } else {
            warn!("invalid superdog password challenge");
            Err(AuthError::InvalidUsernamePassword)
        }
    }

    /// Find the credentials owning `token` and attach that session.
    ///
    /// # Panics
    ///
    /// When the store returns more than one credentials for the token.
    /// Tokens are unique per tenant; anything else is a corrupted store.
    pub fn check_token(&self, tenant: &TenantId, token: &str) -> AuthResult<Credentials> {
        let mut found = self.store.find_by_session_token(tenant, token)?;
        if found.len() > 1 {
            error!(tenant = %tenant, matches = found.len(), "access token shared by credentials");
            panic!(
                "access token associated with [{}] credentials in tenant [{tenant}]",
                found.len()
            );
        }
        let Some(mut credentials) = found.pop() else {
            return Err(AuthError::InvalidAccessToken);
        };

        credentials.attach_session(token)?;
        let now = self.clock.now();
        if credentials.access_token_expires_in(now) == 0 {
            warn!(tenant = %tenant, credentials = %credentials, "expired access token");
            return Err(AuthError::ExpiredAccessToken);
        }
        credentials.check_really_enabled(now)?;
        Ok(credentials)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────

    /// Open a session for a caller who just challenged their password.
    ///
    /// `lifetime` is in seconds. A caller authenticated by token gets its
    /// current session back unchanged and `lifetime` is ignored.
    pub fn login(&self, ctx: &mut RequestContext, lifetime: Option<i64>) -> AuthResult<LoginResult> {
        ctx.credentials.check_at_least_user()?;
        if ctx.credentials.is_superdog() {
            return Err(AuthError::forbidden("superdog sessions are not stored in tenants"));
        }

        if ctx.credentials.has_password_been_challenged() {
            let settings = self.settings(&ctx.tenant)?;
            let lifetime = settings.check_session_lifetime(lifetime)?;
            let now = self.clock.now();
            ctx.credentials.set_current_session(Session::issue(now, lifetime)?);
            self.save(&ctx.tenant, &mut ctx.credentials, &settings)?;
            info!(tenant = %ctx.tenant, credentials = %ctx.credentials, "logged in");
        }

        let access_token = ctx
            .credentials
            .access_token()
            .ok_or(AuthError::InvalidAccessToken)?
            .to_string();
        Ok(LoginResult {
            access_token,
            expires_in: ctx.credentials.access_token_expires_in(self.clock.now()),
            credentials: CredentialsView::from(&ctx.credentials),
        })
    }

    /// Close the caller's current session, if any.
    pub fn logout(&self, ctx: &mut RequestContext) -> AuthResult<()> {
        ctx.credentials.check_at_least_user()?;
        if ctx.credentials.has_current_session() {
            let settings = self.settings(&ctx.tenant)?;
            ctx.credentials.delete_current_session();
            self.save(&ctx.tenant, &mut ctx.credentials, &settings)?;
            info!(tenant = %ctx.tenant, credentials = %ctx.credentials, "logged out");
        }
        Ok(())
    }

    /// Close one specific session of `id`.
    pub fn logout_session(&self, ctx: &RequestContext, id: &str, token: &str) -> AuthResult<Credentials> {
        let mut credentials = self.check_myself_or_higher_admin_and_get(ctx, id, false)?;
        credentials.delete_session(token)?;
        let settings = self.settings(&ctx.tenant)?;
        self.save(&ctx.tenant, &mut credentials, &settings)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, "session closed");
        Ok(credentials)
    }

    // ─────────────────────────────────────────────────────────────────────
    // CRUD
    // ─────────────────────────────────────────────────────────────────────

    /// Sign up or create credentials.
    ///
    /// Credentials always end up at least `user`. When no password is
    /// given, the returned credentials carry a password reset code.
    pub fn create(&self, ctx: &RequestContext, request: CreateCredentialsRequest) -> AuthResult<Credentials> {
        let requester = &ctx.credentials;
        let settings = self.settings(&ctx.tenant)?;

        if !settings.guest_sign_up_enabled {
            requester.check_at_least_user()?;
        }
        for role in &request.roles {
            Role::check_valid(role.as_str())?;
        }
        requester.check_can_manage(&request.roles)?;
        if request.group.is_some() {
            requester.check_at_least_admin()?;
        }

        if request.username.is_empty() {
            return Err(AuthError::illegal_argument("username is required"));
        }
        usernames::check(&request.username, Some(&settings.username_regex))?;
        usernames::check_not_reserved(&request.username)?;

        let email = request
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AuthError::illegal_argument("email is required"))?;

        let mut credentials = Credentials::new(CredentialsId::new(), request.username);
        for role in request.roles {
            credentials.add_role(role)?;
        }
        if !credentials.is_at_least_user() {
            credentials.add_role(Role::USER)?;
        }
        credentials.set_email(Some(email));
        credentials.set_group(request.group);

        match request.password.filter(|password| !password.is_empty()) {
            None => {
                credentials.new_password_reset_code();
            }
            Some(password) => {
                credentials.change_password(&self.hasher, &password, Some(&settings.password_regex))?;
            }
        }

        credentials.mark_created(self.clock.now());
        self.save(&ctx.tenant, &mut credentials, &settings)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, by = %requester, "credentials created");
        Ok(credentials)
    }

    pub fn get(&self, ctx: &RequestContext, id: &str) -> AuthResult<Credentials> {
        self.check_myself_or_higher_admin_and_get(ctx, id, false)
    }

    pub fn get_by_username(&self, ctx: &RequestContext, username: &str) -> AuthResult<Credentials> {
        ctx.credentials.check_at_least_admin()?;
        let credentials = self
            .store
            .find_by_username(&ctx.tenant, username)?
            .ok_or_else(|| AuthError::not_found("credentials", username))?;
        ctx.credentials.check_can_manage_credentials(&credentials)?;
        Ok(credentials)
    }

    pub fn list(&self, ctx: &RequestContext, from: usize, size: usize) -> AuthResult<CredentialsPage> {
        ctx.credentials.check_at_least_admin()?;
        self.store.list(&ctx.tenant, from, size)
    }

    /// Apply a partial update.
    ///
    /// Password changes, and any change requested by a `user`, need a
    /// password challenged in this request. Enablement, enable window and
    /// group changes need an administrator.
    pub fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateCredentialsRequest,
    ) -> AuthResult<Credentials> {
        let requester = &ctx.credentials;
        let mut credentials = self.check_myself_or_higher_admin_and_get(ctx, id, false)?;

        if request.password.is_some() || requester.has_role(&Role::USER) {
            requester.check_password_has_been_challenged()?;
        }
        if request.is_administrative() {
            requester.check_at_least_admin()?;
        }

        let settings = self.settings(&ctx.tenant)?;

        if let Some(username) = request.username {
            if username != credentials.username() {
                usernames::check(&username, Some(&settings.username_regex))?;
                usernames::check_not_reserved(&username)?;
                credentials.set_username(username);
            }
        }
        if let Some(email) = request.email {
            if email.is_empty() {
                return Err(AuthError::illegal_argument("email is required"));
            }
            credentials.set_email(Some(email));
        }
        if let Some(password) = request.password {
            credentials.change_password(&self.hasher, &password, Some(&settings.password_regex))?;
        }
        if let Some(enabled) = request.enabled {
            credentials.do_enable_or_disable(enabled);
        }
        if request.enable_after.is_some() || request.disable_after.is_some() {
            let enable_after = request.enable_after.unwrap_or(credentials.enable_after());
            let disable_after = request.disable_after.unwrap_or(credentials.disable_after());
            credentials.set_enable_window(enable_after, disable_after);
        }
        if let Some(group) = request.group {
            credentials.set_group(group);
        }

        self.save(&ctx.tenant, &mut credentials, &settings)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, by = %requester, "credentials updated");
        Ok(credentials)
    }

    /// Delete credentials. A tenant always keeps at least one superadmin.
    pub fn delete(&self, ctx: &RequestContext, id: &str) -> AuthResult<()> {
        let credentials = self.check_myself_or_higher_admin_and_get(ctx, id, false)?;

        if credentials.has_role(&Role::SUPERADMIN)
            && self.store.count_with_role(&ctx.tenant, &Role::SUPERADMIN)? <= 1
        {
            return Err(AuthError::forbidden("backend must at least have one superadmin"));
        }

        if !self.store.delete(&ctx.tenant, credentials.id())? {
            return Err(AuthError::not_found("credentials", id));
        }
        info!(tenant = %ctx.tenant, credentials = %credentials, by = %ctx.credentials, "credentials deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    pub fn roles(&self, ctx: &RequestContext, id: &str) -> AuthResult<BTreeSet<Role>> {
        Ok(self
            .check_myself_or_higher_admin_and_get(ctx, id, false)?
            .roles()
            .clone())
    }

    /// Grant `role`. Granting a role requires being able to manage it.
    pub fn set_role(&self, ctx: &RequestContext, id: &str, role: Role) -> AuthResult<Credentials> {
        Role::check_valid(role.as_str())?;
        let mut credentials = self.check_admin_and_get(ctx, id)?;
        ctx.credentials.check_can_manage([&role])?;

        if !credentials.has_role(&role) {
            credentials.add_role(role)?;
            self.save_with_tenant_settings(&ctx.tenant, &mut credentials)?;
            info!(tenant = %ctx.tenant, credentials = %credentials, by = %ctx.credentials, "role granted");
        }
        Ok(credentials)
    }

    pub fn unset_role(&self, ctx: &RequestContext, id: &str, role: &Role) -> AuthResult<Credentials> {
        let mut credentials = self.check_admin_and_get(ctx, id)?;
        if credentials.remove_role(role) {
            self.save_with_tenant_settings(&ctx.tenant, &mut credentials)?;
            info!(tenant = %ctx.tenant, credentials = %credentials, by = %ctx.credentials, "role revoked");
        }
        Ok(credentials)
    }

    pub fn clear_roles(&self, ctx: &RequestContext, id: &str) -> AuthResult<Credentials> {
        let mut credentials = self.check_admin_and_get(ctx, id)?;
        credentials.clear_roles();
        self.save_with_tenant_settings(&ctx.tenant, &mut credentials)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, by = %ctx.credentials, "roles cleared");
        Ok(credentials)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Passwords
    // ─────────────────────────────────────────────────────────────────────

    /// Drop the password and every session, then issue a reset code.
    pub fn reset_password(&self, ctx: &RequestContext, id: &str) -> AuthResult<Credentials> {
        let mut credentials = self.check_admin_and_get(ctx, id)?;
        credentials.clear_password_and_sessions();
        credentials.new_password_reset_code();
        self.save_with_tenant_settings(&ctx.tenant, &mut credentials)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, by = %ctx.credentials, "password reset");
        Ok(credentials)
    }

    /// Issue a reset code for `username` and email it.
    ///
    /// `params` is merged into the template model next to `credentials` and
    /// `passwordResetCode`. Returns the sender's receipt.
    pub fn send_password_reset(
        &self,
        ctx: &RequestContext,
        username: &str,
        params: Map<String, JsonValue>,
    ) -> AuthResult<JsonValue> {
        if username.is_empty() {
            return Err(AuthError::illegal_argument("username is required"));
        }
        let mut credentials = self
            .store
            .find_by_username(&ctx.tenant, username)?
            .ok_or_else(|| AuthError::not_found("credentials", username))?;
        let Some(to) = credentials.email().map(str::to_string) else {
            return Err(AuthError::illegal_argument(format!("{credentials} has no email")));
        };

        let template = self
            .email
            .template(&ctx.tenant, PASSWORD_RESET_EMAIL_TEMPLATE)?
            .ok_or_else(|| AuthError::not_found("email template", PASSWORD_RESET_EMAIL_TEMPLATE))?;
        ctx.credentials.check_role_access(&template.authorized_roles)?;

        let code = credentials.new_password_reset_code().to_string();
        self.save_with_tenant_settings(&ctx.tenant, &mut credentials)?;

        let view = serde_json::to_value(CredentialsView::from(&credentials))
            .map_err(|e| AuthError::internal(format!("credentials encoding failed: {e}")))?;
        let mut model = params;
        model.insert("credentials".to_string(), view);
        model.insert("passwordResetCode".to_string(), JsonValue::String(code));

        let receipt = self.email.send(&ctx.tenant, &template, &to, model)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, "password reset email sent");
        Ok(receipt)
    }

    /// Set a password by presenting the pending reset code. No caller
    /// authentication is involved: the code is the proof.
    pub fn set_password_with_code(
        &self,
        tenant: &TenantId,
        id: &str,
        password: &str,
        code: &str,
    ) -> AuthResult<Credentials> {
        let mut credentials = self.load(tenant, id)?;
        let settings = self.settings(tenant)?;
        credentials.change_password_with_code(
            &self.hasher,
            password,
            code,
            Some(&settings.password_regex),
        )?;
        self.save(tenant, &mut credentials, &settings)?;
        info!(tenant = %tenant, credentials = %credentials, "password set with reset code");
        Ok(credentials)
    }

    /// Set a password as its owner (password challenged in this request)
    /// or as a managing administrator.
    pub fn set_password(&self, ctx: &RequestContext, id: &str, password: &str) -> AuthResult<Credentials> {
        let mut credentials = self.check_myself_or_higher_admin_and_get(ctx, id, true)?;
        let settings = self.settings(&ctx.tenant)?;
        credentials.change_password(&self.hasher, password, Some(&settings.password_regex))?;
        self.save(&ctx.tenant, &mut credentials, &settings)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, by = %ctx.credentials, "password changed");
        Ok(credentials)
    }

    pub fn password_must_change(&self, ctx: &RequestContext, id: &str) -> AuthResult<Credentials> {
        let mut credentials = self.check_admin_and_get(ctx, id)?;
        credentials.set_password_must_change(true);
        self.save_with_tenant_settings(&ctx.tenant, &mut credentials)?;
        Ok(credentials)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Enablement
    // ─────────────────────────────────────────────────────────────────────

    pub fn enable(&self, ctx: &RequestContext, id: &str) -> AuthResult<Credentials> {
        self.enable_or_disable(ctx, id, true)
    }

    pub fn disable(&self, ctx: &RequestContext, id: &str) -> AuthResult<Credentials> {
        self.enable_or_disable(ctx, id, false)
    }

    fn enable_or_disable(&self, ctx: &RequestContext, id: &str, enable: bool) -> AuthResult<Credentials> {
        let mut credentials = self.check_admin_and_get(ctx, id)?;
        credentials.do_enable_or_disable(enable);
        self.save_with_tenant_settings(&ctx.tenant, &mut credentials)?;
        info!(tenant = %ctx.tenant, credentials = %credentials, by = %ctx.credentials, enable, "credentials enablement changed");
        Ok(credentials)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn load(&self, tenant: &TenantId, id: &str) -> AuthResult<Credentials> {
        self.store
            .get(tenant, &CredentialsId::from(id))?
            .ok_or_else(|| AuthError::not_found("credentials", id))
    }

    /// The caller themself, or credentials the calling admin may manage.
    fn check_myself_or_higher_admin_and_get(
        &self,
        ctx: &RequestContext,
        id: &str,
        check_password_challenged: bool,
    ) -> AuthResult<Credentials> {
        let requester = &ctx.credentials;
        requester.check_at_least_user()?;
        if check_password_challenged {
            requester.check_password_has_been_challenged()?;
        }

        if ctx.is_self(id) {
            return Ok(requester.clone());
        }
        if requester.is_at_least_admin() {
            let credentials = self.load(&ctx.tenant, id)?;
            requester.check_can_manage_credentials(&credentials)?;
            return Ok(credentials);
        }
        Err(AuthError::insufficient_credentials(requester.to_string()))
    }

    fn check_admin_and_get(&self, ctx: &RequestContext, id: &str) -> AuthResult<Credentials> {
        ctx.credentials.check_at_least_admin()?;
        let credentials = self.load(&ctx.tenant, id)?;
        ctx.credentials.check_can_manage_credentials(&credentials)?;
        Ok(credentials)
    }

    fn save_with_tenant_settings(&self, tenant: &TenantId, credentials: &mut Credentials) -> AuthResult<()> {
        let settings = self.settings(tenant)?;
        self.save(tenant, credentials, &settings)
    }

    /// Compare-and-set write of an aggregate loaded at `credentials.version()`.
    fn save(
        &self,
        tenant: &TenantId,
        credentials: &mut Credentials,
        settings: &CredentialsSettings,
    ) -> AuthResult<()> {
        credentials.purge_old_sessions(settings.sessions_size_max)?;
        credentials.touch(self.clock.now());

        let expected = ExpectedVersion::of(credentials.version());
        let version = self
            .store
            .save(tenant, credentials, expected)
            .inspect_err(|e| {
                if matches!(e, AuthError::VersionConflict(_)) {
                    warn!(tenant = %tenant, credentials = %credentials, ?expected, "credentials version conflict");
                }
            })?;
        credentials.set_version(version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_absent_from_null() {
        let request: UpdateCredentialsRequest =
            serde_json::from_str(r#"{ "email": "fred@dog.com", "disable_after": null }"#).unwrap();
        assert_eq!(request.email.as_deref(), Some("fred@dog.com"));
        assert_eq!(request.disable_after, Some(None));
        assert_eq!(request.enable_after, None);
        assert_eq!(request.group, None);
        assert!(request.is_administrative());
    }

    #[test]
    fn plain_profile_updates_are_not_administrative() {
        let request: UpdateCredentialsRequest =
            serde_json::from_str(r#"{ "username": "fred2", "password": "hi fred 2" }"#).unwrap();
        assert!(!request.is_administrative());
    }

    #[test]
    fn create_request_defaults() {
        let request: CreateCredentialsRequest =
            serde_json::from_str(r#"{ "username": "fred", "email": "fred@dog.com" }"#).unwrap();
        assert!(request.roles.is_empty());
        assert!(request.password.is_none());
        assert!(request.group.is_none());
    }
}
