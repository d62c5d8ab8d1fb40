//! Credentials aggregate: identity, password state, sessions and enablement.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use warden_core::{AggregateRoot, AuthError, AuthResult, CredentialsId};

use crate::password::{self, PasswordHasher, constant_time_eq};
use crate::roles::{self, Role};
use crate::session::Session;

// ─────────────────────────────────────────────────────────────────────────────
// Credentials Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// The identity aggregate of one tenant.
///
/// # Invariants
/// - `username` is unique per tenant (enforced by the store).
/// - Role names are valid (`[a-z]{3,}`).
/// - A session token belongs to at most one credentials of the tenant.
///
/// `current_session` and `password_challenged` describe the request being
/// served and are never persisted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub(crate) id: CredentialsId,
    pub(crate) version: u64,
    pub(crate) username: String,
    pub(crate) email: Option<String>,
    pub(crate) roles: BTreeSet<Role>,
    pub(crate) group: Option<String>,
    pub(crate) tags: BTreeSet<String>,

    pub(crate) hashed_password: Option<String>,
    pub(crate) password_reset_code: Option<String>,
    pub(crate) password_must_change: bool,

    pub(crate) enabled: bool,
    pub(crate) enable_after: Option<DateTime<Utc>>,
    pub(crate) disable_after: Option<DateTime<Utc>>,
    pub(crate) invalid_challenges: u32,
    pub(crate) last_invalid_challenge_at: Option<DateTime<Utc>>,

    pub(crate) sessions: Vec<Session>,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: Option<DateTime<Utc>>,

    current_session: Option<String>,
    password_challenged: bool,
}

impl Credentials {
    pub fn new(id: CredentialsId, username: impl Into<String>) -> Self {
        Self {
            id,
            version: 0,
            username: username.into(),
            email: None,
            roles: BTreeSet::new(),
            group: None,
            tags: BTreeSet::new(),
            hashed_password: None,
            password_reset_code: None,
            password_must_change: false,
            enabled: true,
            enable_after: None,
            disable_after: None,
            invalid_challenges: 0,
            last_invalid_challenge_at: None,
            sessions: Vec::new(),
            created_at: None,
            updated_at: None,
            current_session: None,
            password_challenged: false,
        }
    }

    /// The anonymous caller.
    pub fn guest() -> Self {
        Self::new(CredentialsId::from("guest"), "guest")
    }

    /// The installation super-operator. Never stored in a tenant.
    pub fn superdog() -> Self {
        let mut credentials = Self::new(CredentialsId::from("superdog"), "superdog");
        credentials.roles.insert(Role::SUPERDOG);
        credentials.password_challenged = true;
        credentials
    }

    pub fn id_str(&self) -> &str {
        self.id.as_str()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Stamp a first save.
    pub fn mark_created(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// True until the first update after creation.
    pub fn is_brand_new(&self) -> bool {
        match self.updated_at {
            None => true,
            Some(updated) => Some(updated) == self.created_at,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id == *"guest"
    }
}

impl AggregateRoot for Credentials {
    type Id = CredentialsId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl core::fmt::Display for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}][{}]", self.kind(), self.username)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

impl Credentials {
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn add_role(&mut self, role: Role) -> AuthResult<()> {
        Role::check_valid(role.as_str())?;
        self.roles.insert(role);
        Ok(())
    }

    pub fn remove_role(&mut self, role: &Role) -> bool {
        self.roles.remove(role)
    }

    pub fn clear_roles(&mut self) {
        self.roles.clear();
    }

    /// Highest-ranked role held, or `guest`.
    pub fn kind(&self) -> Role {
        Role::for_rank(self.rank())
    }

    pub fn rank(&self) -> u8 {
        roles::rank(&self.roles)
    }

    pub fn is_superdog(&self) -> bool {
        self.rank() >= Role::SUPERDOG.rank()
    }

    pub fn is_at_least_superadmin(&self) -> bool {
        self.rank() >= Role::SUPERADMIN.rank()
    }

    pub fn is_at_least_admin(&self) -> bool {
        self.rank() >= Role::ADMIN.rank()
    }

    pub fn is_at_least_user(&self) -> bool {
        self.rank() >= Role::USER.rank()
    }

    pub fn check_superdog(&self) -> AuthResult<()> {
        self.check_rank(self.is_superdog())
    }

    pub fn check_at_least_superadmin(&self) -> AuthResult<()> {
        self.check_rank(self.is_at_least_superadmin())
    }

    pub fn check_at_least_admin(&self) -> AuthResult<()> {
        self.check_rank(self.is_at_least_admin())
    }

    pub fn check_at_least_user(&self) -> AuthResult<()> {
        self.check_rank(self.is_at_least_user())
    }

    fn check_rank(&self, ok: bool) -> AuthResult<()> {
        if ok {
            Ok(())
        } else {
            Err(AuthError::insufficient_credentials(self.to_string()))
        }
    }

    pub fn can_manage(&self, role: &Role) -> bool {
        roles::can_manage(self.rank(), role)
    }

    pub fn can_manage_all<'a>(&self, roles: impl IntoIterator<Item = &'a Role>) -> bool {
        roles.into_iter().all(|role| self.can_manage(role))
    }

    pub fn check_can_manage<'a>(&self, roles: impl IntoIterator<Item = &'a Role>) -> AuthResult<()> {
        if self.can_manage_all(roles) {
            Ok(())
        } else {
            Err(AuthError::insufficient_credentials(self.to_string()))
        }
    }

    /// Administering `other` requires managing its highest-ranked role.
    pub fn check_can_manage_credentials(&self, other: &Credentials) -> AuthResult<()> {
        self.check_can_manage([&other.kind()])
    }

    /// Pass if one of `authorized` is `all` or a role held.
    pub fn check_role_access<'a>(&self, authorized: impl IntoIterator<Item = &'a Role>) -> AuthResult<()> {
        let granted = authorized
            .into_iter()
            .any(|role| *role == Role::ALL || self.roles.contains(role));
        if granted {
            Ok(())
        } else {
            Err(AuthError::insufficient_credentials(self.to_string()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Group, tags, ownership
// ─────────────────────────────────────────────────────────────────────────────

impl Credentials {
    /// Explicit group, else the credentials' own id.
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn set_group(&mut self, group: Option<String>) {
        self.group = group;
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn add_tag(&mut self, key: &str, value: impl core::fmt::Display) {
        self.tags.insert(format!("{key}:{value}"));
    }

    pub fn tag_values(&self, key: &str) -> BTreeSet<&str> {
        self.tags
            .iter()
            .filter_map(|tag| tag.split_once(':'))
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn remove_tags(&mut self, key: &str) {
        self.tags
            .retain(|tag| tag.split_once(':').is_none_or(|(k, _)| k != key));
    }

    pub fn check_owner_access(&self, owner: &str, object_type: &str, object_id: &str) -> AuthResult<()> {
        if self.id == *owner {
            Ok(())
        } else {
            Err(AuthError::forbidden(format!(
                "{self} not owner of [{object_type}][{object_id}]"
            )))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account gate and lockout
// ─────────────────────────────────────────────────────────────────────────────

impl Credentials {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable_after(&self) -> Option<DateTime<Utc>> {
        self.enable_after
    }

    pub fn disable_after(&self) -> Option<DateTime<Utc>> {
        self.disable_after
    }

    pub fn set_enable_window(
        &mut self,
        enable_after: Option<DateTime<Utc>>,
        disable_after: Option<DateTime<Utc>>,
    ) {
        self.enable_after = enable_after;
        self.disable_after = disable_after;
    }

    pub fn invalid_challenges(&self) -> u32 {
        self.invalid_challenges
    }

    pub fn last_invalid_challenge_at(&self) -> Option<DateTime<Utc>> {
        self.last_invalid_challenge_at
    }

    /// `enabled` combined with the enable/disable window at `now`.
    pub fn is_really_enabled(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match (self.enable_after, self.disable_after) {
            (None, None) => true,
            (None, Some(disable)) => now < disable,
            (Some(enable), None) => now >= enable,
            (Some(enable), Some(disable)) if disable < enable => now >= enable,
            (Some(enable), Some(disable)) if enable < disable => enable <= now && now < disable,
            _ => false,
        }
    }

    pub fn check_really_enabled(&self, now: DateTime<Utc>) -> AuthResult<()> {
        if self.is_really_enabled(now) {
            Ok(())
        } else {
            Err(AuthError::disabled(self.to_string()))
        }
    }

    /// Enabling also forgives past failed challenges.
    pub fn do_enable_or_disable(&mut self, enable: bool) {
        self.enabled = enable;
        if enable {
            self.invalid_challenges = 0;
            self.last_invalid_challenge_at = None;
        }
    }

    /// Account for one failed password challenge.
    ///
    /// `threshold == 0` disables lockout. The counter starts over when the
    /// previous failure is older than `reset_window`. Returns `true` when
    /// this failure disabled the account.
    pub fn record_invalid_challenge(
        &mut self,
        now: DateTime<Utc>,
        threshold: u32,
        reset_window: Duration,
    ) -> bool {
        if threshold == 0 {
            return false;
        }
        // An unrepresentable window end never elapses.
        let window_elapsed = self
            .last_invalid_challenge_at
            .and_then(|last| last.checked_add_signed(reset_window))
            .is_some_and(|end| end < now);
        if window_elapsed {
            self.invalid_challenges = 0;
            self.last_invalid_challenge_at = None;
        }
        self.invalid_challenges = self.invalid_challenges.saturating_add(1);
        self.last_invalid_challenge_at = Some(now);

        if self.invalid_challenges >= threshold && self.enabled {
            self.enabled = false;
            return true;
        }
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Password
// ─────────────────────────────────────────────────────────────────────────────

impl Credentials {
    pub fn has_password(&self) -> bool {
        self.hashed_password.is_some()
    }

    pub fn password_reset_code(&self) -> Option<&str> {
        self.password_reset_code.as_deref()
    }

    pub fn password_must_change(&self) -> bool {
        self.password_must_change
    }

    pub fn set_password_must_change(&mut self, must_change: bool) {
        self.password_must_change = must_change;
    }

    pub fn has_password_been_challenged(&self) -> bool {
        self.password_challenged
    }

    /// Compare `plaintext` with the stored digest.
    ///
    /// A match marks the password as challenged for the current request.
    pub fn challenge_password(&mut self, hasher: &PasswordHasher, plaintext: &str) -> AuthResult<bool> {
        let Some(digest) = &self.hashed_password else {
            return Ok(false);
        };
        let matched = hasher.matches(plaintext, digest)?;
        if matched {
            self.password_challenged = true;
        }
        Ok(matched)
    }

    pub fn check_password_has_been_challenged(&self) -> AuthResult<()> {
        if self.password_challenged {
            Ok(())
        } else {
            Err(AuthError::unchallenged(self.to_string()))
        }
    }

    pub fn check_password_must_not_change(&self) -> AuthResult<()> {
        if self.password_must_change {
            Err(AuthError::password_must_change(self.to_string()))
        } else {
            Ok(())
        }
    }

    /// Issue a fresh single-use reset code, replacing any pending one.
    pub fn new_password_reset_code(&mut self) -> &str {
        self.password_reset_code
            .insert(Uuid::new_v4().to_string())
            .as_str()
    }

    /// Forget the password and every credential derived from it.
    pub fn clear_password_and_sessions(&mut self) {
        self.hashed_password = None;
        self.password_reset_code = None;
        self.invalid_challenges = 0;
        self.last_invalid_challenge_at = None;
        self.current_session = None;
        self.sessions.clear();
    }

    pub fn change_password(
        &mut self,
        hasher: &PasswordHasher,
        new_password: &str,
        policy: Option<&str>,
    ) -> AuthResult<()> {
        password::check(new_password, policy)?;
        self.clear_password_and_sessions();
        self.hashed_password = Some(hasher.hash(new_password));
        self.password_challenged = true;
        self.password_must_change = false;
        Ok(())
    }

    pub fn change_password_with_code(
        &mut self,
        hasher: &PasswordHasher,
        new_password: &str,
        reset_code: &str,
        policy: Option<&str>,
    ) -> AuthResult<()> {
        if reset_code.is_empty() {
            return Err(AuthError::illegal_argument("password reset code is empty"));
        }
        let valid = self
            .password_reset_code
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), reset_code.as_bytes()));
        if !valid {
            return Err(AuthError::forbidden("password reset code is invalid"));
        }
        self.change_password(hasher, new_password, policy)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

impl Credentials {
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<&Session> {
        let token = self.current_session.as_deref()?;
        self.sessions.iter().find(|s| s.access_token() == token)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.current_session().map(Session::access_token)
    }

    pub fn access_token_expires_in(&self, now: DateTime<Utc>) -> u64 {
        self.current_session().map_or(0, |s| s.expires_in(now))
    }

    pub fn has_current_session(&self) -> bool {
        self.current_session().is_some()
    }

    /// Add `session` and make it the current one.
    pub fn set_current_session(&mut self, session: Session) {
        self.current_session = Some(session.access_token().to_string());
        self.sessions.push(session);
    }

    /// Make the existing session carrying `token` the current one.
    pub fn attach_session(&mut self, token: &str) -> AuthResult<()> {
        if self.sessions.iter().any(|s| s.access_token() == token) {
            self.current_session = Some(token.to_string());
            Ok(())
        } else {
            Err(AuthError::InvalidAccessToken)
        }
    }

    pub fn delete_current_session(&mut self) {
        if let Some(token) = self.current_session.take() {
            self.sessions.retain(|s| s.access_token() != token);
        }
    }

    pub fn delete_session(&mut self, token: &str) -> AuthResult<()> {
        let Some(index) = self.sessions.iter().position(|s| s.access_token() == token) else {
            return Err(AuthError::illegal_argument(format!(
                "access token not found in {self}"
            )));
        };
        self.sessions.remove(index);
        if self.current_session.as_deref() == Some(token) {
            self.current_session = None;
        }
        Ok(())
    }

    /// Keep only the `max` most recent sessions.
    pub fn purge_old_sessions(&mut self, max: usize) -> AuthResult<()> {
        if max == 0 {
            return Err(AuthError::illegal_argument(
                "sessions size max should be greater than 0",
            ));
        }
        if self.sessions.len() > max {
            self.sessions.sort_by(Session::recency);
            self.sessions.truncate(max);
            if !self.has_current_session() {
                self.current_session = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn hasher() -> PasswordHasher {
        PasswordHasher::new("salt").with_iterations(16)
    }

    fn with_roles(roles: &[Role]) -> Credentials {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        for role in roles {
            credentials.add_role(role.clone()).unwrap();
        }
        credentials
    }

    fn with_window(enable: Option<Duration>, disable: Option<Duration>) -> Credentials {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        credentials.set_enable_window(enable.map(|d| now() + d), disable.map(|d| now() + d));
        credentials
    }

    #[test]
    fn no_window_is_always_enabled() {
        let credentials = with_window(None, None);
        assert!(credentials.is_really_enabled(now()));
        assert!(credentials.is_really_enabled(now() + Duration::days(3650)));
    }

    #[test]
    fn disabled_flag_wins_over_window() {
        let mut credentials = with_window(None, None);
        credentials.do_enable_or_disable(false);
        assert!(!credentials.is_really_enabled(now()));
        assert!(matches!(
            credentials.check_really_enabled(now()),
            Err(AuthError::DisabledCredentials(_))
        ));
    }

    #[test]
    fn disable_window_before_enable_window() {
        let credentials = with_window(Some(Duration::hours(-1)), Some(Duration::hours(-2)));
        assert!(credentials.is_really_enabled(now()));
        assert!(credentials.is_really_enabled(now() + Duration::days(365)));
        assert!(!credentials.is_really_enabled(now() - Duration::minutes(90)));
    }

    #[test]
    fn enable_window_before_disable_window() {
        let credentials = with_window(Some(Duration::hours(-1)), Some(Duration::hours(1)));
        assert!(credentials.is_really_enabled(now()));
        assert!(!credentials.is_really_enabled(now() + Duration::hours(1)));
        assert!(!credentials.is_really_enabled(now() + Duration::hours(2)));
        assert!(!credentials.is_really_enabled(now() - Duration::hours(2)));
    }

    #[test]
    fn single_bound_windows() {
        let only_enable = with_window(Some(Duration::zero()), None);
        assert!(only_enable.is_really_enabled(now()));
        assert!(!only_enable.is_really_enabled(now() - Duration::seconds(1)));

        let only_disable = with_window(None, Some(Duration::zero()));
        assert!(!only_disable.is_really_enabled(now()));
        assert!(only_disable.is_really_enabled(now() - Duration::seconds(1)));

        let equal = with_window(Some(Duration::zero()), Some(Duration::zero()));
        assert!(!equal.is_really_enabled(now()));
    }

    #[test]
    fn lockout_after_threshold_and_reset_on_enable() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        let window = Duration::minutes(1);

        assert!(!credentials.record_invalid_challenge(now(), 2, window));
        assert!(credentials.is_really_enabled(now()));
        assert!(credentials.record_invalid_challenge(now() + Duration::seconds(10), 2, window));
        assert!(!credentials.is_really_enabled(now()));
        assert_eq!(credentials.invalid_challenges(), 2);

        credentials.do_enable_or_disable(true);
        assert_eq!(credentials.invalid_challenges(), 0);
        assert!(credentials.last_invalid_challenge_at().is_none());
        assert!(credentials.is_really_enabled(now()));
    }

    #[test]
    fn lockout_counter_resets_after_window() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        let window = Duration::minutes(1);

        credentials.record_invalid_challenge(now(), 2, window);
        let later = now() + Duration::minutes(2);
        assert!(!credentials.record_invalid_challenge(later, 2, window));
        assert_eq!(credentials.invalid_challenges(), 1);
        assert_eq!(credentials.last_invalid_challenge_at(), Some(later));
        assert!(credentials.enabled());
    }

    #[test]
    fn huge_reset_window_keeps_counting() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        let window = Duration::try_milliseconds(i64::MAX).unwrap();

        credentials.record_invalid_challenge(now(), 3, window);
        assert!(!credentials.record_invalid_challenge(now() + Duration::days(365), 3, window));
        assert_eq!(credentials.invalid_challenges(), 2);
    }

    #[test]
    fn zero_threshold_disables_lockout() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        for _ in 0..10 {
            assert!(!credentials.record_invalid_challenge(now(), 0, Duration::minutes(1)));
        }
        assert_eq!(credentials.invalid_challenges(), 0);
        assert!(credentials.enabled());
    }

    #[test]
    fn challenge_password() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        assert!(!credentials.challenge_password(&hasher(), "hi fred").unwrap());

        credentials.change_password(&hasher(), "hi fred", None).unwrap();
        let mut reloaded = credentials.clone();
        reloaded.password_challenged = false;
        assert!(matches!(
            reloaded.check_password_has_been_challenged(),
            Err(AuthError::UnchallengedPassword(_))
        ));
        assert!(!reloaded.challenge_password(&hasher(), "hi fredo").unwrap());
        assert!(!reloaded.has_password_been_challenged());
        assert!(reloaded.challenge_password(&hasher(), "hi fred").unwrap());
        assert!(reloaded.check_password_has_been_challenged().is_ok());
    }

    #[test]
    fn change_password_clears_sessions_and_counters() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        credentials.set_current_session(Session::with_token("a", now(), Duration::hours(1)));
        credentials.set_current_session(Session::with_token("b", now(), Duration::hours(1)));
        credentials.record_invalid_challenge(now(), 5, Duration::minutes(1));
        credentials.new_password_reset_code();
        credentials.set_password_must_change(true);

        credentials.change_password(&hasher(), "hi fred", None).unwrap();

        assert!(credentials.sessions().is_empty());
        assert!(!credentials.has_current_session());
        assert_eq!(credentials.invalid_challenges(), 0);
        assert!(credentials.password_reset_code().is_none());
        assert!(!credentials.password_must_change());
        assert!(credentials.has_password_been_challenged());
    }

    #[test]
    fn non_compliant_password_keeps_state() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        credentials.set_current_session(Session::with_token("a", now(), Duration::hours(1)));
        assert!(matches!(
            credentials.change_password(&hasher(), "hi", None),
            Err(AuthError::NonCompliantPassword(_))
        ));
        assert_eq!(credentials.sessions().len(), 1);
    }

    #[test]
    fn change_password_with_code() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        let code = credentials.new_password_reset_code().to_string();

        assert!(matches!(
            credentials.change_password_with_code(&hasher(), "hi fred", "wrong", None),
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            credentials.change_password_with_code(&hasher(), "hi fred", "", None),
            Err(AuthError::IllegalArgument(_))
        ));
        credentials
            .change_password_with_code(&hasher(), "hi fred", &code, None)
            .unwrap();
        assert!(credentials.has_password());

        // single use
        assert!(matches!(
            credentials.change_password_with_code(&hasher(), "hi fred 2", &code, None),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn reset_codes_are_fresh() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        let first = credentials.new_password_reset_code().to_string();
        let second = credentials.new_password_reset_code().to_string();
        assert_ne!(first, second);
        assert_eq!(credentials.password_reset_code(), Some(second.as_str()));
    }

    #[test]
    fn purge_keeps_most_recent_sessions() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        for i in 0..11 {
            credentials.set_current_session(Session::with_token(
                format!("token-{i}"),
                now() + Duration::seconds(i),
                Duration::hours(1),
            ));
        }
        credentials.attach_session("token-0").unwrap();

        credentials.purge_old_sessions(10).unwrap();

        assert_eq!(credentials.sessions().len(), 10);
        assert!(
            credentials
                .sessions()
                .iter()
                .all(|s| s.access_token() != "token-0")
        );
        assert_eq!(credentials.sessions()[0].access_token(), "token-10");
        assert!(!credentials.has_current_session());
        assert!(matches!(
            credentials.attach_session("token-0"),
            Err(AuthError::InvalidAccessToken)
        ));
        assert!(matches!(
            credentials.purge_old_sessions(0),
            Err(AuthError::IllegalArgument(_))
        ));
    }

    #[test]
    fn session_management() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        credentials.set_current_session(Session::with_token("a", now(), Duration::seconds(30)));
        credentials.set_current_session(Session::with_token("b", now(), Duration::seconds(60)));
        assert_eq!(credentials.access_token(), Some("b"));
        assert_eq!(credentials.access_token_expires_in(now()), 60);

        credentials.attach_session("a").unwrap();
        assert_eq!(credentials.access_token_expires_in(now()), 30);

        credentials.delete_current_session();
        assert!(!credentials.has_current_session());
        assert_eq!(credentials.access_token_expires_in(now()), 0);
        assert_eq!(credentials.sessions().len(), 1);

        assert!(matches!(
            credentials.delete_session("a"),
            Err(AuthError::IllegalArgument(_))
        ));
        credentials.delete_session("b").unwrap();
        assert!(credentials.sessions().is_empty());
    }

    #[test]
    fn role_management_rules() {
        let admin = with_roles(&[Role::ADMIN]);
        let superadmin = with_roles(&[Role::SUPERADMIN]);
        let superdog = Credentials::superdog();
        let driver = Role::new("driver");

        assert!(admin.check_can_manage([&driver]).is_ok());
        assert!(admin.check_can_manage([&Role::USER]).is_ok());
        assert!(matches!(
            admin.check_can_manage([&Role::SUPERADMIN]),
            Err(AuthError::InsufficientCredentials(_))
        ));
        assert!(superadmin.can_manage(&Role::ADMIN));
        assert!(!superadmin.can_manage(&Role::SUPERDOG));
        assert!(superdog.can_manage(&Role::SUPERDOG));
        assert!(!admin.can_manage_all([&Role::USER, &Role::SUPERADMIN]));
    }

    #[test]
    fn managing_other_credentials_uses_their_kind() {
        let admin = with_roles(&[Role::ADMIN]);
        let user = with_roles(&[Role::USER]);
        let driver_only = with_roles(&[Role::new("driver")]);
        let superadmin = with_roles(&[Role::SUPERADMIN, Role::USER]);

        assert!(admin.check_can_manage_credentials(&user).is_ok());
        assert!(admin.check_can_manage_credentials(&driver_only).is_ok());
        assert!(user.check_can_manage_credentials(&driver_only).is_err());
        assert!(admin.check_can_manage_credentials(&superadmin).is_err());
    }

    #[test]
    fn kind_and_rank_checks() {
        let user = with_roles(&[Role::USER, Role::new("driver")]);
        assert_eq!(user.kind(), Role::USER);
        assert_eq!(user.to_string(), "[user][fred]");
        assert!(user.check_at_least_user().is_ok());
        assert!(matches!(
            user.check_at_least_admin(),
            Err(AuthError::InsufficientCredentials(_))
        ));
        assert_eq!(Credentials::guest().kind(), Role::GUEST);
        assert!(Credentials::guest().is_guest());
        assert!(Credentials::superdog().check_superdog().is_ok());
        assert!(Credentials::superdog().has_password_been_challenged());
    }

    #[test]
    fn invalid_role_names_are_rejected() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        assert!(matches!(
            credentials.add_role(Role::new("Bad-Role")),
            Err(AuthError::IllegalArgument(_))
        ));
        assert!(credentials.roles().is_empty());
    }

    #[test]
    fn role_access_with_wildcard() {
        let user = with_roles(&[Role::USER]);
        assert!(user.check_role_access([&Role::ALL]).is_ok());
        assert!(user.check_role_access([&Role::ADMIN, &Role::USER]).is_ok());
        assert!(user.check_role_access([&Role::ADMIN]).is_err());
        assert!(user.check_role_access(&[] as &[Role]).is_err());
    }

    #[test]
    fn tags_group_and_ownership() {
        let mut credentials = Credentials::new(CredentialsId::from("fred-id"), "fred");
        credentials.add_tag("team", "blue");
        credentials.add_tag("team", "red");
        credentials.add_tag("level", 3);
        assert_eq!(
            credentials.tag_values("team"),
            BTreeSet::from(["blue", "red"])
        );
        credentials.remove_tags("team");
        assert!(credentials.tag_values("team").is_empty());
        assert_eq!(credentials.tags().len(), 1);

        assert_eq!(credentials.group(), "fred-id");
        credentials.set_group(Some("sales".to_string()));
        assert_eq!(credentials.group(), "sales");

        assert!(credentials.check_owner_access("fred-id", "message", "m1").is_ok());
        assert!(matches!(
            credentials.check_owner_access("vince-id", "message", "m1"),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn brand_new_until_first_update() {
        let mut credentials = Credentials::new(CredentialsId::new(), "fred");
        assert!(credentials.is_brand_new());
        credentials.mark_created(now());
        assert!(credentials.is_brand_new());
        credentials.touch(now() + Duration::seconds(1));
        assert!(!credentials.is_brand_new());
    }
}
