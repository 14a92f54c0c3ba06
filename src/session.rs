//! Session lifecycle for the current user.
//!
//! DESIGN
//! ======
//! `SessionManager` is constructed explicitly and handed to whatever needs
//! it; there is no process-wide auth singleton. It owns three things:
//! the credential (mirrored to the durable store), the derived session view,
//! and the favorites/profile caches.
//!
//! STATE MACHINE
//! =============
//! `Loading → {LoggedOut, LoggedIn}` once, in `initialize()`.
//! `LoggedIn → LoggedOut` on logout or refresh failure.
//! `LoggedOut → LoggedIn` on login.
//!
//! FAILURE POLICY
//! ==============
//! Fails closed. A malformed credential, a failed refresh, or any network
//! failure while restoring the session ends in `LoggedOut`. Logout itself
//! never fails locally; the backend notification is best effort.
//!
//! A 401 on an authenticated call refreshes once and retries once. A second
//! 401 after a successful refresh logs out. Refresh never recurses.
//!
//! FAVORITES
//! =========
//! The favorite set trusts the backend's mutation response: a toggle applies
//! the added/removed flag the backend reports, and full refreshes replace the
//! set wholesale. It never re-fetches after a toggle and never merges.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::api::Backend;
use crate::api::http::bearer_header;
use crate::api::types::{Profile, ProfileUpdate};
use crate::credential::{Claims, Credential, UserRef, unix_now};
use crate::error::ClientError;
use crate::storage::{CREDENTIAL_KEY, CredentialStore};

/// Run an authenticated backend call with the current bearer token,
/// recovering once from a 401 via refresh.
///
/// The plain form fails with `NotLoggedIn` when there is no session; the
/// `optional` form sends the call anonymously instead, including after a
/// rejected token whose refresh failed.
macro_rules! authorized {
    ($session:ident, optional $bearer:ident => $call:expr) => {{
        let $bearer = $session.credential.as_ref().map(|c| c.token.clone());
        let had_token = $bearer.is_some();
        let first = $call.await;
        match first {
            Err(err) if had_token && err.is_auth_failure() => {
                // A failed refresh has logged out, so the retry goes anonymously.
                let refreshed = $session.recover_from_auth_failure(err).await.is_ok();
                let $bearer = $session.credential.as_ref().map(|c| c.token.clone());
                let retried = $call.await;
                if refreshed { $session.fail_closed_on_auth(retried).await } else { retried }
            }
            other => other,
        }
    }};
    ($session:ident, $bearer:ident => $call:expr) => {{
        let $bearer = $session.bearer_token()?;
        let first = $call.await;
        match first {
            Err(err) if err.is_auth_failure() => {
                $session.recover_from_auth_failure(err).await?;
                let $bearer = $session.bearer_token()?;
                let retried = $call.await;
                $session.fail_closed_on_auth(retried).await
            }
            other => other,
        }
    }};
}

#[path = "session_recipes.rs"]
mod session_recipes;

pub use session_recipes::MAX_IMAGE_BYTES;

// =============================================================================
// SESSION VIEW
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    LoggedOut,
    LoggedIn,
}

/// Derived, read-only view of the login state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub current_user: Option<UserRef>,
    pub is_loading: bool,
}

impl Session {
    #[must_use]
    pub fn state(&self) -> SessionState {
        match (&self.current_user, self.is_loading) {
            (_, true) => SessionState::Loading,
            (Some(_), false) => SessionState::LoggedIn,
            (None, false) => SessionState::LoggedOut,
        }
    }
}

// =============================================================================
// MANAGER
// =============================================================================

pub struct SessionManager<B, S> {
    backend: B,
    store: S,
    credential: Option<Credential>,
    user: Option<UserRef>,
    loading: bool,
    favorites: BTreeSet<String>,
    profile: Option<Profile>,
    fetch_profile_on_init: bool,
}

impl<B: Backend, S: CredentialStore> SessionManager<B, S> {
    /// A manager in the `Loading` state. Call [`Self::initialize`] next.
    #[must_use]
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            credential: None,
            user: None,
            loading: true,
            favorites: BTreeSet::new(),
            profile: None,
            fetch_profile_on_init: true,
        }
    }

    /// Whether `initialize()` fetches the profile after restoring a session.
    #[must_use]
    pub fn with_profile_fetch(mut self, enabled: bool) -> Self {
        self.fetch_profile_on_init = enabled;
        self
    }

    #[must_use]
    pub fn session(&self) -> Session {
        Session { current_user: self.user.clone(), is_loading: self.loading }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session().state()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&UserRef> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn favorites(&self) -> &BTreeSet<String> {
        &self.favorites
    }

    #[must_use]
    pub fn is_favorite(&self, recipe_id: &str) -> bool {
        self.favorites.contains(recipe_id)
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// `Authorization` header value for the current credential, or `None`
    /// when logged out.
    #[must_use]
    pub fn auth_header(&self) -> Option<String> {
        self.credential.as_ref().map(|c| bearer_header(&c.token))
    }

    pub(crate) fn bearer_token(&self) -> Result<String, ClientError> {
        self.credential
            .as_ref()
            .map(|c| c.token.clone())
            .ok_or(ClientError::NotLoggedIn)
    }

    // -------------------------------------------------------------------------
    // lifecycle
    // -------------------------------------------------------------------------

    /// Restore the session from durable storage.
    ///
    /// Only the first call does any work; later calls return the current view.
    pub async fn initialize(&mut self) -> Session {
        if !self.loading {
            return self.session();
        }
        self.restore().await;
        self.loading = false;
        let session = self.session();
        tracing::info!(state = ?session.state(), "session initialized");
        session
    }

    async fn restore(&mut self) {
        let raw = match self.store.get(CREDENTIAL_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("no stored credential");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "credential store unreadable; starting logged out");
                self.logout().await;
                return;
            }
        };

        let parsed = Credential::from_stored(&raw).and_then(|c| c.claims().map(|claims| (c, claims)));
        let (credential, claims) = match parsed {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "stored credential is malformed");
                self.logout().await;
                return;
            }
        };

        if claims.is_expired(unix_now()) {
            tracing::info!(exp = claims.exp, "stored credential expired; refreshing");
            let snapshot = credential.user.clone();
            if let Err(err) = self.refresh_with_snapshot(snapshot).await {
                tracing::info!(error = %err, "could not refresh expired credential");
            }
            return;
        }

        if let Err(err) = self.adopt(credential, &claims) {
            tracing::warn!(error = %err, "stored credential rejected");
            self.logout().await;
            return;
        }

        if self.fetch_profile_on_init {
            if let Err(err) = self.fetch_profile().await {
                tracing::warn!(error = %err, "profile fetch failed during restore");
                if self.is_logged_in() {
                    self.logout().await;
                }
            }
        }
    }

    /// Store a credential the caller already obtained and switch to `LoggedIn`.
    ///
    /// No network round trip.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedCredential`] for a token that cannot be
    /// decoded or does not name a user, or [`ClientError::Storage`] if it
    /// cannot be persisted. The session is unchanged on error.
    pub fn login(&mut self, credential: Credential) -> Result<Session, ClientError> {
        let claims = credential.claims()?;
        let user = resolve_user(&credential, &claims)?;
        self.store.set(CREDENTIAL_KEY, &credential.to_stored()?)?;

        if self.user.as_ref().map(|u| u.id.as_str()) != Some(user.id.as_str()) {
            self.favorites.clear();
            self.profile = None;
        }
        tracing::info!(user_id = %user.id, "logged in");
        self.credential = Some(credential);
        self.user = Some(user);
        self.loading = false;
        Ok(self.session())
    }

    /// Authenticate with email and password, then [`Self::login`].
    ///
    /// # Errors
    ///
    /// Backend errors are returned as-is; a response without a token is a
    /// [`ClientError::Decode`].
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Session, ClientError> {
        let resp = self.backend.login(email.trim(), password).await?;
        let credential = resp
            .credential()
            .ok_or_else(|| ClientError::Decode("login response carried no token".into()))?;
        self.login(credential)
    }

    /// Create an account and return the registered user. Logs in when the
    /// backend hands back a token; otherwise the session stays as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for blank fields before any request,
    /// and backend errors as-is.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<UserRef, ClientError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ClientError::validation("name, email, and password are required"));
        }
        let resp = self.backend.register(name, email, password).await?;
        match resp.credential() {
            Some(credential) => {
                self.login(credential)?;
            }
            None => tracing::info!(user_id = %resp.id(), "registered; login required"),
        }
        Ok(resp.user())
    }

    /// Exchange the refresh cookie for a new token.
    ///
    /// On failure the session is logged out before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or [`ClientError::MalformedCredential`] if
    /// the new token is undecodable or already expired.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let snapshot = self.credential.as_ref().and_then(|c| c.user.clone());
        self.refresh_with_snapshot(snapshot).await
    }

    async fn refresh_with_snapshot(&mut self, snapshot: Option<UserRef>) -> Result<(), ClientError> {
        match self.try_refresh(snapshot).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed; logging out");
                self.logout().await;
                Err(err)
            }
        }
    }

    async fn try_refresh(&mut self, snapshot: Option<UserRef>) -> Result<(), ClientError> {
        let resp = self.backend.refresh().await?;
        let mut credential = Credential::new(resp.token, snapshot);
        let claims = credential.claims()?;
        if claims.is_expired(unix_now()) {
            return Err(ClientError::MalformedCredential("refreshed token is already expired".into()));
        }
        // A snapshot for someone else is stale; fall back to the claims.
        if let (Some(user), Some(id)) = (&credential.user, claims.user_id()) {
            if user.id != id {
                credential.user = None;
            }
        }
        let user = resolve_user(&credential, &claims)?;
        self.store.set(CREDENTIAL_KEY, &credential.to_stored()?)?;
        if self.user.as_ref().map(|u| u.id.as_str()) != Some(user.id.as_str()) {
            self.favorites.clear();
            self.profile = None;
        }
        tracing::debug!(user_id = %user.id, exp = claims.exp, "credential refreshed");
        self.credential = Some(credential);
        self.user = Some(user);
        Ok(())
    }

    /// End the session. Always succeeds locally.
    pub async fn logout(&mut self) {
        let bearer = self.credential.as_ref().map(|c| c.token.clone());
        let user_id = self.user.as_ref().map(|u| u.id.clone());

        self.credential = None;
        self.user = None;
        self.favorites.clear();
        self.profile = None;
        if let Err(err) = self.store.remove(CREDENTIAL_KEY) {
            tracing::warn!(error = %err, "could not clear stored credential");
        }

        if let Err(err) = self.backend.logout(bearer.as_deref()).await {
            tracing::debug!(error = %err, "backend logout failed; ignored");
        }
        if let Some(user_id) = user_id {
            tracing::info!(%user_id, "logged out");
        }
    }

    fn adopt(&mut self, credential: Credential, claims: &Claims) -> Result<(), ClientError> {
        let user = resolve_user(&credential, claims)?;
        tracing::debug!(user_id = %user.id, exp = claims.exp, "credential adopted");
        self.credential = Some(credential);
        self.user = Some(user);
        Ok(())
    }

    /// Handle a 401 from an authenticated call: refresh, or report the
    /// original error if the refresh fails (which already logged out).
    pub(crate) async fn recover_from_auth_failure(&mut self, err: ClientError) -> Result<(), ClientError> {
        tracing::debug!(error = %err, "credential rejected; attempting refresh");
        match self.refresh().await {
            Ok(()) => Ok(()),
            Err(_) => Err(err),
        }
    }

    /// A 401 right after a successful refresh means the backend will not take
    /// any token we can get; stop trying.
    pub(crate) async fn fail_closed_on_auth<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(err) = &result {
            if err.is_auth_failure() {
                tracing::warn!(error = %err, "refreshed credential rejected; logging out");
                self.logout().await;
            }
        }
        result
    }

    // -------------------------------------------------------------------------
    // profile + favorites
    // -------------------------------------------------------------------------

    /// Fetch the current user's profile, caching it and replacing the
    /// favorite set with the profile's favorites.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn fetch_profile(&mut self) -> Result<&Profile, ClientError> {
        let profile = authorized!(self, bearer => self.backend.profile(&bearer))?;
        Ok(self.apply_profile(profile))
    }

    /// The cached profile, fetching it only when nothing is cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn profile_or_fetch(&mut self) -> Result<&Profile, ClientError> {
        if self.profile.is_none() {
            return self.fetch_profile().await;
        }
        self.profile.as_ref().ok_or(ClientError::NotLoggedIn)
    }

    /// Change the current user's name, email, or password, then re-read the
    /// profile so the cache and user snapshot reflect the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when every field is blank (nothing
    /// is sent), [`ClientError::NotLoggedIn`] without a session, or the
    /// backend error.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&Profile, ClientError> {
        let update = update.normalized();
        if update.is_empty() {
            return Err(ClientError::validation("profile update has no fields"));
        }
        authorized!(self, bearer => self.backend.update_profile(&bearer, &update))?;
        tracing::info!(
            name = update.name.is_some(),
            email = update.email.is_some(),
            password = update.password.is_some(),
            "profile updated"
        );
        self.fetch_profile().await
    }

    fn apply_profile(&mut self, profile: Profile) -> &Profile {
        self.favorites = profile.favorite_ids().into_iter().collect();
        if let Some(user) = self.user.as_mut().filter(|u| u.id == profile.id()) {
            if profile.name.is_some() {
                user.name.clone_from(&profile.name);
            }
            if profile.email.is_some() {
                user.email.clone_from(&profile.email);
            }
        }
        self.profile.insert(profile)
    }

    /// Replace the favorite set with the backend's current list.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn refresh_favorites(&mut self) -> Result<&BTreeSet<String>, ClientError> {
        let ids = authorized!(self, bearer => self.backend.list_favorites(&bearer))?;
        self.favorites = ids.into_iter().collect();
        tracing::debug!(count = self.favorites.len(), "favorites refreshed");
        Ok(&self.favorites)
    }

    /// Toggle a favorite and apply the backend's verdict. Returns `true` when
    /// the recipe is now a favorite.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] without a session, or the backend error.
    pub async fn toggle_favorite(&mut self, recipe_id: &str) -> Result<bool, ClientError> {
        let toggle = authorized!(self, bearer => self.backend.toggle_favorite(&bearer, recipe_id))?;
        if toggle.added {
            self.favorites.insert(recipe_id.to_owned());
        } else {
            self.favorites.remove(recipe_id);
        }
        tracing::debug!(%recipe_id, added = toggle.added, "favorite toggled");
        Ok(toggle.added)
    }
}

fn resolve_user(credential: &Credential, claims: &Claims) -> Result<UserRef, ClientError> {
    credential
        .user_ref(claims)
        .ok_or_else(|| ClientError::MalformedCredential("token does not name a user".into()))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
