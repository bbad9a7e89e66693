//! Login, logout and token refresh.

use crate::config::SettingsExt;
use crate::context::SyncContext;
use crate::error::SyncResult;
use crate::notify::StatusLevel;
use hcsync_protocol::{LoginRequest, RecordType};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What [`Session::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new token pair was stored.
    Refreshed,
    /// No refresh token is stored; nothing was done.
    NoRefreshToken,
}

/// Session routines. Credentials are written only here.
#[derive(Debug, Clone)]
pub struct Session {
    ctx: SyncContext,
}

impl Session {
    /// Creates the session routines.
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Returns true if an access token is stored.
    pub fn is_logged_in(&self) -> SyncResult<bool> {
        Ok(self.ctx.settings.load_settings()?.credentials.is_logged_in())
    }

    /// Logs in and stores the issued tokens.
    ///
    /// After a successful login the store's granted permissions are checked
    /// and a status is raised if any are missing. Missing permissions do not
    /// fail the login.
    ///
    /// # Errors
    ///
    /// Returns the server or network error; nothing is stored in that case.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        fcm_token: Option<String>,
    ) -> SyncResult<()> {
        let settings = self.ctx.settings.load_settings()?;
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            fcm_token,
        };

        self.ctx.notifier.status(StatusLevel::Info, "Logging in...");
        let tokens = match self.ctx.remote(&settings.base_url).login(&request).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(username, error = %e, "login failed");
                self.ctx
                    .notifier
                    .status(StatusLevel::Error, &format!("Login failed: {e}"));
                return Err(e);
            }
        };

        self.ctx.settings.save_tokens(&tokens)?;
        info!(username, "logged in");
        self.ctx
            .notifier
            .status(StatusLevel::Success, "Logged in successfully");

        self.check_permissions();
        Ok(())
    }

    /// Revokes and forgets the stored tokens.
    ///
    /// Revocation is best-effort; a failure is only logged.
    pub async fn logout(&self) -> SyncResult<()> {
        let settings = self.ctx.settings.load_settings()?;
        if let Some(token) = &settings.credentials.access_token {
            if let Err(e) = self.ctx.remote(&settings.base_url).revoke(token).await {
                warn!(error = %e, "token revocation failed");
            }
        }

        self.ctx.settings.clear_credentials()?;
        info!("logged out");
        self.ctx
            .notifier
            .status(StatusLevel::Success, "Logged out successfully");
        Ok(())
    }

    /// Exchanges the stored refresh token for a new pair.
    ///
    /// # Errors
    ///
    /// Any failure clears both stored tokens, logging the user out, and is
    /// then returned.
    pub async fn refresh(&self) -> SyncResult<RefreshOutcome> {
        let settings = self.ctx.settings.load_settings()?;
        let Some(refresh_token) = settings.credentials.refresh_token else {
            debug!("no refresh token stored");
            return Ok(RefreshOutcome::NoRefreshToken);
        };

        match self
            .ctx
            .remote(&settings.base_url)
            .refresh(&refresh_token)
            .await
        {
            Ok(tokens) => {
                self.ctx.settings.save_tokens(&tokens)?;
                info!(expiry = tokens.expiry.as_deref().unwrap_or("unknown"), "token refreshed");
                self.ctx
                    .notifier
                    .status(StatusLevel::Success, "Refreshed token");
                Ok(RefreshOutcome::Refreshed)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, logging out");
                self.ctx.settings.clear_credentials()?;
                self.ctx
                    .notifier
                    .status(StatusLevel::Error, &format!("Token refresh failed: {e}"));
                Err(e)
            }
        }
    }

    fn check_permissions(&self) {
        let granted: HashSet<_> = match self.ctx.store.granted_permissions() {
            Ok(granted) => granted.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "could not read granted permissions");
                return;
            }
        };

        let missing = RecordType::all_permissions()
            .into_iter()
            .filter(|p| !granted.contains(p))
            .count();
        if missing > 0 {
            warn!(missing, "health permissions not granted");
            self.ctx
                .notifier
                .status(StatusLevel::Error, "Permissions not granted");
        }
    }
}
