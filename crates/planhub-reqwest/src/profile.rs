//! Profile CRUD scoped to the current session.

use std::fmt;
use std::sync::Arc;

use planhub_core::{AuthCoordinator, Error, Profile, ProfileUpdate, Result};

use crate::client::ApiClient;

/// Tracing target for profile operations.
pub const TRACING_TARGET: &str = "planhub_reqwest::profile";

/// Profile reads and updates for the authenticated user.
///
/// Depends on the coordinator only for "am I logged in" and the cached
/// identity; every operation fails with `NotSignedIn` before touching
/// the network when no session exists. The route guard should normally
/// have prevented that case.
#[derive(Clone)]
pub struct ProfileService {
    client: ApiClient,
    coordinator: Arc<AuthCoordinator>,
}

impl fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileService").finish_non_exhaustive()
    }
}

impl ProfileService {
    /// Creates a profile service over the given client and coordinator.
    pub fn new(client: ApiClient, coordinator: Arc<AuthCoordinator>) -> Self {
        Self {
            client,
            coordinator,
        }
    }

    /// Gets the current user's profile.
    ///
    /// Uses the cached identity for the id when a session exists;
    /// otherwise attempts a single session refresh before giving up with
    /// `NotSignedIn`.
    pub async fn get(&self) -> Result<Profile> {
        let identity = match self.coordinator.current_identity() {
            Some(identity) => identity,
            None => {
                self.coordinator
                    .refresh_session()
                    .await
                    .map_err(|e| Error::not_signed_in().with_source(e))?;
                self.coordinator
                    .current_identity()
                    .ok_or_else(Error::not_signed_in)?
            }
        };
        self.fetch(&identity.id).await
    }

    /// Fetches a profile by id (e.g. a subject decoded from a token).
    pub async fn fetch(&self, id: &str) -> Result<Profile> {
        self.client.get_json(&["profiles", id]).await
    }

    /// Upserts the authenticated user's profile.
    ///
    /// The backend resolves the target profile from the request
    /// credential, never from a client-supplied id.
    pub async fn update(&self, update: &ProfileUpdate) -> Result<Profile> {
        if !self.coordinator.is_logged_in() {
            return Err(Error::not_signed_in());
        }
        tracing::debug!(target: TRACING_TARGET, "Upserting profile");
        self.client.post_json(&["profiles", "sync"], update).await
    }
}
