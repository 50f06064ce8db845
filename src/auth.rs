//! Sign-in state and the capability guard used by interactive widgets.

/// Snapshot of who is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_signed_in: bool,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
}

/// Proof that the user was signed in when an interaction started.
///
/// Only [`AuthState::gate`] constructs it, so a handler that takes a
/// `SignedIn` cannot be reached by a signed-out user.
#[derive(Debug, Clone, Copy)]
pub struct SignedIn {
    _private: (),
}

impl AuthState {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn gate(&self) -> Option<SignedIn> {
        self.is_signed_in.then_some(SignedIn { _private: () })
    }
}

/// Anything that can answer "is the user signed in" and change the answer.
///
/// Each action returns the resulting `is_signed_in` flag.
pub trait AuthProvider {
    fn state(&self) -> &AuthState;
    fn refresh_auth(&mut self) -> anyhow::Result<bool>;
    fn sign_in(&mut self) -> anyhow::Result<bool>;
    fn sign_out(&mut self) -> anyhow::Result<bool>;
}

/// In-process provider: signing in creates a guest identity for the session.
#[derive(Debug, Default)]
pub struct LocalAuth {
    state: AuthState,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthProvider for LocalAuth {
    fn state(&self) -> &AuthState {
        &self.state
    }

    fn refresh_auth(&mut self) -> anyhow::Result<bool> {
        Ok(self.state.is_signed_in)
    }

    fn sign_in(&mut self) -> anyhow::Result<bool> {
        if !self.state.is_signed_in {
            let user_id = uuid::Uuid::new_v4().to_string();
            log::info!("Signed in as guest {user_id}");
            self.state = AuthState {
                is_signed_in: true,
                user_name: Some("guest".to_owned()),
                user_id: Some(user_id),
            };
        }
        Ok(true)
    }

    fn sign_out(&mut self) -> anyhow::Result<bool> {
        if self.state.is_signed_in {
            log::info!("Signed out");
        }
        self.state = AuthState::signed_out();
        Ok(false)
    }
}
