//! # Owner Provider
//!
//! Who the remote documents belong to. Without an owner the coordinator
//! leaves records pending and does no remote work.

use std::fmt::Debug;
use std::sync::RwLock;

/// Supplies the current owner (signed-in account) id.
pub trait OwnerProvider: Send + Sync + Debug {
    fn current_owner(&self) -> Option<String>;
}

/// Owner fixed at construction, typically from `[owner] id`.
#[derive(Debug, Clone, Default)]
pub struct StaticOwner(Option<String>);

impl StaticOwner {
    pub fn new(owner_id: Option<String>) -> Self {
        StaticOwner(owner_id.filter(|id| !id.trim().is_empty()))
    }
}

impl OwnerProvider for StaticOwner {
    fn current_owner(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Owner that changes as a session signs in and out.
#[derive(Debug, Default)]
pub struct SessionOwner {
    current: RwLock<Option<String>>,
}

impl SessionOwner {
    pub fn new() -> Self {
        SessionOwner::default()
    }

    pub fn sign_in(&self, owner_id: impl Into<String>) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = Some(owner_id.into());
    }

    pub fn sign_out(&self) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

impl OwnerProvider for SessionOwner {
    fn current_owner(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_owner_ignores_blank_ids() {
        assert_eq!(StaticOwner::new(Some("o-1".into())).current_owner().as_deref(), Some("o-1"));
        assert!(StaticOwner::new(Some("  ".into())).current_owner().is_none());
        assert!(StaticOwner::new(None).current_owner().is_none());
    }

    #[test]
    fn test_session_owner() {
        let session = SessionOwner::new();
        assert!(session.current_owner().is_none());
        session.sign_in("o-2");
        assert_eq!(session.current_owner().as_deref(), Some("o-2"));
        session.sign_out();
        assert!(session.current_owner().is_none());
    }
}
