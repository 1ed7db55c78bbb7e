//! Identifier classification and user resolution.
//!
//! Maps a phone number, email, or opaque identifier to a canonical user
//! record, creating one when permitted. Resolution failures are never
//! fatal: the pipeline continues with the raw identifier standing in for
//! the user id so the call is still archived.

use std::sync::Arc;

use chrono::Utc;

use dg_datastore::DataStore;
use dg_domain::error::{Error, Result};
use dg_domain::record::UserProfile;
use dg_domain::trace::TraceEvent;

// ── Identifier classification ────────────────────────────────────────

/// How an inbound identifier was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Phone,
    Opaque,
}

impl IdentifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Opaque => "opaque",
        }
    }
}

/// Classify an identifier. Email wins over phone when both could match
/// (`@` is unambiguous; `-` and digits are not).
pub fn classify(identifier: &str) -> IdentifierKind {
    if identifier.contains('@') {
        IdentifierKind::Email
    } else if identifier.contains('+')
        || identifier.contains('-')
        || identifier.contains('(')
        || identifier.chars().any(|c| c.is_ascii_digit())
    {
        IdentifierKind::Phone
    } else {
        IdentifierKind::Opaque
    }
}

// ── Resolver ─────────────────────────────────────────────────────────

/// The outcome of a resolution attempt.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    /// Canonical user id, or the raw identifier when lookup failed or no
    /// profile exists and creation is disabled.
    pub user_id: String,
    /// The profile, when one was found or created.
    pub profile: Option<UserProfile>,
    pub created: bool,
}

pub struct IdentityResolver {
    store: Arc<dyn DataStore>,
    create_missing: bool,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn DataStore>, create_missing: bool) -> Self {
        Self {
            store,
            create_missing,
        }
    }

    /// Resolve an identifier to a user.
    ///
    /// Idempotent: the same phone or email always lands on the same
    /// profile. A store failure degrades to [`Error::Lookup`] handling —
    /// the raw identifier is returned as the user id.
    pub async fn resolve(&self, identifier: &str) -> ResolvedIdentity {
        match self.try_resolve(identifier).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(identifier, error = %e, "identity lookup failed; continuing with raw identifier");
                ResolvedIdentity {
                    user_id: identifier.to_owned(),
                    profile: None,
                    created: false,
                }
            }
        }
    }

    async fn try_resolve(&self, identifier: &str) -> Result<ResolvedIdentity> {
        let kind = classify(identifier);
        let existing = match kind {
            IdentifierKind::Email => self
                .store
                .find_user_by_email(identifier)
                .await
                .map_err(|e| Error::Lookup(e.to_string()))?,
            IdentifierKind::Phone => self
                .store
                .find_user_by_phone(identifier)
                .await
                .map_err(|e| Error::Lookup(e.to_string()))?,
            IdentifierKind::Opaque => self
                .store
                .get_user(identifier)
                .await
                .map_err(|e| Error::Lookup(e.to_string()))?,
        };

        if let Some(profile) = existing {
            let resolved = ResolvedIdentity {
                user_id: profile.id.clone(),
                profile: Some(profile),
                created: false,
            };
            self.trace(kind, &resolved);
            return Ok(resolved);
        }

        if !self.create_missing {
            let resolved = ResolvedIdentity {
                user_id: identifier.to_owned(),
                profile: None,
                created: false,
            };
            self.trace(kind, &resolved);
            return Ok(resolved);
        }

        let mut profile = UserProfile {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        match kind {
            IdentifierKind::Email => profile.customer_email = Some(identifier.to_owned()),
            IdentifierKind::Phone => profile.customer_phone = Some(identifier.to_owned()),
            IdentifierKind::Opaque => profile.id = identifier.to_owned(),
        }
        let profile = self
            .store
            .create_user(profile)
            .await
            .map_err(|e| Error::Lookup(e.to_string()))?;

        let resolved = ResolvedIdentity {
            user_id: profile.id.clone(),
            profile: Some(profile),
            created: true,
        };
        self.trace(kind, &resolved);
        Ok(resolved)
    }

    fn trace(&self, kind: IdentifierKind, resolved: &ResolvedIdentity) {
        TraceEvent::IdentityResolved {
            identifier_kind: kind.as_str().into(),
            user_id: resolved.user_id.clone(),
            created: resolved.created,
        }
        .emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_datastore::MemoryStore;

    #[test]
    fn classification_prefers_email() {
        assert_eq!(classify("jane@acme.com"), IdentifierKind::Email);
        assert_eq!(classify("+1-555-123-4567"), IdentifierKind::Phone);
        assert_eq!(classify("(555) 123 4567"), IdentifierKind::Phone);
        assert_eq!(classify("user-abc"), IdentifierKind::Phone); // dash
        assert_eq!(classify("opaque"), IdentifierKind::Opaque);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store, true);

        let first = resolver.resolve("jane@acme.com").await;
        assert!(first.created);
        let second = resolver.resolve("jane@acme.com").await;
        assert!(!second.created);
        assert_eq!(first.user_id, second.user_id);
    }

    #[tokio::test]
    async fn phone_resolution_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store, true);

        let first = resolver.resolve("+15551234567").await;
        let second = resolver.resolve("+15551234567").await;
        assert_eq!(first.user_id, second.user_id);
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_raw_identifier() {
        let store = Arc::new(MemoryStore::new());
        store.fail_op("find_user_by_email");
        let resolver = IdentityResolver::new(store, true);

        let resolved = resolver.resolve("jane@acme.com").await;
        assert_eq!(resolved.user_id, "jane@acme.com");
        assert!(resolved.profile.is_none());
    }

    #[tokio::test]
    async fn creation_disabled_returns_raw_identifier() {
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store, false);

        let resolved = resolver.resolve("jane@acme.com").await;
        assert_eq!(resolved.user_id, "jane@acme.com");
        assert!(!resolved.created);
    }
}
