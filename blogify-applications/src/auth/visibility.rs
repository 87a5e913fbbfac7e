//! Resource visibility policy
//!
//! Pure decisions over an `OwnershipFact` snapshot. Admin bypass is not part of
//! this module; admin routes call their own explicit operations.

use blogify_core::OwnershipFact;

use super::identity::IdentityClaim;
use crate::error::AccessError;
use crate::posts::filter::{PostFilter, SearchTerm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotYourDraft,
    NotOwner,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NotYourDraft => "not_your_draft",
            DenyReason::NotOwner => "not_owner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// HTTP-style status for the decision
    pub fn http_status(&self) -> u16 {
        match self {
            Decision::Allow => 200,
            Decision::Deny(_) => 403,
        }
    }

    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::NotYourDraft) => Err(AccessError::VisibilityViolation),
            Decision::Deny(DenyReason::NotOwner) => Err(AccessError::OwnershipViolation),
        }
    }
}

/// Published resources are readable by anyone; drafts only by their owner
pub fn can_read(identity: Option<&IdentityClaim>, fact: &OwnershipFact) -> Decision {
    if fact.is_published {
        return Decision::Allow;
    }
    match identity {
        Some(claim) if claim.is_subject(&fact.owner_id) => Decision::Allow,
        _ => Decision::Deny(DenyReason::NotYourDraft),
    }
}

/// Only the owner may mutate, whatever the publication state
pub fn can_mutate(identity: &IdentityClaim, fact: &OwnershipFact) -> Decision {
    if identity.is_subject(&fact.owner_id) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NotOwner)
    }
}

/// Filter applied to collection listings.
///
/// Anonymous callers are always scoped to published posts, and that scope
/// wraps the whole search disjunction.
pub fn listing_filter(identity: Option<&IdentityClaim>, search: Option<SearchTerm>) -> PostFilter {
    let search = search.map(|term| {
        PostFilter::Or(vec![
            PostFilter::TitleMatches(term.clone()),
            PostFilter::ContentMatches(term.clone()),
            PostFilter::TagMatches(term),
        ])
    });

    match (identity, search) {
        (None, None) => PostFilter::Published,
        (None, Some(search)) => PostFilter::And(vec![PostFilter::Published, search]),
        (Some(_), None) => PostFilter::All,
        (Some(_), Some(search)) => search,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogify_core::UserId;

    fn claim(id: &str) -> IdentityClaim {
        IdentityClaim::verified(UserId::from(id))
    }

    fn fact(owner: &str, published: bool) -> OwnershipFact {
        OwnershipFact::new(UserId::from(owner), published)
    }

    #[test]
    fn anonymous_reads() {
        assert_eq!(
            can_read(None, &fact("u", false)),
            Decision::Deny(DenyReason::NotYourDraft)
        );
        assert_eq!(can_read(None, &fact("u", true)), Decision::Allow);
    }

    #[test]
    fn owner_reads_own_draft() {
        assert_eq!(can_read(Some(&claim("u")), &fact("u", false)), Decision::Allow);
        assert_eq!(
            can_read(Some(&claim("v")), &fact("u", false)),
            Decision::Deny(DenyReason::NotYourDraft)
        );
        assert_eq!(can_read(Some(&claim("v")), &fact("u", true)), Decision::Allow);
    }

    #[test]
    fn only_owner_mutates() {
        for published in [true, false] {
            assert_eq!(
                can_mutate(&claim("a"), &fact("b", published)),
                Decision::Deny(DenyReason::NotOwner)
            );
            assert_eq!(can_mutate(&claim("b"), &fact("b", published)), Decision::Allow);
        }
    }

    #[test]
    fn admin_role_does_not_bypass_mutation() {
        let admin = claim("root").with_role(blogify_core::Role::Admin);
        assert!(!can_mutate(&admin, &fact("b", true)).is_allowed());
    }

    #[test]
    fn decisions_map_to_distinct_errors() {
        assert_eq!(
            Decision::Deny(DenyReason::NotYourDraft).into_result(),
            Err(AccessError::VisibilityViolation)
        );
        assert_eq!(
            Decision::Deny(DenyReason::NotOwner).into_result(),
            Err(AccessError::OwnershipViolation)
        );
        assert_eq!(Decision::Deny(DenyReason::NotOwner).http_status(), 403);
    }

    #[test]
    fn listing_filter_shapes() {
        let term = || SearchTerm::parse("api");

        assert_eq!(listing_filter(None, None), PostFilter::Published);
        assert_eq!(listing_filter(Some(&claim("u")), None), PostFilter::All);

        match listing_filter(None, term()) {
            PostFilter::And(parts) => {
                assert_eq!(parts[0], PostFilter::Published);
                assert!(matches!(&parts[1], PostFilter::Or(clauses) if clauses.len() == 3));
            }
            other => panic!("unexpected filter {:?}", other),
        }

        assert!(matches!(
            listing_filter(Some(&claim("u")), term()),
            PostFilter::Or(_)
        ));
    }
}
