//! # Authorization Guard
//!
//! Pure predicates deciding whether an identity may write. Callers turn a
//! denial into a redirect: login for `DenyUnauthenticated`, back to the
//! resource for `DenyForbidden`.

use crate::models::{Identity, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    DenyUnauthenticated,
    DenyForbidden,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allowed
    }
}

fn authenticated(identity: &Identity) -> Decision {
    if identity.is_authenticated() {
        Decision::Allowed
    } else {
        Decision::DenyUnauthenticated
    }
}

pub fn can_create(identity: &Identity) -> Decision {
    authenticated(identity)
}

/// Only the owning author may modify a post. Anonymous callers are never
/// reported as forbidden.
pub fn can_modify(identity: &Identity, post: &Post) -> Decision {
    match identity.author() {
        None => Decision::DenyUnauthenticated,
        Some(author) if author.id == post.author_id => Decision::Allowed,
        Some(_) => Decision::DenyForbidden,
    }
}

pub fn can_comment(identity: &Identity) -> Decision {
    authenticated(identity)
}
