//! Test assertions for grant sequences.

use std::collections::HashSet;

use crate::core::{Grant, Permission};

fn find<'a>(grants: &'a [Grant], principal: &str, resource: &str) -> Option<&'a Grant> {
    grants
        .iter()
        .find(|g| g.principal == principal && g.resource.to_string() == resource)
}

/// Asserts that `principal` holds `permission` on `resource`.
///
/// `resource` is compared against the resource's display form, e.g.
/// `artifact:bucket/build/jar` or `image:behave-image`.
pub fn assert_grant(grants: &[Grant], principal: &str, resource: &str, permission: Permission) {
    match find(grants, principal, resource) {
        Some(grant) => assert_eq!(
            grant.permission, permission,
            "Expected '{}' to hold {} on '{}', got {}",
            principal, permission, resource, grant.permission
        ),
        None => panic!(
            "Expected a grant for '{}' on '{}', found: {:?}",
            principal,
            resource,
            grants.iter().map(ToString::to_string).collect::<Vec<_>>()
        ),
    }
}

/// Asserts that `principal` holds no grant on `resource`.
pub fn assert_no_grant(grants: &[Grant], principal: &str, resource: &str) {
    assert!(
        find(grants, principal, resource).is_none(),
        "Expected no grant for '{}' on '{}'",
        principal,
        resource
    );
}

/// Asserts how many grants `principal` holds.
pub fn assert_grant_count(grants: &[Grant], principal: &str, expected: usize) {
    let actual = grants.iter().filter(|g| g.principal == principal).count();
    assert_eq!(
        actual, expected,
        "Expected {} grants for '{}', got {}",
        expected, principal, actual
    );
}

/// Asserts that no principal holds two grants on the same resource.
pub fn assert_no_duplicate_grants(grants: &[Grant]) {
    let mut seen = HashSet::new();
    for grant in grants {
        assert!(
            seen.insert((&grant.principal, &grant.resource)),
            "Duplicate grant for '{}' on '{}'",
            grant.principal,
            grant.resource
        );
    }
}
