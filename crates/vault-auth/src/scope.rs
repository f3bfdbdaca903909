//! Role-restricted OAuth scopes

/// Build the scope string restricting a bearer token to `role_ids`
///
/// Each role contributes `" role:<id>"`, in the given order. Duplicates are
/// kept. No roles yields the empty string, which the exchange omits.
///
/// ```
/// use vault_auth::scope::compose_role_scope;
///
/// assert_eq!(compose_role_scope(&[]), "");
/// assert_eq!(
///     compose_role_scope(&["a".to_string(), "b".to_string()]),
///     " role:a role:b"
/// );
/// ```
pub fn compose_role_scope(role_ids: &[String]) -> String {
    role_ids
        .iter()
        .fold(String::new(), |mut scope, role| {
            scope.push_str(" role:");
            scope.push_str(role);
            scope
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty() {
        assert_eq!(compose_role_scope(&[]), "");
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let roles = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(compose_role_scope(&roles), " role:b role:a role:b");
    }

    proptest! {
        #[test]
        fn prop_one_segment_per_role(roles in prop::collection::vec("[a-z0-9]{1,12}", 0..8)) {
            let scope = compose_role_scope(&roles);
            let segments: Vec<&str> = scope.split(' ').skip(1).collect();

            prop_assert_eq!(segments.len(), roles.len());
            for (segment, role) in segments.iter().zip(&roles) {
                prop_assert_eq!(*segment, format!("role:{role}"));
            }
        }
    }
}
