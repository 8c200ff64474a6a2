//! Query scoping for customer listings.
//!
//! A listing starts from `bilemo.customer c` and gets two independent
//! conditions: the caller's [`ListScope`] and the search filter. Every
//! condition is pushed with `AND`, so the scope always applies whatever
//! filter the caller sends.

use sqlx::{Postgres, QueryBuilder};

use bilemo_core::ListScope;

use super::like_pattern;

/// Search filter for customer listings.
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    /// Partial, case-insensitive email match.
    pub email: Option<String>,
}

/// Append the `WHERE` clause for a customer listing.
///
/// The builder must end right after the `FROM bilemo.customer c` clause.
pub fn push_customer_conditions(
    query: &mut QueryBuilder<'_, Postgres>,
    scope: ListScope,
    filter: &CustomerFilter,
) {
    query.push(" WHERE TRUE");

    if let ListScope::LinkedTo(client_id) = scope {
        query.push(
            " AND EXISTS (SELECT 1 FROM bilemo.client_customer cc \
             WHERE cc.customer_id = c.id AND cc.client_id = ",
        );
        query.push_bind(client_id);
        query.push(")");
    }

    if let Some(term) = filter.email.as_deref().filter(|t| !t.is_empty()) {
        query.push(" AND c.email ILIKE ");
        query.push_bind(like_pattern(term));
    }
}

#[cfg(test)]
mod tests {
    use bilemo_core::ClientId;

    use super::*;

    fn sql(scope: ListScope, filter: &CustomerFilter) -> String {
        let mut query = QueryBuilder::<Postgres>::new("SELECT c.id FROM bilemo.customer c");
        push_customer_conditions(&mut query, scope, filter);
        query.sql().to_owned()
    }

    #[test]
    fn test_admin_scope_is_unrestricted() {
        assert_eq!(
            sql(ListScope::All, &CustomerFilter::default()),
            "SELECT c.id FROM bilemo.customer c WHERE TRUE"
        );
    }

    #[test]
    fn test_client_scope_restricts_to_links() {
        let sql = sql(
            ListScope::LinkedTo(ClientId::new(7)),
            &CustomerFilter::default(),
        );
        assert!(sql.contains("cc.customer_id = c.id AND cc.client_id = $1"));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn test_filter_composes_with_scope() {
        let filter = CustomerFilter {
            email: Some("doe".to_owned()),
        };
        let sql = sql(ListScope::LinkedTo(ClientId::new(7)), &filter);
        assert!(sql.ends_with(") AND c.email ILIKE $2"));
        assert!(sql.contains("WHERE TRUE AND EXISTS"));
    }

    #[test]
    fn test_filter_alone_for_admin() {
        let filter = CustomerFilter {
            email: Some("doe".to_owned()),
        };
        assert_eq!(
            sql(ListScope::All, &filter),
            "SELECT c.id FROM bilemo.customer c WHERE TRUE AND c.email ILIKE $1"
        );
    }

    #[test]
    fn test_empty_filter_is_ignored() {
        let filter = CustomerFilter {
            email: Some(String::new()),
        };
        assert!(!sql(ListScope::All, &filter).contains("ILIKE"));
    }
}
