/// Builder for constructing cart listing queries.
///
/// Carts are always listed for one customer; the status filter is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartQuery {
    /// Customer whose carts are listed.
    pub customer_id: String,

    /// Filter by stored status name (e.g. `active`).
    pub status: Option<String>,
}

impl CartQuery {
    /// Creates a query for all carts of a customer.
    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            status: None,
        }
    }

    /// Filters by cart status.
    ///
    /// An empty string clears the filter.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        let status = status.into();
        self.status = if status.is_empty() { None } else { Some(status) };
        self
    }

    /// Returns true if the record satisfies this query.
    pub fn matches(&self, customer_id: &str, status: &str) -> bool {
        if customer_id != self.customer_id {
            return false;
        }
        match &self.status {
            Some(wanted) => wanted == status,
            None => true,
        }
    }
}
