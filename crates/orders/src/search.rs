//! Transient order query filter.

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderStatus};

/// Filter for order searches. Not persisted.
///
/// An unset field matches everything; `member_name` matches by substring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSearch {
    pub order_status: Option<OrderStatus>,
    pub member_name: Option<String>,
}

impl OrderSearch {
    pub fn by_status(status: OrderStatus) -> Self {
        Self {
            order_status: Some(status),
            member_name: None,
        }
    }

    pub fn with_member_name(mut self, name: impl Into<String>) -> Self {
        self.member_name = Some(name.into());
        self
    }

    /// Name filter with blank input treated as unset.
    pub fn member_name_filter(&self) -> Option<&str> {
        self.member_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Whether `order`, placed by a member called `member_name`, passes the filter.
    pub fn matches(&self, order: &Order, member_name: &str) -> bool {
        if let Some(status) = self.order_status {
            if order.status() != status {
                return false;
            }
        }
        match self.member_name_filter() {
            Some(wanted) => member_name.contains(wanted),
            None => true,
        }
    }
}
