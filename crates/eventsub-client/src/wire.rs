//! Helix response envelopes.

use eventsub_core::{
    models::normalize_cursor, Page, Shard, ShardError, Subscription, SubscriptionPage,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// `{"data": [...], "pagination": {"cursor": ...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct DataResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl<T> DataResponse<T> {
    pub fn into_page(self) -> Page<T> {
        Page { data: self.data, cursor: normalize_cursor(self.pagination.cursor) }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionsResponse {
    pub data: Vec<Subscription>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub total_cost: u32,
    #[serde(default)]
    pub max_total_cost: u32,
    #[serde(default)]
    pub pagination: Pagination,
}

impl From<SubscriptionsResponse> for SubscriptionPage {
    fn from(response: SubscriptionsResponse) -> Self {
        Self {
            page: Page { data: response.data, cursor: normalize_cursor(response.pagination.cursor) },
            total: response.total,
            total_cost: response.total_cost,
            max_total_cost: response.max_total_cost,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateShardsResponse {
    #[serde(default)]
    pub data: Vec<Shard>,
    #[serde(default)]
    pub errors: Vec<ShardError>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_pagination_means_last_page() {
        let response: DataResponse<Shard> =
            serde_json::from_value(json!({"data": [{"id": "0", "status": "enabled"}]})).unwrap();
        let page = response.into_page();

        assert_eq!(page.data.len(), 1);
        assert!(!page.has_next());
    }

    #[test]
    fn empty_cursor_means_last_page() {
        let response: DataResponse<Shard> =
            serde_json::from_value(json!({"data": [], "pagination": {"cursor": ""}})).unwrap();
        assert_eq!(response.into_page().cursor, None);
    }

    #[test]
    fn subscription_totals_carried() {
        let response: SubscriptionsResponse = serde_json::from_value(json!({
            "data": [],
            "total": 3,
            "total_cost": 2,
            "max_total_cost": 10000,
            "pagination": {"cursor": "c1"}
        }))
        .unwrap();
        let page = SubscriptionPage::from(response);

        assert_eq!(page.total, 3);
        assert_eq!(page.total_cost, 2);
        assert_eq!(page.max_total_cost, 10000);
        assert_eq!(page.page.cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn shard_errors_optional() {
        let response: UpdateShardsResponse =
            serde_json::from_value(json!({"data": [{"id": "1", "status": "enabled"}]})).unwrap();
        assert!(response.errors.is_empty());
        assert_eq!(response.data.len(), 1);
    }
}
