//! Property tests for pagination clamping and the search request surface.
//!
//! Pagination bounds are a hard contract: whatever a client sends, the
//! executed window must stay server-controlled.

use proptest::prelude::*;

use domainscope_api::db::{clamp_page, clamp_page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use domainscope_api::routes::search::SearchRequest;

proptest! {
    /// Any client-supplied page clamps to a 1-based value.
    #[test]
    fn prop_page_is_always_at_least_one(page in proptest::option::of(any::<i64>())) {
        prop_assert!(clamp_page(page) >= 1);
    }

    /// Any client-supplied page size lands in [1, MAX_PAGE_SIZE], with the
    /// default applied only when the field is absent.
    #[test]
    fn prop_page_size_is_always_in_bounds(page_size in proptest::option::of(any::<i64>())) {
        let clamped = clamp_page_size(page_size);
        prop_assert!((1..=MAX_PAGE_SIZE).contains(&clamped));
        if page_size.is_none() {
            prop_assert_eq!(clamped, DEFAULT_PAGE_SIZE);
        }
    }

    /// The LIMIT/OFFSET window computed from clamped values never goes
    /// negative for any client input, including pages near i64::MAX.
    #[test]
    fn prop_pagination_window_is_well_formed(
        page in proptest::option::of(any::<i64>()),
        page_size in proptest::option::of(any::<i64>()),
    ) {
        let page = clamp_page(page);
        let page_size = clamp_page_size(page_size);

        // Same arithmetic the executor inlines into LIMIT/OFFSET.
        let offset = (page - 1).saturating_mul(page_size);
        prop_assert!(offset >= 0);
        prop_assert!(page_size <= MAX_PAGE_SIZE);
    }

    /// Pagination fields deserialize alongside flattened criteria for any
    /// integer values a client might send.
    #[test]
    fn prop_search_request_accepts_any_pagination_integers(
        page in any::<i64>(),
        page_size in any::<i64>(),
    ) {
        let body = serde_json::json!({
            "domainStartsWith": "shop",
            "page": page,
            "pageSize": page_size,
        });

        let request: SearchRequest = serde_json::from_value(body).unwrap();
        prop_assert_eq!(request.page, Some(page));
        prop_assert_eq!(request.page_size, Some(page_size));
        prop_assert_eq!(request.criteria.domain_starts_with.as_deref(), Some("shop"));
    }
}
