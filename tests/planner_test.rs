//! Property tests for pagination planning

use bili_comments::crawler::{PageMode, PaginationPlan};
use bili_comments::models::CommentPage;
use proptest::prelude::*;

proptest! {
    #[test]
    fn target_never_exceeds_available_or_bound(
        total in 0u64..1_000_000,
        page_size in 1u32..100,
        bound in 0u32..500,
    ) {
        let first = CommentPage::empty(1, total);
        let plan = PaginationPlan::plan(&first, PageMode::Bounded(bound), page_size);

        prop_assert!(plan.target_pages <= plan.available_pages);
        prop_assert!(plan.target_pages <= bound);
        prop_assert_eq!(plan.target_pages, plan.available_pages.min(bound));
    }

    #[test]
    fn available_pages_cover_every_comment(
        total in 0u64..1_000_000,
        page_size in 1u32..100,
    ) {
        let first = CommentPage::empty(1, total);
        let plan = PaginationPlan::plan(&first, PageMode::All, page_size);
        let capacity = u64::from(plan.available_pages) * u64::from(page_size);

        prop_assert!(capacity >= total);
        // No wholly empty trailing page
        prop_assert!(capacity < total + u64::from(page_size));
        prop_assert_eq!(plan.target_pages, plan.available_pages);
    }

    #[test]
    fn fan_out_covers_pages_after_first(total in 0u64..100_000, bound in 0u32..200) {
        let first = CommentPage::empty(1, total);
        let plan = PaginationPlan::plan(&first, PageMode::Bounded(bound), 20);
        let pages: Vec<u32> = plan.fan_out_pages().collect();

        prop_assert_eq!(pages.len() as u32, plan.fan_out_len());
        prop_assert!(pages.iter().all(|&p| p >= 2 && p <= plan.target_pages));
        prop_assert!(plan.progress_denominator() >= 1);
    }
}

#[test]
fn test_default_page_size_examples() {
    let cases = [(0, 0), (1, 1), (20, 1), (21, 2), (100, 5), (101, 6)];

    for (total, expected) in cases {
        let plan = PaginationPlan::plan(&CommentPage::empty(1, total), PageMode::All, 20);
        assert_eq!(plan.available_pages, expected, "total = {total}");
    }
}
