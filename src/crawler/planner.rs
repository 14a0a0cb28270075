//! Pagination planning
//!
//! Decides from the first page's total count how many pages exist and how
//! many of them to fetch.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::models::CommentPage;

/// How many pages the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageMode {
    /// At most this many pages
    Bounded(u32),
    /// Every available page
    All,
}

/// Derived page range for one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationPlan {
    /// Top-level comment count reported by page 1
    pub total_count: u64,

    /// `ceil(total_count / page_size)`
    pub available_pages: u32,

    /// Pages to fetch, page 1 included
    pub target_pages: u32,
}

impl PaginationPlan {
    /// Plan from the first page's metadata
    ///
    /// # Example
    /// ```
    /// use bili_comments::crawler::planner::{PageMode, PaginationPlan};
    /// use bili_comments::models::CommentPage;
    ///
    /// let first = CommentPage::empty(1, 21);
    /// let plan = PaginationPlan::plan(&first, PageMode::Bounded(5), 20);
    /// assert_eq!(plan.available_pages, 2);
    /// assert_eq!(plan.target_pages, 2);
    /// ```
    pub fn plan(first_page: &CommentPage, mode: PageMode, page_size: u32) -> Self {
        let total_count = first_page.total_count;
        let available_pages = available_pages(total_count, page_size);

        let target_pages = match mode {
            PageMode::Bounded(n) => available_pages.min(n),
            PageMode::All => available_pages,
        };

        Self {
            total_count,
            available_pages,
            target_pages,
        }
    }

    /// Denominator for progress reporting; never zero
    pub fn progress_denominator(&self) -> u32 {
        self.target_pages.max(1)
    }

    /// Pages fetched concurrently after page 1 (empty when target <= 1)
    pub fn fan_out_pages(&self) -> RangeInclusive<u32> {
        2..=self.target_pages
    }

    /// Number of pages in [`Self::fan_out_pages`]
    pub fn fan_out_len(&self) -> u32 {
        self.target_pages.saturating_sub(1)
    }
}

/// `ceil(total / page_size)`, saturating at `u32::MAX`
pub fn available_pages(total_count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    u32::try_from(total_count.div_ceil(page_size)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_page(total: u64) -> CommentPage {
        CommentPage::empty(1, total)
    }

    #[test]
    fn test_available_pages_boundaries() {
        assert_eq!(available_pages(0, 20), 0);
        assert_eq!(available_pages(1, 20), 1);
        assert_eq!(available_pages(20, 20), 1);
        assert_eq!(available_pages(21, 20), 2);
        assert_eq!(available_pages(u64::MAX, 1), u32::MAX);
    }

    #[test]
    fn test_bounded_mode_takes_minimum() {
        // 3 pages available, 5 requested
        let plan = PaginationPlan::plan(&first_page(55), PageMode::Bounded(5), 20);
        assert_eq!(plan.available_pages, 3);
        assert_eq!(plan.target_pages, 3);

        // 100 pages available, 5 requested
        let plan = PaginationPlan::plan(&first_page(2000), PageMode::Bounded(5), 20);
        assert_eq!(plan.available_pages, 100);
        assert_eq!(plan.target_pages, 5);
    }

    #[test]
    fn test_all_mode_takes_everything() {
        let plan = PaginationPlan::plan(&first_page(2000), PageMode::All, 20);
        assert_eq!(plan.target_pages, 100);
        assert_eq!(plan.fan_out_pages().count(), 99);
        assert_eq!(plan.fan_out_len(), 99);
    }

    #[test]
    fn test_empty_thread_plan() {
        let plan = PaginationPlan::plan(&first_page(0), PageMode::All, 20);
        assert_eq!(plan.available_pages, 0);
        assert_eq!(plan.target_pages, 0);
        assert_eq!(plan.progress_denominator(), 1);
        assert_eq!(plan.fan_out_pages().count(), 0);
        assert_eq!(plan.fan_out_len(), 0);
    }

    #[test]
    fn test_single_page_has_no_fan_out() {
        let plan = PaginationPlan::plan(&first_page(20), PageMode::Bounded(10), 20);
        assert_eq!(plan.target_pages, 1);
        assert!(plan.fan_out_pages().is_empty());
    }

    #[test]
    fn test_zero_page_size_is_guarded() {
        let plan = PaginationPlan::plan(&first_page(3), PageMode::All, 0);
        assert_eq!(plan.available_pages, 3);
    }
}
