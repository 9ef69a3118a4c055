//! One page of a paged query.

use serde::Serialize;

use crate::core::Record;

/// Rows of one page plus totals for the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResults {
    pub items: Vec<Record>,
    pub total_records: u64,
    pub total_pages: u64,
    /// 1-based.
    pub current_page: u64,
    pub page_size: u64,
}

impl PagedResults {
    pub fn new(items: Vec<Record>, total_records: u64, current_page: u64, page_size: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_records.div_ceil(page_size)
        };
        Self {
            items,
            total_records,
            total_pages,
            current_page: current_page.max(1),
            page_size,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// JSON rendering for CLI output.
    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct Summary<'a> {
            total_records: u64,
            total_pages: u64,
            current_page: u64,
            page_size: u64,
            items: &'a [serde_json::Value],
        }
        let items: Vec<serde_json::Value> = self.items.iter().map(Record::to_json).collect();
        serde_json::to_value(Summary {
            total_records: self.total_records,
            total_pages: self.total_pages,
            current_page: self.current_page,
            page_size: self.page_size,
            items: &items,
        })
        .unwrap_or(serde_json::Value::Null)
    }
}
