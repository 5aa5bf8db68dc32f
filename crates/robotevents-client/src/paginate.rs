//! Pagination driver for paged listings
//!
//! Walks `page` upward at the maximum page size, concatenating each page's
//! `data` array. The walk ends on a short page or when page metadata says
//! the last page was reached; a hard page cap guarantees termination when
//! upstream metadata is inconsistent.

use serde_json::Value;
use tracing::{debug, warn};

use robotevents_pool::TrafficClass;

use crate::client::RobotEventsClient;
use crate::error::Result;
use crate::query::Query;

impl RobotEventsClient {
    /// Fetch every page of a listing and return the concatenated items.
    ///
    /// `query` must not set `page` or `per_page`; the driver owns both.
    pub async fn execute_paged(
        &self,
        path: &str,
        query: &Query,
        class: TrafficClass,
    ) -> Result<Vec<Value>> {
        let page_size = self.config.max_page_size;
        let mut items = Vec::new();
        for page in 1..=self.config.page_cap {
            let paged = query.clone().set("page", page).set("per_page", page_size);
            let payload = self.execute(path, &paged, class).await?;

            let Some(data) = payload.get("data").and_then(Value::as_array) else {
                debug!(path, page, "paged response carried no data array, stopping");
                break;
            };
            items.extend(data.iter().cloned());

            if (data.len() as u32) < page_size || is_last_page(&payload) {
                return Ok(items);
            }
            if page == self.config.page_cap {
                warn!(
                    path,
                    pages = page,
                    collected = items.len(),
                    "page cap reached before the listing ended"
                );
            }
        }
        Ok(items)
    }
}

/// Whether response metadata marks this page as the final one. Absent or
/// partial metadata never ends the walk on its own.
fn is_last_page(payload: &Value) -> bool {
    let Some(meta) = payload.get("meta") else {
        return false;
    };
    match (
        meta.get("current_page").and_then(Value::as_u64),
        meta.get("last_page").and_then(Value::as_u64),
    ) {
        (Some(current), Some(last)) => current >= last,
        _ => false,
    }
}
