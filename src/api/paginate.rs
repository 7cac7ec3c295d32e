//! Pull-based cursor pagination

use super::endpoints::{CatalogApi, ListParams, Page};
use crate::sync_state::ResourceType;
use crate::{Error, Result};

/// Walks `next_cursor` until the server stops returning one.
///
/// Finite and non-restartable: once exhausted (or after an error) `next`
/// keeps returning `Ok(None)`. Each call is one network await; dropping the
/// pager between calls abandons the walk.
pub struct Paginator<'a> {
    api: &'a dyn CatalogApi,
    resource: ResourceType,
    params: ListParams,
    done: bool,
    pages: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(api: &'a dyn CatalogApi, resource: ResourceType, params: ListParams) -> Self {
        Self {
            api,
            resource,
            params,
            done: false,
            pages: 0,
        }
    }

    /// Cursor of the page the next call would fetch
    pub fn cursor(&self) -> Option<&str> {
        self.params.cursor.as_deref()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages
    }

    pub fn is_exhausted(&self) -> bool {
        self.done
    }

    /// Fetch the next page, or `None` once the cursor chain has ended
    pub async fn next(&mut self) -> Result<Option<Page>> {
        if self.done {
            return Ok(None);
        }

        let page = match self.api.fetch_page(self.resource, &self.params).await {
            Ok(page) => page,
            Err(err) => {
                self.done = true;
                return Err(err);
            }
        };
        self.pages += 1;

        // The validator only applies to the first request of a walk
        self.params.etag = None;

        match &page.next_cursor {
            Some(next) if !page.not_modified => {
                if self.params.cursor.as_deref() == Some(next.as_str()) {
                    self.done = true;
                    return Err(Error::Decode(format!(
                        "{} cursor did not advance past {:?}",
                        self.resource, next
                    )));
                }
                self.params.cursor = Some(next.clone());
            }
            _ => {
                self.params.cursor = None;
                self.done = true;
            }
        }

        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints::HealthStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves a fixed script of pages, recording the params it was called with
    struct Scripted {
        pages: Mutex<Vec<Result<Page>>>,
        calls: Mutex<Vec<ListParams>>,
    }

    impl Scripted {
        fn new(pages: Vec<Result<Page>>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogApi for Scripted {
        async fn fetch_page(&self, _resource: ResourceType, params: &ListParams) -> Result<Page> {
            self.calls.lock().unwrap().push(params.clone());
            self.pages.lock().unwrap().pop().unwrap_or_else(|| Ok(Page::default()))
        }

        async fn health(&self) -> Result<HealthStatus> {
            Ok(HealthStatus { status: "ok".into(), version: None })
        }
    }

    fn page(n: usize, next: Option<&str>) -> Page {
        Page {
            items: (0..n).map(|i| json!({ "i": i })).collect(),
            next_cursor: next.map(str::to_string),
            ..Page::default()
        }
    }

    #[tokio::test]
    async fn test_walks_until_cursor_absent() {
        let api = Scripted::new(vec![Ok(page(2, Some("p2"))), Ok(page(2, Some("p3"))), Ok(page(1, None))]);
        let mut pager = Paginator::new(&api, ResourceType::Companies, ListParams::default());

        let mut total = 0;
        while let Some(page) = pager.next().await.unwrap() {
            assert!(!pager.is_exhausted() || page.next_cursor.is_none());
            total += page.items.len();
        }
        assert!(pager.is_exhausted());
        assert_eq!(total, 5);
        assert_eq!(pager.pages_fetched(), 3);
        assert!(pager.next().await.unwrap().is_none());

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[1].cursor.as_deref(), Some("p2"));
        assert_eq!(calls[2].cursor.as_deref(), Some("p3"));
    }

    #[tokio::test]
    async fn test_etag_only_on_first_request() {
        let api = Scripted::new(vec![Ok(page(1, Some("p2"))), Ok(page(1, None))]);
        let params = ListParams { etag: Some("\"v1\"".into()), ..Default::default() };
        let mut pager = Paginator::new(&api, ResourceType::Companies, params);
        while pager.next().await.unwrap().is_some() {}

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[0].etag.as_deref(), Some("\"v1\""));
        assert!(calls[1].etag.is_none());
    }

    #[tokio::test]
    async fn test_not_modified_ends_walk() {
        let api = Scripted::new(vec![Ok(Page::not_modified(Some("\"v1\"".into())))]);
        let mut pager = Paginator::new(&api, ResourceType::Companies, ListParams::default());
        let first = pager.next().await.unwrap().unwrap();
        assert!(first.not_modified);
        assert!(pager.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_stops_pager() {
        let api = Scripted::new(vec![
            Ok(page(1, Some("p2"))),
            Err(Error::Transport("HTTP 500".into())),
            Ok(page(1, None)),
        ]);
        let mut pager = Paginator::new(&api, ResourceType::Companies, ListParams::default());
        assert!(pager.next().await.unwrap().is_some());
        assert!(pager.next().await.is_err());
        assert!(pager.next().await.unwrap().is_none());
        assert_eq!(pager.cursor(), Some("p2"));
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_rejected() {
        let api = Scripted::new(vec![Ok(page(1, Some("p2"))), Ok(page(1, Some("p2")))]);
        let mut pager = Paginator::new(&api, ResourceType::Drift, ListParams::default());
        pager.next().await.unwrap();
        assert!(matches!(pager.next().await, Err(Error::Decode(_))));
    }
}
