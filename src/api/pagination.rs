//! Paginated lists
//!
//! List endpoints answer `{"data": [...], "page": n, "pages": m, "results": k}`.
//! A [`PaginatedList`] fetches the first page up front and the rest on demand.

use super::client::ApiClient;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::resource::{ParentId, Resource, ResourceDef};
use futures::stream::{self, Stream};
use serde_json::Value;
use std::sync::Arc;

/// One decoded page
struct Page {
    items: Vec<Resource>,
    pages: usize,
    results: usize,
}

/// Lazily fetched list of populated resources
#[derive(Debug)]
pub struct PaginatedList {
    client: ApiClient,
    def: Arc<ResourceDef>,
    path: String,
    parent: Option<ParentId>,
    filter: Option<Filter>,
    /// Fetched pages, grown on demand up to `page_count`
    pages: Vec<Option<Vec<Resource>>>,
    page_count: usize,
    per_page: usize,
    total: usize,
}

impl PaginatedList {
    /// Fetch the first page of `path`
    pub(crate) async fn fetch(
        client: ApiClient,
        def: Arc<ResourceDef>,
        path: String,
        parent: Option<ParentId>,
        filter: Option<Filter>,
    ) -> Result<Self> {
        let mut list = Self {
            client,
            def,
            path,
            parent,
            filter,
            pages: Vec::new(),
            page_count: 1,
            per_page: 1,
            total: 0,
        };

        let first = list.fetch_page(1).await?;
        if first.pages > 1 {
            list.per_page = first.items.len().max(1);
            list.total = first.results;
        } else {
            list.per_page = (list.client.page_size() as usize).max(first.items.len()).max(1);
            if first.results != first.items.len() {
                tracing::warn!(
                    "{} list reports {} result(s) but holds {} on its only page",
                    list.def.key,
                    first.results,
                    first.items.len()
                );
            }
            list.total = first.items.len();
        }
        list.page_count = first.pages.max(1);
        list.pages.push(Some(first.items));

        tracing::debug!(
            "Listed {}: {} item(s) over {} page(s)",
            list.def.key,
            list.total,
            list.page_count
        );
        Ok(list)
    }

    async fn fetch_page(&self, page: usize) -> Result<Page> {
        let json = self
            .client
            .get_page(&self.path, page, self.filter.as_ref())
            .await?;
        self.decode(&json)
    }

    fn decode(&self, json: &Value) -> Result<Page> {
        let data = json
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::unexpected("list response has no 'data' array", json))?;

        let items = data
            .iter()
            .map(|item| {
                Resource::from_payload(
                    self.client.clone(),
                    Arc::clone(&self.def),
                    self.parent.clone(),
                    item,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let count = |key: &str| -> Result<Option<usize>> {
            match json.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => v
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .map(Some)
                    .ok_or_else(|| {
                        Error::unexpected(format!("list response has invalid '{}'", key), json)
                    }),
            }
        };
        let results = count("results")?.unwrap_or(items.len());
        let pages = count("pages")?.unwrap_or(1);

        // Every page but the last is full, so `pages` is bounded by `results`
        let max_pages = results.div_ceil(items.len().max(1)).saturating_add(1);
        if pages > max_pages {
            return Err(Error::unexpected("list response has inconsistent 'pages'", json));
        }

        Ok(Page {
            items,
            pages,
            results,
        })
    }

    /// Total number of items across all pages
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Fetch page `page` (0-based) unless it is cached
    async fn ensure_page(&mut self, page: usize) -> Result<()> {
        if self.pages.len() <= page {
            self.pages.resize(page + 1, None);
        }
        if self.pages[page].is_none() {
            let fetched = self.fetch_page(page + 1).await?;
            self.pages[page] = Some(fetched.items);
        }
        Ok(())
    }

    /// Item at `index`, fetching its page if needed
    pub async fn get(&mut self, index: usize) -> Result<Option<&Resource>> {
        if index >= self.total {
            return Ok(None);
        }

        let page = index / self.per_page;
        if page >= self.page_count {
            return Ok(None);
        }
        self.ensure_page(page).await?;

        Ok(self.pages[page]
            .as_ref()
            .and_then(|items| items.get(index % self.per_page)))
    }

    pub async fn first(&mut self) -> Result<Option<Resource>> {
        Ok(self.get(0).await?.cloned())
    }

    pub async fn last(&mut self) -> Result<Option<Resource>> {
        match self.total.checked_sub(1) {
            Some(index) => Ok(self.get(index).await?.cloned()),
            None => Ok(None),
        }
    }

    /// The single item of a list expected to hold exactly one
    pub async fn only(&mut self) -> Result<Resource> {
        if self.total != 1 {
            return Err(Error::InvalidInput(format!(
                "expected exactly one {}, found {}",
                self.def.display_name, self.total
            )));
        }
        self.get(0)
            .await?
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("{} list is empty", self.def.display_name)))
    }

    /// Every item, fetching all remaining pages
    pub async fn collect_all(mut self) -> Result<Vec<Resource>> {
        for page in 0..self.page_count {
            self.ensure_page(page).await?;
        }
        Ok(self.pages.into_iter().flatten().flatten().collect())
    }

    /// Items in order, starting from the first each time it is called;
    /// pages already fetched are reused
    pub fn stream(&mut self) -> impl Stream<Item = Result<Resource>> + '_ {
        stream::try_unfold((self, 0usize), |(list, index)| async move {
            let item = list.get(index).await?.cloned();
            Ok::<_, Error>(item.map(|item| (item, (list, index + 1))))
        })
    }
}
