//! Page-number pagination.

use axum::http::Uri;
use foodgram_common::{AppError, AppResult, config::PaginationConfig};
use serde::{Deserialize, Serialize};
use url::Url;

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Resolved page number and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    /// 1-based page number.
    pub page: u64,
    pub limit: u64,
}

impl PageQuery {
    /// Resolve against the configured defaults. A zero or absent `limit`
    /// falls back to the default page size; larger values are capped.
    ///
    /// Pages whose row range does not fit a SQL `BIGINT` offset are invalid.
    pub fn params(&self, config: &PaginationConfig) -> AppResult<PageParams> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(invalid_page());
        }

        let limit = match self.limit {
            Some(limit) if limit > 0 => limit.min(config.max_page_size),
            _ => config.page_size,
        };

        page.checked_mul(limit)
            .filter(|end| i64::try_from(*end).is_ok())
            .ok_or_else(invalid_page)?;

        Ok(PageParams { page, limit })
    }
}

impl PageParams {
    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// A page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page with links relative to the request URI.
    ///
    /// Pages past the end are rejected, except the first page of an empty
    /// result set.
    pub fn new(
        results: Vec<T>,
        count: u64,
        params: PageParams,
        base_url: &str,
        uri: &Uri,
    ) -> AppResult<Self> {
        if params.page > 1 && params.offset() >= count {
            return Err(invalid_page());
        }

        let next = (params.page * params.limit < count)
            .then(|| page_url(base_url, uri, Some(params.page + 1)))
            .transpose()?;
        let previous = match params.page {
            1 => None,
            2 => Some(page_url(base_url, uri, None)?),
            page => Some(page_url(base_url, uri, Some(page - 1))?),
        };

        Ok(Self {
            count,
            next,
            previous,
            results,
        })
    }
}

fn invalid_page() -> AppError {
    AppError::NotFound("Invalid page.".to_string())
}

/// Absolute URL of `uri` with its `page` parameter replaced. `None` drops the
/// parameter, which addresses the first page.
fn page_url(base_url: &str, uri: &Uri, page: Option<u64>) -> AppResult<String> {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let mut url = Url::parse(&format!("{base_url}{path_and_query}"))
        .map_err(|e| AppError::Internal(format!("Invalid page URL: {e}")))?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if let Some(page) = page {
        pairs.push(("page".to_string(), page.to_string()));
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    Ok(url.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig {
            page_size: 6,
            max_page_size: 100,
        }
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_params_defaults() {
        let params = PageQuery::default().params(&config()).unwrap();
        assert_eq!(params, PageParams { page: 1, limit: 6 });
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_params_limit_is_capped() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(1000),
        };
        let params = query.params(&config()).unwrap();
        assert_eq!(params.limit, 100);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn test_page_zero_is_invalid() {
        let query = PageQuery {
            page: Some(0),
            limit: None,
        };
        assert!(matches!(query.params(&config()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_huge_page_is_invalid() {
        let query = PageQuery {
            page: Some(u64::MAX / 2),
            limit: Some(10),
        };
        assert!(matches!(query.params(&config()), Err(AppError::NotFound(_))));

        let query = PageQuery {
            page: Some(9_223_372_036_854_775_807),
            limit: None,
        };
        assert!(matches!(query.params(&config()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_links_on_middle_page() {
        let params = PageParams { page: 2, limit: 2 };
        let page = Page::new(
            vec![1, 2],
            5,
            params,
            "https://foodgram.example",
            &uri("/api/recipes/?author=3&page=2&limit=2"),
        )
        .unwrap();

        assert_eq!(
            page.next.as_deref(),
            Some("https://foodgram.example/api/recipes/?author=3&limit=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("https://foodgram.example/api/recipes/?author=3&limit=2")
        );
    }

    #[test]
    fn test_single_page_has_no_links() {
        let params = PageParams { page: 1, limit: 6 };
        let page = Page::new(
            vec![1],
            1,
            params,
            "https://foodgram.example",
            &uri("/api/users/"),
        )
        .unwrap();

        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_empty_first_page_is_valid() {
        let params = PageParams { page: 1, limit: 6 };
        let page = Page::<i32>::new(vec![], 0, params, "http://localhost", &uri("/api/recipes/"))
            .unwrap();
        assert_eq!(page.count, 0);
    }

    #[test]
    fn test_page_past_end_is_not_found() {
        let params = PageParams { page: 3, limit: 6 };
        let result = Page::<i32>::new(vec![], 7, params, "http://localhost", &uri("/api/users/"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
