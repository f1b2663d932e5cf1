use axum::http::Uri;
use db::Page;
use serde::{Deserialize, Serialize};

use crate::AppConfig;

/// `?page=` and `?limit=` as sent by the frontend.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn page(&self, config: &AppConfig) -> Page {
        Page::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(config.page_size),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Builds the envelope with absolute `next`/`previous` links that keep
    /// every other query parameter of the current request.
    pub fn new(config: &AppConfig, uri: &Uri, page: Page, count: i64, results: Vec<T>) -> Self {
        let next = page
            .has_next(count)
            .then(|| page_link(config, uri, page.number + 1));
        let previous = page
            .has_previous()
            .then(|| page_link(config, uri, page.number - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

fn page_link(config: &AppConfig, uri: &Uri, number: u32) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());

    if let Some(query) = uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key != "page" {
                serializer.append_pair(&key, &value);
            }
        }
    }
    serializer.append_pair("page", &number.to_string());

    config.app_url(uri.path(), Some(&serializer.finish()))
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            base_url: Url::parse("http://localhost:3000").unwrap(),
            page_size: 6,
            recipes_limit: 3,
        }
    }

    #[test]
    fn test_links_keep_other_params() {
        let uri: Uri = "/api/recipes/?tags=breakfast&page=2&limit=2"
            .parse()
            .unwrap();
        let page = Page::new(2, 2);

        let paginated = Paginated::new(&config(), &uri, page, 5, vec![(); 2]);

        assert_eq!(
            paginated.next.as_deref(),
            Some("http://localhost:3000/api/recipes/?tags=breakfast&limit=2&page=3")
        );
        assert_eq!(
            paginated.previous.as_deref(),
            Some("http://localhost:3000/api/recipes/?tags=breakfast&limit=2&page=1")
        );
    }

    #[test]
    fn test_single_page_has_no_links() {
        let uri: Uri = "/api/users/".parse().unwrap();

        let paginated = Paginated::new(&config(), &uri, Page::default(), 3, vec![1, 2, 3]);

        assert_eq!(paginated.count, 3);
        assert!(paginated.next.is_none());
        assert!(paginated.previous.is_none());
    }

    #[test]
    fn test_page_params_default_to_configured_size() {
        let page = PageParams::default().page(&config());

        assert_eq!(page, Page::new(1, 6));
    }
}
