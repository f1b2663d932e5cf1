use color_eyre::eyre::{Context, ContextCompat};
use db::{pagination::DEFAULT_PAGE_SIZE, setup_db_pool, PgCartSource, PgPool};
use shopping_list::{Aggregator, ExportFormat, Separator, DEFAULT_FILENAME};
use tracing::instrument;
use url::Url;

pub const DEFAULT_RECIPES_LIMIT: u32 = 3;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: Url,
    pub page_size: u32,
    pub recipes_limit: u32,
}

impl AppConfig {
    #[instrument(name = "AppConfig::from_env")]
    pub fn from_env() -> crate::Result<Self> {
        let base_url = std::env::var("APP_BASE_URL")
            .wrap_err("Missing APP_BASE_URL, needed for app launch")?;
        let base_url = Url::parse(&base_url).wrap_err("Invalid APP_BASE_URL not parsable")?;

        Ok(Self {
            base_url,
            page_size: env_or("PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            recipes_limit: env_or("RECIPES_LIMIT", DEFAULT_RECIPES_LIMIT)?,
        })
    }

    /// Absolute URL for `path` with the given query string.
    pub fn app_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = self.base_url.clone();

        url.set_path(path);
        url.set_query(query);

        url.into()
    }
}

#[instrument(name = "shopping_list_format_from_env")]
pub fn export_format_from_env() -> crate::Result<ExportFormat> {
    let filename =
        std::env::var("SHOPPING_LIST_FILENAME").unwrap_or_else(|_| DEFAULT_FILENAME.to_string());
    let separator = match std::env::var("SHOPPING_LIST_SEPARATOR") {
        Ok(value) => value
            .parse::<Separator>()
            .map_err(color_eyre::eyre::Report::msg)
            .wrap_err("Invalid SHOPPING_LIST_SEPARATOR")?,
        Err(_) => Separator::default(),
    };

    Ok(ExportFormat::new(filename, separator))
}

fn env_or(key: &str, default: u32) -> crate::Result<u32> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .ok()
            .filter(|v| *v > 0)
            .wrap_err_with(|| format!("{key} must be a positive integer")),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub app: AppConfig,
    pub db: PgPool,
    pub shopping_list: Aggregator<PgCartSource>,
    pub export_format: ExportFormat,
}

impl AppState {
    #[instrument(name = "AppState::from_env", err)]
    pub async fn from_env() -> crate::Result<Self> {
        let db = setup_db_pool().await?;

        Ok(Self::new(AppConfig::from_env()?, db, export_format_from_env()?))
    }

    pub fn new(app: AppConfig, db: PgPool, export_format: ExportFormat) -> Self {
        Self {
            app,
            shopping_list: Aggregator::new(PgCartSource::new(db.clone())),
            db,
            export_format,
        }
    }
}
