use std::path::Path;

use color_eyre::eyre::Context;
use db::{cooking::Ingredient, setup_db_pool, PgPool};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::Result;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    measurement_unit: String,
}

fn parse_catalog(contents: &str) -> Result<Vec<(String, String)>> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(contents)
        .wrap_err("Ingredient file is not a JSON array of ingredients")?;

    Ok(entries
        .into_iter()
        .map(|e| (e.name.trim().to_string(), e.measurement_unit.trim().to_string()))
        .filter(|(name, unit)| !name.is_empty() && !unit.is_empty())
        .collect())
}

pub(crate) async fn import_catalog(pool: &PgPool, contents: &str) -> Result<u64> {
    let rows = parse_catalog(contents)?;
    let total = rows.len();

    let inserted = Ingredient::import(pool, rows).await?;
    info!(total, inserted, "Imported ingredients");

    Ok(inserted)
}

#[instrument(err)]
pub(crate) async fn import_from_file(path: &Path) -> Result<()> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

    let pool = setup_db_pool().await?;
    import_catalog(&pool, &contents).await?;

    Ok(())
}
