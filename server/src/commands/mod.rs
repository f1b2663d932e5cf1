use std::path::PathBuf;

use clap::Subcommand;

use crate::Result;

pub(crate) mod import_ingredients;

#[derive(Subcommand, Default)]
pub(crate) enum Command {
    #[default]
    Serve,
    /// Load the ingredient catalog from a JSON file of
    /// `{ "name", "measurement_unit" }` objects.
    ImportIngredients { path: PathBuf },
}

impl Command {
    pub(crate) async fn run(&self) -> Result<()> {
        match &self {
            Command::Serve => crate::http_server::cmd::serve().await,
            Command::ImportIngredients { path } => import_ingredients::import_from_file(path).await,
        }
    }
}
