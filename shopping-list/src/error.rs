use thiserror::Error;
use uuid::Uuid;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum ShoppingListError {
    #[error("Cart data is unavailable: {0}")]
    UpstreamUnavailable(#[source] SourceError),

    #[error("Ingredient {ingredient_id} of recipe {recipe_id} is not cataloged")]
    MissingIngredient { recipe_id: Uuid, ingredient_id: Uuid },

    #[error("Ingredient {ingredient_id} of recipe {recipe_id} has amount {amount}")]
    InvalidAmount {
        recipe_id: Uuid,
        ingredient_id: Uuid,
        amount: u32,
    },
}

impl ShoppingListError {
    /// Whether retrying the whole request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ShoppingListError::UpstreamUnavailable(_))
    }
}
