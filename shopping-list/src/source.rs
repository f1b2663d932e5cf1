use async_trait::async_trait;
use uuid::Uuid;

use crate::line::IngredientLine;

pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Read access to cart membership and recipe ingredients.
///
/// Implementations must return the catalog name and unit with every line:
/// lines are merged on those, not on the catalog id.
#[async_trait]
pub trait CartSource: Send + Sync {
    async fn cart_recipe_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, SourceError>;

    async fn ingredient_lines(
        &self,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<IngredientLine>, SourceError>;
}

#[async_trait]
impl<T: CartSource + ?Sized> CartSource for std::sync::Arc<T> {
    async fn cart_recipe_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, SourceError> {
        (**self).cart_recipe_ids(user_id).await
    }

    async fn ingredient_lines(
        &self,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<IngredientLine>, SourceError> {
        (**self).ingredient_lines(recipe_ids).await
    }
}
