pub mod cart;
pub mod favorites;
pub mod ingredients;
pub mod recipe;
pub mod tags;

pub use cart::CartEntry;
pub use favorites::Favorite;
pub use ingredients::{Ingredient, RecipeIngredient, RecipeIngredientDetail};
pub use recipe::{
    IngredientAmount, NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeWithDetails,
};
pub use tags::Tag;
