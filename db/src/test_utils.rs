use sqlx::PgPool;
use uuid::Uuid;

use crate::cooking::{Ingredient, IngredientAmount, NewRecipe, Recipe, Tag};
use crate::users::{NewUser, User};

pub fn new_user(username: &str) -> NewUser {
    NewUser {
        email: format!("{username}@example.com"),
        username: username.to_string(),
        first_name: username.to_string(),
        last_name: "Tester".to_string(),
        password_hash: "not-a-real-hash".to_string(),
    }
}

pub async fn create_user(pool: &PgPool, username: &str) -> User {
    User::create(pool, new_user(username))
        .await
        .expect("Failed to create test user")
}

pub async fn create_ingredient(pool: &PgPool, name: &str, measurement_unit: &str) -> Ingredient {
    Ingredient::create(pool, name.to_string(), measurement_unit.to_string())
        .await
        .expect("Failed to create test ingredient")
}

/// Color is derived from the slug so tags created in one test stay unique.
pub async fn create_tag(pool: &PgPool, name: &str, slug: &str) -> Tag {
    let hash = slug
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b.into()));
    let color = format!("#{:06X}", hash & 0x00FF_FFFF);

    Tag::create(pool, name.to_string(), color, slug.to_string())
        .await
        .expect("Failed to create test tag")
}

pub async fn create_recipe(
    pool: &PgPool,
    author: &User,
    name: &str,
    ingredients: &[(Uuid, i32)],
) -> Recipe {
    let new_recipe = NewRecipe {
        name: name.to_string(),
        image: format!("recipes/images/{}.png", name.to_lowercase()),
        text: format!("How to make {name}"),
        cooking_time: 30,
        ingredients: ingredients
            .iter()
            .map(|&(ingredient_id, amount)| IngredientAmount {
                ingredient_id,
                amount,
            })
            .collect(),
        tag_ids: vec![],
    };

    Recipe::create(pool, author.user_id, new_recipe)
        .await
        .expect("Failed to create test recipe")
}
