use std::collections::HashMap;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::ShoppingListError,
    line::{AggregatedLine, IngredientKey, IngredientLine, ShoppingListLine},
    source::CartSource,
};

pub const DEFAULT_EMPTY_CART_NOTICE: &str =
    "Для формирования списка покупок добавьте в корзину хотя бы один рецепт!";

/// Folds lines into one entry per (name, unit), summing amounts.
///
/// Output order is the order in which each key was first seen.
pub fn merge_lines<I>(lines: I) -> Result<Vec<AggregatedLine>, ShoppingListError>
where
    I: IntoIterator<Item = IngredientLine>,
{
    let mut merged: Vec<AggregatedLine> = Vec::new();
    let mut index: HashMap<IngredientKey, usize> = HashMap::new();

    for line in lines {
        if line.amount == 0 {
            return Err(ShoppingListError::InvalidAmount {
                recipe_id: line.recipe_id,
                ingredient_id: line.ingredient_id,
                amount: line.amount,
            });
        }

        let (Some(name), Some(measurement_unit)) = (line.name, line.measurement_unit) else {
            return Err(ShoppingListError::MissingIngredient {
                recipe_id: line.recipe_id,
                ingredient_id: line.ingredient_id,
            });
        };

        let key = IngredientKey {
            name,
            measurement_unit,
        };

        if let Some(&position) = index.get(&key) {
            merged[position].total_amount += u64::from(line.amount);
        } else {
            index.insert(key.clone(), merged.len());
            merged.push(AggregatedLine {
                name: key.name,
                measurement_unit: key.measurement_unit,
                total_amount: u64::from(line.amount),
            });
        }
    }

    Ok(merged)
}

/// Builds a user's shopping list from whatever is in their cart.
#[derive(Debug, Clone)]
pub struct Aggregator<S> {
    source: S,
    empty_notice: String,
}

impl<S: CartSource> Aggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            empty_notice: DEFAULT_EMPTY_CART_NOTICE.to_string(),
        }
    }

    #[must_use]
    pub fn with_empty_notice(mut self, notice: impl Into<String>) -> Self {
        self.empty_notice = notice.into();
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// An empty cart is not an error: it yields a single notice line.
    #[instrument(name = "Aggregator::aggregate", skip(self), err)]
    pub async fn aggregate(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ShoppingListLine>, ShoppingListError> {
        let recipe_ids = self
            .source
            .cart_recipe_ids(user_id)
            .await
            .map_err(ShoppingListError::UpstreamUnavailable)?;

        if recipe_ids.is_empty() {
            tracing::debug!("Cart is empty, returning notice");
            return Ok(vec![ShoppingListLine::notice(self.empty_notice.clone())]);
        }

        let lines = self
            .source
            .ingredient_lines(&recipe_ids)
            .await
            .map_err(ShoppingListError::UpstreamUnavailable)?;
        let line_count = lines.len();

        let merged = merge_lines(lines)?;
        if merged.is_empty() {
            tracing::debug!(
                recipes = recipe_ids.len(),
                "Cart recipes have no ingredients"
            );
            return Ok(vec![ShoppingListLine::notice(self.empty_notice.clone())]);
        }

        tracing::debug!(
            recipes = recipe_ids.len(),
            lines = line_count,
            merged = merged.len(),
            "Aggregated shopping list"
        );

        Ok(merged.into_iter().map(ShoppingListLine::Item).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::source::SourceError;

    #[derive(Default)]
    struct MemoryCart {
        carts: Vec<(Uuid, Uuid)>,
        lines: Vec<IngredientLine>,
        fail: bool,
        requested: Mutex<Vec<Vec<Uuid>>>,
    }

    impl MemoryCart {
        fn add_to_cart(&mut self, user_id: Uuid, recipe_id: Uuid) {
            if !self.carts.contains(&(user_id, recipe_id)) {
                self.carts.push((user_id, recipe_id));
            }
        }
    }

    #[async_trait]
    impl CartSource for MemoryCart {
        async fn cart_recipe_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, SourceError> {
            if self.fail {
                return Err("connection refused".into());
            }

            Ok(self
                .carts
                .iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, r)| *r)
                .collect())
        }

        async fn ingredient_lines(
            &self,
            recipe_ids: &[Uuid],
        ) -> Result<Vec<IngredientLine>, SourceError> {
            self.requested.lock().unwrap().push(recipe_ids.to_vec());

            Ok(self
                .lines
                .iter()
                .filter(|l| recipe_ids.contains(&l.recipe_id))
                .cloned()
                .collect())
        }
    }

    fn item(name: &str, unit: &str, total: u64) -> ShoppingListLine {
        ShoppingListLine::Item(AggregatedLine {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount: total,
        })
    }

    fn two_recipe_cart() -> (MemoryCart, Uuid) {
        let user = Uuid::new_v4();
        let recipe_a = Uuid::new_v4();
        let recipe_b = Uuid::new_v4();
        let flour = Uuid::new_v4();

        let mut cart = MemoryCart {
            lines: vec![
                IngredientLine::new(recipe_a, flour, "Flour", "g", 200),
                IngredientLine::new(recipe_a, Uuid::new_v4(), "Egg", "pcs", 2),
                IngredientLine::new(recipe_b, flour, "Flour", "g", 300),
                IngredientLine::new(recipe_b, Uuid::new_v4(), "Milk", "ml", 100),
            ],
            ..MemoryCart::default()
        };
        cart.add_to_cart(user, recipe_a);
        cart.add_to_cart(user, recipe_b);

        (cart, user)
    }

    #[test]
    fn merge_sums_amounts_in_first_seen_order() {
        let recipe = Uuid::new_v4();
        let merged = merge_lines(vec![
            IngredientLine::new(recipe, Uuid::new_v4(), "Salt", "g", 5),
            IngredientLine::new(recipe, Uuid::new_v4(), "Butter", "g", 50),
            IngredientLine::new(recipe, Uuid::new_v4(), "Salt", "g", 10),
        ])
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Salt");
        assert_eq!(merged[0].total_amount, 15);
        assert_eq!(merged[1].name, "Butter");
        assert_eq!(merged[1].total_amount, 50);
    }

    #[test]
    fn merge_folds_distinct_catalog_rows_with_same_name_and_unit() {
        let merged = merge_lines(vec![
            IngredientLine::new(Uuid::new_v4(), Uuid::new_v4(), "Sugar", "g", 100),
            IngredientLine::new(Uuid::new_v4(), Uuid::new_v4(), "Sugar", "g", 25),
        ])
        .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total_amount, 125);
    }

    #[test]
    fn merge_keeps_same_name_with_different_units_apart() {
        let merged = merge_lines(vec![
            IngredientLine::new(Uuid::new_v4(), Uuid::new_v4(), "Milk", "ml", 200),
            IngredientLine::new(Uuid::new_v4(), Uuid::new_v4(), "Milk", "cup", 1),
        ])
        .unwrap();

        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_rejects_lines_missing_from_catalog() {
        let recipe_id = Uuid::new_v4();
        let ingredient_id = Uuid::new_v4();
        let err = merge_lines(vec![IngredientLine {
            recipe_id,
            ingredient_id,
            name: None,
            measurement_unit: None,
            amount: 3,
        }])
        .unwrap_err();

        assert!(matches!(
            err,
            ShoppingListError::MissingIngredient { recipe_id: r, ingredient_id: i }
                if r == recipe_id && i == ingredient_id
        ));
    }

    #[test]
    fn merge_rejects_zero_amounts() {
        let err = merge_lines(vec![IngredientLine::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Flour",
            "g",
            0,
        )])
        .unwrap_err();

        assert!(matches!(err, ShoppingListError::InvalidAmount { amount: 0, .. }));
    }

    #[tokio::test]
    async fn aggregates_multi_recipe_cart() {
        let (cart, user) = two_recipe_cart();
        let aggregator = Aggregator::new(cart);

        let list = aggregator.aggregate(user).await.unwrap();

        assert_eq!(
            list,
            vec![
                item("Flour", "g", 500),
                item("Egg", "pcs", 2),
                item("Milk", "ml", 100),
            ]
        );
    }

    #[tokio::test]
    async fn empty_cart_yields_single_notice() {
        let aggregator = Aggregator::new(MemoryCart::default());

        let list = aggregator.aggregate(Uuid::new_v4()).await.unwrap();

        assert_eq!(
            list,
            vec![ShoppingListLine::notice(DEFAULT_EMPTY_CART_NOTICE)]
        );
        assert!(aggregator.source().requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_notice_is_used() {
        let aggregator =
            Aggregator::new(MemoryCart::default()).with_empty_notice("Your cart is empty");

        let list = aggregator.aggregate(Uuid::new_v4()).await.unwrap();

        assert_eq!(list, vec![ShoppingListLine::notice("Your cart is empty")]);
    }

    #[tokio::test]
    async fn aggregation_is_idempotent() {
        let (cart, user) = two_recipe_cart();
        let aggregator = Aggregator::new(cart);

        let first = aggregator.aggregate(user).await.unwrap();
        let second = aggregator.aggregate(user).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn adding_a_recipe_twice_does_not_double_amounts() {
        let (mut cart, user) = two_recipe_cart();
        let recipe_a = cart.carts[0].1;
        cart.add_to_cart(user, recipe_a);
        let aggregator = Aggregator::new(cart);

        let list = aggregator.aggregate(user).await.unwrap();

        assert_eq!(list[0], item("Flour", "g", 500));
    }

    #[tokio::test]
    async fn other_users_carts_are_ignored() {
        let (mut cart, user) = two_recipe_cart();
        let other = Uuid::new_v4();
        let recipe_b = cart.carts[1].1;
        cart.add_to_cart(other, recipe_b);
        let aggregator = Aggregator::new(cart);

        let list = aggregator.aggregate(other).await.unwrap();

        assert_eq!(list, vec![item("Flour", "g", 300), item("Milk", "ml", 100)]);
        assert_eq!(aggregator.aggregate(user).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn source_failures_propagate() {
        let cart = MemoryCart {
            fail: true,
            ..MemoryCart::default()
        };
        let aggregator = Aggregator::new(cart);

        let err = aggregator.aggregate(Uuid::new_v4()).await.unwrap_err();

        assert!(err.is_transient());
        assert!(matches!(err, ShoppingListError::UpstreamUnavailable(_)));
    }
}
