use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recipe's requirement for one catalog ingredient, with the catalog
/// name and unit joined in.
///
/// `name` and `measurement_unit` are `None` when the referenced catalog row
/// could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
    pub amount: u32,
}

impl IngredientLine {
    pub fn new(
        recipe_id: Uuid,
        ingredient_id: Uuid,
        name: impl Into<String>,
        measurement_unit: impl Into<String>,
        amount: u32,
    ) -> Self {
        Self {
            recipe_id,
            ingredient_id,
            name: Some(name.into()),
            measurement_unit: Some(measurement_unit.into()),
            amount,
        }
    }
}

/// Lines sharing a key are merged, regardless of which catalog row they
/// point at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngredientKey {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedLine {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShoppingListLine {
    Item(AggregatedLine),
    /// Placeholder returned instead of an empty list.
    Notice { text: String },
}

impl ShoppingListLine {
    pub fn notice(text: impl Into<String>) -> Self {
        Self::Notice { text: text.into() }
    }

    pub fn is_notice(&self) -> bool {
        matches!(self, ShoppingListLine::Notice { .. })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lines_serialize_with_a_kind_tag() {
        let item = ShoppingListLine::Item(AggregatedLine {
            name: "Flour".to_string(),
            measurement_unit: "g".to_string(),
            total_amount: 500,
        });
        let notice = ShoppingListLine::notice("Nothing to buy");

        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "kind": "item",
                "name": "Flour",
                "measurement_unit": "g",
                "total_amount": 500
            })
        );
        assert_eq!(
            serde_json::to_value(&notice).unwrap(),
            json!({ "kind": "notice", "text": "Nothing to buy" })
        );
    }

    #[test]
    fn catalog_fields_may_be_missing() {
        let line: IngredientLine = serde_json::from_value(json!({
            "recipe_id": Uuid::nil(),
            "ingredient_id": Uuid::nil(),
            "name": null,
            "measurement_unit": null,
            "amount": 3
        }))
        .unwrap();

        assert_eq!(line.name, None);
        assert_eq!(line.amount, 3);
    }
}
