//! Shopping list aggregation.
//!
//! Sums the ingredient amounts of every recipe in a user's cart per
//! (name, unit) pair and renders the result as a plain-text document.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use foodgram_common::AppResult;
use foodgram_db::repositories::{
    IngredientLine, MarkerKind, RecipeIngredientRepository, RecipeMarkerRepository,
    RecipeRepository, UserRepository,
};

/// Summed amount of one ingredient across the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTotal {
    /// Normalized name: first character upper-cased, rest lower-cased.
    pub name: String,
    pub measurement_unit: String,
    pub amount: f64,
}

/// A cart recipe listed under the products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRecipe {
    pub name: String,
    pub author: String,
}

/// Aggregated shopping list ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingList {
    pub composed_at: DateTime<Utc>,
    pub products: Vec<ProductTotal>,
    pub recipes: Vec<CartRecipe>,
}

impl ShoppingList {
    /// File name offered in the download.
    pub const FILE_NAME: &'static str = "shopping-list.txt";

    /// Render the plain-text document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "Shopping list. Composed: {}.\n\nProducts:\n",
            self.composed_at.format("%d %b %Y %H:%M:%S")
        );

        for (idx, product) in self.products.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} — {} {}",
                idx + 1,
                product.name,
                format_amount(product.amount),
                product.measurement_unit
            );
        }

        out.push_str("\nRecipes:\n");
        for recipe in &self.recipes {
            let _ = writeln!(out, "{} (Author: {})", recipe.name, recipe.author);
        }

        out
    }
}

/// Upper-case the first character and lower-case the rest.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Render a total, always with a fractional part (`300.0`, `12.5`).
#[must_use]
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.1}")
    } else {
        format!("{amount}")
    }
}

/// Sum line amounts per (normalized name, unit), keeping the order in which
/// each group first appears.
#[must_use]
pub fn aggregate(lines: &[IngredientLine]) -> Vec<ProductTotal> {
    let mut totals: Vec<ProductTotal> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for line in lines {
        let key = (normalize_name(&line.name), line.measurement_unit.clone());
        match index.get(&key) {
            Some(&i) => totals[i].amount += f64::from(line.amount),
            None => {
                index.insert(key.clone(), totals.len());
                totals.push(ProductTotal {
                    name: key.0,
                    measurement_unit: key.1,
                    amount: f64::from(line.amount),
                });
            }
        }
    }

    totals
}

/// Builds shopping lists from the cart markers.
#[derive(Clone)]
pub struct ShoppingListService {
    marker_repo: RecipeMarkerRepository,
    recipe_repo: RecipeRepository,
    line_repo: RecipeIngredientRepository,
    user_repo: UserRepository,
}

impl ShoppingListService {
    /// Create a new shopping list service.
    #[must_use]
    pub const fn new(
        marker_repo: RecipeMarkerRepository,
        recipe_repo: RecipeRepository,
        line_repo: RecipeIngredientRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            marker_repo,
            recipe_repo,
            line_repo,
            user_repo,
        }
    }

    /// Aggregate the cart of `user_id`.
    pub async fn build(&self, user_id: i32) -> AppResult<ShoppingList> {
        let cart_ids = self
            .marker_repo
            .recipe_ids(MarkerKind::ShoppingCart, user_id)
            .await?;

        let lines = self.line_repo.find_by_recipes(&cart_ids).await?;
        let products = aggregate(&lines);

        let cart_recipes = self.recipe_repo.find_by_ids(&cart_ids).await?;

        let mut author_ids: Vec<i32> = cart_recipes.iter().map(|r| r.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<i32, String> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.display_name()))
            .collect();

        let recipes = cart_recipes
            .into_iter()
            .map(|r| CartRecipe {
                author: authors.get(&r.author_id).cloned().unwrap_or_default(),
                name: r.name,
            })
            .collect();

        tracing::debug!(user_id, products = products.len(), "Built shopping list");

        Ok(ShoppingList {
            composed_at: Utc::now(),
            products,
            recipes,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::user::tests::create_test_user;
    use chrono::TimeZone;
    use foodgram_db::entities::{ingredient, recipe, recipe_ingredient, shopping_cart_item};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn line(recipe_id: i32, name: &str, unit: &str, amount: i32) -> IngredientLine {
        IngredientLine {
            recipe_id,
            ingredient_id: 0,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("flour"), "Flour");
        assert_eq!(normalize_name("FLOUR"), "Flour");
        assert_eq!(normalize_name("яйца"), "Яйца");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(300.0), "300.0");
        assert_eq!(format_amount(12.5), "12.5");
    }

    #[test]
    fn test_aggregate_folds_case_variants() {
        let totals = aggregate(&[line(1, "Flour", "g", 200), line(2, "flour", "g", 100)]);

        assert_eq!(
            totals,
            vec![ProductTotal {
                name: "Flour".to_string(),
                measurement_unit: "g".to_string(),
                amount: 300.0,
            }]
        );
    }

    #[test]
    fn test_aggregate_keeps_units_apart_and_first_seen_order() {
        let totals = aggregate(&[
            line(1, "sugar", "g", 50),
            line(1, "Milk", "ml", 200),
            line(2, "Sugar", "tbsp", 2),
            line(2, "SUGAR", "g", 25),
        ]);

        let rendered: Vec<(String, String, f64)> = totals
            .into_iter()
            .map(|t| (t.name, t.measurement_unit, t.amount))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("Sugar".to_string(), "g".to_string(), 75.0),
                ("Milk".to_string(), "ml".to_string(), 200.0),
                ("Sugar".to_string(), "tbsp".to_string(), 2.0),
            ]
        );
    }

    #[test]
    fn test_total_equals_sum_of_matching_lines() {
        let lines = [
            line(1, "Rice", "g", 120),
            line(2, "rice", "g", 80),
            line(3, "RICE", "g", 1),
            line(3, "Rice", "kg", 1),
        ];
        let totals = aggregate(&lines);

        for total in &totals {
            let expected: i32 = lines
                .iter()
                .filter(|l| {
                    normalize_name(&l.name) == total.name
                        && l.measurement_unit == total.measurement_unit
                })
                .map(|l| l.amount)
                .sum();
            assert_eq!(total.amount, f64::from(expected));
        }
    }

    #[test]
    fn test_render() {
        let list = ShoppingList {
            composed_at: fixed_time(),
            products: aggregate(&[line(1, "Flour", "g", 200), line(2, "flour", "g", 100)]),
            recipes: vec![CartRecipe {
                name: "Bread".to_string(),
                author: "Julia Child".to_string(),
            }],
        };

        assert_eq!(
            list.render(),
            "Shopping list. Composed: 05 Mar 2024 14:07:09.\n\n\
             Products:\n\
             1. Flour — 300.0 g\n\n\
             Recipes:\n\
             Bread (Author: Julia Child)\n"
        );
    }

    #[test]
    fn test_render_empty_cart() {
        let list = ShoppingList {
            composed_at: fixed_time(),
            products: vec![],
            recipes: vec![],
        };

        assert_eq!(
            list.render(),
            "Shopping list. Composed: 05 Mar 2024 14:07:09.\n\nProducts:\n\nRecipes:\n"
        );
    }

    fn db_with<F>(f: F) -> Arc<DatabaseConnection>
    where
        F: FnOnce(MockDatabase) -> MockDatabase,
    {
        Arc::new(f(MockDatabase::new(DatabaseBackend::Postgres)).into_connection())
    }

    #[tokio::test]
    async fn test_build_lists_recipes_newest_first() {
        let now = Utc::now();
        let marker_db = db_with(|db| {
            db.append_query_results([[
                shopping_cart_item::Model {
                    id: 1,
                    user_id: 9,
                    recipe_id: 2,
                    created_at: now.into(),
                },
                shopping_cart_item::Model {
                    id: 2,
                    user_id: 9,
                    recipe_id: 1,
                    created_at: now.into(),
                },
            ]])
        });
        let line_db = db_with(|db| {
            db.append_query_results([[
                recipe_ingredient::Model {
                    id: 1,
                    recipe_id: 1,
                    ingredient_id: 10,
                    amount: 200,
                },
                recipe_ingredient::Model {
                    id: 2,
                    recipe_id: 2,
                    ingredient_id: 11,
                    amount: 100,
                },
            ]])
            .append_query_results([[
                ingredient::Model {
                    id: 10,
                    name: "Flour".to_string(),
                    measurement_unit: "g".to_string(),
                },
                ingredient::Model {
                    id: 11,
                    name: "flour".to_string(),
                    measurement_unit: "g".to_string(),
                },
            ]])
        });
        let recipe = |id: i32, name: &str, age_days: i64| recipe::Model {
            id,
            author_id: 1,
            name: name.to_string(),
            image: String::new(),
            text: String::new(),
            cooking_time: 5,
            pub_date: (now - chrono::Duration::days(age_days)).into(),
        };
        // Newest first, regardless of the order recipes were put in the cart.
        let recipe_db = db_with(|db| {
            db.append_query_results([[recipe(1, "Bread", 0), recipe(2, "Cake", 3)]])
        });
        let user_db = db_with(|db| db.append_query_results([[create_test_user(1, "baker")]]));

        let service = ShoppingListService::new(
            RecipeMarkerRepository::new(marker_db),
            RecipeRepository::new(recipe_db),
            RecipeIngredientRepository::new(line_db),
            UserRepository::new(user_db),
        );

        let list = service.build(9).await.unwrap();

        assert_eq!(list.products.len(), 1);
        assert_eq!(list.products[0].amount, 300.0);
        assert_eq!(
            list.recipes,
            vec![
                CartRecipe {
                    name: "Bread".to_string(),
                    author: "Test User".to_string(),
                },
                CartRecipe {
                    name: "Cake".to_string(),
                    author: "Test User".to_string(),
                },
            ]
        );
    }
}
