// Copyright 2023 Remi Bernotavicius

use super::models::{
    Category, Ingredient, IngredientRow, NewIngredient, NewRecipe, NewStep, Recipe, RecipeId,
    RecipeRow, Step, StepId, Unit,
};
use super::{Connection, ConnectionProvider, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::IntoSql as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

diesel::define_sql_function! {
    /// The rowid of the most recent successful insert on this connection.
    fn last_insert_rowid() -> diesel::sql_types::Integer;
}

fn fetch_recipe_row(conn: &mut Connection, recipe_id: RecipeId) -> Result<Option<RecipeRow>> {
    use super::schema::recipe::dsl;

    Ok(dsl::recipe
        .select(RecipeRow::as_select())
        .filter(dsl::recipe_id.eq(recipe_id))
        .get_result(conn)
        .optional()?)
}

fn fetch_recipe_ingredients(conn: &mut Connection, recipe_id: RecipeId) -> Result<Vec<Ingredient>> {
    use super::schema::{ingredient, unit};

    // Ingredients without a unit still show up, with no unit.
    Ok(ingredient::table
        .left_join(unit::table)
        .filter(ingredient::recipe_id.eq(recipe_id))
        .order(ingredient::ingredient_order)
        .select((IngredientRow::as_select(), Option::<Unit>::as_select()))
        .load::<(IngredientRow, Option<Unit>)>(conn)?
        .into_iter()
        .map(Ingredient::from)
        .collect())
}

fn fetch_recipe_steps(conn: &mut Connection, recipe_id: RecipeId) -> Result<Vec<Step>> {
    use super::schema::step::dsl;

    Ok(dsl::step
        .select(Step::as_select())
        .filter(dsl::recipe_id.eq(recipe_id))
        .order(dsl::step_order)
        .load(conn)?)
}

fn fetch_recipe_categories(conn: &mut Connection, recipe_id: RecipeId) -> Result<Vec<Category>> {
    use super::schema::{category, recipe_category};

    Ok(recipe_category::table
        .inner_join(category::table)
        .filter(recipe_category::recipe_id.eq(recipe_id))
        .order(category::category_name)
        .select(Category::as_select())
        .load(conn)?)
}

fn next_ingredient_order(conn: &mut Connection, recipe_id: RecipeId) -> Result<i32> {
    use super::schema::ingredient::dsl;

    let count: i64 = dsl::ingredient
        .filter(dsl::recipe_id.eq(recipe_id))
        .count()
        .get_result(conn)?;
    Ok(count as i32 + 1)
}

fn next_step_order(conn: &mut Connection, recipe_id: RecipeId) -> Result<i32> {
    use super::schema::step::dsl;

    let count: i64 = dsl::step
        .filter(dsl::recipe_id.eq(recipe_id))
        .count()
        .get_result(conn)?;
    Ok(count as i32 + 1)
}

fn insert_ingredient(conn: &mut Connection, new_ingredient: &NewIngredient) -> Result<i32> {
    use super::schema::ingredient::dsl::*;
    use diesel::insert_into;

    // Appending is count-then-insert. Two writers appending to the same recipe at once could both
    // pick the same position; only a single interactive user is supported.
    let order = next_ingredient_order(conn, new_ingredient.recipe_id)?;
    insert_into(ingredient)
        .values((
            recipe_id.eq(new_ingredient.recipe_id),
            unit_id.eq(new_ingredient.unit_id),
            ingredient_name.eq(&new_ingredient.name),
            instruction.eq(&new_ingredient.instruction),
            ingredient_order.eq(order),
            amount.eq(new_ingredient.amount),
        ))
        .execute(conn)?;
    Ok(order)
}

fn insert_step(conn: &mut Connection, new_step: &NewStep) -> Result<i32> {
    use super::schema::step::dsl::*;
    use diesel::insert_into;

    let order = next_step_order(conn, new_step.recipe_id)?;
    insert_into(step)
        .values((
            recipe_id.eq(new_step.recipe_id),
            step_order.eq(order),
            step_text.eq(&new_step.text),
        ))
        .execute(conn)?;
    Ok(order)
}

/// All reads and writes of recipes and their children. Every method runs in its own transaction
/// on its own connection.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    provider: ConnectionProvider,
}

impl RecipeRepository {
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Every recipe, ordered by name, without children.
    pub fn fetch_all_recipes(&self) -> Result<Vec<Recipe>> {
        use super::schema::recipe::dsl::*;

        self.provider.transaction("fetch all recipes", |conn| {
            Ok(recipe
                .select(RecipeRow::as_select())
                .order(recipe_name)
                .load(conn)?
                .into_iter()
                .map(Recipe::from)
                .collect())
        })
    }

    /// The recipe with its ingredients, steps and categories, or `None` if there is no such
    /// recipe.
    pub fn fetch_recipe_by_id(&self, recipe_id: RecipeId) -> Result<Option<Recipe>> {
        self.provider.transaction("fetch recipe", |conn| {
            let Some(row) = fetch_recipe_row(conn, recipe_id)? else {
                return Ok(None);
            };

            let mut recipe = Recipe::from(row);
            recipe.ingredients = fetch_recipe_ingredients(conn, recipe_id)?;
            recipe.steps = fetch_recipe_steps(conn, recipe_id)?;
            recipe.categories = fetch_recipe_categories(conn, recipe_id)?;
            Ok(Some(recipe))
        })
    }

    pub fn fetch_recipe_steps(&self, recipe_id: RecipeId) -> Result<Vec<Step>> {
        self.provider
            .transaction("fetch steps", |conn| fetch_recipe_steps(conn, recipe_id))
    }

    pub fn fetch_all_units(&self) -> Result<Vec<Unit>> {
        use super::schema::unit::dsl::*;

        self.provider.transaction("fetch units", |conn| {
            Ok(unit
                .select(Unit::as_select())
                .order(unit_name_singular)
                .load(conn)?)
        })
    }

    pub fn fetch_all_categories(&self) -> Result<Vec<Category>> {
        use super::schema::category::dsl::*;

        self.provider.transaction("fetch categories", |conn| {
            Ok(category
                .select(Category::as_select())
                .order(category_name)
                .load(conn)?)
        })
    }

    /// Inserts the recipe and returns it with its generated id. The creation timestamp is left
    /// unset, fetch the recipe again to see it.
    pub fn insert_recipe(&self, new_recipe: NewRecipe) -> Result<Recipe> {
        use super::schema::recipe::dsl::*;
        use diesel::insert_into;

        let new_id = self.provider.transaction("insert recipe", |conn| {
            insert_into(recipe).values(&new_recipe).execute(conn)?;
            let new_id: i32 = diesel::select(last_insert_rowid()).get_result(conn)?;
            Ok(RecipeId::from(new_id))
        })?;
        log::info!("inserted recipe {new_id}");
        Ok(new_recipe.with_id(new_id))
    }

    /// Appends the ingredient after the recipe's existing ones and returns its position.
    pub fn add_ingredient_to_recipe(&self, new_ingredient: &NewIngredient) -> Result<i32> {
        let order = self.provider.transaction("add ingredient", |conn| {
            insert_ingredient(conn, new_ingredient)
        })?;
        log::info!(
            "added ingredient {order} to recipe {}",
            new_ingredient.recipe_id
        );
        Ok(order)
    }

    /// Appends the step after the recipe's existing ones and returns its position.
    pub fn add_step_to_recipe(&self, new_step: &NewStep) -> Result<i32> {
        let order = self
            .provider
            .transaction("add step", |conn| insert_step(conn, new_step))?;
        log::info!("added step {order} to recipe {}", new_step.recipe_id);
        Ok(order)
    }

    /// Links the recipe to the category with the given name. The category is looked up inside the
    /// insert itself, so an unknown name inserts nothing; returns whether a link was made.
    pub fn add_category_to_recipe(&self, recipe_id: RecipeId, name: &str) -> Result<bool> {
        use super::schema::{category, recipe_category};
        use diesel::insert_into;

        let inserted = self.provider.transaction("add category", |conn| {
            Ok(insert_into(recipe_category::table)
                .values(
                    category::table
                        .filter(category::category_name.eq(name))
                        .select((
                            recipe_id.into_sql::<diesel::sql_types::Integer>(),
                            category::category_id,
                        )),
                )
                .into_columns((recipe_category::recipe_id, recipe_category::category_id))
                .execute(conn)?)
        })?;
        if inserted == 0 {
            log::warn!("no category named {name:?}, recipe {recipe_id} unchanged");
        }
        Ok(inserted == 1)
    }

    /// Replaces the text of a step. Returns whether the step exists.
    pub fn modify_recipe_step(&self, step_id: StepId, text: &str) -> Result<bool> {
        use super::schema::step::dsl;
        use diesel::update;

        let updated = self.provider.transaction("modify step", |conn| {
            Ok(update(dsl::step.filter(dsl::step_id.eq(step_id)))
                .set(dsl::step_text.eq(text))
                .execute(conn)?)
        })?;
        Ok(updated == 1)
    }

    /// Deletes the recipe. Its ingredients, steps and category links are removed by the schema's
    /// cascading deletes. Returns whether the recipe existed.
    pub fn delete_recipe(&self, recipe_id: RecipeId) -> Result<bool> {
        use super::schema::recipe::dsl;
        use diesel::delete;

        let deleted = self.provider.transaction("delete recipe", |conn| {
            Ok(delete(dsl::recipe.filter(dsl::recipe_id.eq(recipe_id))).execute(conn)?)
        })?;
        if deleted == 1 {
            log::info!("deleted recipe {recipe_id}");
        }
        Ok(deleted == 1)
    }

    /// Runs the statements in order in a single transaction. Blank statements are skipped.
    pub fn execute_batch(&self, statements: &[String]) -> Result<()> {
        self.provider.transaction("execute batch", |conn| {
            for statement in statements.iter().filter(|s| !s.trim().is_empty()) {
                log::debug!("executing {statement:?}");
                diesel::sql_query(statement.as_str()).execute(conn)?;
            }
            Ok(())
        })?;
        log::info!("executed {} statements", statements.len());
        Ok(())
    }
}

#[cfg(test)]
use crate::database::models::{minutes_to_time, UnitId};
#[cfg(test)]
use crate::test_support::bootstrapped;
#[cfg(test)]
use maplit::hashset;
#[cfg(test)]
use std::collections::HashSet;

#[cfg(test)]
fn soup() -> NewRecipe {
    NewRecipe {
        name: "Soup".into(),
        notes: Some("simple".into()),
        num_servings: Some(4),
        prep_time: minutes_to_time(Some(15)),
        cook_time: minutes_to_time(Some(30)),
    }
}

#[cfg(test)]
fn salt(recipe_id: RecipeId) -> NewIngredient {
    NewIngredient {
        recipe_id,
        unit_id: None,
        name: "Salt".into(),
        instruction: None,
        amount: Some(0.0),
    }
}

#[cfg(test)]
fn count_rows(repo: &RecipeRepository, recipe_id: RecipeId) -> (i64, i64, i64) {
    use crate::database::schema::{ingredient, recipe_category, step};

    let mut conn = repo.provider.acquire().unwrap();
    let ingredients = ingredient::table
        .filter(ingredient::recipe_id.eq(recipe_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    let steps = step::table
        .filter(step::recipe_id.eq(recipe_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    let links = recipe_category::table
        .filter(recipe_category::recipe_id.eq(recipe_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    (ingredients, steps, links)
}

#[test]
fn insert_then_fetch() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();

    let inserted = repo.insert_recipe(soup()).unwrap();
    assert_eq!(inserted.created_at, None);

    let fetched = repo.fetch_recipe_by_id(inserted.id).unwrap().unwrap();
    assert_eq!(fetched.id, inserted.id);
    assert_eq!(fetched.name, "Soup");
    assert_eq!(fetched.notes.as_deref(), Some("simple"));
    assert_eq!(fetched.num_servings, Some(4));
    assert_eq!(fetched.prep_time, chrono::NaiveTime::from_hms_opt(0, 15, 0));
    assert_eq!(fetched.cook_time, chrono::NaiveTime::from_hms_opt(0, 30, 0));
    assert!(fetched.created_at.is_some());
    assert!(fetched.ingredients.is_empty());
    assert!(fetched.steps.is_empty());
    assert!(fetched.categories.is_empty());
}

#[test]
fn fetch_missing_recipe() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    assert_eq!(repo.fetch_recipe_by_id(RecipeId::from(9999)).unwrap(), None);
}

#[test]
fn fetch_all_recipes_ordered_by_name() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    for name in ["Zucchini Bread", "Apple Pie"] {
        repo.insert_recipe(NewRecipe {
            name: name.into(),
            ..soup()
        })
        .unwrap();
    }

    let names: Vec<_> = repo
        .fetch_all_recipes()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["Apple Pie", "Hot Buttered Toast", "Zucchini Bread"]);
}

#[test]
fn ingredient_order_is_contiguous() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let recipe = repo.insert_recipe(soup()).unwrap();

    assert_eq!(repo.add_ingredient_to_recipe(&salt(recipe.id)).unwrap(), 1);
    let pepper = NewIngredient {
        name: "Pepper".into(),
        unit_id: Some(UnitId::from(1)),
        amount: Some(0.25),
        ..salt(recipe.id)
    };
    assert_eq!(repo.add_ingredient_to_recipe(&pepper).unwrap(), 2);
    for _ in 0..3 {
        repo.add_ingredient_to_recipe(&salt(recipe.id)).unwrap();
    }

    let fetched = repo.fetch_recipe_by_id(recipe.id).unwrap().unwrap();
    let orders: Vec<_> = fetched.ingredients.iter().map(|i| i.order).collect();
    assert_eq!(orders, [1, 2, 3, 4, 5]);
    assert_eq!(fetched.ingredients[0].name, "Salt");
    assert_eq!(fetched.ingredients[1].name, "Pepper");
}

#[test]
fn ingredient_without_unit_is_fetched() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let recipe = repo.insert_recipe(soup()).unwrap();
    repo.add_ingredient_to_recipe(&salt(recipe.id)).unwrap();
    repo.add_ingredient_to_recipe(&NewIngredient {
        name: "Broth".into(),
        unit_id: Some(UnitId::from(3)),
        instruction: Some("warm".into()),
        amount: Some(2.0),
        ..salt(recipe.id)
    })
    .unwrap();

    let ingredients = repo.fetch_recipe_by_id(recipe.id).unwrap().unwrap().ingredients;
    assert_eq!(ingredients.len(), 2);
    assert_eq!(ingredients[0].unit, None);
    assert_eq!(ingredients[0].amount, Some(0.0));
    let cup = ingredients[1].unit.as_ref().unwrap();
    assert_eq!((cup.singular.as_str(), cup.plural.as_str()), ("cup", "cups"));
    assert_eq!(
        ingredients[1].to_string(),
        format!("ID={}: 2 cups Broth, warm", ingredients[1].id)
    );
}

#[test]
fn failed_ingredient_insert_leaves_nothing_behind() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let recipe = repo.insert_recipe(soup()).unwrap();

    // The position is computed, then the insert violates the unit foreign key.
    let bad = NewIngredient {
        unit_id: Some(UnitId::from(9999)),
        ..salt(recipe.id)
    };
    let err = repo.add_ingredient_to_recipe(&bad).unwrap_err();
    assert!(matches!(err, crate::database::Error::Operation(_)), "{err}");
    assert_eq!(count_rows(&repo, recipe.id), (0, 0, 0));

    assert_eq!(repo.add_ingredient_to_recipe(&salt(recipe.id)).unwrap(), 1);
}

#[test]
fn ingredient_for_missing_recipe_fails() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let err = repo
        .add_ingredient_to_recipe(&salt(RecipeId::from(9999)))
        .unwrap_err();
    assert!(matches!(err, crate::database::Error::Operation(_)), "{err}");
}

#[test]
fn steps_are_appended_in_order() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let recipe = repo.insert_recipe(soup()).unwrap();
    for text in ["Boil water", "Add salt", "Serve"] {
        repo.add_step_to_recipe(&NewStep {
            recipe_id: recipe.id,
            text: text.into(),
        })
        .unwrap();
    }

    let steps = repo.fetch_recipe_steps(recipe.id).unwrap();
    let steps: Vec<_> = steps.iter().map(|s| (s.order, s.text.as_str())).collect();
    assert_eq!(steps, [(1, "Boil water"), (2, "Add salt"), (3, "Serve")]);
}

#[test]
fn modify_step() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let recipe = repo.insert_recipe(soup()).unwrap();
    repo.add_step_to_recipe(&NewStep {
        recipe_id: recipe.id,
        text: "Boil water".into(),
    })
    .unwrap();
    let step = repo.fetch_recipe_steps(recipe.id).unwrap().remove(0);

    assert!(repo.modify_recipe_step(step.id, "Boil salted water").unwrap());
    // Setting the same text again still counts as an update.
    assert!(repo.modify_recipe_step(step.id, "Boil salted water").unwrap());
    assert!(!repo.modify_recipe_step(StepId::from(9999), "nothing").unwrap());

    let steps = repo.fetch_recipe_steps(recipe.id).unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].text, "Boil salted water");
    assert_eq!(steps[0].order, 1);
    assert_eq!(steps[0].id, step.id);
}

#[test]
fn categories() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let recipe = repo.insert_recipe(soup()).unwrap();

    assert!(repo.add_category_to_recipe(recipe.id, "Soup").unwrap());
    assert!(repo.add_category_to_recipe(recipe.id, "Vegetarian").unwrap());
    assert!(!repo.add_category_to_recipe(recipe.id, "NoSuchCategory").unwrap());

    let names: HashSet<_> = repo
        .fetch_recipe_by_id(recipe.id)
        .unwrap()
        .unwrap()
        .categories
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, hashset! {"Soup".to_string(), "Vegetarian".to_string()});
}

#[test]
fn delete_cascades() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();
    let recipe = repo.insert_recipe(soup()).unwrap();
    for _ in 0..3 {
        repo.add_ingredient_to_recipe(&salt(recipe.id)).unwrap();
    }
    for text in ["one", "two"] {
        repo.add_step_to_recipe(&NewStep {
            recipe_id: recipe.id,
            text: text.into(),
        })
        .unwrap();
    }
    repo.add_category_to_recipe(recipe.id, "Soup").unwrap();
    assert_eq!(count_rows(&repo, recipe.id), (3, 2, 1));

    assert!(repo.delete_recipe(recipe.id).unwrap());
    assert_eq!(count_rows(&repo, recipe.id), (0, 0, 0));
    assert_eq!(repo.fetch_recipe_by_id(recipe.id).unwrap(), None);

    assert!(!repo.delete_recipe(recipe.id).unwrap());
}

#[test]
fn reference_tables() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();

    let units = repo.fetch_all_units().unwrap();
    assert_eq!(units.first().unwrap().singular, "can");
    assert!(units.windows(2).all(|w| w[0].singular <= w[1].singular));

    let categories = repo.fetch_all_categories().unwrap();
    assert_eq!(categories.first().unwrap().name, "American");
    assert_eq!(categories.len(), 8);
}

#[test]
fn failing_batch_is_rolled_back() {
    let (_dir, service) = bootstrapped();
    let repo = service.repository();

    let statements = vec![
        "INSERT INTO category (category_name) VALUES ('Brunch')".to_string(),
        String::new(),
        "INSERT INTO no_such_table VALUES (1)".to_string(),
    ];
    assert!(repo.execute_batch(&statements).is_err());
    assert!(!repo
        .fetch_all_categories()
        .unwrap()
        .iter()
        .any(|c| c.name == "Brunch"));

    repo.execute_batch(&statements[..2]).unwrap();
    assert!(repo
        .fetch_all_categories()
        .unwrap()
        .iter()
        .any(|c| c.name == "Brunch"));
}
