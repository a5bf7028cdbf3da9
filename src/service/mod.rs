// Copyright 2023 Remi Bernotavicius

use crate::database::models::{
    Category, NewIngredient, NewRecipe, NewStep, Recipe, RecipeId, Step, StepId, Unit,
};
use crate::database::{Error, RecipeRepository, Result};

mod script;

pub use script::sql_statements;

const SCHEMA_SCRIPT: &str = include_str!("../../resources/recipe_schema.sql");
const DATA_SCRIPT: &str = include_str!("../../resources/recipe_data.sql");

/// The recipe-centric API used by the shell. Lookups that find nothing become
/// [`Error::NotFound`].
#[derive(Debug, Clone)]
pub struct RecipeService {
    repository: RecipeRepository,
}

impl RecipeService {
    pub fn new(repository: RecipeRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &RecipeRepository {
        &self.repository
    }

    /// Drops and recreates all the tables, then fills in the units, categories and a sample
    /// recipe.
    pub fn create_and_populate_tables(&self) -> Result<()> {
        self.load_script(SCHEMA_SCRIPT)?;
        self.load_script(DATA_SCRIPT)?;
        log::info!("tables created and populated");
        Ok(())
    }

    pub fn load_script(&self, content: &str) -> Result<()> {
        self.repository.execute_batch(&sql_statements(content))
    }

    /// Returns the recipe with its id. Fetch it again to see its creation time and children.
    pub fn add_recipe(&self, recipe: NewRecipe) -> Result<Recipe> {
        self.repository.insert_recipe(recipe)
    }

    /// All recipes, ordered by id.
    pub fn fetch_recipes(&self) -> Result<Vec<Recipe>> {
        let mut recipes = self.repository.fetch_all_recipes()?;
        recipes.sort_by_key(|r| r.id);
        Ok(recipes)
    }

    pub fn fetch_recipe_by_id(&self, recipe_id: RecipeId) -> Result<Recipe> {
        self.repository
            .fetch_recipe_by_id(recipe_id)?
            .ok_or_else(|| Error::not_found("Recipe", recipe_id))
    }

    pub fn fetch_units(&self) -> Result<Vec<Unit>> {
        self.repository.fetch_all_units()
    }

    pub fn fetch_categories(&self) -> Result<Vec<Category>> {
        self.repository.fetch_all_categories()
    }

    pub fn fetch_steps(&self, recipe_id: RecipeId) -> Result<Vec<Step>> {
        self.repository.fetch_recipe_steps(recipe_id)
    }

    pub fn add_ingredient(&self, ingredient: &NewIngredient) -> Result<()> {
        self.repository.add_ingredient_to_recipe(ingredient)?;
        Ok(())
    }

    pub fn add_step(&self, step: &NewStep) -> Result<()> {
        self.repository.add_step_to_recipe(step)?;
        Ok(())
    }

    /// Fails if no category has the given name.
    pub fn add_category_to_recipe(&self, recipe_id: RecipeId, category: &str) -> Result<()> {
        if !self.repository.add_category_to_recipe(recipe_id, category)? {
            return Err(Error::not_found_by_name("Category", category));
        }
        Ok(())
    }

    pub fn modify_step(&self, step_id: StepId, text: &str) -> Result<()> {
        if !self.repository.modify_recipe_step(step_id, text)? {
            return Err(Error::not_found("Step", step_id));
        }
        Ok(())
    }

    pub fn delete_recipe(&self, recipe_id: RecipeId) -> Result<()> {
        if !self.repository.delete_recipe(recipe_id)? {
            return Err(Error::not_found("Recipe", recipe_id));
        }
        Ok(())
    }
}

#[cfg(test)]
use crate::database::models::{minutes_to_time, UnitId};
#[cfg(test)]
use crate::database::{ConnectionProvider, DatabaseConfig};
#[cfg(test)]
use crate::test_support::bootstrapped;

#[cfg(test)]
fn recipe(name: &str) -> NewRecipe {
    NewRecipe {
        name: name.into(),
        notes: None,
        num_servings: Some(2),
        prep_time: minutes_to_time(Some(5)),
        cook_time: minutes_to_time(None),
    }
}

#[test]
fn bootstrap_is_repeatable() {
    let (_dir, service) = bootstrapped();
    service.add_recipe(recipe("Pancakes")).unwrap();
    assert_eq!(service.fetch_recipes().unwrap().len(), 2);

    service.create_and_populate_tables().unwrap();
    let recipes = service.fetch_recipes().unwrap();
    assert_eq!(recipes.len(), 1);

    let toast = service.fetch_recipe_by_id(recipes[0].id).unwrap();
    assert_eq!(toast.name, "Hot Buttered Toast");
    assert_eq!(toast.ingredients.len(), 2);
    assert_eq!(toast.ingredients[0].unit, None);
    assert_eq!(toast.steps.len(), 2);
    assert_eq!(toast.categories[0].name, "Breakfast");
}

#[test]
fn bootstrap_without_database() {
    let provider =
        ConnectionProvider::new(DatabaseConfig::new("/no/such/directory/recipes.sqlite"));
    let service = RecipeService::new(RecipeRepository::new(provider));
    let err = service.create_and_populate_tables().unwrap_err();
    assert!(matches!(err, Error::Connectivity { .. }), "{err}");
}

#[test]
fn recipes_are_listed_by_id() {
    let (_dir, service) = bootstrapped();
    let b = service.add_recipe(recipe("B")).unwrap();
    let a = service.add_recipe(recipe("A")).unwrap();

    let by_name: Vec<_> = service
        .repository()
        .fetch_all_recipes()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(by_name, ["A", "B", "Hot Buttered Toast"]);

    let ids: Vec<_> = service
        .fetch_recipes()
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, [RecipeId::from(1), b.id, a.id]);
}

#[test]
fn soup_scenario() {
    let (_dir, service) = bootstrapped();
    let soup = service
        .add_recipe(NewRecipe {
            name: "Soup".into(),
            notes: Some("simple".into()),
            num_servings: Some(4),
            prep_time: minutes_to_time(Some(15)),
            cook_time: minutes_to_time(Some(30)),
        })
        .unwrap();

    service
        .add_ingredient(&NewIngredient {
            recipe_id: soup.id,
            unit_id: None,
            name: "Salt".into(),
            instruction: None,
            amount: Some(0.0),
        })
        .unwrap();
    let soup = service.fetch_recipe_by_id(soup.id).unwrap();
    assert_eq!(
        soup.to_string(),
        format!("ID={}: Soup, serves 4, prep 00:15, cook 00:30", soup.id)
    );
    assert_eq!(soup.ingredients[0].order, 1);

    service
        .add_ingredient(&NewIngredient {
            recipe_id: soup.id,
            unit_id: Some(UnitId::from(1)),
            name: "Pepper".into(),
            instruction: Some("ground".into()),
            amount: Some(0.5),
        })
        .unwrap();
    let soup = service.fetch_recipe_by_id(soup.id).unwrap();
    let orders: Vec<_> = soup
        .ingredients
        .iter()
        .map(|i| (i.name.as_str(), i.order))
        .collect();
    assert_eq!(orders, [("Salt", 1), ("Pepper", 2)]);
}

#[test]
fn missing_recipe() {
    let (_dir, service) = bootstrapped();
    let missing = RecipeId::from(9999);

    let err = service.fetch_recipe_by_id(missing).unwrap_err();
    assert_eq!(err.to_string(), "Recipe with ID=9999 does not exist");

    let err = service.delete_recipe(missing).unwrap_err();
    assert!(matches!(err, Error::NotFound { what: "Recipe", .. }), "{err}");
}

#[test]
fn delete_recipe() {
    let (_dir, service) = bootstrapped();
    let r = service.add_recipe(recipe("Gone")).unwrap();
    service.delete_recipe(r.id).unwrap();
    assert!(matches!(
        service.fetch_recipe_by_id(r.id),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn modify_step() {
    let (_dir, service) = bootstrapped();
    let r = service.add_recipe(recipe("Tea")).unwrap();
    service
        .add_step(&NewStep {
            recipe_id: r.id,
            text: "Boil water".into(),
        })
        .unwrap();
    let step = service.fetch_steps(r.id).unwrap().remove(0);

    service.modify_step(step.id, "Boil fresh water").unwrap();
    let r = service.fetch_recipe_by_id(r.id).unwrap();
    assert_eq!(r.steps[0].text, "Boil fresh water");

    let err = service.modify_step(StepId::from(9999), "x").unwrap_err();
    assert_eq!(err.to_string(), "Step with ID=9999 does not exist");
}

#[test]
fn unknown_category_is_reported() {
    let (_dir, service) = bootstrapped();
    let r = service.add_recipe(recipe("Tea")).unwrap();

    let err = service
        .add_category_to_recipe(r.id, "NoSuchCategory")
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { what: "Category", .. }), "{err}");
    assert!(service.fetch_recipe_by_id(r.id).unwrap().categories.is_empty());

    service.add_category_to_recipe(r.id, "Breakfast").unwrap();
    let categories = service.fetch_recipe_by_id(r.id).unwrap().categories;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Breakfast");
}
