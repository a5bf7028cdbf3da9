// Copyright 2023 Remi Bernotavicius

use chrono::{NaiveDateTime, NaiveTime};
use derive_more::{Display, From};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::Insertable;
use diesel_derive_newtype::DieselNewType;
use std::fmt;

#[derive(DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct RecipeId(i32);

#[derive(DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct IngredientId(i32);

#[derive(DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct StepId(i32);

#[derive(DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct CategoryId(i32);

#[derive(DieselNewType, Debug, Display, From, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct UnitId(i32);

/// A recipe as it is stored, without any of its children.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::database::schema::recipe)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecipeRow {
    #[diesel(column_name = recipe_id)]
    pub id: RecipeId,
    #[diesel(column_name = recipe_name)]
    pub name: String,
    pub notes: Option<String>,
    pub num_servings: Option<i32>,
    pub prep_time: Option<NaiveTime>,
    pub cook_time: Option<NaiveTime>,
    pub created_at: NaiveDateTime,
}

/// The caller-supplied part of a recipe. The store assigns the id and the creation timestamp.
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipe)]
pub struct NewRecipe {
    #[diesel(column_name = recipe_name)]
    pub name: String,
    pub notes: Option<String>,
    pub num_servings: Option<i32>,
    pub prep_time: Option<NaiveTime>,
    pub cook_time: Option<NaiveTime>,
}

impl NewRecipe {
    /// The recipe as it looks right after insertion: it has an id, but no creation timestamp until
    /// it is fetched again.
    pub fn with_id(self, id: RecipeId) -> Recipe {
        Recipe {
            id,
            name: self.name,
            notes: self.notes,
            num_servings: self.num_servings,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            created_at: None,
            ingredients: vec![],
            steps: vec![],
            categories: vec![],
        }
    }
}

/// The recipe aggregate: the recipe row plus its ordered ingredients, ordered steps and
/// categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub notes: Option<String>,
    pub num_servings: Option<i32>,
    pub prep_time: Option<NaiveTime>,
    pub cook_time: Option<NaiveTime>,
    pub created_at: Option<NaiveDateTime>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub categories: Vec<Category>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            notes: row.notes,
            num_servings: row.num_servings,
            prep_time: row.prep_time,
            cook_time: row.cook_time,
            created_at: Some(row.created_at),
            ingredients: vec![],
            steps: vec![],
            categories: vec![],
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::unit)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Unit {
    #[diesel(column_name = unit_id)]
    pub id: UnitId,
    #[diesel(column_name = unit_name_singular)]
    pub singular: String,
    #[diesel(column_name = unit_name_plural)]
    pub plural: String,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::ingredient)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IngredientRow {
    #[diesel(column_name = ingredient_id)]
    pub id: IngredientId,
    pub recipe_id: RecipeId,
    #[diesel(column_name = ingredient_name)]
    pub name: String,
    pub instruction: Option<String>,
    #[diesel(column_name = ingredient_order)]
    pub order: i32,
    pub amount: Option<f64>,
}

/// An ingredient of a recipe along with its unit, if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub id: IngredientId,
    pub recipe_id: RecipeId,
    pub unit: Option<Unit>,
    pub name: String,
    pub instruction: Option<String>,
    pub order: i32,
    pub amount: Option<f64>,
}

impl From<(IngredientRow, Option<Unit>)> for Ingredient {
    fn from((row, unit): (IngredientRow, Option<Unit>)) -> Self {
        Self {
            id: row.id,
            recipe_id: row.recipe_id,
            unit,
            name: row.name,
            instruction: row.instruction,
            order: row.order,
            amount: row.amount,
        }
    }
}

/// An ingredient to append to a recipe. Its position is assigned when it is inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIngredient {
    pub recipe_id: RecipeId,
    pub unit_id: Option<UnitId>,
    pub name: String,
    pub instruction: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::step)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Step {
    #[diesel(column_name = step_id)]
    pub id: StepId,
    pub recipe_id: RecipeId,
    #[diesel(column_name = step_order)]
    pub order: i32,
    #[diesel(column_name = step_text)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStep {
    pub recipe_id: RecipeId,
    pub text: String,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::category)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Category {
    #[diesel(column_name = category_id)]
    pub id: CategoryId,
    #[diesel(column_name = category_name)]
    pub name: String,
}

/// Durations are stored as a time of day. 90 minutes becomes 01:30. Returns `None` when the total
/// doesn't fit in a day.
pub fn minutes_to_time(minutes: Option<u32>) -> Option<NaiveTime> {
    let minutes = minutes.unwrap_or(0);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

const FRACTIONS: [(f64, &str); 9] = [
    (1.0 / 8.0, "1/8"),
    (1.0 / 4.0, "1/4"),
    (1.0 / 3.0, "1/3"),
    (3.0 / 8.0, "3/8"),
    (1.0 / 2.0, "1/2"),
    (5.0 / 8.0, "5/8"),
    (2.0 / 3.0, "2/3"),
    (3.0 / 4.0, "3/4"),
    (7.0 / 8.0, "7/8"),
];

/// Writes an amount the way it reads in a cookbook, 1.5 is "1 1/2".
pub fn to_fraction(amount: f64) -> String {
    const EPSILON: f64 = 0.01;

    if amount < 0.0 {
        return format!("-{}", to_fraction(-amount));
    }

    let whole = amount.trunc();
    let rest = amount - whole;
    if rest < EPSILON {
        return format!("{}", whole as i64);
    }
    if rest > 1.0 - EPSILON {
        return format!("{}", whole as i64 + 1);
    }

    match FRACTIONS.iter().find(|(v, _)| (rest - v).abs() < EPSILON) {
        Some((_, f)) if whole == 0.0 => f.to_string(),
        Some((_, f)) => format!("{} {f}", whole as i64),
        None => format!("{amount}"),
    }
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

impl fmt::Display for Recipe {
    /// One line normally, the whole aggregate with `{:#}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID={}: {}", self.id, self.name)?;
        if let Some(servings) = self.num_servings {
            write!(f, ", serves {servings}")?;
        }
        write!(
            f,
            ", prep {}, cook {}",
            format_time(self.prep_time),
            format_time(self.cook_time)
        )?;
        if !f.alternate() {
            return Ok(());
        }

        if let Some(notes) = &self.notes {
            write!(f, "\n  Notes: {notes}")?;
        }
        if let Some(created_at) = &self.created_at {
            write!(f, "\n  Created: {}", created_at.format("%Y-%m-%d %H:%M"))?;
        }
        write!(f, "\n  Ingredients:")?;
        for i in &self.ingredients {
            write!(f, "\n    {i}")?;
        }
        write!(f, "\n  Steps:")?;
        for s in &self.steps {
            write!(f, "\n    {s}")?;
        }
        write!(f, "\n  Categories:")?;
        for c in &self.categories {
            write!(f, "\n    {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID={}: ", self.id)?;

        let amount = self.amount.unwrap_or(0.0);
        if amount != 0.0 {
            write!(f, "{} ", to_fraction(amount))?;
        }
        if let Some(unit) = &self.unit {
            let word = if amount > 1.0 {
                &unit.plural
            } else {
                &unit.singular
            };
            write!(f, "{word} ")?;
        }

        write!(f, "{}", self.name)?;
        if let Some(instruction) = &self.instruction {
            write!(f, ", {instruction}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID={}: {}. {}", self.id, self.order, self.text)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.id, self.singular, self.plural)
    }
}

#[test]
fn fractions() {
    assert_eq!(to_fraction(2.0), "2");
    assert_eq!(to_fraction(0.25), "1/4");
    assert_eq!(to_fraction(1.5), "1 1/2");
    assert_eq!(to_fraction(0.33), "1/3");
    assert_eq!(to_fraction(2.67), "2 2/3");
    assert_eq!(to_fraction(0.13), "1/8");
    assert_eq!(to_fraction(1.999), "2");
    assert_eq!(to_fraction(0.9), "0.9");
    assert_eq!(to_fraction(-0.5), "-1/2");
    assert_eq!(to_fraction(-1.5), "-1 1/2");
}

#[test]
fn ingredient_display() {
    let tablespoon = Unit {
        id: UnitId(2),
        singular: "tablespoon".into(),
        plural: "tablespoons".into(),
    };
    let mut ingredient = Ingredient {
        id: IngredientId(5),
        recipe_id: RecipeId(1),
        unit: Some(tablespoon),
        name: "butter".into(),
        instruction: Some("softened".into()),
        order: 1,
        amount: Some(1.5),
    };
    assert_eq!(ingredient.to_string(), "ID=5: 1 1/2 tablespoons butter, softened");

    ingredient.amount = Some(0.25);
    assert_eq!(ingredient.to_string(), "ID=5: 1/4 tablespoon butter, softened");

    ingredient.unit = None;
    ingredient.instruction = None;
    ingredient.amount = Some(0.0);
    ingredient.name = "salt".into();
    assert_eq!(ingredient.to_string(), "ID=5: salt");
}

#[test]
fn recipe_display() {
    let recipe = NewRecipe {
        name: "Soup".into(),
        notes: Some("simple".into()),
        num_servings: Some(4),
        prep_time: minutes_to_time(Some(15)),
        cook_time: minutes_to_time(Some(90)),
    }
    .with_id(RecipeId(7));

    assert_eq!(recipe.to_string(), "ID=7: Soup, serves 4, prep 00:15, cook 01:30");
    assert_eq!(
        format!("{recipe:#}"),
        "ID=7: Soup, serves 4, prep 00:15, cook 01:30\n  \
         Notes: simple\n  \
         Ingredients:\n  \
         Steps:\n  \
         Categories:"
    );
}

#[test]
fn minutes_to_time_of_day() {
    assert_eq!(minutes_to_time(None), NaiveTime::from_hms_opt(0, 0, 0));
    assert_eq!(minutes_to_time(Some(15)), NaiveTime::from_hms_opt(0, 15, 0));
    assert_eq!(minutes_to_time(Some(150)), NaiveTime::from_hms_opt(2, 30, 0));
    assert_eq!(minutes_to_time(Some(24 * 60)), None);
}
