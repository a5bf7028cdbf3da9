// Copyright 2023 Remi Bernotavicius

use crate::database::models::{
    minutes_to_time, NewIngredient, NewRecipe, NewStep, Recipe, RecipeId, StepId, UnitId,
};
use crate::service::RecipeService;
use derive_more::Display;
use input::{parse_amount, parse_int, required, InputError};
use std::io::{BufRead, Write};
use strum::EnumIter;

mod input;

#[derive(Debug, Display, EnumIter, Copy, Clone, PartialEq, Eq)]
enum Operation {
    #[display("Create and populate all tables")]
    CreateTables,
    #[display("Add a recipe")]
    AddRecipe,
    #[display("List recipes")]
    ListRecipes,
    #[display("Select current recipe")]
    SelectRecipe,
    #[display("Add ingredient to current recipe")]
    AddIngredient,
    #[display("Add step to current recipe")]
    AddStep,
    #[display("Add category to current recipe")]
    AddCategory,
    #[display("Modify step in current recipe")]
    ModifyStep,
    #[display("Delete a recipe")]
    DeleteRecipe,
}

impl Operation {
    fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    /// Operations are numbered from 1 in the menu.
    fn from_number(n: i32) -> Option<Self> {
        let index = usize::try_from(n).ok()?.checked_sub(1)?;
        Self::iter().nth(index)
    }
}

/// The interactive menu. Reads commands from `input` and writes everything for the user to
/// `output`. A failed command is reported and the loop carries on.
pub struct Shell<R, W> {
    service: RecipeService,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(service: RecipeService, input: R, output: W) -> Self {
        Self {
            service,
            input,
            output,
        }
    }

    /// Runs until the user enters a blank operation or the input ends.
    pub fn run(&mut self) -> crate::Result<()> {
        let mut current = None;
        loop {
            match self.step(&mut current) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => writeln!(self.output, "\nError: {e} Try again.")?,
            }
        }
        writeln!(self.output, "\nExiting the menu. TTFN!")?;
        Ok(())
    }

    fn step(&mut self, current: &mut Option<Recipe>) -> crate::Result<bool> {
        self.print_operations(current.as_ref())?;
        let Some(n) = self.int_input("\nEnter an operation number (press Enter to quit)")? else {
            return Ok(false);
        };

        let Some(operation) = Operation::from_number(n) else {
            writeln!(self.output, "\n{n} is not valid. Try again.")?;
            return Ok(true);
        };

        log::debug!("running {operation:?}");
        match operation {
            Operation::CreateTables => self.create_tables()?,
            Operation::AddRecipe => self.add_recipe(current)?,
            Operation::ListRecipes => {
                self.list_recipes()?;
            }
            Operation::SelectRecipe => self.select_recipe(current)?,
            Operation::AddIngredient => self.add_ingredient(current)?,
            Operation::AddStep => self.add_step(current)?,
            Operation::AddCategory => self.add_category(current)?,
            Operation::ModifyStep => self.modify_step(current)?,
            Operation::DeleteRecipe => self.delete_recipe(current)?,
        }
        Ok(true)
    }

    fn print_operations(&mut self, current: Option<&Recipe>) -> crate::Result<()> {
        writeln!(self.output, "\nHere's what you can do:")?;
        for (n, operation) in Operation::iter().enumerate() {
            writeln!(self.output, "   {}) {operation}", n + 1)?;
        }
        match current {
            Some(recipe) => writeln!(self.output, "\nYou are working with recipe {recipe:#}")?,
            None => writeln!(self.output, "\nYou are not working with a recipe.")?,
        }
        Ok(())
    }

    /// Blank input (or the end of input) is `None`.
    fn string_input(&mut self, prompt: &str) -> crate::Result<Option<String>> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let line = line.trim();
        Ok((!line.is_empty()).then(|| line.to_owned()))
    }

    fn int_input<T: std::str::FromStr>(&mut self, prompt: &str) -> crate::Result<Option<T>> {
        Ok(self
            .string_input(prompt)?
            .map(|s| parse_int(&s))
            .transpose()?)
    }

    fn amount_input(&mut self, prompt: &str) -> crate::Result<Option<f64>> {
        Ok(self
            .string_input(prompt)?
            .map(|s| parse_amount(&s))
            .transpose()?)
    }

    fn minutes_input(&mut self, prompt: &str) -> crate::Result<Option<chrono::NaiveTime>> {
        let minutes: Option<u32> = self.int_input(prompt)?;
        let time = minutes_to_time(minutes).ok_or(InputError::TooLong {
            minutes: minutes.unwrap_or_default(),
        })?;
        Ok(Some(time))
    }

    fn require_current<'a>(
        &mut self,
        current: &'a Option<Recipe>,
    ) -> crate::Result<Option<&'a Recipe>> {
        if current.is_none() {
            writeln!(self.output, "\nPlease select a recipe first.")?;
        }
        Ok(current.as_ref())
    }

    fn create_tables(&mut self) -> crate::Result<()> {
        self.service.create_and_populate_tables()?;
        writeln!(self.output, "\nTables created and populated!")?;
        Ok(())
    }

    fn add_recipe(&mut self, current: &mut Option<Recipe>) -> crate::Result<()> {
        let name = required(self.string_input("Enter the recipe name")?, "recipe name")?;
        let notes = self.string_input("Enter the recipe notes")?;
        let num_servings = self.int_input("Enter number of servings")?;
        let prep_time = self.minutes_input("Enter prep time in minutes")?;
        let cook_time = self.minutes_input("Enter cook time in minutes")?;

        let recipe = self.service.add_recipe(NewRecipe {
            name,
            notes,
            num_servings,
            prep_time,
            cook_time,
        })?;
        writeln!(self.output, "You added this recipe:\n{recipe}")?;

        *current = Some(self.service.fetch_recipe_by_id(recipe.id)?);
        Ok(())
    }

    fn list_recipes(&mut self) -> crate::Result<Vec<Recipe>> {
        let recipes = self.service.fetch_recipes()?;
        writeln!(self.output, "\nRecipes:")?;
        for recipe in &recipes {
            writeln!(self.output, "   {}: {}", recipe.id, recipe.name)?;
        }
        Ok(recipes)
    }

    fn select_recipe(&mut self, current: &mut Option<Recipe>) -> crate::Result<()> {
        let recipes = self.list_recipes()?;
        let recipe_id = self.int_input::<i32>("Select a recipe ID")?.map(RecipeId::from);

        *current = None;
        if let Some(recipe_id) = recipe_id.filter(|id| recipes.iter().any(|r| r.id == *id)) {
            *current = Some(self.service.fetch_recipe_by_id(recipe_id)?);
        }

        if current.is_none() {
            writeln!(self.output, "\nInvalid recipe selected.")?;
        }
        Ok(())
    }

    fn add_ingredient(&mut self, current: &mut Option<Recipe>) -> crate::Result<()> {
        let Some(recipe_id) = self.require_current(current)?.map(|r| r.id) else {
            return Ok(());
        };

        let name = required(self.string_input("Enter the ingredient name")?, "ingredient name")?;
        let instruction =
            self.string_input("Enter string instruction if any (like finely chopped)")?;
        let amount = self.amount_input("Enter the ingredient input amount (like .25)")?;

        writeln!(self.output, "Units:")?;
        for unit in self.service.fetch_units()? {
            writeln!(self.output, "    {unit}")?;
        }
        let unit_id = self
            .int_input::<i32>("Enter a unit ID (press Enter for none)")?
            .map(UnitId::from);

        self.service.add_ingredient(&NewIngredient {
            recipe_id,
            unit_id,
            name,
            instruction,
            amount,
        })?;
        *current = Some(self.service.fetch_recipe_by_id(recipe_id)?);
        Ok(())
    }

    fn add_step(&mut self, current: &mut Option<Recipe>) -> crate::Result<()> {
        let Some(recipe_id) = self.require_current(current)?.map(|r| r.id) else {
            return Ok(());
        };

        if let Some(text) = self.string_input("Enter the step text")? {
            self.service.add_step(&NewStep { recipe_id, text })?;
            *current = Some(self.service.fetch_recipe_by_id(recipe_id)?);
        }
        Ok(())
    }

    fn add_category(&mut self, current: &mut Option<Recipe>) -> crate::Result<()> {
        let Some(recipe_id) = self.require_current(current)?.map(|r| r.id) else {
            return Ok(());
        };

        for category in self.service.fetch_categories()? {
            writeln!(self.output, "     {category}")?;
        }
        if let Some(category) = self.string_input("Enter the category to add")? {
            self.service.add_category_to_recipe(recipe_id, &category)?;
            *current = Some(self.service.fetch_recipe_by_id(recipe_id)?);
        }
        Ok(())
    }

    fn modify_step(&mut self, current: &mut Option<Recipe>) -> crate::Result<()> {
        let Some(recipe_id) = self.require_current(current)?.map(|r| r.id) else {
            return Ok(());
        };

        writeln!(self.output, "\nSteps for current recipe")?;
        for step in self.service.fetch_steps(recipe_id)? {
            writeln!(self.output, "     {step}")?;
        }

        let Some(step_id) = self
            .int_input::<i32>("Enter step ID of step to modify")?
            .map(StepId::from)
        else {
            return Ok(());
        };
        if let Some(text) = self.string_input("Enter new step text")? {
            self.service.modify_step(step_id, &text)?;
            *current = Some(self.service.fetch_recipe_by_id(recipe_id)?);
        }
        Ok(())
    }

    fn delete_recipe(&mut self, current: &mut Option<Recipe>) -> crate::Result<()> {
        self.list_recipes()?;
        let Some(recipe_id) = self
            .int_input::<i32>("Enter the ID of the recipe to delete")?
            .map(RecipeId::from)
        else {
            return Ok(());
        };

        self.service.delete_recipe(recipe_id)?;
        writeln!(self.output, "You have deleted recipe {recipe_id}")?;
        if current.as_ref().is_some_and(|r| r.id == recipe_id) {
            *current = None;
        }
        Ok(())
    }
}

#[cfg(test)]
use crate::test_support::bootstrapped;
#[cfg(test)]
use std::io::Cursor;

#[cfg(test)]
fn run_shell(service: RecipeService, script: &str) -> String {
    let mut output = vec![];
    Shell::new(service, Cursor::new(script.to_owned()), &mut output)
        .run()
        .unwrap();
    String::from_utf8(output).unwrap()
}

#[test]
fn operation_numbers() {
    assert_eq!(Operation::from_number(1), Some(Operation::CreateTables));
    assert_eq!(Operation::from_number(9), Some(Operation::DeleteRecipe));
    assert_eq!(Operation::from_number(0), None);
    assert_eq!(Operation::from_number(10), None);
    assert_eq!(Operation::from_number(-1), None);
}

#[test]
fn blank_input_quits() {
    let (_dir, service) = bootstrapped();
    let output = run_shell(service, "\n");
    assert!(output.contains("   1) Create and populate all tables\n"));
    assert!(output.contains("   9) Delete a recipe\n"));
    assert!(output.contains("You are not working with a recipe."));
    assert!(output.ends_with("\nExiting the menu. TTFN!\n"));
}

#[test]
fn errors_do_not_stop_the_loop() {
    let (_dir, service) = bootstrapped();
    let output = run_shell(service, "twelve\n12\n5\n9\n9999\n");
    assert!(output.contains("\nError: twelve is not a valid number. Try again.\n"));
    assert!(output.contains("\n12 is not valid. Try again.\n"));
    assert!(output.contains("\nPlease select a recipe first.\n"));
    assert!(output.contains("\nError: Recipe with ID=9999 does not exist Try again.\n"));
    assert!(output.ends_with("TTFN!\n"));
}

#[test]
fn build_a_recipe() {
    let (_dir, service) = bootstrapped();
    let script = "\
        2\nSoup\nsimple\n4\n15\n30\n\
        5\nSalt\n\n\n\n\
        5\nCarrots\nthinly sliced\n.25\n3\n\
        6\nBoil water\n\
        7\nSoup\n\
        7\nNoSuchCategory\n\
        \n";
    let output = run_shell(service.clone(), script);
    assert!(output.contains(
        "You added this recipe:\nID=2: Soup, serves 4, prep 00:15, cook 00:30\n"
    ));
    assert!(output.contains("    3: cup (cups)\n"));
    assert!(output.contains("     Soup\n"));
    assert!(output
        .contains("Error: Category named \"NoSuchCategory\" does not exist Try again."));
    assert!(output.contains("You are working with recipe ID=2: Soup"));

    let soup = service.fetch_recipe_by_id(RecipeId::from(2)).unwrap();
    let ingredients: Vec<_> = soup.ingredients.iter().map(|i| i.to_string()).collect();
    assert_eq!(ingredients, ["ID=3: Salt", "ID=4: 1/4 cup Carrots, thinly sliced"]);
    assert_eq!(soup.steps[0].text, "Boil water");
    assert_eq!(soup.categories[0].name, "Soup");
}

#[test]
fn select_modify_and_delete() {
    let (_dir, service) = bootstrapped();
    let script = "\
        4\n7\n\
        4\n1\n\
        8\n1\nToast the bread until golden\n\
        9\n1\n\
        \n";
    let output = run_shell(service.clone(), script);
    assert!(output.contains("\nRecipes:\n   1: Hot Buttered Toast\n"));
    assert!(output.contains("\nInvalid recipe selected.\n"));
    assert!(output.contains("     ID=1: 1. Toast the bread\n"));
    assert!(output.contains("ID=1: 1. Toast the bread until golden"));
    assert!(output.contains("You have deleted recipe 1\n"));

    // Deleting the selected recipe unselects it.
    let last_menu = output.rsplit("Here's what you can do:").next().unwrap();
    assert!(last_menu.contains("You are not working with a recipe."));
    assert!(service.fetch_recipes().unwrap().is_empty());
}
