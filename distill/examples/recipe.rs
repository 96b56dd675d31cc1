//! Dynamic prompting with nested list extraction.
//!
//! Builds a recipe from a caller-supplied ingredient list, with nested
//! ingredient records and per-field descriptions steering the model.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --example recipe
//! ```

#![allow(clippy::print_stdout)]

use distill::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Ingredient {
    name: String,
    quantity: i64,
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Recipe {
    name: String,
    ingredients: Vec<Ingredient>,
    steps: Vec<String>,
}

fn recipe_schema() -> Schema {
    let ingredient = Schema::new("Ingredient")
        .field(Field::new("name", FieldType::String))
        .field(Field::new("quantity", FieldType::Integer).constraint(Constraint::Positive))
        .field(
            Field::new("unit", FieldType::optional(FieldType::String))
                .description("The unit of measurement. It should always be singular"),
        );

    Schema::new("Recipe")
        .field(Field::new("name", FieldType::String).description(
            "The name of the recipe. It should be creative like a title of a movie or a song",
        ))
        .field(
            Field::new("ingredients", FieldType::list(FieldType::Nested(ingredient)))
                .description("A list of ingredients"),
        )
        .field(
            Field::new("steps", FieldType::list(FieldType::String))
                .constraint(Constraint::NonEmpty),
        )
}

async fn get_recipe(extractor: &Extractor, ingredients: &str) -> Result<Recipe> {
    let request = ExtractRequest::new(recipe_schema())
        .user(format!(
            "Create a recipe using the following ingredients: {ingredients}"
        ))
        .model("gpt-4o-mini")
        .temperature(1.0);

    let extraction = extractor.extract(&request).await?;
    Ok(extraction.parse().expect("valid Recipe JSON"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let extractor = Extractor::from_backend(OpenAI::from_env()?);

    let recipe = get_recipe(&extractor, "rice, beans, tomato, onion").await?;
    println!("{}", recipe.name);
    for ingredient in &recipe.ingredients {
        println!(
            "- {} {} {}",
            ingredient.quantity,
            ingredient.unit.as_deref().unwrap_or(""),
            ingredient.name
        );
    }
    for (i, step) in recipe.steps.iter().enumerate() {
        println!("{}. {step}", i + 1);
    }

    Ok(())
}
