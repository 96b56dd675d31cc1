//! Routing with conditional logic.
//!
//! First extracts a typed intent from the query, then routes to one of
//! several typed response schemas based on the enumerated intent type.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --example route_intent
//! ```

#![allow(clippy::print_stdout)]

use distill::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Intent {
    #[serde(rename = "type")]
    kind: String,
    query: String,
}

fn intent_schema() -> Schema {
    Schema::new("Intent")
        .field(Field::new(
            "type",
            FieldType::literal(["weather", "stocks", "generic"]),
        ))
        .field(Field::new("query", FieldType::String))
}

fn weather_schema() -> Schema {
    Schema::new("WeatherInfo")
        .field(Field::new("city", FieldType::String))
        .field(Field::new("temperature", FieldType::Float))
        .field(Field::new("condition", FieldType::String))
}

fn stock_schema() -> Schema {
    Schema::new("StockInfo")
        .field(Field::new("ticker", FieldType::String).constraint(Constraint::NonEmpty))
        .field(Field::new("price", FieldType::Float))
        .field(Field::new("daily_change", FieldType::Float))
}

fn generic_schema() -> Schema {
    Schema::new("GenericResponse").field(Field::new("response", FieldType::String))
}

async fn get_intent(extractor: &Extractor, query: &str) -> Result<Intent> {
    let request = ExtractRequest::new(intent_schema())
        .user(format!("Determine the intent of the following query: {query}"))
        .model("gpt-4o-mini")
        .max_attempts(0);

    let extraction = extractor.extract(&request).await?;
    Ok(extraction.parse().expect("valid Intent JSON"))
}

async fn process_user_query(extractor: &Extractor, query: &str) -> Result<()> {
    let intent = get_intent(extractor, query).await?;

    let schema = match intent.kind.as_str() {
        "weather" => weather_schema(),
        "stocks" => stock_schema(),
        _ => generic_schema(),
    };

    let request = ExtractRequest::new(schema).user(query).model("gpt-4o-mini");
    let extraction = extractor.extract(&request).await?;
    println!("[{}] {}", intent.kind, extraction.value);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let extractor = Extractor::from_backend(OpenAI::from_env()?);

    let intent = get_intent(&extractor, "What is the weather in Tokyo?").await?;
    println!("{}", intent.kind);
    println!("{}", intent.query);

    process_user_query(&extractor, "What is the weather in Tokyo?").await?;
    process_user_query(&extractor, "What is the stock price of Apple?").await?;
    process_user_query(&extractor, "Tell me a bear joke").await?;

    Ok(())
}
