//! Flat and nested record extraction.
//!
//! Walks through the basics: extract a flat record, surface a field
//! validation failure immediately (no retries), reject every candidate
//! with a custom predicate no value can satisfy, and extract a nested
//! record with an optional field.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --example user_info
//! ```

#![allow(clippy::print_stdout)]
// The custom-validation section deliberately uses an always-false
// predicate.
#![allow(clippy::impossible_comparisons)]

use distill::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct UserInfo {
    name: String,
    age: i64,
}

#[derive(Debug, Deserialize)]
struct Address {
    street: Option<String>,
    city: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct UserWithAddress {
    name: String,
    age: i64,
    address: Address,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let extractor = Extractor::from_backend(OpenAI::from_env()?);

    // Extract structured data from a text.
    let schema = Schema::new("UserInfo")
        .field(Field::new("name", FieldType::String))
        .field(Field::new("age", FieldType::Integer));

    let request = ExtractRequest::new(schema)
        .user("Hey, I'm John Doe. I'm 30 years old.")
        .model("gpt-4o-mini");

    let user: UserInfo = extractor
        .extract(&request)
        .await?
        .parse()
        .expect("valid UserInfo JSON");
    println!("{}", user.name);
    println!("{}", user.age);

    // Field validation: the text claims a negative age, the schema
    // requires a positive one, and with no retries the violation
    // surfaces immediately.
    let schema = Schema::new("UserInfo")
        .field(Field::new("name", FieldType::String))
        .field(Field::new("age", FieldType::Integer).constraint(Constraint::Positive));

    let request = ExtractRequest::new(schema)
        .user("Hey, I'm John Doe. I'm -10 years old.")
        .model("gpt-4o-mini")
        .max_attempts(0);

    match extractor.extract(&request).await {
        Ok(extraction) => println!("unexpected success: {}", extraction.value),
        Err(err) => println!("validation failed as expected: {err}"),
    }

    // Custom validation: a predicate requiring the age to be both
    // greater than 18 and less than 0. No value satisfies it, the
    // constraint is never relaxed, and with no retries the attempt
    // ends in ExhaustedRetries.
    let schema = Schema::new("UserInfo")
        .field(Field::new("name", FieldType::String))
        .field(
            Field::new("age", FieldType::Integer).constraint(Constraint::predicate(
                "Age must be between 0 and 18",
                |v| v.as_i64().is_some_and(|age| age > 18 && age < 0),
            )),
        );

    let request = ExtractRequest::new(schema)
        .user("Hey, I'm John Doe. I'm 12 years old.")
        .model("gpt-4o-mini")
        .max_attempts(0);

    match extractor.extract(&request).await {
        Ok(extraction) => println!("unexpected success: {}", extraction.value),
        Err(err) => println!("custom validation failed as expected: {err}"),
    }

    // Nested data with an optional field the model may leave out.
    let address = Schema::new("Address")
        .field(Field::new("street", FieldType::optional(FieldType::String)))
        .field(Field::new("city", FieldType::String))
        .field(Field::new("state", FieldType::String));
    let schema = Schema::new("UserWithAddress")
        .field(Field::new("name", FieldType::String))
        .field(Field::new("age", FieldType::Integer))
        .field(Field::new("address", FieldType::Nested(address)));

    let request = ExtractRequest::new(schema)
        .system(
            "You are a helpful assistant that extracts user information from a text. \
             Do not make up any information. Only use the information provided in the \
             text. The only thing you can infer is the state, based on the city name.",
        )
        .user("Hey, I'm John Doe. I live in New York city.")
        .model("gpt-4o-mini")
        .max_attempts(0);

    let extraction = extractor.extract(&request).await?;
    let user: UserWithAddress = extraction.parse().expect("valid UserWithAddress JSON");
    println!("{}", user.name);
    println!("{}", user.age);
    println!("{:?}", user.address);

    Ok(())
}
