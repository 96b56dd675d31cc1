//! Single-label classification with a reasoning trace.
//!
//! The schema pairs an enumerated label with a free-text chain of
//! thought, and the system prompt carries a few-shot example set.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --example classify
//! ```

#![allow(clippy::print_stdout)]

use distill::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    chain_of_thought: String,
    label: String,
}

fn classification_schema() -> Schema {
    Schema::new("ClassificationResponse")
        .description(
            "A few-shot example of a spam detector.\n\
             Examples:\n\
             - \"Buy cheap tickets to any game!\": SPAM\n\
             - \"Meeting at 10am tomorrow in the conference room.\": NOT_SPAM\n\
             - \"Get rich quick! Work from home!\": SPAM\n\
             - \"Can you review this document by EOD?\": NOT_SPAM\n\
             - \"CONGRATULATIONS! You've won $1,000,000!!!\": SPAM\n\
             - \"The project deadline has been extended to Friday\": NOT_SPAM",
        )
        .field(
            Field::new("chain_of_thought", FieldType::String)
                .description("The chain of thought that led to the classification"),
        )
        .field(
            Field::new("label", FieldType::literal(["SPAM", "NOT_SPAM"]))
                .description("The predicted class label"),
        )
}

async fn classify(extractor: &Extractor, data: &str) -> Result<ClassificationResponse> {
    let request = ExtractRequest::new(classification_schema())
        .user(format!("Classify the following message: {data}"))
        .model("gpt-4o-mini");

    let extraction = extractor.extract(&request).await?;
    Ok(extraction.parse().expect("valid ClassificationResponse JSON"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let extractor = Extractor::from_backend(OpenAI::from_env()?);

    for data in [
        "Click here to claim your free iPhone 13!",
        "The quarterly report is ready for your review.",
        "URGENT: Your account will be suspended unless you verify now!",
        "Could you send me the meeting notes from yesterday?",
    ] {
        let prediction = classify(&extractor, data).await?;
        println!("Text: {data} -- Prediction: {}", prediction.label);
        println!("  Reasoning: {}", prediction.chain_of_thought);
    }

    Ok(())
}
