//! Recursive schema extraction: a comment tree.
//!
//! A common use case for a recursive schema is a comment thread, where
//! each comment can have subcomments of the same type. The schema refers
//! to itself through a named reference.
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --example comment_tree
//! ```

#![allow(clippy::print_stdout)]

use distill::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Comment {
    text: String,
    subcomments: Vec<Comment>,
}

fn print_comment_tree(comment: &Comment, level: usize) {
    println!("{}- {}", "  ".repeat(level), comment.text);
    for subcomment in &comment.subcomments {
        print_comment_tree(subcomment, level + 1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let extractor = Extractor::from_backend(OpenAI::from_env()?);

    let schema = Schema::new("Comment")
        .field(Field::new("text", FieldType::String))
        .field(Field::new(
            "subcomments",
            FieldType::list(FieldType::reference("Comment")),
        ));

    let query = "Lakers defeat Warriors 124-120 in an absolute thriller! LeBron \
        (35pts/12ast/8reb) and Curry (42pts/8ast) both went OFF but Lakers' defense \
        came up clutch in the final minutes.
        • That block by AD on Wiggins with 45 seconds left was INSANE. Completely changed the momentum.
            • AD's defensive positioning was perfect but let's be real, Wiggins should've pump faked there
        • Curry was absolutely cooking in the 3rd quarter. That stretch of 4 straight threes was vintage Chef
            • Yeah but where was that same energy in the 4th? Only 2 points in the final 6 minutes
                • Lakers' adjustment to put Reaves on him and double off screens worked perfectly
        • LeBron haters real quiet tonight. 35/12/8 at age 39 is ridiculous
            • Both GOATs in their own right, we should appreciate watching them battle";

    let request = ExtractRequest::new(schema)
        .user(query)
        .model("gpt-4o-mini");

    let extraction = extractor.extract(&request).await?;
    let comment: Comment = extraction.parse().expect("valid Comment JSON");
    print_comment_tree(&comment, 0);

    Ok(())
}
