use std::sync::Arc;

use splice_harness::prelude::*;
use splice_harness::vendors::openai::{OpenAiClientConfig, OpenAiCompatProvider};

// Single pass over a raw (untemplated) prompt against a local server.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let provider = Arc::new(OpenAiCompatProvider::new(
        OpenAiClientConfig::new("http://127.0.0.1:8080").template(TemplateSource::Disabled),
    )?);

    let controller = StreamingController::load(
        provider,
        ModelRef::new("openai-compat", "mlx-community/Qwen3-0.6B-4bit"),
    )
    .await?
    .max_tokens(256);

    let mut sink = TextSink::new(std::io::stdout());
    let outcome = controller
        .run_pass("The three primary colors are", None, &mut sink)
        .await?;

    println!();
    if let Some(reason) = outcome.finish_reason {
        eprintln!("finished: {reason}");
    }
    Ok(())
}
