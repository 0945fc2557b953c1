//! `think-splice`: stream a reasoning model from an OpenAI-compatible server
//! and, in splice mode, resume it once with an injected continuation after it
//! closes its reasoning block.

mod cli;
mod config;
mod observability;

use std::sync::Arc;

use clap::Parser as _;
use splice_harness::prelude::*;
use splice_harness::vendors::openai::OpenAiCompatProvider;
use tracing::info;

use crate::cli::Cli;
use crate::config::{Mode, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    config::init();
    observability::init_observability();

    let settings = Settings::from_env(Cli::parse())?;
    info!(model = %settings.model, base_url = %settings.base_url, mode = ?settings.mode, template = ?settings.template, "starting");

    let provider = Arc::new(OpenAiCompatProvider::new(settings.client_config())?);
    let mut controller = StreamingController::load(provider, settings.model_ref())
        .await?
        .max_tokens(settings.max_tokens);

    let mut sink = TextSink::new(std::io::stdout().lock());
    let passes = match settings.mode {
        Mode::Stream => vec![controller.stream(&settings.prompt, &mut sink).await?],
        Mode::Splice => {
            let report = controller.run(&settings.prompt, &mut sink).await?;
            info!(transitions = ?report.transitions, "splice run finished");
            report.passes().cloned().collect()
        }
    };
    sink.fragment("\n")?;
    if settings.verbose {
        sink.fragment(&cli::stats_footer(&passes))?;
    }
    Ok(())
}
