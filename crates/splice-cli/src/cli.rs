use clap::{Parser, Subcommand};
use splice_harness::PassOutcome;

/// Stream a reasoning model and splice a continuation in after `</think>`.
///
/// Every option falls back to a `SPLICE_*` environment variable (also read
/// from `.env`), then to a built-in default.
#[derive(Debug, Parser)]
#[command(name = "think-splice", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server root of the OpenAI-compatible backend [env: SPLICE_BASE_URL]
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Model identifier sent with every request [env: SPLICE_MODEL]
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// `auto`, `chatml`, `none`, or a tokenizer_config.json / .jinja path [env: SPLICE_CHAT_TEMPLATE]
    #[arg(long, global = true)]
    pub chat_template: Option<String>,

    /// Per-pass token cap [env: SPLICE_MAX_TOKENS]
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Print generation stats after the run
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream one pass and report finish reasons. `</think>` is not watched.
    Stream {
        /// Prompt text [env: SPLICE_PROMPT]
        prompt: Option<String>,
    },
    /// Stream, and once `</think>` shows up resume with the injected continuation (default).
    Splice {
        /// Prompt text [env: SPLICE_PROMPT]
        prompt: Option<String>,
    },
}

/// Verbose summary printed after all passes.
pub fn stats_footer(passes: &[PassOutcome]) -> String {
    let mut out = String::from("==========\n");
    for pass in passes {
        out.push_str(&format!(
            "Generation: {} fragments, {:.3} fragments-per-sec\n",
            pass.fragments,
            pass.fragments_per_sec()
        ));
    }
    out
}
