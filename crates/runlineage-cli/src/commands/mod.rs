pub mod logparser;
pub mod parsefile;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use runlineage_engine::sink::{publish_pairs, ConsoleSink, HttpSink, JsonLinesSink};
use runlineage_engine::{DiscardPolicy, ParseOptions, RunIdStrategy};
use runlineage_types::lineage::RunEvent;

/// Flags shared by every command that parses logs.
#[derive(Args, Debug, Default)]
pub struct ParseArgs {
    /// What to do with runs that never log a completion line
    /// (silent, warn, error)
    #[arg(long, global = true)]
    pub on_unterminated: Option<DiscardPolicy>,
    /// Give each run a random id instead of one hashed from its boundary line
    #[arg(long, global = true)]
    pub random_run_ids: bool,
    /// Start a run at the first log line even without a boundary line
    #[arg(long, global = true)]
    pub open_at_start: bool,
    /// YAML file with parse options; flags override it
    #[arg(long, global = true)]
    pub options: Option<PathBuf>,
}

impl ParseArgs {
    pub fn resolve(&self) -> Result<ParseOptions> {
        let mut options = match &self.options {
            Some(path) => ParseOptions::from_yaml_path(path)
                .with_context(|| format!("Failed to load parse options: {}", path.display()))?,
            None => ParseOptions::default(),
        };
        if let Some(policy) = self.on_unterminated {
            options.discard_policy = policy;
        }
        if self.random_run_ids {
            options.run_id = RunIdStrategy::Random;
        }
        if self.open_at_start {
            options.open_at_start = true;
        }
        Ok(options)
    }
}

/// Where lineage events go.
#[derive(Debug, Default)]
pub struct Output {
    pub url: String,
    pub publish: bool,
    pub outfile: Option<PathBuf>,
}

/// Deliver events: to the endpoint if publishing, to the file if given, and
/// to stdout when neither.
pub async fn deliver(pairs: &[(RunEvent, RunEvent)], output: &Output) -> Result<()> {
    if output.publish {
        let mut sink = HttpSink::from_env(output.url.clone())?;
        let posted = publish_pairs(&mut sink, pairs)
            .await
            .with_context(|| format!("Failed to publish to {}", output.url))?;
        tracing::info!(url = %output.url, events = posted, "Published lineage events");
    }

    if let Some(path) = &output.outfile {
        let mut sink = JsonLinesSink::create(path)
            .await
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        publish_pairs(&mut sink, pairs).await?;
    }

    if !output.publish && output.outfile.is_none() {
        publish_pairs(&mut ConsoleSink::stdout(), pairs).await?;
    }
    Ok(())
}
