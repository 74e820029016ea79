use std::path::PathBuf;

use clap::{Parser, Subcommand};

use omni_retrieval::ScopeMode;

#[derive(Parser)]
#[command(name = "omni-retrieval")]
#[command(about = "Hybrid vector + keyword retrieval over a local corpus, scoped per tenant.")]
pub(crate) struct Cli {
    /// Extra settings YAML layered over the system and user settings files.
    #[arg(long, global = true)]
    pub(crate) settings: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one retrieval and print `{results, warnings}` as JSON.
    Query {
        /// Corpus JSON (`{"documents": [...], "knowledge_bases": [...]}`).
        #[arg(long)]
        corpus: PathBuf,

        /// Requesting tenant id.
        #[arg(long)]
        tenant: String,

        /// unified | user_only | system_only | specific_kb
        #[arg(long, default_value = "unified")]
        scope: ScopeMode,

        /// Knowledge base id (required with `--scope specific_kb`).
        #[arg(long)]
        kb: Option<String>,

        /// Result cap override.
        #[arg(long)]
        top_k: Option<usize>,

        /// Debug logging for retrieval stages.
        #[arg(long, short)]
        verbose: bool,

        /// Query text.
        query: String,
    },
    /// Print the effective configuration as YAML.
    Config,
}
