//! omni-retrieval CLI: query a local corpus or inspect effective settings.
//!
//! Settings come from `packages/conf/retrieval.yaml` and the user config home,
//! optionally layered with `--settings <path>`.
//!
//! Logging: set `RUST_LOG=omni_retrieval=debug` to see per-stage events on stderr.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use omni_retrieval::backends::{CorpusFile, HashEmbedder, InMemoryCorpus};
use omni_retrieval::{
    RetrievalClients, RetrievalConfig, RetrievalEngine, RetrievalSettings, RetrieveRequest,
    load_retrieval_settings, load_retrieval_settings_file,
};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; --verbose on query => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let verbose = matches!(&cli.command, Command::Query { verbose: true, .. });
        EnvFilter::new(if verbose {
            "omni_retrieval=debug"
        } else {
            "omni_retrieval=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Query {
            corpus,
            tenant,
            scope,
            kb,
            top_k,
            verbose: _,
            query,
        } => {
            let raw = std::fs::read_to_string(&corpus)
                .with_context(|| format!("failed to read corpus {}", corpus.display()))?;
            let file: CorpusFile = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse corpus {}", corpus.display()))?;
            let embedder = HashEmbedder::default();
            let index = Arc::new(InMemoryCorpus::with_hash_embedder(file, &embedder));
            let clients = RetrievalClients {
                embedding: Arc::new(embedder),
                vector: index.clone(),
                keyword: index.clone(),
                knowledge_bases: index,
            };
            let engine = RetrievalEngine::new(clients, config)?;

            let mut request = RetrieveRequest::new(query, scope, tenant);
            request.kb_id = kb;
            request.top_k = top_k;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let outcome = engine.retrieve(&request, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::Config => {
            let effective = RetrievalSettings::from(&config);
            print!("{}", serde_yaml::to_string(&effective)?);
            Ok(())
        }
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<RetrievalConfig> {
    let mut settings = load_retrieval_settings();
    if let Some(path) = &cli.settings {
        anyhow::ensure!(path.exists(), "settings file {} not found", path.display());
        settings = settings.merge(load_retrieval_settings_file(path));
    }
    settings
        .into_config()
        .context("invalid retrieval settings")
}
