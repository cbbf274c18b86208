use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qna_core::{best_match, AnswerSource, Question};
use qna_engine::{resolve_question, EngineConfig};
use qna_kb::EntryStore;
use qna_llm::LlmProvider;

#[derive(Parser, Debug)]
#[command(name = "qna", version, about = "Knowledge-base answering with generative fallback")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question, delegating to the configured provider when the
    /// knowledge base has no confident match.
    Ask {
        question: Vec<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Show the best knowledge-base match without calling the provider.
    Match { question: Vec<String> },
    /// List the entries currently served by the knowledge base.
    Entries {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    let mut config = EngineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask {
            question,
            provider,
            model,
            json,
        } => {
            if let Some(name) = provider {
                config.provider = LlmProvider::from_str(&name)
                    .ok_or_else(|| anyhow!("unknown provider {name}"))?;
                config.model = config.provider.default_model().to_string();
            }
            if let Some(model) = model {
                config.model = model;
            }
            run_ask(&config, &join_words(question)?, json).await
        }
        Commands::Match { question } => run_match(&config, &join_words(question)?).await,
        Commands::Entries { json } => run_entries(&config, json).await,
    }
}

fn join_words(words: Vec<String>) -> Result<String> {
    if words.is_empty() {
        return Err(anyhow!("a question is required"));
    }
    Ok(words.join(" "))
}

async fn run_ask(config: &EngineConfig, raw: &str, json: bool) -> Result<()> {
    let question = Question::parse(raw)?;
    let store = EntryStore::new(config.entry_source()?, config.kb_ttl);
    let provider = config.llm_client()?;
    let result = resolve_question(&store, &provider, &question, &config.policy()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    println!("{}", result.answer);
    match result.source {
        AnswerSource::Sheet => {
            if let Some(reasoning) = &result.reasoning {
                eprintln!("[source: sheet] {reasoning}");
            }
        }
        AnswerSource::Fallback => eprintln!(
            "[source: fallback via {} {}]",
            provider.provider().as_str(),
            provider.model()
        ),
    }
    Ok(())
}

async fn run_match(config: &EngineConfig, raw: &str) -> Result<()> {
    let question = Question::parse(raw)?;
    let store = EntryStore::new(config.entry_source()?, config.kb_ttl);
    let entries = store.entries().await?;
    match best_match(&entries, question.as_str()) {
        Some(best) => {
            println!("score {:.2}  {}", best.score, best.entry.question);
            println!("answer: {}", best.entry.answer);
            let accepted = best.score >= config.accept_threshold;
            println!(
                "decision: {} (threshold {:.2})",
                if accepted { "accept" } else { "fall back" },
                config.accept_threshold
            );
        }
        None => println!("knowledge base is empty; every question falls back"),
    }
    Ok(())
}

async fn run_entries(config: &EngineConfig, json: bool) -> Result<()> {
    let store = EntryStore::new(config.entry_source()?, config.kb_ttl);
    let entries = store.entries().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(entries.as_slice())?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("(no entries)");
        return Ok(());
    }
    for entry in entries.iter() {
        println!("Q: {}", entry.question);
        println!("A: {}", entry.answer);
        println!();
    }
    Ok(())
}
