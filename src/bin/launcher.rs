//! Interactive CLI launcher (§6 "Interactive CLI shells ... only call the
//! core engine"). Grounded on `bin/deep-research-test.rs`'s standalone-binary
//! shape: parse env/args, build `EngineState`, drive one research
//! conversation, print/export the result.

use std::io::Write as _;
use std::sync::Arc;

use ire_engine::core::app_state::EngineState;
use ire_engine::core::config::load_engine_config;
use ire_engine::core::types::ResearchState;
use ire_engine::cycle::{CycleController, CyclePhase, FeedbackCommand, FeedbackProcessor};
use ire_engine::export::write_export;
use ire_engine::search::providers::academic::providers_for_names;
use ire_engine::search::providers::web::HttpSearchProvider;
use ire_engine::search::providers::SearchProvider;
use ire_engine::synthesis::engine::SynthesisEngine;
use tokio::sync::Mutex as AsyncMutex;

fn print_usage() {
    eprintln!("Usage: launcher [--kn NAME] [--kn-list] <question>");
    eprintln!();
    eprintln!("  --kn NAME     select knowledge database (default: research)");
    eprintln!("  --kn-list     print known knowledge databases and exit");
    eprintln!();
    eprintln!("Env:");
    eprintln!("  LM_STUDIO_URL, RESEARCH_MODEL, SYNTHESIS_MODEL, EMBEDDING_MODEL, SEARCH_URL");
    eprintln!("  MAX_CYCLES, MIN_CYCLES, KNOWLEDGE_DB_ROOT, ACADEMIC_PROVIDERS");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut collection = None;
    let mut kn_list = false;
    let mut question_parts = Vec::new();

    let mut iter = args.into_iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--kn" => {
                collection = iter.next();
            }
            "--kn-list" => kn_list = true,
            _ => question_parts.push(arg),
        }
    }

    let config = match load_engine_config() {
        Ok(c) => c,
        Err(e) => {
            // §6 launcher exit-code contract: configuration failures stop
            // process startup rather than falling back to defaults.
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    let config = Arc::new(config);

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(ire_engine::core::constants::HTTP_TIMEOUT_SECS))
        .build()?;
    let state = Arc::new(EngineState::new(http_client.clone(), (*config).clone()));

    if kn_list {
        for name in state.knowledge_store.list_collections() {
            println!("{name}");
        }
        return Ok(());
    }

    let question = question_parts.join(" ");
    if question.trim().is_empty() {
        print_usage();
        std::process::exit(2);
    }

    let collection = collection.unwrap_or_else(|| state.knowledge_store.default_collection().to_string());

    let mut providers: Vec<Box<dyn SearchProvider>> = vec![Box::new(HttpSearchProvider::new(http_client, config.search_url.clone()))];
    providers.extend(providers_for_names(&state.http_client, &config.enabled_academic_providers));

    let controller = CycleController::new(state.clone(), providers, collection);
    let research = Arc::new(AsyncMutex::new(ResearchState::new(question)));

    let outcome = controller.run(&research, true).await?;

    let outcome = if outcome.phase_reached == CyclePhase::AwaitingFeedback {
        run_feedback_loop(&controller, &state, &research).await?
    } else {
        outcome
    };

    tracing::info!(cycles = outcome.cycles_run, "research cycles complete, synthesizing");

    let synthesis = SynthesisEngine::new(state.clone());
    let mut guard = research.lock().await;
    let result = synthesis.synthesize(&mut guard).await;

    for section in &result.sections {
        println!("## {}\n\n{}\n", section.topic, section.content);
    }
    println!("## Sources\n");
    for entry in &result.bibliography {
        println!("[{}] {} — {}", entry.global_id, entry.title, entry.url);
    }

    match write_export(std::path::Path::new("."), &guard).await {
        Ok(path) => tracing::info!(path = %path.display(), "research export written"),
        Err(e) => tracing::warn!("failed to write research export: {e}"),
    }

    Ok(())
}

async fn run_feedback_loop(
    controller: &CycleController,
    state: &Arc<EngineState>,
    research: &Arc<AsyncMutex<ResearchState>>,
) -> anyhow::Result<ire_engine::cycle::ResearchOutcome> {
    let flat_outline = {
        let guard = research.lock().await;
        guard.active_outline()
    };
    println!("Proposed outline:");
    for (i, item) in flat_outline.iter().enumerate() {
        println!("  {}. {}", i + 1, item);
    }
    print!("Feedback (/k 1,2  /r 3  or free text, blank to accept): ");
    std::io::stdout().flush().ok();

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let command = FeedbackProcessor::parse(&line);

    let (kept, removed) = match &command {
        FeedbackCommand::Keep(indices) => (indices.clone(), Vec::new()),
        FeedbackCommand::Remove(indices) => (Vec::new(), indices.clone()),
        FeedbackCommand::Natural(text) if !text.trim().is_empty() => {
            let processor = FeedbackProcessor::new(state.chat_client.clone());
            processor.classify_natural(text, &flat_outline).await
        }
        FeedbackCommand::Natural(_) => (Vec::new(), Vec::new()),
    };

    controller.apply_feedback(research, &kept, &removed).await?;

    Ok(controller.resume_after_feedback(research).await?)
}
