use crate::classifier::{Classifier, HttpClassifier};
use crate::model::{ClientConfig, IdentifyResult, Phase};
use crate::recipes::RecipeBook;
use crate::session::{Session, SessionState};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "dishlens",
    version,
    about = "Identify a dish from a photo and look up its recipe"
)]
pub struct Cli {
    /// Photo of the dish to identify
    pub image: Option<PathBuf>,

    /// Base URL of the remote classifier service
    #[arg(long, default_value = "https://www.naijafood.live")]
    pub base_url: String,

    /// Print the result as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Abort the classification request after this long (e.g. "30s"; no timeout by default)
    #[arg(long)]
    pub request_timeout: Option<humantime::Duration>,

    /// List the dishes with a bundled recipe and exit
    #[arg(long)]
    pub list_dishes: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.list_dishes {
        let book = RecipeBook::load()?;
        for label in book.labels() {
            println!("{label}");
        }
        return Ok(());
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_json(args).await;
    }

    run_text(args).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("dishlens/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: args.request_timeout.map(Duration::from),
    }
}

/// One-shot flow for the non-interactive modes: load the photo, send it to
/// the classifier, and hand back the final session state.
async fn identify(args: &Cli) -> Result<SessionState> {
    let path = args
        .image
        .clone()
        .ok_or_else(|| anyhow!("no image given; pass a photo path"))?;
    let cfg = build_config(args);
    let classifier: Arc<dyn Classifier> =
        Arc::new(HttpClassifier::new(&cfg).context("set up classifier client")?);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(classifier, event_tx);

    session.select_image(path);
    while let Some(event) = event_rx.recv().await {
        if let Some(notice) = session.apply(event) {
            // In one-shot mode the only recoverable action is starting over,
            // so an async failure before the result is fatal here. A failed
            // classification still reaches Resulted and is reported below.
            if !session.phase().has_result() {
                bail!(notice);
            }
            eprintln!("{notice}");
        }
        match session.phase() {
            Phase::Previewing => session.classify()?,
            Phase::Resulted => break,
            _ => {}
        }
    }

    Ok(session.into_state())
}

async fn run_text(args: Cli) -> Result<()> {
    let state = identify(&args).await?;
    let book = RecipeBook::load()?;

    let label = state.prediction_label.as_deref().unwrap_or("Unknown");
    let confidence = state.confidence_score.unwrap_or(0.0);
    println!("Dish: {label}");
    println!("Confidence: {:.0}%", confidence * 100.0);

    match book.resolve(label) {
        Some(recipe) => {
            println!();
            println!("How to make {label}");
            println!("Cook time: {}  Servings: {}", recipe.cook_time, recipe.servings);
            println!();
            println!("Ingredients:");
            for ingredient in &recipe.ingredients {
                println!("  - {ingredient}");
            }
            println!();
            println!("Instructions:");
            for (i, step) in recipe.instructions.iter().enumerate() {
                println!("  {}. {step}", i + 1);
            }
        }
        None => println!("Recipe not available for this dish."),
    }
    Ok(())
}

async fn run_json(args: Cli) -> Result<()> {
    let state = identify(&args).await?;
    let book = RecipeBook::load()?;

    let label = state
        .prediction_label
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());
    let result = IdentifyResult {
        recipe: book.resolve(&label).cloned(),
        confidence: state.confidence_score.unwrap_or(0.0),
        label,
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
