mod app;
mod config;
mod controller;
mod error;
mod event;
mod service;
mod session;
mod sources;
mod theme;
mod ui;

use app::PaperQaApp;
use clap::Parser;
use config::ClientConfig;
use controller::Controller;
use eframe::egui;
use service::http::HttpRagService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "paper-qa", about = "Desktop client for asking questions about a research paper")]
struct Args {
    /// Base URL of the question-answering service
    #[arg(long)]
    api_url: Option<String>,

    /// Path to a config file (defaults to ~/.paper-qa/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// PDF to upload as soon as the window opens
    #[arg(long)]
    document: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paper_qa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        config.api_base_url = api_url;
    }
    tracing::info!(api = %config.api_base_url, "starting paper-qa");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("paper-qa-runtime")
        .build()?;

    let service = HttpRagService::new(&config)?;
    let controller = Controller::new(Arc::new(service), config);
    let runtime_handle = runtime.handle().clone();
    let startup_document = args.document;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Research Paper Q&A",
        native_options,
        Box::new(move |creation_context| {
            Ok(Box::new(PaperQaApp::new(
                creation_context.egui_ctx.clone(),
                controller,
                runtime_handle,
                startup_document,
            )))
        }),
    )?;

    drop(runtime);
    Ok(())
}
