mod config;
mod dialogue;
mod quiz;
mod story;

use std::sync::Arc;

use dotenv::dotenv;
use quiz::sheets::{HttpSheetSource, QuestionResolver};
use story::{GeminiClient, StoryMaker};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
};

type DialogueStorage = std::sync::Arc<ErasedStorage<dialogue::State>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_file_loaded = dotenv().is_ok();
    pretty_env_logger::init();
    log::info!("Starting story and quiz bot...");
    if !env_file_loaded {
        log::debug!("No .env file found, using the process environment only");
    }

    let config = config::Config::from_env()?;
    if config.gemini_api_key.is_none() {
        log::warn!("GEMINI_API_KEY is not set. Story generation will fail until it is configured.");
    }

    let mut topics = quiz::topics::default_topics();
    config::apply_sheet_overrides(&mut topics, |name| std::env::var(name).ok());
    for topic in &topics {
        if topic.has_placeholder_url() {
            log::info!("{} quiz uses sample questions", topic.name);
        }
    }

    let bot = Bot::from_env();

    log::info!("Opening dialogue storage at {}", config.dialogue_db);
    let storage: DialogueStorage = SqliteStorage::open(&config.dialogue_db, Json)
        .await?
        .erase();

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let resolver = Arc::new(QuestionResolver::new(HttpSheetSource::new(http.clone())));
    let story_maker = Arc::new(StoryMaker::new(
        GeminiClient::new(http, config.gemini_model.clone()),
        config.gemini_api_key.clone(),
    ));

    Dispatcher::builder(bot, dialogue::schema())
        .dependencies(dptree::deps![
            storage,
            Arc::new(topics),
            resolver,
            story_maker,
            Arc::new(config)
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
