#![allow(dead_code)]

use async_trait::async_trait;
use heritage_ai::config::DatabaseConfig;
use heritage_ai::db::{self, get_connection, models::{Category, Entry, NewEntry}, service::DbService, DbPool};
use heritage_ai::gateway::{Gateway, GatewayConfig};
use heritage_ai::llm::{
    models::{Generation, GenerationRequest},
    ProviderError, TextGenerationProvider,
};
use std::sync::{Arc, Mutex};

/// Returns a fixed reply and records every request it receives.
pub struct FakeProvider {
    reply: Result<String, ProviderError>,
    echo: bool,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            echo: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Replies with `re: <question>` so each answer can be matched to its question.
    pub fn echoing() -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(String::new()),
            echo: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            echo: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().expect("provider was never called")
    }
}

#[async_trait]
impl TextGenerationProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        // Let concurrent callers interleave the way a network call would.
        tokio::task::yield_now().await;

        let reply = if self.echo {
            let question = request.user_prompt.rsplit("Question: ").next().unwrap_or_default();
            Ok(format!("re: {}", question))
        } else {
            self.reply.clone()
        };
        reply.map(|text| Generation {
            text,
            model: "fake-model".to_string(),
            usage: None,
        })
    }
}

pub fn memory_pool() -> DbPool {
    get_connection(&DatabaseConfig {
        path: ":memory:".to_string(),
    })
    .unwrap()
}

pub fn gateway_with(provider: Option<Arc<FakeProvider>>) -> (Gateway, DbPool) {
    let pool = memory_pool();
    let provider = provider.map(|p| p as Arc<dyn TextGenerationProvider>);
    (Gateway::new(GatewayConfig::default(), provider, pool.clone()), pool)
}

pub fn add_entry(pool: &DbPool, owner: &str, title: &str, published: bool) -> Entry {
    let conn = db::lock(pool).unwrap();
    DbService::insert_entry(
        &conn,
        &NewEntry {
            owner_id: owner.to_string(),
            title: title.to_string(),
            description: format!("{} description", title),
            cultural_context: Some(format!("{} context", title)),
            category: Category::Tradition,
            country: Some("Peru".to_string()),
            published,
        },
    )
    .unwrap()
}

/// Leaves the pool's mutex poisoned so any store access fails.
pub fn poison(pool: &DbPool) {
    let pool = pool.clone();
    let _ = std::thread::spawn(move || {
        let _guard = pool.lock().unwrap();
        panic!("poisoning store for test");
    })
    .join();
}
