use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::oneshot;

use crate::{
    config::AppConfig,
    conversation::{ChatSession, LocalRuleStrategy, RemoteGenerationStrategy, TurnContext},
    llm::GeminiClient,
    orchestrator::Orchestrator,
    pacing::{Pacer, TokioPacer},
    preferences::PreferenceStore,
};

/// Raíz de composición: una instancia de cada componente por proceso.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Orchestrator,
    /// Panel de preguntas de la demo (respuestas locales).
    pub demo_chat: ChatSession,
    /// Widget flotante (respuestas del modelo remoto).
    pub widget_chat: ChatSession,
    pub preferences: Arc<Mutex<PreferenceStore>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn build(
        config: AppConfig,
        pacer: Arc<dyn Pacer>,
        generator: Arc<dyn crate::llm::TextGenerator>,
        preferences: PreferenceStore,
        shutdown_sender: Option<oneshot::Sender<()>>,
    ) -> Self {
        let demo_chat = ChatSession::new(
            "demo",
            Arc::new(LocalRuleStrategy::new(pacer.clone(), config.timings.thinking)),
        );
        let widget_chat = ChatSession::new("widget", Arc::new(RemoteGenerationStrategy::new(generator)));
        let orchestrator = Orchestrator::new(pacer, config.timings.clone(), demo_chat.clone());

        Self {
            config,
            orchestrator,
            demo_chat,
            widget_chat,
            preferences: Arc::new(Mutex::new(preferences)),
            shutdown_sender: Arc::new(Mutex::new(shutdown_sender)),
        }
    }

    /// Estado de producción: esperas reales y cliente de Gemini.
    pub fn from_config(config: AppConfig, shutdown_sender: oneshot::Sender<()>) -> Result<Self> {
        let generator = Arc::new(
            GeminiClient::from_config(&config).context("No se pudo crear el cliente HTTP de Gemini")?,
        );
        let preferences = PreferenceStore::load(config.preferences_path.clone());
        Ok(Self::build(
            config,
            Arc::new(TokioPacer),
            generator,
            preferences,
            Some(shutdown_sender),
        ))
    }

    pub fn turn_context(&self) -> TurnContext {
        TurnContext {
            language: self.preferences.lock().map(|p| p.current().language).unwrap_or_default(),
            document: self.orchestrator.result(),
        }
    }
}
