//! Sesiones de chat y estrategias de respuesta.
//!
//! Las dos conversaciones de la página (panel de preguntas y widget flotante)
//! son el mismo `ChatSession` con distinta `ResponseStrategy`:
//!   - `LocalRuleStrategy`: respuestas enlatadas por palabra clave.
//!   - `RemoteGenerationStrategy`: prompt completo al endpoint generativo.
//!
//! Una sesión rechaza nuevas preguntas mientras espera la respuesta anterior.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    llm::TextGenerator,
    locale::Language,
    models::{AnalysisResult, ChatMessage},
    pacing::Pacer,
};

pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const REMOTE_HISTORY_WINDOW: usize = 5;

/// Datos del entorno que una estrategia puede necesitar en cada turno.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub language: Language,
    pub document: Option<AnalysisResult>,
}

#[async_trait]
pub trait ResponseStrategy: Send + Sync {
    /// `history` son los mensajes anteriores a `new_message`.
    async fn respond(
        &self,
        history: &[ChatMessage],
        new_message: &ChatMessage,
        context: &TurnContext,
    ) -> Result<String>;
}

// ---------------------------------------------------------------------
// ESTRATEGIA LOCAL
// ---------------------------------------------------------------------

const KEYWORD_RESPONSES: &[(&str, &str)] = &[
    ("obligations", "Based on your document, your main obligations include paying rent on time, maintaining the property in good condition, and following the terms outlined in the agreement. You should also notify the landlord of any issues promptly."),
    ("termination", "You can terminate the lease by providing 30 days written notice. However, early termination may require paying the remaining rent or finding a replacement tenant. Check your specific agreement for exact terms."),
    ("rights", "As a tenant, you have the right to quiet enjoyment of the property, timely repairs from the landlord, and proper notice before entry. You also have the right to dispute unfair charges."),
    ("breach", "If you break the contract, consequences may include late fees, eviction proceedings, damage to your credit, and potential legal action. The specific consequences depend on the type of breach."),
    ("default", "Default typically occurs after missing payments or violating terms. Consequences may include late fees, credit reporting, acceleration of debt, and potential legal action."),
    ("payment", "Payment terms vary by document type. Generally, payments are due monthly with specific due dates and late fees for missed payments. Check your document for exact amounts and dates."),
    ("security", "Security deposits are typically refundable and held for damages or unpaid rent. They must be returned within a specified time after lease termination, minus any legitimate deductions."),
    ("maintenance", "Maintenance responsibilities are usually split between tenant and landlord. Tenants typically handle minor repairs and cleaning, while landlords handle major structural issues and appliances."),
];

const MEANING_REPLY: &str = "I'd be happy to explain that term or clause. Could you provide more specific details about what you'd like me to clarify?";
const PERMISSION_REPLY: &str = "Your rights and permissions depend on the specific terms in your document. I can help clarify what you're allowed to do based on the agreement.";
const RISK_REPLY: &str = "I've identified several potential risks in your document. The main concerns are highlighted in the risk assessment section. Would you like me to explain any specific risks in more detail?";
const CLARIFY_REPLY: &str = "That's a great question! I can help explain that based on your document. Could you provide more specific details so I can give you the most accurate answer?";

/// Busca la primera respuesta enlatada que corresponde a la pregunta.
pub fn match_local_reply(question: &str) -> &'static str {
    let q = question.to_lowercase();

    if let Some((_, reply)) = KEYWORD_RESPONSES.iter().find(|(key, _)| q.contains(key)) {
        return *reply;
    }
    if q.contains("what") && q.contains("mean") {
        return MEANING_REPLY;
    }
    if q.contains("can i") || q.contains("am i allowed") {
        return PERMISSION_REPLY;
    }
    if q.contains("risk") || q.contains("dangerous") {
        return RISK_REPLY;
    }
    CLARIFY_REPLY
}

pub struct LocalRuleStrategy {
    pacer: Arc<dyn Pacer>,
    thinking: Duration,
}

impl LocalRuleStrategy {
    pub fn new(pacer: Arc<dyn Pacer>, thinking: Duration) -> Self {
        Self { pacer, thinking }
    }
}

#[async_trait]
impl ResponseStrategy for LocalRuleStrategy {
    async fn respond(
        &self,
        _history: &[ChatMessage],
        new_message: &ChatMessage,
        _context: &TurnContext,
    ) -> Result<String> {
        self.pacer.pause(self.thinking).await;
        Ok(match_local_reply(&new_message.body).to_string())
    }
}

// ---------------------------------------------------------------------
// ESTRATEGIA REMOTA
// ---------------------------------------------------------------------

const SYSTEM_PREAMBLE: &str = r#"You are an AI legal assistant powered by Gemini 2.0 Flash. You help users understand legal documents, answer legal questions, and provide guidance on legal matters.

Key capabilities:
- Analyze and explain legal documents
- Identify key terms, obligations, and risks
- Provide simplified explanations of complex legal language
- Answer questions about contracts, agreements, and legal processes
- Offer general legal guidance (but always recommend consulting a qualified attorney for specific legal advice)

Important guidelines:
- Always be helpful, accurate, and professional
- Simplify complex legal concepts into plain language
- Highlight potential risks or important clauses
- Recommend consulting a qualified attorney for serious legal matters
- Be concise but thorough in your responses
- Use examples when helpful for understanding"#;

/// Construye el prompt único que se envía al modelo remoto.
pub fn build_prompt(history: &[ChatMessage], new_message: &ChatMessage, context: &TurnContext) -> String {
    let mut prompt = String::from(SYSTEM_PREAMBLE);
    prompt.push_str("\n\n");
    prompt.push_str(context.language.response_directive());
    prompt.push_str("\n\nCurrent session context:");

    if let Some(doc) = &context.document {
        prompt.push_str(&format!(
            "\n\nUser has uploaded a {} with {} complexity level. Key points include: {}.\nSummary: {}",
            doc.document_type_label,
            doc.complexity,
            doc.key_points.join(", "),
            doc.summary
        ));
    }

    let recent_start = history.len().saturating_sub(REMOTE_HISTORY_WINDOW);
    let recent = &history[recent_start..];
    if !recent.is_empty() {
        prompt.push_str("\n\nRecent conversation:");
        for msg in recent {
            prompt.push_str(&format!("\n{}: {}", msg.author.label(), msg.body));
        }
    }

    prompt.push_str(&format!("\n\nUser: {}\n\nAssistant:", new_message.body));
    prompt
}

pub struct RemoteGenerationStrategy {
    generator: Arc<dyn TextGenerator>,
}

impl RemoteGenerationStrategy {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl ResponseStrategy for RemoteGenerationStrategy {
    async fn respond(
        &self,
        history: &[ChatMessage],
        new_message: &ChatMessage,
        context: &TurnContext,
    ) -> Result<String> {
        let prompt = build_prompt(history, new_message, context);
        Ok(self.generator.generate(&prompt).await?)
    }
}

// ---------------------------------------------------------------------
// SESIÓN
// ---------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("ya hay una respuesta en curso para esta conversación")]
    Busy,
}

#[derive(Debug, Default)]
struct ChatState {
    history: Vec<ChatMessage>,
    open: bool,
    pending: bool,
}

/// Vista serializable de una sesión.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub open: bool,
    pub pending: bool,
    pub messages: Vec<ChatMessage>,
}

/// Conversación con historial sólo-añadir. Clonar comparte el estado.
#[derive(Clone)]
pub struct ChatSession {
    name: &'static str,
    state: Arc<Mutex<ChatState>>,
    strategy: Arc<dyn ResponseStrategy>,
}

impl ChatSession {
    pub fn new(name: &'static str, strategy: Arc<dyn ResponseStrategy>) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(ChatState::default())),
            strategy,
        }
    }

    // Ninguna sección crítica deja el estado a medias, así que un mutex
    // envenenado se puede seguir usando.
    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Pregunta y espera la respuesta. Texto vacío: `Ok(None)` sin cambios.
    /// Un fallo de la estrategia se registra y se responde con `FALLBACK_REPLY`.
    pub async fn ask(&self, text: &str, context: &TurnContext) -> Result<Option<ChatMessage>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let (history, question) = {
            let mut state = self.lock();
            if state.pending {
                return Err(ChatError::Busy);
            }
            let history = state.history.clone();
            let question = ChatMessage::user(text);
            state.history.push(question.clone());
            state.pending = true;
            (history, question)
        };
        // Si el futuro se cancela (cliente desconectado) la sesión queda libre igualmente.
        let pending = PendingGuard { session: self };

        let body = match self.strategy.respond(&history, &question, context).await {
            Ok(body) => body,
            Err(e) => {
                error!("Error generando respuesta en el chat '{}': {:#}", self.name, e);
                FALLBACK_REPLY.to_string()
            }
        };

        let reply = ChatMessage::assistant(body);
        self.lock().history.push(reply.clone());
        drop(pending);
        Ok(Some(reply))
    }

    /// Añade un mensaje del asistente sin pasar por la estrategia.
    pub fn append_assistant(&self, body: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::assistant(body);
        self.lock().history.push(message.clone());
        message
    }

    pub fn open(&self, language: Language) {
        let mut state = self.lock();
        state.open = true;
        if state.history.is_empty() {
            state.history.push(ChatMessage::assistant(language.welcome_message()));
            info!("Chat '{}' abierto con mensaje de bienvenida ({:?}).", self.name, language);
        }
    }

    pub fn close(&self) {
        self.lock().open = false;
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.lock().history.clone()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.lock();
        ChatSnapshot {
            open: state.open,
            pending: state.pending,
            messages: state.history.clone(),
        }
    }
}

/// Baja el indicador `pending` al soltarse.
struct PendingGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().pending = false;
    }
}
