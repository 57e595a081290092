//! Idiomas de visualización: sólo lo que afecta al comportamiento del backend
//! (mensaje de bienvenida del chat y directiva de idioma del prompt).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Zh,
}

impl Language {
    pub fn welcome_message(self) -> &'static str {
        match self {
            Self::En => "Hello! I'm your AI legal assistant powered by Gemini 2.0 Flash. I can help you understand legal documents, answer questions, and provide guidance. How can I assist you today?",
            Self::Hi => "नमस्ते! मैं आपका AI कानूनी सहायक हूं जो Gemini 2.0 Flash द्वारा संचालित है। मैं आपको कानूनी दस्तावेजों को समझने, प्रश्नों के उत्तर देने और मार्गदर्शन प्रदान करने में मदद कर सकता हूं। आज मैं आपकी कैसे सहायता कर सकता हूं?",
            Self::Zh => "您好！我是您的AI法律助手，由Gemini 2.0 Flash驱动。我可以帮助您理解法律文件、回答问题并提供指导。今天我能为您做些什么？",
        }
    }

    /// Instrucción de idioma que se añade al prompt del modelo remoto.
    pub fn response_directive(self) -> &'static str {
        match self {
            Self::En => "IMPORTANT: Respond in English.",
            Self::Hi => "IMPORTANT: Respond in Hindi (हिन्दी). Use Devanagari script for Hindi text.",
            Self::Zh => "IMPORTANT: Respond in Chinese (中文). Use Simplified Chinese characters.",
        }
    }
}
