//! Modelos de dominio: resultado del análisis simulado, mensajes de chat y
//! metadatos de los ficheros subidos.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tipo de documento detectado a partir del nombre del fichero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Rental,
    Loan,
    TermsOfService,
    Generic,
}

impl DocumentType {
    /// Nombre que se muestra al usuario (y que se inyecta en el prompt).
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Rental => "Rental Agreement",
            Self::Loan => "Loan Contract",
            Self::TermsOfService => "Terms of Service",
            Self::Generic => "Legal Document",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Nivel usado tanto para la complejidad como para el riesgo global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseCategory {
    Important,
    Warning,
}

impl ClauseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Important => "important",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub title: String,
    pub category: ClauseCategory,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskItem {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

/// Resultado (enlatado) del análisis de un documento.
/// Inmutable: cada subida completada lo sustituye entero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub document_type: DocumentType,
    pub document_type_label: String,
    pub complexity: Level,
    pub risk_level: Level,
    pub summary: String,
    pub clauses: Vec<Clause>,
    pub risks: Vec<RiskItem>,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub author: Author,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(body: impl Into<String>) -> Self {
        Self::new(Author::User, body)
    }

    pub fn assistant(body: impl Into<String>) -> Self {
        Self::new(Author::Assistant, body)
    }

    fn new(author: Author, body: impl Into<String>) -> Self {
        Self {
            author,
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

/// Metadatos de un fichero subido. El contenido nunca se analiza.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHandle {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name).first().map(|m| m.to_string());
        Self {
            name,
            size_bytes,
            mime_type,
        }
    }
}
