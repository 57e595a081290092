//! Carga y gestión de configuración de la aplicación (servidor + Gemini + tiempos simulados).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::warn;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Duraciones de la simulación (progreso de subida, análisis y "pensando").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timings {
    pub upload_step: Duration,
    pub analysis: Duration,
    pub thinking: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            upload_step: Duration::from_millis(100),
            analysis: Duration::from_millis(2000),
            thinking: Duration::from_millis(1500),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub frontend_dir: PathBuf,
    pub open_browser: bool,

    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,

    pub preferences_path: PathBuf,
    pub timings: Timings,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3322".to_string());
        let frontend_dir = env::var("FRONTEND_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("frontend"));
        let open_browser = parse_bool("OPEN_BROWSER", true)?;

        let gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        if gemini_api_key.is_none() {
            warn!("GEMINI_API_KEY no definida: el widget de chat responderá con el mensaje de error genérico.");
        }
        let gemini_base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());
        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        let preferences_path = match env::var("PREFERENCES_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_preferences_path()?,
        };

        let defaults = Timings::default();
        let timings = Timings {
            upload_step: parse_millis("UPLOAD_STEP_DELAY_MS", defaults.upload_step)?,
            analysis: parse_millis("ANALYSIS_DELAY_MS", defaults.analysis)?,
            thinking: parse_millis("THINKING_DELAY_MS", defaults.thinking)?,
        };

        Ok(Self {
            server_addr,
            frontend_dir,
            open_browser,
            gemini_api_key,
            gemini_base_url,
            gemini_model,
            preferences_path,
            timings,
        })
    }
}

fn default_preferences_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| anyhow!("No se pudo determinar el directorio de configuración del usuario."))?;
    Ok(base.join("legal-doc-assistant").join("preferences.json"))
}

fn parse_millis(key: &str, default: Duration) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} debe ser un número de milisegundos, no '{raw}'"))?;
            Ok(Duration::from_millis(millis))
        }
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(anyhow!("{key} debe ser booleano, no '{other}'")),
        },
        Err(_) => Ok(default),
    }
}
