//! Preferencias del usuario (idioma y tema) persistidas en un fichero JSON.
//!
//! Si el fichero no existe o no se puede leer se usan los valores por
//! defecto; nunca es un error de arranque.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::locale::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub theme: Theme,
}

/// Actualización parcial recibida desde la API.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub language: Option<Language>,
    pub theme: Option<Theme>,
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("no se pudo escribir {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("no se pudieron serializar las preferencias: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    current: Preferences,
}

impl PreferenceStore {
    /// Carga las preferencias guardadas o los valores por defecto.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Preferences>(&bytes) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!("Preferencias ilegibles en {}: {}. Se usan las de por defecto.", path.display(), e);
                    Preferences::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                warn!("No se pudo leer {}: {}. Se usan las de por defecto.", path.display(), e);
                Preferences::default()
            }
        };
        info!("Preferencias cargadas: {:?}", current);
        Self { path, current }
    }

    pub fn current(&self) -> Preferences {
        self.current
    }

    pub fn update(&mut self, update: PreferencesUpdate) -> Result<Preferences, PreferenceError> {
        let mut next = self.current;
        if let Some(language) = update.language {
            next.language = language;
        }
        if let Some(theme) = update.theme {
            next.theme = theme;
        }
        self.persist(next)
    }

    pub fn toggle_theme(&mut self) -> Result<Preferences, PreferenceError> {
        let mut next = self.current;
        next.theme = next.theme.toggled();
        self.persist(next)
    }

    fn persist(&mut self, next: Preferences) -> Result<Preferences, PreferenceError> {
        write_json(&self.path, &next)?;
        self.current = next;
        Ok(next)
    }
}

fn write_json(path: &Path, prefs: &Preferences) -> Result<(), PreferenceError> {
    let bytes = serde_json::to_vec_pretty(prefs)?;
    let write_err = |source| PreferenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, bytes).map_err(write_err)
}
