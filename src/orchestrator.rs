//! Ciclo de vida subida → análisis → resultados.
//!
//! Estados: `Idle → Uploading → Analyzing → Ready`. Una subida nueva reinicia
//! el ciclo en `Uploading`; el ciclo anterior queda abandonado y no publica
//! nada. Todo el "trabajo" es simulado con esperas fijas.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    analysis::{self, AnalysisError},
    config::Timings,
    conversation::ChatSession,
    models::{AnalysisResult, FileHandle},
    pacing::Pacer,
};

pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";
const PROGRESS_STEP: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Uploading,
    Analyzing,
    Ready,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Instantánea que consulta el frontend mientras sondea.
#[derive(Debug, Clone, Serialize)]
pub struct UploadStatus {
    pub phase: Phase,
    pub progress: u8,
    pub message: String,
    pub error: Option<String>,
    pub has_result: bool,
    pub cycle_id: Option<Uuid>,
    pub files: Vec<FileHandle>,
}

/// Resultado de `submit_files`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Lista vacía: no se hizo nada.
    Rejected,
    /// Otra subida empezó mientras tanto; este ciclo no publicó nada.
    Superseded,
    Completed(AnalysisResult),
    Failed,
}

#[derive(Debug)]
struct OrchestratorState {
    phase: Phase,
    progress: u8,
    message: String,
    error: Option<String>,
    cycle_id: Option<Uuid>,
    files: Vec<FileHandle>,
    /// Ficheros del último ciclo completado; acompañan a `result`.
    result_files: Vec<FileHandle>,
    result: Option<AnalysisResult>,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            progress: 0,
            message: "Ready for upload.".to_string(),
            error: None,
            cycle_id: None,
            files: Vec::new(),
            result_files: Vec::new(),
            result: None,
        }
    }
}

/// Clonar comparte el estado (una única instancia por proceso).
#[derive(Clone)]
pub struct Orchestrator {
    state: Arc<Mutex<OrchestratorState>>,
    pacer: Arc<dyn Pacer>,
    timings: Timings,
    seed_target: ChatSession,
}

impl Orchestrator {
    /// `seed_target` es la conversación que recibe el aviso del tipo detectado.
    pub fn new(pacer: Arc<dyn Pacer>, timings: Timings, seed_target: ChatSession) -> Self {
        Self {
            state: Arc::new(Mutex::new(OrchestratorState::default())),
            pacer,
            timings,
            seed_target,
        }
    }

    fn lock(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> UploadStatus {
        let state = self.lock();
        UploadStatus {
            phase: state.phase,
            progress: state.progress,
            message: state.message.clone(),
            error: state.error.clone(),
            has_result: state.result.is_some(),
            cycle_id: state.cycle_id,
            files: state.files.clone(),
        }
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        self.lock().result.clone()
    }

    /// Marca el inicio de un ciclo nuevo y devuelve su id; `None` si no hay ficheros.
    /// Separado de `run_cycle` para que la API pueda responder antes de las esperas.
    pub fn begin(&self, files: Vec<FileHandle>) -> Option<Uuid> {
        if files.is_empty() {
            return None;
        }
        let cycle_id = Uuid::new_v4();
        let mut state = self.lock();
        if let Some(previous) = state.cycle_id.filter(|_| matches!(state.phase, Phase::Uploading | Phase::Analyzing)) {
            warn!("Subida {} abandonada por la subida {}", previous, cycle_id);
        }
        state.cycle_id = Some(cycle_id);
        state.phase = Phase::Uploading;
        state.progress = 0;
        state.message = "Uploading... 0%".to_string();
        state.error = None;
        state.files = files;
        Some(cycle_id)
    }

    /// Acepta los ficheros y recorre el ciclo completo.
    pub async fn submit_files(&self, files: Vec<FileHandle>) -> Outcome {
        match self.begin(files) {
            Some(cycle_id) => self.run_cycle(cycle_id).await,
            None => Outcome::Rejected,
        }
    }

    pub async fn run_cycle(&self, cycle_id: Uuid) -> Outcome {
        let previous_phase = if self.lock().result.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        };

        match self.pipeline(cycle_id).await {
            Ok(Some(result)) => Outcome::Completed(result),
            Ok(None) => {
                info!("Ciclo {} sustituido por otra subida.", cycle_id);
                Outcome::Superseded
            }
            Err(e) => {
                error!("Error en la subida {}: {}", cycle_id, e);
                let mut state = self.lock();
                if state.cycle_id != Some(cycle_id) {
                    return Outcome::Superseded;
                }
                state.phase = previous_phase;
                state.files = state.result_files.clone();
                state.progress = 0;
                state.message = UPLOAD_FAILED_MESSAGE.to_string();
                state.error = Some(UPLOAD_FAILED_MESSAGE.to_string());
                Outcome::Failed
            }
        }
    }

    /// `Ok(None)` cuando el ciclo deja de ser el actual.
    async fn pipeline(&self, cycle_id: Uuid) -> Result<Option<AnalysisResult>, PipelineError> {
        for progress in (0..=100u8).step_by(PROGRESS_STEP as usize) {
            if !self.update(cycle_id, |state| {
                state.progress = progress;
                state.message = format!("Uploading... {progress}%");
            }) {
                return Ok(None);
            }
            self.pacer.pause(self.timings.upload_step).await;
        }

        if !self.update(cycle_id, |state| {
            state.phase = Phase::Analyzing;
            state.message = "Analyzing document...".to_string();
        }) {
            return Ok(None);
        }
        self.pacer.pause(self.timings.analysis).await;

        let first_file = {
            let state = self.lock();
            if state.cycle_id != Some(cycle_id) {
                return Ok(None);
            }
            state.files.first().cloned()
        };
        let Some(first_file) = first_file else {
            return Ok(None);
        };
        let result = analysis::analyze(&first_file)?;

        // Publicar el resultado y sembrar el chat en la misma sección crítica
        // evita que un ciclo nuevo se cuele entre ambos pasos.
        {
            let mut state = self.lock();
            if state.cycle_id != Some(cycle_id) {
                return Ok(None);
            }
            state.phase = Phase::Ready;
            state.progress = 100;
            state.message = format!("Analysis complete: {}", result.document_type_label);
            state.result = Some(result.clone());
            state.result_files = state.files.clone();
            self.seed_target.append_assistant(seed_message(&result));
        }

        info!(
            "Análisis {} listo: '{}' clasificado como {}",
            cycle_id, first_file.name, result.document_type_label
        );
        Ok(Some(result))
    }

    /// Aplica `f` si `cycle_id` sigue siendo el ciclo actual.
    fn update(&self, cycle_id: Uuid, f: impl FnOnce(&mut OrchestratorState)) -> bool {
        let mut state = self.lock();
        if state.cycle_id != Some(cycle_id) {
            return false;
        }
        f(&mut state);
        true
    }
}

pub fn seed_message(result: &AnalysisResult) -> String {
    format!(
        "I've analyzed your {}. I can help explain any clauses, answer questions about your rights and obligations, or clarify any confusing terms. What would you like to know?",
        result.document_type_label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::LocalRuleStrategy;
    use crate::models::{Author, DocumentType};
    use crate::pacing::RecordingPacer;
    use async_trait::async_trait;
    use std::sync::OnceLock;
    use std::time::Duration;

    fn setup() -> (Orchestrator, ChatSession, RecordingPacer) {
        let pacer = RecordingPacer::default();
        let demo = ChatSession::new(
            "demo",
            Arc::new(LocalRuleStrategy::new(Arc::new(pacer.clone()), Duration::ZERO)),
        );
        let orchestrator = Orchestrator::new(Arc::new(pacer.clone()), Timings::default(), demo.clone());
        (orchestrator, demo, pacer)
    }

    #[tokio::test]
    async fn empty_submission_changes_nothing() {
        let (orchestrator, demo, pacer) = setup();

        assert_eq!(orchestrator.submit_files(Vec::new()).await, Outcome::Rejected);

        let status = orchestrator.status();
        assert_eq!(status.phase, Phase::Idle);
        assert!(!status.has_result);
        assert!(orchestrator.result().is_none());
        assert!(demo.history().is_empty());
        assert!(pacer.pauses().is_empty());
    }

    #[tokio::test]
    async fn completed_cycle_publishes_result_and_one_seed_message() {
        let (orchestrator, demo, pacer) = setup();

        let outcome = orchestrator
            .submit_files(vec![FileHandle::new("Apartment-Lease.pdf", 2048), FileHandle::new("loan.pdf", 1)])
            .await;

        let result = match outcome {
            Outcome::Completed(result) => result,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(result.document_type, DocumentType::Rental);

        let status = orchestrator.status();
        assert_eq!(status.phase, Phase::Ready);
        assert_eq!(status.progress, 100);
        assert!(status.has_result);
        assert_eq!(status.files.len(), 2);

        let history = demo.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].author, Author::Assistant);
        assert!(history[0].body.starts_with("I've analyzed your Rental Agreement."));

        // 11 pasos de progreso (0..=100) más la espera del análisis.
        let pauses = pacer.pauses();
        assert_eq!(pauses.len(), 12);
        assert!(pauses[..11].iter().all(|p| *p == Duration::from_millis(100)));
        assert_eq!(pauses[11], Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn each_completed_cycle_seeds_exactly_once_and_replaces_the_result() {
        let (orchestrator, demo, _) = setup();

        orchestrator.submit_files(vec![FileHandle::new("terms.html", 1)]).await;
        orchestrator.submit_files(vec![FileHandle::new("credit.pdf", 1)]).await;

        assert_eq!(demo.history().len(), 2);
        assert_eq!(orchestrator.result().unwrap().document_type, DocumentType::Loan);
    }

    #[tokio::test]
    async fn newer_upload_supersedes_an_in_flight_cycle() {
        let (orchestrator, demo, _) = setup();

        let first = orchestrator.begin(vec![FileHandle::new("rental.pdf", 1)]).unwrap();
        let second = orchestrator.begin(vec![FileHandle::new("loan.pdf", 1)]).unwrap();

        assert_eq!(orchestrator.run_cycle(first).await, Outcome::Superseded);
        assert!(orchestrator.result().is_none());
        assert_eq!(orchestrator.status().phase, Phase::Uploading);

        let Outcome::Completed(result) = orchestrator.run_cycle(second).await else {
            panic!("second cycle should complete");
        };
        assert_eq!(result.document_type, DocumentType::Loan);
        assert_eq!(demo.history().len(), 1);
    }

    #[tokio::test]
    async fn pipeline_failure_reports_inline_error_and_keeps_last_result() {
        let (orchestrator, demo, _) = setup();
        orchestrator.submit_files(vec![FileHandle::new("lease.pdf", 1)]).await;

        let outcome = orchestrator.submit_files(vec![FileHandle::new("  ", 1)]).await;
        assert_eq!(outcome, Outcome::Failed);

        let status = orchestrator.status();
        assert_eq!(status.phase, Phase::Ready);
        assert_eq!(status.error.as_deref(), Some(UPLOAD_FAILED_MESSAGE));
        let names: Vec<&str> = status.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["lease.pdf"]);
        assert_eq!(orchestrator.result().unwrap().document_type, DocumentType::Rental);
        assert_eq!(demo.history().len(), 1);
    }

    #[tokio::test]
    async fn failure_before_any_result_returns_to_idle() {
        let (orchestrator, _, _) = setup();
        assert_eq!(orchestrator.submit_files(vec![FileHandle::new("", 0)]).await, Outcome::Failed);
        let status = orchestrator.status();
        assert_eq!(status.phase, Phase::Idle);
        assert!(status.files.is_empty());
        assert!(orchestrator.result().is_none());
    }

    /// Anota fase y progreso publicados en cada espera.
    #[derive(Default)]
    struct SnapshotPacer {
        orchestrator: OnceLock<Orchestrator>,
        seen: Mutex<Vec<(Phase, u8)>>,
    }

    #[async_trait]
    impl Pacer for SnapshotPacer {
        async fn pause(&self, _duration: Duration) {
            if let Some(orchestrator) = self.orchestrator.get() {
                let status = orchestrator.status();
                self.seen.lock().unwrap().push((status.phase, status.progress));
            }
        }
    }

    #[tokio::test]
    async fn progress_is_published_in_steps_of_ten_before_analysis() {
        let pacer = Arc::new(SnapshotPacer::default());
        let demo = ChatSession::new(
            "demo",
            Arc::new(LocalRuleStrategy::new(pacer.clone(), Duration::ZERO)),
        );
        let orchestrator = Orchestrator::new(pacer.clone(), Timings::default(), demo);
        assert!(pacer.orchestrator.set(orchestrator.clone()).is_ok());

        orchestrator.submit_files(vec![FileHandle::new("loan.pdf", 1)]).await;

        let seen = pacer.seen.lock().unwrap().clone();
        let mut expected: Vec<(Phase, u8)> = (0..=100u8).step_by(10).map(|p| (Phase::Uploading, p)).collect();
        expected.push((Phase::Analyzing, 100));
        assert_eq!(seen, expected);
    }
}
