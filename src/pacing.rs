//! Esperas simuladas (progreso de subida, análisis, "pensando").
//! Se inyectan para que los tests no dependan del reloj real.

#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Espera real con el temporizador de tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// No espera: sólo anota las pausas pedidas.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

#[cfg(test)]
impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_pacer_returns_immediately_and_keeps_order() {
        let pacer = RecordingPacer::default();
        tokio_test::block_on(async {
            pacer.pause(Duration::from_secs(60)).await;
            pacer.pause(Duration::from_millis(5)).await;
        });
        assert_eq!(pacer.pauses(), vec![Duration::from_secs(60), Duration::from_millis(5)]);
    }
}
