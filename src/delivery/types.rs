//! Tipos compartilhados entre os clientes de entrega e o worker.
//!
//! [`Outcome`] é a classificação de uma única chamada remota e
//! [`DeliveryClient`] é a costura que o worker usa para enviar mensagens,
//! permitindo trocar o cliente HTTP real por um falso nos testes.

use std::future::Future;

use crate::job::{AttemptOutcome, FatalReason};

/// Resultado classificado de uma chamada ao serviço remoto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// O serviço aceitou a operação.
    Success,
    /// Falha passageira (rede, timeout, 5xx, corpo malformado). O job continua.
    Transient(String),
    /// A credencial está expirada ou inválida e deve ser descartada.
    Fatal { reason: FatalReason, detail: String },
}

impl Outcome {
    pub fn invalid_credential(detail: impl Into<String>) -> Self {
        Outcome::Fatal {
            reason: FatalReason::InvalidCredential,
            detail: detail.into(),
        }
    }
}

impl From<Outcome> for AttemptOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => AttemptOutcome::Success,
            Outcome::Transient(reason) => AttemptOutcome::TransientFailure { reason },
            Outcome::Fatal { reason, detail } => AttemptOutcome::FatalFailure { reason, detail },
        }
    }
}

/// Envia uma mensagem para um alvo usando uma credencial.
///
/// Cada chamada de [`send`](DeliveryClient::send) faz exatamente uma requisição
/// externa, sem retentativas internas: repetir é decisão do worker.
pub trait DeliveryClient: Send + Sync + 'static {
    fn send(
        &self,
        credential: &str,
        target: &str,
        message: &str,
    ) -> impl Future<Output = Outcome> + Send;

    /// Rótulo legível do dono da credencial, se o serviço souber informar.
    fn identify(&self, _credential: &str) -> impl Future<Output = Option<String>> + Send {
        async { None }
    }
}

/// Verifica se o texto de erro contém algum marcador de credencial inválida.
pub fn matches_marker<S: AsRef<str>>(text: &str, markers: &[S]) -> bool {
    let lower = text.to_lowercase();
    markers
        .iter()
        .map(|m| m.as_ref().trim().to_lowercase())
        .any(|m| !m.is_empty() && lower.contains(&m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_match_is_case_insensitive() {
        let markers = ["session has expired", "invalid oauth"];
        assert!(matches_marker(
            "Error validating access token: Session has EXPIRED on Monday",
            &markers
        ));
        assert!(matches_marker("Invalid OAuth access token.", &markers));
        assert!(!matches_marker("Internal server error", &markers));
    }

    #[test]
    fn empty_markers_never_match() {
        let markers = ["", "  "];
        assert!(!matches_marker("anything", &markers));
    }

    #[test]
    fn outcome_maps_to_attempt_outcome() {
        assert_eq!(AttemptOutcome::from(Outcome::Success), AttemptOutcome::Success);
        assert_eq!(
            AttemptOutcome::from(Outcome::invalid_credential("expired")),
            AttemptOutcome::FatalFailure {
                reason: FatalReason::InvalidCredential,
                detail: "expired".into()
            }
        );
    }
}
