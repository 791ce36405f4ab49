//! Tipos de erro para o cliente HTTP de entrega.
//!
//! [`DeliveryError`] descreve por que uma chamada não foi aceita. O worker
//! nunca vê esses erros diretamente: [`DeliveryError::classify`] os converte
//! em [`Outcome`] antes de sair do cliente.

use thiserror::Error;

use super::types::{Outcome, matches_marker};

/// Erros que podem ocorrer ao chamar o serviço remoto.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// O serviço respondeu com status diferente de 2xx.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Endpoint inválido depois de substituir o alvo.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl DeliveryError {
    /// Classifica o erro: marcadores de credencial viram `Fatal`, o resto é `Transient`.
    pub fn classify<S: AsRef<str>>(&self, markers: &[S]) -> Outcome {
        match self {
            DeliveryError::ApiError { message, .. } if matches_marker(message, markers) => {
                Outcome::invalid_credential(message.clone())
            }
            DeliveryError::NetworkError(e) if e.is_timeout() => {
                Outcome::Transient("request timed out".into())
            }
            other => Outcome::Transient(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = DeliveryError::ApiError {
            status: 400,
            message: "bad request".into(),
        };
        assert_eq!(err.to_string(), "API error (status 400): bad request");
    }

    #[test]
    fn marker_in_body_is_fatal() {
        let err = DeliveryError::ApiError {
            status: 400,
            message: r#"{"error":{"message":"Session has expired"}}"#.into(),
        };
        assert!(matches!(err.classify(&["expired"]), Outcome::Fatal { .. }));
    }

    #[test]
    fn other_api_errors_are_transient() {
        let err = DeliveryError::ApiError {
            status: 503,
            message: "try later".into(),
        };
        assert!(matches!(err.classify(&["expired"]), Outcome::Transient(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DeliveryError>();
    }
}
