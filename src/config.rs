//! Configuração do rotor carregada a partir de `rotor.toml`.
//!
//! A struct [`RotorConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `ROTOR_ENDPOINT` e `ROTOR_IDENTITY_ENDPOINT`
//! têm precedência sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::delivery::DEFAULT_FATAL_MARKERS;
use crate::error::{Result, RotorError};
use crate::job::{DEFAULT_DISALLOWED_FRAGMENTS, DelayPolicy, DelayTrigger, JobPolicy};
use crate::orchestrator::OrchestratorSettings;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "rotor.toml";

/// Configuração de nível superior carregada de `rotor.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RotorConfig {
    /// URL do serviço remoto; `{target}` é substituído pelo id do alvo.
    #[serde(default)]
    pub endpoint: String,

    /// URL opcional para descobrir o nome do dono de cada credencial.
    #[serde(default)]
    pub identity_endpoint: Option<String>,

    /// Timeout de cada chamada remota, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout de conexão, em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Tempo mínimo de descanso de uma credencial entre dois usos.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Intervalo entre verificações enquanto uma credencial esfria, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Atraso padrão entre tentativas, em segundos.
    #[serde(default = "default_delay_secs")]
    pub default_delay_secs: u64,

    /// Piso aplicado a qualquer atraso pedido pela linha de comando.
    #[serde(default = "default_delay_floor_secs")]
    pub delay_floor_secs: u64,

    /// Quantas tentativas recentes ficam disponíveis para consulta.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Por quanto tempo um job encerrado continua consultável.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Marcadores de credencial expirada/inválida no texto de erro.
    #[serde(default = "default_fatal_markers")]
    pub fatal_markers: Vec<String>,

    /// Fragmentos removidos de toda mensagem renderizada.
    #[serde(default = "default_disallowed_fragments")]
    pub disallowed_fragments: Vec<String>,

    /// Diretório onde o log completo de cada job é exportado ao final.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_delay_secs() -> u64 {
    60
}

fn default_delay_floor_secs() -> u64 {
    10
}

fn default_log_capacity() -> usize {
    100
}

// Dez minutos.
fn default_retention_secs() -> u64 {
    600
}

fn default_fatal_markers() -> Vec<String> {
    DEFAULT_FATAL_MARKERS.iter().map(|s| s.to_string()).collect()
}

fn default_disallowed_fragments() -> Vec<String> {
    DEFAULT_DISALLOWED_FRAGMENTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for RotorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            identity_endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            cooldown_secs: default_cooldown_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            default_delay_secs: default_delay_secs(),
            delay_floor_secs: default_delay_floor_secs(),
            log_capacity: default_log_capacity(),
            retention_secs: default_retention_secs(),
            fatal_markers: default_fatal_markers(),
            disallowed_fragments: default_disallowed_fragments(),
            export_dir: None,
        }
    }
}

impl RotorConfig {
    /// Carrega a configuração de `rotor.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<RotorConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo.
        if let Ok(endpoint) = std::env::var("ROTOR_ENDPOINT")
            && !endpoint.is_empty()
        {
            config.endpoint = endpoint;
        }
        if let Ok(url) = std::env::var("ROTOR_IDENTITY_ENDPOINT")
            && !url.is_empty()
        {
            config.identity_endpoint = Some(url);
        }

        Ok(config)
    }

    /// Falha se não houver endpoint configurado.
    pub fn require_endpoint(&self) -> Result<&str> {
        if self.endpoint.trim().is_empty() {
            return Err(RotorError::Config(format!(
                "no endpoint configured; set `endpoint` in {CONFIG_FILE} or ROTOR_ENDPOINT"
            )));
        }
        Ok(&self.endpoint)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Aplica o piso configurado a um atraso pedido pelo usuário.
    pub fn clamp_delay(&self, secs: u64) -> Duration {
        Duration::from_secs(secs.max(self.delay_floor_secs))
    }

    /// Monta a política de um job a partir da configuração e dos ajustes da CLI.
    pub fn job_policy(
        &self,
        delay_secs: Option<u64>,
        max_delay_secs: Option<u64>,
        delay_on: DelayTrigger,
        cooldown_secs: Option<u64>,
    ) -> JobPolicy {
        let min = self.clamp_delay(delay_secs.unwrap_or(self.default_delay_secs));
        let delay = match max_delay_secs {
            Some(max) => DelayPolicy::randomized(min, self.clamp_delay(max)),
            None => DelayPolicy::fixed(min),
        };

        JobPolicy {
            delay: DelayPolicy { delay_on, ..delay },
            cooldown: Duration::from_secs(cooldown_secs.unwrap_or(self.cooldown_secs)),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            request_timeout: self.request_timeout(),
            disallowed_fragments: self.disallowed_fragments.clone(),
            resolve_identity: self.identity_endpoint.is_some(),
            log_capacity: self.log_capacity,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            retention: Duration::from_secs(self.retention_secs),
            export_dir: self.export_dir.clone(),
        }
    }
}
