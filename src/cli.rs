//! Interface de linha de comando do rotor baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, check)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use rotor::job::DelayTrigger;

/// rotor: executa jobs de entrega em segundo plano com rodízio de credenciais.
#[derive(Debug, Parser)]
#[command(name = "rotor", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./rotor.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inicia um job e acompanha o progresso até Ctrl-C ou esgotamento.
    Run {
        #[command(flatten)]
        resources: ResourceArgs,

        /// Atraso entre tentativas, em segundos (sujeito ao piso configurado).
        #[arg(long)]
        delay: Option<u64>,

        /// Atraso máximo; quando presente o atraso é sorteado entre --delay e este valor.
        #[arg(long)]
        max_delay: Option<u64>,

        /// Quando aplicar o atraso.
        #[arg(long, value_enum, default_value_t = DelayOn::Always)]
        delay_on: DelayOn,

        /// Tempo mínimo de descanso de cada credencial, em segundos.
        #[arg(long)]
        cooldown: Option<u64>,

        /// Diretório para exportar o log completo ao final.
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// Valida as listas de recursos sem enviar nada.
    Check {
        #[command(flatten)]
        resources: ResourceArgs,
    },
}

/// Listas de entrada de um job.
#[derive(Debug, Args)]
pub struct ResourceArgs {
    /// Arquivo com uma credencial por linha.
    #[arg(long)]
    pub credentials: PathBuf,

    /// Arquivo com uma mensagem por linha.
    #[arg(long)]
    pub messages: PathBuf,

    /// Arquivo com um alvo por linha, ou lista separada por vírgulas.
    #[arg(long)]
    pub targets: String,

    /// Texto colocado antes de cada mensagem.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Texto colocado depois de cada mensagem.
    #[arg(long)]
    pub suffix: Option<String>,
}

/// Argumento aceito pela CLI, mapeado para [`DelayTrigger`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DelayOn {
    /// Espera depois de sucessos e de falhas.
    Always,
    /// Espera apenas depois de sucessos.
    SuccessOnly,
}

impl From<DelayOn> for DelayTrigger {
    fn from(value: DelayOn) -> Self {
        match value {
            DelayOn::Always => DelayTrigger::Always,
            DelayOn::SuccessOnly => DelayTrigger::SuccessOnly,
        }
    }
}
