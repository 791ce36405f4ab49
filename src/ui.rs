//! Interface de terminal do rotor: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente
//! um job em execução no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use rotor::job::{JobSnapshot, Phase};

/// Indicador visual de progresso para um job em execução.
///
/// Mostra um spinner com os contadores do job e, ao final, um resumo
/// colorido: verde quando o job foi parado, amarelo quando as credenciais
/// se esgotaram.
pub struct JobProgress {
    // Spinner do indicatif.
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    /// Inicia o spinner para o job informado.
    pub fn start(job_id: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Starting job {job_id}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem do spinner com o snapshot mais recente.
    pub fn update(&self, snapshot: &JobSnapshot) {
        self.pb.set_message(format!(
            "{} | {} ok | {} failed | {}/{} credentials | {}",
            snapshot.phase,
            self.green.apply_to(snapshot.success_count),
            self.red.apply_to(snapshot.failed_count),
            snapshot.credentials_valid,
            snapshot.credentials_total,
            snapshot.last_log
        ));
    }

    /// Avisa que o cancelamento foi pedido (Ctrl-C).
    pub fn stopping(&self) {
        self.pb.println(format!(
            "  {} Stop requested, finishing current attempt...",
            self.yellow.apply_to("■")
        ));
    }

    /// Finaliza o spinner e exibe o resumo final do job.
    pub fn complete(&self, snapshot: &JobSnapshot) {
        self.pb.finish_and_clear();
        match snapshot.phase {
            Phase::Exhausted => println!(
                "  {} Job {} ran out of valid credentials",
                self.yellow.apply_to("!"),
                snapshot.id
            ),
            _ => println!(
                "  {} Job {} stopped",
                self.green.apply_to("✓"),
                snapshot.id
            ),
        }
        println!(
            "    {} delivered, {} failed, {}/{} credentials still valid",
            self.green.apply_to(snapshot.success_count),
            self.red.apply_to(snapshot.failed_count),
            snapshot.credentials_valid,
            snapshot.credentials_total
        );
    }
}
