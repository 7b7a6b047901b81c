//! Interface de terminal do docketrun — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`StageProgress`] acompanha visualmente
//! a execução de um estágio, registro por registro.

use std::cell::Cell;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::fmt::writer::MakeWriter;

use crate::error::PipelineError;
use crate::pipeline::StageObserver;
use crate::record::{CaseRecord, RecordKey, Stage, StageState, StateCounts};
use crate::runner::RunOutcome;
use crate::store::RecordStore;

/// Destino dos logs do `tracing` em stderr que não atropela o spinner.
///
/// Enquanto um [`StageProgress`] está ativo, cada evento é escrito com o
/// spinner suspenso; sem spinner, vai direto para stderr.
#[derive(Clone, Default)]
pub struct LogWriter {
    active: Arc<Mutex<Option<ProgressBar>>>,
}

impl LogWriter {
    fn attach(&self, pb: &ProgressBar) {
        if let Ok(mut guard) = self.active.lock() {
            *guard = Some(pb.clone());
        }
    }

    fn detach(&self) {
        if let Ok(mut guard) = self.active.lock() {
            *guard = None;
        }
    }

    fn active(&self) -> Option<ProgressBar> {
        self.active.lock().ok().and_then(|guard| guard.clone())
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EventWriter {
            logs: self.clone(),
            buf: Vec::new(),
        }
    }
}

/// Acumula um evento e o escreve de uma vez ao ser descartado.
pub struct EventWriter {
    logs: LogWriter,
    buf: Vec<u8>,
}

impl Write for EventWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        let write = move || {
            let _ = io::stderr().write_all(&buf);
        };
        match self.logs.active() {
            Some(pb) => pb.suspend(write),
            None => write(),
        }
    }
}

/// Indicador visual de progresso para a execução de um estágio no terminal.
///
/// Exibe um spinner com o registro em processamento; falhas são impressas
/// acima do spinner em vermelho, sem interrompê-lo.
pub struct StageProgress {
    // Spinner do indicatif.
    pb: ProgressBar,
    // Estágio em execução, exibido como prefixo.
    stage: Stage,
    // Registros concluídos até agora (com ou sem falha).
    done: Cell<usize>,
    red: Style,
    logs: LogWriter,
}

impl StageProgress {
    /// Inicia o spinner para o estágio e retorna a instância de progresso.
    /// Os logs passam a ser escritos com o spinner suspenso.
    pub fn start(stage: Stage, logs: &LogWriter) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("{stage}: selecting eligible records"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        logs.attach(&pb);

        Self {
            pb,
            stage,
            done: Cell::new(0),
            red: Style::new().red().bold(),
            logs: logs.clone(),
        }
    }

    /// Remove o spinner do terminal.
    pub fn finish(&self) {
        self.logs.detach();
        self.pb.finish_and_clear();
    }
}

impl StageObserver for StageProgress {
    fn record_started(&self, key: RecordKey, record: &CaseRecord) {
        self.pb.set_message(format!(
            "{} [{} done] #{key} {} {}",
            self.stage,
            self.done.get(),
            record.court,
            record.docket_number
        ));
    }

    fn record_finished(&self, key: RecordKey, error: Option<&PipelineError>) {
        self.done.set(self.done.get() + 1);
        if let Some(error) = error {
            self.pb
                .println(format!("  {} #{key}: {error}", self.red.apply_to("✗")));
        }
    }
}

/// Imprime o resumo final de uma execução.
pub fn print_outcome(outcome: &RunOutcome) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    match outcome {
        RunOutcome::Records(report) => {
            let mark = if report.is_clean() {
                green.apply_to("✓")
            } else {
                red.apply_to("✗")
            };
            println!(
                "  {mark} {}: {} eligible, {} succeeded, {} failed",
                report.stage,
                report.eligible,
                report.succeeded,
                report.failures.len()
            );
            for failure in &report.failures {
                println!("      #{}: {}", failure.key, failure.error);
            }
        }
        RunOutcome::Archived(bundles) => {
            for bundle in bundles {
                println!(
                    "  {} {} ({} files from {})",
                    green.apply_to("✓"),
                    bundle.archive.display(),
                    bundle.files,
                    bundle.source.display()
                );
            }
        }
    }
}

/// Imprime a contagem de registros por estado e, opcionalmente, cada registro.
pub fn print_status(store: &RecordStore, all: bool) {
    let bold = Style::new().bold();
    let yellow = Style::new().yellow();
    let counts = StateCounts::tally(store.records().map(|(_, record)| record));

    println!("{}", bold.apply_to(format!("─── {} ───", store.path().display())));
    for state in [
        StageState::Unresolved,
        StageState::DocketPending,
        StageState::DocumentPending,
        StageState::Complete,
    ] {
        println!("  {:<18} {}", state.to_string(), counts.get(state));
    }
    let inconsistent = counts.get(StageState::Inconsistent);
    if inconsistent > 0 {
        println!(
            "  {:<18} {}",
            yellow.apply_to(StageState::Inconsistent.to_string()),
            inconsistent
        );
    }
    println!("  {:<18} {}", "TOTAL", counts.total());

    if all {
        println!();
        for (key, record) in store.records() {
            println!(
                "  #{key:<5} {:<16} {} {:<14} {:<10} {}",
                record.state().to_string(),
                record.court,
                record.docket_number,
                record.external_case_id,
                record.title
            );
        }
    }
}
