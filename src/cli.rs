//! Interface de linha de comando do docketrun baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (um por estágio do
//! pipeline, mais `status`) e flags globais (--config, --store, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::record::Stage;

/// docketrun — coleta retomável de dockets e documentos judiciais.
#[derive(Debug, Parser)]
#[command(name = "docketrun", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./docketrun.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Arquivo de registros a usar, sobrepondo `store_path` da configuração.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve o identificador externo de cada processo pendente.
    ResolveIds,

    /// Baixa o docket (JSON e HTML) de cada processo já resolvido.
    FetchDockets,

    /// Baixa o primeiro documento de cada docket já coletado.
    FetchDocuments,

    /// Compacta os diretórios de saída em arquivos zip.
    Archive,

    /// Mostra quantos registros estão em cada estado.
    Status {
        /// Lista também cada registro.
        #[arg(long)]
        all: bool,
    },
}

impl Command {
    /// Estágio do pipeline selecionado, ou `None` para `status`.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Command::ResolveIds => Some(Stage::ResolveIds),
            Command::FetchDockets => Some(Stage::FetchDockets),
            Command::FetchDocuments => Some(Stage::FetchDocuments),
            Command::Archive => Some(Stage::Archive),
            Command::Status { .. } => None,
        }
    }
}
