//! Tipos de dados trocados com o serviço de registros judiciais.
//!
//! O serviço é tratado como opaco: só os campos que o pipeline consome
//! (identificador do processo, título, lista de entradas do docket) são
//! tipados. O resto do docket é preservado como JSON bruto via `serde(flatten)`
//! para que o artefato gravado em disco não perca informação.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resultado da busca de um processo pelo número do docket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseLookup {
    /// Identificador atribuído pelo serviço remoto.
    pub external_case_id: String,
    /// Título do processo (ex.: "X v. Y").
    #[serde(default)]
    pub title: String,
}

/// Seções opcionais pedidas junto com o docket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocketOptions {
    pub show_parties_and_counsel: bool,
    pub show_terminated_parties: bool,
    pub show_list_of_member_cases: bool,
    pub include_pdf_headers: bool,
    pub show_multiple_docs: bool,
}

impl DocketOptions {
    /// Docket completo: partes, partes encerradas, processos membros e
    /// cabeçalhos de PDF, sem expandir documentos múltiplos.
    pub fn full() -> Self {
        Self {
            show_parties_and_counsel: true,
            show_terminated_parties: true,
            show_list_of_member_cases: true,
            include_pdf_headers: true,
            show_multiple_docs: false,
        }
    }

    /// Pares de query string na ordem em que o serviço os documenta.
    pub fn query_pairs(&self) -> [(&'static str, &'static str); 5] {
        let flag = |on: bool| if on { "true" } else { "false" };
        [
            ("show_parties_and_counsel", flag(self.show_parties_and_counsel)),
            ("show_terminated_parties", flag(self.show_terminated_parties)),
            ("show_list_of_member_cases", flag(self.show_list_of_member_cases)),
            ("include_pdf_headers", flag(self.include_pdf_headers)),
            ("show_multiple_docs", flag(self.show_multiple_docs)),
        ]
    }
}

/// Uma entrada do docket. Só o identificador do documento é tipado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocketEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Dados estruturados do docket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocketData {
    /// Entradas do docket, na ordem devolvida pelo serviço.
    #[serde(default)]
    pub docket_entries: Vec<DocketEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocketData {
    /// Identificador do documento da primeira entrada, se houver.
    pub fn first_document_id(&self) -> Option<&str> {
        self.docket_entries
            .first()
            .and_then(|entry| entry.document_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Docket completo: dados estruturados mais o corpo bruto da resposta.
#[derive(Debug, Clone, PartialEq)]
pub struct Docket {
    pub data: DocketData,
    pub raw_response: String,
}
