//! Tipos de erro para o cliente do serviço de registros judiciais.
//!
//! Define [`ClientError`] com variantes para ausência de correspondência,
//! erros da API, erros de rede e respostas que não puderam ser interpretadas.

use thiserror::Error;

/// Erros que podem ocorrer ao consultar o serviço de registros judiciais.
#[derive(Debug, Error)]
pub enum ClientError {
    /// O serviço não encontrou nenhum processo para o número informado.
    #[error("no case matches docket {docket_number} in {court} (office {office})")]
    NoMatch {
        court: String,
        docket_number: String,
        office: String,
    },

    /// Erro retornado pela API (ex.: 401 credenciais inválidas, 500 erro interno).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// A URL base configurada não pode receber segmentos de caminho.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// A resposta chegou mas o corpo não tem o formato esperado.
    #[error("failed to parse response: {0}")]
    ParseError(String),
}
