//! Configuração do docketrun carregada a partir de `docketrun.toml`.
//!
//! A struct [`DocketrunConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `DOCKETRUN_BASE_URL`, `DOCKETRUN_USERNAME` e
//! `DOCKETRUN_PASSWORD` têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "docketrun.toml";

/// Configuração de nível superior carregada de `docketrun.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocketrunConfig {
    /// Caminho do arquivo JSON com os registros dos processos.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Diretório raiz dos artefatos (`json/`, `html/`, `pdf/`, `zip/`).
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// URL base do serviço de registros judiciais. Vazio desabilita os
    /// estágios que dependem da rede.
    #[serde(default)]
    pub base_url: String,

    /// Usuário do serviço remoto.
    #[serde(default)]
    pub username: String,

    /// Senha do serviço remoto.
    #[serde(default)]
    pub password: String,

    /// Timeout de conexão em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout total de cada requisição em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Valor padrão para o arquivo de registros: "db/master.json".
fn default_store_path() -> PathBuf {
    PathBuf::from("db/master.json")
}

// Valor padrão para o diretório de artefatos: "downloads".
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for DocketrunConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            download_dir: default_download_dir(),
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DocketrunConfig {
    /// Carrega a configuração de `path`, ou de `docketrun.toml` no diretório
    /// atual quando nenhum caminho é dado.
    ///
    /// Um caminho explícito que não existe é erro; o arquivo padrão ausente
    /// resulta nos valores padrão.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str::<DocketrunConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Variáveis de ambiente não vazias substituem os valores do arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 3] = [
            ("DOCKETRUN_BASE_URL", &mut self.base_url),
            ("DOCKETRUN_USERNAME", &mut self.username),
            ("DOCKETRUN_PASSWORD", &mut self.password),
        ];
        for (name, field) in fields {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = DocketrunConfig::default();
        assert_eq!(config.store_path, PathBuf::from("db/master.json"));
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.base_url.is_empty());
        assert!(config.username.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            base_url = "https://records.example.test/api"
            username = "clerk"
            request_timeout_secs = 30
        "#;
        let config: DocketrunConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_url, "https://records.example.test/api");
        assert_eq!(config.username, "clerk");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.store_path, PathBuf::from("db/master.json"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = DocketrunConfig {
            base_url: "http://file".into(),
            username: "from-file".into(),
            password: "file-pass".into(),
            ..Default::default()
        };
        config.apply_env(|name| match name {
            "DOCKETRUN_USERNAME" => Some("from-env".into()),
            "DOCKETRUN_PASSWORD" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://file");
        assert_eq!(config.username, "from-env");
        // Empty variables are ignored.
        assert_eq!(config.password, "file-pass");
    }

    #[test]
    fn load_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        std::fs::write(&path, "store_path = \"data/cases.json\"\n").unwrap();

        let config = DocketrunConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.store_path, PathBuf::from("data/cases.json"));
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let tmp = TempDir::new().unwrap();
        let result = DocketrunConfig::load(Some(tmp.path().join("nope.toml").as_path()));
        assert!(result.is_err());
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();
        assert!(DocketrunConfig::load(Some(path.as_path())).is_err());
    }
}
