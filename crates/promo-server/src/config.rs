use std::path::PathBuf;

use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml` and
/// `PROMO_*` environment variables. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub store_path:               PathBuf,
  /// Days a distributed promo code stays valid.
  pub promo_code_validity_days: i64,
  pub seed_demo_data:           bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                     "127.0.0.1".into(),
      port:                     8080,
      store_path:               PathBuf::from("promo.db"),
      promo_code_validity_days: 30,
      seed_demo_data:           false,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn load(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_source_falls_back_to_defaults() {
    let cfg = load("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.store_path, PathBuf::from("promo.db"));
    assert_eq!(cfg.promo_code_validity_days, 30);
    assert!(!cfg.seed_demo_data);
  }

  #[test]
  fn file_values_override_defaults() {
    let cfg = load("port = 9000\npromo_code_validity_days = 7\nseed_demo_data = true\n");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.promo_code_validity_days, 7);
    assert!(cfg.seed_demo_data);
  }
}
