use std::{collections::HashMap, fs};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL of the node serving the REST fallback transport.
    pub node_url: String,
    /// Application identifier required by REST context creation.
    pub application_id: Option<String>,
    pub scratch_database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_url: "http://127.0.0.1:2428".into(),
            application_id: None,
            scratch_database_url: "sqlite://./data/scratch.db".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("agreement.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("node_url") {
                settings.node_url = v.clone();
            }
            if let Some(v) = file_cfg.get("application_id") {
                settings.application_id = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("scratch_database_url") {
                settings.scratch_database_url = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("NODE_URL") {
        settings.node_url = v;
    }
    if let Ok(v) = std::env::var("APP__NODE_URL") {
        settings.node_url = v;
    }

    if let Ok(v) = std::env::var("APPLICATION_ID") {
        settings.application_id = Some(v);
    }
    if let Ok(v) = std::env::var("APP__APPLICATION_ID") {
        settings.application_id = Some(v);
    }

    if let Ok(v) = std::env::var("SCRATCH_DATABASE_URL") {
        settings.scratch_database_url = v;
    }
    if let Ok(v) = std::env::var("APP__SCRATCH_DATABASE_URL") {
        settings.scratch_database_url = v;
    }

    settings
}

pub fn validate_node_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid node url '{raw}'"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("node url must use http or https: {raw}");
    }
    Ok(url)
}
