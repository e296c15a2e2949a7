use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// File locations for one pipeline run.
///
/// Every field is optional in YAML; missing ones fall back to the defaults
/// below, which are the file names the job has always used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub sales_input: PathBuf,
    pub capability_input: PathBuf,
    pub sales_output: PathBuf,
    pub capability_output: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sales_input: "electricity_sales.csv".into(),
            capability_input: "electricity_capability_nested.json".into(),
            sales_output: "loaded__electricity_sales.csv".into(),
            capability_output: "loaded__electricity_capability.parquet".into(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing pipeline config")
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = PipelineConfig::from_yaml_str("sales_output: out/sales.csv\n").unwrap();
        assert_eq!(cfg.sales_output, PathBuf::from("out/sales.csv"));
        assert_eq!(cfg.sales_input, PipelineConfig::default().sales_input);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PipelineConfig::from_yaml_str("sales_ouput: x.csv\n").is_err());
    }

    #[test]
    fn reads_from_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("etl.yaml");
        let cfg = PipelineConfig {
            capability_output: "cap.parquet".into(),
            ..Default::default()
        };
        fs::write(&path, serde_yaml::to_string(&cfg).unwrap()).unwrap();

        assert_eq!(PipelineConfig::from_yaml_file(&path).unwrap(), cfg);
    }
}
