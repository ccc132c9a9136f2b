//! Sample and dataset model shared with the host agent

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One measurement dispatched by the host agent.
///
/// A sample carries one numeric value per data source of its type; the
/// matching [`DataSource`] descriptors come from the host through a
/// [`DatasetResolver`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Measurement time, seconds since the Unix epoch
    pub time: f64,
    pub plugin: String,
    pub plugin_instance: String,
    pub type_name: String,
    pub type_instance: String,
    pub values: Vec<f64>,
    /// Free-form metadata attached by the host, merged into the labels
    pub meta: BTreeMap<String, String>,
}

impl Sample {
    pub fn new(plugin: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            time: 0.0,
            plugin: plugin.into(),
            plugin_instance: String::new(),
            type_name: type_name.into(),
            type_instance: String::new(),
            values: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn with_plugin_instance(mut self, plugin_instance: impl Into<String>) -> Self {
        self.plugin_instance = plugin_instance.into();
        self
    }

    pub fn with_type_instance(mut self, type_instance: impl Into<String>) -> Self {
        self.type_instance = type_instance.into();
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.values.push(value);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// One data source of a sample type, as reported by the host agent
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataSource {
    pub name: String,
    pub kind: DataSourceKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DataSource {
    pub fn gauge(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DataSourceKind::Gauge,
            min: None,
            max: None,
        }
    }

    pub fn counter(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DataSourceKind::Counter,
            min: None,
            max: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataSourceKind {
    Gauge,
    Counter,
    Derive,
    Absolute,
}

impl From<&str> for DataSourceKind {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "COUNTER" => DataSourceKind::Counter,
            "DERIVE" => DataSourceKind::Derive,
            "ABSOLUTE" => DataSourceKind::Absolute,
            _ => DataSourceKind::Gauge, // Default fallback
        }
    }
}

/// Dataset lookup provided by the host agent.
///
/// Maps a sample type to the ordered data sources its values correspond to.
pub trait DatasetResolver: Send + Sync {
    fn lookup(&self, type_name: &str) -> Option<Vec<DataSource>>;
}

/// Map-backed resolver for embedders that know their types up front
#[derive(Debug, Default)]
pub struct StaticDatasets {
    datasets: HashMap<String, Vec<DataSource>>,
}

impl StaticDatasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, type_name: impl Into<String>, sources: Vec<DataSource>) -> Self {
        self.datasets.insert(type_name.into(), sources);
        self
    }
}

impl DatasetResolver for StaticDatasets {
    fn lookup(&self, type_name: &str) -> Option<Vec<DataSource>> {
        self.datasets.get(type_name).cloned()
    }
}
