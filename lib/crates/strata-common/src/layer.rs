use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque per-layer configuration. Each layer variant parses the keys it
/// understands into its own typed settings.
pub type LayerConfig = serde_json::Map<String, serde_json::Value>;

/// One node of the layer graph.
///
/// The name is the key the layer is declared under, so it is not part of the
/// serialized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    #[serde(skip)]
    pub name: String,
    /// Variant selector. Defaults to the layer name when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub config: LayerConfig,
}

fn default_enabled() -> bool {
    true
}

impl LayerSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            enabled: true,
            depends_on: Vec::new(),
            config: LayerConfig::new(),
        }
    }

    #[must_use]
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: LayerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The variant this layer is built as.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.name)
    }
}

/// The declarative layer graph, in declaration order.
///
/// Serialized as a map of `name -> spec`. Declaration order is significant:
/// the resolver uses it to break ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerGraph {
    layers: Vec<LayerSpec>,
}

impl LayerGraph {
    #[must_use]
    pub fn new(layers: Vec<LayerSpec>) -> Self {
        Self { layers }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerSpec> {
        self.layers.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Enabled layers only, declaration order preserved.
    pub fn enabled(&self) -> impl Iterator<Item = &LayerSpec> {
        self.layers.iter().filter(|l| l.enabled)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<LayerSpec> {
        self.layers
    }
}

impl FromIterator<LayerSpec> for LayerGraph {
    fn from_iter<T: IntoIterator<Item = LayerSpec>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Serialize for LayerGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.layers.len()))?;
        for layer in &self.layers {
            map.serialize_entry(&layer.name, layer)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LayerGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GraphVisitor;

        impl<'de> Visitor<'de> for GraphVisitor {
            type Value = LayerGraph;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of layer name to layer definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LayerGraph, A::Error> {
                let mut layers: Vec<LayerSpec> = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, mut spec)) = access.next_entry::<String, LayerSpec>()? {
                    if layers.iter().any(|l| l.name == name) {
                        return Err(de::Error::custom(format!("duplicate layer '{name}'")));
                    }
                    spec.name = name;
                    layers.push(spec);
                }
                Ok(LayerGraph { layers })
            }
        }

        deserializer.deserialize_map(GraphVisitor)
    }
}
