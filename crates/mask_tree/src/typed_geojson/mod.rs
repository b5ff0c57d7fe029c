use std::marker::PhantomData;
use serde::{Deserialize, Serialize};
use geojson::{Geometry, JsonObject};
use schemars::JsonSchema;

use crate::types::Color;

/// Properties carried by each vector-tree feature
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[schemars(description = "Properties of one vector tree node")]
pub struct VectorNodeProperties {
    #[schemars(description = "Position of the node in level order, root is 0")]
    pub id: usize,
    #[schemars(description = "Id of the parent node, absent for the root")]
    pub parent: Option<usize>,
    #[schemars(description = "Depth of the node, root is 0")]
    pub level: u32,
    #[schemars(description = "Optional category tag")]
    pub category: Option<u32>,
    #[schemars(description = "Representative RGB color, channels in 0-1")]
    pub color: Option<Color>,
    #[schemars(description = "Whether the node was generated rather than traced")]
    #[serde(default)]
    pub synthetic: bool,
    #[schemars(description = "Area of the polygon in square pixels")]
    pub area: f64,
}

/// Type alias for vector tree GeoJSON
pub type VectorGeoJson = TypedGeoJson<VectorNodeProperties>;

/// A GeoJSON Feature whose properties deserialize into `P`.
#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    pub feature: geojson::Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    for<'de> P: Serialize + Deserialize<'de>,
{
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        let feature = geojson::Feature {
            bbox: None,
            geometry,
            id: None,
            properties: serde_json::to_value(properties).ok().and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        };
        Self {
            feature,
            _properties: PhantomData,
        }
    }

    /// Typed view of the feature's properties, if they parse.
    pub fn properties(&self) -> Option<P> {
        self.feature.properties.as_ref().and_then(|p| {
            serde_json::from_value(serde_json::Value::Object(p.clone())).ok()
        })
    }
}

impl<P> From<geojson::Feature> for TypedFeature<P> {
    fn from(feature: geojson::Feature) -> Self {
        Self {
            feature,
            _properties: PhantomData,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeatureCollection<P> {
    pub bbox: Option<Vec<f64>>,
    pub features: Vec<TypedFeature<P>>,
    pub foreign_members: Option<JsonObject>,
}

impl<P> TypedFeatureCollection<P> {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[TypedFeature<P>] {
        &self.features
    }

    /// Plain `geojson` collection for writing out.
    pub fn into_feature_collection(self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: self.bbox,
            features: self.features.into_iter().map(|f| f.feature).collect(),
            foreign_members: self.foreign_members,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum TypedGeoJson<P> {
    Geometry(Geometry),
    Feature(TypedFeature<P>),
    FeatureCollection(TypedFeatureCollection<P>),
}

impl<P> TypedGeoJson<P> {
    pub fn as_feature_collection(&self) -> Option<&TypedFeatureCollection<P>> {
        match self {
            TypedGeoJson::FeatureCollection(fc) => Some(fc),
            _ => None,
        }
    }

    pub fn into_feature_collection(self) -> Option<TypedFeatureCollection<P>> {
        match self {
            TypedGeoJson::FeatureCollection(fc) => Some(fc),
            _ => None,
        }
    }
}

impl VectorGeoJson {
    /// Features at one depth of the tree
    pub fn features_at_level(&self, level: u32) -> Vec<&TypedFeature<VectorNodeProperties>> {
        self.filter_features(|props| props.level == level)
    }

    /// Features carrying the given category
    pub fn features_with_category(&self, category: u32) -> Vec<&TypedFeature<VectorNodeProperties>> {
        self.filter_features(|props| props.category == Some(category))
    }

    /// Largest feature by polygon area
    pub fn largest_feature(&self) -> Option<&TypedFeature<VectorNodeProperties>> {
        self.as_feature_collection()?.features.iter().max_by(|a, b| {
            let area_a = a.properties().map(|p| p.area).unwrap_or(0.0);
            let area_b = b.properties().map(|p| p.area).unwrap_or(0.0);
            area_a.total_cmp(&area_b)
        })
    }

    /// Node count recorded in the collection's foreign members
    pub fn node_count(&self) -> Option<usize> {
        self.as_feature_collection()?
            .foreign_members
            .as_ref()
            .and_then(|foreign| foreign.get("node_count"))
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
    }

    fn filter_features(
        &self,
        keep: impl Fn(&VectorNodeProperties) -> bool,
    ) -> Vec<&TypedFeature<VectorNodeProperties>> {
        match self.as_feature_collection() {
            Some(fc) => fc
                .features
                .iter()
                .filter(|feature| feature.properties().is_some_and(|p| keep(&p)))
                .collect(),
            None => Vec::new(),
        }
    }
}
