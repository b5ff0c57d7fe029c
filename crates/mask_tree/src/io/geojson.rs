use std::path::Path;

use geojson::{FeatureCollection, Geometry, Value};

use crate::{
    error::{MaskTreeError, Result},
    tree::VectorNode,
    typed_geojson::{TypedFeature, TypedFeatureCollection, TypedGeoJson, VectorGeoJson, VectorNodeProperties},
    types::Ring,
};

impl VectorNode {
    /// One polygon feature per node in level order, in image `(x, y)`
    /// coordinates. Tree shape is kept through `id`/`parent` properties.
    pub fn to_typed_geojson(&self) -> VectorGeoJson {
        let mut features = Vec::new();
        let mut queue = std::collections::VecDeque::from([(self, None::<usize>)]);
        while let Some((node, parent)) = queue.pop_front() {
            let id = features.len();
            let properties = VectorNodeProperties {
                id,
                parent,
                level: node.level,
                category: node.category,
                color: node.color,
                synthetic: node.synthetic,
                area: node.area(),
            };
            features.push(TypedFeature::new(Some(ring_geometry(&node.exterior)), properties));
            queue.extend(node.children.iter().map(|child| (child, Some(id))));
        }

        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert("node_count".to_string(), serde_json::Value::from(features.len()));

        TypedGeoJson::FeatureCollection(TypedFeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        match self.to_typed_geojson().into_feature_collection() {
            Some(collection) => collection.into_feature_collection(),
            None => FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
        }
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    pub fn save_geojson(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }

    pub fn from_geojson_file(path: impl AsRef<Path>) -> Result<Self> {
        let geojson_str = std::fs::read_to_string(path)?;
        Self::from_geojson_string(&geojson_str)
    }

    /// Rebuild a tree written by [`VectorNode::to_geojson`].
    pub fn from_geojson_string(geojson_str: &str) -> Result<Self> {
        let collection: FeatureCollection = geojson_str.parse()?;

        let mut slots: Vec<Option<VectorNode>> = Vec::with_capacity(collection.features.len());
        let mut parents: Vec<Option<usize>> = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let typed: TypedFeature<VectorNodeProperties> = feature.into();
            let props = typed
                .properties()
                .ok_or_else(|| MaskTreeError::Corrupt("feature without node properties".into()))?;
            let id = slots.len();
            if props.id != id {
                return Err(MaskTreeError::Corrupt(format!("feature {id} carries id {}", props.id)));
            }
            match props.parent {
                None if id != 0 => return Err(MaskTreeError::Corrupt(format!("feature {id} has no parent"))),
                Some(parent) if parent >= id => {
                    return Err(MaskTreeError::Corrupt(format!("feature {id} listed before its parent")));
                }
                _ => {}
            }

            let geometry = typed
                .feature
                .geometry
                .ok_or_else(|| MaskTreeError::Corrupt(format!("feature {id} has no geometry")))?;
            let mut node = VectorNode::new(ring_from_geometry(geometry)?, props.category, props.color, props.level);
            node.synthetic = props.synthetic;
            slots.push(Some(node));
            parents.push(props.parent);
        }

        // children always follow their parent, so attach from the back
        for id in (1..slots.len()).rev() {
            let (Some(parent), Some(node)) = (parents[id], slots[id].take()) else {
                continue;
            };
            if let Some(parent_node) = slots[parent].as_mut() {
                parent_node.children.insert(0, node);
            }
        }

        slots
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| MaskTreeError::Corrupt("GeoJSON has no features".into()))
    }
}

/// Closed GeoJSON ring with `[x, y]` = `[column, row]` positions.
fn ring_geometry(ring: &Ring) -> Geometry {
    let mut positions: Vec<Vec<f64>> = ring.iter().map(|&[row, col]| vec![col, row]).collect();
    if let Some(first) = positions.first().cloned() {
        positions.push(first);
    }
    Geometry::new(Value::Polygon(vec![positions]))
}

fn ring_from_geometry(geometry: Geometry) -> Result<Ring> {
    let Value::Polygon(rings) = geometry.value else {
        return Err(MaskTreeError::Corrupt("node geometry is not a polygon".into()));
    };
    let exterior = rings
        .into_iter()
        .next()
        .ok_or_else(|| MaskTreeError::Corrupt("polygon without exterior ring".into()))?;

    let mut ring = Vec::with_capacity(exterior.len());
    for position in exterior {
        match position.as_slice() {
            [x, y, ..] => ring.push([*y, *x]),
            _ => return Err(MaskTreeError::Corrupt("position with fewer than two coordinates".into())),
        }
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    Ok(ring)
}
