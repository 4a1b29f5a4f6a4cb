use std::fmt;
use std::sync::Arc;

use scrape_logging::{scrape_debug, scrape_warn};
use serde_json::Value;

use crate::path::{dotted, lookup};
use crate::{
    ExtractedPayload, ExtractionContext, ExtractionError, NormalizedRecord, RecordFields,
    ResourceKind,
};

/// One historical layout of a site's embedded payload.
///
/// `root` leads to the sub-structure the field mapper reads; every path in
/// `required` must be present below it for the shape to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub name: &'static str,
    pub root: &'static [&'static str],
    pub required: &'static [&'static [&'static str]],
}

impl Shape {
    /// Resolves the shape root, or reports the first missing key path.
    fn resolve<'a>(&self, payload: &'a Value) -> Result<&'a Value, String> {
        for depth in 1..=self.root.len() {
            if lookup(payload, &self.root[..depth]).is_none() {
                return Err(dotted(&self.root[..depth]));
            }
        }
        let root = lookup(payload, self.root).unwrap_or(payload);
        for required in self.required {
            if lookup(root, required).is_none() {
                let mut full: Vec<&str> = self.root.to_vec();
                full.extend_from_slice(required);
                return Err(dotted(&full));
            }
        }
        Ok(root)
    }
}

/// Inputs available to a field mapper besides the shape root.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    pub source_url: &'a str,
    pub payload: &'a Value,
    pub shape: &'a str,
}

pub type FieldMapper = Arc<dyn Fn(&Value, &MapContext<'_>) -> RecordFields + Send + Sync>;

/// Ordered shapes for one resource kind plus the mapper they all feed.
#[derive(Clone)]
pub struct KindSchema {
    kind: ResourceKind,
    shapes: Vec<Shape>,
    mapper: FieldMapper,
}

impl KindSchema {
    pub fn new<F>(kind: ResourceKind, shapes: Vec<Shape>, mapper: F) -> Self
    where
        F: Fn(&Value, &MapContext<'_>) -> RecordFields + Send + Sync + 'static,
    {
        Self {
            kind,
            shapes,
            mapper: Arc::new(mapper),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }
}

impl fmt::Debug for KindSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindSchema")
            .field("kind", &self.kind)
            .field("shapes", &self.shapes)
            .finish_non_exhaustive()
    }
}

/// Maps located payloads onto strict records, trying known shapes in order.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    schemas: Vec<KindSchema>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: KindSchema) -> Self {
        self.schemas.retain(|existing| existing.kind != schema.kind);
        self.schemas.push(schema);
        self
    }

    pub fn supports(&self, kind: ResourceKind) -> bool {
        self.schema_for(kind).is_some()
    }

    fn schema_for(&self, kind: ResourceKind) -> Option<&KindSchema> {
        self.schemas.iter().find(|schema| schema.kind == kind)
    }

    /// Pure function of its inputs: no IO, no clock.
    pub fn normalize(
        &self,
        payload: &ExtractedPayload,
        kind: ResourceKind,
        source_url: &str,
        fetched_at: &str,
    ) -> Result<NormalizedRecord, ExtractionError> {
        let schema = self.schema_for(kind).ok_or_else(|| {
            ExtractionError::validation(format!("no extraction schema for {kind} resources"))
        })?;

        let root = payload.root();
        let mut tried = Vec::with_capacity(schema.shapes.len());
        let mut last_missing = String::new();

        for shape in &schema.shapes {
            tried.push(shape.name.to_string());
            match shape.resolve(root) {
                Ok(shape_root) => {
                    scrape_debug!("Payload for {source_url} matches shape {}", shape.name);
                    let ctx = MapContext {
                        source_url,
                        payload: root,
                        shape: shape.name,
                    };
                    let fields = (schema.mapper)(shape_root, &ctx);
                    return Ok(NormalizedRecord {
                        id: fields.id(),
                        source_url: source_url.to_string(),
                        kind,
                        fields,
                        fetched_at: fetched_at.to_string(),
                    });
                }
                Err(missing) => {
                    scrape_warn!(
                        "Shape {} does not apply to {source_url}: missing {missing}",
                        shape.name
                    );
                    last_missing = missing;
                }
            }
        }

        Err(ExtractionError::DataExtraction {
            message: format!(
                "all {} known {kind} shapes exhausted; last missing key path: {last_missing}",
                tried.len()
            ),
            context: ExtractionContext::Shape {
                kind,
                shapes_tried: tried,
                missing_path: last_missing,
            },
        })
    }
}
