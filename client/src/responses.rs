use std::collections::HashMap;

use log::{trace, warn};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ResponseError;
use crate::{ClientError, Result};

/// A stored document. Field types depend on the schema.
pub type Doc = Map<String, Value>;

/// Decode a raw response body.
///
/// A populated `error` object turns into [`ClientError::Server`], which still
/// carries the full envelope.
pub fn decode(bytes: &[u8]) -> Result<Response> {
    let response: Response = serde_json::from_slice(bytes)?;
    if let Some(error) = response.error.clone() {
        warn!("server reported error {}: {}", error.code, error);
        return Err(ClientError::Server {
            error,
            response: Box::new(response),
        });
    }
    Ok(response)
}

/// Top-level response envelope. Sub-objects only appear when the matching
/// feature was requested.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Response {
    #[serde(rename = "responseHeader")]
    pub header: Option<ResponseHeader>,
    #[serde(rename = "response")]
    pub data: Option<ResponseData>,
    pub error: Option<ResponseError>,
    pub debug: Option<Map<String, Value>>,
    /// Real-time get of a single id.
    pub doc: Option<Doc>,
    /// Ping status.
    pub status: Option<String>,
    pub expanded: Option<HashMap<String, ResponseData>>,
    pub facet_counts: Option<FacetCounts>,
    pub grouped: Option<Grouped>,
}

impl Response {
    pub fn docs(&self) -> &[Doc] {
        self.data.as_ref().map(|d| d.docs.as_slice()).unwrap_or(&[])
    }

    pub fn num_found(&self) -> i64 {
        self.data.as_ref().map(|d| d.num_found).unwrap_or_default()
    }

    /// Expanded members of one collapsed group.
    pub fn expanded_group(&self, key: &str) -> Option<&ResponseData> {
        self.expanded.as_ref().and_then(|e| e.get(key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub status: i64,
    #[serde(rename = "QTime", default)]
    pub qtime: i64,
    /// Echoed request params; a value is a string or an array of strings.
    pub params: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseData {
    #[serde(rename = "numFound", default)]
    pub num_found: i64,
    #[serde(rename = "numFoundExact")]
    pub num_found_exact: Option<bool>,
    #[serde(default)]
    pub start: i64,
    #[serde(rename = "maxScore")]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub docs: Vec<Doc>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FacetCounts {
    #[serde(default)]
    pub facet_queries: HashMap<String, i64>,
    #[serde(default)]
    pub facet_fields: FacetFields,
    #[serde(default)]
    pub facet_pivot: HashMap<String, Vec<PivotField>>,
}

impl FacetCounts {
    /// Term counts of one faceted field.
    pub fn field(&self, name: &str) -> Option<&HashMap<String, i64>> {
        self.facet_fields.get(name)
    }

    pub fn pivot(&self, key: &str) -> Option<&[PivotField]> {
        self.facet_pivot.get(key).map(Vec::as_slice)
    }
}

/// Per-field term counts.
///
/// The server sends each field as a flat `[term, count, term, count, ...]`
/// array. Pairs that don't fit that shape are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetFields(HashMap<String, HashMap<String, i64>>);

impl FacetFields {
    pub fn get(&self, field: &str) -> Option<&HashMap<String, i64>> {
        self.0.get(field)
    }

    pub fn count(&self, field: &str, term: &str) -> Option<i64> {
        self.get(field).and_then(|counts| counts.get(term)).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn decode_field(field: &str, value: Value) -> Option<HashMap<String, i64>> {
        match value {
            Value::Array(items) => {
                let mut counts = HashMap::with_capacity(items.len() / 2);
                for pair in items.chunks(2) {
                    match pair {
                        [Value::String(term), Value::Number(count)] if count.is_i64() => {
                            counts.insert(term.clone(), count.as_i64().unwrap_or_default());
                        }
                        _ => trace!("skipping malformed facet pair {:?} for {}", pair, field),
                    }
                }
                Some(counts)
            }
            // json.nl=map
            Value::Object(entries) => Some(
                entries
                    .into_iter()
                    .filter_map(|(term, count)| count.as_i64().map(|c| (term, c)))
                    .collect(),
            ),
            other => {
                trace!("skipping facet field {} with value {}", field, other);
                None
            }
        }
    }
}

impl<'de> Deserialize<'de> for FacetFields {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let fields = raw
            .into_iter()
            .filter_map(|(field, value)| {
                FacetFields::decode_field(&field, value).map(|counts| (field, counts))
            })
            .collect();
        Ok(FacetFields(fields))
    }
}

/// One node of a pivot facet tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PivotField {
    pub field: String,
    #[serde(default)]
    pub value: Value,
    pub count: i64,
    #[serde(default)]
    pub pivot: Vec<PivotField>,
}

/// Grouping results keyed by group field, or by the literal group query or
/// function.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Grouped(HashMap<String, GroupResult>);

impl Grouped {
    pub fn get(&self, key: &str) -> Option<&GroupResult> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GroupResult)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shape of a single grouping result.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupResult {
    /// `group.field`: one doc list per distinct value.
    Field(FieldGroups),
    /// `group.query` / `group.func`: a single doc list.
    Direct(DirectGroup),
}

impl GroupResult {
    pub fn matches(&self) -> i64 {
        match self {
            GroupResult::Field(f) => f.matches,
            GroupResult::Direct(d) => d.matches,
        }
    }

    pub fn groups(&self) -> Option<&[Group]> {
        match self {
            GroupResult::Field(f) => Some(f.groups.as_slice()),
            GroupResult::Direct(_) => None,
        }
    }

    pub fn doc_list(&self) -> Option<&ResponseData> {
        match self {
            GroupResult::Field(_) => None,
            GroupResult::Direct(d) => Some(&d.doc_list),
        }
    }
}

impl<'de> Deserialize<'de> for GroupResult {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let is_field_shape = value
            .as_object()
            .map(|o| o.contains_key("groups"))
            .unwrap_or(false);
        if is_field_shape {
            serde_json::from_value(value)
                .map(GroupResult::Field)
                .map_err(de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(GroupResult::Direct)
                .map_err(de::Error::custom)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldGroups {
    #[serde(default)]
    pub matches: i64,
    /// Present when `group.ngroups` was requested.
    #[serde(rename = "ngroups")]
    pub group_count: Option<i64>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Group {
    /// `null` for documents without a value in the group field.
    #[serde(rename = "groupValue", default)]
    pub value: Value,
    #[serde(rename = "doclist")]
    pub doc_list: ResponseData,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectGroup {
    #[serde(default)]
    pub matches: i64,
    #[serde(rename = "doclist")]
    pub doc_list: ResponseData,
}
