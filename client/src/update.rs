use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::responses::Doc;
use crate::{ClientError, Result};

pub const COMMAND_ADD: &str = "add";
pub const COMMAND_DELETE: &str = "delete";
pub const COMMAND_COMMIT: &str = "commit";
pub const COMMAND_ROLLBACK: &str = "rollback";
pub const COMMAND_OPTIMIZE: &str = "optimize";

/// Atomic update operations on a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Set,
    Add,
    AddDistinct,
    Remove,
    RemoveRegex,
    Increment,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Set => "set",
            Action::Add => "add",
            Action::AddDistinct => "add-distinct",
            Action::Remove => "remove",
            Action::RemoveRegex => "removeregex",
            Action::Increment => "inc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOptions {
    /// Block until a new searcher is registered.
    pub wait_searcher: bool,
    /// Merge away segments with many deleted documents.
    pub expunge_deletes: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            wait_searcher: true,
            expunge_deletes: false,
        }
    }
}

impl CommitOptions {
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        if !self.wait_searcher {
            body.insert("waitSearcher".into(), Value::Bool(false));
        }
        if self.expunge_deletes {
            body.insert("expungeDeletes".into(), Value::Bool(true));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub wait_searcher: bool,
    /// Target segment count, ignored unless greater than one.
    pub max_segments: Option<u32>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            wait_searcher: true,
            max_segments: None,
        }
    }
}

impl OptimizeOptions {
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        if !self.wait_searcher {
            body.insert("waitSearcher".into(), Value::Bool(false));
        }
        if let Some(max) = self.max_segments.filter(|m| *m > 1) {
            body.insert("maxSegments".into(), Value::from(max));
        }
        Value::Object(body)
    }
}

/// Fields of an atomic update for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UpdatedFields {
    fields: Doc,
}

impl UpdatedFields {
    /// Start an update of the document with uniqueKey `id`. The server
    /// creates the document if it does not exist yet.
    pub fn new<S: Into<String>>(id: S) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::String(id.into()));
        Self { fields }
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Doc {
        &self.fields
    }

    pub fn action<K: Into<String>, V: Into<Value>>(
        mut self,
        action: Action,
        key: K,
        value: V,
    ) -> Self {
        let value: Value = value.into();
        self.fields
            .insert(key.into(), json!({ action.as_str(): value }));
        self
    }

    pub fn set<K: Into<String>, V: Into<Value>>(self, key: K, value: V) -> Self {
        self.action(Action::Set, key, value)
    }

    /// Append to a multi-valued field.
    pub fn add<K: Into<String>, V: Into<Value>>(self, key: K, value: V) -> Self {
        self.action(Action::Add, key, value)
    }

    pub fn add_distinct<K: Into<String>, V: Into<Value>>(self, key: K, value: V) -> Self {
        self.action(Action::AddDistinct, key, value)
    }

    pub fn remove<K: Into<String>, V: Into<Value>>(self, key: K, value: V) -> Self {
        self.action(Action::Remove, key, value)
    }

    pub fn remove_regex<K: Into<String>, V: Into<Value>>(self, key: K, value: V) -> Self {
        self.action(Action::RemoveRegex, key, value)
    }

    pub fn increment_by<K: Into<String>>(self, key: K, by: i64) -> Self {
        self.action(Action::Increment, key, by)
    }
}

/// Body of a request to `/update` holding any mix of commands.
///
/// Repeated `add` and `delete` commands are written as repeated keys of one
/// JSON object, which is how the server's JSON update format expresses them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBuilder {
    additions: Vec<Doc>,
    deletions: Vec<Doc>,
    commit: Option<CommitOptions>,
    optimize: Option<OptimizeOptions>,
    rollback: bool,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. It must serialize to a JSON object.
    pub fn add<T: Serialize + ?Sized>(&mut self, doc: &T) -> Result<&mut Self> {
        self.additions.push(to_doc(doc)?);
        Ok(self)
    }

    pub fn add_fields(&mut self, fields: &UpdatedFields) -> &mut Self {
        self.additions.push(fields.fields.clone());
        self
    }

    pub fn delete_by_id<S: Into<String>>(&mut self, id: S) -> &mut Self {
        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(id.into()));
        self.deletions.push(doc);
        self
    }

    /// Delete everything matching a query in `q` syntax.
    pub fn delete_by_query<S: Into<String>>(&mut self, query: S) -> &mut Self {
        let mut doc = Map::new();
        doc.insert("query".into(), Value::String(query.into()));
        self.deletions.push(doc);
        self
    }

    pub fn commit(&mut self, opts: Option<CommitOptions>) -> &mut Self {
        self.commit = Some(opts.unwrap_or_default());
        self
    }

    pub fn optimize(&mut self, opts: Option<OptimizeOptions>) -> &mut Self {
        self.optimize = Some(opts.unwrap_or_default());
        self
    }

    /// Discard uncommitted changes.
    pub fn rollback(&mut self) -> &mut Self {
        self.rollback = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
            && self.deletions.is_empty()
            && self.commit.is_none()
            && self.optimize.is_none()
            && !self.rollback
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ClientError::Json)
    }
}

impl Serialize for UpdateBuilder {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for doc in &self.additions {
            map.serialize_entry(COMMAND_ADD, &json!({ "doc": doc }))?;
        }
        for doc in &self.deletions {
            map.serialize_entry(COMMAND_DELETE, doc)?;
        }
        if let Some(commit) = &self.commit {
            map.serialize_entry(COMMAND_COMMIT, &commit.to_body())?;
        }
        if let Some(optimize) = &self.optimize {
            map.serialize_entry(COMMAND_OPTIMIZE, &optimize.to_body())?;
        }
        if self.rollback {
            map.serialize_entry(COMMAND_ROLLBACK, &json!({}))?;
        }
        map.end()
    }
}

/// Convert any serializable value into a document, rejecting non-objects.
pub(crate) fn to_doc<T: Serialize + ?Sized>(value: &T) -> Result<Doc> {
    match serde_json::to_value(value)? {
        Value::Object(doc) => Ok(doc),
        other => Err(ClientError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Convert a serializable sequence into documents, rejecting anything but an
/// array of objects.
pub(crate) fn to_docs<T: Serialize + ?Sized>(value: &T) -> Result<Vec<Doc>> {
    match serde_json::to_value(value)? {
        Value::Array(items) => items.iter().map(to_doc).collect(),
        other => Err(ClientError::InvalidDocument(format!(
            "expected an array of JSON objects, got {}",
            other
        ))),
    }
}
