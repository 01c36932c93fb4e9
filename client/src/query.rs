use std::fmt::Display;
use std::str::FromStr;

use crate::params::Params;

pub const OPTION_DEBUG: &str = "debug";
pub const OPTION_DEF_TYPE: &str = "defType";
pub const OPTION_Q: &str = "q";
pub const OPTION_FILTER: &str = "fq";
pub const OPTION_FIELD_LIST: &str = "fl";
pub const OPTION_ROWS: &str = "rows";
pub const OPTION_START: &str = "start";
pub const OPTION_SORT: &str = "sort";
pub const OPTION_WT: &str = "wt";
pub const OPTION_COMMIT: &str = "commit";
pub const OPTION_OVERWRITE: &str = "overwrite";
pub const OPTION_COMMIT_WITHIN: &str = "commitWithin";
pub const OPTION_MM: &str = "mm";
pub const OPTION_BOOST: &str = "boost";
pub const OPTION_QUERY_FIELDS: &str = "qf";
pub const OPTION_BOOST_QUERY: &str = "bq";
pub const OPTION_BOOST_FUNCTIONS: &str = "bf";
pub const OPTION_USER_FIELDS: &str = "uf";
pub const OPTION_EXPAND: &str = "expand";
pub const OPTION_EXPAND_SORT: &str = "expand.sort";
pub const OPTION_EXPAND_Q: &str = "expand.q";
pub const OPTION_EXPAND_FQ: &str = "expand.fq";
pub const OPTION_EXPAND_ROWS: &str = "expand.rows";
pub const OPTION_FACET: &str = "facet";
pub const OPTION_FACET_FIELD: &str = "facet.field";
pub const OPTION_FACET_PIVOT: &str = "facet.pivot";
pub const OPTION_FACET_PIVOT_MIN_COUNT: &str = "facet.pivot.mincount";
pub const OPTION_GROUP: &str = "group";
pub const OPTION_GROUP_FIELD: &str = "group.field";
pub const OPTION_GROUP_NGROUPS: &str = "group.ngroups";
pub const OPTION_GROUP_LIMIT: &str = "group.limit";
pub const OPTION_GROUP_OFFSET: &str = "group.offset";
pub const OPTION_GROUP_QUERY: &str = "group.query";
pub const OPTION_GROUP_FUNC: &str = "group.func";
pub const OPTION_GROUP_SORT: &str = "group.sort";

/// The only response writer this crate can decode.
pub const RETURN_TYPE_JSON: &str = "json";

/// Validation failures raised while building a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("params required: a field (or group query/function) must be provided")]
    ParamsRequired,
    #[error("too many params: only one of max, min or sort may be populated")]
    TooManyParams,
    #[error("invalid null policy {0:?}, expected one of ignore, expand, collapse")]
    InvalidNullPolicy(String),
    #[error("invalid hint {0:?}, expected top_fc")]
    InvalidHint(String),
    #[error("invalid defType {0:?}, expected one of dismax, edismax, lucene")]
    InvalidDefType(String),
    #[error("invalid debug type {0:?}, expected one of query, timing, results, all")]
    InvalidDebugType(String),
}

// Closed sets of server literals. `FromStr` is the validity check.
macro_rules! literal_enum {
    ($(#[$meta:meta])* $name:ident, $err:ident, { $($variant:ident => $lit:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $lit),+
                }
            }

            pub fn is_valid(value: &str) -> bool {
                value.parse::<$name>().is_ok()
            }
        }

        impl FromStr for $name {
            type Err = QueryError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok($name::$variant),)+
                    other => Err(QueryError::$err(other.to_string())),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

literal_enum!(
    /// Debug output requested from `/select`.
    DebugType, InvalidDebugType, {
        Query => "query",
        Timing => "timing",
        Results => "results",
        All => "all",
    }
);

literal_enum!(
    /// Query parser selection.
    DefType, InvalidDefType, {
        DisMax => "dismax",
        EDisMax => "edismax",
        Standard => "lucene",
    }
);

literal_enum!(
    /// What the collapsing parser does with documents lacking the field.
    NullPolicy, InvalidNullPolicy, {
        Ignore => "ignore",
        Expand => "expand",
        Collapse => "collapse",
    }
);

literal_enum!(
    Hint, InvalidHint, {
        TopFc => "top_fc",
    }
);

/// Operator joining the terms added through [`Query::add_term`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Operator {
    #[default]
    Or,
    And,
}

impl Operator {
    fn join_token(&self) -> &'static str {
        match self {
            Operator::Or => " OR ",
            Operator::And => " AND ",
        }
    }
}

/// Settings applied when a [`Query`] is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub debug: Option<DebugType>,
    pub def_type: Option<DefType>,
    /// Ignored unless greater than zero.
    pub rows: Option<u32>,
}

/// Options for writes; they end up in the request query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Commit alongside the request.
    pub commit: bool,
    /// Commit within this many milliseconds.
    pub commit_within: Option<u64>,
    /// Skip the uniqueKey overwrite check.
    pub allow_duplicate: bool,
}

impl WriteOptions {
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if self.commit {
            params.set(OPTION_COMMIT, "true");
        }
        if let Some(within) = self.commit_within.filter(|w| *w > 0) {
            params.set(OPTION_COMMIT_WITHIN, within.to_string());
        }
        if self.allow_duplicate {
            params.set(OPTION_OVERWRITE, "false");
        }
        params
    }
}

/// Collapsing query parser post filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseParams {
    pub field: String,
    pub min: Option<String>,
    pub max: Option<String>,
    pub sort: Option<String>,
    pub null_policy: Option<NullPolicy>,
    pub hint: Option<Hint>,
    pub size: Option<String>,
}

impl CollapseParams {
    pub fn new<S: Into<String>>(field: S) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn with_min<S: Into<String>>(mut self, min: S) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn with_max<S: Into<String>>(mut self, max: S) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn with_sort<S: Into<String>>(mut self, sort: S) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = Some(policy);
        self
    }

    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_size<S: Into<String>>(mut self, size: S) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Render as `{!collapse field=... ...}`, validating the combination.
    pub fn to_filter_string(&self) -> Result<String, QueryError> {
        if self.field.is_empty() {
            return Err(QueryError::ParamsRequired);
        }

        let mut parts = vec![format!("field={}", self.field)];

        let selectors = [("max", &self.max), ("min", &self.min), ("sort", &self.sort)];
        let populated: Vec<_> = selectors
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (key, v))
            })
            .collect();
        if populated.len() > 1 {
            return Err(QueryError::TooManyParams);
        }
        for (key, value) in populated {
            // Sort specs contain spaces and must be quoted inside local params.
            if *key == "sort" {
                parts.push(format!("sort='{}'", value));
            } else {
                parts.push(format!("{}={}", key, value));
            }
        }

        if let Some(policy) = self.null_policy {
            parts.push(format!("nullPolicy={}", policy));
        }
        if let Some(hint) = self.hint {
            parts.push(format!("hint={}", hint));
        }
        if let Some(size) = self.size.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("size={}", size));
        }

        Ok(format!("{{!collapse {}}}", parts.join(" ")))
    }
}

/// Expand component options. Every field overrides the main query's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    pub sort: Option<String>,
    pub rows: Option<u32>,
    pub q: Option<String>,
    pub fq: Option<String>,
}

/// Field facet with its per-field options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facet {
    pub field: String,
    pub prefix: Option<String>,
    pub contains: Option<String>,
    /// Negative means unlimited.
    pub limit: Option<i32>,
    pub min_count: Option<u32>,
    pub missing: bool,
    pub exclude_terms: Vec<String>,
}

impl Facet {
    pub fn new<S: Into<String>>(field: S) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_contains<S: Into<String>>(mut self, contains: S) -> Self {
        self.contains = Some(contains.into());
        self
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_min_count(mut self, min_count: u32) -> Self {
        self.min_count = Some(min_count);
        self
    }

    pub fn with_missing(mut self, missing: bool) -> Self {
        self.missing = missing;
        self
    }

    pub fn exclude<S: Into<String>>(mut self, term: S) -> Self {
        self.exclude_terms.push(term.into());
        self
    }

    fn option_key(&self, option: &str) -> String {
        format!("f.{}.facet.{}", self.field, option)
    }
}

/// Result grouping. At least one of `field`, `queries` or `functions` is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupParams {
    pub field: Option<String>,
    pub queries: Vec<String>,
    pub functions: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort: Option<String>,
    pub show_group_count: bool,
}

impl GroupParams {
    pub fn by_field<S: Into<String>>(field: S) -> Self {
        Self {
            field: Some(field.into()),
            ..Default::default()
        }
    }

    pub fn by_queries<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn by_functions<I, S>(functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            functions: functions.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_sort<S: Into<String>>(mut self, sort: S) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_group_count(mut self) -> Self {
        self.show_group_count = true;
        self
    }

    fn field(&self) -> Option<&str> {
        self.field.as_deref().filter(|f| !f.is_empty())
    }
}

/// Parameters of one search request against `/select`.
///
/// The main query comes either from a literal string ([`Query::set_query`]) or
/// from terms accumulated with [`Query::add_term`]; setting one discards the
/// other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<String>,
    operator: Operator,
    params: Params,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query seeded from read options.
    pub fn with_options(opts: &ReadOptions) -> Self {
        let mut query = Self::new();
        if let Some(debug) = opts.debug {
            query.params.set(OPTION_DEBUG, debug.as_str());
        }
        if let Some(def_type) = opts.def_type {
            query.params.set(OPTION_DEF_TYPE, def_type.as_str());
        }
        if let Some(rows) = opts.rows.filter(|r| *r > 0) {
            query.params.set(OPTION_ROWS, rows.to_string());
        }
        query
    }

    pub fn add_param<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.params.add(key, value);
    }

    pub fn set_param<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.params.set(key, value);
    }

    pub fn del_param(&mut self, key: &str) {
        self.params.del(key);
    }

    /// First value of an explicitly stored parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn param_values(&self, key: &str) -> &[String] {
        self.params.get_all(key)
    }

    /// Append a `field:value` term; an empty field adds a bare text term.
    pub fn add_term<F: AsRef<str>, V: AsRef<str>>(&mut self, field: F, value: V) {
        let (field, value) = (field.as_ref(), value.as_ref());
        self.params.del(OPTION_Q);
        if field.is_empty() {
            self.terms.push(value.to_string());
        } else {
            self.terms.push(format!("{}:{}", field, value));
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Set the literal main query.
    pub fn set_query<S: Into<String>>(&mut self, value: S) {
        self.terms.clear();
        self.params.set(OPTION_Q, value);
    }

    /// Remove the main query, literal or accumulated.
    pub fn clear_query(&mut self) {
        self.params.del(OPTION_Q);
        self.terms.clear();
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn add_filter<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) {
        self.params
            .add(OPTION_FILTER, format!("{}:{}", key.as_ref(), value.as_ref()));
    }

    /// Replace all filters with one raw filter expression.
    pub fn set_filter<S: Into<String>>(&mut self, value: S) {
        self.params.set(OPTION_FILTER, value);
    }

    pub fn add_return_field<S: Into<String>>(&mut self, field: S) {
        self.params.add(OPTION_FIELD_LIST, field);
    }

    /// Sort spec in the `<field> <direction>, ...` form.
    pub fn set_sort_expression<S: Into<String>>(&mut self, expr: S) {
        self.params.set(OPTION_SORT, expr);
    }

    pub fn set_start(&mut self, start: u32) {
        self.params.set(OPTION_START, start.to_string());
    }

    pub fn set_rows(&mut self, rows: u32) {
        self.params.set(OPTION_ROWS, rows.to_string());
    }

    pub fn set_result_window(&mut self, start: u32, rows: u32) {
        self.set_start(start);
        self.set_rows(rows);
    }

    /// Add a collapsing post filter. Nothing is written if validation fails.
    pub fn collapse(&mut self, params: &CollapseParams) -> Result<(), QueryError> {
        let filter = params.to_filter_string()?;
        self.params.add(OPTION_FILTER, filter);
        Ok(())
    }

    /// Enable the expand component for collapsed groups.
    pub fn expand(&mut self, opts: Option<&ExpandOptions>) {
        self.params.set(OPTION_EXPAND, "true");
        let Some(opts) = opts else {
            return;
        };
        if let Some(sort) = opts.sort.as_deref().filter(|s| !s.is_empty()) {
            self.params.set(OPTION_EXPAND_SORT, sort);
        }
        if let Some(q) = opts.q.as_deref().filter(|s| !s.is_empty()) {
            self.params.set(OPTION_EXPAND_Q, q);
        }
        if let Some(fq) = opts.fq.as_deref().filter(|s| !s.is_empty()) {
            self.params.set(OPTION_EXPAND_FQ, fq);
        }
        if let Some(rows) = opts.rows {
            self.params.set(OPTION_EXPAND_ROWS, rows.to_string());
        }
    }

    /// Fields searched by the (e)dismax parsers.
    pub fn set_query_fields<S: AsRef<str>>(&mut self, fields: &[S]) {
        self.params.set(OPTION_QUERY_FIELDS, join_fields(fields));
    }

    pub fn set_minimum_should_match<S: Into<String>>(&mut self, value: S) {
        self.params.set(OPTION_MM, value);
    }

    pub fn set_boost_functions<S: Into<String>>(&mut self, value: S) {
        self.params.set(OPTION_BOOST_FUNCTIONS, value);
    }

    pub fn set_boost_query<S: Into<String>>(&mut self, value: S) {
        self.params.set(OPTION_BOOST_QUERY, value);
    }

    /// Multiplicative boost (edismax only).
    pub fn set_boost<S: Into<String>>(&mut self, value: S) {
        self.params.set(OPTION_BOOST, value);
    }

    /// Fields a user may query directly (edismax only).
    pub fn set_user_fields<S: AsRef<str>>(&mut self, fields: &[S]) {
        self.params.set(OPTION_USER_FIELDS, join_fields(fields));
    }

    pub fn add_facet(&mut self, facet: &Facet) {
        self.params.set(OPTION_FACET, "true");
        self.params.add(OPTION_FACET_FIELD, facet.field.as_str());

        if let Some(min_count) = facet.min_count {
            self.params
                .set(facet.option_key("mincount"), min_count.to_string());
        }
        if let Some(limit) = facet.limit {
            self.params.set(facet.option_key("limit"), limit.to_string());
        }
        if let Some(prefix) = facet.prefix.as_deref().filter(|p| !p.is_empty()) {
            self.params.set(facet.option_key("prefix"), prefix);
        }
        if let Some(contains) = facet.contains.as_deref().filter(|c| !c.is_empty()) {
            self.params.set(facet.option_key("contains"), contains);
        }
        if facet.missing {
            self.params.set(facet.option_key("missing"), "true");
        }
        if !facet.exclude_terms.is_empty() {
            self.params
                .set(facet.option_key("excludeTerms"), facet.exclude_terms.join(","));
        }
    }

    /// Add a pivot over `fields`. A `min_count` below 2 leaves the server default.
    pub fn add_facet_pivot<S: AsRef<str>>(&mut self, fields: &[S], min_count: u32) {
        self.params.set(OPTION_FACET, "true");
        let path = fields
            .iter()
            .map(|f| f.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        self.params.add(OPTION_FACET_PIVOT, path);
        if min_count > 1 {
            self.params
                .set(OPTION_FACET_PIVOT_MIN_COUNT, min_count.to_string());
        }
    }

    /// Enable result grouping. Nothing is written if validation fails.
    pub fn group(&mut self, params: &GroupParams) -> Result<(), QueryError> {
        let field = params.field();
        if field.is_none() && params.queries.is_empty() && params.functions.is_empty() {
            return Err(QueryError::ParamsRequired);
        }

        self.params.set(OPTION_GROUP, "true");
        if let Some(field) = field {
            self.params.set(OPTION_GROUP_FIELD, field);
        }
        if params.show_group_count {
            self.params.set(OPTION_GROUP_NGROUPS, "true");
        }
        if let Some(limit) = params.limit {
            self.params.set(OPTION_GROUP_LIMIT, limit.to_string());
        }
        if let Some(offset) = params.offset {
            self.params.set(OPTION_GROUP_OFFSET, offset.to_string());
        }
        if let Some(sort) = params.sort.as_deref().filter(|s| !s.is_empty()) {
            self.params.set(OPTION_GROUP_SORT, sort);
        }
        for query in &params.queries {
            self.params.add(OPTION_GROUP_QUERY, query.as_str());
        }
        for function in &params.functions {
            self.params.add(OPTION_GROUP_FUNC, function.as_str());
        }
        Ok(())
    }

    /// All parameters as they will be sent: accumulated terms joined into
    /// `q` and the response writer forced to JSON.
    pub fn to_params(&self) -> Params {
        let mut params = self.params.clone();
        if !self.terms.is_empty() {
            params.set(OPTION_Q, self.terms.join(self.operator.join_token()));
        }
        params.set(OPTION_WT, RETURN_TYPE_JSON);
        params
    }

    /// URL-encoded query string, ready to follow `?`.
    pub fn to_query_string(&self) -> String {
        self.to_params().encode()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_query_string())
    }
}

fn join_fields<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| f.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_options() {
        let query = Query::with_options(&ReadOptions {
            debug: Some(DebugType::Query),
            def_type: Some(DefType::DisMax),
            rows: Some(10),
        });
        assert_eq!(query.param("debug"), Some("query"));
        assert_eq!(query.param("defType"), Some("dismax"));
        assert_eq!(query.param("rows"), Some("10"));

        let query = Query::with_options(&ReadOptions {
            rows: Some(0),
            ..Default::default()
        });
        assert_eq!(query.param("rows"), None);
    }

    #[test]
    fn test_literal_validation() {
        assert_eq!("edismax".parse::<DefType>(), Ok(DefType::EDisMax));
        assert_eq!(
            "test".parse::<DefType>(),
            Err(QueryError::InvalidDefType("test".to_string()))
        );
        assert_eq!(
            "debug".parse::<DebugType>(),
            Err(QueryError::InvalidDebugType("debug".to_string()))
        );
        assert!(NullPolicy::is_valid("collapse"));
        assert!(!NullPolicy::is_valid("nuls"));
        assert!(Hint::is_valid("top_fc"));
        assert!(!Hint::is_valid("hint"));
    }

    #[test]
    fn test_add_term() {
        let mut query = Query::new();
        query.add_term("field", "value");
        query.add_term("", "value string");
        assert_eq!(query.terms().len(), 2);
        assert_eq!(
            query.to_query_string(),
            "q=field:value+OR+value+string&wt=json"
        );
    }

    #[test]
    fn test_add_term_with_and() {
        let mut query = Query::new();
        query.add_term("genre", "horror");
        query.add_term("genre", "adventure");
        query.set_operator(Operator::And);
        assert_eq!(
            query.to_params().get("q"),
            Some("genre:horror AND genre:adventure")
        );
    }

    #[test]
    fn test_set_query_and_terms_exclusive() {
        let mut query = Query::new();
        query.add_term("genre", "horror");
        query.set_query("*:*");
        assert!(query.terms().is_empty());
        assert_eq!(query.to_params().get("q"), Some("*:*"));

        query.add_term("genre", "comedy");
        assert_eq!(query.param("q"), None);
        assert_eq!(query.to_params().get("q"), Some("genre:comedy"));
    }

    #[test]
    fn test_clear_query() {
        let mut query = Query::new();
        query.set_query("key:value");
        query.clear_query();
        assert_eq!(query.param("q"), None);

        query.add_term("key", "value");
        query.clear_query();
        assert!(query.terms().is_empty());
        assert_eq!(query.to_query_string(), "wt=json");
    }

    #[test]
    fn test_to_query_string_idempotent() {
        let mut query = Query::new();
        query.add_term("genre", "horror");
        query.add_filter("year", "1999");
        let before = query.clone();
        let first = query.to_query_string();
        let second = query.to_query_string();
        assert_eq!(first, second);
        assert_eq!(query, before);
    }

    #[test]
    fn test_search_scenario() {
        let mut query = Query::new();
        query.set_query("*:*");
        query.add_filter("genre", "horror");
        query.set_sort_expression("year desc");

        let encoded = query.to_query_string();
        assert!(encoded.contains("q=*:*"));
        assert!(encoded.contains("fq=genre:horror"));
        assert!(encoded.contains("sort=year+desc"));
        assert!(encoded.contains("wt=json"));
        assert!(!encoded.contains("rows="));
        assert_eq!(format!("{}", query), encoded);
    }

    #[test]
    fn test_wt_is_forced() {
        let mut query = Query::new();
        query.set_param("wt", "xml");
        assert_eq!(query.to_params().get_all("wt"), &["json".to_string()]);
    }

    #[test]
    fn test_filters() {
        let mut query = Query::new();
        query.add_filter("a", "1");
        query.add_filter("b", "2");
        assert_eq!(query.param_values("fq"), &["a:1".to_string(), "b:2".to_string()]);

        query.set_filter("a:1 OR b:2");
        assert_eq!(query.param_values("fq"), &["a:1 OR b:2".to_string()]);
    }

    #[test]
    fn test_simple_setters() {
        let mut query = Query::new();
        query.add_return_field("id");
        query.add_return_field("title");
        query.set_result_window(20, 10);
        assert_eq!(query.param_values("fl").len(), 2);
        assert_eq!(query.param("start"), Some("20"));
        assert_eq!(query.param("rows"), Some("10"));

        query.add_param("custom", "1");
        query.del_param("custom");
        assert_eq!(query.param("custom"), None);
    }

    #[test]
    fn test_collapse_requires_field() {
        let mut query = Query::new();
        let result = query.collapse(&CollapseParams::new(""));
        assert_eq!(result, Err(QueryError::ParamsRequired));
        assert!(query.param_values("fq").is_empty());
    }

    #[test]
    fn test_collapse_too_many_params() {
        let combos = [
            CollapseParams::new("field").with_min("a").with_max("b"),
            CollapseParams::new("field").with_min("a").with_sort("b asc"),
            CollapseParams::new("field").with_max("a").with_sort("b asc"),
        ];
        for params in combos {
            let mut query = Query::new();
            query.add_filter("genre", "horror");
            assert_eq!(query.collapse(&params), Err(QueryError::TooManyParams));
            assert_eq!(query.param_values("fq"), &["genre:horror".to_string()]);
        }
    }

    #[test]
    fn test_collapse_valid() {
        let mut query = Query::new();
        let params = CollapseParams::new("group_s")
            .with_sort("price asc")
            .with_null_policy(NullPolicy::Ignore)
            .with_hint(Hint::TopFc)
            .with_size("5000");
        query.collapse(&params).unwrap();
        assert_eq!(
            query.param("fq"),
            Some("{!collapse field=group_s sort='price asc' nullPolicy=ignore hint=top_fc size=5000}")
        );
    }

    #[test]
    fn test_collapse_min() {
        let params = CollapseParams::new("group_s").with_min("price");
        assert_eq!(
            params.to_filter_string().unwrap(),
            "{!collapse field=group_s min=price}"
        );
    }

    #[test]
    fn test_expand() {
        let mut query = Query::new();
        query.expand(Some(&ExpandOptions {
            sort: Some("field asc".to_string()),
            rows: Some(5),
            ..Default::default()
        }));
        assert_eq!(query.param("expand"), Some("true"));
        assert_eq!(query.param("expand.sort"), Some("field asc"));
        assert_eq!(query.param("expand.rows"), Some("5"));
        assert_eq!(query.param("expand.q"), None);

        let mut query = Query::new();
        query.expand(None);
        assert_eq!(query.param("expand"), Some("true"));
    }

    #[test]
    fn test_explicit_zero_values_are_emitted() {
        let mut query = Query::new();
        query.add_facet(&Facet::new("genre").with_limit(0).with_min_count(0));
        query.expand(Some(&ExpandOptions {
            rows: Some(0),
            ..Default::default()
        }));
        query
            .group(&GroupParams::by_field("genre").with_offset(0).with_limit(0))
            .unwrap();
        assert_eq!(query.param("f.genre.facet.limit"), Some("0"));
        assert_eq!(query.param("f.genre.facet.mincount"), Some("0"));
        assert_eq!(query.param("expand.rows"), Some("0"));
        assert_eq!(query.param("group.offset"), Some("0"));
        assert_eq!(query.param("group.limit"), Some("0"));
    }

    #[test]
    fn test_dismax_params() {
        let mut query = Query::with_options(&ReadOptions {
            def_type: Some(DefType::EDisMax),
            ..Default::default()
        });
        query.set_query_fields(&["title^2", "body"]);
        query.set_minimum_should_match("75%");
        query.set_boost_functions("recip(rord(date),1,1000,1000)");
        query.set_boost_query("genre:horror^3");
        query.set_boost("mul(a,b)");
        query.set_user_fields(&["title", "body"]);
        assert_eq!(query.param("qf"), Some("title^2 body"));
        assert_eq!(query.param("mm"), Some("75%"));
        assert_eq!(query.param("bf"), Some("recip(rord(date),1,1000,1000)"));
        assert_eq!(query.param("bq"), Some("genre:horror^3"));
        assert_eq!(query.param("boost"), Some("mul(a,b)"));
        assert_eq!(query.param("uf"), Some("title body"));
    }

    #[test]
    fn test_add_facet() {
        let mut query = Query::new();
        let facet = Facet::new("genre")
            .with_prefix("h")
            .with_contains("or")
            .with_limit(10)
            .with_min_count(5)
            .exclude("term1")
            .exclude("term2");
        query.add_facet(&facet);

        let params = query.to_params();
        assert_eq!(params.get("facet"), Some("true"));
        assert_eq!(params.get_all("facet.field"), &["genre".to_string()]);
        assert_eq!(params.get("f.genre.facet.limit"), Some("10"));
        assert_eq!(params.get("f.genre.facet.mincount"), Some("5"));
        assert_eq!(params.get("f.genre.facet.prefix"), Some("h"));
        assert_eq!(params.get("f.genre.facet.contains"), Some("or"));
        assert_eq!(params.get("f.genre.facet.excludeTerms"), Some("term1,term2"));
        assert_eq!(params.get("f.genre.facet.missing"), None);
    }

    #[test]
    fn test_add_facet_twice() {
        let mut query = Query::new();
        query.add_facet(&Facet::new("genre"));
        query.add_facet(&Facet::new("year").with_missing(true));
        assert_eq!(
            query.param_values("facet.field"),
            &["genre".to_string(), "year".to_string()]
        );
        assert_eq!(query.param_values("facet"), &["true".to_string()]);
        assert_eq!(query.param("f.year.facet.missing"), Some("true"));
        assert_eq!(query.param("f.genre.facet.limit"), None);
    }

    #[test]
    fn test_add_facet_pivot() {
        let mut query = Query::new();
        query.add_facet_pivot(&["cat", "genre"], 20);
        assert_eq!(query.param("facet"), Some("true"));
        assert_eq!(query.param("facet.pivot"), Some("cat,genre"));
        assert_eq!(query.param("facet.pivot.mincount"), Some("20"));

        let mut query = Query::new();
        query.add_facet_pivot(&["cat"], 1);
        assert_eq!(query.param("facet.pivot.mincount"), None);
    }

    #[test]
    fn test_group_requires_params() {
        let mut query = Query::new();
        assert_eq!(
            query.group(&GroupParams::default()),
            Err(QueryError::ParamsRequired)
        );
        assert_eq!(
            query.group(&GroupParams::by_field("")),
            Err(QueryError::ParamsRequired)
        );
        assert_eq!(query.param("group"), None);
    }

    #[test]
    fn test_group_by_field() {
        let mut query = Query::new();
        let params = GroupParams::by_field("genre")
            .with_limit(10)
            .with_offset(5)
            .with_sort("year asc")
            .with_group_count();
        query.group(&params).unwrap();
        assert_eq!(query.param("group"), Some("true"));
        assert_eq!(query.param("group.field"), Some("genre"));
        assert_eq!(query.param("group.limit"), Some("10"));
        assert_eq!(query.param("group.offset"), Some("5"));
        assert_eq!(query.param("group.sort"), Some("year asc"));
        assert_eq!(query.param("group.ngroups"), Some("true"));
    }

    #[test]
    fn test_group_by_queries_and_functions() {
        let mut query = Query::new();
        let mut params = GroupParams::by_queries(["genre:horror", "genre:comedy"]);
        params.functions = vec!["floor(year)".to_string()];
        query.group(&params).unwrap();
        assert_eq!(
            query.param_values("group.query"),
            &["genre:horror".to_string(), "genre:comedy".to_string()]
        );
        assert_eq!(query.param("group.func"), Some("floor(year)"));
        assert_eq!(query.param("group.field"), None);
    }

    #[test]
    fn test_write_options() {
        let params = WriteOptions {
            commit: true,
            commit_within: Some(1000),
            allow_duplicate: true,
        }
        .to_params();
        assert_eq!(params.encode(), "commit=true&commitWithin=1000&overwrite=false");
        assert!(WriteOptions::default().to_params().is_empty());
    }
}
