use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Serialize;

use crate::params::Params;
use crate::query::{Query, WriteOptions, OPTION_FILTER, OPTION_WT, RETURN_TYPE_JSON};
use crate::responses::{decode, Response};
use crate::update::{to_doc, to_docs, CommitOptions, OptimizeOptions, UpdateBuilder, UpdatedFields};
use crate::{ClientError, Result};

static PATH_SELECT: &str = "/select";
static PATH_GET: &str = "/get";
static PATH_PING: &str = "/admin/ping";
static PATH_UPDATE: &str = "/update";
static PATH_UPDATE_DOCS: &str = "/update/json/docs";

static STATUS_OK: &str = "OK";

/// Blocking client bound to one core of a server.
pub struct Client {
    base_path: String,
    http: reqwest::blocking::Client,
    timeout: Option<Duration>,
}

pub enum HttpMethod {
    GET,
    POST,
}

impl HttpMethod {
    fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
        }
    }
}

impl Client {
    /// Create a client for `core` on `host`, e.g. `http://localhost:8983`.
    /// A host that already ends in `/solr` is used as is.
    pub fn new(host: &str, core: &str) -> Result<Self> {
        if host.is_empty() || core.is_empty() {
            return Err(ClientError::InvalidConfig);
        }
        url::Url::parse(host).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", host, e)))?;

        Ok(Self {
            base_path: format_base_path(host, core),
            http: reqwest::blocking::Client::new(),
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a preconfigured reqwest client (proxies, TLS, default headers).
    pub fn with_http_client(mut self, http: reqwest::blocking::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Check the server is reachable and reports status `OK`.
    pub fn ping(&self) -> Result<()> {
        let response = self.request(HttpMethod::GET, PATH_PING, Params::new(), None)?;
        match response.status.as_deref() {
            Some(status) if status != STATUS_OK => Err(ClientError::Api(format!(
                "error pinging server, status: {}",
                status
            ))),
            _ => Ok(()),
        }
    }

    pub fn search(&self, query: &Query) -> Result<Response> {
        self.request(HttpMethod::GET, PATH_SELECT, query.to_params(), None)
    }

    /// Real-time get of the latest version of one document.
    pub fn get(&self, id: &str) -> Result<Response> {
        let mut params = Params::new();
        params.set("id", id);
        self.request(HttpMethod::GET, PATH_GET, params, None)
    }

    /// Real-time get of several documents, optionally narrowed by a raw filter.
    pub fn batch_get<S: AsRef<str>>(&self, ids: &[S], filter: Option<&str>) -> Result<Response> {
        let mut params = Params::new();
        let ids = ids.iter().map(|id| id.as_ref()).collect::<Vec<_>>();
        params.set("ids", ids.join(","));
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            params.set(OPTION_FILTER, filter);
        }
        self.request(HttpMethod::GET, PATH_GET, params, None)
    }

    /// Index a single document. It must serialize to a JSON object.
    pub fn create<T: Serialize + ?Sized>(
        &self,
        doc: &T,
        opts: Option<&WriteOptions>,
    ) -> Result<Response> {
        let body = serde_json::to_string(&to_doc(doc)?)?;
        self.request(HttpMethod::POST, PATH_UPDATE_DOCS, write_params(opts), Some(body))
    }

    /// Index several documents. They must serialize to a JSON array of objects.
    pub fn batch_create<T: Serialize + ?Sized>(
        &self,
        docs: &T,
        opts: Option<&WriteOptions>,
    ) -> Result<Response> {
        let body = serde_json::to_string(&to_docs(docs)?)?;
        self.request(HttpMethod::POST, PATH_UPDATE, write_params(opts), Some(body))
    }

    /// Atomic update of one document.
    pub fn update(&self, fields: &UpdatedFields, opts: Option<&WriteOptions>) -> Result<Response> {
        let mut builder = UpdateBuilder::new();
        builder.add_fields(fields);
        self.send_update(&builder, write_params(opts))
    }

    pub fn delete_by_id(&self, id: &str, opts: Option<&WriteOptions>) -> Result<Response> {
        let mut builder = UpdateBuilder::new();
        builder.delete_by_id(id);
        self.send_update(&builder, write_params(opts))
    }

    pub fn delete_by_query(&self, query: &str, opts: Option<&WriteOptions>) -> Result<Response> {
        let mut builder = UpdateBuilder::new();
        builder.delete_by_query(query);
        self.send_update(&builder, write_params(opts))
    }

    /// Delete every document and commit.
    pub fn clear(&self) -> Result<Response> {
        let opts = WriteOptions {
            commit: true,
            ..Default::default()
        };
        self.delete_by_query("*:*", Some(&opts))
    }

    pub fn commit(&self, opts: Option<CommitOptions>) -> Result<Response> {
        let mut builder = UpdateBuilder::new();
        builder.commit(opts);
        self.send_update(&builder, Params::new())
    }

    pub fn rollback(&self) -> Result<Response> {
        let mut builder = UpdateBuilder::new();
        builder.rollback();
        self.send_update(&builder, Params::new())
    }

    pub fn optimize(&self, opts: Option<OptimizeOptions>) -> Result<Response> {
        let mut builder = UpdateBuilder::new();
        builder.optimize(opts);
        self.send_update(&builder, Params::new())
    }

    /// Send a hand-built set of update commands.
    pub fn custom_update(&self, builder: &UpdateBuilder) -> Result<Response> {
        self.send_update(builder, Params::new())
    }

    fn send_update(&self, builder: &UpdateBuilder, params: Params) -> Result<Response> {
        let body = builder.to_json()?;
        self.request(HttpMethod::POST, PATH_UPDATE, params, Some(body))
    }

    fn format_url(&self, path: &str, mut params: Params) -> String {
        params.set(OPTION_WT, RETURN_TYPE_JSON);
        format!("{}{}?{}", self.base_path, path, params.encode())
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Params,
        body: Option<String>,
    ) -> Result<Response> {
        let url = self.format_url(path, params);
        debug!("{} {}", method.as_str(), url);

        let mut builder = match method {
            HttpMethod::GET => self.http.get(&url),
            HttpMethod::POST => self
                .http
                .post(&url)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.unwrap_or_default()),
        };
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(ClientError::Reqwest)?;
        self.handle_response(response)
    }

    fn handle_response(&self, response: reqwest::blocking::Response) -> Result<Response> {
        let status_code = response.status().as_u16();
        let raw_body = response.bytes().map_err(ClientError::Reqwest)?;
        let decoded = decode(&raw_body);
        if (200..300).contains(&status_code) {
            return decoded;
        }

        match decoded {
            Err(err @ ClientError::Server { .. }) => Err(err),
            // Proxies and servlet containers answer errors with HTML or
            // their own JSON.
            _ => Err(ClientError::Http(format!(
                "HTTP {}: {}",
                status_code,
                String::from_utf8_lossy(&raw_body)
            ))),
        }
    }
}

fn write_params(opts: Option<&WriteOptions>) -> Params {
    opts.map(WriteOptions::to_params).unwrap_or_default()
}

fn format_base_path(host: &str, core: &str) -> String {
    let host = host.trim_end_matches('/');
    let core = urlencoding::encode(core);
    if host.ends_with("/solr") {
        format!("{}/{}", host, core)
    } else {
        format!("{}/solr/{}", host, core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_config() {
        assert!(matches!(
            Client::new("", "core"),
            Err(ClientError::InvalidConfig)
        ));
        assert!(matches!(
            Client::new("http://localhost:8983", ""),
            Err(ClientError::InvalidConfig)
        ));
        assert!(matches!(
            Client::new("not a url", "core"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_base_path() {
        let client = Client::new("http://localhost:8983", "films").unwrap();
        assert_eq!(client.base_path(), "http://localhost:8983/solr/films");

        let client = Client::new("http://localhost:8983/solr/", "films").unwrap();
        assert_eq!(client.base_path(), "http://localhost:8983/solr/films");

        let client = Client::new("http://localhost:8983", "my core").unwrap();
        assert_eq!(client.base_path(), "http://localhost:8983/solr/my%20core");
    }

    #[test]
    fn test_format_url() {
        let client = Client::new("http://localhost:8983", "films")
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        let mut query = Query::new();
        query.set_query("*:*");
        query.set_rows(10);
        assert_eq!(
            client.format_url(PATH_SELECT, query.to_params()),
            "http://localhost:8983/solr/films/select?q=*:*&rows=10&wt=json"
        );
    }

    #[test]
    fn test_write_params() {
        let opts = WriteOptions {
            commit: true,
            ..Default::default()
        };
        assert_eq!(write_params(Some(&opts)).get("commit"), Some("true"));
        assert!(write_params(None).is_empty());
    }

    fn reply(status: u16, body: &'static str) -> reqwest::blocking::Response {
        http::Response::builder()
            .status(status)
            .body(body)
            .unwrap()
            .into()
    }

    #[test]
    fn test_handle_response_non_2xx_json_without_error() {
        let client = Client::new("http://localhost:8983", "films").unwrap();
        let err = client
            .handle_response(reply(502, r#"{"message":"bad gateway"}"#))
            .unwrap_err();
        match err {
            ClientError::Http(message) => {
                assert_eq!(message, r#"HTTP 502: {"message":"bad gateway"}"#)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_handle_response_non_2xx_html() {
        let client = Client::new("http://localhost:8983", "films").unwrap();
        let err = client
            .handle_response(reply(404, "<html>Not Found</html>"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP request failed: HTTP 404: <html>Not Found</html>"
        );
    }

    #[test]
    fn test_handle_response_server_error() {
        let client = Client::new("http://localhost:8983", "films").unwrap();
        let body = r#"{"responseHeader": {"status": 400, "QTime": 1},
            "error": {"msg": "undefined field nosuchfield", "code": 400}}"#;
        match client.handle_response(reply(400, body)) {
            Err(ClientError::Server { error, .. }) => {
                assert_eq!(error.code, 400);
                assert_eq!(error.message, "undefined field nosuchfield");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_handle_response_ok() {
        let client = Client::new("http://localhost:8983", "films").unwrap();
        let response = client
            .handle_response(reply(200, r#"{"responseHeader": {"status": 0, "QTime": 2}}"#))
            .unwrap();
        assert_eq!(response.header.map(|h| h.status), Some(0));
    }
}
