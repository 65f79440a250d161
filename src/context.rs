use routefinder::Captures;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::binding::{self, Field, Fields};
use crate::http::content::Accept;
use crate::http::headers::{HeaderName, HeaderValues, ToHeaderValues, CONTENT_TYPE};
use crate::http::{format_err, mime, Body, Method, Mime, StatusCode, Url};

/// ## The context of a request.
///
/// This is a wrapper around a [crate::http::Request] and a [crate::http::Response]
/// that provides access to the request and response as well as the route
/// parameters captured while routing.
#[derive(Debug)]
pub struct Context {
    /// The request that was made.
    pub req: crate::http::Request,
    /// The response that will be sent.
    pub res: crate::http::Response,
    /// The parsed request parameters
    pub params: Vec<Captures<'static, 'static>>,
    /// Names of the `:name` segments of the matched pattern.
    pub(crate) param_names: Vec<String>,
}

impl Context {
    /// Create a new [Context] with a [crate::http::Request].
    pub(crate) fn new(
        req: crate::http::Request,
        params: Vec<Captures<'static, 'static>>,
        param_names: Vec<String>,
    ) -> Self {
        Self {
            req,
            res: crate::http::Response::new(StatusCode::Ok),
            params,
            param_names,
        }
    }

    /// Access the request's HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.req.method()
    }

    /// Access the request's full URI method.
    #[must_use]
    pub fn url(&self) -> &Url {
        self.req.url()
    }

    /// Get the request content type as a `Mime`.
    ///
    /// This gets the request `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<Mime> {
        self.req.content_type()
    }

    /// Get an HTTP header.
    #[must_use]
    pub fn header(&self, key: impl Into<HeaderName>) -> Option<&HeaderValues> {
        self.req.header(key)
    }

    /// Set an HTTP header on the request.
    pub fn insert_header(
        &mut self,
        name: impl Into<HeaderName>,
        values: impl ToHeaderValues,
    ) -> Option<HeaderValues> {
        self.req.insert_header(name, values)
    }

    /// Get a request extension value.
    #[must_use]
    pub fn ext<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.req.ext().get()
    }

    /// Set a request extension value.
    pub fn set_ext<T: Send + Sync + 'static>(&mut self, val: T) -> Option<T> {
        self.req.ext_mut().insert(val)
    }

    /// Extract and parse a route parameter by name.
    ///
    /// Returns the parameter as a `&str`, borrowed from this `Context`.
    ///
    /// The name should *not* include the leading `:`.
    ///
    /// # Errors
    ///
    /// An error is returned if `key` is not a valid parameter for the route.
    pub fn param(&self, key: &str) -> crate::Result<&str> {
        self.params
            .iter()
            .rev()
            .find_map(|captures| captures.get(key))
            .ok_or_else(|| format_err!("Param \"{}\" not found", key.to_string()))
    }

    /// Fetch the wildcard from the route, if it exists
    pub fn wildcard(&self) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find_map(|captures| captures.wildcard())
    }

    /// Parse the URL query component into a struct. To get the entire query
    /// as an unparsed string, use `ctx.url().query()`.
    pub fn query<'de, T: serde::de::Deserialize<'de>>(&'de self) -> crate::Result<T> {
        self.req.query()
    }

    /// Set the response body.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.res.set_body(body)
    }

    /// Reads the entire request body into a string.
    ///
    /// # Errors
    ///
    /// Any I/O error encountered while reading the body is immediately returned
    /// as an `Err`.
    ///
    /// If the body cannot be interpreted as valid UTF-8, an `Err` is returned.
    pub async fn body_string(&mut self) -> crate::Result<String> {
        let res = self.req.body_string().await?;
        Ok(res)
    }

    /// Reads and deserialized the entire request body via json.
    ///
    /// # Errors
    ///
    /// If the body cannot be interpreted as valid json for the target type `T`,
    /// an `Err` is returned.
    pub async fn body_json<T: DeserializeOwned>(&mut self) -> crate::Result<T> {
        let res = self.req.body_json().await?;
        Ok(res)
    }

    /// Bind all request data to `T`.
    ///
    /// The query string, the body (JSON object or url-encoded form, chosen by
    /// `Content-Type`) and the route parameters are merged into a single
    /// object, in that order, so a route parameter overrides a body field of
    /// the same name, which overrides a query field. The merged object is then
    /// deserialized into `T`.
    ///
    /// The body is consumed. Route parameters, query values and form fields
    /// are text, and are parsed into the field types of `T`: `:id` binds to
    /// a `u64`, `?verbose=true` to a `bool`, and an empty `?page=` to `None`.
    /// JSON body values keep their JSON types.
    ///
    /// # Errors
    ///
    /// Fails with `422 Unprocessable Entity` when the body is malformed or
    /// the merged object does not deserialize into `T`.
    pub async fn input<T: DeserializeOwned>(&mut self) -> crate::Result<T> {
        let mut fields = Fields::new();

        if self.url().query().is_some() {
            let query: Map<String, Value> = self.req.query()?;
            fields.extend(query.into_iter().map(|(name, value)| (name, Field::from(value))));
        }

        match self.content_type() {
            Some(ct) if ct.essence() == mime::JSON.essence() => {
                match self.req.body_json::<Value>().await {
                    Ok(Value::Object(body)) => fields.extend(
                        body.into_iter()
                            .map(|(name, value)| (name, Field::Json(value))),
                    ),
                    Ok(Value::Null) => {}
                    Ok(_) => {
                        return Err(crate::Error::from_str(
                            StatusCode::UnprocessableEntity,
                            "request body must be a JSON object",
                        ))
                    }
                    Err(mut err) => {
                        err.set_status(StatusCode::UnprocessableEntity);
                        return Err(err);
                    }
                }
            }
            Some(ct) if ct.essence() == mime::FORM.essence() => {
                let body: Map<String, Value> = self.req.body_form().await.map_err(|mut err| {
                    err.set_status(StatusCode::UnprocessableEntity);
                    err
                })?;
                fields.extend(body.into_iter().map(|(name, value)| (name, Field::from(value))));
            }
            _ => {}
        }

        for name in &self.param_names {
            if let Ok(value) = self.param(name) {
                fields.insert(name.clone(), Field::Text(value.to_owned()));
            }
        }

        binding::deserialize(fields)
            .map_err(|err| crate::Error::new(StatusCode::UnprocessableEntity, err))
    }

    /// The media types listed in the `Accept` header, most preferred first,
    /// without parameters. A bare `*` is listed last.
    ///
    /// A malformed header is treated as absent.
    #[must_use]
    pub fn acceptable_content_types(&self) -> Vec<String> {
        let accept = match Accept::from_headers(&self.req) {
            Ok(Some(accept)) => accept,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::debug!("Ignoring malformed Accept header: {}", err);
                return Vec::new();
            }
        };

        // a proposal without `q` weighs 1
        let mut types: Vec<(String, f32)> = accept
            .iter()
            .map(|proposal| (proposal.essence().to_string(), proposal.weight().unwrap_or(1.0)))
            .collect();
        types.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut essences: Vec<String> = types.into_iter().map(|(essence, _)| essence).collect();
        if accept.wildcard() {
            essences.push("*".to_string());
        }
        essences
    }

    /// Whether the most preferred acceptable type is JSON (`*/json` or `*+json`).
    #[must_use]
    pub fn wants_json(&self) -> bool {
        self.acceptable_content_types()
            .first()
            .map_or(false, |essence| essence.contains("/json") || essence.contains("+json"))
    }

    /// Whether the client accepts any content type.
    #[must_use]
    pub fn accepts_any_content_type(&self) -> bool {
        match self.acceptable_content_types().first() {
            None => true,
            Some(essence) => essence == "*/*" || essence == "*",
        }
    }

    /// Whether the request was sent by `XMLHttpRequest`.
    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.header("X-Requested-With")
            .map_or(false, |values| values.iter().any(|v| v.as_str() == "XMLHttpRequest"))
    }

    /// Whether the request was sent by pjax.
    #[must_use]
    pub fn is_pjax(&self) -> bool {
        self.header("X-PJAX")
            .map_or(false, |values| values.iter().any(|v| v.as_str() == "true"))
    }

    /// Whether a JSON response should be sent back.
    ///
    /// True when JSON is the preferred type, or for an ajax (non-pjax)
    /// request that accepts anything.
    #[must_use]
    pub fn expects_json(&self) -> bool {
        (self.is_ajax() && !self.is_pjax() && self.accepts_any_content_type()) || self.wants_json()
    }

    /// Whether the request carries a JSON body.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header(CONTENT_TYPE).map_or(false, |values| {
            values
                .iter()
                .any(|v| v.as_str().contains("/json") || v.as_str().contains("+json"))
        })
    }
}

impl AsRef<crate::http::Request> for Context {
    fn as_ref(&self) -> &crate::http::Request {
        &self.req
    }
}

impl AsMut<crate::http::Request> for Context {
    fn as_mut(&mut self) -> &mut crate::http::Request {
        &mut self.req
    }
}
