use serde_json::{json, Value};

/// Shape of a response body from the upstream endpoint (or from the proxy,
/// seen from the submitter's side).
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Structured body whose `success` field is truthy.
    StructuredSuccess(Value),
    /// Any other structured body.
    StructuredFailure(Value),
    UnstructuredBody(String),
}

/// JavaScript-style truthiness, which is what upstream scripts emit against.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JSON scalars keep their type in the `data` field; anything else is text.
fn relay_data(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::String(_))) => value,
        _ => Value::String(text),
    }
}

impl Reply {
    pub fn structured(value: Value) -> Self {
        if value.get("success").is_some_and(is_truthy) {
            Reply::StructuredSuccess(value)
        } else {
            Reply::StructuredFailure(value)
        }
    }

    /// Classify by sniffing the body: a JSON object, array or `null` is
    /// structured and relayed as is.
    pub fn sniff(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value @ (Value::Object(_) | Value::Array(_) | Value::Null)) => {
                Reply::structured(value)
            }
            _ => Reply::UnstructuredBody(String::from_utf8_lossy(body).into_owned()),
        }
    }

    /// Classify by the declared content type. A JSON content type with an
    /// unparseable body is an error.
    pub fn from_content_type(
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Self, serde_json::Error> {
        let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
        if is_json {
            Ok(Reply::structured(serde_json::from_slice(body)?))
        } else {
            Ok(Reply::UnstructuredBody(
                String::from_utf8_lossy(body).into_owned(),
            ))
        }
    }

    /// The body the proxy sends back to its caller for an upstream reply with
    /// `status`.
    pub fn into_relay_body(self, status: u16) -> Value {
        match self {
            Reply::StructuredSuccess(value) | Reply::StructuredFailure(value) => value,
            Reply::UnstructuredBody(text) => json!({
                "success": status < 400,
                "data": relay_data(text),
            }),
        }
    }

    /// Failure text for a non-success HTTP status: the structured `message`
    /// when truthy, else the raw text body. `None` for structured bodies
    /// without a message.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Reply::StructuredSuccess(value) | Reply::StructuredFailure(value) => value
                .get("message")
                .filter(|m| is_truthy(m))
                .map(|m| match m {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
            Reply::UnstructuredBody(text) => Some(text.clone()),
        }
    }

    pub fn payload_for_log(&self) -> String {
        match self {
            Reply::StructuredSuccess(value) | Reply::StructuredFailure(value) => value.to_string(),
            Reply::UnstructuredBody(text) => text.clone(),
        }
    }
}
