use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::formatters::ErrorLiteral;
use crate::timing::PortableTiming;
use crate::value::Value;
use crate::Enumeration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enumeration)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Failure,
    Success,
    /// Reserved for multi-part outcomes; never produced by the wrappers.
    Partial,
}

/// Input to a service method: the payload plus cross-cutting metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMethodRequest<D = Value, C = Value> {
    #[serde(skip_serializing_if = "Option::is_none", default = "none")]
    pub data: Option<D>,
    #[serde(skip_serializing_if = "Option::is_none", default = "none")]
    pub meta: Option<RequestMeta<C>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta<C = Value> {
    /// Traces activity as it flows through messages and service calls.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace_id: Option<String>,
    /// Token received from the requestor, echoed back so it can associate
    /// the response with its request.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
    /// Security or caller context, passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none", default = "none")]
    pub context: Option<C>,
}

fn none<T>() -> Option<T> {
    None
}

impl<C> Default for RequestMeta<C> {
    fn default() -> Self {
        Self {
            trace_id: None,
            correlation_id: None,
            context: None,
        }
    }
}

impl<C> RequestMeta<C> {
    /// Metadata with a freshly generated trace id.
    pub fn traced() -> Self {
        Self::default().with_trace_id(Uuid::new_v4().to_string())
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }
}

impl<D, C> Default for ServiceMethodRequest<D, C> {
    fn default() -> Self {
        Self {
            data: None,
            meta: None,
        }
    }
}

impl<D, C> ServiceMethodRequest<D, C> {
    pub fn new(data: D) -> Self {
        Self {
            data: Some(data),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: RequestMeta<C>) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Either the formatted result of a successful operation or the formatted
/// error of a failed one. Exactly one is ever present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseOutcome {
    Failure { error: Value },
    Success {
        #[serde(skip_serializing_if = "Value::is_undefined", default)]
        data: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
    pub elapsed_millis: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elapsed_nanos: Option<String>,
}

/// The envelope returned for every outcome: `{data, meta}` on success,
/// `{error, meta}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMethodResponse {
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
    pub meta: ResponseMeta,
}

impl ServiceMethodResponse {
    pub fn success(data: Value, timing: PortableTiming) -> Self {
        Self::new(ResponseOutcome::Success { data }, ResponseStatus::Success, timing)
    }

    pub fn failure(error: Value, timing: PortableTiming) -> Self {
        Self::new(ResponseOutcome::Failure { error }, ResponseStatus::Failure, timing)
    }

    fn new(outcome: ResponseOutcome, status: ResponseStatus, timing: PortableTiming) -> Self {
        Self {
            outcome,
            meta: ResponseMeta {
                status,
                trace_id: None,
                correlation_id: None,
                elapsed_millis: timing.elapsed_millis,
                elapsed_nanos: timing.elapsed_nanos,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Failure { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Success { data } => Some(data),
            ResponseOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Failure { error } => Some(error),
            ResponseOutcome::Success { .. } => None,
        }
    }

    /// Deserializes the success payload into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.data()
            .map(|data| serde_json::to_value(data).and_then(serde_json::from_value))
    }

    /// Reads the failure payload back as an [`ErrorLiteral`]; `None` on
    /// success or when a custom error formatter produced another shape.
    pub fn error_literal(&self) -> Option<ErrorLiteral> {
        let error = self.error()?;
        serde_json::to_value(error)
            .and_then(serde_json::from_value)
            .ok()
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.meta.trace_id = trace_id;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.meta.correlation_id = correlation_id;
        self
    }

    pub fn timing(&self) -> PortableTiming {
        PortableTiming {
            elapsed_millis: self.meta.elapsed_millis,
            elapsed_nanos: self.meta.elapsed_nanos.clone(),
        }
    }
}
