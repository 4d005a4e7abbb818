use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::dispatch::{format_values_in, validate_formatters};
use crate::envelope::{RequestMeta, ServiceMethodRequest, ServiceMethodResponse};
use crate::error::{ErrorValue, ServicifyError};
use crate::options::ServicifyOptions;
use crate::timing::{elapsed_time, Clock, MillisClock};
use crate::value::Value;
use crate::Enumeration;

/// A servicified operation: takes a request, never fails with the
/// operation's own error, and resolves to an envelope.
pub type ServiceMethod<D, C = Value> = Box<
    dyn Fn(ServiceMethodRequest<D, C>) -> BoxFuture<'static, Result<ServiceMethodResponse, ServicifyError>>
        + Send
        + Sync,
>;

/// Runs `operation`, times it, and converts its outcome into an envelope.
///
/// A returned value becomes `{data, meta: {status: SUCCESS}}`; a returned
/// error or a panic becomes `{error, meta: {status: FAILURE}}`. Both pass
/// through the formatter specs in `options`. The only error this function
/// itself returns is an invalid formatter configuration, detected before
/// the operation is started.
#[instrument(skip_all)]
pub async fn servicify_outcome_of<F, Fut, T, E>(
    operation: F,
    options: &ServicifyOptions,
) -> Result<ServiceMethodResponse, ServicifyError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: Into<Value>,
    E: Into<anyhow::Error> + 'static,
{
    let formatters = options.resolve_formatters();
    validate_formatters(&formatters)?;

    let clock = options.clock.as_ref();
    let begin = clock.now();
    let wall_begin = MillisClock.now();
    let settled = AssertUnwindSafe(async move { operation().await })
        .catch_unwind()
        .await;
    let timing = match elapsed_time(begin, None, clock, None) {
        Ok(timing) => timing,
        Err(error) => {
            warn!(%error, "clock switched units, falling back to wall-clock millis");
            elapsed_time(wall_begin, None, &MillisClock, None)?
        }
    };

    let response = match settled {
        Ok(Ok(value)) => {
            ServiceMethodResponse::success(format_values_in(value.into(), &formatters)?, timing)
        }
        Ok(Err(error)) => {
            let error = ensure_stack(ErrorValue::from_failure(error), options);
            ServiceMethodResponse::failure(format_values_in(error.into(), &formatters)?, timing)
        }
        Err(payload) => {
            let error = ensure_stack(ErrorValue::from_panic(payload.as_ref()), options);
            warn!(
                panic = error.message.as_deref().unwrap_or_default(),
                "service operation panicked"
            );
            ServiceMethodResponse::failure(format_values_in(error.into(), &formatters)?, timing)
        }
    };

    debug!(
        status = response.meta.status.name(),
        elapsed_millis = response.meta.elapsed_millis,
        "service outcome produced"
    );
    Ok(response)
}

/// Errors that carry no stack of their own get the backtrace at the point
/// the failure was observed, unless stacks are switched off.
fn ensure_stack(error: ErrorValue, options: &ServicifyOptions) -> ErrorValue {
    if options.include_error_stacks && error.stack.is_none() {
        error.with_backtrace()
    } else {
        error
    }
}

/// Adapts a `(data, context)` operation into a [`ServiceMethod`]. The
/// request's trace and correlation ids are echoed into the response meta.
pub fn servicify<D, C, F, Fut, T, E>(operation: F, options: ServicifyOptions) -> ServiceMethod<D, C>
where
    D: Send + 'static,
    C: Send + 'static,
    F: Fn(Option<D>, Option<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Into<Value> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    let operation = Arc::new(operation);
    let options = Arc::new(options);

    Box::new(move |request: ServiceMethodRequest<D, C>| {
        let operation = Arc::clone(&operation);
        let options = Arc::clone(&options);

        async move {
            let ServiceMethodRequest { data, meta } = request;
            let RequestMeta {
                trace_id,
                correlation_id,
                context,
            } = meta.unwrap_or_default();

            let response = servicify_outcome_of(move || operation(data, context), &options).await?;
            Ok(response
                .with_trace_id(trace_id)
                .with_correlation_id(correlation_id))
        }
        .boxed()
    })
}

/// Wraps a one-argument operation so every call resolves to an envelope
/// instead of the operation's own result.
pub fn service_method<A, F, Fut, T, E>(
    operation: F,
    options: ServicifyOptions,
) -> impl Fn(A) -> BoxFuture<'static, Result<ServiceMethodResponse, ServicifyError>> + Send + Sync
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Into<Value> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    let operation = Arc::new(operation);
    let options = Arc::new(options);

    move |argument: A| {
        let operation = Arc::clone(&operation);
        let options = Arc::clone(&options);
        async move { servicify_outcome_of(move || operation(argument), &options).await }.boxed()
    }
}
