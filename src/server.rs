//! HTTP surface over [`CountersProcessor`].
//!
//! The route table is built by an explicit [`Router`] value that owns a
//! handle to the processor. Processor calls block (store I/O and rayon
//! fan-out), so each one runs on tokio's blocking pool.

use std::convert::Infallible;
use std::sync::Arc;

use log::{error, warn};
use serde::Serialize;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use crate::error::{CtrError, CtrResult};
use crate::processor::CountersProcessor;

/// Query string as ordered pairs, so repeated `key=` parameters survive.
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Params(pairs)
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The first non-empty value of `name`.
    pub fn required(&self, name: &'static str) -> CtrResult<&str> {
        match self.first(name) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(CtrError::MissingParameter(name)),
        }
    }

    /// Every value of `name`, in order. At least one, none empty.
    pub fn required_all(&self, name: &'static str) -> CtrResult<Vec<String>> {
        let values: Vec<String> = self
            .0
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .collect();
        if values.is_empty() || values.iter().any(|v| v.is_empty()) {
            return Err(CtrError::MissingParameter(name));
        }
        Ok(values)
    }

    /// A required non-negative counter value.
    pub fn required_count(&self, name: &'static str) -> CtrResult<i64> {
        let raw = self.required(name)?;
        match raw.parse::<i64>() {
            Ok(v) if v >= 0 => Ok(v),
            _ => Err(CtrError::InvalidParameter {
                name,
                value: raw.to_string(),
            }),
        }
    }
}

fn report_error(err: CtrError) -> Response {
    let status = if err.is_client_error() {
        warn!("bad_request: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        error!("server_error: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    warp::reply::with_status(err.to_string(), status).into_response()
}

fn report_data<T: Serialize>(data: &T) -> Response {
    match serde_json::to_string_pretty(data) {
        Ok(body) => warp::reply::with_header(body, "content-type", "application/json")
            .into_response(),
        Err(err) => report_error(err.into()),
    }
}

async fn dispatch<T, F>(processor: Arc<CountersProcessor>, op: F) -> Result<Response, Infallible>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&CountersProcessor) -> CtrResult<T> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || op(&processor)).await;
    Ok(match outcome {
        Ok(Ok(data)) => report_data(&data),
        Ok(Err(err)) => report_error(err),
        Err(join) => report_error(CtrError::TaskFailed(join.to_string())),
    })
}

#[derive(Clone)]
pub struct Router {
    processor: Arc<CountersProcessor>,
}

impl Router {
    pub fn new(processor: Arc<CountersProcessor>) -> Self {
        Router { processor }
    }

    fn with_processor(
        &self,
    ) -> impl Filter<Extract = (Arc<CountersProcessor>,), Error = Infallible> + Clone {
        let processor = self.processor.clone();
        warp::any().map(move || processor.clone())
    }

    fn params() -> impl Filter<Extract = (Params,), Error = warp::Rejection> + Clone {
        warp::query::<Vec<(String, String)>>().map(Params::new)
    }

    pub fn routes(&self) -> BoxedFilter<(Response,)> {
        let health = warp::path::end()
            .or(warp::path!("health"))
            .unify()
            .map(|| warp::reply::with_status("OK", StatusCode::OK).into_response());

        let add_view = warp::path!("add_view")
            .and(Router::params())
            .and(self.with_processor())
            .and_then(|params: Params, p: Arc<CountersProcessor>| {
                dispatch(p, move |p| p.add_view(params.required("key")?))
            });

        let add_click = warp::path!("add_click")
            .and(Router::params())
            .and(self.with_processor())
            .and_then(|params: Params, p: Arc<CountersProcessor>| {
                dispatch(p, move |p| p.add_click(params.required("key")?))
            });

        let set_views = warp::path!("set_views")
            .and(Router::params())
            .and(self.with_processor())
            .and_then(|params: Params, p: Arc<CountersProcessor>| {
                dispatch(p, move |p| {
                    let key = params.required("key")?;
                    p.set_views(key, params.required_count("views")?)
                })
            });

        let set_clicks = warp::path!("set_clicks")
            .and(Router::params())
            .and(self.with_processor())
            .and_then(|params: Params, p: Arc<CountersProcessor>| {
                dispatch(p, move |p| {
                    let key = params.required("key")?;
                    p.set_clicks(key, params.required_count("clicks")?)
                })
            });

        let ctr = warp::path!("ctr")
            .and(Router::params())
            .and(self.with_processor())
            .and_then(|params: Params, p: Arc<CountersProcessor>| {
                dispatch(p, move |p| p.ctr(params.required("key")?))
            });

        let sample = warp::path!("sample")
            .and(Router::params())
            .and(self.with_processor())
            .and_then(|params: Params, p: Arc<CountersProcessor>| {
                dispatch(p, move |p| p.sample_many(&params.required_all("key")?))
            });

        let distribution_params = warp::path!("distribution_params")
            .and(Router::params())
            .and(self.with_processor())
            .and_then(|params: Params, p: Arc<CountersProcessor>| {
                dispatch(p, move |p| {
                    p.distribution_params_many(&params.required_all("key")?)
                })
            });

        warp::get()
            .and(
                health
                    .or(add_view)
                    .unify()
                    .or(add_click)
                    .unify()
                    .or(set_views)
                    .unify()
                    .or(set_clicks)
                    .unify()
                    .or(ctr)
                    .unify()
                    .or(sample)
                    .unify()
                    .or(distribution_params)
                    .unify(),
            )
            .boxed()
    }
}
