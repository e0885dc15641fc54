use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as HeaderError, Header},
};
use tower_http::trace::TraceLayer;

use std::sync::Arc;

use crate::{account, transactions};
use engine::Engine;

static USER_ID_HEADER: HeaderName = HeaderName::from_static(api_types::USER_ID_HEADER);

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Owner of the request, as resolved by the `auth` middleware.
#[derive(Clone, Debug)]
pub struct Owner(pub String);

/// `TypedHeader` for the `x-user-id` header.
///
/// The value is set by the authentication layer in front of this server and
/// trusted as is.
#[derive(Debug)]
struct UserIdHeader(String);

impl Header for UserIdHeader {
    fn name() -> &'static HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(HeaderError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(HeaderError::invalid());
        };

        Ok(UserIdHeader(value.trim().to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-user-id header"),
        }
    }
}

async fn auth(
    user_header: Option<TypedHeader<UserIdHeader>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(UserIdHeader(user_id))) = user_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if user_id.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(Owner(user_id));
    Ok(next.run(request).await)
}

async fn health() -> &'static str {
    "ok"
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they are mapped to a response.
        .on_failure(());

    router.layer(tracing_layer)
}

pub fn router(state: ServerState) -> Router {
    let router = Router::new()
        .route("/account", post(account::open))
        .route("/account/aggregate", get(account::aggregate))
        .route("/account/reconcile", post(account::reconcile))
        .route("/account/verify", get(account::verify))
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route_layer(middleware::from_fn(auth))
        .route("/", get(health))
        .with_state(state);

    add_tracing_layer(router)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}
