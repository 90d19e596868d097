use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, StatusClass},
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

/// Response header echoing the ID a request was logged under.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// A unique identifier for a particular request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID, wrapping back to zero on overflow.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The ID assigned to this request, assigning one if needed.
    pub fn of(req: &Request<'_>) -> RequestId {
        *req.local_cache(RequestId::next)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestId {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(RequestId::of(req))
    }
}

/// Describe the route that handled a request, for the log.
fn route_name(req: &Request<'_>) -> String {
    match req.route() {
        Some(route) => match route.name {
            Some(ref name) => format!("{name} ({})", route.uri),
            None => route.uri.to_string(),
        },
        None => "no route".to_string(),
    }
}

/// A rocket fairing that logs every request and response, tagging both with a [`RequestId`].
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Ballot box open on {protocol}://{ip}:{port}");
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = RequestId::of(req);
        info!("->req{id} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = RequestId::of(req);
        res.set_header(Header::new(REQUEST_ID_HEADER, id.to_string()));

        let code = res.status();
        let message = format!("<-rsp{id} {code} {}", route_name(req));
        match code.class() {
            StatusClass::ServerError => error!("{message}"),
            StatusClass::ClientError => warn!("{message}"),
            _ => info!("{message}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, closing the ballot box...");
    }
}
