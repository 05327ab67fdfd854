use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::method_routing;
use axum::{Json, Router};
use axum_server::Server;
use serde::Serialize;
use tracing::{info, warn};

use crate::client_ip::{self, ClientIpError, ClientOrigin};
use crate::geo_api::{GeoLocation, GeoLookup};
use crate::metrics::CHECK_IP_RESPONSES;
use crate::relays::{RelayList, RelaySnapshot};
use crate::utils::inspect_err;
use crate::App;

pub const CHECK_IP_ROUTE: &str = "/check-ip";
pub const LOCATION_ROUTE: &str = "/location/check-ip";

const PROCESSING_ERROR: &str = "Error processing your IP.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_json = headers
            .get(header::ACCEPT)
            .and_then(|accept| accept.to_str().ok())
            .is_some_and(|accept| accept.split(',').any(accepts_json));
        if wants_json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// A single `Accept` media range naming json with a non-zero quality.
fn accepts_json(media_range: &str) -> bool {
    let mut parts = media_range.split(';').map(str::trim);
    if !parts
        .next()
        .is_some_and(|media| media.eq_ignore_ascii_case("application/json"))
    {
        return false;
    }
    parts
        .filter_map(|param| param.strip_prefix("q="))
        .all(|quality| quality.parse::<f32>().map_or(true, |q| q > 0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Bypass(IpAddr),
    Protected(Ipv4Addr),
    NotProtected(Ipv4Addr),
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bypass(_) | Self::Protected(_) => "protected",
            Self::NotProtected(_) => "not_protected",
            Self::Error => "error",
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Self::Bypass(ip) => Some(*ip),
            Self::Protected(ip) | Self::NotProtected(ip) => Some(IpAddr::V4(*ip)),
            Self::Error => None,
        }
    }
}

pub fn classify(relays: &RelayList, origin: &Result<ClientOrigin, ClientIpError>) -> CheckStatus {
    match origin {
        Ok(ClientOrigin::Bypass(ip)) => CheckStatus::Bypass(*ip),
        Ok(ClientOrigin::V4(ip)) if relays.contains(ip) => CheckStatus::Protected(*ip),
        Ok(ClientOrigin::V4(ip)) => CheckStatus::NotProtected(*ip),
        Err(_) => CheckStatus::Error,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationInfo {
    pub city: String,
    pub country: String,
}

impl From<GeoLocation> for LocationInfo {
    fn from(value: GeoLocation) -> Self {
        Self {
            city: value.city_or_unknown().to_string(),
            country: value.country_or_unknown().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIpBody {
    pub status: &'static str,
    pub ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_info: Option<LocationInfo>,
    pub refreshing: bool,
}

#[derive(Debug)]
pub struct CheckIpReply {
    pub format: ResponseFormat,
    pub status: CheckStatus,
    pub location: Option<LocationInfo>,
    pub snapshot: Arc<RelaySnapshot>,
}

impl CheckIpReply {
    pub fn text(&self) -> String {
        let relays = &self.snapshot.relays;
        match self.status {
            CheckStatus::Bypass(_) | CheckStatus::Protected(_) => {
                format!("You are protected. Allowed IPs: {relays}")
            }
            CheckStatus::NotProtected(ip) => {
                format!("Not protected. Your IP is {ip}. Allowed IPs: {relays}")
            }
            CheckStatus::Error => String::from(PROCESSING_ERROR),
        }
    }

    pub fn body(&self) -> CheckIpBody {
        CheckIpBody {
            status: self.status.as_str(),
            ip: self.status.ip(),
            location_info: self.location.clone(),
            refreshing: self.snapshot.is_refreshing(),
        }
    }
}

impl IntoResponse for CheckIpReply {
    fn into_response(self) -> Response {
        match self.format {
            ResponseFormat::Text => self.text().into_response(),
            ResponseFormat::Json => Json(self.body()).into_response(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationReply {
    Located(Ipv4Addr, LocationInfo),
    Unavailable(Ipv4Addr),
    Local(IpAddr),
    Error,
}

impl LocationReply {
    fn status(&self) -> &'static str {
        match self {
            Self::Located(..) => "located",
            Self::Unavailable(_) => "unavailable",
            Self::Local(_) => "local",
            Self::Error => "error",
        }
    }
}

impl Display for LocationReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Located(ip, location) => write!(
                f,
                "Your IP is {ip}, located in {}, {}.",
                location.city, location.country
            ),
            Self::Unavailable(ip) => write!(f, "Your IP is {ip}. Failed to fetch location data."),
            Self::Local(ip) => write!(
                f,
                "Your IP is {ip}. Location lookup skipped for local requests."
            ),
            Self::Error => f.write_str(PROCESSING_ERROR),
        }
    }
}

impl IntoResponse for LocationReply {
    fn into_response(self) -> Response {
        self.to_string().into_response()
    }
}

async fn lookup_location(app: &App, ip: Ipv4Addr) -> Option<LocationInfo> {
    app.geo
        .lookup(ip)
        .await
        .map_err(|err| inspect_err("Failed to fetch location data", err))
        .ok()
        .map(LocationInfo::from)
}

fn resolve_origin(
    app: &App,
    headers: &HeaderMap,
    peer: SocketAddr,
) -> Result<ClientOrigin, ClientIpError> {
    let raw = client_ip::raw_origin(headers, peer);
    info!(msg = "Incoming request", ip = %raw);

    let origin = client_ip::normalize(&raw, &app.config.bypass_nets);
    if let Err(err) = &origin {
        warn!(msg = "Error processing client ip", %err);
    }
    origin
}

async fn check_ip(
    State(app): State<Arc<App>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> CheckIpReply {
    let format = ResponseFormat::from_headers(&headers);
    let origin = resolve_origin(&app, &headers, peer);

    // a refresh in flight never blocks readers, they get the last good list
    let snapshot = app.relays();
    let status = classify(&snapshot.relays, &origin);
    match status {
        CheckStatus::Bypass(ip) => info!(msg = "Local request, bypassing relay check", %ip),
        CheckStatus::Protected(ip) => info!(msg = "IP is a known relay", %ip),
        CheckStatus::NotProtected(ip) => info!(msg = "IP is not a known relay", %ip),
        CheckStatus::Error => {}
    }

    let location = match (format, status) {
        (ResponseFormat::Json, CheckStatus::Protected(ip) | CheckStatus::NotProtected(ip)) => {
            lookup_location(&app, ip).await
        }
        _ => None,
    };

    CHECK_IP_RESPONSES
        .with_label_values(&[CHECK_IP_ROUTE, status.as_str()])
        .inc();
    CheckIpReply {
        format,
        status,
        location,
        snapshot,
    }
}

async fn check_location(
    State(app): State<Arc<App>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> LocationReply {
    let reply = match resolve_origin(&app, &headers, peer) {
        Ok(ClientOrigin::Bypass(ip)) => LocationReply::Local(ip),
        Ok(ClientOrigin::V4(ip)) => match lookup_location(&app, ip).await {
            Some(location) => {
                info!(
                    msg = "Located client",
                    %ip,
                    city = %location.city,
                    country = %location.country
                );
                LocationReply::Located(ip, location)
            }
            None => LocationReply::Unavailable(ip),
        },
        Err(_) => LocationReply::Error,
    };

    CHECK_IP_RESPONSES
        .with_label_values(&[LOCATION_ROUTE, reply.status()])
        .inc();
    reply
}

pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .route(CHECK_IP_ROUTE, method_routing::get(check_ip))
        .route(LOCATION_ROUTE, method_routing::get(check_location))
        .with_state(app)
}

pub struct ApiServer {
    server: Server,
}

impl ApiServer {
    pub fn new(addr: SocketAddr) -> Self {
        let server = axum_server::bind(addr);

        Self { server }
    }

    pub async fn serve(self, app: Arc<App>) -> std::io::Result<()> {
        let router = router(app).into_make_service_with_connect_info::<SocketAddr>();
        self.server.serve(router).await
    }
}
