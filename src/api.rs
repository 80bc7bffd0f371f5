use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::banner::state::BannerView;
use crate::schedule::model::{Course, ScheduleData};
use crate::schedule::query::{CourseStatus, course_status, next_course, sort_courses_by_time};
use crate::schedule::time::{Day, TimeFormat, format_time};
use crate::settings::FormatToggle;
use crate::time_provider::Clock;

pub const DEFAULT_API_PORT: u16 = 8098;

/// Latest banner published by the render sink.
#[derive(Debug, Default)]
pub struct ApiSharedState {
    pub banner: Option<BannerView>,
    pub renders: u64,
    pub updated_unix_ms: i64,
    total_requests: u64,
}

impl ApiSharedState {
    pub fn publish_banner(&mut self, banner: Option<&BannerView>) {
        self.banner = banner.cloned();
        self.renders += 1;
        self.updated_unix_ms = Local::now().timestamp_millis();
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }
}

#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<Mutex<ApiSharedState>>,
    pub schedule: Option<Arc<ScheduleData>>,
    pub clock: Arc<dyn Clock>,
    pub toggle: Arc<FormatToggle>,
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

pub struct ApiServer {
    stop: Arc<AtomicBool>,
    http_join: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn start(config: ApiServerConfig, context: ApiContext) -> Result<Self> {
        let bind = format!("{}:{}", config.bind_addr, config.port);
        let server = Server::http(&bind)
            .map_err(|err| anyhow::anyhow!("failed to start API server on {bind}: {err}"))?;
        info!("banner API listening on http://{bind}/v1");
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let http_join = thread::spawn(move || run_server_loop(server, context, stop_for_thread));

        Ok(Self {
            stop,
            http_join: Some(http_join),
        })
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.http_join.take() {
            let _ = join.join();
        }
    }
}

fn run_server_loop(server: Server, context: ApiContext, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match server.recv_timeout(Duration::from_millis(200)) {
            Ok(Some(request)) => handle_request(request, &context),
            Ok(None) => {}
            Err(err) => debug!("API receive failed: {err}"),
        }
    }
}

#[derive(Debug)]
enum ApiReply {
    Json(StatusCode, serde_json::Value),
    Text(StatusCode, &'static str),
}

fn handle_request(request: Request, context: &ApiContext) {
    let url = request.url().to_string();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    let reply = if request.method() != &Method::Get {
        ApiReply::Text(StatusCode(405), "method not allowed")
    } else if !request
        .remote_addr()
        .is_some_and(|addr| is_local_network_ip(addr.ip()))
    {
        ApiReply::Text(StatusCode(403), "forbidden: local network only")
    } else {
        route(context, path, query)
    };

    if let Err(err) = respond(request, reply) {
        warn!("failed to answer {path}: {err:#}");
    }
}

fn route(context: &ApiContext, path: &str, query: &str) -> ApiReply {
    let Ok(mut guard) = context.state.lock() else {
        return ApiReply::Text(StatusCode(500), "internal state lock error");
    };
    guard.total_requests += 1;

    match path {
        "/healthz" => ApiReply::Text(StatusCode(200), "ok"),
        "/v1" => ApiReply::Json(
            StatusCode(200),
            json!({
                "routes": ["/healthz", "/v1/banner", "/v1/schedule", "/v1/format"],
                "scheduled_days": context
                    .schedule
                    .as_deref()
                    .map(scheduled_days)
                    .unwrap_or_default(),
            }),
        ),
        "/" | "/v1/banner" => ApiReply::Json(
            StatusCode(200),
            json!({
                "banner": guard.banner,
                "format": context.toggle.current(),
                "renders": guard.renders,
                "updated_unix_ms": guard.updated_unix_ms,
                "total_requests": guard.total_requests,
            }),
        ),
        "/v1/schedule" => {
            drop(guard);
            schedule_reply(context)
        }
        "/v1/format" => {
            drop(guard);
            format_reply(context, query_param(query, "value"))
        }
        _ => ApiReply::Text(StatusCode(404), "not found"),
    }
}

#[derive(Serialize)]
struct ScheduleEntry<'a> {
    #[serde(flatten)]
    course: &'a Course,
    status: CourseStatus,
    time_range: String,
}

fn schedule_reply(context: &ApiContext) -> ApiReply {
    let now = match context.clock.now() {
        Ok(now) => now,
        Err(err) => {
            warn!("clock unavailable for /v1/schedule: {err:#}");
            return ApiReply::Text(StatusCode(503), "clock unavailable");
        }
    };
    let format = context.toggle.current();
    let Some(schedule) = context.schedule.as_deref() else {
        return ApiReply::Json(
            StatusCode(200),
            json!({ "term": null, "today": now.day, "courses": [], "next": null }),
        );
    };

    let today = schedule.courses(now.day);
    let courses = sort_courses_by_time(today)
        .into_iter()
        .map(|course| ScheduleEntry {
            course,
            status: course_status(course, now),
            time_range: format!(
                "{} - {}",
                format_time(course.start_time, format),
                format_time(course.end_time, format)
            ),
        })
        .collect::<Vec<_>>();

    ApiReply::Json(
        StatusCode(200),
        json!({
            "term": schedule.term,
            "today": now.day,
            "now": format_time(now.time, format),
            "courses": courses,
            "next": next_course(today, now),
        }),
    )
}

fn format_reply(context: &ApiContext, value: Option<&str>) -> ApiReply {
    let format = match value.map(str::trim) {
        None | Some("") => context.toggle.current(),
        Some("toggle") => context.toggle.toggle(),
        Some(raw) => match raw.parse::<TimeFormat>() {
            Ok(format) => context.toggle.set(format),
            Err(_) => return ApiReply::Text(StatusCode(400), "value must be 12, 24 or toggle"),
        },
    };
    ApiReply::Json(StatusCode(200), json!({ "format": format }))
}

fn respond(request: Request, reply: ApiReply) -> Result<()> {
    let (status, content_type, body) = match reply {
        ApiReply::Json(status, body) => (
            status,
            "application/json; charset=utf-8",
            serde_json::to_vec(&body)?,
        ),
        ApiReply::Text(status, body) => (
            status,
            "text/plain; charset=utf-8",
            body.as_bytes().to_vec(),
        ),
    };
    let header = Header::from_bytes("Content-Type", content_type)
        .map_err(|_| anyhow::anyhow!("failed to build content-type header"))?;
    request.respond(
        Response::from_data(body)
            .with_status_code(status)
            .with_header(header),
    )?;
    Ok(())
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(k, v)| (k == key).then_some(v))
}

fn is_local_network_ip(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local() || v6.is_unicast_link_local(),
    }
}

fn scheduled_days(schedule: &ScheduleData) -> Vec<Day> {
    Day::ALL
        .into_iter()
        .filter(|day| !schedule.courses(*day).is_empty())
        .collect()
}
