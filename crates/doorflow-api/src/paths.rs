//! Backend endpoints.
//!
//! Endpoints are kept as raw path segments so the HTTP layer can
//! percent-encode ids when joining them onto the base URL.

use chrono::NaiveDate;
use std::fmt;

use crate::media::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
            Method::Put => f.write_str("PUT"),
        }
    }
}

/// A method plus path segments and query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
        }
    }

    fn with_query(mut self, key: &str, value: String) -> Self {
        self.query.push((key.to_string(), value));
        self
    }

    /// Display form, e.g. `/mobile/field-jobs/42`.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        if !self.query.is_empty() {
            let pairs: Vec<String> = self.query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            path.push('?');
            path.push_str(&pairs.join("&"));
        }
        path
    }

    /// Whether repeating this request can duplicate a side effect.
    pub fn is_mutation(&self) -> bool {
        !matches!(self.method, Method::Get)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

pub fn jobs() -> Endpoint {
    Endpoint::new(Method::Get, &["jobs"])
}

pub fn job(job_id: &str) -> Endpoint {
    Endpoint::new(Method::Get, &["jobs", job_id])
}

pub fn schedule_job(job_id: &str) -> Endpoint {
    Endpoint::new(Method::Post, &["jobs", job_id, "schedule"])
}

pub fn field_jobs(date: Option<NaiveDate>) -> Endpoint {
    let endpoint = Endpoint::new(Method::Get, &["mobile", "field-jobs"]);
    match date {
        Some(date) => endpoint.with_query("date", date.format("%Y-%m-%d").to_string()),
        None => endpoint,
    }
}

pub fn field_job(job_id: &str) -> Endpoint {
    Endpoint::new(Method::Get, &["mobile", "field-jobs", job_id])
}

pub fn field_summary() -> Endpoint {
    Endpoint::new(Method::Get, &["mobile", "field-summary"])
}

/// Cheap reachability check.
pub fn connectivity_test() -> Endpoint {
    Endpoint::new(Method::Get, &["mobile", "test"])
}

pub fn start_job(job_id: &str) -> Endpoint {
    Endpoint::new(Method::Post, &["mobile", "jobs", job_id, "start"])
}

pub fn complete_door(job_id: &str, door_id: &str) -> Endpoint {
    Endpoint::new(Method::Post, &["mobile", "jobs", job_id, "doors", door_id, "complete"])
}

pub fn complete_job(job_id: &str) -> Endpoint {
    Endpoint::new(Method::Post, &["mobile", "jobs", job_id, "complete"])
}

pub fn line_item(job_id: &str, door_id: &str, line_item_id: &str) -> Endpoint {
    Endpoint::new(
        Method::Put,
        &["mobile", "jobs", job_id, "doors", door_id, "line-items", line_item_id],
    )
}

pub fn door_media(job_id: &str, door_id: &str, kind: MediaKind) -> Endpoint {
    Endpoint::new(Method::Post, &["mobile", "jobs", job_id, "doors", door_id, kind.as_str()])
}

pub fn dispatch(date: NaiveDate) -> Endpoint {
    let day = date.format("%Y-%m-%d").to_string();
    Endpoint::new(Method::Get, &["dispatch", &day])
}

pub fn save_dispatch() -> Endpoint {
    Endpoint::new(Method::Post, &["dispatch"])
}

pub fn users() -> Endpoint {
    Endpoint::new(Method::Get, &["auth", "users"])
}
