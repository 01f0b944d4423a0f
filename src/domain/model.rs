use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::DeskError;

/// Entity types mirrored from the backend and covered by the data cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Candidates,
    Jobs,
    Domains,
    HiringAgencies,
    Companies,
    Recruiters,
    InterviewSlots,
    Interviews,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Candidates,
        EntityKind::Jobs,
        EntityKind::Domains,
        EntityKind::HiringAgencies,
        EntityKind::Companies,
        EntityKind::Recruiters,
        EntityKind::InterviewSlots,
        EntityKind::Interviews,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Candidates => "candidates",
            EntityKind::Jobs => "jobs",
            EntityKind::Domains => "domains",
            EntityKind::HiringAgencies => "hiring_agencies",
            EntityKind::Companies => "companies",
            EntityKind::Recruiters => "recruiters",
            EntityKind::InterviewSlots => "interview_slots",
            EntityKind::Interviews => "interviews",
        }
    }

    /// Singular label shown next to a search hit.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Candidates => "Candidate",
            EntityKind::Jobs => "Job",
            EntityKind::Domains => "Domain",
            EntityKind::HiringAgencies => "Hiring Agency",
            EntityKind::Companies => "Company",
            EntityKind::Recruiters => "Recruiter",
            EntityKind::InterviewSlots => "Interview Slot",
            EntityKind::Interviews => "Interview",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            EntityKind::Candidates => "/api/candidates/",
            EntityKind::Jobs => "/api/jobs/",
            EntityKind::Domains => "/api/jobs/domains/",
            EntityKind::HiringAgencies => "/api/hiring_agency/",
            EntityKind::Companies => "/api/companies/",
            EntityKind::Recruiters => "/api/companies/recruiters/",
            EntityKind::InterviewSlots => "/api/interviews/slots/",
            EntityKind::Interviews => "/api/interviews/",
        }
    }

    /// Client-side route of the list view; detail routes append the id.
    pub fn route(self) -> &'static str {
        match self {
            EntityKind::Candidates => "/candidates",
            EntityKind::Jobs => "/jobs",
            EntityKind::Domains => "/domains",
            EntityKind::HiringAgencies => "/hiring-agencies",
            EntityKind::Companies => "/companies",
            EntityKind::Recruiters => "/recruiters",
            EntityKind::InterviewSlots => "/interviews/slots",
            EntityKind::Interviews => "/interviews",
        }
    }

    /// Fields shown as title, subtitle and description, in that priority.
    /// Each slot lists alternatives; the first non-empty one wins.
    pub fn display_fields(self) -> DisplayFields {
        match self {
            EntityKind::Candidates => DisplayFields {
                title: &["full_name", "name"],
                subtitle: &["email", "phone"],
                description: &["current_position", "domain_name", "status"],
            },
            EntityKind::Jobs => DisplayFields {
                title: &["job_title", "title"],
                subtitle: &["company_name", "location"],
                description: &["description", "domain_name"],
            },
            EntityKind::Domains => DisplayFields {
                title: &["name"],
                subtitle: &["code"],
                description: &["description"],
            },
            EntityKind::HiringAgencies => DisplayFields {
                title: &["name", "full_name", "first_name"],
                subtitle: &["email"],
                description: &["company_name", "phone_number"],
            },
            EntityKind::Companies => DisplayFields {
                title: &["name"],
                subtitle: &["email", "location"],
                description: &["description", "industry"],
            },
            EntityKind::Recruiters => DisplayFields {
                title: &["full_name", "name"],
                subtitle: &["email"],
                description: &["company_name", "role"],
            },
            EntityKind::InterviewSlots => DisplayFields {
                title: &["interviewer_name", "ai_interviewer_name", "interview_date"],
                subtitle: &["interview_date", "start_time"],
                description: &["status", "mode"],
            },
            EntityKind::Interviews => DisplayFields {
                title: &["candidate_name", "candidate"],
                subtitle: &["job_title", "position"],
                description: &["status", "scheduled_date"],
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisplayFields {
    pub title: &'static [&'static str],
    pub subtitle: &'static [&'static str],
    pub description: &'static [&'static str],
}

impl DisplayFields {
    pub fn all(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.title
            .iter()
            .chain(self.subtitle.iter())
            .chain(self.description.iter())
            .copied()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| {
                kind.as_str() == normalized
                    || kind.as_str().trim_end_matches('s') == normalized
                    || (*kind == EntityKind::HiringAgencies && normalized == "hiring_agency")
                    || (*kind == EntityKind::Companies && normalized == "company")
                    || (*kind == EntityKind::InterviewSlots && normalized == "slots")
            })
            .ok_or_else(|| DeskError::ConfigError {
                message: format!("Unknown entity type: {}", s),
            })
    }
}

/// A backend record: an opaque JSON object carrying an `id`.
/// Field order is kept as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(data) => Some(Self { data }),
            _ => None,
        }
    }

    /// The id as a string, whether the backend sent a number or a string.
    pub fn id(&self) -> Option<String> {
        match self.data.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Scalar field rendered as text; `None` for null, empty, or structured values.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.data.get(field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// First non-empty text among alternative field names.
    pub fn first_text(&self, fields: &[&str]) -> Option<String> {
        fields.iter().find_map(|field| self.text(field))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardWidget {
    pub id: String,
    pub widget_type: String,
    #[serde(default)]
    pub title: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub config: Value,
}

impl DashboardWidget {
    pub fn new(id: &str, widget_type: &str, w: u32, h: u32) -> Self {
        Self {
            id: id.to_string(),
            widget_type: widget_type.to_string(),
            title: String::new(),
            x: 0,
            y: 0,
            w,
            h,
            config: Value::Null,
        }
    }

    pub fn at(mut self, x: u32, y: u32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// True when the two rectangles share at least one grid cell.
    pub fn overlaps(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        self.x < x.saturating_add(w)
            && x < self.x.saturating_add(self.w)
            && self.y < y.saturating_add(h)
            && y < self.y.saturating_add(self.h)
    }
}

/// AI interview session as served by the interview portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub session_key: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub questions: Vec<InterviewQuestion>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnswer {
    pub question_id: i64,
    pub answer_text: String,
    #[serde(default)]
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewResult {
    pub session_id: String,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub answers: Vec<Value>,
}
