//! Plan discovery: dynamic query composition.
//!
//! A listing request is an arbitrary combination of independent, optional
//! filter clauses plus at most one sort directive. Each present clause
//! becomes a [`Predicate`] carrying its condition and parameter values; the
//! ordered predicate list is folded into a single `QueryBuilder` at the end,
//! so every user value is bound rather than interpolated, all present
//! clauses AND together, and omitted clauses impose no constraint.
//!
//! Composition is a pure function of (request, author scope, today) and is
//! unit-tested without a database; execution is a single read against the
//! pool with no state carried between requests.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use chrono::{Months, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use huddle_db::models::{Plan, PlanCategory};
use huddle_db::queries::friends;

use crate::scope::{FriendGraph, ScopeMode};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from resolving or executing a discovery request.
#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    /// A people filter was requested without a requester ID. Raised before
    /// any plans query executes.
    #[error("user_id is required for friends or friends_of_friends filters")]
    MissingRequester,

    /// Any data-access fault. Not distinguished further; no retry.
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Request enums
// ---------------------------------------------------------------------------

/// Timeline classification of plans relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeline {
    /// Ongoing today: start_date <= today AND end_date >= today.
    Active,
    /// Starts strictly after today.
    Upcoming,
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Upcoming => "upcoming",
        };
        f.write_str(s)
    }
}

impl FromStr for Timeline {
    type Err = TimelineParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "upcoming" => Ok(Self::Upcoming),
            other => Err(TimelineParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Timeline`] string.
#[derive(Debug, Clone)]
pub struct TimelineParseError(pub String);

impl fmt::Display for TimelineParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid timeline: {:?}", self.0)
    }
}

impl std::error::Error for TimelineParseError {}

/// Column a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// `posted_date` -> created_at.
    PostedDate,
    /// `given_dates` -> start_date.
    GivenDates,
}

impl SortKey {
    fn column(self) -> &'static str {
        match self {
            Self::PostedDate => "created_at",
            Self::GivenDates => "start_date",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PostedDate => "posted_date",
            Self::GivenDates => "given_dates",
        };
        f.write_str(s)
    }
}

impl FromStr for SortKey {
    type Err = SortKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posted_date" => Ok(Self::PostedDate),
            "given_dates" => Ok(Self::GivenDates),
            other => Err(SortKeyParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SortKey`] string.
#[derive(Debug, Clone)]
pub struct SortKeyParseError(pub String);

impl fmt::Display for SortKeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid sort key: {:?}", self.0)
    }
}

impl std::error::Error for SortKeyParseError {}

/// Sort direction. Only meaningful when a sort key is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    /// Lenient, case-insensitive parse: anything other than `desc` means
    /// ascending, including absence. Matches the source's defaulting.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s {
            Some(v) if v.eq_ignore_ascii_case("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A fully parsed plan listing request. Every field is optional; each
/// supplied field contributes exactly one clause (timeline contributes a
/// pair of date comparisons).
#[derive(Debug, Clone, Default)]
pub struct DiscoverRequest {
    pub user_id: Option<Uuid>,
    pub filter_by_people: Option<ScopeMode>,
    pub category: Option<PlanCategory>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub timeline: Option<Timeline>,
    pub months_within: Option<u32>,
    pub years_within: Option<u32>,
    pub sort_by: Option<SortKey>,
    pub sort_order: SortDir,
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One independent filter clause with its parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Author-scope membership from the social scope resolver.
    AuthorIn(Vec<Uuid>),
    Category(PlanCategory),
    /// Inclusive lower price bound.
    PriceMin(f64),
    /// Inclusive upper price bound.
    PriceMax(f64),
    /// Case-insensitive unanchored substring match on location.
    LocationContains(String),
    Duration(String),
    /// Ongoing on the given date.
    ActiveOn(NaiveDate),
    /// Starts strictly after the given date.
    StartsAfter(NaiveDate),
    /// Relative horizon bound on start_date.
    StartsOnOrBefore(NaiveDate),
}

impl Predicate {
    /// Append this clause's condition to the builder, binding its values.
    fn push_sql(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::AuthorIn(authors) => {
                qb.push("posted_by = ANY(");
                qb.push_bind(authors.clone());
                qb.push(")");
            }
            Self::Category(category) => {
                qb.push("category = ");
                qb.push_bind(*category);
            }
            Self::PriceMin(min) => {
                qb.push("price >= ");
                qb.push_bind(*min);
            }
            Self::PriceMax(max) => {
                qb.push("price <= ");
                qb.push_bind(*max);
            }
            Self::LocationContains(term) => {
                qb.push("location ILIKE ");
                qb.push_bind(format!("%{term}%"));
            }
            Self::Duration(duration) => {
                qb.push("duration = ");
                qb.push_bind(duration.clone());
            }
            Self::ActiveOn(today) => {
                qb.push("start_date <= ");
                qb.push_bind(*today);
                qb.push(" AND end_date >= ");
                qb.push_bind(*today);
            }
            Self::StartsAfter(today) => {
                qb.push("start_date > ");
                qb.push_bind(*today);
            }
            Self::StartsOnOrBefore(limit) => {
                qb.push("start_date <= ");
                qb.push_bind(*limit);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Composed query
// ---------------------------------------------------------------------------

/// One composed, ready-to-run discovery query: the ordered predicate list
/// plus an optional sort directive.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanQuery {
    pub predicates: Vec<Predicate>,
    pub sort: Option<(SortKey, SortDir)>,
}

impl PlanQuery {
    /// Fold the predicate list into a single builder. Clauses join with
    /// `AND`; an empty list produces an unrestricted select.
    pub fn to_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT * FROM plans");

        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(&mut qb);
        }

        if let Some((key, dir)) = self.sort {
            qb.push(" ORDER BY ");
            qb.push(key.column());
            qb.push(" ");
            qb.push(dir.sql());
        }

        qb
    }

    /// The SQL text this query renders to (for logging and tests).
    pub fn sql(&self) -> String {
        self.to_builder().sql().to_owned()
    }
}

/// Build the query for a request: one clause per supplied input, in a fixed
/// order, all ANDed. `authors` is the resolved scope (`None` = no people
/// filter); `today` anchors the timeline and horizon clauses.
pub fn compose(
    req: &DiscoverRequest,
    authors: Option<&HashSet<Uuid>>,
    today: NaiveDate,
) -> PlanQuery {
    let mut predicates = Vec::new();

    if let Some(authors) = authors {
        // Sort the bound array so the composed query is deterministic.
        let mut ids: Vec<Uuid> = authors.iter().copied().collect();
        ids.sort();
        predicates.push(Predicate::AuthorIn(ids));
    }
    if let Some(category) = req.category {
        predicates.push(Predicate::Category(category));
    }
    if let Some(min) = req.price_min {
        predicates.push(Predicate::PriceMin(min));
    }
    if let Some(max) = req.price_max {
        predicates.push(Predicate::PriceMax(max));
    }
    if let Some(ref term) = req.location {
        predicates.push(Predicate::LocationContains(term.clone()));
    }
    if let Some(ref duration) = req.duration {
        predicates.push(Predicate::Duration(duration.clone()));
    }
    match req.timeline {
        Some(Timeline::Active) => predicates.push(Predicate::ActiveOn(today)),
        Some(Timeline::Upcoming) => predicates.push(Predicate::StartsAfter(today)),
        None => {}
    }
    // Months and years may both be supplied; both bounds then apply, which
    // can over-constrain. Accepted source behavior, not corrected.
    if let Some(months) = req.months_within {
        predicates.push(Predicate::StartsOnOrBefore(add_months(today, months)));
    }
    if let Some(years) = req.years_within {
        predicates.push(Predicate::StartsOnOrBefore(add_months(
            today,
            years.saturating_mul(12),
        )));
    }

    let sort = req.sort_by.map(|key| (key, req.sort_order));

    PlanQuery { predicates, sort }
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

// ---------------------------------------------------------------------------
// Resolution and execution
// ---------------------------------------------------------------------------

/// Resolve the author scope for a request.
///
/// Returns `Ok(None)` when no people filter is requested; the requester ID
/// is then ignored entirely. Validation happens before any data access.
pub async fn resolve_authors(
    pool: &PgPool,
    req: &DiscoverRequest,
) -> Result<Option<HashSet<Uuid>>, DiscoverError> {
    let Some(mode) = req.filter_by_people else {
        return Ok(None);
    };
    let requester = req.user_id.ok_or(DiscoverError::MissingRequester)?;

    let edges = friends::friend_edges(pool).await?;
    let graph = FriendGraph::from_edges(edges.iter().map(|e| (e.user_id, e.friend_id)));

    Ok(Some(graph.eligible_authors(mode, requester)))
}

/// Run one discovery request end to end: resolve scope, compose, execute.
///
/// Returns the full matching set; no limit, no pagination. Either the whole
/// composed query runs or none of it does.
pub async fn discover_plans(
    pool: &PgPool,
    req: &DiscoverRequest,
) -> Result<Vec<Plan>, DiscoverError> {
    let authors = resolve_authors(pool, req).await?;
    let query = compose(req, authors.as_ref(), Utc::now().date_naive());

    tracing::debug!(sql = %query.sql(), "composed plan discovery query");

    let mut qb = query.to_builder();
    let plans = qb
        .build_query_as::<Plan>()
        .fetch_all(pool)
        .await
        .context("failed to execute plan discovery query")?;

    Ok(plans)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
