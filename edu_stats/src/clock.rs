/*!
Breakdown of a school day on a 24 hour clock face.

A day is cut into chronological segments (before school, sessions, breaks,
cram school, after school). Each segment carries its length in hours and the
pie angles of a clock drawn clockwise from 12 o'clock.
*/

use serde::Serialize;

use crate::config::ClockError;

const HOURS_PER_DAY: f64 = 24.0;
const DEGREES_PER_HOUR: f64 = 360.0 / HOURS_PER_DAY;
/// 12 o'clock, with 0° at 3 o'clock and angles growing counter-clockwise.
pub const CLOCK_START_ANGLE: f64 = 90.0;

/// When school (and optionally cram school) happens in one country.
///
/// Times are hours of the day as decimals: 8.75 is 8:45.
#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSchedule {
    pub country: String,
    pub start_time: Vec<f64>,
    pub end_time: Vec<f64>,
    pub cram_school_start_time: Option<f64>,
    pub cram_school_end_time: Option<f64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
    BeforeSchool,
    SchoolHours,
    Break,
    BetweenSchoolAndCram,
    CramSchool,
    AfterSchool,
}

impl SegmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            SegmentKind::BeforeSchool => "Before School",
            SegmentKind::SchoolHours => "School Hours",
            SegmentKind::Break => "Break",
            SegmentKind::BetweenSchoolAndCram => "Between School and Cram",
            SegmentKind::CramSchool => "Cram School",
            SegmentKind::AfterSchool => "After School",
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSegment {
    pub kind: SegmentKind,
    pub hours: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBreakdown {
    pub country: String,
    pub segments: Vec<ClockSegment>,
    pub school_hours: f64,
    pub cram_hours: f64,
    /// Share of the day spent in school or cram school, in percent.
    pub education_percentage: f64,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    start: f64,
    end: f64,
    hours: f64,
}

impl Session {
    fn new(start: f64, end: f64) -> Session {
        let start = start.rem_euclid(HOURS_PER_DAY);
        let end = end.rem_euclid(HOURS_PER_DAY);
        // A session ending before it starts runs past midnight.
        let hours = if end > start {
            end - start
        } else {
            HOURS_PER_DAY - start + end
        };
        Session { start, end, hours }
    }
}

fn check_time(country: &str, value: f64) -> Result<f64, ClockError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ClockError::InvalidTime {
            country: country.to_string(),
            value,
        })
    }
}

/// Cuts the day of a schedule into clock segments.
pub fn day_breakdown(schedule: &ClockSchedule) -> Result<DayBreakdown, ClockError> {
    let country = schedule.country.as_str();
    if schedule.start_time.len() != schedule.end_time.len() {
        return Err(ClockError::MismatchedSessions {
            country: country.to_string(),
            starts: schedule.start_time.len(),
            ends: schedule.end_time.len(),
        });
    }
    if schedule.start_time.is_empty() {
        return Err(ClockError::NoSessions {
            country: country.to_string(),
        });
    }

    let mut sessions: Vec<Session> = Vec::with_capacity(schedule.start_time.len());
    for (start, end) in schedule.start_time.iter().zip(schedule.end_time.iter()) {
        sessions.push(Session::new(
            check_time(country, *start)?,
            check_time(country, *end)?,
        ));
    }
    let cram: Option<Session> = match (
        schedule.cram_school_start_time,
        schedule.cram_school_end_time,
    ) {
        (Some(s), Some(e)) => Some(Session::new(check_time(country, s)?, check_time(country, e)?)),
        _ => None,
    };

    let school_hours: f64 = sessions.iter().map(|s| s.hours).sum();
    let cram_hours = cram.map(|c| c.hours).unwrap_or(0.0);
    let first_start = sessions
        .iter()
        .map(|s| s.start)
        .fold(f64::INFINITY, f64::min);
    let last_end = sessions
        .iter()
        .map(|s| s.end)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut parts: Vec<(SegmentKind, f64)> = Vec::new();
    if first_start > 0.0 {
        parts.push((SegmentKind::BeforeSchool, first_start));
    }
    for (idx, session) in sessions.iter().enumerate() {
        if idx > 0 {
            let gap = session.start - sessions[idx - 1].end;
            if gap > 0.0 {
                parts.push((SegmentKind::Break, gap));
            }
        }
        parts.push((SegmentKind::SchoolHours, session.hours));
    }
    let mut final_end = last_end;
    if let Some(c) = cram.filter(|c| c.hours > 0.0) {
        let gap = c.start - last_end;
        if gap > 0.0 {
            parts.push((SegmentKind::BetweenSchoolAndCram, gap));
        }
        parts.push((SegmentKind::CramSchool, c.hours));
        final_end = c.end;
    }
    if final_end < HOURS_PER_DAY {
        let after = HOURS_PER_DAY - final_end;
        if after > 0.0 {
            parts.push((SegmentKind::AfterSchool, after));
        }
    }

    let mut angle = CLOCK_START_ANGLE;
    let segments: Vec<ClockSegment> = parts
        .into_iter()
        .map(|(kind, hours)| {
            let start_angle = angle;
            angle -= hours * DEGREES_PER_HOUR;
            ClockSegment {
                kind,
                hours,
                start_angle,
                end_angle: angle,
            }
        })
        .collect();

    Ok(DayBreakdown {
        country: country.to_string(),
        segments,
        school_hours,
        cram_hours,
        education_percentage: (school_hours + cram_hours) / HOURS_PER_DAY * 100.0,
    })
}
