use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub total_work_seconds: Option<i64>,
    pub note: String,
    pub is_read: bool,
    pub read_by: Option<Uuid>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BreakRecord {
    pub id: Uuid,
    pub attendance_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BreakRecord {
    /// Zero while the break is still open.
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end - self.start_time,
            None => Duration::zero(),
        }
    }
}

/// Worked time is undefined until both stamps exist; breaks without an end
/// contribute nothing.
pub fn total_work_time(
    clock_in: Option<DateTime<Utc>>,
    clock_out: Option<DateTime<Utc>>,
    breaks: &[BreakRecord],
) -> Option<Duration> {
    let (clock_in, clock_out) = (clock_in?, clock_out?);
    let total_break = breaks
        .iter()
        .fold(Duration::zero(), |acc, b| acc + b.duration());
    Some(clock_out - clock_in - total_break)
}

impl AttendanceRecord {
    pub fn total_work_duration(&self) -> Option<Duration> {
        self.total_work_seconds.map(Duration::seconds)
    }

    /// "7h30m" style rendering used by list payloads; "-" until computed.
    pub fn formatted_work_time(&self) -> String {
        match self.total_work_seconds {
            None => "-".to_string(),
            Some(seconds) => {
                let hours = seconds / 3600;
                let minutes = (seconds % 3600) / 60;
                if hours > 0 {
                    format!("{}h{:02}m", hours, minutes)
                } else {
                    format!("{}m", minutes)
                }
            }
        }
    }
}

/// HR-side create/update payload for ledger maintenance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceInput {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatusFilter {
    Read,
    Unread,
}

impl std::str::FromStr for ReadStatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(ReadStatusFilter::Read),
            "unread" => Ok(ReadStatusFilter::Unread),
            _ => Err(format!("Invalid ReadStatusFilter: {}", s)),
        }
    }
}

/// Filter criteria for the attendance list views. Date bounds are inclusive
/// calendar dates on both ends.
#[derive(Debug, Default, Clone)]
pub struct AttendanceFilter {
    /// Case-insensitive substring over username and full name (HR list only).
    pub query: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub read_status: Option<ReadStatusFilter>,
}

/// One row of the manager's daily overview: a managed employee and their
/// record for the selected date, if submitted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendanceEntry {
    pub user_id: Uuid,
    pub employee_number: String,
    pub full_name: String,
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionFilter {
    Submitted,
    Unsubmitted,
}

impl std::str::FromStr for SubmissionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(SubmissionFilter::Submitted),
            "unsubmitted" => Ok(SubmissionFilter::Unsubmitted),
            _ => Err(format!("Invalid SubmissionFilter: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, hour, min, 0).unwrap()
    }

    fn break_between(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> BreakRecord {
        BreakRecord {
            id: Uuid::new_v4(),
            attendance_id: Uuid::new_v4(),
            start_time: start,
            end_time: end,
            created_at: start,
        }
    }

    #[test]
    fn full_day_with_lunch_break_is_eight_hours() {
        let breaks = [break_between(at(12, 0), Some(at(13, 0)))];
        let total = total_work_time(Some(at(9, 0)), Some(at(18, 0)), &breaks).unwrap();
        assert_eq!(total, Duration::hours(8));
    }

    #[test]
    fn undefined_until_both_stamps_exist() {
        assert_eq!(total_work_time(Some(at(9, 0)), None, &[]), None);
        assert_eq!(total_work_time(None, Some(at(18, 0)), &[]), None);
        assert_eq!(total_work_time(None, None, &[]), None);
    }

    #[test]
    fn open_break_contributes_nothing() {
        let breaks = [
            break_between(at(12, 0), Some(at(12, 45))),
            break_between(at(15, 0), None),
        ];
        let total = total_work_time(Some(at(9, 0)), Some(at(17, 0)), &breaks).unwrap();
        assert_eq!(total, Duration::hours(8) - Duration::minutes(45));
    }

    #[test]
    fn formats_worked_time_for_lists() {
        let mut record = AttendanceRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            clock_in: None,
            clock_out: None,
            total_work_seconds: None,
            note: String::new(),
            is_read: false,
            read_by: None,
            read_at: None,
            created_at: at(9, 0),
            updated_at: at(9, 0),
        };
        assert_eq!(record.formatted_work_time(), "-");

        record.total_work_seconds = Some(8 * 3600 + 5 * 60);
        assert_eq!(record.formatted_work_time(), "8h05m");

        record.total_work_seconds = Some(35 * 60);
        assert_eq!(record.formatted_work_time(), "35m");
    }
}
