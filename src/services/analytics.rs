use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{shift, user};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub avg_hours: f64,
    pub total_clock_ins: usize,
    pub total_staff_active: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffHours {
    pub staff_id: Uuid,
    pub staff_name: Option<String>,
    pub staff_email: String,
    pub total_hours: f64,
    pub shifts_count: usize,
}

pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Elapsed time between clock-in and clock-out in hours, to two decimals
pub fn shift_hours(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> f64 {
    let millis = (clock_out - clock_in).num_milliseconds().max(0);
    round_hours(millis as f64 / 3_600_000.0)
}

/// Stats for shifts whose clock-in falls on `date` (UTC)
pub fn daily_stats(date: NaiveDate, shifts: &[shift::Model]) -> DailyStats {
    let on_day: Vec<&shift::Model> = shifts
        .iter()
        .filter(|s| s.clock_in_time.with_timezone(&Utc).date_naive() == date)
        .collect();

    let staff: HashSet<Uuid> = on_day.iter().map(|s| s.user_id).collect();
    let completed: Vec<f64> = on_day.iter().filter_map(|s| s.total_hours).collect();

    let avg_hours = if completed.is_empty() {
        0.0
    } else {
        round_hours(completed.iter().sum::<f64>() / completed.len() as f64)
    };

    DailyStats {
        date,
        avg_hours,
        total_clock_ins: on_day.len(),
        total_staff_active: staff.len(),
    }
}

/// Hours per staff member over shifts clocked in at or after `since`,
/// busiest first. Open shifts count towards `shifts_count` only.
pub fn hours_per_staff(
    since: DateTime<Utc>,
    shifts: &[shift::Model],
    users: &[user::Model],
) -> Vec<StaffHours> {
    let mut totals: HashMap<Uuid, (f64, usize)> = HashMap::new();
    for s in shifts
        .iter()
        .filter(|s| s.clock_in_time.with_timezone(&Utc) >= since)
    {
        let entry = totals.entry(s.user_id).or_insert((0.0, 0));
        entry.0 += s.total_hours.unwrap_or(0.0);
        entry.1 += 1;
    }

    let mut staff: Vec<StaffHours> = totals
        .into_iter()
        .filter_map(|(user_id, (hours, count))| {
            let user = users.iter().find(|u| u.id == user_id)?;
            Some(StaffHours {
                staff_id: user.id,
                staff_name: user.name.clone(),
                staff_email: user.email.clone(),
                total_hours: round_hours(hours),
                shifts_count: count,
            })
        })
        .collect();

    staff.sort_by(|a, b| {
        b.total_hours
            .total_cmp(&a.total_hours)
            .then_with(|| a.staff_email.cmp(&b.staff_email))
    });
    staff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::shift::ShiftStatus;
    use crate::entities::user::UserRole;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn shift(user_id: Uuid, clock_in: DateTime<Utc>, hours: Option<f64>) -> shift::Model {
        shift::Model {
            id: Uuid::new_v4(),
            user_id,
            location_id: "main-hospital".to_string(),
            clock_in_time: clock_in.into(),
            clock_out_time: hours.map(|h| (clock_in + Duration::minutes((h * 60.0) as i64)).into()),
            clock_in_lat: 37.7749,
            clock_in_lng: -122.4194,
            clock_out_lat: None,
            clock_out_lng: None,
            clock_in_note: None,
            clock_out_note: None,
            status: if hours.is_some() {
                ShiftStatus::ClockedOut
            } else {
                ShiftStatus::ClockedIn
            },
            total_hours: hours,
            created_at: clock_in.into(),
            updated_at: clock_in.into(),
        }
    }

    fn user(email: &str) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            auth_subject: format!("auth0|{}", email),
            email: email.to_string(),
            name: Some(email.split('@').next().unwrap().to_string()),
            role: UserRole::CareWorker,
            created_at: at(1, 0).into(),
            updated_at: at(1, 0).into(),
        }
    }

    #[test]
    fn test_shift_hours_rounds_to_two_decimals() {
        let start = at(2, 8);
        assert_eq!(shift_hours(start, start + Duration::minutes(90)), 1.5);
        assert_eq!(shift_hours(start, start + Duration::seconds(20)), 0.01);
        assert_eq!(shift_hours(start, start + Duration::minutes(500)), 8.33);
        assert_eq!(shift_hours(start, start - Duration::minutes(5)), 0.0);
    }

    #[test]
    fn test_daily_stats() {
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let shifts = vec![
            shift(alice, at(2, 8), Some(8.0)),
            shift(alice, at(2, 18), None),
            shift(bob, at(2, 9), Some(6.5)),
            shift(bob, at(3, 9), Some(4.0)),
        ];

        let stats = daily_stats(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), &shifts);

        assert_eq!(stats.total_clock_ins, 3);
        assert_eq!(stats.total_staff_active, 2);
        assert_eq!(stats.avg_hours, 7.25);
    }

    #[test]
    fn test_daily_stats_empty_day() {
        let stats = daily_stats(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(), &[]);
        assert_eq!(stats.total_clock_ins, 0);
        assert_eq!(stats.avg_hours, 0.0);
    }

    #[test]
    fn test_hours_per_staff() {
        let (alice, bob) = (user("alice@lief.care"), user("bob@lief.care"));
        let shifts = vec![
            shift(alice.id, at(1, 8), Some(10.0)),
            shift(alice.id, at(5, 8), Some(3.25)),
            shift(alice.id, at(6, 8), None),
            shift(bob.id, at(5, 8), Some(7.5)),
            shift(Uuid::new_v4(), at(5, 8), Some(1.0)),
        ];

        let staff = hours_per_staff(at(2, 0), &shifts, &[alice.clone(), bob.clone()]);

        assert_eq!(staff.len(), 2);
        assert_eq!(staff[0].staff_email, "bob@lief.care");
        assert_eq!(staff[0].total_hours, 7.5);
        assert_eq!(staff[1].staff_id, alice.id);
        assert_eq!(staff[1].total_hours, 3.25);
        assert_eq!(staff[1].shifts_count, 2);
    }
}
