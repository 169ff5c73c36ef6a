//! Aggregate statistics over the member roster.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use flock_business::{MaritalStatus, Role, Sex, User, UserStatus};

/// Whole years between `born` and `today`, clamped at zero.
pub fn age_in_years(born: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Aggregates for the report's Statistics sheet; every field is defined
/// (and zero) for an empty roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStatistics {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub admins: usize,
    pub members: usize,
    pub male: usize,
    pub female: usize,
    pub with_disability: usize,
    /// Mean age over users with a known date of birth; zero when none have
    /// one.
    pub average_age: f64,
    pub marital_counts: BTreeMap<MaritalStatus, usize>,
    pub region_counts: BTreeMap<String, usize>,
}

impl UserStatistics {
    pub fn collect(users: &[User], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let mut stats = Self {
            total: users.len(),
            ..Self::default()
        };

        let mut age_sum = 0u64;
        let mut age_count = 0u64;
        for user in users {
            match user.status {
                UserStatus::Active => stats.active += 1,
                UserStatus::Inactive => stats.inactive += 1,
            }
            match user.role {
                Role::Admin => stats.admins += 1,
                Role::Member => stats.members += 1,
            }
            match user.sex {
                Sex::Male => stats.male += 1,
                Sex::Female => stats.female += 1,
            }
            if user.has_disability {
                stats.with_disability += 1;
            }
            if let Some(born) = user.date_of_birth {
                age_sum += u64::from(age_in_years(born, today));
                age_count += 1;
            }
            *stats.marital_counts.entry(user.marital_status).or_insert(0) += 1;
            *stats.region_counts.entry(user.region.clone()).or_insert(0) += 1;
        }
        if age_count > 0 {
            stats.average_age = age_sum as f64 / age_count as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(id: &str) -> User {
        User {
            id: id.to_owned(),
            student_id: format!("SS-{id}"),
            email: format!("{id}@sundayschool.org"),
            role: Role::Member,
            status: UserStatus::Active,
            first_name: "Sample".to_owned(),
            middle_name: None,
            last_name: "Member".to_owned(),
            sex: Sex::Female,
            date_of_birth: None,
            region: "Addis Ababa".to_owned(),
            city: None,
            sub_city: None,
            phone: None,
            guardian_name: None,
            guardian_phone: None,
            national_id: None,
            marital_status: MaritalStatus::Single,
            has_disability: false,
            joined_at: None,
            last_login: None,
        }
    }

    #[test]
    fn test_age_counts_birthdays_not_calendar_years() {
        let born = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(
            age_in_years(born, NaiveDate::from_ymd_opt(2026, 6, 14).unwrap()),
            25
        );
        assert_eq!(
            age_in_years(born, NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()),
            26
        );
    }

    #[test]
    fn test_empty_roster_yields_defined_zeroes() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 9, 0, 0).unwrap();
        let stats = UserStatistics::collect(&[], now);
        assert_eq!(stats, UserStatistics::default());
    }

    #[test]
    fn test_collect_buckets_every_dimension() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 9, 0, 0).unwrap();
        let mut admin = user("u-1");
        admin.role = Role::Admin;
        admin.sex = Sex::Male;
        admin.date_of_birth = NaiveDate::from_ymd_opt(1990, 1, 1);
        admin.marital_status = MaritalStatus::Married;
        let mut inactive = user("u-2");
        inactive.status = UserStatus::Inactive;
        inactive.has_disability = true;
        inactive.date_of_birth = NaiveDate::from_ymd_opt(2010, 1, 1);
        inactive.region = "Oromia".to_owned();

        let stats = UserStatistics::collect(&[admin, inactive], now);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.inactive, 1);
        assert_eq!(stats.admins, 1);
        assert_eq!(stats.members, 1);
        assert_eq!(stats.male, 1);
        assert_eq!(stats.female, 1);
        assert_eq!(stats.with_disability, 1);
        // Ages 36 and 16.
        assert_eq!(stats.average_age, 26.0);
        assert_eq!(stats.marital_counts[&MaritalStatus::Married], 1);
        assert_eq!(stats.region_counts["Oromia"], 1);
        assert_eq!(stats.region_counts["Addis Ababa"], 1);
    }
}
