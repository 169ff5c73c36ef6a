//! Report Formatter: the member roster rendered as a three-sheet `.xlsx`
//! workbook, assembled entirely in memory.
//!
//! Formatting is pure: the input roster is never mutated, all date-derived
//! values are computed against the `now` the caller passes in, and the only
//! output is the finished byte buffer. Callers decide where the artifact
//! goes (download, disk) and surface a single failure notification when
//! assembly errors out; no partial artifact is ever produced.

mod stats;

use chrono::{DateTime, NaiveDate, Utc};
use flock_business::{MaritalStatus, Role, Sex, User, UserStatus};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

pub use stats::{UserStatistics, age_in_years};

/// Placeholder for missing dates and the numbers derived from them.
pub const MISSING: &str = "N/A";
/// Placeholder for a member who has never logged in.
pub const NEVER: &str = "Never";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("workbook assembly failed: {0}")]
    Workbook(#[from] XlsxError),
}

/// Suggested artifact name, derived from the moment of export.
pub fn report_file_name(now: DateTime<Utc>) -> String {
    now.format("Sunday_School_Users_Report_%Y-%m-%d_%H-%M-%S.xlsx")
        .to_string()
}

/// Render the roster into workbook bytes.
///
/// An empty roster still yields a valid workbook: headers on every sheet,
/// zero data rows, and all-zero statistics.
pub fn format_users_report(users: &[User], now: DateTime<Utc>) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    write_overview_sheet(workbook.add_worksheet(), users, &header)?;
    write_details_sheet(workbook.add_worksheet(), users, now, &header)?;
    write_statistics_sheet(workbook.add_worksheet(), users, now, &header)?;

    let bytes = workbook.save_to_buffer()?;
    log::info!(
        "formatted users report: {} members, {} bytes",
        users.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin",
        Role::Member => "Member",
    }
}

fn status_label(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "Active",
        UserStatus::Inactive => "Inactive",
    }
}

fn sex_label(sex: Sex) -> &'static str {
    match sex {
        Sex::Male => "Male",
        Sex::Female => "Female",
    }
}

fn marital_label(status: MaritalStatus) -> &'static str {
    match status {
        MaritalStatus::Single => "Single",
        MaritalStatus::Married => "Married",
        MaritalStatus::Divorced => "Divorced",
        MaritalStatus::Widowed => "Widowed",
    }
}

fn date_cell(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => MISSING.to_owned(),
    }
}

fn last_login_cell(last_login: Option<DateTime<Utc>>) -> String {
    match last_login {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => NEVER.to_owned(),
    }
}

fn optional_cell(value: Option<&String>) -> String {
    value.cloned().unwrap_or_else(|| MISSING.to_owned())
}

fn write_header_row(
    sheet: &mut Worksheet,
    titles: &[&str],
    header: &Format,
) -> Result<(), XlsxError> {
    for (col, title) in titles.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, header)?;
    }
    Ok(())
}

fn write_overview_sheet(
    sheet: &mut Worksheet,
    users: &[User],
    header: &Format,
) -> Result<(), XlsxError> {
    sheet.set_name("Users Overview")?;
    write_header_row(
        sheet,
        &[
            "ID",
            "Student ID",
            "Full Name",
            "Email",
            "Role",
            "Status",
            "Region",
            "Last Login",
        ],
        header,
    )?;

    for (i, user) in users.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &user.id)?;
        sheet.write_string(row, 1, &user.student_id)?;
        sheet.write_string(row, 2, user.full_name())?;
        sheet.write_string(row, 3, &user.email)?;
        sheet.write_string(row, 4, role_label(user.role))?;
        sheet.write_string(row, 5, status_label(user.status))?;
        sheet.write_string(row, 6, &user.region)?;
        sheet.write_string(row, 7, last_login_cell(user.last_login))?;
    }
    Ok(())
}

fn write_details_sheet(
    sheet: &mut Worksheet,
    users: &[User],
    now: DateTime<Utc>,
    header: &Format,
) -> Result<(), XlsxError> {
    sheet.set_name("User Details")?;
    write_header_row(
        sheet,
        &[
            "ID",
            "Student ID",
            "Email",
            "Role",
            "Status",
            "First Name",
            "Middle Name",
            "Last Name",
            "Sex",
            "Date of Birth",
            "Age",
            "Region",
            "City",
            "Sub City",
            "Phone",
            "Guardian Name",
            "Guardian Phone",
            "National ID",
            "Marital Status",
            "Disability",
            "Joined",
            "Membership (days)",
            "Last Login",
            "Days Since Last Login",
        ],
        header,
    )?;

    let today = now.date_naive();
    for (i, user) in users.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &user.id)?;
        sheet.write_string(row, 1, &user.student_id)?;
        sheet.write_string(row, 2, &user.email)?;
        sheet.write_string(row, 3, role_label(user.role))?;
        sheet.write_string(row, 4, status_label(user.status))?;
        sheet.write_string(row, 5, &user.first_name)?;
        sheet.write_string(row, 6, optional_cell(user.middle_name.as_ref()))?;
        sheet.write_string(row, 7, &user.last_name)?;
        sheet.write_string(row, 8, sex_label(user.sex))?;
        sheet.write_string(row, 9, date_cell(user.date_of_birth))?;
        match user.date_of_birth {
            Some(born) => sheet.write_number(row, 10, f64::from(age_in_years(born, today)))?,
            None => sheet.write_string(row, 10, MISSING)?,
        };
        sheet.write_string(row, 11, &user.region)?;
        sheet.write_string(row, 12, optional_cell(user.city.as_ref()))?;
        sheet.write_string(row, 13, optional_cell(user.sub_city.as_ref()))?;
        sheet.write_string(row, 14, optional_cell(user.phone.as_ref()))?;
        sheet.write_string(row, 15, optional_cell(user.guardian_name.as_ref()))?;
        sheet.write_string(row, 16, optional_cell(user.guardian_phone.as_ref()))?;
        sheet.write_string(row, 17, optional_cell(user.national_id.as_ref()))?;
        sheet.write_string(row, 18, marital_label(user.marital_status))?;
        sheet.write_string(row, 19, if user.has_disability { "Yes" } else { "No" })?;
        sheet.write_string(row, 20, date_cell(user.joined_at))?;
        match user.joined_at {
            Some(joined) => {
                sheet.write_number(row, 21, (today - joined).num_days().max(0) as f64)?
            }
            None => sheet.write_string(row, 21, MISSING)?,
        };
        sheet.write_string(row, 22, last_login_cell(user.last_login))?;
        match user.last_login {
            Some(at) => sheet.write_number(row, 23, (now - at).num_days().max(0) as f64)?,
            None => sheet.write_string(row, 23, NEVER)?,
        };
    }
    Ok(())
}

fn write_statistics_sheet(
    sheet: &mut Worksheet,
    users: &[User],
    now: DateTime<Utc>,
    header: &Format,
) -> Result<(), XlsxError> {
    sheet.set_name("Statistics")?;
    write_header_row(sheet, &["Metric", "Value"], header)?;

    let stats = UserStatistics::collect(users, now);
    let mut row = 1u32;
    let mut metric = |sheet: &mut Worksheet, name: &str, value: f64| -> Result<(), XlsxError> {
        sheet.write_string(row, 0, name)?;
        sheet.write_number(row, 1, value)?;
        row += 1;
        Ok(())
    };

    metric(sheet, "Total Members", stats.total as f64)?;
    metric(sheet, "Active", stats.active as f64)?;
    metric(sheet, "Inactive", stats.inactive as f64)?;
    metric(sheet, "Admins", stats.admins as f64)?;
    metric(sheet, "Members", stats.members as f64)?;
    metric(sheet, "Male", stats.male as f64)?;
    metric(sheet, "Female", stats.female as f64)?;
    metric(sheet, "With Disability", stats.with_disability as f64)?;
    metric(sheet, "Average Age", stats.average_age)?;
    for (status, count) in &stats.marital_counts {
        metric(sheet, &format!("Marital: {}", marital_label(*status)), *count as f64)?;
    }
    for (region, count) in &stats.region_counts {
        metric(sheet, &format!("Region: {region}"), *count as f64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 25, 9, 30, 45).unwrap()
    }

    fn sample_user(id: &str) -> User {
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
    fn test_file_name_embeds_the_export_instant() {
        assert_eq!(
            report_file_name(fixed_now()),
            "Sunday_School_Users_Report_2026-08-25_09-30-45.xlsx"
        );
    }

    #[test]
    fn test_empty_roster_yields_a_valid_workbook() {
        let bytes = format_users_report(&[], fixed_now()).unwrap();
        // A zip container with the three sheets present.
        assert_eq!(&bytes[..2], b"PK");
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_populated_roster_formats_without_mutating_input() {
        let mut user = sample_user("u-1");
        user.date_of_birth = NaiveDate::from_ymd_opt(2000, 6, 15);
        user.joined_at = NaiveDate::from_ymd_opt(2020, 1, 1);
        user.last_login = Some(Utc.with_ymd_and_hms(2026, 8, 20, 18, 0, 0).unwrap());
        let users = vec![user, sample_user("u-2")];
        let before = users.clone();

        let bytes = format_users_report(&users, fixed_now()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(users, before);
    }

    #[test]
    fn test_same_input_and_now_format_identically_sized_output() {
        let users = vec![sample_user("u-1")];
        let a = format_users_report(&users, fixed_now()).unwrap();
        let b = format_users_report(&users, fixed_now()).unwrap();
        // Workbook metadata embeds no wall-clock time beyond `now`.
        assert_eq!(a.len(), b.len());
    }
}
