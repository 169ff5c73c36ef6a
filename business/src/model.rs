//! Domain records shared by the stores, the mutation gateway and the report.
//!
//! Everything here is plain serde-serializable data; field names follow the
//! portal service's JSON wire format (camelCase, role spelled `admin`/`user`).

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "user")]
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Divorced,
    Widowed,
}

/// A member record in the church directory.
///
/// `email` and `student_id` are unique across the directory; uniqueness is
/// enforced where records enter the system (signup, remote create), not by
/// the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub student_id: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    pub marital_status: MaritalStatus,
    pub has_disability: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Partial update for a [`User`]; `None` fields are left untouched.
///
/// Optional user fields get a double `Option`: the outer layer is "was this
/// field patched at all", the inner one is the new (possibly cleared) value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_city: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_disability: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<Option<DateTime<Utc>>>,
}

impl UserPatch {
    /// Merge every set field into `user`, leaving the rest alone.
    pub fn apply_to(&self, user: &mut User) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &self.$field {
                    user.$field = value.clone();
                })*
            };
        }
        merge!(
            student_id,
            email,
            role,
            status,
            first_name,
            middle_name,
            last_name,
            sex,
            date_of_birth,
            region,
            city,
            sub_city,
            phone,
            guardian_name,
            guardian_phone,
            national_id,
            marital_status,
            has_disability,
            joined_at,
            last_login,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    #[default]
    Available,
    Assigned,
    Maintenance,
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

/// An inventory item (instrument, equipment, furniture).
///
/// `code` is unique across the inventory; `assigned_to` is a weak reference
/// to a [`User`] id and may dangle after a user is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub code: String,
    pub name: String,
    pub status: AssetStatus,
    pub condition: AssetCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty_expiry: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Partial update for an [`Asset`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AssetStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<AssetCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty_expiry: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl AssetPatch {
    pub fn apply_to(&self, asset: &mut Asset) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &self.$field {
                    asset.$field = value.clone();
                })*
            };
        }
        merge!(
            code,
            name,
            status,
            condition,
            assigned_to,
            purchase_date,
            warranty_expiry,
            last_maintenance,
            tags,
            images,
        );
    }
}

/// A bulletin post. `author_id` weakly references a [`User`]; `likes` keeps
/// set semantics so repeated likes from one member collapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub likes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

/// A threaded comment; `replies` nest recursively and `parent_id` links back
/// up the thread when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub likes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_user;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
        assert_eq!(serde_json::to_string(&Role::Member).unwrap(), r#""user""#);
        assert_eq!(
            serde_json::from_str::<Role>(r#""user""#).unwrap(),
            Role::Member
        );
    }

    #[test]
    fn test_user_patch_merges_only_set_fields() {
        let mut user = sample_user("u-1", "abel@sundayschool.org");
        user.phone = Some("+251-911-000001".to_owned());

        let patch = UserPatch {
            first_name: Some("Abel".to_owned()),
            phone: Some(None),
            ..UserPatch::default()
        };
        patch.apply_to(&mut user);

        assert_eq!(user.first_name, "Abel");
        assert_eq!(user.phone, None);
        // Untouched fields survive.
        assert_eq!(user.email, "abel@sundayschool.org");
    }

    #[test]
    fn test_full_name_skips_missing_middle_name() {
        let mut user = sample_user("u-1", "abel@sundayschool.org");
        user.first_name = "Abel".to_owned();
        user.middle_name = None;
        user.last_name = "Tesfaye".to_owned();
        assert_eq!(user.full_name(), "Abel Tesfaye");

        user.middle_name = Some("Girma".to_owned());
        assert_eq!(user.full_name(), "Abel Girma Tesfaye");
    }

    #[test]
    fn test_user_json_round_trip() {
        let user = sample_user("u-7", "ruth@sundayschool.org");
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_asset_patch_clears_assignment() {
        let mut asset = crate::test_utils::sample_asset("a-1", "KB-001");
        asset.status = AssetStatus::Assigned;
        asset.assigned_to = Some("u-1".to_owned());

        let patch = AssetPatch {
            status: Some(AssetStatus::Available),
            assigned_to: Some(None),
            ..AssetPatch::default()
        };
        patch.apply_to(&mut asset);

        assert_eq!(asset.status, AssetStatus::Available);
        assert_eq!(asset.assigned_to, None);
        assert_eq!(asset.code, "KB-001");
    }
}
