//! Shared fixtures for unit tests.

#![cfg(test)]

use std::collections::BTreeSet;

use crate::model::{
    Asset, AssetCondition, AssetStatus, MaritalStatus, Role, Sex, User, UserStatus,
};

/// A plausible member record with every optional field unset.
pub fn sample_user(id: &str, email: &str) -> User {
    User {
        id: id.to_owned(),
        student_id: format!("SS-{id}"),
        email: email.to_owned(),
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

pub fn sample_asset(id: &str, code: &str) -> Asset {
    Asset {
        id: id.to_owned(),
        code: code.to_owned(),
        name: "Keyboard".to_owned(),
        status: AssetStatus::Available,
        condition: AssetCondition::Good,
        assigned_to: None,
        purchase_date: None,
        warranty_expiry: None,
        last_maintenance: None,
        tags: BTreeSet::new(),
        images: Vec::new(),
    }
}
