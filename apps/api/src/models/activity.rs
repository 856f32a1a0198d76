use serde::{Deserialize, Serialize};

/// Structured family-activity request extracted from conversation text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub family_member: Option<FamilyMember>,
    /// ISO date (YYYY-MM-DD).
    #[serde(default)]
    pub preferred_date: Option<String>,
    #[serde(default)]
    pub needs_time_slot_selection: bool,
    #[serde(default)]
    pub budget_constraint: Option<String>,
    #[serde(default)]
    pub location_preference: Option<String>,
    #[serde(default)]
    pub special_requirements: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyMember {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl ActivityRequest {
    /// Names of the required fields the request is still missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.activity_type.is_none() {
            missing.push("activityType");
        }
        match &self.family_member {
            None => missing.push("familyMember"),
            Some(member) if member.role.is_none() => missing.push("familyMember"),
            Some(member) if member.age.is_none() => missing.push("familyMemberAge"),
            Some(_) => {}
        }
        if self.preferred_date.is_none() {
            missing.push("preferredDate");
        }
        missing
    }
}

/// A concrete time-slot suggestion for an activity date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: String,
    pub time_range: String,
}

/// The five fixed slots offered for any activity date.
pub fn time_slots_for_date(date: &str) -> Vec<TimeSlot> {
    [
        "10:00 - 12:00",
        "12:00 - 14:00",
        "14:00 - 16:00",
        "16:00 - 18:00",
        "18:00 - 20:00",
    ]
    .iter()
    .map(|range| TimeSlot {
        date: date.to_string(),
        time_range: (*range).to_string(),
    })
    .collect()
}
