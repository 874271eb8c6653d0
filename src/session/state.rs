use crate::menu::dto::{parse_flag, parse_price};
use crate::menu::repo_types::{Meal, MenuItem, MenuItemUpdate};
use crate::profile::repo_types::UserProfileQuestion;
use crate::surveys::repo_types::Question;

/// Where a connection is in its conversation. Variants carry whatever
/// partial input the step has accumulated so far.
#[derive(Debug, Clone)]
pub enum SessionState {
    Username,
    Password {
        username: String,
    },
    Authenticated,

    AddUserUsername,
    AddUserPassword {
        username: String,
    },
    AddUserRole {
        username: String,
        password: String,
    },
    AddMenuItemDetails,
    UpdateMenuItemId,
    UpdateMenuItem {
        item: MenuItem,
        field: UpdateField,
        draft: MenuItemUpdate,
    },
    DeleteMenuItemId,
    ChangeAvailability,

    /// `picks` holds the meals already answered; `meal` is the one being asked.
    SelectRecommendations {
        meal: Meal,
        picks: Vec<(Meal, Vec<i64>)>,
    },
    SelectItemToPrepare,

    EmployeeCastVote,
    EmployeeGiveFeedback,
    EmployeeEnterMenuItemIdForSurvey,
    EmployeeAnsweringSurvey {
        discarded_id: i64,
        questions: Vec<Question>,
        responses: Vec<String>,
    },
    EmployeeUpdatingProfile {
        questions: Vec<UserProfileQuestion>,
        index: usize,
    },

    Closed,
}

impl SessionState {
    /// States entered from the role menu, which `cancel` backs out of.
    pub fn is_sub_state(&self) -> bool {
        !matches!(
            self,
            Self::Username | Self::Password { .. } | Self::Authenticated | Self::Closed
        )
    }
}

/// Per-field chain of the update-menu-item workflow, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateField {
    Description,
    Price,
    Category,
    AvailabilityStatus,
    DietaryRestriction,
    SpiceLevel,
    RegionalPreference,
    IsSweet,
}

impl UpdateField {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Description => Some(Self::Price),
            Self::Price => Some(Self::Category),
            Self::Category => Some(Self::AvailabilityStatus),
            Self::AvailabilityStatus => Some(Self::DietaryRestriction),
            Self::DietaryRestriction => Some(Self::SpiceLevel),
            Self::SpiceLevel => Some(Self::RegionalPreference),
            Self::RegionalPreference => Some(Self::IsSweet),
            Self::IsSweet => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Price => "price",
            Self::Category => "category",
            Self::AvailabilityStatus => "availability (true/false)",
            Self::DietaryRestriction => "dietary restriction (Vegetarian, Non-Vegetarian, Eggetarian)",
            Self::SpiceLevel => "spice level (High, Medium, Low)",
            Self::RegionalPreference => "regional preference (North Indian, South Indian, Other)",
            Self::IsSweet => "sweet (true/false)",
        }
    }

    pub fn current(self, item: &MenuItem) -> String {
        match self {
            Self::Description => item.description.clone(),
            Self::Price => format!("{:.2}", item.price),
            Self::Category => item.category.clone(),
            Self::AvailabilityStatus => item.availability_status.to_string(),
            Self::DietaryRestriction => item.dietary_restriction.to_string(),
            Self::SpiceLevel => item.spice_level.to_string(),
            Self::RegionalPreference => item.regional_preference.to_string(),
            Self::IsSweet => item.is_sweet.to_string(),
        }
    }

    pub fn prompt(self, item: &MenuItem) -> String {
        format!(
            "Enter new {} [current: {}] (press enter or '-' to keep):",
            self.label(),
            self.current(item)
        )
    }

    /// Applies a typed value to `draft`. Category is resolved by the caller
    /// since it needs the store.
    pub fn apply(self, raw: &str, draft: &mut MenuItemUpdate) -> Result<(), String> {
        match self {
            Self::Description => draft.description = Some(raw.to_string()),
            Self::Price => draft.price = Some(parse_price(raw)?),
            Self::Category => {}
            Self::AvailabilityStatus => draft.availability_status = Some(parse_flag(raw)?),
            Self::DietaryRestriction => draft.dietary_restriction = Some(raw.parse()?),
            Self::SpiceLevel => draft.spice_level = Some(raw.parse()?),
            Self::RegionalPreference => draft.regional_preference = Some(raw.parse()?),
            Self::IsSweet => draft.is_sweet = Some(parse_flag(raw)?),
        }
        Ok(())
    }
}

/// Empty input or `-` keeps the stored value.
pub fn keeps_value(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw == "-"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::repo_types::SpiceLevel;

    #[test]
    fn update_chain_visits_every_field_once() {
        let mut field = Some(UpdateField::Description);
        let mut seen = 0;
        while let Some(f) = field {
            seen += 1;
            field = f.next();
        }
        assert_eq!(seen, 8);
    }

    #[test]
    fn apply_parses_typed_values() {
        let mut draft = MenuItemUpdate::default();
        UpdateField::Price.apply("45.5", &mut draft).unwrap();
        UpdateField::SpiceLevel.apply("low", &mut draft).unwrap();
        assert_eq!(draft.price, Some(45.5));
        assert_eq!(draft.spice_level, Some(SpiceLevel::Low));
        assert!(UpdateField::IsSweet.apply("maybe", &mut draft).is_err());
        assert!(keeps_value(" - "));
        assert!(keeps_value(""));
    }
}
