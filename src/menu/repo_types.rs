use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Partition key of recommendation, selection and voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meal")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    /// Fixed order used by every per-meal workflow.
    pub const ALL: [Meal; 3] = [Meal::Breakfast, Meal::Lunch, Meal::Dinner];

    pub fn as_str(self) -> &'static str {
        match self {
            Meal::Breakfast => "Breakfast",
            Meal::Lunch => "Lunch",
            Meal::Dinner => "Dinner",
        }
    }

    pub fn next(self) -> Option<Meal> {
        match self {
            Meal::Breakfast => Some(Meal::Lunch),
            Meal::Lunch => Some(Meal::Dinner),
            Meal::Dinner => None,
        }
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Meal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Meal::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown meal {s:?}. Use Breakfast, Lunch or Dinner."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "dietary_restriction")]
pub enum DietaryRestriction {
    Vegetarian,
    #[sqlx(rename = "Non-Vegetarian")]
    #[serde(rename = "Non-Vegetarian")]
    NonVegetarian,
    Eggetarian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "spice_level")]
pub enum SpiceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "regional_preference")]
pub enum RegionalPreference {
    #[sqlx(rename = "North Indian")]
    #[serde(rename = "North Indian")]
    NorthIndian,
    #[sqlx(rename = "South Indian")]
    #[serde(rename = "South Indian")]
    SouthIndian,
    Other,
}

/// Label-based text form shared by the three attribute enums.
macro_rules! labelled {
    ($ty:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| {
                        let options: Vec<&str> = $ty::ALL.iter().map(|v| v.label()).collect();
                        format!("Invalid value {:?}. Options: {}.", s.trim(), options.join(", "))
                    })
            }
        }
    };
}

labelled!(DietaryRestriction {
    Vegetarian => "Vegetarian",
    NonVegetarian => "Non-Vegetarian",
    Eggetarian => "Eggetarian",
});
labelled!(SpiceLevel {
    High => "High",
    Medium => "Medium",
    Low => "Low",
});
labelled!(RegionalPreference {
    NorthIndian => "North Indian",
    SouthIndian => "South Indian",
    Other => "Other",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FoodCategory {
    pub id: i64,
    pub name: String,
}

/// Menu item joined with its category name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: i64,
    pub category: String,
    pub availability_status: bool,
    pub dietary_restriction: DietaryRestriction,
    pub spice_level: SpiceLevel,
    pub regional_preference: RegionalPreference,
    pub is_sweet: bool,
}

impl AsRef<MenuItem> for MenuItem {
    fn as_ref(&self) -> &MenuItem {
        self
    }
}

/// Insert payload; the category is already resolved.
#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: i64,
    pub availability_status: bool,
    pub dietary_restriction: DietaryRestriction,
    pub spice_level: SpiceLevel,
    pub regional_preference: RegionalPreference,
    pub is_sweet: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemUpdate {
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<i64>,
    pub availability_status: Option<bool>,
    pub dietary_restriction: Option<DietaryRestriction>,
    pub spice_level: Option<SpiceLevel>,
    pub regional_preference: Option<RegionalPreference>,
    pub is_sweet: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_parsing_is_case_insensitive() {
        assert_eq!("lunch".parse::<Meal>().unwrap(), Meal::Lunch);
        assert_eq!(" DINNER ".parse::<Meal>().unwrap(), Meal::Dinner);
        assert!("brunch".parse::<Meal>().is_err());
    }

    #[test]
    fn meals_follow_fixed_order() {
        assert_eq!(Meal::Breakfast.next(), Some(Meal::Lunch));
        assert_eq!(Meal::Lunch.next(), Some(Meal::Dinner));
        assert_eq!(Meal::Dinner.next(), None);
    }

    #[test]
    fn attribute_labels_roundtrip_through_text() {
        assert_eq!(
            "non-vegetarian".parse::<DietaryRestriction>().unwrap(),
            DietaryRestriction::NonVegetarian
        );
        assert_eq!(
            "South Indian".parse::<RegionalPreference>().unwrap(),
            RegionalPreference::SouthIndian
        );
        let err = "extra hot".parse::<SpiceLevel>().unwrap_err();
        assert!(err.contains("High, Medium, Low"));
    }
}
