use crate::menu::repo_types::{DietaryRestriction, RegionalPreference, SpiceLevel};

pub const ADD_MENU_ITEM_FORMAT: &str =
    "name|description|price|category[|dietaryRestriction|spiceLevel|regionalPreference|isSweet]";

/// Parsed single-shot add-menu-item line; the category is still a name.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemDetails {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub dietary_restriction: DietaryRestriction,
    pub spice_level: SpiceLevel,
    pub regional_preference: RegionalPreference,
    pub is_sweet: bool,
}

impl MenuItemDetails {
    pub fn parse(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() != 4 && fields.len() != 8 {
            return Err(format!(
                "Expected 4 or 8 fields separated by '|' in the format \"{ADD_MENU_ITEM_FORMAT}\"."
            ));
        }
        let name = fields[0];
        if name.is_empty() {
            return Err("Menu item name must not be empty.".into());
        }
        let price = parse_price(fields[2])?;

        let mut details = Self {
            name: name.to_string(),
            description: fields[1].to_string(),
            price,
            category: fields[3].to_string(),
            dietary_restriction: DietaryRestriction::Vegetarian,
            spice_level: SpiceLevel::Medium,
            regional_preference: RegionalPreference::Other,
            is_sweet: false,
        };
        if fields.len() == 8 {
            details.dietary_restriction = fields[4].parse()?;
            details.spice_level = fields[5].parse()?;
            details.regional_preference = fields[6].parse()?;
            details.is_sweet = parse_flag(fields[7])?;
        }
        Ok(details)
    }
}

pub fn parse_price(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(p) if p.is_finite() && p >= 0.0 => Ok(p),
        _ => Err(format!("Invalid price {:?}. Enter a non-negative number.", raw.trim())),
    }
}

/// Accepts true/false, yes/no and 1/0.
pub fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(format!("Invalid value {other:?}. Enter true or false.")),
    }
}

pub fn parse_id(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| format!("Invalid ID {:?}. Please enter a numeric ID.", raw.trim()))
}

/// `itemId,true|false` as typed for the change-availability step.
pub fn parse_availability(line: &str) -> Result<(i64, bool), String> {
    let (id, flag) = line
        .split_once(',')
        .ok_or_else(|| "Please use the format \"itemId,availability\".".to_string())?;
    Ok((parse_id(id)?, parse_flag(flag)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_uses_defaults() {
        let d = MenuItemDetails::parse("Poha|Flattened rice|30|Breakfast").unwrap();
        assert_eq!(d.name, "Poha");
        assert_eq!(d.price, 30.0);
        assert_eq!(d.category, "Breakfast");
        assert_eq!(d.dietary_restriction, DietaryRestriction::Vegetarian);
        assert_eq!(d.spice_level, SpiceLevel::Medium);
        assert!(!d.is_sweet);
    }

    #[test]
    fn long_form_reads_attributes() {
        let d = MenuItemDetails::parse(
            "Chicken Chettinad | Spicy curry | 180 | Dinner | Non-Vegetarian | High | South Indian | no",
        )
        .unwrap();
        assert_eq!(d.dietary_restriction, DietaryRestriction::NonVegetarian);
        assert_eq!(d.spice_level, SpiceLevel::High);
        assert_eq!(d.regional_preference, RegionalPreference::SouthIndian);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(MenuItemDetails::parse("Poha|30|Breakfast").is_err());
        assert!(MenuItemDetails::parse("Poha|Rice|cheap|Breakfast").is_err());
        assert!(MenuItemDetails::parse("|Rice|30|Breakfast").is_err());
    }

    #[test]
    fn availability_input() {
        assert_eq!(parse_availability("12, false").unwrap(), (12, false));
        assert!(parse_availability("12").is_err());
        assert!(parse_availability("x,true").is_err());
    }
}
