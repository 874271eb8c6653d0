use crate::menu::dto::parse_id;
use crate::menu::repo_types::Meal;

/// Comma-separated menu item ids for one meal. Blank entries and repeats are
/// dropped; anything else that is not an id rejects the whole line.
pub fn parse_id_list(line: &str) -> Result<Vec<i64>, String> {
    let mut ids = Vec::new();
    for token in line.split(',').filter(|t| !t.trim().is_empty()) {
        let id = parse_id(token)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// One selected-recommendation id per meal, Breakfast,Lunch,Dinner.
pub fn parse_prepare_input(line: &str) -> Result<[(Meal, i64); 3], String> {
    let tokens: Vec<&str> = line.split(',').collect();
    if tokens.len() != Meal::ALL.len() {
        return Err(
            "Please enter exactly three ids separated by commas, in the order Breakfast,Lunch,Dinner:"
                .into(),
        );
    }
    Ok([
        (Meal::Breakfast, parse_id(tokens[0])?),
        (Meal::Lunch, parse_id(tokens[1])?),
        (Meal::Dinner, parse_id(tokens[2])?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_drop_blanks_and_repeats() {
        assert_eq!(parse_id_list("1, 2").unwrap(), vec![1, 2]);
        assert_eq!(parse_id_list("4,4,,5,").unwrap(), vec![4, 5]);
        assert!(parse_id_list("").unwrap().is_empty());
    }

    #[test]
    fn id_lists_reject_malformed_tokens() {
        assert!(parse_id_list("4,x,5").is_err());
        assert!(parse_id_list("-1").is_err());
        assert!(parse_id_list("2.5").is_err());
    }

    #[test]
    fn prepare_input_needs_three_ids() {
        assert_eq!(
            parse_prepare_input("3, 4,5").unwrap(),
            [(Meal::Breakfast, 3), (Meal::Lunch, 4), (Meal::Dinner, 5)]
        );
        assert!(parse_prepare_input("3,4").is_err());
        assert!(parse_prepare_input("3,a,5").is_err());
    }
}
