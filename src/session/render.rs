//! Plain-text tables sent back over the socket.

use std::fmt::Write;

use crate::menu::repo_types::{Meal, MenuItem};
use crate::recommendations::repo_types::{PreparedItem, ScoredItem, SelectedItem, VoteTally};
use crate::surveys::repo_types::{DiscardCandidate, Survey};

/// Column widths follow the widest cell; every row is padded to them.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<const N: usize>(headers: [&str; N]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) -> &mut Self {
        self.rows.push(cells);
        self
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        let rule = widths
            .iter()
            .fold(String::from("+"), |acc, w| acc + &"-".repeat(w + 2) + "+");

        let mut out = String::new();
        let line = |out: &mut String, cells: &[String]| {
            out.push('|');
            for (i, &w) in widths.iter().enumerate() {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let _ = write!(out, " {cell:<w$} |");
            }
            out.push('\n');
        };
        let _ = writeln!(out, "{rule}");
        line(&mut out, &self.headers);
        let _ = writeln!(out, "{rule}");
        for row in &self.rows {
            line(&mut out, row);
        }
        out.push_str(&rule);
        out
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

pub fn menu_items(items: &[MenuItem]) -> String {
    let mut t = Table::new([
        "ID", "Name", "Description", "Price", "Category", "Available", "Diet", "Spice", "Region",
        "Sweet",
    ]);
    for m in items {
        t.row(vec![
            m.id.to_string(),
            m.name.clone(),
            m.description.clone(),
            format!("{:.2}", m.price),
            m.category.clone(),
            yes_no(m.availability_status),
            m.dietary_restriction.to_string(),
            m.spice_level.to_string(),
            m.regional_preference.to_string(),
            yes_no(m.is_sweet),
        ]);
    }
    t.render()
}

pub fn recommendations(items: &[ScoredItem]) -> String {
    let mut t = Table::new(["ID", "Name", "Meal", "Price", "Avg Rating", "Sentiment Score"]);
    for s in items {
        t.row(vec![
            s.menu_item.id.to_string(),
            s.menu_item.name.clone(),
            s.meal.to_string(),
            format!("{:.2}", s.menu_item.price),
            format!("{:.2}", s.avg_rating),
            format!("{:.2}", s.sentiment_score),
        ]);
    }
    t.render()
}

/// One titled table per meal; the ID column is the selected-recommendation id.
pub fn selected_items(items: &[SelectedItem]) -> String {
    Meal::ALL
        .iter()
        .map(|meal| {
            let mut t = Table::new(["ID", "Name", "Description", "Price", "Available"]);
            for s in items.iter().filter(|s| s.selection.meal == *meal) {
                t.row(vec![
                    s.selection.id.to_string(),
                    s.menu_item.name.clone(),
                    s.menu_item.description.clone(),
                    format!("{:.2}", s.menu_item.price),
                    yes_no(s.menu_item.availability_status),
                ]);
            }
            format!("{meal}:\n{}", t.render())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The ID column is the menu item id, as used for feedback.
pub fn prepared_items(items: &[PreparedItem]) -> String {
    let mut t = Table::new(["Meal", "ID", "Name", "Description", "Price"]);
    for p in items {
        t.row(vec![
            p.final_selection.meal.to_string(),
            p.menu_item.id.to_string(),
            p.menu_item.name.clone(),
            p.menu_item.description.clone(),
            format!("{:.2}", p.menu_item.price),
        ]);
    }
    t.render()
}

pub fn votes(tallies: &[VoteTally]) -> String {
    let mut t = Table::new(["ID", "Menu Item", "Meal", "Vote Count"]);
    for v in tallies {
        t.row(vec![
            v.selected_recommendation_id.to_string(),
            v.menu_item_name.clone(),
            v.meal.to_string(),
            v.votes.to_string(),
        ]);
    }
    t.render()
}

pub fn discard_list(items: &[DiscardCandidate]) -> String {
    let mut t = Table::new(["ID", "Name", "Description", "Rating", "Sentiment Score"]);
    for d in items {
        t.row(vec![
            d.menu_item.id.to_string(),
            d.menu_item.name.clone(),
            d.menu_item.description.clone(),
            format!("{:.2}", d.avg_rating),
            format!("{:.2}", d.sentiment_score),
        ]);
    }
    t.render()
}

pub fn surveys(items: &[Survey]) -> String {
    let mut t = Table::new(["Survey ID", "Menu Item", "Open Until"]);
    for s in items {
        t.row(vec![
            s.discarded.id.to_string(),
            s.menu_item_name.clone(),
            s.discarded.expires_at.date().to_string(),
        ]);
    }
    t.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_grow_to_widest_cell() {
        let mut t = Table::new(["ID", "Name"]);
        t.row(vec!["1".into(), "Masala Dosa".into()]);
        let rendered = t.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "+----+-------------+");
        assert_eq!(lines[1], "| ID | Name        |");
        assert_eq!(lines[3], "| 1  | Masala Dosa |");
        assert_eq!(lines.len(), 5);
    }
}
