use crate::error::{ServiceError, ServiceResult};
use crate::menu::repo_types::Meal;
use crate::menu::services::list_menu_items;
use crate::recommendations::dto::{parse_id_list, parse_prepare_input};
use crate::recommendations::services::{
    fetch_recommendations, prepare_items, prepared_for_today, select_recommendations,
    selected_for_today, view_votes, PreparationOutcome, SelectionOutcome,
};
use crate::session::render;
use crate::session::state::SessionState;
use crate::session::Reply;
use crate::state::AppState;

const ALREADY_SELECTED: &str = "Recommendations have already been selected for today.";

fn select_prompt(meal: Meal) -> String {
    format!("Please enter the IDs of the items you wish to select for {meal}, separated by commas:")
}

pub(super) async fn command(
    st: &AppState,
    input: &str,
    out: &mut Reply,
) -> ServiceResult<SessionState> {
    match input {
        "1" => {
            let items = list_menu_items(st).await?;
            if items.is_empty() {
                out.push("No menu items found.");
            } else {
                out.push(render::menu_items(&items));
            }
        }
        "2" => {
            let batch = fetch_recommendations(st).await?;
            if batch.items.is_empty() {
                out.push("No menu items available to recommend.");
            } else {
                out.push(if batch.fresh {
                    "Today's Recommendations:"
                } else {
                    "Recommendations already fetched for today:"
                });
                out.push(render::recommendations(&batch.items));
            }
        }
        "3" => {
            let selected = selected_for_today(st).await?;
            if !selected.is_empty() {
                out.push(ALREADY_SELECTED);
                out.push(render::selected_items(&selected));
                return Ok(SessionState::Authenticated);
            }
            let meal = Meal::Breakfast;
            out.push(select_prompt(meal));
            return Ok(SessionState::SelectRecommendations {
                meal,
                picks: Vec::new(),
            });
        }
        "4" => {
            let tallies = view_votes(st).await?;
            if tallies.is_empty() {
                out.push("No recommendations have been selected for today.");
            } else {
                out.push("Votes for today's menu:");
                out.push(render::votes(&tallies));
            }
        }
        "5" => {
            let prepared = prepared_for_today(st).await?;
            if !prepared.is_empty() {
                out.push("Items to prepare have already been selected for today:");
                out.push(render::prepared_items(&prepared));
                return Ok(SessionState::Authenticated);
            }
            let selected = selected_for_today(st).await?;
            if selected.is_empty() {
                out.push("No recommendations have been selected for today yet.");
                return Ok(SessionState::Authenticated);
            }
            out.push(render::selected_items(&selected));
            out.push(
                "Please enter the IDs of the items you wish to prepare for each meal \
                 (Breakfast, Lunch, Dinner), separated by commas:",
            );
            out.push("Format: BreakfastID,LunchID,DinnerID");
            return Ok(SessionState::SelectItemToPrepare);
        }
        _ => out.push("Unknown command."),
    }
    Ok(SessionState::Authenticated)
}

pub(super) async fn input(
    st: &AppState,
    state: SessionState,
    input: &str,
    out: &mut Reply,
) -> ServiceResult<SessionState> {
    match state {
        SessionState::SelectRecommendations { meal, mut picks } => {
            let ids = parse_id_list(input)
                .map_err(|e| ServiceError::invalid(format!("{e} {}", select_prompt(meal))))?;
            picks.push((meal, ids));
            if let Some(next) = meal.next() {
                out.push(select_prompt(next));
                return Ok(SessionState::SelectRecommendations { meal: next, picks });
            }
            match select_recommendations(st, &picks).await? {
                SelectionOutcome::Selected(items) => {
                    out.push("Selected recommendations for all meals.");
                    out.push(render::selected_items(&items));
                }
                SelectionOutcome::AlreadySelected(items) => {
                    out.push(ALREADY_SELECTED);
                    out.push(render::selected_items(&items));
                }
                SelectionOutcome::NothingValid => {
                    out.push("None of the entered IDs matched a menu item. Nothing was selected.");
                }
            }
            Ok(SessionState::Authenticated)
        }
        SessionState::SelectItemToPrepare => {
            let picks = parse_prepare_input(input).map_err(ServiceError::invalid)?;
            match prepare_items(st, picks).await? {
                PreparationOutcome::AlreadyPrepared(items) => {
                    out.push("Items to prepare have already been selected for today:");
                    out.push(render::prepared_items(&items));
                }
                PreparationOutcome::Prepared { results, notified } => {
                    for (meal, result) in results {
                        match result {
                            Ok(_) => out.push(format!("Final selection for {meal} has been saved.")),
                            Err(msg) => out.push(msg),
                        }
                    }
                    if notified {
                        out.push("Employees have been notified about today's menu.");
                    }
                }
            }
            Ok(SessionState::Authenticated)
        }
        other => Ok(other),
    }
}
