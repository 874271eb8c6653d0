use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::auth::repo_types::RoleKind;
use crate::error::{ServiceError, ServiceResult};
use crate::menu::repo_types::{Meal, MenuItem};
use crate::notifications::services::{notify_role, MENU_FINALIZED, MENU_ROLLED_OUT};
use crate::profile::services::recommend_menu_items;
use crate::recommendations::repo_types::{
    PreparedItem, Recommendation, ScoredItem, SelectedItem, VoteTally,
};
use crate::recommendations::scoring::{scores_for, top_items};
use crate::state::AppState;

#[derive(Debug)]
pub struct RecommendationBatch {
    pub items: Vec<ScoredItem>,
    /// False when today's batch already existed.
    pub fresh: bool,
}

#[derive(Debug)]
pub enum SelectionOutcome {
    Selected(Vec<SelectedItem>),
    AlreadySelected(Vec<SelectedItem>),
    /// None of the entered ids named a menu item; nothing was stored.
    NothingValid,
}

#[derive(Debug)]
pub enum PreparationOutcome {
    AlreadyPrepared(Vec<PreparedItem>),
    Prepared {
        results: Vec<(Meal, Result<PreparedItem, String>)>,
        notified: bool,
    },
}

/// Today's candidates. The first call of the day generates and stores the
/// batch; later calls return the stored batch with scores recomputed.
#[instrument(skip(st))]
pub async fn fetch_recommendations(st: &AppState) -> ServiceResult<RecommendationBatch> {
    let today = st.calendar.today();
    let existing = st.store.list_recommendations(today).await?;
    if !existing.is_empty() {
        debug!(count = existing.len(), "returning stored recommendations");
        return Ok(RecommendationBatch {
            items: rescore(st, &existing).await?,
            fresh: false,
        });
    }

    let mut picks = Vec::new();
    for meal in Meal::ALL {
        let category = st
            .store
            .find_category_by_name(meal.as_str())
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Category {meal}")))?;
        let items = st.store.list_menu_items_by_category(category.id).await?;
        let mut scored = Vec::with_capacity(items.len());
        for menu_item in items {
            let (avg_rating, sentiment_score) = scores_for(st, menu_item.id).await?;
            scored.push(ScoredItem {
                menu_item,
                avg_rating,
                sentiment_score,
                meal,
            });
        }
        picks.extend(top_items(scored, st.config.top_item_count, meal));
    }
    if picks.is_empty() {
        warn!("no menu items to recommend");
        return Ok(RecommendationBatch {
            items: picks,
            fresh: true,
        });
    }

    let rows: Vec<(Meal, i64)> = picks.iter().map(|p| (p.meal, p.menu_item.id)).collect();
    match st
        .store
        .insert_recommendation_batch(today, &rows, st.calendar.now())
        .await?
    {
        Some(stored) => {
            info!(count = stored.len(), "recommendations generated");
            Ok(RecommendationBatch {
                items: picks,
                fresh: true,
            })
        }
        None => {
            info!("recommendations generated concurrently; using stored batch");
            let existing = st.store.list_recommendations(today).await?;
            Ok(RecommendationBatch {
                items: rescore(st, &existing).await?,
                fresh: false,
            })
        }
    }
}

async fn rescore(st: &AppState, recs: &[Recommendation]) -> ServiceResult<Vec<ScoredItem>> {
    let mut out = Vec::with_capacity(recs.len());
    for rec in recs {
        let Some(menu_item) = st.store.find_menu_item(rec.menu_item_id).await? else {
            warn!(menu_item_id = rec.menu_item_id, "recommended item no longer exists");
            continue;
        };
        let (avg_rating, sentiment_score) = scores_for(st, menu_item.id).await?;
        out.push(ScoredItem {
            menu_item,
            avg_rating,
            sentiment_score,
            meal: rec.meal,
        });
    }
    Ok(out)
}

pub async fn selected_for_today(st: &AppState) -> ServiceResult<Vec<SelectedItem>> {
    let rows = st.store.list_selected(st.calendar.today()).await?;
    let mut out = Vec::with_capacity(rows.len());
    for selection in rows {
        match st.store.find_menu_item(selection.menu_item_id).await? {
            Some(menu_item) => out.push(SelectedItem {
                selection,
                menu_item,
            }),
            None => warn!(selected_id = selection.id, "selected item no longer exists"),
        }
    }
    Ok(out)
}

/// Today's rolled-out items, ordered for `user_id`'s profile within each meal.
pub async fn selected_for_user(st: &AppState, user_id: i64) -> ServiceResult<Vec<SelectedItem>> {
    let items = selected_for_today(st).await?;
    personalize(st, user_id, items, |s| s.selection.meal).await
}

pub async fn prepared_for_user(st: &AppState, user_id: i64) -> ServiceResult<Vec<PreparedItem>> {
    let items = prepared_for_today(st).await?;
    personalize(st, user_id, items, |p| p.final_selection.meal).await
}

async fn personalize<T: AsRef<MenuItem>>(
    st: &AppState,
    user_id: i64,
    items: Vec<T>,
    meal_of: impl Fn(&T) -> Meal,
) -> ServiceResult<Vec<T>> {
    let mut ranked = recommend_menu_items(st, user_id, items).await?;
    // Ranking is stable, so re-grouping by meal keeps the profile order inside each meal.
    ranked.sort_by_key(|item| meal_of(item));
    Ok(ranked)
}

/// Stores today's selection from per-meal menu item ids, notifying employees.
#[instrument(skip(st, picks))]
pub async fn select_recommendations(
    st: &AppState,
    picks: &[(Meal, Vec<i64>)],
) -> ServiceResult<SelectionOutcome> {
    let today = st.calendar.today();
    let existing = selected_for_today(st).await?;
    if !existing.is_empty() {
        return Ok(SelectionOutcome::AlreadySelected(existing));
    }

    let mut rows: Vec<(Meal, i64)> = Vec::new();
    for (meal, ids) in picks {
        for id in ids {
            if rows.contains(&(*meal, *id)) {
                continue;
            }
            if st.store.find_menu_item(*id).await?.is_none() {
                debug!(menu_item_id = id, %meal, "skipping unknown menu item");
                continue;
            }
            rows.push((*meal, *id));
        }
    }
    if rows.is_empty() {
        return Ok(SelectionOutcome::NothingValid);
    }

    if st
        .store
        .insert_selected_batch(today, &rows, st.calendar.now())
        .await?
        .is_none()
    {
        info!("selection stored concurrently");
        return Ok(SelectionOutcome::AlreadySelected(selected_for_today(st).await?));
    }
    info!(count = rows.len(), "recommendations selected");
    notify_role(st, RoleKind::Employee, MENU_ROLLED_OUT).await?;
    Ok(SelectionOutcome::Selected(selected_for_today(st).await?))
}

/// Commits one selected recommendation per meal. A bad reference fails only
/// its own meal; employees are notified once all three succeed.
#[instrument(skip(st))]
pub async fn prepare_items(
    st: &AppState,
    picks: [(Meal, i64); 3],
) -> ServiceResult<PreparationOutcome> {
    let existing = prepared_for_today(st).await?;
    if !existing.is_empty() {
        return Ok(PreparationOutcome::AlreadyPrepared(existing));
    }

    let mut results = Vec::with_capacity(picks.len());
    for (meal, id) in picks {
        results.push((meal, prepare_one(st, meal, id).await?));
    }
    let notified = results.iter().all(|(_, r)| r.is_ok());
    if notified {
        notify_role(st, RoleKind::Employee, MENU_FINALIZED).await?;
    }
    info!(notified, "preparation recorded");
    Ok(PreparationOutcome::Prepared { results, notified })
}

async fn prepare_one(
    st: &AppState,
    meal: Meal,
    selected_id: i64,
) -> ServiceResult<Result<PreparedItem, String>> {
    let today = st.calendar.today();
    let Some(selected) = st.store.find_selected(selected_id).await? else {
        return Ok(Err(format!("Selected recommendation {selected_id} not found.")));
    };
    if selected.day != today || selected.meal != meal {
        return Ok(Err(format!(
            "Selected recommendation {selected_id} is not on today's {meal} list."
        )));
    }
    let Some(menu_item) = st.store.find_menu_item(selected.menu_item_id).await? else {
        return Ok(Err(format!("Menu item {} not found.", selected.menu_item_id)));
    };
    match st
        .store
        .insert_final_selection(selected.id, meal, today, st.calendar.now())
        .await?
    {
        Some(final_selection) => Ok(Ok(PreparedItem {
            final_selection,
            menu_item,
        })),
        None => Ok(Err(format!("{meal} has already been prepared today."))),
    }
}

pub async fn prepared_for_today(st: &AppState) -> ServiceResult<Vec<PreparedItem>> {
    let rows = st.store.list_final_selections(st.calendar.today()).await?;
    let mut out = Vec::with_capacity(rows.len());
    for final_selection in rows {
        let Some(selected) = st
            .store
            .find_selected(final_selection.selected_recommendation_id)
            .await?
        else {
            continue;
        };
        if let Some(menu_item) = st.store.find_menu_item(selected.menu_item_id).await? {
            out.push(PreparedItem {
                final_selection,
                menu_item,
            });
        }
    }
    Ok(out)
}

/// Vote counts for every item rolled out today, zero counts included.
pub async fn view_votes(st: &AppState) -> ServiceResult<Vec<VoteTally>> {
    let today = st.calendar.today();
    let selected = selected_for_today(st).await?;
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for vote in st.store.list_votes(today).await? {
        *counts.entry(vote.selected_recommendation_id).or_default() += 1;
    }
    Ok(selected
        .into_iter()
        .map(|s| VoteTally {
            selected_recommendation_id: s.selection.id,
            votes: counts.get(&s.selection.id).copied().unwrap_or(0),
            menu_item_name: s.menu_item.name,
            meal: s.selection.meal,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::add_user;
    use crate::feedback::services::{cast_vote, give_feedback};
    use crate::menu::dto::MenuItemDetails;
    use crate::menu::services::{add_menu_item, delete_menu_item};
    use crate::notifications::services::unread_for;

    async fn item(st: &AppState, line: &str) -> i64 {
        add_menu_item(st, MenuItemDetails::parse(line).unwrap())
            .await
            .unwrap()
            .id
    }

    fn ids_for(items: &[ScoredItem], meal: Meal) -> Vec<i64> {
        items
            .iter()
            .filter(|s| s.meal == meal)
            .map(|s| s.menu_item.id)
            .collect()
    }

    #[tokio::test]
    async fn fetch_is_idempotent_within_a_day() {
        let st = AppState::fake();
        let poha = item(&st, "Poha|Rice flakes|30|Breakfast").await;
        let idli = item(&st, "Idli|Steamed|20|Breakfast").await;
        let upma = item(&st, "Upma|Semolina|25|Breakfast").await;
        item(&st, "Rajma|Beans|90|Lunch").await;
        give_feedback(&st, 1, upma, 5, "great").await.unwrap();
        give_feedback(&st, 1, idli, 4, "good").await.unwrap();

        let first = fetch_recommendations(&st).await.unwrap();
        assert!(first.fresh);
        assert_eq!(ids_for(&first.items, Meal::Breakfast), vec![upma, idli]);
        assert_eq!(ids_for(&first.items, Meal::Lunch).len(), 1);
        assert!(ids_for(&first.items, Meal::Dinner).is_empty());

        // New feedback changes scores but not the stored batch.
        give_feedback(&st, 2, poha, 5, "best").await.unwrap();
        give_feedback(&st, 3, poha, 5, "best").await.unwrap();
        let second = fetch_recommendations(&st).await.unwrap();
        assert!(!second.fresh);
        assert_eq!(ids_for(&second.items, Meal::Breakfast), vec![upma, idli]);
        assert_eq!(second.items.len(), first.items.len());
    }

    #[tokio::test]
    async fn fetch_regenerates_after_recommended_items_are_deleted() {
        let st = AppState::fake();
        let poha = item(&st, "Poha|Rice flakes|30|Breakfast").await;
        let first = fetch_recommendations(&st).await.unwrap();
        assert_eq!(ids_for(&first.items, Meal::Breakfast), vec![poha]);

        delete_menu_item(&st, poha).await.unwrap();
        let idli = item(&st, "Idli|Steamed|20|Breakfast").await;
        let again = fetch_recommendations(&st).await.unwrap();
        assert!(again.fresh);
        assert_eq!(ids_for(&again.items, Meal::Breakfast), vec![idli]);

        let stored = fetch_recommendations(&st).await.unwrap();
        assert!(!stored.fresh);
        assert_eq!(ids_for(&stored.items, Meal::Breakfast), vec![idli]);
    }

    #[tokio::test]
    async fn selection_tags_meals_in_order_and_notifies_once() {
        let st = AppState::fake();
        let employee = add_user(&st, "emp", "pw", "Employee").await.unwrap();
        for line in [
            "Poha|a|1|Breakfast",
            "Idli|b|1|Breakfast",
            "Rajma|c|1|Lunch",
            "Paneer|d|1|Dinner",
            "Dal|e|1|Dinner",
        ] {
            item(&st, line).await;
        }

        let picks = vec![
            (Meal::Breakfast, vec![1, 2]),
            (Meal::Lunch, vec![3, 99]),
            (Meal::Dinner, vec![4, 5]),
        ];
        let SelectionOutcome::Selected(selected) = select_recommendations(&st, &picks).await.unwrap()
        else {
            panic!("selection should be stored");
        };
        let tagged: Vec<(Meal, i64)> = selected
            .iter()
            .map(|s| (s.selection.meal, s.menu_item.id))
            .collect();
        assert_eq!(
            tagged,
            vec![
                (Meal::Breakfast, 1),
                (Meal::Breakfast, 2),
                (Meal::Lunch, 3),
                (Meal::Dinner, 4),
                (Meal::Dinner, 5),
            ]
        );

        assert!(matches!(
            select_recommendations(&st, &picks).await.unwrap(),
            SelectionOutcome::AlreadySelected(_)
        ));
        let notes = unread_for(&st, &employee).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, MENU_ROLLED_OUT);
    }

    #[tokio::test]
    async fn selection_with_only_unknown_ids_stores_nothing() {
        let st = AppState::fake();
        let picks = vec![(Meal::Breakfast, vec![42]), (Meal::Lunch, vec![]), (Meal::Dinner, vec![])];
        assert!(matches!(
            select_recommendations(&st, &picks).await.unwrap(),
            SelectionOutcome::NothingValid
        ));
        assert!(selected_for_today(&st).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn preparation_fails_per_meal_and_is_idempotent() {
        let st = AppState::fake();
        let employee = add_user(&st, "emp", "pw", "Employee").await.unwrap();
        let a = item(&st, "Poha|a|1|Breakfast").await;
        let b = item(&st, "Rajma|c|1|Lunch").await;
        let c = item(&st, "Dal|e|1|Dinner").await;
        let picks = vec![(Meal::Breakfast, vec![a]), (Meal::Lunch, vec![b]), (Meal::Dinner, vec![c])];
        let SelectionOutcome::Selected(selected) = select_recommendations(&st, &picks).await.unwrap()
        else {
            panic!("selection should be stored");
        };
        let (sa, sb) = (selected[0].selection.id, selected[1].selection.id);

        // Dinner points at a missing selection.
        let outcome = prepare_items(
            &st,
            [(Meal::Breakfast, sa), (Meal::Lunch, sb), (Meal::Dinner, 777)],
        )
        .await
        .unwrap();
        let PreparationOutcome::Prepared { results, notified } = outcome else {
            panic!("first preparation should run");
        };
        assert!(!notified);
        assert!(results[0].1.is_ok() && results[1].1.is_ok());
        assert!(results[2].1.as_ref().unwrap_err().contains("777"));
        assert_eq!(prepared_for_today(&st).await.unwrap().len(), 2);

        assert!(matches!(
            prepare_items(&st, [(Meal::Breakfast, sa), (Meal::Lunch, sb), (Meal::Dinner, sb)])
                .await
                .unwrap(),
            PreparationOutcome::AlreadyPrepared(_)
        ));
        let notes = unread_for(&st, &employee).await.unwrap();
        assert!(notes.iter().all(|n| n.content != MENU_FINALIZED));
    }

    #[tokio::test]
    async fn full_preparation_notifies_employees() {
        let st = AppState::fake();
        let employee = add_user(&st, "emp", "pw", "Employee").await.unwrap();
        let a = item(&st, "Poha|a|1|Breakfast").await;
        let b = item(&st, "Rajma|c|1|Lunch").await;
        let c = item(&st, "Dal|e|1|Dinner").await;
        let picks = vec![(Meal::Breakfast, vec![a]), (Meal::Lunch, vec![b]), (Meal::Dinner, vec![c])];
        let SelectionOutcome::Selected(s) = select_recommendations(&st, &picks).await.unwrap() else {
            panic!("selection should be stored");
        };
        let outcome = prepare_items(
            &st,
            [
                (Meal::Breakfast, s[0].selection.id),
                (Meal::Lunch, s[1].selection.id),
                (Meal::Dinner, s[2].selection.id),
            ],
        )
        .await
        .unwrap();
        assert!(matches!(outcome, PreparationOutcome::Prepared { notified: true, .. }));
        let notes = unread_for(&st, &employee).await.unwrap();
        assert!(notes.iter().any(|n| n.content == MENU_FINALIZED));
    }

    #[tokio::test]
    async fn votes_are_tallied_per_selection() {
        let st = AppState::fake();
        let a = item(&st, "Poha|a|1|Breakfast").await;
        let b = item(&st, "Idli|b|1|Breakfast").await;
        let picks = vec![(Meal::Breakfast, vec![a, b]), (Meal::Lunch, vec![]), (Meal::Dinner, vec![])];
        let SelectionOutcome::Selected(s) = select_recommendations(&st, &picks).await.unwrap() else {
            panic!("selection should be stored");
        };
        cast_vote(&st, 1, s[0].selection.id, Meal::Breakfast).await.unwrap();
        cast_vote(&st, 2, s[0].selection.id, Meal::Breakfast).await.unwrap();

        let tallies = view_votes(&st).await.unwrap();
        assert_eq!(tallies.len(), 2);
        assert_eq!((tallies[0].menu_item_name.as_str(), tallies[0].votes), ("Poha", 2));
        assert_eq!((tallies[1].menu_item_name.as_str(), tallies[1].votes), ("Idli", 0));
    }
}
