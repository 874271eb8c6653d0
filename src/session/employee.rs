use crate::auth::repo_types::User;
use crate::error::{ServiceError, ServiceResult};
use crate::feedback::services::{
    cast_vote, give_feedback, parse_feedback_input, parse_vote_input, FeedbackOutcome, VoteOutcome,
};
use crate::menu::dto::parse_id;
use crate::profile::services::{answer_profile_question, profile_questions};
use crate::recommendations::services::{prepared_for_user, selected_for_user};
use crate::session::render;
use crate::session::state::SessionState;
use crate::session::Reply;
use crate::state::AppState;
use crate::surveys::repo_types::Question;
use crate::surveys::services::{get_surveys, open_survey, submit_survey};

pub const COMMENT_NOT_ANALYSED: &str =
    "Your comment could not be analysed right now. Please try again later.";

fn question_prompt(out: &mut Reply, questions: &[Question], index: usize) {
    if let Some(q) = questions.get(index) {
        out.push(q.question_text.clone());
        out.push(format!("Please enter your response for question {}:", index + 1));
    }
}

pub(super) async fn command(
    st: &AppState,
    user: &User,
    input: &str,
    out: &mut Reply,
) -> ServiceResult<SessionState> {
    match input {
        "1" => {
            let items = selected_for_user(st, user.id).await?;
            if items.is_empty() {
                out.push("No menu has been rolled out for today yet.");
            } else {
                out.push("Today's Rolled Out Menu:");
                out.push(render::selected_items(&items));
            }
        }
        "2" => {
            out.push("Please enter Meal,SelectedRecommendationId (e.g. Lunch,12):");
            return Ok(SessionState::EmployeeCastVote);
        }
        "3" => {
            let items = prepared_for_user(st, user.id).await?;
            if items.is_empty() {
                out.push("No items have been prepared for today yet.");
            } else {
                out.push("Today's Prepared Items:");
                out.push(render::prepared_items(&items));
            }
        }
        "4" => {
            out.push("Please enter menuItemId;rating;comment (rating 1-5):");
            return Ok(SessionState::EmployeeGiveFeedback);
        }
        "5" => {
            let surveys = get_surveys(st, user.id).await?;
            if surveys.is_empty() {
                out.push("No surveys available.");
            } else {
                out.push("Available Surveys:");
                out.push(render::surveys(&surveys));
            }
        }
        "6" => {
            out.push("Please enter the survey ID:");
            return Ok(SessionState::EmployeeEnterMenuItemIdForSurvey);
        }
        "7" => {
            let questions = profile_questions(st).await?;
            let Some(first) = questions.first() else {
                out.push("No profile questions available.");
                return Ok(SessionState::Authenticated);
            };
            out.push(first.prompt());
            return Ok(SessionState::EmployeeUpdatingProfile {
                questions,
                index: 0,
            });
        }
        _ => out.push("Unknown command."),
    }
    Ok(SessionState::Authenticated)
}

pub(super) async fn input(
    st: &AppState,
    user: &User,
    state: SessionState,
    input: &str,
    out: &mut Reply,
) -> ServiceResult<SessionState> {
    match state {
        SessionState::EmployeeCastVote => {
            let (meal, id) = parse_vote_input(input)
                .map_err(|e| ServiceError::invalid(format!("{e} Please enter Meal,SelectedRecommendationId:")))?;
            match cast_vote(st, user.id, id, meal).await? {
                VoteOutcome::Cast => out.push(format!("Your vote for {meal} has been cast.")),
                VoteOutcome::AlreadyVoted => {
                    out.push(format!("You have already voted for {meal} today."))
                }
            }
            Ok(SessionState::Authenticated)
        }
        SessionState::EmployeeGiveFeedback => {
            let (id, rating, comment) = parse_feedback_input(input)
                .map_err(|e| ServiceError::invalid(format!("{e} Please enter menuItemId;rating;comment:")))?;
            match give_feedback(st, user.id, id, rating, &comment).await? {
                FeedbackOutcome::Recorded { sentiment: Some(_) } => {
                    out.push("Your Feedback has been recorded")
                }
                FeedbackOutcome::Recorded { sentiment: None } => {
                    out.push("Your Feedback has been recorded");
                    out.push(COMMENT_NOT_ANALYSED);
                }
                FeedbackOutcome::RatingOutOfRange => out.push("Rating should be in between 1 and 5"),
            }
            Ok(SessionState::Authenticated)
        }
        SessionState::EmployeeEnterMenuItemIdForSurvey => {
            let id = parse_id(input).map_err(ServiceError::invalid)?;
            let questions = open_survey(st, user.id, id).await?;
            question_prompt(out, &questions, 0);
            Ok(SessionState::EmployeeAnsweringSurvey {
                discarded_id: id,
                questions,
                responses: Vec::new(),
            })
        }
        SessionState::EmployeeAnsweringSurvey {
            discarded_id,
            questions,
            mut responses,
        } => {
            if input.is_empty() {
                return Err(ServiceError::invalid(format!(
                    "Response must not be empty. Please enter your response for question {}:",
                    responses.len() + 1
                )));
            }
            responses.push(input.to_string());
            if responses.len() < questions.len() {
                question_prompt(out, &questions, responses.len());
                return Ok(SessionState::EmployeeAnsweringSurvey {
                    discarded_id,
                    questions,
                    responses,
                });
            }
            let answers: Vec<(i64, String)> = questions
                .iter()
                .map(|q| q.id)
                .zip(responses)
                .collect();
            let saved = submit_survey(st, user.id, discarded_id, &answers).await?;
            if saved == 0 {
                out.push(format!("You have already completed survey {discarded_id}."));
            } else {
                out.push("Thank you! Your survey responses have been recorded.");
            }
            Ok(SessionState::Authenticated)
        }
        SessionState::EmployeeUpdatingProfile { questions, index } => {
            let Some(question) = questions.get(index) else {
                return Ok(SessionState::Authenticated);
            };
            answer_profile_question(st, user.id, question, input).await?;
            let next = index + 1;
            if let Some(q) = questions.get(next) {
                out.push(q.prompt());
                return Ok(SessionState::EmployeeUpdatingProfile {
                    questions,
                    index: next,
                });
            }
            out.push("Your profile has been updated.");
            Ok(SessionState::Authenticated)
        }
        other => Ok(other),
    }
}
