use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use minijinja::{context, Value};
use uuid::Uuid;

use super::{form_errors, Page, PageQuery};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{Actor, Permission, Subject};
use crate::features::enrollments::dtos::{
    CreateEnrollmentDto, EnrollmentQueryParams, EnrollmentResponseDto,
};
use crate::features::enrollments::models::EnrollmentStatus;
use crate::features::web::error::WebError;
use crate::features::web::extractor::{EnrollmentAdmin, SignedIn};
use crate::features::web::forms::{EnrollForm, EnrollmentStatusForm};
use crate::features::web::state::WebState;
use crate::features::web::templates::render;
use crate::shared::constants::WEB_ENROLLMENTS_PER_PAGE;
use crate::shared::validation::FieldErrors;

/// Statuses staff can pick on the edit form
const EDITABLE_STATUSES: [EnrollmentStatus; 2] =
    [EnrollmentStatus::Active, EnrollmentStatus::Finished];

/// Every enrollment for staff; otherwise the visitor's own and those of
/// courses they teach
pub async fn enrollment_list(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let params = EnrollmentQueryParams {
        page: query.page,
        page_size: WEB_ENROLLMENTS_PER_PAGE,
        ..Default::default()
    };
    let (enrollments, total) = state.enrollments.list(&user, &params).await?;

    Ok(render(
        "enrollment_list.html",
        context! {
            user,
            enrollments,
            page => Page::new(&params.pagination(), total),
        },
    )?)
}

pub async fn enrollment_detail(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, WebError> {
    let actor = Actor::from(user.clone());
    let enrollment = state.enrollments.get(&actor, id).await?;
    let subject = Subject::enrollment(enrollment.user_id, enrollment.course_teacher_id);

    Ok(render(
        "enrollment_detail.html",
        context! {
            user,
            can_finish => actor.can(Permission::FinishEnrollment, &subject),
            can_cancel => actor.can(Permission::CancelEnrollment, &subject),
            enrollment,
        },
    )?)
}

async fn enroll_form(
    state: &WebState,
    user: &AuthenticatedUser,
    form: &EnrollForm,
    status: StatusCode,
    errors: &FieldErrors,
) -> Result<Response, WebError> {
    let courses = state.courses.options().await?;
    let page = render(
        "enrollment_form.html",
        context! { user, form, errors, courses },
    )?;
    Ok((status, page).into_response())
}

/// `?course_id=` preselects a course
pub async fn new_enrollment_page(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Query(form): Query<EnrollForm>,
) -> Result<Response, WebError> {
    enroll_form(&state, &user, &form, StatusCode::OK, &FieldErrors::new()).await
}

/// Enroll the visitor; an existing enrollment is reported on the form
pub async fn create_enrollment(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Form(form): Form<EnrollForm>,
) -> Result<Response, WebError> {
    let course_id = match form.course_id() {
        Ok(id) => id,
        Err(errors) => {
            return enroll_form(&state, &user, &form, StatusCode::BAD_REQUEST, &errors).await
        }
    };

    let dto = CreateEnrollmentDto {
        user_id: None,
        course_id,
        status: EnrollmentStatus::Active,
    };
    match state.enrollments.create(&user, dto).await {
        Ok(_) => Ok(Redirect::to("/enrollments").into_response()),
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            enroll_form(&state, &user, &form, status, &errors).await
        }
    }
}

fn status_form(
    user: &AuthenticatedUser,
    enrollment: &EnrollmentResponseDto,
    form: &EnrollmentStatusForm,
    status: StatusCode,
    errors: &FieldErrors,
) -> Result<Response, WebError> {
    let statuses: Vec<Value> = EDITABLE_STATUSES
        .iter()
        .map(|s| context! { value => s.as_str(), label => s.label() })
        .collect();
    let page = render(
        "enrollment_form.html",
        context! { user, enrollment, form, errors, statuses },
    )?;
    Ok((status, page).into_response())
}

pub async fn edit_enrollment_page(
    State(state): State<WebState>,
    EnrollmentAdmin(user): EnrollmentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let enrollment = state.enrollments.get(&Actor::from(user.clone()), id).await?;
    let form = EnrollmentStatusForm {
        status: enrollment.status.as_str().to_string(),
    };
    status_form(&user, &enrollment, &form, StatusCode::OK, &FieldErrors::new())
}

pub async fn update_enrollment(
    State(state): State<WebState>,
    EnrollmentAdmin(user): EnrollmentAdmin,
    Path(id): Path<Uuid>,
    Form(form): Form<EnrollmentStatusForm>,
) -> Result<Response, WebError> {
    let actor = Actor::from(user.clone());
    let result = match form.status() {
        Ok(status) => state.enrollments.update_status(&actor, id, status).await,
        Err(errors) => Err(errors.into()),
    };

    match result {
        Ok(enrollment) => Ok(Redirect::to(&format!("/enrollments/{}", enrollment.id)).into_response()),
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            let enrollment = state.enrollments.get(&actor, id).await?;
            status_form(&user, &enrollment, &form, status, &errors)
        }
    }
}

pub async fn delete_enrollment_page(
    State(state): State<WebState>,
    EnrollmentAdmin(user): EnrollmentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, WebError> {
    let enrollment = state.enrollments.get(&Actor::from(user.clone()), id).await?;

    Ok(render(
        "confirm_delete.html",
        context! {
            user,
            heading => "Delete enrollment",
            prompt => format!(
                "Delete the enrollment of {} in \"{}\"?",
                enrollment.username, enrollment.course_title
            ),
            button => "Delete",
            cancel_url => format!("/enrollments/{}", id),
        },
    )?)
}

pub async fn delete_enrollment(
    State(state): State<WebState>,
    EnrollmentAdmin(user): EnrollmentAdmin,
    Path(id): Path<Uuid>,
) -> Result<Redirect, WebError> {
    state.enrollments.delete(&Actor::from(user), id).await?;
    Ok(Redirect::to("/enrollments"))
}

pub async fn finish_enrollment(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> Result<Redirect, WebError> {
    state.enrollments.finish(&Actor::from(user), id).await?;
    Ok(Redirect::to(&format!("/enrollments/{}", id)))
}

pub async fn cancel_enrollment_page(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, WebError> {
    let actor = Actor::from(user.clone());
    let enrollment = state.enrollments.get(&actor, id).await?;
    actor.authorize(
        Permission::CancelEnrollment,
        &Subject::enrollment(enrollment.user_id, enrollment.course_teacher_id),
    )?;

    Ok(render(
        "confirm_delete.html",
        context! {
            user,
            heading => "Cancel enrollment",
            prompt => format!("Withdraw from \"{}\"?", enrollment.course_title),
            button => "Cancel enrollment",
            cancel_url => format!("/enrollments/{}", id),
        },
    )?)
}

pub async fn cancel_enrollment(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> Result<Redirect, WebError> {
    state.enrollments.cancel(&Actor::from(user), id).await?;
    Ok(Redirect::to("/courses"))
}
