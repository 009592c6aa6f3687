use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use minijinja::{context, Value};
use serde::Deserialize;
use uuid::Uuid;

use super::{form_errors, Page};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{Actor, Permission, Subject};
use crate::features::courses::dtos::{CourseImageUpload, CourseQueryParams};
use crate::features::courses::models::CourseLevel;
use crate::features::courses::services::CourseScope;
use crate::features::web::error::WebError;
use crate::features::web::extractor::{CatalogEditor, SignedIn};
use crate::features::web::forms::CourseForm;
use crate::features::web::state::WebState;
use crate::features::web::templates::render;
use crate::shared::constants::WEB_COURSES_PER_PAGE;
use crate::shared::types::default_page;
use crate::shared::validation::FieldErrors;

#[derive(Debug, Deserialize)]
pub struct CourseListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    /// Category id; empty means every category
    #[serde(default)]
    pub category: String,
}

/// Newest courses first, optionally within one category
pub async fn course_list(
    State(state): State<WebState>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<CourseListQuery>,
) -> Result<Html<String>, WebError> {
    let category_id = query.category.trim().parse::<Uuid>().ok();
    let params = CourseQueryParams {
        page: query.page,
        page_size: WEB_COURSES_PER_PAGE,
        category_id,
        ..Default::default()
    };

    let (courses, total) = state
        .courses
        .list(CourseScope::All, &params, user.as_ref().map(|u| u.user_id))
        .await?;
    let categories = state.categories.options().await?;

    let page_url = match category_id {
        Some(id) => format!("/courses?category={}&", id),
        None => "/courses?".to_string(),
    };

    Ok(render(
        "course_list.html",
        context! {
            user,
            courses,
            categories,
            selected_category => category_id.map(|id| id.to_string()).unwrap_or_default(),
            page => Page::new(&params.pagination(), total),
            page_url,
        },
    )?)
}

/// Course page. The roster is only shown to staff and the course teacher.
pub async fn course_detail(
    State(state): State<WebState>,
    user: Option<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, WebError> {
    let course = state.courses.get(id).await?;
    let actor = Actor::from(user.clone());

    let roster = if actor.can(Permission::ViewRoster, &Subject::course(course.teacher_id)) {
        Some(state.enrollments.roster(&actor, id).await?)
    } else {
        None
    };
    let enrollment = match &user {
        Some(user) => state.enrollments.find_for(user.user_id, id).await?,
        None => None,
    };

    Ok(render(
        "course_detail.html",
        context! {
            user,
            course,
            roster,
            enrollment,
            can_manage => actor.can(Permission::MutateCatalog, &Subject::NONE),
        },
    )?)
}

async fn course_form(
    state: &WebState,
    user: &AuthenticatedUser,
    course_id: Option<Uuid>,
    form: &CourseForm,
    errors: &FieldErrors,
) -> Result<Html<String>, WebError> {
    let categories = state.categories.options().await?;
    let teachers = state.auth.users.list_teachers().await?;
    let levels: Vec<Value> = CourseLevel::ALL
        .iter()
        .map(|l| context! { value => l.as_str(), label => l.label() })
        .collect();
    let image_url = match course_id {
        Some(id) => state.courses.get(id).await?.image_url,
        None => None,
    };

    Ok(render(
        "course_form.html",
        context! { user, course_id, form, errors, categories, teachers, levels, image_url },
    )?)
}

async fn rejected_course_form(
    state: &WebState,
    user: &AuthenticatedUser,
    course_id: Option<Uuid>,
    form: &CourseForm,
    status: StatusCode,
    errors: FieldErrors,
) -> Result<Response, WebError> {
    let page = course_form(state, user, course_id, form, &errors).await?;
    Ok((status, page).into_response())
}

pub async fn new_course_page(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
) -> Result<Html<String>, WebError> {
    course_form(&state, &user, None, &CourseForm::blank(), &FieldErrors::new()).await
}

pub async fn create_course(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Form(form): Form<CourseForm>,
) -> Result<Response, WebError> {
    let draft = match form.into_draft() {
        Ok(draft) => draft,
        Err(errors) => {
            return rejected_course_form(&state, &user, None, &form, StatusCode::BAD_REQUEST, errors)
                .await
        }
    };

    match state.courses.create(Some(user.user_id), draft).await {
        Ok(_) => Ok(Redirect::to("/courses").into_response()),
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            rejected_course_form(&state, &user, None, &form, status, errors).await
        }
    }
}

pub async fn edit_course_page(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, WebError> {
    let course = state.courses.get(id).await?;
    let form = CourseForm::from_course(&course);
    course_form(&state, &user, Some(id), &form, &FieldErrors::new()).await
}

pub async fn update_course(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
    Form(form): Form<CourseForm>,
) -> Result<Response, WebError> {
    let draft = match form.into_draft() {
        Ok(draft) => draft,
        Err(errors) => {
            return rejected_course_form(&state, &user, Some(id), &form, StatusCode::BAD_REQUEST, errors)
                .await
        }
    };

    match state.courses.update(user.user_id, id, draft).await {
        Ok(course) => Ok(Redirect::to(&format!("/courses/{}", course.id)).into_response()),
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            rejected_course_form(&state, &user, Some(id), &form, status, errors).await
        }
    }
}

pub async fn delete_course_page(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, WebError> {
    let course = state.courses.get(id).await?;

    Ok(render(
        "confirm_delete.html",
        context! {
            user,
            heading => "Delete course",
            prompt => format!("Delete \"{}\" together with its enrollments?", course.title),
            button => "Delete",
            cancel_url => format!("/courses/{}", id),
        },
    )?)
}

pub async fn delete_course(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
) -> Result<Redirect, WebError> {
    state.courses.delete(user.user_id, id).await?;
    Ok(Redirect::to("/courses"))
}

/// Replace the cover image; a refused file goes back onto the edit page
pub async fn upload_cover(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, WebError> {
    let result = match CourseImageUpload::from_multipart(&mut multipart).await {
        Ok(upload) => state.images.upload(user.user_id, id, upload).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(course) => Ok(Redirect::to(&format!("/courses/{}", course.id)).into_response()),
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            let course = state.courses.get(id).await?;
            let form = CourseForm::from_course(&course);
            rejected_course_form(&state, &user, Some(id), &form, status, errors).await
        }
    }
}

pub async fn remove_cover(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
) -> Result<Redirect, WebError> {
    state.images.remove(user.user_id, id).await?;
    Ok(Redirect::to(&format!("/courses/{}/edit", id)))
}

/// Get-or-create the visitor's enrollment, then return to the course
pub async fn enroll(
    State(state): State<WebState>,
    SignedIn(user): SignedIn,
    Path(id): Path<Uuid>,
) -> Result<Redirect, WebError> {
    state.enrollments.enroll(&user, id).await?;
    Ok(Redirect::to(&format!("/courses/{}", id)))
}
