use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use minijinja::context;
use uuid::Uuid;

use super::{form_errors, Page, PageQuery};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::categories::dtos::{CategoryInputDto, CategoryQueryParams};
use crate::features::courses::dtos::CourseQueryParams;
use crate::features::courses::services::CourseScope;
use crate::features::web::error::WebError;
use crate::features::web::extractor::CatalogEditor;
use crate::features::web::state::WebState;
use crate::features::web::templates::render;
use crate::shared::constants::{WEB_CATEGORIES_PER_PAGE, WEB_COURSES_PER_PAGE};
use crate::shared::validation::FieldErrors;

pub async fn category_list(
    State(state): State<WebState>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let params = CategoryQueryParams {
        page: query.page,
        page_size: WEB_CATEGORIES_PER_PAGE,
        search: None,
    };
    let (categories, total) = state.categories.list(&params).await?;

    Ok(render(
        "category_list.html",
        context! {
            user,
            categories,
            page => Page::new(&params.pagination(), total),
        },
    )?)
}

pub async fn category_detail(
    State(state): State<WebState>,
    user: Option<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let category = state.categories.get(id).await?;
    let params = CourseQueryParams {
        page: query.page,
        page_size: WEB_COURSES_PER_PAGE,
        ..Default::default()
    };
    let (courses, total) = state
        .courses
        .list(CourseScope::Category(id), &params, user.as_ref().map(|u| u.user_id))
        .await?;

    Ok(render(
        "category_detail.html",
        context! {
            user,
            category,
            courses,
            page => Page::new(&params.pagination(), total),
        },
    )?)
}

fn category_form(
    user: &AuthenticatedUser,
    category_id: Option<Uuid>,
    form: &CategoryInputDto,
    status: StatusCode,
    errors: &FieldErrors,
) -> Result<Response, WebError> {
    let page = render(
        "category_form.html",
        context! { user, category_id, form, errors },
    )?;
    Ok((status, page).into_response())
}

pub async fn new_category_page(CatalogEditor(user): CatalogEditor) -> Result<Response, WebError> {
    category_form(
        &user,
        None,
        &CategoryInputDto::default(),
        StatusCode::OK,
        &FieldErrors::new(),
    )
}

pub async fn create_category(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Form(form): Form<CategoryInputDto>,
) -> Result<Response, WebError> {
    let draft = match form.clone().into_draft() {
        Ok(draft) => draft,
        Err(errors) => return category_form(&user, None, &form, StatusCode::BAD_REQUEST, &errors),
    };

    match state.categories.create(Some(user.user_id), draft).await {
        Ok(_) => Ok(Redirect::to("/categories").into_response()),
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            category_form(&user, None, &form, status, &errors)
        }
    }
}

pub async fn edit_category_page(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let category = state.categories.get(id).await?;
    let form = CategoryInputDto {
        name: category.name,
        description: category.description,
    };
    category_form(&user, Some(id), &form, StatusCode::OK, &FieldErrors::new())
}

pub async fn update_category(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
    Form(form): Form<CategoryInputDto>,
) -> Result<Response, WebError> {
    let draft = match form.clone().into_draft() {
        Ok(draft) => draft,
        Err(errors) => {
            return category_form(&user, Some(id), &form, StatusCode::BAD_REQUEST, &errors)
        }
    };

    match state.categories.update(user.user_id, id, draft).await {
        Ok(category) => Ok(Redirect::to(&format!("/categories/{}", category.id)).into_response()),
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            category_form(&user, Some(id), &form, status, &errors)
        }
    }
}

pub async fn delete_category_page(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, WebError> {
    let category = state.categories.get(id).await?;

    Ok(render(
        "confirm_delete.html",
        context! {
            user,
            heading => "Delete category",
            prompt => format!(
                "Delete \"{}\"? Its {} course(s) and their enrollments are deleted too.",
                category.name, category.course_count
            ),
            button => "Delete",
            cancel_url => format!("/categories/{}", id),
        },
    )?)
}

pub async fn delete_category(
    State(state): State<WebState>,
    CatalogEditor(user): CatalogEditor,
    Path(id): Path<Uuid>,
) -> Result<Redirect, WebError> {
    state.categories.delete(user.user_id, id).await?;
    Ok(Redirect::to("/categories"))
}
